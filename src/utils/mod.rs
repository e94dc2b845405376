//! Utility modules shared by the background removers

pub mod preprocessing;

pub use preprocessing::{ImagePreprocessor, PreprocessingConfig, PreprocessingOptions};
