#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]

//! # IMG.LY Retouch
//!
//! HTTP service and library for two image operations:
//!
//! - **Background removal**: a pluggable [`BackgroundRemover`] turns an image
//!   into an RGBA cut-out, returned as PNG.
//! - **Enhancement**: a fixed [`EnhancementPipeline`] (contrast, 3x bicubic
//!   upscale, Gaussian softening, sharpening) whose input and output are kept
//!   in two persistent slots and served back as JPEG.
//!
//! ## Library usage
//!
//! ```rust
//! use image::{DynamicImage, RgbImage};
//! use imgly_retouch::{BackgroundRemover, ColorKeyRemover, EnhancementPipeline};
//!
//! # fn example() -> imgly_retouch::Result<()> {
//! let image = DynamicImage::ImageRgb8(RgbImage::new(40, 30));
//!
//! let enhanced = EnhancementPipeline::new().enhance(&image)?;
//! assert_eq!(enhanced.dimensions(), (120, 90));
//!
//! let cutout = ColorKeyRemover::default().remove_background(&image)?;
//! assert_eq!(cutout.dimensions(), (40, 30));
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! ## Running the server
//!
//! ```rust,no_run
//! use imgly_retouch::ServerConfig;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ServerConfig::builder()
//!     .port(5000)
//!     .upload_dir("/var/lib/retouch")
//!     .build()?;
//! imgly_retouch::server::serve(&config).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `cli` (default): `imgly-retouch` binary with argument parsing and log output
//! - `tract`: model-backed background removal through Tract (pure Rust ONNX)
//! - `tracing-json`: JSON log output for the binary

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod enhance;
pub mod error;
pub mod filters;
pub mod removal;
pub mod server;
pub mod services;
pub mod store;
pub mod tracing_config;
pub mod types;
pub mod utils;

// Public API exports
pub use config::{ColorKeyConfig, RemoverKind, ServerConfig, ServerConfigBuilder};
pub use enhance::{DiscardedBranches, EnhancementPipeline, PipelineRun};
pub use error::{Result, RetouchError};
pub use removal::{apply_mask, build_remover, BackgroundRemover, ColorKeyRemover};
pub use server::{HttpReply, RetouchServer, ShutdownHandle};
pub use services::{ImageCodec, RetouchService};
pub use store::{FsImageStore, ImageStore, MemoryImageStore};
pub use tracing_config::{spans, TracingConfig, TracingFormat};
pub use types::{ImageSlot, MaskStatistics, SegmentationMask, UploadReceipt};
pub use utils::{ImagePreprocessor, PreprocessingConfig, PreprocessingOptions};

#[cfg(feature = "tract")]
pub use removal::TractRemover;

/// Decode `image_bytes`, run the enhancement pipeline and encode the result as JPEG
///
/// Byte-level counterpart of the `/upload` processing step, without touching
/// any store.
///
/// ```rust
/// use image::{GenericImageView, RgbImage};
/// use imgly_retouch::{enhance_bytes, ImageCodec};
///
/// # fn example() -> imgly_retouch::Result<()> {
/// let input = ImageCodec::encode_jpeg(&RgbImage::new(10, 4), 90)?;
/// let output = enhance_bytes(&input, 95)?;
/// assert_eq!(ImageCodec::decode(&output)?.dimensions(), (30, 12));
/// # Ok(())
/// # }
/// # example().unwrap();
/// ```
pub fn enhance_bytes(image_bytes: &[u8], jpeg_quality: u8) -> Result<Vec<u8>> {
    let image = ImageCodec::decode(image_bytes)?;
    let output = EnhancementPipeline::new().enhance(&image)?;
    ImageCodec::encode_jpeg(&output, jpeg_quality)
}

/// Decode `image_bytes`, remove the background with `remover` and encode the cut-out as PNG
pub fn remove_background_from_bytes(
    image_bytes: &[u8],
    remover: &dyn BackgroundRemover,
) -> Result<Vec<u8>> {
    let image = ImageCodec::decode(image_bytes)?;
    let cutout = remover.remove_background(&image)?;
    ImageCodec::encode_png(&cutout)
}
