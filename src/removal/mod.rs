//! Background removal capability
//!
//! The HTTP layer only sees [`BackgroundRemover`]. Implementations:
//! - [`ColorKeyRemover`]: border colour keying, pure Rust, no model files
//! - `TractRemover`: ONNX segmentation model through Tract (feature `tract`)

pub mod color_key;

#[cfg(feature = "tract")]
pub mod tract;

pub use self::color_key::ColorKeyRemover;

#[cfg(feature = "tract")]
pub use self::tract::TractRemover;

use crate::{
    config::{RemoverKind, ServerConfig},
    error::Result,
    types::SegmentationMask,
};
use image::{DynamicImage, RgbaImage};
use std::sync::Arc;

/// Turns an image into an RGBA image whose background pixels are transparent
///
/// The output has the input's dimensions. Background pixels get alpha 0,
/// foreground pixels keep their colour with alpha 255 or a graded alpha on
/// soft edges. Implementations report failures as `RetouchError::Processing`
/// (or the more specific model/inference variants).
pub trait BackgroundRemover: Send + Sync {
    /// Short identifier used in logs and the health endpoint
    fn name(&self) -> &str;

    /// Remove the background from `image`
    fn remove_background(&self, image: &DynamicImage) -> Result<RgbaImage>;
}

/// Apply a segmentation mask as alpha; fully transparent pixels are zeroed
pub fn apply_mask(image: &DynamicImage, mask: &SegmentationMask) -> Result<RgbaImage> {
    let mut result = image.to_rgba8();
    mask.apply_to_image(&mut result)?;

    for pixel in result.pixels_mut() {
        if pixel[3] == 0 {
            *pixel = image::Rgba([0, 0, 0, 0]);
        }
    }

    Ok(result)
}

/// Build the remover selected in the configuration
pub fn build_remover(config: &ServerConfig) -> Result<Arc<dyn BackgroundRemover>> {
    match &config.remover {
        RemoverKind::ColorKey => Ok(Arc::new(ColorKeyRemover::new(config.color_key))),
        #[cfg(feature = "tract")]
        RemoverKind::Tract {
            model_path,
            input_size,
        } => Ok(Arc::new(TractRemover::from_path(model_path, *input_size)?)),
        #[cfg(not(feature = "tract"))]
        RemoverKind::Tract { .. } => Err(crate::error::RetouchError::invalid_config(
            "Tract remover requested but the `tract` feature is not enabled",
        )),
    }
}
