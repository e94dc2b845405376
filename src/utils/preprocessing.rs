//! Tensor preprocessing and mask postprocessing for segmentation models
//!
//! Images are letterboxed into a square canvas (aspect-preserving resize,
//! centred, padded), normalised per channel and laid out as NCHW. The inverse
//! mapping turns a `1x1xSxS` model output back into a mask at the original
//! image size.

use crate::{
    error::{RetouchError, Result},
    types::SegmentationMask,
};
use image::{DynamicImage, ImageBuffer, RgbImage};
use ndarray::Array4;

/// Model-specific preprocessing parameters
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessingConfig {
    /// Square model input size `[width, height]`
    pub target_size: [u32; 2],
    /// Per-channel mean subtracted after scaling to 0-1
    pub normalization_mean: [f32; 3],
    /// Per-channel standard deviation divided after mean subtraction
    pub normalization_std: [f32; 3],
}

impl PreprocessingConfig {
    /// ImageNet normalisation at the given square size (`ISNet` and friends)
    #[must_use]
    pub fn imagenet(size: u32) -> Self {
        Self {
            target_size: [size, size],
            normalization_mean: [0.485, 0.456, 0.406],
            normalization_std: [0.229, 0.224, 0.225],
        }
    }
}

/// Configuration for preprocessing behavior
#[derive(Debug, Clone)]
pub struct PreprocessingOptions {
    /// Padding color for aspect ratio preservation (RGB)
    pub padding_color: [u8; 3],
}

impl Default for PreprocessingOptions {
    fn default() -> Self {
        Self {
            padding_color: [255, 255, 255],
        }
    }
}

/// Where the original image landed inside the square model canvas
#[derive(Debug, Clone, Copy, PartialEq)]
struct Letterbox {
    scale: f32,
    offset_x: u32,
    offset_y: u32,
    scaled_width: u32,
    scaled_height: u32,
}

impl Letterbox {
    fn compute(original: (u32, u32), target_size: u32) -> Result<Self> {
        let (orig_width, orig_height) = original;
        if target_size == 0 {
            return Err(RetouchError::processing("Model input size must be non-zero"));
        }
        if orig_width == 0 || orig_height == 0 {
            return Err(RetouchError::processing(
                "Cannot preprocess an image without pixels",
            ));
        }

        let target = target_size as f32;
        let scale = (target / orig_width as f32).min(target / orig_height as f32);

        let scaled_width = ((orig_width as f32 * scale).round() as u32).clamp(1, target_size);
        let scaled_height = ((orig_height as f32 * scale).round() as u32).clamp(1, target_size);

        Ok(Self {
            scale,
            offset_x: (target_size - scaled_width) / 2,
            offset_y: (target_size - scaled_height) / 2,
            scaled_width,
            scaled_height,
        })
    }
}

/// Shared image preprocessing utilities
pub struct ImagePreprocessor;

impl ImagePreprocessor {
    /// Preprocess image for model inference
    ///
    /// Handles RGB conversion, aspect-preserving resize, centre padding to the
    /// target size and normalisation into an NCHW tensor.
    pub fn preprocess_image(
        image: &DynamicImage,
        preprocessing_config: &PreprocessingConfig,
        options: &PreprocessingOptions,
    ) -> Result<Array4<f32>> {
        let target_size = preprocessing_config.target_size[0];
        let rgb_image = image.to_rgb8();
        let letterbox = Letterbox::compute(rgb_image.dimensions(), target_size)?;

        let resized = image::imageops::resize(
            &rgb_image,
            letterbox.scaled_width,
            letterbox.scaled_height,
            image::imageops::FilterType::Triangle,
        );

        let padding = options.padding_color;
        let mut canvas = ImageBuffer::from_pixel(
            target_size,
            target_size,
            image::Rgb([padding[0], padding[1], padding[2]]),
        );
        image::imageops::replace(
            &mut canvas,
            &resized,
            i64::from(letterbox.offset_x),
            i64::from(letterbox.offset_y),
        );

        let target_size_usize = usize::try_from(target_size).map_err(|_| {
            RetouchError::processing("Target size too large for tensor allocation")
        })?;

        Ok(Self::canvas_to_tensor(
            &canvas,
            preprocessing_config,
            target_size_usize,
        ))
    }

    /// Preprocess with default options
    pub fn preprocess_for_inference(
        image: &DynamicImage,
        preprocessing_config: &PreprocessingConfig,
    ) -> Result<Array4<f32>> {
        Self::preprocess_image(image, preprocessing_config, &PreprocessingOptions::default())
    }

    /// Convert canvas to normalized tensor
    fn canvas_to_tensor(
        canvas: &RgbImage,
        preprocessing_config: &PreprocessingConfig,
        target_size: usize,
    ) -> Array4<f32> {
        let mean = preprocessing_config.normalization_mean;
        let std = preprocessing_config.normalization_std;
        let mut tensor = Array4::<f32>::zeros((1, 3, target_size, target_size));

        for (x, y, pixel) in canvas.enumerate_pixels() {
            for c in 0..3 {
                let value = (f32::from(pixel[c]) / 255.0 - mean[c]) / std[c];
                if let Some(slot) = tensor.get_mut([0, c, y as usize, x as usize]) {
                    *slot = value;
                }
            }
        }

        tensor
    }

    /// Map a `1x1xSxS` model output back onto the original image size
    pub fn tensor_to_mask(
        tensor: &Array4<f32>,
        original_dimensions: (u32, u32),
    ) -> Result<SegmentationMask> {
        let shape = tensor.shape();
        if shape.first().copied() != Some(1) || shape.get(1).copied() != Some(1) {
            return Err(RetouchError::processing(format!(
                "Invalid output tensor shape {:?}",
                shape
            )));
        }
        let mask_height = shape.get(2).copied().unwrap_or(0);
        let mask_width = shape.get(3).copied().unwrap_or(0);
        if mask_width != mask_height {
            return Err(RetouchError::processing(format!(
                "Expected a square output tensor, got {}x{}",
                mask_width, mask_height
            )));
        }

        let letterbox = Letterbox::compute(original_dimensions, mask_width as u32)?;
        let (orig_width, orig_height) = original_dimensions;
        let mut data = Vec::with_capacity(orig_width as usize * orig_height as usize);

        for y in 0..orig_height {
            for x in 0..orig_width {
                let scaled_x = ((x as f32 * letterbox.scale) as u32).min(letterbox.scaled_width - 1);
                let scaled_y =
                    ((y as f32 * letterbox.scale) as u32).min(letterbox.scaled_height - 1);
                let tensor_x = scaled_x + letterbox.offset_x;
                let tensor_y = scaled_y + letterbox.offset_y;
                let value = tensor
                    .get([0, 0, tensor_y as usize, tensor_x as usize])
                    .copied()
                    .unwrap_or(0.0);
                data.push((value.clamp(0.0, 1.0) * 255.0) as u8);
            }
        }

        Ok(SegmentationMask::new(data, original_dimensions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn create_test_image() -> DynamicImage {
        let img: RgbImage = ImageBuffer::from_pixel(100, 50, Rgb([255, 0, 0]));
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn test_preprocess_for_inference() {
        let config = PreprocessingConfig::imagenet(64);
        let tensor = ImagePreprocessor::preprocess_for_inference(&create_test_image(), &config)
            .unwrap();
        assert_eq!(tensor.shape(), &[1, 3, 64, 64]);

        // centre pixel is red, normalised
        let expected_r = (1.0 - 0.485) / 0.229;
        assert!((tensor[[0, 0, 32, 32]] - expected_r).abs() < 1e-4);
    }

    #[test]
    fn test_padding_colour_fills_letterbox() {
        let config = PreprocessingConfig::imagenet(64);
        let options = PreprocessingOptions {
            padding_color: [0, 0, 0],
        };
        let tensor =
            ImagePreprocessor::preprocess_image(&create_test_image(), &config, &options).unwrap();

        // 100x50 scales to 64x32, centred vertically with 16 rows of padding above
        let expected_black_r = (0.0 - 0.485) / 0.229;
        assert!((tensor[[0, 0, 0, 10]] - expected_black_r).abs() < 1e-4);
    }

    #[test]
    fn test_empty_image_rejected() {
        let config = PreprocessingConfig::imagenet(32);
        let empty = DynamicImage::new_rgb8(0, 0);
        assert!(ImagePreprocessor::preprocess_for_inference(&empty, &config).is_err());
    }

    #[test]
    fn test_tensor_to_mask_maps_letterbox_back() {
        // 8x8 output where only rows 2..6 (the letterboxed content) are foreground
        let mut tensor = Array4::<f32>::zeros((1, 1, 8, 8));
        for y in 2..6 {
            for x in 0..8 {
                tensor[[0, 0, y, x]] = 1.0;
            }
        }

        let mask = ImagePreprocessor::tensor_to_mask(&tensor, (16, 8)).unwrap();
        assert_eq!(mask.dimensions, (16, 8));
        assert!(mask.data.iter().all(|&v| v == 255));
    }

    #[test]
    fn test_tensor_to_mask_rejects_bad_shape() {
        let tensor = Array4::<f32>::zeros((1, 3, 8, 8));
        assert!(ImagePreprocessor::tensor_to_mask(&tensor, (4, 4)).is_err());

        let tensor = Array4::<f32>::zeros((1, 1, 8, 4));
        assert!(ImagePreprocessor::tensor_to_mask(&tensor, (4, 4)).is_err());
    }
}
