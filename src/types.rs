//! Shared types: segmentation masks, stored image slots and response bodies

use crate::error::{RetouchError, Result};
use image::{GrayImage, RgbaImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Per-pixel foreground alpha for one image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentationMask {
    /// Mask data as grayscale values (0-255), row-major
    pub data: Vec<u8>,

    /// Mask dimensions (width, height)
    pub dimensions: (u32, u32),
}

impl SegmentationMask {
    /// Create a new segmentation mask
    #[must_use]
    pub fn new(data: Vec<u8>, dimensions: (u32, u32)) -> Self {
        Self { data, dimensions }
    }

    /// Mask with every pixel set to `value`
    #[must_use]
    pub fn filled(dimensions: (u32, u32), value: u8) -> Self {
        let len = dimensions.0 as usize * dimensions.1 as usize;
        Self::new(vec![value; len], dimensions)
    }

    /// Create mask from a grayscale image
    #[must_use]
    pub fn from_image(image: &GrayImage) -> Self {
        Self::new(image.as_raw().clone(), image.dimensions())
    }

    /// Convert mask to a grayscale image
    pub fn to_image(&self) -> Result<GrayImage> {
        let (width, height) = self.dimensions;
        GrayImage::from_raw(width, height, self.data.clone())
            .ok_or_else(|| RetouchError::processing("Failed to create image from mask data"))
    }

    /// Write the mask into the alpha channel of an RGBA image
    pub fn apply_to_image(&self, image: &mut RgbaImage) -> Result<()> {
        if image.dimensions() != self.dimensions {
            return Err(RetouchError::processing(
                "Image and mask dimensions do not match",
            ));
        }

        for (pixel, &alpha) in image.pixels_mut().zip(&self.data) {
            pixel[3] = alpha;
        }

        Ok(())
    }

    /// Resize the mask to new dimensions
    pub fn resize(&self, new_width: u32, new_height: u32) -> Result<SegmentationMask> {
        let current_image = self.to_image()?;
        let resized = image::imageops::resize(
            &current_image,
            new_width,
            new_height,
            image::imageops::FilterType::Lanczos3,
        );

        Ok(SegmentationMask::from_image(&resized))
    }

    /// Get mask statistics
    #[must_use]
    pub fn statistics(&self) -> MaskStatistics {
        let total_pixels = self.data.len();
        let foreground_pixels = self.data.iter().filter(|&&x| x > 127).count();
        let background_pixels = total_pixels - foreground_pixels;
        let ratio = |n: usize| {
            if total_pixels == 0 {
                0.0
            } else {
                n as f32 / total_pixels as f32
            }
        };

        MaskStatistics {
            total_pixels,
            foreground_pixels,
            background_pixels,
            foreground_ratio: ratio(foreground_pixels),
            background_ratio: ratio(background_pixels),
        }
    }
}

/// Statistics about a segmentation mask
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskStatistics {
    pub total_pixels: usize,
    pub foreground_pixels: usize,
    pub background_pixels: usize,
    pub foreground_ratio: f32,
    pub background_ratio: f32,
}

/// One of the two persisted image slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageSlot {
    /// The uploaded image, re-encoded as JPEG
    #[serde(rename = "original_image")]
    Original,
    /// The enhancement pipeline output, encoded as JPEG
    #[serde(rename = "processed_image")]
    Processed,
}

impl ImageSlot {
    /// Both slots, in write order
    pub const ALL: [ImageSlot; 2] = [ImageSlot::Original, ImageSlot::Processed];

    /// Name used in download URLs
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Original => "original_image",
            Self::Processed => "processed_image",
        }
    }

    /// File name of the slot inside the upload directory
    #[must_use]
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Original => "original_image.jpg",
            Self::Processed => "processed_image.jpg",
        }
    }

    /// Download path for this slot
    #[must_use]
    pub fn download_url(self) -> String {
        format!("/download/{}", self.key())
    }
}

impl fmt::Display for ImageSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ImageSlot {
    type Err = RetouchError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "original_image" => Ok(Self::Original),
            "processed_image" => Ok(Self::Processed),
            other => Err(RetouchError::invalid_image_type(other)),
        }
    }
}

/// JSON body returned by a successful upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub processed_image_url: String,
}

impl UploadReceipt {
    #[must_use]
    pub fn for_slot(slot: ImageSlot) -> Self {
        Self {
            processed_image_url: slot.download_url(),
        }
    }
}
