//! Image encoding and decoding service
//!
//! Keeps byte-level format handling out of the request and pipeline code.

use crate::error::{RetouchError, Result};
use image::{codecs::jpeg::JpegEncoder, DynamicImage, ImageFormat, RgbImage, RgbaImage};
use std::io::Cursor;

/// Service for converting between uploaded bytes and decoded images
pub struct ImageCodec;

impl ImageCodec {
    /// Decode uploaded bytes, detecting the format from content
    ///
    /// # Errors
    /// `RetouchError::Decode` when the bytes are not a supported raster image.
    pub fn decode(bytes: &[u8]) -> Result<DynamicImage> {
        if bytes.is_empty() {
            return Err(RetouchError::decode("empty upload"));
        }
        image::load_from_memory(bytes).map_err(|e| RetouchError::decode(e.to_string()))
    }

    /// Encode an RGB image as baseline JPEG at `quality` (1-100)
    ///
    /// # Examples
    /// ```rust
    /// use image::RgbImage;
    /// use imgly_retouch::services::ImageCodec;
    ///
    /// let bytes = ImageCodec::encode_jpeg(&RgbImage::new(4, 4), 75)?;
    /// assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100)).encode_image(image)?;
        Ok(bytes)
    }

    /// Encode an RGBA image as PNG, keeping the alpha channel
    pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::new());
        image.write_to(&mut cursor, ImageFormat::Png)?;
        Ok(cursor.into_inner())
    }

    /// Short description for log fields, e.g. `640x480 Rgb8`
    #[must_use]
    pub fn describe(image: &DynamicImage) -> String {
        format!("{}x{} {:?}", image.width(), image.height(), image.color())
    }
}
