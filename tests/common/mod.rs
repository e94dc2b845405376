//! Shared helpers for integration tests: stub removers, images and multipart requests

#![allow(dead_code)]

use image::{DynamicImage, GenericImageView, Rgb, RgbImage, RgbaImage};
use imgly_retouch::{
    apply_mask,
    server::{multipart::encode_file_part, ApiRequest},
    BackgroundRemover, ImageCodec, ImageStore, MemoryImageStore, Result, RetouchError,
    RetouchService, SegmentationMask, ServerConfig,
};
use std::sync::Arc;
use tiny_http::Method;

/// Remover that classifies every pixel as background
pub struct AllBackgroundRemover;

impl BackgroundRemover for AllBackgroundRemover {
    fn name(&self) -> &str {
        "all-background"
    }

    fn remove_background(&self, image: &DynamicImage) -> Result<RgbaImage> {
        apply_mask(image, &SegmentationMask::filled(image.dimensions(), 0))
    }
}

/// Remover that always fails, standing in for a broken segmentation model
pub struct FailingRemover;

pub const FAILING_REMOVER_MESSAGE: &str = "segmentation model unavailable";

impl BackgroundRemover for FailingRemover {
    fn name(&self) -> &str {
        "failing"
    }

    fn remove_background(&self, _image: &DynamicImage) -> Result<RgbaImage> {
        Err(RetouchError::processing(FAILING_REMOVER_MESSAGE))
    }
}

/// Diagonal colour gradient
pub fn gradient_image(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            ((x + y) % 256) as u8,
        ])
    })
}

/// Solid colour image
pub fn solid_image(width: u32, height: u32, colour: [u8; 3]) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb(colour))
}

pub fn jpeg_bytes(image: &RgbImage) -> Vec<u8> {
    ImageCodec::encode_jpeg(image, 90).expect("encode test JPEG")
}

pub fn png_bytes(image: &RgbImage) -> Vec<u8> {
    let rgba = DynamicImage::ImageRgb8(image.clone()).to_rgba8();
    ImageCodec::encode_png(&rgba).expect("encode test PNG")
}

/// Service over an in-memory store, returned together with the store
pub fn memory_service(
    remover: Arc<dyn BackgroundRemover>,
) -> (RetouchService, Arc<MemoryImageStore>) {
    memory_service_with_config(&ServerConfig::default(), remover)
}

pub fn memory_service_with_config(
    config: &ServerConfig,
    remover: Arc<dyn BackgroundRemover>,
) -> (RetouchService, Arc<MemoryImageStore>) {
    let store = Arc::new(MemoryImageStore::new());
    let service = RetouchService::new(config, remover, Arc::clone(&store) as Arc<dyn ImageStore>);
    (service, store)
}

/// `POST url` with a single multipart file part
pub fn multipart_post(url: &str, field: &str, file_name: &str, bytes: &[u8]) -> ApiRequest {
    let (content_type, body) = encode_file_part(field, file_name, bytes);
    ApiRequest::new(Method::Post, url).with_body(content_type, body)
}

/// `POST url` with the image as field `image`
pub fn image_post(url: &str, bytes: &[u8]) -> ApiRequest {
    multipart_post(url, "image", "input.jpg", bytes)
}

pub fn get(url: &str) -> ApiRequest {
    ApiRequest::new(Method::Get, url)
}
