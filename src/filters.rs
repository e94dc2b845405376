//! Pixel transforms used by the enhancement pipeline
//!
//! Point operations (brightness, contrast, blending) are implemented directly on
//! `RgbImage` buffers and truncate toward zero before clamping, like PIL's blend. Neighbourhood operations go through `imageproc`, which
//! replicates edge pixels when a kernel reaches past the image border and
//! clamps results into the `u8` range.

use image::{imageops::FilterType, RgbImage};
use imageproc::{
    definitions::Clamp,
    filter::{separable_filter_equal, Kernel},
};

/// 5-tap Gaussian used for the 5x5 blur stage
///
/// This is the fixed small-kernel table `[1 4 6 4 1] / 16` that OpenCV selects for
/// a 5-tap kernel when sigma is left at zero. Its standard deviation is exactly 1.0.
pub const GAUSSIAN_5_TAP: [f32; 5] = [0.0625, 0.25, 0.375, 0.25, 0.0625];

/// Standard deviation of [`GAUSSIAN_5_TAP`]
pub const GAUSSIAN_5_TAP_SIGMA: f32 = 1.0;

/// Final 3x3 sharpening kernel, row-major
pub const SHARPEN_KERNEL: [f32; 9] = [
    0.0, -0.1, 0.0, //
    -0.1, 1.5, -0.1, //
    0.0, -0.1, 0.0,
];

/// 3x3 smoothing kernel used as the degenerate image of the sharpness enhancer
pub const SMOOTH_KERNEL: [f32; 9] = [
    1.0 / 13.0, 1.0 / 13.0, 1.0 / 13.0, //
    1.0 / 13.0, 5.0 / 13.0, 1.0 / 13.0, //
    1.0 / 13.0, 1.0 / 13.0, 1.0 / 13.0,
];

/// 5x5 "smooth more" kernel
pub const SMOOTH_MORE_KERNEL: [f32; 25] = [
    0.01, 0.01, 0.01, 0.01, 0.01, //
    0.01, 0.05, 0.05, 0.05, 0.01, //
    0.01, 0.05, 0.44, 0.05, 0.01, //
    0.01, 0.05, 0.05, 0.05, 0.01, //
    0.01, 0.01, 0.01, 0.01, 0.01,
];

/// Convert an RGB triple to 8-bit luma using ITU-R 601 weights in 16.16 fixed point
#[must_use]
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    let weighted = u32::from(r) * 19_595 + u32::from(g) * 38_470 + u32::from(b) * 7_471;
    ((weighted + 0x8000) >> 16) as u8
}

/// Mean grey level of the image, rounded half up
///
/// Returns 0 for an image without pixels.
#[must_use]
pub fn mean_luma(image: &RgbImage) -> u8 {
    let count = u64::from(image.width()) * u64::from(image.height());
    if count == 0 {
        return 0;
    }

    let sum: u64 = image
        .pixels()
        .map(|p| u64::from(luma(p[0], p[1], p[2])))
        .sum();

    ((sum as f64 / count as f64) + 0.5) as u8
}

fn to_channel(value: f32) -> u8 {
    value.trunc().clamp(0.0, 255.0) as u8
}

/// Interpolate between a degenerate image and `image`: `degenerate + factor * (image - degenerate)`
///
/// A factor of 1.0 returns `image`, 0.0 returns `degenerate`, values above 1.0 extrapolate.
///
/// # Panics
/// Panics if the two images differ in size.
#[must_use]
pub fn blend(degenerate: &RgbImage, image: &RgbImage, factor: f32) -> RgbImage {
    assert_eq!(
        degenerate.dimensions(),
        image.dimensions(),
        "blend operands must have equal dimensions"
    );

    let mut out = image.clone();
    for (dst, (d, s)) in out
        .iter_mut()
        .zip(degenerate.iter().zip(image.iter()))
    {
        let d = f32::from(*d);
        *dst = to_channel(d + factor * (f32::from(*s) - d));
    }
    out
}

/// Scale every channel towards black: `out = in * factor`
#[must_use]
pub fn adjust_brightness(image: &RgbImage, factor: f32) -> RgbImage {
    let mut out = image.clone();
    for channel in out.iter_mut() {
        *channel = to_channel(f32::from(*channel) * factor);
    }
    out
}

/// Scale channel values about the image's mean grey level
#[must_use]
pub fn adjust_contrast(image: &RgbImage, factor: f32) -> RgbImage {
    let pivot = f32::from(mean_luma(image));
    let mut out = image.clone();
    for channel in out.iter_mut() {
        *channel = to_channel(pivot + factor * (f32::from(*channel) - pivot));
    }
    out
}

/// Convolve with a square kernel, keeping the outer border pixels from the input
///
/// Pixels closer than `size / 2` to an edge are copied unchanged, so only the
/// interior is filtered.
#[must_use]
pub fn convolve_interior(image: &RgbImage, kernel: &[f32], size: u32) -> RgbImage {
    let filtered = convolve(image, kernel, size);
    let margin = size / 2;
    let (width, height) = image.dimensions();

    let mut out = image.clone();
    if width <= 2 * margin || height <= 2 * margin {
        return out;
    }
    for y in margin..height - margin {
        for x in margin..width - margin {
            out.put_pixel(x, y, *filtered.get_pixel(x, y));
        }
    }
    out
}

/// Same-size convolution with a square kernel and replicated edges
///
/// # Panics
/// Panics if `kernel.len() != size * size`.
#[must_use]
pub fn convolve(image: &RgbImage, kernel: &[f32], size: u32) -> RgbImage {
    Kernel::new(kernel, size, size).filter(image, |channel, acc: f32| {
        *channel = <u8 as Clamp<f32>>::clamp(acc);
    })
}

/// Separable 5x5 Gaussian blur with the fixed [`GAUSSIAN_5_TAP`] kernel
#[must_use]
pub fn gaussian_blur_5x5(image: &RgbImage) -> RgbImage {
    separable_filter_equal(image, &GAUSSIAN_5_TAP)
}

/// Resize by an integer factor in both dimensions using bicubic (Catmull-Rom) sampling
///
/// Returns `None` if the scaled dimensions do not fit in `u32`.
#[must_use]
pub fn upscale_bicubic(image: &RgbImage, factor: u32) -> Option<RgbImage> {
    let width = image.width().checked_mul(factor)?;
    let height = image.height().checked_mul(factor)?;
    Some(image::imageops::resize(
        image,
        width,
        height,
        FilterType::CatmullRom,
    ))
}
