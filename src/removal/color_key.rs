//! Border colour keying
//!
//! The background colour is the per-channel median of the border pixels. Every
//! pixel connected to the border through pixels within `tolerance` of that
//! colour is background. Foreground pixels touching the background whose
//! distance lies within `tolerance + feather` get a graded alpha.

use super::{apply_mask, BackgroundRemover};
use crate::{config::ColorKeyConfig, error::Result, types::SegmentationMask};
use image::{DynamicImage, RgbImage, RgbaImage};
use std::collections::VecDeque;
use tracing::debug;

/// Model-free background remover
#[derive(Debug, Clone, Copy)]
pub struct ColorKeyRemover {
    config: ColorKeyConfig,
}

impl ColorKeyRemover {
    #[must_use]
    pub fn new(config: ColorKeyConfig) -> Self {
        Self { config }
    }

    /// Compute the foreground mask for an RGB image
    #[must_use]
    pub fn segment(&self, image: &RgbImage) -> SegmentationMask {
        let (width, height) = image.dimensions();
        let mut mask = SegmentationMask::filled((width, height), 255);
        if width == 0 || height == 0 {
            return mask;
        }

        let key = border_median(image);
        let tolerance = self.config.tolerance;
        let idx = |x: u32, y: u32| y as usize * width as usize + x as usize;
        let distance = |x: u32, y: u32| color_distance(image.get_pixel(x, y).0, key);

        let mut background = vec![false; width as usize * height as usize];
        let mut queue = VecDeque::new();
        for (x, y) in border_coords(width, height) {
            let i = idx(x, y);
            if !background[i] && distance(x, y) <= tolerance {
                background[i] = true;
                queue.push_back((x, y));
            }
        }

        while let Some((x, y)) = queue.pop_front() {
            for (nx, ny) in neighbours(x, y, width, height) {
                let i = idx(nx, ny);
                if !background[i] && distance(nx, ny) <= tolerance {
                    background[i] = true;
                    queue.push_back((nx, ny));
                }
            }
        }

        let feather = self.config.feather;
        for y in 0..height {
            for x in 0..width {
                let i = idx(x, y);
                if background[i] {
                    mask.data[i] = 0;
                    continue;
                }
                if feather <= 0.0 {
                    continue;
                }
                let touches_background = neighbours(x, y, width, height)
                    .any(|(nx, ny)| background[idx(nx, ny)]);
                if touches_background {
                    let ramp = ((distance(x, y) - tolerance) / feather).clamp(0.0, 1.0);
                    mask.data[i] = (ramp * 255.0).round() as u8;
                }
            }
        }

        debug!(
            key = ?key,
            background_ratio = mask.statistics().background_ratio,
            "colour key segmentation"
        );
        mask
    }
}

impl Default for ColorKeyRemover {
    fn default() -> Self {
        Self::new(ColorKeyConfig::default())
    }
}

impl BackgroundRemover for ColorKeyRemover {
    fn name(&self) -> &str {
        "color-key"
    }

    fn remove_background(&self, image: &DynamicImage) -> Result<RgbaImage> {
        let mask = self.segment(&image.to_rgb8());
        apply_mask(image, &mask)
    }
}

fn color_distance(pixel: [u8; 3], key: [u8; 3]) -> f32 {
    pixel
        .iter()
        .zip(key.iter())
        .map(|(&a, &b)| {
            let d = f32::from(a) - f32::from(b);
            d * d
        })
        .sum::<f32>()
        .sqrt()
}

fn border_coords(width: u32, height: u32) -> impl Iterator<Item = (u32, u32)> {
    let top_bottom = (0..width).flat_map(move |x| [(x, 0), (x, height - 1)]);
    let left_right = (0..height).flat_map(move |y| [(0, y), (width - 1, y)]);
    top_bottom.chain(left_right)
}

fn neighbours(x: u32, y: u32, width: u32, height: u32) -> impl Iterator<Item = (u32, u32)> {
    let left = x.checked_sub(1).map(|nx| (nx, y));
    let up = y.checked_sub(1).map(|ny| (x, ny));
    let right = (x + 1 < width).then_some((x + 1, y));
    let down = (y + 1 < height).then_some((x, y + 1));
    [left, up, right, down].into_iter().flatten()
}

fn border_median(image: &RgbImage) -> [u8; 3] {
    let (width, height) = image.dimensions();
    let mut channels: [Vec<u8>; 3] = [Vec::new(), Vec::new(), Vec::new()];
    for (x, y) in border_coords(width, height) {
        let pixel = image.get_pixel(x, y);
        for (c, values) in channels.iter_mut().enumerate() {
            values.push(pixel[c]);
        }
    }

    let mut key = [0u8; 3];
    for (slot, values) in key.iter_mut().zip(channels.iter_mut()) {
        values.sort_unstable();
        *slot = values.get(values.len() / 2).copied().unwrap_or(0);
    }
    key
}
