//! Fixed enhancement pipeline
//!
//! The pipeline turns one RGB image into a brighter-contrast, 3x upscaled,
//! softened and re-sharpened image. Every parameter is a constant; the only knob
//! is whether the two discarded side branches are evaluated.
//!
//! Stage order:
//!
//! 1. brightness, factor [`BRIGHTNESS_FACTOR`]
//! 2. contrast, factor [`CONTRAST_FACTOR`] (the "enhanced" image)
//! 3. sharpness branch, factor [`SHARPNESS_FACTOR`] (discarded)
//! 4. smoothing branch (discarded)
//! 5. bicubic upscale of stage 2 by [`UPSCALE_FACTOR`]
//! 6. 5x5 Gaussian blur
//! 7. 3x3 sharpening kernel, final output
//!
//! Stages 3 and 4 never feed the output. [`EnhancementPipeline::with_side_branches`]
//! evaluates them anyway and hands them back in [`DiscardedBranches`] so callers
//! can confirm the output does not depend on them.

use crate::{
    error::{RetouchError, Result},
    filters,
};
use image::{DynamicImage, RgbImage};
use instant::Instant;
use tracing::{debug, instrument};

/// Brightness factor (identity, kept as an explicit stage)
pub const BRIGHTNESS_FACTOR: f32 = 1.0;

/// Contrast factor applied about the mean grey level
pub const CONTRAST_FACTOR: f32 = 1.1;

/// Sharpness enhancer factor of the discarded branch
pub const SHARPNESS_FACTOR: f32 = 2.0;

/// Linear scale factor of the upscale stage
pub const UPSCALE_FACTOR: u32 = 3;

/// Outputs of the side branches that the reference behaviour computes and drops
#[derive(Debug, Clone)]
pub struct DiscardedBranches {
    /// Stage 3: sharpness-enhanced copy of the contrast-adjusted image
    pub sharpened: RgbImage,
    /// Stage 4: "smooth more" filtered copy of the contrast-adjusted image
    pub smoothed: RgbImage,
}

/// Result of one pipeline run
#[derive(Debug, Clone)]
pub struct PipelineRun {
    /// Final output image
    pub output: RgbImage,
    /// Side branches, present only when they were evaluated
    pub discarded: Option<DiscardedBranches>,
}

/// The enhancement pipeline
#[derive(Debug, Clone, Copy, Default)]
pub struct EnhancementPipeline {
    evaluate_side_branches: bool,
}

impl EnhancementPipeline {
    /// Pipeline that skips the discarded side branches
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pipeline that also evaluates the discarded side branches
    #[must_use]
    pub fn with_side_branches() -> Self {
        Self {
            evaluate_side_branches: true,
        }
    }

    /// Whether side branches are evaluated
    #[must_use]
    pub fn evaluates_side_branches(&self) -> bool {
        self.evaluate_side_branches
    }

    /// Enhance a decoded image, converting it to 8-bit RGB first
    pub fn enhance(&self, image: &DynamicImage) -> Result<RgbImage> {
        Ok(self.run(&image.to_rgb8())?.output)
    }

    /// Run all stages on an RGB image
    ///
    /// # Errors
    /// Fails only if the upscaled dimensions overflow `u32`.
    #[instrument(level = "debug", skip_all, fields(width = input.width(), height = input.height()))]
    pub fn run(&self, input: &RgbImage) -> Result<PipelineRun> {
        let start = Instant::now();

        let brightened = filters::adjust_brightness(input, BRIGHTNESS_FACTOR);
        let enhanced = filters::adjust_contrast(&brightened, CONTRAST_FACTOR);
        debug!(pivot = filters::mean_luma(&brightened), "contrast adjusted");

        let discarded = self.evaluate_side_branches.then(|| DiscardedBranches {
            sharpened: sharpness_branch(&enhanced),
            smoothed: smoothing_branch(&enhanced),
        });

        let upscaled = filters::upscale_bicubic(&enhanced, UPSCALE_FACTOR).ok_or_else(|| {
            RetouchError::processing_stage_error(
                "upscale",
                "scaled dimensions overflow",
                Some(&format!("{}x{}", input.width(), input.height())),
            )
        })?;
        let blurred = filters::gaussian_blur_5x5(&upscaled);
        let output = filters::convolve(&blurred, &filters::SHARPEN_KERNEL, 3);

        debug!(
            output_width = output.width(),
            output_height = output.height(),
            side_branches = discarded.is_some(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "enhancement pipeline finished"
        );

        Ok(PipelineRun { output, discarded })
    }
}

/// Stage 3: sharpness enhancement of the contrast-adjusted image
///
/// Blends away from a 3x3 smoothed copy by [`SHARPNESS_FACTOR`]. The result is
/// never consumed by later stages.
#[must_use]
pub fn sharpness_branch(enhanced: &RgbImage) -> RgbImage {
    let degenerate = filters::convolve_interior(enhanced, &filters::SMOOTH_KERNEL, 3);
    filters::blend(&degenerate, enhanced, SHARPNESS_FACTOR)
}

/// Stage 4: strong smoothing of the contrast-adjusted image
///
/// The result is never consumed by later stages.
#[must_use]
pub fn smoothing_branch(enhanced: &RgbImage) -> RgbImage {
    filters::convolve_interior(enhanced, &filters::SMOOTH_MORE_KERNEL, 5)
}
