//! Properties of the enhancement pipeline observable from outside the crate

mod common;

use common::{gradient_image, solid_image};
use image::{DynamicImage, GenericImageView};
use imgly_retouch::{
    enhance::{sharpness_branch, smoothing_branch, CONTRAST_FACTOR, UPSCALE_FACTOR},
    enhance_bytes, filters, EnhancementPipeline, ImageCodec, Result,
};

#[test]
fn test_output_dimensions_scale_by_three() -> Result<()> {
    let pipeline = EnhancementPipeline::new();
    for (width, height) in [(1, 1), (7, 3), (32, 17), (3, 40)] {
        let run = pipeline.run(&gradient_image(width, height))?;
        assert_eq!(
            run.output.dimensions(),
            (width * UPSCALE_FACTOR, height * UPSCALE_FACTOR)
        );
    }
    Ok(())
}

#[test]
fn test_output_is_byte_identical_across_runs() -> Result<()> {
    let input = gradient_image(23, 11);
    let first = EnhancementPipeline::new().run(&input)?.output;
    let second = EnhancementPipeline::new().run(&input)?.output;
    assert_eq!(first.as_raw(), second.as_raw());

    let jpeg_a = ImageCodec::encode_jpeg(&first, 95)?;
    let jpeg_b = ImageCodec::encode_jpeg(&second, 95)?;
    assert_eq!(jpeg_a, jpeg_b);
    Ok(())
}

#[test]
fn test_side_branches_are_discarded() -> Result<()> {
    let input = gradient_image(16, 16);
    let skipped = EnhancementPipeline::new().run(&input)?;
    let evaluated = EnhancementPipeline::with_side_branches().run(&input)?;

    assert!(!EnhancementPipeline::new().evaluates_side_branches());
    assert!(EnhancementPipeline::with_side_branches().evaluates_side_branches());
    assert_eq!(skipped.output, evaluated.output);

    let branches = evaluated.discarded.expect("branches evaluated");
    let enhanced = filters::adjust_contrast(&input, CONTRAST_FACTOR);
    assert_eq!(branches.sharpened, sharpness_branch(&enhanced));
    assert_eq!(branches.smoothed, smoothing_branch(&enhanced));
    Ok(())
}

#[test]
fn test_jpeg_round_trip_keeps_dimensions() -> Result<()> {
    let output = EnhancementPipeline::new().run(&gradient_image(13, 9))?.output;
    let jpeg = ImageCodec::encode_jpeg(&output, 95)?;
    assert_eq!(ImageCodec::decode(&jpeg)?.dimensions(), (39, 27));
    Ok(())
}

#[test]
fn test_enhance_bytes_accepts_png_and_jpeg() -> Result<()> {
    let rgba = DynamicImage::ImageRgb8(gradient_image(6, 4)).to_rgba8();
    let png = ImageCodec::encode_png(&rgba)?;
    let jpeg = ImageCodec::encode_jpeg(&gradient_image(6, 4), 80)?;

    for input in [png, jpeg] {
        let output = enhance_bytes(&input, 95)?;
        assert_eq!(ImageCodec::decode(&output)?.dimensions(), (18, 12));
    }
    Ok(())
}

#[test]
fn test_identity_factors() {
    let input = gradient_image(9, 9);
    assert_eq!(filters::adjust_brightness(&input, 1.0), input);
    assert_eq!(filters::adjust_contrast(&input, 1.0), input);
}

#[test]
fn test_contrast_pivots_on_mean_grey() {
    // a solid image equals its own mean, contrast leaves it untouched
    let input = solid_image(5, 5, [90, 90, 90]);
    assert_eq!(filters::adjust_contrast(&input, CONTRAST_FACTOR), input);
}

#[test]
fn test_gaussian_kernel_moments() {
    let sum: f32 = filters::GAUSSIAN_5_TAP.iter().sum();
    let variance: f32 = filters::GAUSSIAN_5_TAP
        .iter()
        .enumerate()
        .map(|(i, w)| {
            let offset = i as f32 - 2.0;
            w * offset * offset
        })
        .sum();

    assert!((sum - 1.0).abs() < 1e-6);
    assert!((variance - filters::GAUSSIAN_5_TAP_SIGMA.powi(2)).abs() < 1e-6);
}
