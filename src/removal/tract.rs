//! Model-backed background removal using Tract
//!
//! Runs an ISNet-style ONNX segmentation model (`1x3xSxS` in, `1x1xSxS` out)
//! with Tract, a pure Rust inference engine. The output tensor is mapped back
//! onto the original image and applied as alpha.

use super::{apply_mask, BackgroundRemover};
use crate::{
    error::{RetouchError, Result},
    utils::{ImagePreprocessor, PreprocessingConfig},
};
use image::{DynamicImage, GenericImageView, RgbaImage};
use instant::Instant;
use ndarray::Array4;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};
use tract_onnx::prelude::*;

/// Type alias for the optimized, runnable Tract plan
type TractModel = RunnableModel<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Background remover backed by an ONNX segmentation model
pub struct TractRemover {
    model: Mutex<TractModel>,
    preprocessing: PreprocessingConfig,
}

impl TractRemover {
    /// Load and optimize the model at `model_path`
    ///
    /// # Errors
    /// - Model file missing or unreadable
    /// - ONNX graph that Tract cannot optimize
    pub fn from_path<P: AsRef<Path>>(model_path: P, input_size: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let load_start = Instant::now();

        info!(model = %model_path.display(), input_size, "Loading segmentation model");

        let model = onnx()
            .model_for_path(model_path)
            .map_err(|e| {
                RetouchError::model(format!(
                    "Failed to load ONNX model '{}': {e}",
                    model_path.display()
                ))
            })?
            .into_optimized()
            .map_err(|e| RetouchError::model(format!("Failed to optimize model: {e}")))?
            .into_runnable()
            .map_err(|e| RetouchError::model(format!("Failed to create runnable model: {e}")))?;

        info!(
            elapsed_ms = load_start.elapsed().as_millis() as u64,
            "Tract model ready"
        );

        Ok(Self {
            model: Mutex::new(model),
            preprocessing: PreprocessingConfig::imagenet(input_size),
        })
    }

    fn infer(&self, input: &Array4<f32>) -> Result<Array4<f32>> {
        let model = self
            .model
            .lock()
            .map_err(|_| RetouchError::internal("Tract model lock poisoned"))?;

        let inference_start = Instant::now();
        let input_tensor = Tensor::from(input.clone());
        let outputs = model
            .run(tvec![input_tensor.into()])
            .map_err(|e| RetouchError::inference(format!("Tract inference failed: {e}")))?;

        let output_tensor = outputs
            .into_iter()
            .next()
            .ok_or_else(|| RetouchError::inference("No output tensor found"))?
            .into_arc_tensor();

        let output_data = output_tensor.to_array_view::<f32>().map_err(|e| {
            RetouchError::inference(format!("Failed to convert output tensor: {e}"))
        })?;

        let shape = output_data.shape().to_vec();
        if shape.len() != 4 {
            return Err(RetouchError::inference(format!(
                "Expected 4D output tensor, got {}D",
                shape.len()
            )));
        }

        let output_array = Array4::from_shape_vec(
            (
                shape.first().copied().unwrap_or(1),
                shape.get(1).copied().unwrap_or(1),
                shape.get(2).copied().unwrap_or(1),
                shape.get(3).copied().unwrap_or(1),
            ),
            output_data.iter().copied().collect(),
        )
        .map_err(|e| RetouchError::inference(format!("Failed to reshape output tensor: {e}")))?;

        debug!(
            output_shape = ?output_array.shape(),
            elapsed_ms = inference_start.elapsed().as_millis() as u64,
            "Tract inference completed"
        );

        Ok(output_array)
    }
}

impl BackgroundRemover for TractRemover {
    fn name(&self) -> &str {
        "tract"
    }

    fn remove_background(&self, image: &DynamicImage) -> Result<RgbaImage> {
        let input = ImagePreprocessor::preprocess_for_inference(image, &self.preprocessing)?;
        let output = self.infer(&input)?;
        let mask = ImagePreprocessor::tensor_to_mask(&output, image.dimensions())?;
        apply_mask(image, &mask)
    }
}
