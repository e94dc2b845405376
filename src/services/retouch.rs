//! Request-level operations of the retouch service
//!
//! [`RetouchService`] owns the injected remover and store and runs all CPU
//! work on the blocking pool. The HTTP layer only translates requests and
//! responses around it.

use super::ImageCodec;
use crate::{
    config::ServerConfig,
    enhance::EnhancementPipeline,
    error::{RetouchError, Result},
    removal::BackgroundRemover,
    store::ImageStore,
    types::{ImageSlot, UploadReceipt},
};
use instant::Instant;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Background removal, enhancement upload and slot download
pub struct RetouchService {
    remover: Arc<dyn BackgroundRemover>,
    store: Arc<dyn ImageStore>,
    pipeline: EnhancementPipeline,
    original_jpeg_quality: u8,
    processed_jpeg_quality: u8,
    max_upload_bytes: usize,
}

impl RetouchService {
    /// Create a service using the qualities and limits from `config`
    pub fn new(
        config: &ServerConfig,
        remover: Arc<dyn BackgroundRemover>,
        store: Arc<dyn ImageStore>,
    ) -> Self {
        Self {
            remover,
            store,
            pipeline: EnhancementPipeline::new(),
            original_jpeg_quality: config.original_jpeg_quality,
            processed_jpeg_quality: config.processed_jpeg_quality,
            max_upload_bytes: config.max_upload_bytes,
        }
    }

    /// Replace the enhancement pipeline (e.g. one that evaluates side branches)
    #[must_use]
    pub fn with_pipeline(mut self, pipeline: EnhancementPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Name of the injected background remover
    #[must_use]
    pub fn remover_name(&self) -> &str {
        self.remover.name()
    }

    /// Largest accepted upload in bytes
    #[must_use]
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    /// Reject payloads over the configured limit
    pub fn check_upload_size(&self, size: usize) -> Result<()> {
        if size > self.max_upload_bytes {
            return Err(RetouchError::PayloadTooLarge {
                size,
                limit: self.max_upload_bytes,
            });
        }
        Ok(())
    }

    /// Decode `bytes`, remove the background and return the result as PNG
    #[instrument(skip_all, fields(size = bytes.len(), remover = self.remover.name()))]
    pub async fn remove_background(&self, bytes: Vec<u8>) -> Result<Vec<u8>> {
        self.check_upload_size(bytes.len())?;
        let remover = Arc::clone(&self.remover);
        let start = Instant::now();

        let png = tokio::task::spawn_blocking(move || {
            let image = ImageCodec::decode(&bytes)?;
            debug!(image = %ImageCodec::describe(&image), "decoded upload");
            let cutout = remover.remove_background(&image)?;
            ImageCodec::encode_png(&cutout)
        })
        .await??;

        info!(
            output_size = png.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "background removed"
        );
        Ok(png)
    }

    /// Store the original, run the enhancement pipeline and store its output
    ///
    /// The original is written before the pipeline runs, so a pipeline failure
    /// leaves the new original next to the previous processed image.
    #[instrument(skip_all, fields(size = bytes.len()))]
    pub async fn upload(&self, bytes: Vec<u8>) -> Result<UploadReceipt> {
        self.check_upload_size(bytes.len())?;
        let start = Instant::now();
        let original_quality = self.original_jpeg_quality;

        let (rgb, original_jpeg) = tokio::task::spawn_blocking(move || {
            let image = ImageCodec::decode(&bytes)?;
            debug!(image = %ImageCodec::describe(&image), "decoded upload");
            let rgb = image.to_rgb8();
            let jpeg = ImageCodec::encode_jpeg(&rgb, original_quality)?;
            Ok::<_, RetouchError>((rgb, jpeg))
        })
        .await??;

        self.store.put(ImageSlot::Original, original_jpeg).await?;

        let pipeline = self.pipeline;
        let processed_quality = self.processed_jpeg_quality;
        let processed_jpeg = tokio::task::spawn_blocking(move || {
            let run = pipeline.run(&rgb)?;
            ImageCodec::encode_jpeg(&run.output, processed_quality)
        })
        .await??;

        self.store.put(ImageSlot::Processed, processed_jpeg).await?;

        info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            "upload processed"
        );
        Ok(UploadReceipt::for_slot(ImageSlot::Processed))
    }

    /// Bytes currently stored in `slot`
    pub async fn download(&self, slot: ImageSlot) -> Result<Vec<u8>> {
        self.store.get(slot).await
    }
}
