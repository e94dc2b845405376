//! Error types for retouch operations

use thiserror::Error;

/// Result type alias for retouch operations
pub type Result<T> = std::result::Result<T, RetouchError>;

/// Error kinds surfaced by the pipeline, the removers, the store and the HTTP layer
#[derive(Error, Debug)]
pub enum RetouchError {
    /// No `image` field in the upload, or the field carried an empty filename
    #[error("{0}")]
    MissingFile(String),

    /// Uploaded bytes could not be decoded as a raster image
    #[error("Failed to decode image: {0}")]
    Decode(String),

    /// Background removal or enhancement failed
    #[error("Processing error: {0}")]
    Processing(String),

    /// Download key is not one of the known slots
    #[error("{0}")]
    InvalidImageType(String),

    /// Slot exists but has never been written
    #[error("Not found: {0}")]
    NotFound(String),

    /// Upload exceeded the configured body limit
    #[error("Upload of {size} bytes exceeds the limit of {limit} bytes")]
    PayloadTooLarge { size: usize, limit: usize },

    /// Input/output errors (slot files, upload directory)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image encoding errors
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Model loading or initialization errors
    #[error("Model error: {0}")]
    Model(String),

    /// Model inference errors
    #[error("Inference error: {0}")]
    Inference(String),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RetouchError {
    /// Create a new missing file error
    pub fn missing_file<S: Into<String>>(msg: S) -> Self {
        Self::MissingFile(msg.into())
    }

    /// Create a new decode error
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a new processing error
    pub fn processing<S: Into<String>>(msg: S) -> Self {
        Self::Processing(msg.into())
    }

    /// Create the error returned for unknown download keys
    pub fn invalid_image_type<S: Into<String>>(key: S) -> Self {
        let key = key.into();
        tracing::debug!(key = %key, "rejecting unknown image type");
        Self::InvalidImageType("Invalid image type".to_string())
    }

    /// Create a new not-found error
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new model error
    pub fn model<S: Into<String>>(msg: S) -> Self {
        Self::Model(msg.into())
    }

    /// Create a new inference error
    pub fn inference<S: Into<String>>(msg: S) -> Self {
        Self::Inference(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Create file I/O error with operation context
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: &std::io::Error,
    ) -> Self {
        let path_display = path.as_ref().display();
        Self::Io(std::io::Error::new(
            error.kind(),
            format!("Failed to {} '{}': {}", operation, path_display, error),
        ))
    }

    /// Create configuration error with valid ranges
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
        recommended: Option<T>,
    ) -> Self {
        let recommendation = match recommended {
            Some(rec) => format!(" Recommended: {}", rec),
            None => String::new(),
        };

        Self::InvalidConfig(format!(
            "Invalid {}: {} (valid range: {}).{}",
            parameter, value, valid_range, recommendation
        ))
    }

    /// Create processing error with stage context
    pub fn processing_stage_error(stage: &str, details: &str, input_info: Option<&str>) -> Self {
        let input_context = match input_info {
            Some(info) => format!(" (input: {})", info),
            None => String::new(),
        };

        Self::Processing(format!(
            "Processing failed at stage '{}'{}: {}",
            stage, input_context, details
        ))
    }

    /// HTTP status code reported for this error at the request boundary
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MissingFile(_) | Self::InvalidImageType(_) => 400,
            Self::NotFound(_) => 404,
            Self::PayloadTooLarge { .. } => 413,
            Self::Decode(_)
            | Self::Processing(_)
            | Self::Io(_)
            | Self::Image(_)
            | Self::InvalidConfig(_)
            | Self::Model(_)
            | Self::Inference(_)
            | Self::Internal(_) => 500,
        }
    }
}

impl From<tokio::task::JoinError> for RetouchError {
    fn from(error: tokio::task::JoinError) -> Self {
        Self::Internal(format!("Worker task failed: {error}"))
    }
}
