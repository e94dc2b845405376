//! Configuration types for the retouch service

use crate::error::{RetouchError, Result};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

/// Default listening port
pub const DEFAULT_PORT: u16 = 5000;

/// Default directory holding the two image slots
pub const DEFAULT_UPLOAD_DIR: &str = "/uploads";

/// Default upload limit (32 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

/// Parameters of the colour-key background remover
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorKeyConfig {
    /// RGB distance within which a pixel counts as background
    pub tolerance: f32,
    /// Extra distance over which alpha ramps from 0 to 255
    pub feather: f32,
}

impl Default for ColorKeyConfig {
    fn default() -> Self {
        Self {
            tolerance: 40.0,
            feather: 16.0,
        }
    }
}

/// Which background remover the server runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RemoverKind {
    /// Model-free border colour keying
    ColorKey,
    /// ONNX segmentation model run through Tract
    Tract {
        /// Path to the `.onnx` model file
        model_path: PathBuf,
        /// Square input size expected by the model
        input_size: u32,
    },
}

impl Default for RemoverKind {
    fn default() -> Self {
        Self::ColorKey
    }
}

impl std::fmt::Display for RemoverKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ColorKey => write!(f, "color-key"),
            Self::Tract { .. } => write!(f, "tract"),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: IpAddr,
    /// Port to bind
    pub port: u16,
    /// Directory holding `original_image.jpg` and `processed_image.jpg`
    pub upload_dir: PathBuf,
    /// JPEG quality for the re-encoded original (1-100)
    pub original_jpeg_quality: u8,
    /// JPEG quality for the pipeline output (1-100)
    pub processed_jpeg_quality: u8,
    /// Largest accepted request body in bytes
    pub max_upload_bytes: usize,
    /// Background remover selection
    pub remover: RemoverKind,
    /// Colour-key remover parameters
    pub color_key: ColorKeyConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            original_jpeg_quality: 75,
            processed_jpeg_quality: 95,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            remover: RemoverKind::ColorKey,
            color_key: ColorKeyConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create a new configuration builder
    #[must_use]
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::new()
    }

    /// Socket address the server binds to
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Load a configuration from a JSON file; missing fields take their defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| RetouchError::file_io_error("read config file", path, &e))?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            RetouchError::invalid_config(format!("{}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.original_jpeg_quality) {
            return Err(RetouchError::config_value_error(
                "original JPEG quality",
                self.original_jpeg_quality,
                "1-100",
                Some(75),
            ));
        }
        if !(1..=100).contains(&self.processed_jpeg_quality) {
            return Err(RetouchError::config_value_error(
                "processed JPEG quality",
                self.processed_jpeg_quality,
                "1-100",
                Some(95),
            ));
        }
        if self.max_upload_bytes == 0 {
            return Err(RetouchError::invalid_config(
                "Upload limit must be greater than zero",
            ));
        }
        if !(self.color_key.tolerance >= 0.0 && self.color_key.tolerance.is_finite()) {
            return Err(RetouchError::config_value_error(
                "colour-key tolerance",
                self.color_key.tolerance,
                ">= 0",
                Some(40.0),
            ));
        }
        if !(self.color_key.feather >= 0.0 && self.color_key.feather.is_finite()) {
            return Err(RetouchError::config_value_error(
                "colour-key feather",
                self.color_key.feather,
                ">= 0",
                Some(16.0),
            ));
        }
        if let RemoverKind::Tract { input_size, .. } = &self.remover {
            if *input_size == 0 {
                return Err(RetouchError::invalid_config(
                    "Model input size must be greater than zero",
                ));
            }
        }
        Ok(())
    }
}

/// Builder for `ServerConfig`
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    #[must_use]
    pub fn host(mut self, host: IpAddr) -> Self {
        self.config.host = host;
        self
    }

    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    #[must_use]
    pub fn upload_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.config.upload_dir = dir.into();
        self
    }

    #[must_use]
    pub fn original_jpeg_quality(mut self, quality: u8) -> Self {
        self.config.original_jpeg_quality = quality.clamp(1, 100);
        self
    }

    #[must_use]
    pub fn processed_jpeg_quality(mut self, quality: u8) -> Self {
        self.config.processed_jpeg_quality = quality.clamp(1, 100);
        self
    }

    #[must_use]
    pub fn max_upload_bytes(mut self, bytes: usize) -> Self {
        self.config.max_upload_bytes = bytes;
        self
    }

    #[must_use]
    pub fn remover(mut self, remover: RemoverKind) -> Self {
        self.config.remover = remover;
        self
    }

    #[must_use]
    pub fn color_key(mut self, color_key: ColorKeyConfig) -> Self {
        self.config.color_key = color_key;
        self
    }

    /// Build the configuration
    ///
    /// # Errors
    /// Returns `RetouchError::InvalidConfig` when a value is out of range.
    pub fn build(self) -> Result<ServerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ServerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_service() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 5000);
        assert_eq!(config.upload_dir, PathBuf::from("/uploads"));
        assert_eq!(config.original_jpeg_quality, 75);
        assert_eq!(config.processed_jpeg_quality, 95);
        assert_eq!(config.remover, RemoverKind::ColorKey);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_chain() {
        let config = ServerConfig::builder()
            .port(8080)
            .upload_dir("/tmp/slots")
            .processed_jpeg_quality(150)
            .build()
            .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.upload_dir, PathBuf::from("/tmp/slots"));
        assert_eq!(config.processed_jpeg_quality, 100);
        assert_eq!(config.bind_addr().port(), 8080);
    }

    #[test]
    fn test_validation_failures() {
        let mut config = ServerConfig::default();
        config.original_jpeg_quality = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("original JPEG quality"));
        assert!(err.to_string().contains("1-100"));

        let result = ServerConfig::builder().max_upload_bytes(0).build();
        assert!(result.is_err());

        let result = ServerConfig::builder()
            .color_key(ColorKeyConfig {
                tolerance: -1.0,
                feather: 0.0,
            })
            .build();
        assert!(result.is_err());

        let result = ServerConfig::builder()
            .remover(RemoverKind::Tract {
                model_path: PathBuf::from("model.onnx"),
                input_size: 0,
            })
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_json_with_partial_fields() {
        let config: ServerConfig =
            serde_json::from_str(r#"{"port": 9000, "remover": {"kind": "color_key"}}"#).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.processed_jpeg_quality, 95);

        let config: ServerConfig = serde_json::from_str(
            r#"{"remover": {"kind": "tract", "model_path": "isnet.onnx", "input_size": 1024}}"#,
        )
        .unwrap();
        assert_eq!(config.remover.to_string(), "tract");
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("retouch.json");
        std::fs::write(&path, r#"{"port": 7000, "max_upload_bytes": 1024}"#).unwrap();

        let config = ServerConfig::from_json_file(&path).unwrap();
        assert_eq!(config.port, 7000);
        assert_eq!(config.max_upload_bytes, 1024);

        assert!(ServerConfig::from_json_file(dir.path().join("missing.json")).is_err());
    }
}
