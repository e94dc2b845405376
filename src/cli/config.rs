//! Conversion of CLI arguments into a server configuration

use crate::cli::main_impl::{Cli, CliRemover};
use crate::config::{RemoverKind, ServerConfig};
use anyhow::{Context, Result};

const MIB: usize = 1024 * 1024;

/// Convert CLI arguments to a validated `ServerConfig`
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Start from the config file (or defaults) and apply command-line overrides
    pub(crate) fn from_cli(cli: &Cli) -> Result<ServerConfig> {
        let mut config = match &cli.config {
            Some(path) => ServerConfig::from_json_file(path)
                .with_context(|| format!("Failed to load {}", path.display()))?,
            None => ServerConfig::default(),
        };

        if let Some(host) = cli.host {
            config.host = host;
        }
        if let Some(port) = cli.port {
            config.port = port;
        }
        if let Some(dir) = &cli.upload_dir {
            config.upload_dir.clone_from(dir);
        }
        if let Some(tolerance) = cli.tolerance {
            config.color_key.tolerance = tolerance;
        }
        if let Some(feather) = cli.feather {
            config.color_key.feather = feather;
        }
        if let Some(mb) = cli.max_upload_mb {
            config.max_upload_bytes = mb.saturating_mul(MIB);
        }

        // --model alone selects the tract remover
        let remover = cli
            .remover
            .or_else(|| cli.model.as_ref().map(|_| CliRemover::Tract));
        match remover {
            Some(CliRemover::ColorKey) => config.remover = RemoverKind::ColorKey,
            Some(CliRemover::Tract) => {
                let model_path = cli
                    .model
                    .clone()
                    .context("--remover tract requires --model <PATH>")?;
                config.remover = RemoverKind::Tract {
                    model_path,
                    input_size: cli.model_size,
                };
            },
            None => {},
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    /// Validate CLI arguments for consistency
    pub(crate) fn validate_cli(cli: &Cli) -> Result<()> {
        if cli.remover == Some(CliRemover::ColorKey) && cli.model.is_some() {
            anyhow::bail!("--model cannot be combined with --remover color-key");
        }
        if cli.model_size == 0 {
            anyhow::bail!("--model-size must be greater than zero");
        }
        if cli.max_upload_mb == Some(0) {
            anyhow::bail!("--max-upload-mb must be greater than zero");
        }
        if let Some(path) = &cli.config {
            if !path.is_file() {
                anyhow::bail!("Configuration file not found: {}", path.display());
            }
        }
        Ok(())
    }
}
