//! Retouch server command line
//!
//! Parses arguments, installs the tracing subscriber and runs the HTTP server.

use super::config::CliConfigBuilder;
use crate::{
    server,
    tracing_config::{TracingConfig, TracingFormat},
};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::net::IpAddr;
use std::path::PathBuf;
use tracing::{debug, info};

/// HTTP service for background removal and photo enhancement
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "imgly-retouch")]
pub struct Cli {
    /// JSON configuration file; flags given on the command line override it
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Interface to bind [default: 127.0.0.1]
    #[arg(long)]
    pub host: Option<IpAddr>,

    /// Port to bind [default: 5000]
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Directory holding the original and processed image slots [default: /uploads]
    #[arg(short, long, value_name = "DIR")]
    pub upload_dir: Option<PathBuf>,

    /// Background remover implementation [default: color-key, or tract when --model is set]
    #[arg(long, value_enum)]
    pub remover: Option<CliRemover>,

    /// ONNX segmentation model for the tract remover
    #[arg(short, long, value_name = "PATH")]
    pub model: Option<PathBuf>,

    /// Square input size of the segmentation model
    #[arg(long, default_value_t = 1024)]
    pub model_size: u32,

    /// Colour-key tolerance (RGB distance)
    #[arg(long)]
    pub tolerance: Option<f32>,

    /// Colour-key feather width (RGB distance)
    #[arg(long)]
    pub feather: Option<f32>,

    /// Largest accepted upload in MiB
    #[arg(long, value_name = "MIB")]
    pub max_upload_mb: Option<usize>,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log output format
    #[arg(long, value_enum, default_value_t = CliLogFormat::Console)]
    pub log_format: CliLogFormat,

    /// Explicit tracing filter directives (overrides -v), e.g. "imgly_retouch=trace"
    #[arg(long, value_name = "DIRECTIVES")]
    pub log_filter: Option<String>,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliRemover {
    ColorKey,
    Tract,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliLogFormat {
    Console,
    Compact,
    #[cfg(feature = "tracing-json")]
    Json,
}

impl From<CliLogFormat> for TracingFormat {
    fn from(format: CliLogFormat) -> Self {
        match format {
            CliLogFormat::Console => Self::Console,
            CliLogFormat::Compact => Self::Compact,
            #[cfg(feature = "tracing-json")]
            CliLogFormat::Json => Self::Json,
        }
    }
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(&cli).context("Failed to initialize tracing")?;

    CliConfigBuilder::validate_cli(&cli).context("Invalid CLI arguments")?;
    let config = CliConfigBuilder::from_cli(&cli).context("Failed to build configuration")?;

    info!(version = env!("CARGO_PKG_VERSION"), "starting imgly-retouch");
    debug!(?config, "resolved configuration");

    server::serve(&config)
        .await
        .context("Retouch server failed")?;

    info!("server stopped");
    Ok(())
}

fn init_tracing(cli: &Cli) -> Result<()> {
    let mut tracing_config = TracingConfig::new()
        .with_verbosity(cli.verbose)
        .with_format(cli.log_format.into());
    if let Some(filter) = &cli.log_filter {
        tracing_config = tracing_config.with_env_filter(filter);
    }
    tracing_config.init()
}
