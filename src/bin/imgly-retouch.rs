//! IMG.LY Retouch server
//!
//! HTTP service for background removal and fixed-pipeline photo enhancement.

#[cfg(feature = "cli")]
use imgly_retouch::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Please rebuild with --features cli");
    std::process::exit(1);
}
