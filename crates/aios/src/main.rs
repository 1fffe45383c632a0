//! AIOS - natural-language admin shell.
//!
//! Reads operator requests, classifies them through a local inference
//! service, and executes the matching constrained admin action.

use anyhow::Result;
use tracing::{info, warn, Level};

use aios::config::AiosConfig;
use aios::engine::Engine;

#[tokio::main]
async fn main() -> Result<()> {
    // Log to stderr so the prompt line stays clean.
    tracing_subscriber::fmt()
        .with_max_level(Level::WARN)
        .with_writer(std::io::stderr)
        .init();

    info!("AIOS v{} starting", env!("CARGO_PKG_VERSION"));

    if !nix::unistd::geteuid().is_root() {
        warn!("not running as root; governor and cache actions will be refused");
        eprintln!("Note: running unprivileged. CPU tuning and cache drops need root.");
    }

    let config = AiosConfig::load();
    let mut engine = Engine::new(&config);
    engine.run().await
}
