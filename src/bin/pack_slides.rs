// Entrypoint for the slide bundle packer.
// - Takes an optional base directory argument, defaulting to the
//   working directory, like the script it replaces.
// - All log lines go to `pack_mrxs.log` inside the base directory;
//   stdout only carries the per-archive and summary lines.

use anyhow::{Context, Result};
use slidebatch_cli::packer;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let base_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    anyhow::ensure!(
        base_dir.is_dir(),
        "{} is not a directory",
        base_dir.display()
    );

    let log_file = std::fs::File::options()
        .create(true)
        .append(true)
        .open(base_dir.join("pack_mrxs.log"))
        .context("Failed to open pack_mrxs.log")?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_ansi(false)
        .with_writer(Arc::new(log_file))
        .init();

    let summary = packer::pack_slide_bundles(&base_dir)?;
    println!(
        "Packed {} bundle(s), {} failure(s).",
        summary.archives.len(),
        summary.failures.len()
    );
    Ok(())
}
