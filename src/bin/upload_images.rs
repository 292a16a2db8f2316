// Entrypoint for the batch image uploader.
// - Keeps `main` small: set up logging and hand control to the menu loop.
// - Returns `anyhow::Result` so prompt and IO errors surface with context.

use anyhow::Result;
use slidebatch_cli::ui::main_menu;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Diagnostics go to stderr and honor RUST_LOG; the on-screen upload
    // log itself is plain stdout lines from the UI layer.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    // This call blocks until the user exits.
    main_menu()?;
    Ok(())
}
