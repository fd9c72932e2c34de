//! apidoc CLI: split API reference documents into per-section records.
//!
//! Parses markdown API docs into JSON records carrying each section's
//! title, anchor slug, stability, and front matter.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
