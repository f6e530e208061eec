//! recipepull CLI: resumable Rakuten recipe ranking batch.
//!
//! Walks the recipe category taxonomy, pulls each category's top recipes, and
//! publishes them to the recipe store, checkpointing after every category.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
