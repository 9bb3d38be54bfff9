//! vendorcss CLI: post-build stylesheet bundler for static sites.
//!
//! Concatenates vendor stylesheets into bundles, rebases their `url(...)`
//! references, purges selectors the generated site never uses, and minifies
//! the result.

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
