//! Developer CLI for Decree.
//!
//! Usage:
//! ```bash
//! decree syntax "ban|b <target> [reason]"   # Parse a syntax string
//! decree manifest decree.toml               # Validate a container manifest
//! decree inspect                            # Compile the linked containers
//! decree inspect --manifest decree.toml     # Compile the containers a manifest enables
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod demo;

#[derive(Debug, Parser)]
#[command(name = "decree", author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse a syntax string and print its fragments
    Syntax(commands::syntax::SyntaxArgs),

    /// Load and validate a container manifest
    Manifest(commands::manifest::ManifestArgs),

    /// Compile the containers linked into this binary
    Inspect(commands::inspect::InspectArgs),
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Syntax(_) => f.debug_tuple("Syntax").finish(),
            Self::Manifest(_) => f.debug_tuple("Manifest").finish(),
            Self::Inspect(_) => f.debug_tuple("Inspect").finish(),
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("info".parse().context("failed to parse log directive")?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Command::Syntax(args) => commands::syntax::run(args),
        Command::Manifest(args) => commands::manifest::run(args),
        Command::Inspect(args) => commands::inspect::run(args),
    }
}
