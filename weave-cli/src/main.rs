//! Weave — expand `@kind:value` references in prompt templates.
//!
//! # Usage
//!
//! ```text
//! weave render <template> [--var KEY=VALUE]... [--workflow NAME] [--strict] [--stats]
//! weave inspect <template>
//! weave kinds
//! ```
//!
//! Every command accepts `--config <path>` (default `~/.weave/config.yaml`)
//! and `--doc-root <dir>` to enable the `doc` resolver.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{inspect::InspectArgs, kinds::KindsArgs, render::RenderArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "weave",
    version,
    about = "Resolve @kind:value references in prompt templates",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fill {{variables}}, expand references, print the result.
    Render(RenderArgs),

    /// List the references and variables a template uses.
    Inspect(InspectArgs),

    /// List registered resolver kinds.
    Kinds(KindsArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::Render(args) => args.run(),
        Commands::Inspect(args) => args.run(),
        Commands::Kinds(args) => args.run(),
    }
}

/// Log to stderr; `WEAVE_LOG` takes an `EnvFilter` directive, default `warn`.
fn init_tracing() {
    use std::io::IsTerminal;
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_env("WEAVE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .try_init();
}
