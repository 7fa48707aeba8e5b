mod cli;
mod run;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = cli::Cli::parse();
    match cli.command {
        cli::Command::List { dir, json } => run::list(&dir, json),
        cli::Command::Render {
            dir,
            pattern,
            frames,
            size,
            grid,
            bpm,
            out,
        } => run::render(run::RenderOptions {
            dir,
            pattern,
            frames,
            size,
            grid,
            bpm,
            out,
        }),
    }
}
