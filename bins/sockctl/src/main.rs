//! sockctl command - inspect the socket backend registry and create endpoints.

mod commands;
mod output;
mod stack;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sockif::socket::{Result, StackConfig};

use crate::output::{OutputFormat, OutputOptions};
use crate::stack::Stack;

#[derive(Parser)]
#[command(name = "sockctl", version, about = "Socket interface control tool")]
struct Cli {
    /// Output JSON.
    #[arg(short = 'j', long, global = true)]
    json: bool,

    /// Pretty print JSON.
    #[arg(short = 'p', long, global = true)]
    pretty: bool,

    /// Stack configuration file (JSON).
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List registered socket backends.
    #[command(visible_alias = "f", visible_alias = "ls")]
    Families(commands::families::FamiliesCmd),

    /// Create an endpoint and report which backend serves it.
    #[command(visible_alias = "c")]
    Create(commands::create::CreateCmd),
}

fn run(cli: &Cli) -> Result<()> {
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };
    let opts = OutputOptions { pretty: cli.pretty };

    let config = match &cli.config {
        Some(path) => StackConfig::from_path(path)?,
        None => StackConfig::default(),
    };
    let stack = Stack::new(&config)?;

    match &cli.command {
        Command::Families(cmd) => cmd.run(stack.manager.registry(), format, &opts),
        Command::Create(cmd) => cmd.run(&stack.manager, format, &opts),
    }
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so JSON on stdout stays parseable
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
