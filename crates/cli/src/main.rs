use clap::Parser;
use std::process::ExitCode;

mod commands;
mod execute;
mod global;
mod output;

use commands::Commands;
use global::GlobalArgs;

#[derive(Parser)]
#[command(name = "syntaxfix")]
#[command(about = "Run syntax-correction tools across a repository", long_about = None)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> eyre::Result<ExitCode> {
    color_eyre::install()?;

    if let Err(e) = syntaxfix_utils::tracing::init() {
        eprintln!("failed to initialize logging: {e}");
    }

    let cli = Cli::parse();
    cli.command.execute(&cli.global).await
}
