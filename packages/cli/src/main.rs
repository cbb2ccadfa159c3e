mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{
    catalog, check, check_script, init, inspect, run, style, CatalogArgs, CheckArgs,
    CheckScriptArgs, InitArgs, InspectArgs, RunArgs, StyleArgs,
};
use config::Config;
use tracing_subscriber::EnvFilter;

/// Widgetforge CLI - widget trees and workflows for no-code pages
#[derive(Parser, Debug)]
#[command(name = "widgetforge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Tracing filter, overrides the config (RUST_LOG wins over both)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Initialize a data directory with a sample widget and workflow
    Init(InitArgs),

    /// Print a widget's node tree
    Inspect(InspectArgs),

    /// Print the CSS projected from a widget's nodes
    Style(StyleArgs),

    /// Fire a trigger against a project's workflows
    Run(RunArgs),

    /// List the built-in actions
    Catalog(CatalogArgs),

    /// Check a project's workflows for missing config and script errors
    Check(CheckArgs),

    /// Check a custom code script, optionally running it
    CheckScript(CheckScriptArgs),
}

fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match std::env::current_dir() {
        Ok(dir) => dispatch(cli, &dir.display().to_string()).await,
        Err(err) => Err(anyhow::anyhow!("Cannot get current directory: {}", err)),
    };

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}

async fn dispatch(cli: Cli, cwd: &str) -> anyhow::Result<()> {
    let config = Config::load(cwd)?;
    init_tracing(cli.log_level.as_deref().unwrap_or(&config.log_level));

    match cli.command {
        Command::Init(args) => init(args, cwd).await,
        Command::Inspect(args) => inspect(args, &config, cwd).await,
        Command::Style(args) => style(args, &config, cwd).await,
        Command::Run(args) => run(args, &config, cwd).await,
        Command::Catalog(args) => catalog(args),
        Command::Check(args) => check(args, &config, cwd).await,
        Command::CheckScript(args) => check_script(args, &config),
    }
}
