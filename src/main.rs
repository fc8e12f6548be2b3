use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod aggregate;
mod composite;
mod config;
mod consolidate;
mod error;
mod insights;
mod loader;
mod models;
mod normalize;
mod output;
mod pipeline;
mod ranking;
mod reliability;
mod runner;

use crate::config::Config;
use crate::output::OutputFormat;
use crate::runner::Runner;

/// LLM Model Ranking CLI - Consolidate evaluation runs and rank the models in them
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML configuration file
    config: PathBuf,

    /// Additional run file (JSON or CSV) to rank, may be repeated
    #[arg(long = "run")]
    runs: Vec<PathBuf>,

    /// Output format: plain or json
    #[arg(short, long, default_value = "plain")]
    output: OutputFormat,

    /// Verbose output - log every pipeline stage and model
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    let config = Config::from_file(&args.config)?;
    let runner = Runner::new(config).with_runs(args.runs);

    let report = runner.run()?;

    output::print_report(&report, args.output);

    Ok(())
}
