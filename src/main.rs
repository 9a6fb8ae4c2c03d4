use std::{
    io::{self, BufRead, Write},
    process::ExitCode,
};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use transit_access::{
    services::{
        BatchGate, StageGate,
        build::{PipelineError, acquire_feeds, process_schedule, run},
    },
    structures::Config,
};

#[derive(Parser)]
#[command(version, about = "Transit and walk accessibility from GTFS and OSM")]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Ask for confirmation before every stage
    #[arg(short, long)]
    interactive: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List registry feeds whose name or URL contains TEXT
    Search { text: String },
    /// Fetch the configured feeds into the data directory
    Download,
    /// Load, interpolate and compute headways, then save the archive
    Process,
    /// Run the whole pipeline and print the accessibility sweep
    Run,
}

fn prompt(stage: &str) -> bool {
    print!("Continue with {stage}? [Y/n] ");
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(_) => !matches!(answer.trim().to_lowercase().as_str(), "n" | "no"),
        Err(_) => false,
    }
}

fn execute(cli: &Cli, config: &Config) -> Result<(), PipelineError> {
    let mut batch = BatchGate;
    let mut interactive = prompt;
    let gate: &mut dyn StageGate = if cli.interactive {
        &mut interactive
    } else {
        &mut batch
    };

    match &cli.command {
        Command::Search { text } => {
            let found = config.feeds.search(text);
            if found.is_empty() {
                println!("No feed matches '{text}'");
            }
            for (name, url) in found {
                println!("{name}\t{url}");
            }
        }
        Command::Download => {
            for (name, path) in acquire_feeds(config)? {
                println!("{name}\t{}", path.display());
            }
        }
        Command::Process => {
            let (tables, report) = process_schedule(config, gate)?;
            println!(
                "{} stop times interpolated, {} headway groups, {} trips excluded",
                tables.stop_times_int.len(),
                report.headways,
                report.interpolation.excluded.len()
            );
        }
        Command::Run => {
            let report = run(config, gate)?;
            for result in &report.results {
                println!("{}", result.summary());
            }
            println!(
                "{} isolated transit stops, {} points skipped, {} monotonicity violations",
                report.isolated_stops,
                report.points_skipped,
                report.violations.len()
            );
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = match Config::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    match execute(&cli, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
