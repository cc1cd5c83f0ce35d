//! calosum CLI
//!
//! Runs the calorimeter signal aggregation over simulated events and writes
//! one record per event.
#![allow(
    clippy::uninlined_format_args,
    clippy::cast_precision_loss,
    clippy::too_many_lines
)]

use clap::{Parser, Subcommand};

use calosum_core::{DetectorConfig, EventSink, Subdetector};
use calosum_io::{
    load_config, process_files, summarize_events, CollectionSummary, CsvEventWriter,
    EventFileReader, JsonLinesEventWriter,
};
use calosum_pipeline::{FailurePolicy, RunConfig};
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error: {0}")]
    CalosumIo(#[from] calosum_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] calosum_core::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Calorimeter signal aggregation for the HGCAL test-beam simulation.
#[derive(Parser)]
#[command(name = "calosum")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate events into per-event calorimeter records
    Process {
        /// Input events file(s), JSON lines; each file gets its own noise stream
        #[arg(required = true)]
        input: Vec<PathBuf>,

        /// Output file path (.csv, or .json/.jsonl for JSON lines)
        #[arg(short, long)]
        output: PathBuf,

        /// Detector configuration file (JSON); test-beam defaults if omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Run seed for noise generation
        #[arg(short, long, default_value = "0")]
        seed: u64,

        /// Process events on all cores
        #[arg(short, long)]
        parallel: bool,

        /// Stop at the first event that cannot be processed
        #[arg(long)]
        abort_on_error: bool,
    },

    /// Print the detector configuration as JSON
    Config {
        /// Configuration file to validate and print instead of the defaults
        #[arg(short, long)]
        from: Option<PathBuf>,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show information about an events file
    Info {
        /// Input events file
        input: PathBuf,

        /// Detector configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn load_or_default(path: Option<&Path>) -> Result<DetectorConfig> {
    match path {
        Some(path) => Ok(load_config(path)?),
        None => Ok(DetectorConfig::default()),
    }
}

fn open_sink(output: &Path, verbose: bool) -> Result<Box<dyn EventSink>> {
    let format = output
        .extension()
        .and_then(|ext| ext.to_str())
        .map_or_else(|| "csv".to_string(), |ext| ext.to_lowercase());
    let sink: Box<dyn EventSink> = match format.as_str() {
        "csv" => Box::new(CsvEventWriter::create(output)?),
        "json" | "jsonl" => Box::new(JsonLinesEventWriter::create(output)?),
        _ => {
            if verbose {
                eprintln!("Unknown extension '{}', defaulting to CSV", format);
            }
            Box::new(CsvEventWriter::create(output)?)
        }
    };
    Ok(sink)
}

fn layer_range(summary: &CollectionSummary) -> String {
    match (summary.min_layers, summary.max_layers) {
        (Some(min), Some(max)) if min == max => min.to_string(),
        (Some(min), Some(max)) => format!("{}-{}", min, max),
        _ => "-".to_string(),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match cli.command {
        Commands::Process {
            input,
            output,
            config,
            seed,
            parallel,
            abort_on_error,
        } => {
            let detector = load_or_default(config.as_deref())?;
            detector.validate()?;

            let failure_policy = if abort_on_error {
                FailurePolicy::Abort
            } else {
                FailurePolicy::Skip
            };
            let run = RunConfig::new(seed).with_failure_policy(failure_policy);

            if cli.verbose {
                eprintln!("Processing {} file(s)...", input.len());
                eprintln!("Seed: {}", seed);
                eprintln!("Failure policy: {:?}", failure_policy);
                eprintln!("Writing output to: {}", output.display());
            }

            let start = Instant::now();
            let mut sink = open_sink(&output, cli.verbose)?;
            let total = process_files(&detector, &input, &run, parallel, &mut *sink)?;

            let elapsed = start.elapsed();
            println!(
                "Processed {} files in {:.2}s",
                input.len(),
                elapsed.as_secs_f64()
            );
            println!("Events recorded: {}", total.processed);
            println!("Events skipped: {}", total.skipped);
        }

        Commands::Config { from, output } => {
            let detector = load_or_default(from.as_deref())?;
            let json = serde_json::to_string_pretty(&detector)?;
            match output {
                Some(path) => std::fs::write(path, json + "\n")?,
                None => println!("{}", json),
            }
        }

        Commands::Info { input, config } => {
            let detector = load_or_default(config.as_deref())?;
            let reader = EventFileReader::open(&input)?;
            let file_size = reader.file_size();

            println!("File: {}", input.display());
            println!(
                "Size: {} bytes ({:.2} MB)",
                file_size,
                file_size as f64 / 1_000_000.0
            );

            let summary = summarize_events(&detector, reader.events()?)?;

            println!("Events: {}", summary.events);
            if summary.duplicate_ids > 0 {
                println!("Repeated event ids: {}", summary.duplicate_ids);
            }
            println!("Step energy deposited: {:.4}", summary.step_edep);
            println!(
                "{:<8} | {:<24} | {:<8} | {:<8} | {:<12} | {:<16} | {:<8}",
                "Detector", "Collection", "Layers", "Seen", "Wrong layers", "Raw energy", "Missing"
            );
            println!("{:-<106}", "");
            for detector_id in Subdetector::ALL {
                let sub = detector.subdetector(detector_id);
                let seen = summary.collection(detector_id);
                println!(
                    "{:<8} | {:<24} | {:<8} | {:<8} | {:<12} | {:<16.4} | {:<8}",
                    detector_id.name(),
                    sub.collection,
                    sub.layers,
                    layer_range(seen),
                    seen.layer_mismatches,
                    seen.raw_energy,
                    seen.missing
                );
            }
        }
    }

    Ok(())
}
