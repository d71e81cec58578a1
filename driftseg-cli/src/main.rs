//! driftseg command-line interface.
//!
//! Reconstructs drift-tube segments from JSON-lines event files.
#![allow(
    clippy::uninlined_format_args,
    clippy::cast_precision_loss,
    clippy::too_many_lines
)]

use clap::{Parser, Subcommand};

use driftseg_algorithms::{
    reconstruct_event_with_statistics, ReconstructionConfig, ReconstructionStatistics,
    SegmentReconstructor,
};
use driftseg_io::{load_config, EventFileReader, EventRecord, SegmentFileWriter};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    DriftsegIo(#[from] driftseg_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] driftseg_core::Error),
}

/// Drift-tube chamber segment reconstruction.
#[derive(Parser)]
#[command(name = "driftseg")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconstruct segments from an event file
    Reconstruct {
        /// Input event file (JSON lines)
        input: PathBuf,

        /// Output file path (.csv for CSV, JSON lines otherwise)
        #[arg(short, long)]
        output: PathBuf,

        /// Reconstruction configuration (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Skip super-layers with more hits than this
        #[arg(long)]
        max_allowed_hits: Option<usize>,

        /// Chi-square per degree of freedom cut of the fit gate
        #[arg(long)]
        max_chi2: Option<f64>,

        /// Seed direction window in the theta super-layer (rad)
        #[arg(long)]
        alpha_max_theta: Option<f64>,

        /// Seed direction window in phi super-layers (rad)
        #[arg(long)]
        alpha_max_phi: Option<f64>,

        /// Log detailed search traces
        #[arg(long)]
        debug: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show information about an event file
    Info {
        /// Input event file
        input: PathBuf,
    },

    /// Benchmark the reconstruction on an event file
    Benchmark {
        /// Input event file
        input: PathBuf,

        /// Number of iterations
        #[arg(short, long, default_value = "3")]
        iterations: usize,

        /// Reconstruction configuration (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let verbose = matches!(
        cli.command,
        Commands::Reconstruct { verbose: true, .. } | Commands::Reconstruct { debug: true, .. }
    );
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Reconstruct {
            input,
            output,
            config,
            max_allowed_hits,
            max_chi2,
            alpha_max_theta,
            alpha_max_phi,
            debug,
            verbose,
        } => {
            let mut config = read_config(config.as_deref())?;
            let pattern = &mut config.pattern;
            if let Some(max) = max_allowed_hits {
                pattern.max_allowed_hits = max;
            }
            if let Some(chi2) = max_chi2 {
                pattern.max_chi2 = chi2;
            }
            if let Some(alpha) = alpha_max_theta {
                pattern.alpha_max_theta = alpha;
            }
            if let Some(alpha) = alpha_max_phi {
                pattern.alpha_max_phi = alpha;
            }
            pattern.debug |= debug;

            if verbose {
                eprintln!("Reading: {}", input.display());
                eprintln!("Max allowed hits: {}", config.pattern.max_allowed_hits);
                eprintln!("Max chi2: {}", config.pattern.max_chi2);
                eprintln!(
                    "Alpha max theta/phi: {}/{} rad",
                    config.pattern.alpha_max_theta, config.pattern.alpha_max_phi
                );
            }

            let reco = SegmentReconstructor::new(config)?;
            let csv = output
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
            let mut writer = SegmentFileWriter::create(&output)?;
            if verbose {
                eprintln!("Writing output to: {}", output.display());
            }

            let start = Instant::now();
            let mut n_events = 0usize;
            let mut total = ReconstructionStatistics::default();

            for record in EventFileReader::open(&input)? {
                let record = record?;
                let event = record.event;
                let superlayers = record.into_superlayer_hits()?;
                let (segments, stats) = reconstruct_event_with_statistics(&reco, &superlayers);

                if csv {
                    writer.write_segments_csv(event, &segments, n_events == 0)?;
                } else {
                    writer.write_segments_jsonl(event, &segments)?;
                }
                log::debug!("event {}: {} segments", event, segments.len());

                total.merge(&stats);
                n_events += 1;
            }
            writer.flush()?;

            let elapsed = start.elapsed();
            println!(
                "Processed {} events in {:.2}s",
                n_events,
                elapsed.as_secs_f64()
            );
            println!("Total hits: {}", total.n_hits);
            println!("Skipped super-layers: {}", total.skipped);
            println!("Total segments: {}", total.segments);
            if verbose {
                eprintln!("Seed pairs: {}", total.seed_pairs);
                eprintln!("Seeds searched: {}", total.seeds_searched);
                eprintln!("Candidates found: {}", total.candidates_found);
                eprintln!("Candidates after cleaning: {}", total.candidates_cleaned);
            }
        }

        Commands::Info { input } => {
            let events = read_events(&input)?;
            let n_hits: usize = events.iter().map(EventRecord::n_hits).sum();

            let mut per_superlayer: BTreeMap<u8, (usize, usize)> = BTreeMap::new();
            let mut max_hits = 0usize;
            for sl in events.iter().flat_map(|e| &e.superlayers) {
                let entry = per_superlayer.entry(sl.superlayer).or_default();
                entry.0 += 1;
                entry.1 += sl.hits.len();
                max_hits = max_hits.max(sl.hits.len());
            }

            println!("File: {}", input.display());
            println!("Events: {}", events.len());
            println!("Hits: {}", n_hits);
            println!("Max hits in one super-layer: {}", max_hits);
            for (index, (count, hits)) in &per_superlayer {
                println!(
                    "SL{}: {} records, {:.1} hits/record",
                    index,
                    count,
                    *hits as f64 / *count as f64
                );
            }
        }

        Commands::Benchmark {
            input,
            iterations,
            config,
        } => {
            let reco = SegmentReconstructor::new(read_config(config.as_deref())?)?;
            let events = read_events(&input)?
                .into_iter()
                .map(EventRecord::into_superlayer_hits)
                .collect::<driftseg_io::Result<Vec<_>>>()?;
            let n_hits: usize = events
                .iter()
                .flatten()
                .map(|sl| sl.hits.len())
                .sum();

            println!(
                "Benchmarking with {} events, {} hits, {} iterations",
                events.len(),
                n_hits,
                iterations
            );

            // Warmup
            for event in &events {
                let _ = reconstruct_event_with_statistics(&reco, event);
            }

            let mut times = Vec::with_capacity(iterations);
            let mut n_segments = 0usize;
            for _ in 0..iterations {
                let start = Instant::now();
                n_segments = events
                    .iter()
                    .map(|event| reconstruct_event_with_statistics(&reco, event).1.segments)
                    .sum();
                times.push(start.elapsed().as_secs_f64() * 1000.0);
            }

            if times.is_empty() {
                return Ok(());
            }
            let min_time = times.iter().fold(f64::INFINITY, |a, &b| a.min(b));
            let max_time = times.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
            let mean_time = times.iter().sum::<f64>() / times.len() as f64;

            println!(
                "{:<10} | {:<15} | {:<15} | {:<15}",
                "Segments", "Mean Time (ms)", "Min Time (ms)", "Max Time (ms)"
            );
            println!("{:-<65}", "");
            println!(
                "{:<10} | {:<15.2} | {:<15.2} | {:<15.2}",
                n_segments, mean_time, min_time, max_time
            );
        }
    }

    Ok(())
}

fn read_config(path: Option<&Path>) -> Result<ReconstructionConfig> {
    Ok(match path {
        Some(path) => load_config(path)?,
        None => ReconstructionConfig::default(),
    })
}

fn read_events(path: &Path) -> Result<Vec<EventRecord>> {
    Ok(EventFileReader::open(path)?.collect::<driftseg_io::Result<Vec<_>>>()?)
}
