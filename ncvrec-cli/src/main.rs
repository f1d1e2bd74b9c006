//!
//! This binary provides a CLI for NCV coincidence event reconstruction.
#![allow(clippy::uninlined_format_args, clippy::too_many_lines)]

use clap::{Parser, Subcommand, ValueEnum};

use ncvrec_core::{
    ChannelId, MinibufferContext, PositionTable, Pulse, PulseGroup, PulseMap, TriggerLabel,
    WindowAnchor,
};
use ncvrec_engine::{EventReconstructionEngine, ReconstructionConfig};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
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

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Core error: {0}")]
    Core(#[from] ncvrec_core::Error),

    #[error("invalid position range '{0}', expected FIRST-LAST:POSITION")]
    PositionRange(String),
}

/// Tank-charge window anchor selection.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Anchor {
    /// Window trails the event time
    Trailing,
    /// Window is centered on the event time
    Centered,
}

impl From<Anchor> for WindowAnchor {
    fn from(anchor: Anchor) -> Self {
        match anchor {
            Anchor::Trailing => WindowAnchor::Trailing,
            Anchor::Centered => WindowAnchor::Centered,
        }
    }
}

/// NCV coincidence event reconstruction.
#[derive(Parser)]
#[command(name = "ncvrec")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconstruct candidate events from minibuffer files
    Process {
        /// Input minibuffer file(s), one JSON record per line
        #[arg(required = true)]
        input: Vec<PathBuf>,

        /// Output path for candidate events (JSON lines)
        #[arg(short, long)]
        output: PathBuf,

        /// Output path for per-pulse diagnostic records (JSON lines)
        #[arg(long)]
        pulse_output: Option<PathBuf>,

        /// Afterpulsing veto time (nanoseconds)
        #[arg(long, default_value = "10000")]
        veto_time_ns: i64,

        /// Coincidence tolerance between primary pulses (nanoseconds)
        #[arg(long, default_value = "40")]
        tolerance_ns: i64,

        /// Tank-charge window length (nanoseconds)
        #[arg(long, default_value = "200")]
        window_ns: i64,

        /// Tank-charge window anchor policy
        #[arg(long, value_enum, default_value = "trailing")]
        anchor: Anchor,

        /// Maximum unique water PMTs for the channel-count cut
        #[arg(long, default_value = "8")]
        max_unique_pmts: u32,

        /// Maximum tank charge (nC) for the charge cut
        #[arg(long, default_value = "3.0")]
        max_tank_charge: f64,

        /// First primary channel
        #[arg(long, default_value = "6")]
        primary1: u32,

        /// Second primary channel
        #[arg(long, default_value = "49")]
        primary2: u32,

        /// Water PMT channels (comma separated); defaults to 0-59 minus the
        /// primary channels
        #[arg(long, value_delimiter = ',')]
        water_pmts: Option<Vec<u32>>,

        /// NCV position range(s), FIRST-LAST:POSITION, repeatable
        #[arg(long = "position-range")]
        position_ranges: Vec<String>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show information about minibuffer files
    Info {
        /// Input minibuffer file(s)
        #[arg(required = true)]
        input: Vec<PathBuf>,
    },
}

/// One pulse as it appears in the input record.
#[derive(Debug, Deserialize)]
struct PulseEntry {
    channel: u32,
    start_time: i64,
    amplitude: f64,
    charge: f64,
    raw_amplitude: u16,
    /// Acquisition sub-window index; pulses with the same index land in the
    /// same pulse group.
    #[serde(default)]
    group: u32,
}

/// One minibuffer as it appears in the input file.
#[derive(Debug, Deserialize)]
struct MinibufferRecord {
    run: u32,
    subrun: u32,
    minibuffer: u32,
    #[serde(default)]
    label: TriggerLabel,
    #[serde(default)]
    hefty: bool,
    pulses: Vec<PulseEntry>,
}

impl MinibufferRecord {
    /// Builds the engine-facing context, grouping pulses per channel by
    /// their sub-window index.
    fn into_context(self) -> MinibufferContext {
        let mut grouped: BTreeMap<(u32, u32), PulseGroup> = BTreeMap::new();
        for entry in self.pulses {
            grouped
                .entry((entry.channel, entry.group))
                .or_default()
                .push(Pulse::new(
                    entry.channel,
                    entry.start_time,
                    entry.amplitude,
                    entry.charge,
                    entry.raw_amplitude,
                ));
        }

        let mut map = PulseMap::new();
        for ((channel, _), group) in grouped {
            map.push_group(ChannelId::new(channel), group);
        }
        MinibufferContext::new(self.minibuffer, self.label, self.hefty, map)
    }
}

fn read_records(path: &Path) -> Result<Vec<MinibufferRecord>> {
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(serde_json::from_str(&line)?);
    }
    Ok(records)
}

fn parse_position_range(range: &str) -> Result<(u32, u32, i32)> {
    let invalid = || CliError::PositionRange(range.to_string());
    let (runs, position) = range.split_once(':').ok_or_else(invalid)?;
    let (first, last) = runs.split_once('-').ok_or_else(invalid)?;
    Ok((
        first.parse().map_err(|_| invalid())?,
        last.parse().map_err(|_| invalid())?,
        position.parse().map_err(|_| invalid())?,
    ))
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Process {
            input,
            output,
            pulse_output,
            veto_time_ns,
            tolerance_ns,
            window_ns,
            anchor,
            max_unique_pmts,
            max_tank_charge,
            primary1,
            primary2,
            water_pmts,
            position_ranges,
            verbose,
        } => {
            let mut config = ReconstructionConfig::new()
                .with_afterpulsing_veto_time(veto_time_ns)
                .with_coincidence_tolerance(tolerance_ns)
                .with_tank_charge_window(window_ns)
                .with_window_anchor(anchor.into())
                .with_max_unique_water_pmts(max_unique_pmts)
                .with_max_tank_charge(max_tank_charge)
                .with_primary_channels(ChannelId::new(primary1), ChannelId::new(primary2));
            if let Some(channels) = water_pmts {
                config = config.with_water_pmt_channels(channels.into_iter().map(ChannelId::new));
            } else {
                config = config.with_water_pmt_channels(
                    (0..60)
                        .map(ChannelId::new)
                        .filter(|&c| c != ChannelId::new(primary1) && c != ChannelId::new(primary2)),
                );
            }

            let mut positions = PositionTable::new();
            for range in &position_ranges {
                let (first, last, position) = parse_position_range(range)?;
                positions = positions.with_range(first, last, position);
            }

            process_files(&input, &output, pulse_output.as_deref(), config, positions, verbose)
        }
        Commands::Info { input } => info_files(&input),
    }
}

fn process_files(
    inputs: &[PathBuf],
    output: &Path,
    pulse_output: Option<&Path>,
    config: ReconstructionConfig,
    positions: PositionTable,
    verbose: bool,
) -> Result<()> {
    let start = Instant::now();
    let mut engine = EventReconstructionEngine::new(config)?.with_position_table(positions);

    let mut candidate_writer = BufWriter::new(File::create(output)?);
    let mut pulse_writer = match pulse_output {
        Some(path) => Some(BufWriter::new(File::create(path)?)),
        None => None,
    };

    let mut current_run: Option<(u32, u32)> = None;
    let mut total_candidates = 0u64;
    let mut total_minibuffers = 0u64;
    let mut skipped = 0u64;

    for path in inputs {
        if verbose {
            println!("Reading {}", path.display());
        }
        for record in read_records(path)? {
            let run_key = (record.run, record.subrun);
            if current_run != Some(run_key) {
                if verbose {
                    println!("Run {} subrun {}", record.run, record.subrun);
                }
                engine.begin_run(record.run, record.subrun);
                current_run = Some(run_key);
            }

            let minibuffer = record.minibuffer;
            let ctx = record.into_context();
            let out = match engine.process_minibuffer(&ctx) {
                Ok(out) => out,
                Err(e) => {
                    // Precondition failures are fatal to the minibuffer
                    // only; report and keep the run going.
                    eprintln!("Skipping minibuffer {}: {}", minibuffer, e);
                    skipped += 1;
                    continue;
                }
            };

            total_minibuffers += 1;
            total_candidates += out.candidates.len() as u64;

            for candidate in &out.candidates {
                serde_json::to_writer(&mut candidate_writer, candidate)?;
                candidate_writer.write_all(b"\n")?;
            }
            if let Some(writer) = pulse_writer.as_mut() {
                for pulse in &out.pulses {
                    serde_json::to_writer(&mut *writer, pulse)?;
                    writer.write_all(b"\n")?;
                }
            }
        }
    }

    candidate_writer.flush()?;
    if let Some(mut writer) = pulse_writer {
        writer.flush()?;
    }

    println!(
        "Processed {} minibuffers ({} skipped) -> {} candidates in {:.2?}",
        total_minibuffers,
        skipped,
        total_candidates,
        start.elapsed()
    );
    Ok(())
}

fn info_files(inputs: &[PathBuf]) -> Result<()> {
    for path in inputs {
        let records = read_records(path)?;
        let minibuffers = records.len();
        let pulses: usize = records.iter().map(|r| r.pulses.len()).sum();
        let beam = records.iter().filter(|r| r.label.is_beam()).count();
        let hefty = records.iter().filter(|r| r.hefty).count();
        let runs: std::collections::BTreeSet<(u32, u32)> =
            records.iter().map(|r| (r.run, r.subrun)).collect();

        println!("{}:", path.display());
        println!("  minibuffers: {} ({} beam, {} hefty)", minibuffers, beam, hefty);
        println!("  pulses:      {}", pulses);
        println!("  runs:        {}", runs.len());
    }
    Ok(())
}
