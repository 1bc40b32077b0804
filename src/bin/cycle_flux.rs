//! Cycle Flux CLI - Command-line interface for cycle-flux
//!
//! Commands:
//! - sequence: Sample active users and write their stacked day matrices
//! - expand: Expand every cycle into per-day rows
//! - vocabulary: Print the symptom column ordering

use clap::{Parser, Subcommand, ValueEnum};
use log::{info, warn};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use cycle_flux::encoder::{SequenceEncoder, SequencePayload};
use cycle_flux::sampler::DEFAULT_MIN_TRACKING_COUNT;
use cycle_flux::types::CycleDay;
use cycle_flux::{ComputeError, DataSet, Sequencer, SequencerConfig, FLUX_VERSION};

/// Cycle Flux - day-indexed symptom sequences from tracking and cycle data
#[derive(Parser)]
#[command(name = "cycle-flux")]
#[command(author = "Synheart AI Inc")]
#[command(version = FLUX_VERSION)]
#[command(about = "Turn symptom tracking and cycle records into model input sequences", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sample users and write their stacked day matrices
    Sequence {
        /// Directory containing tracking.csv and cycles.csv
        #[arg(short, long)]
        data_dir: PathBuf,

        /// How many users to sequence (zero or less skips sequencing)
        #[arg(short = 'n', long, default_value = "10", allow_negative_numbers = true)]
        n_users: i64,

        /// Users need more tracking events than this to be sampled
        #[arg(long, default_value_t = DEFAULT_MIN_TRACKING_COUNT)]
        min_tracking_count: usize,

        /// Seed for user sampling (random if omitted)
        #[arg(long)]
        seed: Option<u64>,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,
    },

    /// Expand every cycle into per-day rows
    Expand {
        /// Directory containing tracking.csv and cycles.csv
        #[arg(short, long)]
        data_dir: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,
    },

    /// Print the symptom column ordering
    Vocabulary {
        /// Directory containing tracking.csv and cycles.csv
        #[arg(short, long)]
        data_dir: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one user or cycle day per line)
    Ndjson,
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), FluxCliError> {
    match cli.command {
        Commands::Sequence {
            data_dir,
            n_users,
            min_tracking_count,
            seed,
            output,
            output_format,
        } => {
            let mut config = SequencerConfig::default().with_min_tracking_count(min_tracking_count);
            if let Some(seed) = seed {
                config = config.with_seed(seed);
            }
            cmd_sequence(&data_dir, n_users, config, &output, &output_format)
        }

        Commands::Expand {
            data_dir,
            output,
            output_format,
        } => cmd_expand(&data_dir, &output, &output_format),

        Commands::Vocabulary { data_dir, json } => cmd_vocabulary(&data_dir, json),
    }
}

fn cmd_sequence(
    data_dir: &Path,
    n_users: i64,
    config: SequencerConfig,
    output: &Path,
    output_format: &OutputFormat,
) -> Result<(), FluxCliError> {
    if n_users <= 0 {
        warn!("n-users is {}, skipping sequencing", n_users);
        return Ok(());
    }
    let n_users = usize::try_from(n_users)
        .map_err(|_| FluxCliError::InvalidArgument(format!("n-users {} is too large", n_users)))?;

    let sequencer = Sequencer::from_data_dir(data_dir, config)?;
    let batch = sequencer.sample_and_sequence(n_users)?;
    let payload = SequenceEncoder::new().encode(&batch, sequencer.vocabulary())?;

    info!(
        "Writing {} rows x {} columns for {} users",
        batch.matrix.rows(),
        batch.matrix.cols(),
        batch.users.len()
    );

    let output_data = format_payload(&payload, output_format)?;
    write_output(output, &output_data)
}

fn cmd_expand(
    data_dir: &Path,
    output: &Path,
    output_format: &OutputFormat,
) -> Result<(), FluxCliError> {
    let dataset = DataSet::load(data_dir)?;
    let days = cycle_flux::expand_cycles(dataset.cycles())?;

    info!("Writing {} cycle days", days.len());

    let output_data = format_cycle_days(&days, output_format)?;
    write_output(output, &output_data)
}

fn cmd_vocabulary(data_dir: &Path, json: bool) -> Result<(), FluxCliError> {
    let sequencer = Sequencer::from_data_dir(data_dir, SequencerConfig::default())?;
    let vocabulary = sequencer.vocabulary();

    if json {
        println!("{}", serde_json::to_string_pretty(vocabulary)?);
    } else {
        println!("Symptom Vocabulary");
        println!("==================");
        println!("Symptoms:          {}", vocabulary.len());
        println!("Of interest:       {}", vocabulary.curated_len());
        println!();
        for (index, symptom) in vocabulary.symptoms().iter().enumerate() {
            let marker = if index < vocabulary.curated_len() { "*" } else { " " };
            println!("  {:>3} {} {}", index, marker, symptom);
        }
        println!("  {:>3}   day", vocabulary.len());
    }

    Ok(())
}

// Helper functions

fn write_output(output: &Path, data: &str) -> Result<(), FluxCliError> {
    if output.to_string_lossy() == "-" {
        print!("{}", data);
    } else {
        fs::write(output, data)?;
    }
    Ok(())
}

fn format_payload(
    payload: &SequencePayload,
    format: &OutputFormat,
) -> Result<String, FluxCliError> {
    match format {
        OutputFormat::Ndjson => {
            // one object per user with that user's rows
            let mut lines: Vec<String> = Vec::new();
            for block in &payload.users {
                let rows = &payload.matrix[block.start_row..block.start_row + block.rows];
                lines.push(serde_json::to_string(&serde_json::json!({
                    "user_id": block.user_id,
                    "first_date": block.first_date,
                    "columns": payload.columns,
                    "rows": rows,
                }))?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(payload)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(payload)?),
    }
}

fn format_cycle_days(days: &[CycleDay], format: &OutputFormat) -> Result<String, FluxCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for day in days {
                lines.push(serde_json::to_string(day)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(days)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(days)?),
    }
}

// Error types

#[derive(Debug)]
enum FluxCliError {
    Io(io::Error),
    Compute(ComputeError),
    Json(serde_json::Error),
    InvalidArgument(String),
}

impl From<io::Error> for FluxCliError {
    fn from(e: io::Error) -> Self {
        FluxCliError::Io(e)
    }
}

impl From<ComputeError> for FluxCliError {
    fn from(e: ComputeError) -> Self {
        FluxCliError::Compute(e)
    }
}

impl From<serde_json::Error> for FluxCliError {
    fn from(e: serde_json::Error) -> Self {
        FluxCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<FluxCliError> for CliError {
    fn from(e: FluxCliError) -> Self {
        match e {
            FluxCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            FluxCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            FluxCliError::InvalidArgument(msg) => CliError {
                code: "INVALID_ARGUMENT".to_string(),
                message: msg,
                hint: Some("Run with --help for usage".to_string()),
            },
            FluxCliError::Compute(e) => {
                let (code, hint) = compute_error_code(&e);
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: hint.map(str::to_string),
                }
            }
        }
    }
}

fn compute_error_code(e: &ComputeError) -> (&'static str, Option<&'static str>) {
    match e {
        ComputeError::UnknownSymptom(_) => ("UNKNOWN_SYMPTOM", None),
        ComputeError::DuplicateSymptom(_) => (
            "DUPLICATE_SYMPTOM",
            Some("Each symptom of interest may appear only once"),
        ),
        ComputeError::UnknownUser(_) => ("UNKNOWN_USER", None),
        ComputeError::CycleJoin { .. } => (
            "CYCLE_JOIN",
            Some("Every cycle_id in tracking.csv must exist in cycles.csv for the same user"),
        ),
        ComputeError::InvalidCycle { .. } => (
            "INVALID_CYCLE",
            Some("cycle_length must be positive and period_length at most cycle_length"),
        ),
        ComputeError::OverlappingCycles { .. } => (
            "OVERLAPPING_CYCLES",
            Some("Cycles of one user must not cover the same day"),
        ),
        ComputeError::InsufficientUsers { .. } => (
            "INSUFFICIENT_USERS",
            Some("Lower --n-users or --min-tracking-count"),
        ),
        ComputeError::EncodingError(_) => ("ENCODING_ERROR", None),
        ComputeError::DateParse(_) => ("DATE_PARSE_ERROR", Some("Dates must be YYYY-MM-DD")),
        ComputeError::Csv(_) => ("CSV_ERROR", Some("Check the CSV headers and column types")),
        ComputeError::Io(_) => ("IO_ERROR", Some("Check file paths and permissions")),
        ComputeError::Json(_) => ("JSON_ERROR", None),
    }
}
