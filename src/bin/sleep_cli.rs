use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use sleep_tracker::analysis::{NoopKeepAwake, SignalProcessor, WakeContext};
use sleep_tracker::config::AppConfig;
use sleep_tracker::error::{log_analysis_error, AnalysisError, ErrorCode};
use sleep_tracker::recording::{list_sessions, SessionId, SessionRecorder};
use sleep_tracker::testing::NightSpec;

/// Exit code when the smart alarm declines to move the alarm
const EXIT_DECLINED: u8 = 2;

#[derive(Parser, Debug)]
#[command(
    name = "sleep_cli",
    about = "Operator tooling for recorded sleep sessions"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the smart alarm computation on a recorded session
    Analyze {
        #[arg(long)]
        file: PathBuf,
        /// Alarm time (unix seconds)
        #[arg(long)]
        wake_at: u64,
        /// Override the maximum anticipation window (seconds)
        #[arg(long)]
        anticipate: Option<u32>,
        /// Session start; defaults to the id in the file name
        #[arg(long)]
        session_start: Option<u64>,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Summarise the rows of a session file
    Inspect {
        #[arg(long)]
        file: PathBuf,
    },
    /// List sessions in a log directory, oldest first
    List {
        #[arg(long)]
        dir: PathBuf,
    },
    /// Write a synthetic night through the recorder
    Simulate {
        #[arg(long)]
        dir: PathBuf,
        #[arg(long, default_value_t = 8.0)]
        hours: f64,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Session start (unix seconds); defaults to now
        #[arg(long)]
        start: Option<u64>,
    },
}

fn main() -> ExitCode {
    sleep_tracker::init_logging();
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            file,
            wake_at,
            anticipate,
            session_start,
            config,
        } => run_analyze(&file, wake_at, anticipate, session_start, config),
        Commands::Inspect { file } => run_inspect(&file),
        Commands::List { dir } => run_list(&dir),
        Commands::Simulate {
            dir,
            hours,
            seed,
            start,
        } => run_simulate(&dir, hours, seed, start),
    }
}

fn run_analyze(
    file: &Path,
    wake_at: u64,
    anticipate: Option<u32>,
    session_start: Option<u64>,
    config_path: Option<PathBuf>,
) -> Result<ExitCode> {
    let config = config_path
        .map(AppConfig::load_from_file)
        .unwrap_or_default();
    config.validate().context("validating configuration")?;

    let session_start = match session_start {
        Some(start) => start,
        None => SessionId::from_path(file)
            .with_context(|| format!("deriving session start from {}", file.display()))?
            .start(),
    };
    let ctx = WakeContext {
        session_start,
        wake_at,
        anticipate_allowed_s: anticipate.unwrap_or(config.tracking.anticipate_allowed_s),
    };

    let processor = SignalProcessor::new(config.analysis.clone(), config.tracking.store_interval_s);
    let result = SessionRecorder::read_all_from(file, config.analysis.min_rows)
        .and_then(|records| processor.estimate_records(&records, &ctx, &mut NoopKeepAwake));

    match result {
        Ok(estimate) => {
            println!("{}", serde_json::to_string_pretty(&estimate)?);
            Ok(ExitCode::from(0))
        }
        Err(AnalysisError::Storage(err)) => {
            Err(anyhow::Error::new(err).context(format!("reading {}", file.display())))
        }
        Err(err) => {
            log_analysis_error(&err, "sleep_cli analyze");
            let declined = DeclinedPayload {
                error_code: err.code(),
                message: err.message(),
                wake_at,
            };
            eprintln!("{}", serde_json::to_string_pretty(&declined)?);
            Ok(ExitCode::from(EXIT_DECLINED))
        }
    }
}

fn run_inspect(file: &Path) -> Result<ExitCode> {
    let read = SessionRecorder::read_records(file)
        .with_context(|| format!("reading {}", file.display()))?;

    let metrics: Vec<f64> = read.records.iter().map(|r| r.motion()).collect();
    let report = InspectReport {
        session: SessionId::from_path(file).ok().map(SessionId::start),
        rows: read.records.len(),
        skipped: read.skipped,
        first_elapsed_s: read.records.first().map(|r| r.elapsed_s()),
        last_elapsed_s: read.records.last().map(|r| r.elapsed_s()),
        metric_min: metrics.iter().copied().reduce(f64::min),
        metric_max: metrics.iter().copied().reduce(f64::max),
        metric_mean: if metrics.is_empty() {
            None
        } else {
            Some(metrics.iter().sum::<f64>() / metrics.len() as f64)
        },
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(ExitCode::from(0))
}

fn run_list(dir: &Path) -> Result<ExitCode> {
    let sessions =
        list_sessions(dir).with_context(|| format!("listing sessions in {}", dir.display()))?;
    if sessions.is_empty() {
        println!("No sessions found under {}", dir.display());
        return Ok(ExitCode::from(0));
    }

    for id in sessions {
        println!("{}", id);
    }
    Ok(ExitCode::from(0))
}

fn run_simulate(dir: &Path, hours: f64, seed: u64, start: Option<u64>) -> Result<ExitCode> {
    let start = match start {
        Some(start) => start,
        None => SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .context("system clock before unix epoch")?
            .as_secs(),
    };

    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let spec = NightSpec::for_hours(hours, seed);
    let path = spec
        .write_session(dir, SessionId(start))
        .with_context(|| format!("writing synthetic session to {}", dir.display()))?;

    println!("{}", path.display());
    Ok(ExitCode::from(0))
}

#[derive(Serialize)]
struct DeclinedPayload {
    error_code: i32,
    message: String,
    wake_at: u64,
}

#[derive(Serialize)]
struct InspectReport {
    session: Option<u64>,
    rows: usize,
    skipped: usize,
    first_elapsed_s: Option<u32>,
    last_elapsed_s: Option<u32>,
    metric_min: Option<f64>,
    metric_max: Option<f64>,
    metric_mean: Option<f64>,
}
