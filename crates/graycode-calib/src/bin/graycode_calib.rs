//! graycode-calib CLI: generate gray-code patterns and decode captured sequences.

use clap::{Args, Parser, Subcommand, ValueEnum};
use graycode_calib::decode::{GrayCodePattern, ProjectorSize};
use graycode_calib::io::save_pattern_frames;
use graycode_calib::job::{run_decode_job, DecodeJob};
use log::LevelFilter;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

type CliError = Box<dyn Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "graycode-calib")]
#[command(about = "Gray-code structured-light projector calibration")]
#[command(version)]
struct Cli {
    /// Minimum level of log messages printed to stderr.
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    /// Event format of the tracing subscriber.
    #[cfg(feature = "tracing")]
    #[arg(long, global = true, value_enum, default_value_t = LogFormatArg::Text)]
    log_format: LogFormatArg,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[cfg(feature = "tracing")]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormatArg {
    Text,
    Json,
}

#[cfg(feature = "tracing")]
impl From<LogFormatArg> for graycode_calib::core::LogFormat {
    fn from(format: LogFormatArg) -> Self {
        match format {
            LogFormatArg::Text => Self::Text,
            LogFormatArg::Json => Self::Json,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Write the projected frame sequence for a projector resolution.
    Patterns(PatternsArgs),

    /// Decode a captured sequence described by a JSON config.
    Decode(DecodeArgs),
}

#[derive(Debug, Clone, Args)]
struct PatternsArgs {
    /// Projector width in pixels.
    #[arg(long)]
    width: u32,

    /// Projector height in pixels.
    #[arg(long)]
    height: u32,

    /// Output directory; created if missing.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Debug, Clone, Args)]
struct DecodeArgs {
    /// Path to the decode job config (JSON).
    #[arg(long)]
    config: PathBuf,

    /// Report path; overrides `report_path` from the config.
    #[arg(long)]
    report: Option<PathBuf>,

    /// Mask image path; overrides `mask_path` from the config.
    #[arg(long)]
    mask: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let result = init_logging(&cli).and_then(|()| match cli.command {
        Commands::Patterns(args) => run_patterns(&args),
        Commands::Decode(args) => run_decode(&args),
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            let mut source = err.source();
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

#[cfg(feature = "tracing")]
fn init_logging(cli: &Cli) -> CliResult<()> {
    graycode_calib::core::init_tracing(cli.log_level.into(), cli.log_format.into());
    Ok(())
}

#[cfg(not(feature = "tracing"))]
fn init_logging(cli: &Cli) -> CliResult<()> {
    graycode_calib::core::init_with_level(cli.log_level.into()).map_err(|e| e.to_string().into())
}

fn run_patterns(args: &PatternsArgs) -> CliResult<()> {
    let pattern = GrayCodePattern::new(ProjectorSize::new(args.width, args.height))?;
    let layout = pattern.layout();
    log::info!(
        "{}x{} projector: {} column bits, {} row bits",
        args.width,
        args.height,
        layout.column_bits,
        layout.row_bits
    );
    let written = save_pattern_frames(&pattern, &args.out)?;
    println!("wrote {} frames to {}", written.len(), args.out.display());
    Ok(())
}

fn run_decode(args: &DecodeArgs) -> CliResult<()> {
    let mut job = DecodeJob::load(&args.config)?;
    if let Some(report) = &args.report {
        job.report_path = Some(report.clone());
    }
    if let Some(mask) = &args.mask {
        job.mask_path = Some(mask.clone());
    }

    let report = run_decode_job(&job)?;
    if report.point_count < report.min_point_count {
        log::warn!(
            "only {} correspondences, fewer than the requested {}",
            report.point_count,
            report.min_point_count
        );
    }
    println!(
        "decoded {} correspondences from {} frames (error threshold {}, mask coverage {:.1}%, {} ms)",
        report.point_count,
        report.frame_count,
        report.error_threshold,
        report.mask_coverage * 100.0,
        report.timings.total_ms
    );
    Ok(())
}
