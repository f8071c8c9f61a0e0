//! Logging setup for binaries and examples.
//!
//! Library code only talks to the `log` facade. Applications install either
//! the stderr logger ([`init_with_level`]) or, with the `tracing` feature, a
//! `tracing-subscriber` ([`init_tracing`]) that also receives `log` records.
//! Both take the same [`LevelFilter`] so a single `--log-level` switch drives
//! either backend.

use std::fmt::Arguments;
use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

use log::{Level, LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::util::SubscriberInitExt;
#[cfg(feature = "tracing")]
use tracing_subscriber::{fmt, EnvFilter};

/// Output format of the `tracing` subscriber.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines with uptime stamps.
    #[default]
    Text,
    /// One JSON object per event, fields flattened.
    Json,
}

struct StderrLogger {
    level: LevelFilter,
    started: Instant,
}

/// Last path segment of a module target: `graycode_calib_decode::mask` -> `mask`.
fn short_target(target: &str) -> &str {
    target.rsplit("::").next().unwrap_or(target)
}

fn format_line(elapsed_s: f64, level: Level, target: &str, args: Arguments<'_>) -> String {
    format!(
        "[{:7.3}s {:>5} {}] {}",
        elapsed_s,
        level,
        short_target(target),
        args
    )
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format_line(
            self.started.elapsed().as_secs_f64(),
            record.level(),
            record.target(),
            *record.args(),
        );
        let _ = writeln!(std::io::stderr().lock(), "{line}");
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: OnceLock<StderrLogger> = OnceLock::new();

/// Install the stderr logger with the provided level filter.
///
/// Only the first call installs the logger; later calls return `Ok(())`.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_none() {
        let logger = LOGGER.get_or_init(|| StderrLogger {
            level,
            started: Instant::now(),
        });
        log::set_logger(logger)?;
        log::set_max_level(level);
    }
    Ok(())
}

/// `EnvFilter` directive for a `log` level filter.
pub fn filter_directive(level: LevelFilter) -> String {
    level.as_str().to_ascii_lowercase()
}

/// Install a `tracing` subscriber.
///
/// `RUST_LOG` wins when set; otherwise events at `level` and above pass.
/// Span close events carry the time spent in `extract_mask`, `decode` and
/// `calibrate`. A subscriber that is already installed is left in place.
#[cfg(feature = "tracing")]
pub fn init_tracing(level: LevelFilter, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(level)));
    let builder = fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr);
    let _ = match format {
        LogFormat::Json => builder.json().flatten_event(true).finish().try_init(),
        LogFormat::Text => builder
            .with_timer(fmt::time::Uptime::default())
            .finish()
            .try_init(),
    };
}
