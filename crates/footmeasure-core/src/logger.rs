//! Process-wide logging setup for the footmeasure binaries.
//!
//! [`init_with_level`] installs a stderr logger: records from the
//! `footmeasure*` crates pass at the requested level, records from
//! dependencies (image codecs and the like) only at `Warn` and above.
//! With the `tracing` feature, [`init_tracing`] installs a
//! `tracing-subscriber` with the same split (text or JSON).

use std::fmt;
use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

use log::{Level, LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::util::SubscriberInitExt;
#[cfg(feature = "tracing")]
use tracing_subscriber::EnvFilter;

const OWN_PREFIX: &str = "footmeasure";

/// Level a record from `target` must reach when the user asked for `level`.
fn effective_level(target: &str, level: LevelFilter) -> LevelFilter {
    if target.starts_with(OWN_PREFIX) {
        level
    } else {
        level.min(LevelFilter::Warn)
    }
}

/// `[elapsed LEVEL module] message`, with the crate name dropped from our own targets.
fn format_line(elapsed_s: f64, level: Level, target: &str, args: &fmt::Arguments<'_>) -> String {
    let module = target
        .split_once("::")
        .filter(|(krate, _)| krate.starts_with(OWN_PREFIX))
        .map_or(target, |(_, rest)| rest);
    format!("[{elapsed_s:8.3}s {level:>5} {module}] {args}")
}

struct StderrLogger {
    level: LevelFilter,
    started: Instant,
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= effective_level(metadata.target(), self.level)
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format_line(
            self.started.elapsed().as_secs_f64(),
            record.level(),
            record.target(),
            record.args(),
        );
        let _ = writeln!(std::io::stderr().lock(), "{line}");
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: OnceLock<StderrLogger> = OnceLock::new();

/// Install the stderr logger.
///
/// Only the first call installs; later calls keep the first level.
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

/// `EnvFilter` directives equivalent to [`init_with_level`]'s target split.
#[cfg(feature = "tracing")]
fn default_directives(level: LevelFilter) -> String {
    let level = level.as_str().to_ascii_lowercase();
    let own = ["footmeasure", "footmeasure_core", "footmeasure_aruco"]
        .map(|krate| format!("{krate}={level}"))
        .join(",");
    format!("warn,{own}")
}

/// Install a global `tracing` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `level` applies to the footmeasure
/// crates and `warn` to everything else. Span close events are emitted, so
/// instrumented stages report their durations.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool, level: LevelFilter) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_span_events(FmtSpan::CLOSE);
    let _ = if json {
        builder.json().flatten_event(true).finish().try_init()
    } else {
        builder
            .with_timer(tracing_subscriber::fmt::time::Uptime::default())
            .finish()
            .try_init()
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependencies_are_capped_at_warn() {
        let debug = LevelFilter::Debug;
        assert_eq!(effective_level("footmeasure::pipeline", debug), debug);
        assert_eq!(effective_level("footmeasure_aruco::detector", debug), debug);
        assert_eq!(effective_level("png::decoder", debug), LevelFilter::Warn);
        assert_eq!(
            effective_level("png::decoder", LevelFilter::Error),
            LevelFilter::Error
        );
    }

    #[test]
    fn line_shows_module_without_crate() {
        let line = format_line(
            1.5,
            Level::Info,
            "footmeasure::pipeline",
            &format_args!("{} images", 3),
        );
        assert_eq!(line, "[   1.500s  INFO pipeline] 3 images");
        let line = format_line(0.0, Level::Warn, "png::decoder", &format_args!("x"));
        assert_eq!(line, "[   0.000s  WARN png::decoder] x");
    }

    #[cfg(feature = "tracing")]
    #[test]
    fn tracing_directives_follow_the_level() {
        assert_eq!(
            default_directives(LevelFilter::Debug),
            "warn,footmeasure=debug,footmeasure_core=debug,footmeasure_aruco=debug"
        );
    }

    #[test]
    fn repeated_init_is_a_no_op() {
        assert!(init_with_level(LevelFilter::Warn).is_ok());
        assert!(init_with_level(LevelFilter::Debug).is_ok());
        assert_eq!(log::max_level(), LevelFilter::Warn);
    }
}
