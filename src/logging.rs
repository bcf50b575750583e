//! Tracing initialization.
//!
//! - The filter comes from `LogLevel` only; RUST_LOG is not consulted.
//! - Console events always go to stderr, because stdout may carry an archive stream.
//! - An optional non-blocking file layer is added when the log path is safe to open.

use anyhow::Result;
use chrono::Local;
use std::fmt as stdfmt;
use std::io;
use std::path::Path;
use timefops::config::{LogLevel, default_config_path, path_has_symlink_ancestor};
use timefops::output as out;
use timefops::platform::open_log_file_secure_append;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt as tsfmt;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Layer, Registry, registry};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Local wall-clock stamp, e.g. `15/03/20 12:00:00`.
struct LocalHumanTime;

impl FormatTime for LocalHumanTime {
    fn format_time(&self, w: &mut Writer<'_>) -> stdfmt::Result {
        write!(w, "{}", Local::now().format("%d/%m/%y %H:%M:%S"))
    }
}

/// quiet→error, normal→info, info ("verbose")→debug, debug→trace.
fn directive(lvl: &LogLevel) -> &'static str {
    match lvl {
        LogLevel::Quiet => "error",
        LogLevel::Normal => "info",
        LogLevel::Info => "debug",
        LogLevel::Debug => "trace",
    }
}

fn console_layer(json: bool, ansi: bool) -> BoxedLayer {
    if json {
        tsfmt::layer()
            .event_format(tsfmt::format().json())
            .with_timer(LocalHumanTime)
            .with_target(true)
            .with_writer(io::stderr)
            .boxed()
    } else {
        tsfmt::layer()
            .with_timer(LocalHumanTime)
            .with_target(false)
            .with_ansi(ansi)
            .compact()
            .with_writer(io::stderr)
            .boxed()
    }
}

fn file_layer(json: bool, writer: NonBlocking) -> BoxedLayer {
    if json {
        tsfmt::layer()
            .event_format(tsfmt::format().json())
            .with_timer(LocalHumanTime)
            .with_ansi(false)
            .with_writer(writer)
            .boxed()
    } else {
        tsfmt::layer()
            .with_timer(LocalHumanTime)
            .with_ansi(false)
            .compact()
            .with_writer(writer)
            .boxed()
    }
}

/// Open `path` for appending behind a non-blocking writer.
/// Returns None (after a console warning) when any ancestor is a symlink or the
/// file cannot be opened.
fn open_file_writer(path: &Path) -> Option<(NonBlocking, WorkerGuard)> {
    match path_has_symlink_ancestor(path) {
        Ok(false) => {}
        Ok(true) => {
            out::print_warn(&format!(
                "Refusing to enable file logging: ancestor of {} is a symlink.",
                path.display()
            ));
            return None;
        }
        Err(e) => {
            out::print_warn(&format!("Cannot check log path {}: {e}", path.display()));
            return None;
        }
    }
    match open_log_file_secure_append(path) {
        Ok(file) => Some(tracing_appender::non_blocking(file)),
        Err(e) => {
            out::print_warn(&format!("Failed to open log file {}: {e}", path.display()));
            None
        }
    }
}

/// Install the global subscriber. The returned guard (present when a file layer
/// is active) must live until exit so buffered lines reach the file.
pub fn init_tracing(
    lvl: &LogLevel,
    log_file: Option<&Path>,
    json: bool,
    color: bool,
) -> Result<Option<WorkerGuard>> {
    let ansi = color && atty::is(atty::Stream::Stderr);
    let mut layers = vec![console_layer(json, ansi)];
    let mut guard = None;

    if let Some(path) = log_file {
        match open_file_writer(path) {
            Some((writer, g)) => {
                layers.push(file_layer(json, writer));
                guard = Some(g);
            }
            None => {
                out::print_warn(&format!(
                    "Requested file logging to '{}' was not enabled. Logs will continue on stderr.",
                    path.display()
                ));
                if let Some(cfg) = default_config_path() {
                    out::print_info(&format!("The log file can be changed in {}", cfg.display()));
                }
            }
        }
    }

    registry()
        .with(layers)
        .with(EnvFilter::new(directive(lvl)))
        .try_init()?;
    Ok(guard)
}
