//! Tracing initialization for the binary.
//! Console events go to stderr (stdout carries results), compact or JSON; an optional
//! non-blocking file layer mirrors them.
//!
//! Notes:
//! - The level comes from LogLevel only; RUST_LOG is not consulted.
//! - File logging is refused when any ancestor of the log path is a symlink.

use anyhow::{Context, Result};
use chrono::Local;
use std::fmt as stdfmt;
use std::io;
use std::path::Path;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::fmt as tsfmt;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry;
use tracing_subscriber::util::SubscriberInitExt;

use sift::output as out;
use sift::platform::open_log_file_secure_append;
use sift::{LogLevel, default_log_path, path_has_symlink_ancestor};

/// DD/MM/YY HH:MM:SS in local time.
struct LocalHumanTime;
impl FormatTime for LocalHumanTime {
    fn format_time(&self, w: &mut tsfmt::format::Writer<'_>) -> stdfmt::Result {
        write!(w, "{}", Local::now().format("%d/%m/%y %H:%M:%S"))
    }
}

fn to_level_filter(lvl: &LogLevel) -> LevelFilter {
    match lvl {
        LogLevel::Quiet => LevelFilter::ERROR,
        LogLevel::Normal => LevelFilter::INFO,
        LogLevel::Info => LevelFilter::DEBUG,
        LogLevel::Debug => LevelFilter::TRACE,
    }
}

/// Our own crate at the requested level; dependencies never below WARN.
fn env_filter_for(level: LevelFilter) -> EnvFilter {
    let ours = level.to_string().to_lowercase();
    let deps = if level > LevelFilter::WARN {
        "warn".to_string()
    } else {
        ours.clone()
    };
    EnvFilter::new(format!("{deps},sift={ours}"))
}

fn open_file_writer(path: &Path) -> Option<(NonBlocking, WorkerGuard)> {
    match path_has_symlink_ancestor(path) {
        Ok(false) => {}
        Ok(true) => {
            out::print_warn(&format!(
                "not logging to {}: an ancestor directory is a symlink",
                path.display()
            ));
            return None;
        }
        Err(e) => {
            out::print_warn(&format!("not logging to {}: {e}", path.display()));
            return None;
        }
    }
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    match open_log_file_secure_append(path) {
        Ok(file) => Some(tracing_appender::non_blocking(file)),
        Err(e) => {
            out::print_warn(&format!("could not open log file {}: {e}", path.display()));
            if let Some(def) = default_log_path()
                && def != path
            {
                out::print_info(&format!("the default log path is {}", def.display()));
            }
            None
        }
    }
}

/// Install the global subscriber. Hold the returned guard until exit so buffered
/// file events are flushed.
pub fn init_tracing(
    lvl: &LogLevel,
    log_file: Option<&Path>,
    json: bool,
) -> Result<Option<WorkerGuard>> {
    let filter = env_filter_for(to_level_filter(lvl));
    let (file_writer, guard) = match log_file.and_then(open_file_writer) {
        Some((writer, guard)) => (Some(writer), Some(guard)),
        None => (None, None),
    };

    if json {
        let console = tsfmt::layer()
            .event_format(tsfmt::format().json())
            .with_timer(LocalHumanTime)
            .with_target(true)
            .with_writer(io::stderr);
        let file = file_writer.map(|w| {
            tsfmt::layer()
                .event_format(tsfmt::format().json())
                .with_timer(LocalHumanTime)
                .with_target(true)
                .with_ansi(false)
                .with_writer(w)
        });
        registry()
            .with(filter)
            .with(console)
            .with(file)
            .try_init()
            .context("install tracing subscriber")?;
    } else {
        let console = tsfmt::layer()
            .with_timer(LocalHumanTime)
            .with_target(false)
            .compact()
            .with_writer(io::stderr);
        let file = file_writer.map(|w| {
            tsfmt::layer()
                .with_timer(LocalHumanTime)
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(false)
                .compact()
                .with_writer(w)
        });
        registry()
            .with(filter)
            .with(console)
            .with(file)
            .try_init()
            .context("install tracing subscriber")?;
    }
    Ok(guard)
}
