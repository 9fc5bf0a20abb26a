//! User-facing console output for the CLI.
//! Colored prefixes only when the stream is a TTY; plain lines otherwise so the
//! output stays scriptable.

use owo_colors::OwoColorize;
use serde::Serialize;
use std::io::{self, Write};

use crate::engine::DirectoryStatus;
use crate::status::{FileState, Status};

fn stdout_tty() -> bool {
    atty::is(atty::Stream::Stdout)
}

fn stderr_tty() -> bool {
    atty::is(atty::Stream::Stderr)
}

pub fn print_info(msg: &str) {
    if stdout_tty() {
        println!("{} {}", "info:".cyan().bold(), msg);
    } else {
        println!("info: {msg}");
    }
}

pub fn print_warn(msg: &str) {
    if stderr_tty() {
        eprintln!("{} {}", "warn:".yellow().bold(), msg);
    } else {
        eprintln!("warn: {msg}");
    }
}

pub fn print_error(msg: &str) {
    if stderr_tty() {
        eprintln!("{} {}", "error:".red().bold(), msg);
    } else {
        eprintln!("error: {msg}");
    }
}

pub fn print_success(msg: &str) {
    if stdout_tty() {
        println!("{} {}", "ok:".green().bold(), msg);
    } else {
        println!("ok: {msg}");
    }
}

/// Plain line with no prefix, for primary results users may script against.
pub fn print_user(msg: &str) {
    println!("{msg}");
}

/// Pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> serde_json::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Batch progress: redrawn in place on a TTY (on stderr), one line per update otherwise.
pub fn print_progress(percent: u8) {
    let mut err = io::stderr().lock();
    if stderr_tty() {
        let _ = write!(err, "\r{} {:>3}%", "progress:".cyan(), percent);
        if percent >= 100 {
            let _ = writeln!(err);
        }
        let _ = err.flush();
    } else {
        let _ = writeln!(err, "progress: {percent}%");
    }
}

/// `public, reviewed` / `untracked` for one file.
pub fn describe_file_state(state: FileState) -> String {
    let status = match state.status {
        Some(Status::Public) => "public",
        Some(Status::Private) => "private",
        None => "unknown",
    };
    let reviewed = if state.reviewed { "reviewed" } else { "unreviewed" };
    format!("{status}, {reviewed}")
}

pub fn describe_directory(status: &DirectoryStatus) -> String {
    format!(
        "total {}: public {}, private {}, reviewed {}, unreviewed {}, untracked {}",
        status.total,
        status.public,
        status.private,
        status.reviewed,
        status.unreviewed,
        status.untracked
    )
}
