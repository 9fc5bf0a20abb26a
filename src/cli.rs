//! CLI definition and parsing.
//! Defines Args and the subcommands; the binary dispatches on them.
//!
//! Notes:
//! - --debug is a shorthand for --log-level debug.
//! - Root/area flags override the XML config.

use clap::{Parser, Subcommand, ValueHint};
use std::path::PathBuf;

use crate::config::types::{Config, LogLevel};
use crate::status::Status;

/// Classify files between a public and a private root.
/// CLI flags override config values (which are loaded from XML if present).
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Classify files between a public and a private root")]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Override the public root.
    #[arg(long, global = true, value_hint = ValueHint::DirPath)]
    pub public_root: Option<PathBuf>,

    /// Override the private root.
    #[arg(long, global = true, value_hint = ValueHint::DirPath)]
    pub private_root: Option<PathBuf>,

    /// Override the safe-delete (backup) area.
    #[arg(long, global = true, value_hint = ValueHint::DirPath)]
    pub safe_delete_root: Option<PathBuf>,

    /// Override the metadata directory.
    #[arg(long, global = true, value_hint = ValueHint::DirPath)]
    pub metadata_root: Option<PathBuf>,

    /// Enable debug logging (shorthand for --log-level debug).
    #[arg(short = 'd', long, global = true)]
    pub debug: bool,

    /// Set log level: quiet, normal, info, debug.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Emit logs and results as JSON.
    #[arg(long, global = true)]
    pub json: bool,

    /// Print the config file location and exit.
    #[arg(long)]
    pub print_config: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Classify a file or, recursively, every file in a directory.
    Classify {
        #[arg(value_hint = ValueHint::AnyPath)]
        path: PathBuf,
        /// public or private
        #[arg(value_parser = parse_status)]
        status: Status,
    },
    /// Show the review status of a file, or the counts below a directory.
    Status {
        #[arg(value_hint = ValueHint::AnyPath)]
        path: PathBuf,
    },
    /// Find files whose name contains QUERY (case-insensitive).
    Search {
        query: String,
        /// Restrict to one root (default: both).
        #[arg(long, value_parser = parse_status)]
        root: Option<Status>,
    },
    /// Purge backups older than the retention window.
    CleanupBackups {
        /// Age in days (default: backup_retention_days from config).
        #[arg(long)]
        days: Option<u64>,
    },
    /// Drop metadata entries whose file no longer exists.
    Validate,
    /// Counts from the metadata index.
    Stats,
    /// Files reviewed in the last N days.
    Recent {
        #[arg(long, default_value_t = 7)]
        days: u64,
    },
    /// Rebuild the metadata index from the shard files.
    Reindex,
}

fn parse_status(s: &str) -> Result<Status, String> {
    s.parse()
}

impl Args {
    /// Effective log level derived from flags.
    /// Precedence: --debug > --log-level value > None (use config default).
    pub fn effective_log_level(&self) -> Option<LogLevel> {
        if self.debug {
            return Some(LogLevel::Debug);
        }
        self.log_level.as_deref().and_then(LogLevel::parse)
    }

    /// Apply CLI overrides to a loaded Config (in-place). No-ops for unset flags.
    pub fn apply_overrides(&self, cfg: &mut Config) {
        if let Some(p) = &self.public_root {
            cfg.public_root = p.clone();
        }
        if let Some(p) = &self.private_root {
            cfg.private_root = p.clone();
        }
        if let Some(p) = &self.safe_delete_root {
            cfg.safe_delete_root = p.clone();
        }
        if let Some(p) = &self.metadata_root {
            cfg.metadata_root = p.clone();
        }
        if let Some(level) = self.effective_log_level() {
            cfg.log_level = level;
        }
    }
}

pub fn parse() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_parses_path_and_status() {
        let args = Args::try_parse_from(["sift", "classify", "/p/1975/a.jpg", "private"]).unwrap();
        match args.command {
            Some(Command::Classify { path, status }) => {
                assert_eq!(path, PathBuf::from("/p/1975/a.jpg"));
                assert_eq!(status, Status::Private);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn bad_status_is_rejected() {
        assert!(Args::try_parse_from(["sift", "classify", "/x", "secret"]).is_err());
    }

    #[test]
    fn global_flags_after_subcommand_override_config() {
        let args = Args::try_parse_from([
            "sift",
            "stats",
            "--public-root",
            "/a",
            "--metadata-root",
            "/m",
            "-d",
        ])
        .unwrap();
        let mut cfg = Config::new("/x", "/y", "/s", "/meta");
        args.apply_overrides(&mut cfg);
        assert_eq!(cfg.public_root, PathBuf::from("/a"));
        assert_eq!(cfg.private_root, PathBuf::from("/y"));
        assert_eq!(cfg.metadata_root, PathBuf::from("/m"));
        assert_eq!(cfg.log_level, LogLevel::Debug);
    }

    #[test]
    fn debug_beats_log_level() {
        let args = Args::try_parse_from(["sift", "--log-level", "quiet", "-d"]).unwrap();
        assert_eq!(args.effective_log_level(), Some(LogLevel::Debug));
        let args = Args::try_parse_from(["sift", "--log-level", "info"]).unwrap();
        assert_eq!(args.effective_log_level(), Some(LogLevel::Info));
    }
}
