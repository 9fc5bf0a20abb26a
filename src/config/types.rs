//! Core configuration types.
//! - Config holds runtime settings with sensible defaults.
//! - LogLevel represents verbosity with simple parsing helpers.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::BACKUP_RETENTION_DAYS_DEFAULT;
use super::paths;

/// Program-defined verbosity levels exposed to users/config.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Only errors
    Quiet,
    /// Informational output (default)
    #[default]
    Normal,
    /// More info (like verbose)
    Info,
    /// Debug/trace
    Debug,
}

impl LogLevel {
    /// Parse common string names into our LogLevel (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "quiet" | "error" | "none" => Some(LogLevel::Quiet),
            "normal" => Some(LogLevel::Normal),
            "info" | "verbose" | "detailed" => Some(LogLevel::Info),
            "debug" | "trace" => Some(LogLevel::Debug),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Quiet => "quiet",
            LogLevel::Normal => "normal",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        };
        f.write_str(s)
    }
}

impl FromStr for LogLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid log level: '{s}'"))
    }
}

/// Runtime configuration for the classification engine.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root holding files classified public
    pub public_root: PathBuf,
    /// Root holding files classified private
    pub private_root: PathBuf,
    /// Pre-move backups, partitioned by status
    pub safe_delete_root: PathBuf,
    /// Shard and index files
    pub metadata_root: PathBuf,
    /// Console verbosity
    pub log_level: LogLevel,
    /// Optional path to a log file
    pub log_file: Option<PathBuf>,
    /// Age in days after which backups are purged
    pub backup_retention_days: u64,
    /// If true, moved files keep timestamps and permissions
    pub preserve_metadata: bool,
}

impl Default for Config {
    fn default() -> Self {
        let base = paths::default_data_dir();
        Self {
            public_root: base.join("public"),
            private_root: base.join("private"),
            safe_delete_root: base.join("safe_delete"),
            metadata_root: base.join("metadata"),
            log_level: LogLevel::Normal,
            log_file: paths::default_log_path(),
            backup_retention_days: BACKUP_RETENTION_DAYS_DEFAULT,
            preserve_metadata: true,
        }
    }
}

impl Config {
    /// Construct a Config with explicit directories; other fields use defaults.
    pub fn new(
        public_root: impl Into<PathBuf>,
        private_root: impl Into<PathBuf>,
        safe_delete_root: impl Into<PathBuf>,
        metadata_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            public_root: public_root.into(),
            private_root: private_root.into(),
            safe_delete_root: safe_delete_root.into(),
            metadata_root: metadata_root.into(),
            ..Default::default()
        }
    }
}
