//! Safe-delete area.
//!
//! Before a file leaves its root, a copy is written to
//! `<safe_delete_root>/<status>/<relative path>`, where `status` is the root the
//! file is leaving. A later backup of the same relative path replaces the earlier
//! one. Backups carry a fresh mtime so retention counts from when the backup was
//! taken.

use anyhow::Result;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::copy::copy_via_temp;
use super::helpers::io_error_with_help;
use crate::status::Status;

/// Where the backup of `relative` (currently under `status`'s root) lives.
pub fn backup_path(safe_delete_root: &Path, status: Status, relative: &Path) -> PathBuf {
    safe_delete_root.join(status.as_str()).join(relative)
}

/// Copy `src` into the safe-delete area. Returns the backup path.
pub fn create_backup(
    safe_delete_root: &Path,
    status: Status,
    relative: &Path,
    src: &Path,
) -> Result<PathBuf> {
    let dest = backup_path(safe_delete_root, status, relative);
    copy_via_temp(src, &dest, true)?;
    debug!(src = %src.display(), backup = %dest.display(), "backup created");
    Ok(dest)
}

/// Outcome of a retention sweep.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct BackupCleanup {
    pub removed_files: usize,
    pub removed_dirs: usize,
    pub failures: usize,
}

/// Delete backups whose mtime is older than `days_old` days, then prune directories
/// left empty. The area root and its two status partitions are kept.
pub fn cleanup_backups(safe_delete_root: &Path, days_old: u64) -> Result<BackupCleanup> {
    let mut report = BackupCleanup::default();
    if !safe_delete_root.is_dir() {
        return Ok(report);
    }
    let age = Duration::from_secs(days_old.saturating_mul(86_400));
    let cutoff = SystemTime::now()
        .checked_sub(age)
        .unwrap_or(SystemTime::UNIX_EPOCH);

    for entry in WalkDir::new(safe_delete_root).follow_links(false) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "skipping unreadable backup entry");
                report.failures += 1;
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let modified = match entry.metadata().map(|m| m.modified()) {
            Ok(Ok(t)) => t,
            _ => continue,
        };
        if modified >= cutoff {
            continue;
        }
        match fs::remove_file(entry.path()) {
            Ok(()) => {
                let when: DateTime<Local> = modified.into();
                debug!(path = %entry.path().display(), modified = %when.format("%Y-%m-%d"), "expired backup removed");
                report.removed_files += 1;
            }
            Err(e) => {
                let err = io_error_with_help("remove expired backup", entry.path())(e);
                warn!(error = %err, "backup not removed");
                report.failures += 1;
            }
        }
    }

    let keep: Vec<PathBuf> = std::iter::once(safe_delete_root.to_path_buf())
        .chain(Status::ALL.iter().map(|s| safe_delete_root.join(s.as_str())))
        .collect();
    for entry in WalkDir::new(safe_delete_root)
        .follow_links(false)
        .contents_first(true)
        .into_iter()
        .flatten()
    {
        if !entry.file_type().is_dir() || keep.iter().any(|k| k == entry.path()) {
            continue;
        }
        if fs::remove_dir(entry.path()).is_ok() {
            report.removed_dirs += 1;
        }
    }

    info!(
        files = report.removed_files,
        dirs = report.removed_dirs,
        days = days_old,
        "backup cleanup finished"
    );
    Ok(report)
}
