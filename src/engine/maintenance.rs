//! Housekeeping around the engine: search, metadata validation, backup retention,
//! index queries and small file/directory lookups.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

use super::Engine;
use crate::errors::SiftError;
use crate::fs_ops::{BackupCleanup, cleanup_backups};
use crate::metadata::{RecentChange, SortingStatistics};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileInfo {
    pub size: u64,
    pub modified: Option<DateTime<Local>>,
    /// Not every platform/filesystem reports a birth time.
    pub created: Option<DateTime<Local>>,
}

impl Engine {
    /// Files below `dir` whose name contains `query`, case-insensitively, sorted.
    pub fn search(&self, query: &str, dir: &Path) -> Vec<PathBuf> {
        let needle = query.to_lowercase();
        let mut hits: Vec<PathBuf> = WalkDir::new(dir)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                e.file_name()
                    .to_string_lossy()
                    .to_lowercase()
                    .contains(&needle)
            })
            .map(|e| e.into_path())
            .collect();
        hits.sort();
        info!(query, dir = %dir.display(), results = hits.len(), "search finished");
        hits
    }

    /// Prune metadata whose file no longer exists. Returns the pruned paths.
    pub fn validate_paths(&self) -> Result<Vec<PathBuf>> {
        let mut state = self.state();
        let pruned = state.store.prune_missing();
        state.store.persist_all()?;
        if !pruned.is_empty() {
            state.stats.clear();
        }
        info!(pruned = pruned.len(), "metadata validated");
        Ok(pruned)
    }

    /// Purge backups older than `days_old` days from the safe-delete area.
    pub fn cleanup_backups(&self, days_old: u64) -> Result<BackupCleanup> {
        cleanup_backups(self.safe_delete_root(), days_old)
    }

    /// Counts from the index; no filesystem scan.
    pub fn sorting_statistics(&self) -> SortingStatistics {
        self.state().store.index().statistics()
    }

    /// Files reviewed within the last `days` days, newest first.
    pub fn recent_changes(&self, days: u64) -> Vec<RecentChange> {
        self.state().store.index().recent(days)
    }

    /// Rebuild the index from the shard files and write it out.
    pub fn rebuild_index(&self) -> Result<usize> {
        let mut state = self.state();
        state.store.rebuild_index()?;
        state.store.persist_all()?;
        Ok(state.store.index().len())
    }

    pub fn file_info(&self, path: &Path) -> Result<FileInfo> {
        let meta = fs::metadata(path).map_err(|e| SiftError::from_io("stat", path, e))?;
        if meta.is_dir() {
            return Err(SiftError::IsDirectory(path.to_path_buf()).into());
        }
        Ok(FileInfo {
            size: meta.len(),
            modified: meta.modified().ok().map(DateTime::<Local>::from),
            created: meta.created().ok().map(DateTime::<Local>::from),
        })
    }

    /// Child names of `dir`, sorted.
    pub fn list_directory(&self, dir: &Path) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(dir).with_context(|| format!("list '{}'", dir.display()))? {
            match entry {
                Ok(e) => names.push(e.file_name().to_string_lossy().into_owned()),
                Err(e) => warn!(dir = %dir.display(), error = %e, "skipping unreadable entry"),
            }
        }
        names.sort();
        Ok(names)
    }
}
