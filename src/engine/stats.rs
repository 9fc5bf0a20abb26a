//! Status Aggregator.
//!
//! Counts public/private/reviewed/unreviewed files below a directory from the
//! metadata store. Results are memoized per directory; a single-file
//! classification adjusts every cached directory containing the old or new
//! location in place instead of rescanning, and batch operations drop the cache.

use anyhow::Result;
use serde::Serialize;
use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::errors::SiftError;
use crate::metadata::MetadataStore;
use crate::platform::is_tmp_name;
use crate::status::{FileState, Roots, Status, year_of};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DirectoryStatus {
    pub public: usize,
    pub private: usize,
    pub reviewed: usize,
    pub unreviewed: usize,
    /// Files with no year in their path; they carry no metadata.
    pub untracked: usize,
    pub total: usize,
}

impl DirectoryStatus {
    /// Contribution of one file.
    pub fn of_file(state: FileState, tracked: bool) -> Self {
        let mut s = Self {
            total: 1,
            ..Self::default()
        };
        match state.status {
            Some(Status::Public) => s.public = 1,
            Some(Status::Private) => s.private = 1,
            None => {}
        }
        if state.reviewed {
            s.reviewed = 1;
        } else {
            s.unreviewed = 1;
        }
        if !tracked {
            s.untracked = 1;
        }
        s
    }

    fn add(&mut self, o: &Self) {
        self.public += o.public;
        self.private += o.private;
        self.reviewed += o.reviewed;
        self.unreviewed += o.unreviewed;
        self.untracked += o.untracked;
        self.total += o.total;
    }

    fn sub(&mut self, o: &Self) {
        self.public = self.public.saturating_sub(o.public);
        self.private = self.private.saturating_sub(o.private);
        self.reviewed = self.reviewed.saturating_sub(o.reviewed);
        self.unreviewed = self.unreviewed.saturating_sub(o.unreviewed);
        self.untracked = self.untracked.saturating_sub(o.untracked);
        self.total = self.total.saturating_sub(o.total);
    }
}

/// Hidden files and in-flight temp files are not counted.
pub(crate) fn counts_toward_status(name: &OsStr) -> bool {
    let name = name.to_string_lossy();
    !name.starts_with('.') && !is_tmp_name(&name)
}

/// Walk `dir` and count every visible file.
pub(crate) fn compute(store: &mut MetadataStore, dir: &Path) -> Result<DirectoryStatus> {
    if !dir.is_dir() {
        return Err(SiftError::NotADirectory(dir.to_path_buf()).into());
    }
    let mut status = DirectoryStatus::default();
    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry while counting");
                continue;
            }
        };
        if !entry.file_type().is_file() || !counts_toward_status(entry.file_name()) {
            continue;
        }
        let tracked = store
            .roots()
            .locate(entry.path())
            .is_some_and(|l| year_of(&l.relative).is_some());
        let state = store.get_status(entry.path());
        status.add(&DirectoryStatus::of_file(state, tracked));
    }
    debug!(path = %dir.display(), total = status.total, "directory status computed");
    Ok(status)
}

/// Directories from `path`'s parent up to and including the root holding it.
pub(crate) fn ancestors_to_root(roots: &Roots, path: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    for dir in path.ancestors().skip(1) {
        let Some(located) = roots.locate(dir) else {
            break;
        };
        out.push(dir.to_path_buf());
        if located.relative.as_os_str().is_empty() {
            break;
        }
    }
    out
}

/// Memoized directory counts.
#[derive(Debug, Default)]
pub(crate) struct StatsCache {
    dirs: HashMap<PathBuf, DirectoryStatus>,
}

impl StatsCache {
    pub fn get(&self, dir: &Path) -> Option<DirectoryStatus> {
        self.dirs.get(dir).copied()
    }

    pub fn insert(&mut self, dir: &Path, status: DirectoryStatus) {
        self.dirs.insert(dir.to_path_buf(), status);
    }

    pub fn forget(&mut self, dir: &Path) {
        self.dirs.remove(dir);
    }

    pub fn clear(&mut self) {
        self.dirs.clear();
    }

    /// Remove a file's contribution from every cached directory containing it,
    /// including directories above the roots.
    pub fn retract(&mut self, file: &Path, contribution: &DirectoryStatus) {
        for (dir, s) in self.dirs.iter_mut() {
            if file.starts_with(dir) {
                s.sub(contribution);
            }
        }
    }

    /// Add a file's contribution to every cached directory containing it.
    pub fn record(&mut self, file: &Path, contribution: &DirectoryStatus) {
        for (dir, s) in self.dirs.iter_mut() {
            if file.starts_with(dir) {
                s.add(contribution);
            }
        }
    }
}
