//! Batch (recursive) classification.
//!
//! Files below the directory are processed one at a time in file-name order.
//! A failure affects only that file; everything already moved stays moved and a
//! re-run picks up where the last one stopped. Cleanup of emptied directories,
//! metadata persistence and the statistics refresh each happen once, after the
//! last file. An empty directory is left as it is.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::Engine;
use super::stats::ancestors_to_root;
use crate::errors::SiftError;
use crate::fs_ops::{Cleanup, is_incidental, prune_upwards, remove_empty_tree};
use crate::platform::is_tmp_name;
use crate::status::Status;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchFailure {
    pub path: PathBuf,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Files enumerated.
    pub total: usize,
    /// Files handled without error (moved or confirmed in place).
    pub processed: usize,
    pub moved: usize,
    pub unchanged: usize,
    /// Files that vanished between enumeration and processing.
    pub skipped: usize,
    pub failures: Vec<BatchFailure>,
    pub removed_dirs: Vec<PathBuf>,
    /// The cancel token was tripped before every file was handled.
    pub cancelled: bool,
}

/// `round(100 * done / total)`, for `total > 0`.
pub(crate) fn percent(done: usize, total: usize) -> u8 {
    let pct = (200 * done as u128 + total as u128) / (2 * total as u128);
    pct.min(100) as u8
}

/// Regular files below `dir`, sorted by path; incidental artifacts and our own
/// temp files are left out.
fn enumerate_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| match e {
            Ok(e) => Some(e),
            Err(err) => {
                warn!(error = %err, "skipping unreadable entry during enumeration");
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .filter(|e| !is_incidental(e.file_name()) && !is_tmp_name(&e.file_name().to_string_lossy()))
        .map(|e| e.into_path())
        .collect()
}

impl Engine {
    /// Classify every file below `dir`. `on_progress` receives the rounded percentage
    /// once per enumerated file, in processing order; it is never called for an
    /// empty directory.
    pub fn batch_classify(
        &self,
        dir: &Path,
        target_is_public: bool,
        on_progress: &mut dyn FnMut(u8),
    ) -> Result<BatchReport> {
        if !dir.is_dir() {
            return Err(SiftError::NotADirectory(dir.to_path_buf()).into());
        }
        let located = self
            .roots
            .locate(dir)
            .ok_or_else(|| SiftError::NotUnderRoot(dir.to_path_buf()))?;
        let target = Status::from_is_public(target_is_public);

        let files = enumerate_files(dir);
        let mut report = BatchReport {
            total: files.len(),
            ..BatchReport::default()
        };
        if files.is_empty() {
            debug!(dir = %dir.display(), "nothing to classify");
            return Ok(report);
        }
        info!(dir = %dir.display(), files = report.total, status = %target, "batch started");

        // The state lock is held per file only; callbacks run unlocked so they may
        // query the engine.
        for (i, file) in files.iter().enumerate() {
            if self.cancel.is_cancelled() {
                warn!(done = i, total = report.total, "batch cancelled");
                report.cancelled = true;
                break;
            }
            let result = {
                let mut state = self.state();
                self.classify_file(&mut state, file, target, Cleanup::Deferred)
            };
            match result {
                Ok(out) => {
                    report.processed += 1;
                    if out.moved {
                        report.moved += 1;
                    } else {
                        report.unchanged += 1;
                    }
                }
                Err(e) if matches!(e.downcast_ref::<SiftError>(), Some(SiftError::NotFound(_))) => {
                    warn!(path = %file.display(), "file vanished before it could be classified");
                    report.skipped += 1;
                }
                Err(e) => {
                    let message = format!("{}: {e:#}", file.display());
                    warn!(error = %message, "file not classified");
                    self.observer.on_error(&message);
                    report.failures.push(BatchFailure {
                        path: file.clone(),
                        message,
                    });
                }
            }
            on_progress(percent(i + 1, report.total));
        }

        {
            let mut state = self.state();
            report.removed_dirs = remove_empty_tree(&self.roots, dir);
            if !dir.exists()
                && let Some(parent) = dir.parent()
            {
                report.removed_dirs.extend(prune_upwards(&self.roots, parent));
            }
            state.stats.clear();
            state
                .store
                .persist_all()
                .context("persist metadata after batch")?;
        }

        let mirror = self.roots.path_for(target, &located.relative);
        let mut chain = vec![dir.to_path_buf()];
        chain.extend(ancestors_to_root(&self.roots, dir));
        if mirror != dir {
            chain.push(mirror.clone());
            chain.extend(ancestors_to_root(&self.roots, &mirror));
        }
        self.notify_chain(&chain);

        info!(
            dir = %dir.display(),
            processed = report.processed,
            moved = report.moved,
            unchanged = report.unchanged,
            failed = report.failures.len(),
            removed_dirs = report.removed_dirs.len(),
            "batch finished"
        );
        debug!(cancelled = report.cancelled, skipped = report.skipped, "batch details");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::*;
    use super::*;
    use crate::engine::Observer;
    use crate::shutdown::CancelToken;
    use crate::status::FileState;
    use std::fs;
    use std::sync::{Arc, Mutex};

    #[test]
    fn percent_rounds_to_nearest() {
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(3, 3), 100);
        assert_eq!(percent(1, 200), 1);
        assert_eq!(percent(1, 201), 0);
    }

    #[test]
    fn enumeration_is_sorted_and_skips_artifacts() {
        let sb = Sandbox::new();
        sb.put(&sb.public("1975/b/2.jpg"), b"");
        sb.put(&sb.public("1975/a/1.jpg"), b"");
        sb.put(&sb.public("1975/a/.DS_Store"), b"");
        sb.put(&sb.public("1975/c.jpg"), b"");
        let files = enumerate_files(&sb.public("1975"));
        assert_eq!(
            files,
            vec![sb.public("1975/a/1.jpg"), sb.public("1975/b/2.jpg"), sb.public("1975/c.jpg")]
        );
    }

    #[test]
    fn empty_directory_returns_without_touching_anything() {
        let sb = Sandbox::new();
        fs::create_dir_all(sb.public("1975/empty")).unwrap();
        let rec = Arc::new(Recorder::default());
        let engine = Engine::open(&sb.cfg).unwrap().with_observer(rec.clone());
        let mut calls = Vec::new();
        let report = engine
            .batch_classify(&sb.public("1975/empty"), false, &mut |p| calls.push(p))
            .unwrap();
        assert!(calls.is_empty());
        assert_eq!(report.total, 0);
        assert!(report.removed_dirs.is_empty());
        assert!(sb.public("1975/empty").is_dir());
        assert!(rec.refreshed.lock().unwrap().is_empty());
    }

    #[test]
    fn progress_callback_can_query_the_engine() {
        let sb = Sandbox::new();
        sb.put(&sb.public("1975/a.jpg"), b"a");
        sb.put(&sb.public("1975/b.jpg"), b"b");
        let engine = Engine::open(&sb.cfg).unwrap();
        let priv_root = sb.cfg.private_root.clone();
        let mut seen = Vec::new();
        engine
            .batch_classify(&sb.public("1975"), false, &mut |_| {
                seen.push(engine.directory_status(&priv_root).unwrap().private);
            })
            .unwrap();
        assert_eq!(seen, vec![1, 2]);
    }

    struct Reentrant {
        engine: Mutex<Option<Arc<Engine>>>,
        probed: Mutex<Vec<FileState>>,
    }

    impl Observer for Reentrant {
        fn on_error(&self, message: &str) {
            let path = message.split(": ").next().unwrap_or_default();
            if let Some(engine) = self.engine.lock().unwrap().as_ref() {
                self.probed.lock().unwrap().push(engine.file_status(Path::new(path)));
            }
        }
    }

    #[test]
    fn error_callback_can_query_the_engine() {
        let sb = Sandbox::new();
        sb.put(&sb.public("1980/x/a.jpg"), b"a");
        sb.put(&sb.private("1980/x"), b"not a directory");
        let obs = Arc::new(Reentrant {
            engine: Mutex::new(None),
            probed: Mutex::new(Vec::new()),
        });
        let engine = Arc::new(Engine::open(&sb.cfg).unwrap().with_observer(obs.clone()));
        *obs.engine.lock().unwrap() = Some(engine.clone());

        let report = engine
            .batch_classify(&sb.public("1980"), false, &mut |_| {})
            .unwrap();
        assert_eq!(report.failures.len(), 1);
        assert_eq!(obs.probed.lock().unwrap().as_slice(), &[FileState::default()]);
        // Break the observer/engine cycle.
        obs.engine.lock().unwrap().take();
    }

    #[test]
    fn failures_are_reported_and_batch_continues() {
        let sb = Sandbox::new();
        sb.put(&sb.public("1980/x/a.jpg"), b"a");
        sb.put(&sb.public("1980/y/b.jpg"), b"b");
        // A regular file where a.jpg's destination directory must go.
        sb.put(&sb.private("1980/x"), b"not a directory");
        let rec = Arc::new(Recorder::default());
        let engine = Engine::open(&sb.cfg).unwrap().with_observer(rec.clone());

        let mut calls = Vec::new();
        let report = engine
            .batch_classify(&sb.public("1980"), false, &mut |p| calls.push(p))
            .unwrap();
        assert_eq!(calls, vec![50, 100]);
        assert_eq!(report.processed, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, sb.public("1980/x/a.jpg"));
        assert!(sb.public("1980/x/a.jpg").exists());
        assert!(sb.private("1980/y/b.jpg").exists());
        assert!(!sb.public("1980/y").exists());
        assert_eq!(rec.errors.lock().unwrap().len(), 1);
    }

    #[test]
    fn cancelled_token_stops_before_first_file() {
        let sb = Sandbox::new();
        sb.put(&sb.public("1990/a.jpg"), b"a");
        let token = CancelToken::new();
        let engine = Engine::open(&sb.cfg).unwrap().with_cancel_token(token.clone());
        token.cancel();
        let mut calls = Vec::new();
        let report = engine
            .batch_classify(&sb.public("1990"), false, &mut |p| calls.push(p))
            .unwrap();
        assert!(report.cancelled);
        assert_eq!(report.processed, 0);
        assert!(calls.is_empty());
        assert!(sb.public("1990/a.jpg").exists());
    }

    #[test]
    fn refresh_covers_dir_and_mirror_chains() {
        let sb = Sandbox::new();
        sb.put(&sb.public("1975/foo/a.jpg"), b"a");
        sb.put(&sb.public("1975/keep.jpg"), b"k");
        let rec = Arc::new(Recorder::default());
        let engine = Engine::open(&sb.cfg).unwrap().with_observer(rec.clone());
        engine
            .batch_classify(&sb.public("1975/foo"), false, &mut |_| {})
            .unwrap();
        let refreshed = rec.refreshed.lock().unwrap().clone();
        assert_eq!(refreshed.first(), Some(&sb.public("1975/foo")));
        assert!(refreshed.contains(&sb.cfg.public_root));
        assert!(refreshed.contains(&sb.private("1975/foo")));
        assert!(refreshed.contains(&sb.cfg.private_root));
    }

    #[test]
    fn integrity_failures_are_recorded_per_file() {
        let sb = Sandbox::new();
        sb.put(&sb.public("1985/a.jpg"), b"a");
        sb.put(&sb.public("1985/b.jpg"), b"b");
        let rec = Arc::new(Recorder::default());
        let mut engine = Engine::open(&sb.cfg).unwrap().with_observer(rec.clone());
        engine.mover.corrupt_copies = true;

        let mut calls = Vec::new();
        let report = engine
            .batch_classify(&sb.public("1985"), false, &mut |p| calls.push(p))
            .unwrap();
        assert_eq!(calls, vec![50, 100]);
        assert_eq!(report.processed, 0);
        assert_eq!(
            report.failures.iter().map(|f| f.path.clone()).collect::<Vec<_>>(),
            vec![sb.public("1985/a.jpg"), sb.public("1985/b.jpg")]
        );
        assert!(report.failures.iter().all(|f| f.message.contains("Integrity check failed")));
        assert!(sb.public("1985/a.jpg").exists());
        assert!(sb.public("1985/b.jpg").exists());
        assert!(!sb.private("1985/a.jpg").exists());
        assert_eq!(rec.errors.lock().unwrap().len(), 2);
    }
}
