//! Single-file classification.

use anyhow::Result;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::stats::{DirectoryStatus, ancestors_to_root, counts_toward_status};
use super::{Engine, State};
use crate::errors::SiftError;
use crate::fs_ops::Cleanup;
use crate::status::{Status, year_of};

/// What classifying one file did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileOutcome {
    /// Where the file lives now.
    pub path: PathBuf,
    /// True when the file changed roots.
    pub moved: bool,
    /// Metadata was written (false for files with no year in their path).
    pub tracked: bool,
    pub created_dir: Option<PathBuf>,
    pub removed_dirs: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifyOutcome {
    File(FileOutcome),
    Batch(super::BatchReport),
}

impl Engine {
    /// Classify `path` as public or private.
    ///
    /// A directory is expanded into a batch over every file below it. A file already
    /// under the target root only has its metadata refreshed; otherwise it is moved.
    /// Errors propagate to the caller.
    pub fn classify(&self, path: &Path, target_is_public: bool) -> Result<ClassifyOutcome> {
        if path.is_dir() {
            return self
                .batch_classify(path, target_is_public, &mut |_| {})
                .map(ClassifyOutcome::Batch);
        }
        let target = Status::from_is_public(target_is_public);

        let outcome = {
            let mut state = self.state();
            let outcome = self.classify_file(&mut state, path, target, Cleanup::Immediate)?;
            state.store.persist_all()?;
            outcome
        };

        let mut chain = ancestors_to_root(&self.roots, path);
        if outcome.moved {
            chain.extend(ancestors_to_root(&self.roots, &outcome.path));
        }
        self.notify_chain(&chain);
        Ok(ClassifyOutcome::File(outcome))
    }

    /// Shared by `classify` and `batch_classify`; the caller holds the state lock
    /// and persists.
    pub(super) fn classify_file(
        &self,
        state: &mut State,
        path: &Path,
        target: Status,
        cleanup: Cleanup,
    ) -> Result<FileOutcome> {
        let meta = fs::symlink_metadata(path).map_err(|e| SiftError::from_io("stat", path, e))?;
        if meta.is_dir() {
            return Err(SiftError::IsDirectory(path.to_path_buf()).into());
        }
        let located = self
            .roots
            .locate(path)
            .ok_or_else(|| SiftError::NotUnderRoot(path.to_path_buf()))?;
        let tracked = year_of(&located.relative).is_some();
        let before = state.store.get_status(path);

        let (new_path, moved, created_dir, removed_dirs) = if located.root == target {
            debug!(path = %path.display(), status = %target, "already under target root");
            (path.to_path_buf(), false, None, Vec::new())
        } else {
            let out = self.mover.move_file(&mut state.store, path, target, cleanup)?;
            (out.dest, true, out.created_dir, out.removed_dirs)
        };
        state.store.set_status(&new_path, target)?;
        let after = state.store.get_status(&new_path);

        if counts_toward_status(path.file_name().unwrap_or_default()) {
            state.stats.retract(
                path,
                &DirectoryStatus::of_file(before, tracked),
            );
        }
        if counts_toward_status(new_path.file_name().unwrap_or_default()) {
            let new_tracked = self
                .roots
                .locate(&new_path)
                .is_some_and(|l| year_of(&l.relative).is_some());
            state.stats.record(
                &new_path,
                &DirectoryStatus::of_file(after, new_tracked),
            );
        }
        for dir in &removed_dirs {
            state.stats.forget(dir);
        }

        if moved {
            info!(from = %path.display(), to = %new_path.display(), status = %target, "classified");
        } else {
            info!(path = %path.display(), status = %target, "classification confirmed");
        }
        Ok(FileOutcome {
            path: new_path,
            moved,
            tracked,
            created_dir,
            removed_dirs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::*;
    use super::*;
    use crate::errors::SiftError;
    use crate::status::FileState;
    use std::sync::Arc;

    fn file(outcome: ClassifyOutcome) -> FileOutcome {
        match outcome {
            ClassifyOutcome::File(f) => f,
            other => panic!("expected a file outcome, got {other:?}"),
        }
    }

    #[test]
    fn same_root_updates_metadata_only() {
        let sb = Sandbox::new();
        let p = sb.private("2001/a.jpg");
        sb.put(&p, b"a");
        let engine = Engine::open(&sb.cfg).unwrap();
        let out = file(engine.classify(&p, false).unwrap());
        assert!(!out.moved);
        assert_eq!(out.path, p);
        assert!(p.exists());
        assert!(!sb.cfg.safe_delete_root.join("private/2001/a.jpg").exists());
        assert_eq!(
            engine.file_status(&p),
            FileState {
                status: Some(Status::Private),
                reviewed: true
            }
        );
    }

    #[test]
    fn untracked_file_moves_without_metadata() {
        let sb = Sandbox::new();
        let p = sb.public("misc/a.jpg");
        sb.put(&p, b"a");
        let engine = Engine::open(&sb.cfg).unwrap();
        let out = file(engine.classify(&p, false).unwrap());
        assert!(out.moved);
        assert!(!out.tracked);
        assert_eq!(out.path, sb.private("misc/a.jpg"));
        assert_eq!(engine.file_status(&out.path), FileState::default());
    }

    #[test]
    fn refresh_is_sent_for_both_chains() {
        let sb = Sandbox::new();
        let p = sb.public("1975/foo/a.jpg");
        sb.put(&p, b"a");
        sb.put(&sb.public("1975/foo/keep.jpg"), b"k");
        let rec = Arc::new(Recorder::default());
        let engine = Engine::open(&sb.cfg).unwrap().with_observer(rec.clone());
        engine.classify(&p, false).unwrap();
        let refreshed = rec.refreshed.lock().unwrap().clone();
        assert_eq!(
            refreshed,
            vec![
                sb.public("1975/foo"),
                sb.public("1975"),
                sb.cfg.public_root.clone(),
                sb.private("1975/foo"),
                sb.private("1975"),
                sb.cfg.private_root.clone(),
            ]
        );
    }

    #[test]
    fn cached_counts_follow_a_move() {
        let sb = Sandbox::new();
        let p = sb.public("1975/a.jpg");
        sb.put(&p, b"a");
        sb.put(&sb.private("1975/b.jpg"), b"b");
        let engine = Engine::open(&sb.cfg).unwrap();
        let pub_root = sb.cfg.public_root.clone();
        let priv_root = sb.cfg.private_root.clone();
        assert_eq!(engine.directory_status(&pub_root).unwrap().total, 1);
        assert_eq!(engine.directory_status(&priv_root).unwrap().total, 1);

        engine.classify(&p, false).unwrap();
        assert_eq!(engine.directory_status(&pub_root).unwrap().total, 0);
        let private = engine.directory_status(&priv_root).unwrap();
        assert_eq!(private.total, 2);
        assert_eq!(private.private, 1);
        assert_eq!(private.reviewed, 1);
    }

    #[test]
    fn errors_propagate_for_single_files() {
        let sb = Sandbox::new();
        let engine = Engine::open(&sb.cfg).unwrap();
        let err = engine.classify(&sb.public("1975/nope.jpg"), false).unwrap_err();
        assert!(matches!(err.downcast_ref::<SiftError>(), Some(SiftError::NotFound(_))));

        let outside = sb.td.path().join("elsewhere.jpg");
        std::fs::write(&outside, b"x").unwrap();
        let err = engine.classify(&outside, true).unwrap_err();
        assert!(matches!(err.downcast_ref::<SiftError>(), Some(SiftError::NotUnderRoot(_))));
    }

    #[test]
    fn integrity_failure_propagates_and_leaves_the_file_in_place() {
        let sb = Sandbox::new();
        let p = sb.public("1975/a.jpg");
        sb.put(&p, b"a");
        let mut engine = Engine::open(&sb.cfg).unwrap();
        engine.classify(&p, true).unwrap();
        engine.mover.corrupt_copies = true;

        let err = engine.classify(&p, false).unwrap_err();
        assert!(matches!(err.downcast_ref::<SiftError>(), Some(SiftError::Integrity { .. })));
        assert!(p.exists());
        assert!(!sb.private("1975/a.jpg").exists());
        assert_eq!(
            engine.file_status(&p),
            FileState {
                status: Some(Status::Public),
                reviewed: true
            }
        );
        assert_eq!(engine.file_status(&sb.private("1975/a.jpg")), FileState::default());
    }
}
