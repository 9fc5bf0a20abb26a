//! Classification Engine.
//!
//! The engine owns one metadata store, the mover and the directory-status cache.
//! Every operation that touches the store runs under a single mutex, so at most one
//! classification is in flight per engine; a lock file on the metadata root keeps
//! other processes out.
//!
//! Presentation concerns reach the engine through `Observer` (errors and
//! per-directory refresh notifications) and the progress callback passed to
//! `batch_classify`.

mod batch;
mod classify;
mod maintenance;
mod stats;

pub use batch::{BatchFailure, BatchReport};
pub use classify::{ClassifyOutcome, FileOutcome};
pub use maintenance::FileInfo;
pub use stats::DirectoryStatus;

use anyhow::Result;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

use crate::config::Config;
use crate::fs_ops::{Mover, StoreLock, acquire_store_lock};
use crate::metadata::MetadataStore;
use crate::shutdown::CancelToken;
use crate::status::{FileState, Roots};
use stats::StatsCache;

/// Callbacks from the engine to whatever is displaying its results.
pub trait Observer: Send + Sync {
    /// A single file in a batch failed; the batch continues.
    fn on_error(&self, _message: &str) {}
    /// Counts for `dir` may have changed.
    fn on_refresh(&self, _dir: &Path) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl Observer for NoopObserver {}

pub(crate) struct State {
    pub(crate) store: MetadataStore,
    pub(crate) stats: StatsCache,
}

pub struct Engine {
    roots: Roots,
    mover: Mover,
    state: Mutex<State>,
    observer: Arc<dyn Observer>,
    cancel: CancelToken,
    _lock: StoreLock,
}

impl Engine {
    /// Open an engine over a validated config.
    pub fn open(cfg: &Config) -> Result<Self> {
        let lock = acquire_store_lock(&cfg.metadata_root)?;
        let roots = Roots::new(&cfg.public_root, &cfg.private_root);
        let store = MetadataStore::open(roots.clone(), &cfg.metadata_root)?;
        debug!(metadata_root = %cfg.metadata_root.display(), "engine opened");
        Ok(Self {
            roots,
            mover: Mover::new(&cfg.safe_delete_root, cfg.preserve_metadata),
            state: Mutex::new(State {
                store,
                stats: StatsCache::default(),
            }),
            observer: Arc::new(NoopObserver),
            cancel: CancelToken::new(),
            _lock: lock,
        })
    }

    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn roots(&self) -> &Roots {
        &self.roots
    }

    pub fn safe_delete_root(&self) -> &Path {
        self.mover.safe_delete_root()
    }

    /// A poisoned mutex still holds consistent data: every mutation either completes
    /// or leaves the store dirty for the next flush.
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// `(status, reviewed)` for one file.
    pub fn file_status(&self, path: &Path) -> FileState {
        self.state().store.get_status(path)
    }

    /// Counts for every visible file below `dir`, memoized until a classification
    /// invalidates them.
    pub fn directory_status(&self, dir: &Path) -> Result<DirectoryStatus> {
        let mut state = self.state();
        if let Some(hit) = state.stats.get(dir) {
            return Ok(hit);
        }
        let computed = stats::compute(&mut state.store, dir)?;
        state.stats.insert(dir, computed);
        Ok(computed)
    }

    fn notify_chain(&self, chain: &[std::path::PathBuf]) {
        for dir in chain {
            self.observer.on_refresh(dir);
        }
    }
}
