//! Metadata Store.
//!
//! Maps a file's path (relative to the root that holds it) to its review entry.
//! Entries are sharded by `(status, year)`; shards are loaded lazily, cached for
//! the lifetime of the store and written back by `persist_all`. Mutations only
//! mark shards dirty, so a batch costs one write per touched shard.
//!
//! Files whose relative path has no year component are untracked: lookups return
//! the default state and mutations are no-ops.

mod index;
mod shard;

pub use index::{Index, IndexEntry, RecentChange, SortingStatistics};
pub use shard::{ReviewEntry, Shard, ShardKey};

use anyhow::Result;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::errors::SiftError;
use crate::status::{FileState, Located, Roots, Status, key_to_relative};

pub struct MetadataStore {
    roots: Roots,
    metadata_root: PathBuf,
    shards: HashMap<ShardKey, Shard>,
    index: Index,
}

impl MetadataStore {
    /// Open the store rooted at `metadata_root`. The index is rebuilt from the shard
    /// files when its own files are missing or undecodable.
    pub fn open(roots: Roots, metadata_root: impl Into<PathBuf>) -> Result<Self> {
        let metadata_root = metadata_root.into();
        let (index, stale) = Index::load(&metadata_root);
        let mut store = Self {
            roots,
            metadata_root,
            shards: HashMap::new(),
            index,
        };
        if stale {
            store.rebuild_index()?;
        }
        Ok(store)
    }

    pub fn roots(&self) -> &Roots {
        &self.roots
    }

    pub fn metadata_root(&self) -> &Path {
        &self.metadata_root
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    /// True when some shard or the index has unflushed changes.
    pub fn is_dirty(&self) -> bool {
        self.index.dirty || self.shards.values().any(|s| s.dirty)
    }

    fn shard_mut(&mut self, key: &ShardKey) -> &mut Shard {
        let path = key.path(&self.metadata_root);
        self.shards
            .entry(key.clone())
            .or_insert_with(|| Shard::load(&path))
    }

    /// Resolve a path and its year; `None` for untracked files.
    fn tracked(&self, path: &Path) -> Result<Option<(Located, String)>, SiftError> {
        let located = self
            .roots
            .locate(path)
            .ok_or_else(|| SiftError::NotUnderRoot(path.to_path_buf()))?;
        Ok(located.year().map(|year| (located, year)))
    }

    /// Full entry for `path`, looked up in the shard of the root that holds it.
    pub fn entry(&mut self, path: &Path) -> Option<ReviewEntry> {
        let (located, year) = self.tracked(path).ok()??;
        let key = located.key();
        self.shard_mut(&ShardKey::new(located.root, year))
            .entries
            .get(&key)
            .cloned()
    }

    /// `(status, reviewed)` for `path`; the default state when the path is outside
    /// both roots, has no year or has no entry.
    pub fn get_status(&mut self, path: &Path) -> FileState {
        match self.entry(path) {
            Some(e) => FileState {
                status: Some(e.status),
                reviewed: e.reviewed,
            },
            None => FileState::default(),
        }
    }

    /// Record an explicit classification of `path` as `new_status`.
    ///
    /// The entry lands in the `(new_status, year)` shard and is removed from the
    /// other status shard of the same year. Returns `false` when the file is
    /// untracked.
    pub fn set_status(&mut self, path: &Path, new_status: Status) -> Result<bool, SiftError> {
        let Some((located, year)) = self.tracked(path)? else {
            debug!(path = %path.display(), "no year in path; not tracked");
            return Ok(false);
        };
        let key = located.key();
        for other in Status::ALL.into_iter().filter(|s| *s != new_status) {
            let shard = self.shard_mut(&ShardKey::new(other, year.clone()));
            if shard.entries.remove(&key).is_some() {
                shard.dirty = true;
            }
            self.index.remove(other, &key);
        }
        let entry = ReviewEntry::reviewed_now(new_status);
        let shard = self.shard_mut(&ShardKey::new(new_status, year.clone()));
        shard.entries.insert(key.clone(), entry.clone());
        shard.dirty = true;
        self.index.upsert(new_status, &key, &year, &entry);
        debug!(key = %key, status = %new_status, "status set");
        Ok(true)
    }

    /// Move the entry for `old_path` to `new_path`, keeping its fields.
    ///
    /// A missing old entry is tolerated: the new path gets an unreviewed entry
    /// carrying the status of the root it now lives under.
    pub fn rename_entry(&mut self, old_path: &Path, new_path: &Path) -> Result<(), SiftError> {
        let old = self.tracked(old_path)?;
        let new_located = self
            .roots
            .locate(new_path)
            .ok_or_else(|| SiftError::NotUnderRoot(new_path.to_path_buf()))?;

        let taken = match &old {
            Some((located, year)) => {
                let key = located.key();
                let shard = self.shard_mut(&ShardKey::new(located.root, year.clone()));
                let taken = shard.entries.remove(&key);
                if taken.is_some() {
                    shard.dirty = true;
                }
                self.index.remove(located.root, &key);
                taken
            }
            None => None,
        };

        let Some(new_year) = new_located.year() else {
            debug!(path = %new_path.display(), "renamed into an untracked location");
            return Ok(());
        };
        let entry = taken.unwrap_or_else(|| {
            debug!(path = %old_path.display(), "no entry to rename; starting unreviewed");
            ReviewEntry::unreviewed(new_located.root)
        });
        let key = new_located.key();
        let shard = self.shard_mut(&ShardKey::new(new_located.root, new_year.clone()));
        shard.entries.insert(key.clone(), entry.clone());
        shard.dirty = true;
        self.index.upsert(new_located.root, &key, &new_year, &entry);
        Ok(())
    }

    /// Write every dirty shard and, if changed, the index. Returns the number of
    /// shard files written.
    pub fn persist_all(&mut self) -> Result<usize> {
        let mut written = 0;
        let mut keys: Vec<ShardKey> = self
            .shards
            .iter()
            .filter(|(_, s)| s.dirty)
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        for key in keys {
            let path = key.path(&self.metadata_root);
            if let Some(shard) = self.shards.get_mut(&key) {
                shard.save(&path)?;
                written += 1;
            }
        }
        if self.index.dirty {
            self.index.save(&self.metadata_root)?;
        }
        if written > 0 {
            debug!(shards = written, "metadata persisted");
        }
        Ok(written)
    }

    /// Shard keys present on disk, in key order.
    pub fn shard_keys_on_disk(&self) -> Vec<ShardKey> {
        let mut keys = Vec::new();
        for status in Status::ALL {
            let dir = self.metadata_root.join(status.as_str());
            let Ok(rd) = fs::read_dir(&dir) else {
                continue;
            };
            for entry in rd.flatten() {
                let name = entry.file_name();
                if let Some(key) = ShardKey::from_file_name(&name.to_string_lossy())
                    && key.status == status
                {
                    keys.push(key);
                }
            }
        }
        keys.sort();
        keys
    }

    /// Every shard key the store knows about, on disk or only in memory.
    fn known_shard_keys(&self) -> Vec<ShardKey> {
        let mut keys = self.shard_keys_on_disk();
        keys.extend(self.shards.keys().cloned());
        keys.sort();
        keys.dedup();
        keys
    }

    /// Reconstruct the index from every shard.
    pub fn rebuild_index(&mut self) -> Result<()> {
        self.index.clear();
        for key in self.known_shard_keys() {
            let entries: Vec<(String, ReviewEntry)> = self
                .shard_mut(&key)
                .entries
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            for (k, v) in entries {
                self.index.upsert(key.status, &k, &key.year, &v);
            }
        }
        info!(entries = self.index.len(), "index rebuilt from shards");
        Ok(())
    }

    /// Drop entries whose backing file no longer exists; returns the absolute paths
    /// that were pruned. Changes are left dirty for the caller to persist.
    pub fn prune_missing(&mut self) -> Vec<PathBuf> {
        let mut pruned = Vec::new();
        for key in self.known_shard_keys() {
            let root = self.roots.root(key.status).to_path_buf();
            let shard = self.shard_mut(&key);
            let missing: Vec<String> = shard
                .entries
                .keys()
                .filter(|k| !root.join(key_to_relative(k)).exists())
                .cloned()
                .collect();
            if missing.is_empty() {
                continue;
            }
            for k in &missing {
                shard.entries.remove(k);
            }
            shard.dirty = true;
            for k in missing {
                warn!(shard = %key.file_name(), key = %k, "pruning entry for missing file");
                self.index.remove(key.status, &k);
                pruned.push(root.join(key_to_relative(&k)));
            }
        }
        pruned
    }
}
