//! Global index: `(status, relative path) -> {year, status, reviewed, last_reviewed}`.
//!
//! The index is a cache over the shards. It is written to
//! `<metadata_root>/index/<status>_index.json` and can always be rebuilt from the
//! shard files, so a missing or corrupt index file only costs a rebuild.

use anyhow::Result;
use chrono::{DateTime, Duration, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::shard::{ReviewEntry, read_json_map, write_json_map};
use crate::status::Status;

const INDEX_DIR: &str = "index";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub year: String,
    pub status: Status,
    #[serde(default)]
    pub reviewed: bool,
    #[serde(default)]
    pub last_reviewed: Option<DateTime<Local>>,
}

impl IndexEntry {
    pub fn from_review(year: &str, entry: &ReviewEntry) -> Self {
        Self {
            year: year.to_string(),
            status: entry.status,
            reviewed: entry.reviewed,
            last_reviewed: entry.last_reviewed,
        }
    }
}

/// Counts over every indexed file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SortingStatistics {
    pub public: usize,
    pub private: usize,
    pub reviewed: usize,
    pub unreviewed: usize,
    pub total: usize,
    /// Per-year `(public, private)` split.
    pub by_year: BTreeMap<String, (usize, usize)>,
}

/// One recently reviewed file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentChange {
    pub key: String,
    pub status: Status,
    pub last_reviewed: DateTime<Local>,
}

#[derive(Debug, Default)]
pub struct Index {
    public: BTreeMap<String, IndexEntry>,
    private: BTreeMap<String, IndexEntry>,
    pub(super) dirty: bool,
}

impl Index {
    pub fn file_path(metadata_root: &Path, status: Status) -> PathBuf {
        metadata_root
            .join(INDEX_DIR)
            .join(format!("{status}_index.json"))
    }

    /// Load both index files. The flag is true when either file was missing or
    /// undecodable and the caller should rebuild from shards.
    pub fn load(metadata_root: &Path) -> (Self, bool) {
        let mut index = Self::default();
        let mut stale = false;
        for status in Status::ALL {
            let path = Self::file_path(metadata_root, status);
            if !path.exists() {
                stale = true;
                continue;
            }
            match read_json_map::<IndexEntry>(&path) {
                Ok(map) => *index.map_mut(status) = map,
                Err(e) => {
                    warn!(code = e.code(), error = %e, "index will be rebuilt");
                    stale = true;
                }
            }
        }
        (index, stale)
    }

    pub fn save(&mut self, metadata_root: &Path) -> Result<()> {
        for status in Status::ALL {
            write_json_map(&Self::file_path(metadata_root, status), self.map(status))?;
        }
        self.dirty = false;
        debug!(
            public = self.public.len(),
            private = self.private.len(),
            "index saved"
        );
        Ok(())
    }

    fn map(&self, status: Status) -> &BTreeMap<String, IndexEntry> {
        match status {
            Status::Public => &self.public,
            Status::Private => &self.private,
        }
    }

    fn map_mut(&mut self, status: Status) -> &mut BTreeMap<String, IndexEntry> {
        match status {
            Status::Public => &mut self.public,
            Status::Private => &mut self.private,
        }
    }

    pub fn get(&self, status: Status, key: &str) -> Option<&IndexEntry> {
        self.map(status).get(key)
    }

    pub fn upsert(&mut self, shard_status: Status, key: &str, year: &str, entry: &ReviewEntry) {
        self.map_mut(shard_status)
            .insert(key.to_string(), IndexEntry::from_review(year, entry));
        self.dirty = true;
    }

    pub fn remove(&mut self, shard_status: Status, key: &str) {
        if self.map_mut(shard_status).remove(key).is_some() {
            self.dirty = true;
        }
    }

    pub fn clear(&mut self) {
        self.public.clear();
        self.private.clear();
        self.dirty = true;
    }

    pub fn len(&self) -> usize {
        self.public.len() + self.private.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All entries, public first, each in key order.
    pub fn iter(&self) -> impl Iterator<Item = (Status, &str, &IndexEntry)> {
        Status::ALL.into_iter().flat_map(move |s| {
            self.map(s)
                .iter()
                .map(move |(k, v)| (s, k.as_str(), v))
        })
    }

    pub fn statistics(&self) -> SortingStatistics {
        let mut stats = SortingStatistics::default();
        for (_, _, e) in self.iter() {
            stats.total += 1;
            let year = stats.by_year.entry(e.year.clone()).or_default();
            match e.status {
                Status::Public => {
                    stats.public += 1;
                    year.0 += 1;
                }
                Status::Private => {
                    stats.private += 1;
                    year.1 += 1;
                }
            }
            if e.reviewed {
                stats.reviewed += 1;
            } else {
                stats.unreviewed += 1;
            }
        }
        stats
    }

    /// Entries reviewed within the last `days` days, newest first.
    pub fn recent(&self, days: u64) -> Vec<RecentChange> {
        let cutoff = Local::now() - Duration::days(days.min(365_000) as i64);
        let mut out: Vec<RecentChange> = self
            .iter()
            .filter_map(|(_, key, e)| {
                let at = e.last_reviewed?;
                (at >= cutoff).then(|| RecentChange {
                    key: key.to_string(),
                    status: e.status,
                    last_reviewed: at,
                })
            })
            .collect();
        out.sort_by(|a, b| b.last_reviewed.cmp(&a.last_reviewed).then(a.key.cmp(&b.key)));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn entry(status: Status, reviewed: bool, age_days: i64) -> ReviewEntry {
        ReviewEntry {
            status,
            reviewed,
            last_reviewed: reviewed.then(|| Local::now() - Duration::days(age_days)),
        }
    }

    #[test]
    fn missing_files_request_rebuild() {
        let td = tempdir().unwrap();
        let (index, stale) = Index::load(td.path());
        assert!(stale);
        assert!(index.is_empty());
    }

    #[test]
    fn save_then_load_is_not_stale() {
        let td = tempdir().unwrap();
        let mut index = Index::default();
        index.upsert(Status::Private, "1975/a.jpg", "1975", &entry(Status::Private, true, 0));
        index.save(td.path()).unwrap();
        assert!(td.path().join("index/public_index.json").is_file());

        let (loaded, stale) = Index::load(td.path());
        assert!(!stale);
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.get(Status::Private, "1975/a.jpg").unwrap().year, "1975");
    }

    #[test]
    fn statistics_count_status_review_and_year() {
        let mut index = Index::default();
        index.upsert(Status::Public, "1975/a.jpg", "1975", &entry(Status::Public, true, 0));
        index.upsert(Status::Public, "1980/b.jpg", "1980", &entry(Status::Public, false, 0));
        index.upsert(Status::Private, "1975/c.jpg", "1975", &entry(Status::Private, true, 0));
        let s = index.statistics();
        assert_eq!((s.public, s.private, s.total), (2, 1, 3));
        assert_eq!((s.reviewed, s.unreviewed), (2, 1));
        assert_eq!(s.by_year["1975"], (1, 1));
        assert_eq!(s.by_year["1980"], (1, 0));
    }

    #[test]
    fn recent_filters_by_age_newest_first() {
        let mut index = Index::default();
        index.upsert(Status::Public, "2001/old.jpg", "2001", &entry(Status::Public, true, 40));
        index.upsert(Status::Public, "2001/mid.jpg", "2001", &entry(Status::Public, true, 3));
        index.upsert(Status::Private, "2001/new.jpg", "2001", &entry(Status::Private, true, 1));
        index.upsert(Status::Public, "2001/never.jpg", "2001", &entry(Status::Public, false, 0));
        let recent = index.recent(7);
        let keys: Vec<_> = recent.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, ["2001/new.jpg", "2001/mid.jpg"]);
    }
}
