//! Year shards.
//!
//! One JSON object per `(status, year)` at `<metadata_root>/<status>/<status>_<YYYY>.json`,
//! mapping relative path -> review entry. Writes go through `platform::atomic_write`
//! (temp sibling + rename) so readers never observe a half-written shard.
//!
//! A file that cannot be decoded is copied aside (`<name>.corrupt-<timestamp>`) and
//! treated as empty; the next flush then starts from a clean object without
//! destroying the only copy of whatever was there.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::errors::SiftError;
use crate::platform::atomic_write;
use crate::status::Status;

/// Review metadata stored for one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewEntry {
    pub status: Status,
    #[serde(default, with = "timestamp")]
    pub last_reviewed: Option<DateTime<Local>>,
    #[serde(default)]
    pub reviewed: bool,
}

impl ReviewEntry {
    /// Entry for a file that has been explicitly classified just now.
    pub fn reviewed_now(status: Status) -> Self {
        Self {
            status,
            last_reviewed: Some(Local::now()),
            reviewed: true,
        }
    }

    /// Placeholder for a file the store had no record of.
    pub fn unreviewed(status: Status) -> Self {
        Self {
            status,
            last_reviewed: None,
            reviewed: false,
        }
    }
}

/// Identity of a shard file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShardKey {
    pub status: Status,
    pub year: String,
}

impl ShardKey {
    pub fn new(status: Status, year: impl Into<String>) -> Self {
        Self {
            status,
            year: year.into(),
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}_{}.json", self.status, self.year)
    }

    pub fn path(&self, metadata_root: &Path) -> PathBuf {
        metadata_root
            .join(self.status.as_str())
            .join(self.file_name())
    }

    /// Parse `<status>_<YYYY>.json` back into a key.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let stem = name.strip_suffix(".json")?;
        let (status, year) = stem.split_once('_')?;
        let status: Status = status.parse().ok()?;
        if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some(Self::new(status, year))
    }
}

/// Cached contents of one shard file.
#[derive(Debug, Default)]
pub struct Shard {
    pub entries: BTreeMap<String, ReviewEntry>,
    pub dirty: bool,
}

impl Shard {
    /// Load a shard; a missing file is empty, an undecodable one is quarantined and empty.
    pub fn load(path: &Path) -> Self {
        match read_json_map(path) {
            Ok(entries) => Self {
                entries,
                dirty: false,
            },
            Err(e) => {
                warn!(code = e.code(), error = %e, "treating metadata file as empty");
                Self::default()
            }
        }
    }

    pub fn save(&mut self, path: &Path) -> Result<()> {
        write_json_map(path, &self.entries)?;
        self.dirty = false;
        debug!(path = %path.display(), entries = self.entries.len(), "shard saved");
        Ok(())
    }
}

/// Read a JSON object file into a map. Missing file -> empty map.
pub(super) fn read_json_map<V>(path: &Path) -> Result<BTreeMap<String, V>, SiftError>
where
    V: for<'de> Deserialize<'de>,
{
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(e) => return Err(SiftError::from_io("read metadata", path, e)),
    };
    serde_json::from_slice(&bytes).map_err(|e| {
        let quarantined = quarantine(path);
        SiftError::MetadataDecode {
            path: path.to_path_buf(),
            reason: match quarantined {
                Some(copy) => format!("{e}; original kept at {}", copy.display()),
                None => e.to_string(),
            },
        }
    })
}

/// Serialize a map as pretty JSON and replace `path` atomically.
pub(super) fn write_json_map<V: Serialize>(path: &Path, map: &BTreeMap<String, V>) -> Result<()> {
    let body = serde_json::to_vec_pretty(map)
        .with_context(|| format!("serialize metadata for {}", path.display()))?;
    atomic_write(path, &body)
}

/// Copy an undecodable file aside so a later flush cannot silently destroy it.
fn quarantine(path: &Path) -> Option<PathBuf> {
    let name = path.file_name()?.to_string_lossy().into_owned();
    let stamp = Local::now().format("%Y%m%d%H%M%S");
    let copy = path.with_file_name(format!("{name}.corrupt-{stamp}"));
    match fs::copy(path, &copy) {
        Ok(_) => Some(copy),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not preserve corrupt metadata file");
            None
        }
    }
}

/// Timestamps are written as RFC 3339; naive ISO-8601 (no offset) is accepted on read
/// and interpreted in local time.
mod timestamp {
    use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Local>>, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(t) => s.serialize_str(&t.to_rfc3339()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(d: D) -> Result<Option<DateTime<Local>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(d)?;
        let Some(raw) = raw else {
            return Ok(None);
        };
        if let Ok(t) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(Some(t.with_timezone(&Local)));
        }
        let naive = NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map_err(serde::de::Error::custom)?;
        Ok(Local.from_local_datetime(&naive).earliest())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn key_file_name_round_trips() {
        let key = ShardKey::new(Status::Private, "1975");
        assert_eq!(key.file_name(), "private_1975.json");
        assert_eq!(ShardKey::from_file_name("private_1975.json"), Some(key));
        assert_eq!(ShardKey::from_file_name("private_75.json"), None);
        assert_eq!(ShardKey::from_file_name("public_index.json"), None);
        assert_eq!(ShardKey::from_file_name("shared_1975.json"), None);
    }

    #[test]
    fn missing_file_loads_empty() {
        let td = tempdir().unwrap();
        let shard = Shard::load(&td.path().join("public_2000.json"));
        assert!(shard.entries.is_empty());
        assert!(!shard.dirty);
    }

    #[test]
    fn corrupt_file_is_quarantined_and_empty() {
        let td = tempdir().unwrap();
        let path = td.path().join("public_2000.json");
        fs::write(&path, b"{ not json").unwrap();
        let shard = Shard::load(&path);
        assert!(shard.entries.is_empty());
        let kept: Vec<_> = fs::read_dir(td.path())
            .unwrap()
            .flatten()
            .filter(|e| e.file_name().to_string_lossy().contains(".corrupt-"))
            .collect();
        assert_eq!(kept.len(), 1);
        assert_eq!(fs::read(kept[0].path()).unwrap(), b"{ not json");
    }

    #[test]
    fn accepts_naive_and_null_timestamps() {
        let td = tempdir().unwrap();
        let path = td.path().join("public_1999.json");
        fs::write(
            &path,
            r#"{
  "1999/a.jpg": {"status": "public", "last_reviewed": "2024-05-01T10:20:30.123456", "reviewed": true},
  "1999/b.jpg": {"status": "public", "last_reviewed": null, "reviewed": false}
}"#,
        )
        .unwrap();
        let shard = Shard::load(&path);
        assert_eq!(shard.entries.len(), 2);
        assert!(shard.entries["1999/a.jpg"].last_reviewed.is_some());
        assert!(shard.entries["1999/b.jpg"].last_reviewed.is_none());
    }

    #[test]
    fn save_writes_status_reviewed_and_timestamp() {
        let td = tempdir().unwrap();
        let path = ShardKey::new(Status::Private, "1975").path(td.path());
        let mut shard = Shard::default();
        shard
            .entries
            .insert("1975/foo/a.jpg".into(), ReviewEntry::reviewed_now(Status::Private));
        shard.dirty = true;
        shard.save(&path).unwrap();
        assert!(!shard.dirty);

        let v: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        let e = &v["1975/foo/a.jpg"];
        assert_eq!(e["status"], "private");
        assert_eq!(e["reviewed"], true);
        assert!(e["last_reviewed"].is_string());
    }
}
