//! Review status and root resolution.
//!
//! `Status` is the two-variant classification; `Roots` carries the two configured
//! content roots and answers "which root holds this path, and under what relative
//! path". Year inference lives in `year_of` so the directory naming convention
//! (`<root>/<YYYY>/...`) is decided in exactly one place.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

/// Classification of a file: which root it belongs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Public,
    Private,
}

impl Status {
    pub const ALL: [Status; 2] = [Status::Public, Status::Private];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Public => "public",
            Status::Private => "private",
        }
    }

    pub fn from_is_public(is_public: bool) -> Self {
        if is_public {
            Status::Public
        } else {
            Status::Private
        }
    }

    pub fn is_public(self) -> bool {
        matches!(self, Status::Public)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "public" | "pub" => Ok(Status::Public),
            "private" | "priv" => Ok(Status::Private),
            _ => Err(format!("invalid status: '{s}' (expected public or private)")),
        }
    }
}

/// What the store knows about one file. `status == None` means no metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FileState {
    pub status: Option<Status>,
    pub reviewed: bool,
}

/// A path resolved against one of the two roots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located {
    /// Root the path currently lives under.
    pub root: Status,
    /// Path below that root.
    pub relative: PathBuf,
}

impl Located {
    /// Key used in shard and index files: relative path with `/` separators.
    pub fn key(&self) -> String {
        relative_key(&self.relative)
    }

    pub fn year(&self) -> Option<String> {
        year_of(&self.relative)
    }
}

/// The two content roots.
#[derive(Debug, Clone)]
pub struct Roots {
    public: PathBuf,
    private: PathBuf,
    canon_public: PathBuf,
    canon_private: PathBuf,
}

impl Roots {
    pub fn new(public: impl Into<PathBuf>, private: impl Into<PathBuf>) -> Self {
        let public = public.into();
        let private = private.into();
        let canon_public = dunce::canonicalize(&public).unwrap_or_else(|_| public.clone());
        let canon_private = dunce::canonicalize(&private).unwrap_or_else(|_| private.clone());
        Self {
            public,
            private,
            canon_public,
            canon_private,
        }
    }

    pub fn root(&self, status: Status) -> &Path {
        match status {
            Status::Public => &self.public,
            Status::Private => &self.private,
        }
    }

    /// Absolute path of `relative` under the root for `status`.
    pub fn path_for(&self, status: Status, relative: &Path) -> PathBuf {
        self.root(status).join(relative)
    }

    /// True if `path` names one of the two roots (raw or canonical form).
    pub fn is_root(&self, path: &Path) -> bool {
        if path == self.public || path == self.private {
            return true;
        }
        match dunce::canonicalize(path) {
            Ok(real) => real == self.canon_public || real == self.canon_private,
            Err(_) => false,
        }
    }

    /// Resolve `path` to its root and relative remainder.
    ///
    /// Matching is component-wise (`Path::starts_with`), never a string prefix, so
    /// `/data/public2/x` is not mistaken for a child of `/data/public`.
    pub fn locate(&self, path: &Path) -> Option<Located> {
        if let Some(found) = Self::match_roots(path, &self.public, &self.private) {
            return Some(found);
        }
        let real = canonicalize_lenient(path)?;
        Self::match_roots(&real, &self.canon_public, &self.canon_private)
    }

    fn match_roots(path: &Path, public: &Path, private: &Path) -> Option<Located> {
        for (status, root) in [(Status::Public, public), (Status::Private, private)] {
            if let Ok(rel) = path.strip_prefix(root) {
                return Some(Located {
                    root: status,
                    relative: rel.to_path_buf(),
                });
            }
        }
        None
    }
}

/// Canonicalize `path`, or its parent when the path itself no longer exists.
fn canonicalize_lenient(path: &Path) -> Option<PathBuf> {
    if let Ok(p) = dunce::canonicalize(path) {
        return Some(p);
    }
    let parent = path.parent()?;
    let name = path.file_name()?;
    canonicalize_lenient(parent).map(|p| p.join(name))
}

/// Year partition for a relative path: the first component made of exactly four
/// ASCII digits. Any such component qualifies, wherever it sits.
pub fn year_of(relative: &Path) -> Option<String> {
    relative.components().find_map(|c| match c {
        Component::Normal(s) => {
            let s = s.to_str()?;
            (s.len() == 4 && s.bytes().all(|b| b.is_ascii_digit())).then(|| s.to_string())
        }
        _ => None,
    })
}

/// Render a relative path as a `/`-separated key.
pub fn relative_key(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Inverse of `relative_key`.
pub fn key_to_relative(key: &str) -> PathBuf {
    key.split('/').filter(|s| !s.is_empty()).collect()
}
