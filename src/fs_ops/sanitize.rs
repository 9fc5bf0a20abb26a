//! Directory Sanitizer.
//!
//! Removes directories left empty by moves. A directory counts as empty when it
//! holds nothing but incidental OS artifacts (`.DS_Store`, `Thumbs.db`, ...), which
//! are deleted along with it. Only directories strictly inside one of the two roots
//! are eligible; the roots themselves never are. Failures are logged and reported
//! as "not removed".

use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::status::Roots;

/// File names the OS or desktop shells drop into directories on their own.
pub const INCIDENTAL_FILES: &[&str] = &[".DS_Store", "Thumbs.db", "desktop.ini", ".localized"];

pub fn is_incidental(name: &OsStr) -> bool {
    name.to_str()
        .is_some_and(|n| INCIDENTAL_FILES.iter().any(|i| i.eq_ignore_ascii_case(n)))
}

/// True when `dir` lies strictly below a root (and is not itself a root).
fn eligible(roots: &Roots, dir: &Path) -> bool {
    if roots.is_root(dir) {
        return false;
    }
    roots
        .locate(dir)
        .is_some_and(|l| l.relative.components().next().is_some())
}

/// Remove `dir` if it is empty apart from incidental files. Never removes a root.
pub fn remove_if_empty(roots: &Roots, dir: &Path) -> bool {
    if !eligible(roots, dir) {
        debug!(path = %dir.display(), "not eligible for removal");
        return false;
    }
    match try_remove(dir) {
        Ok(removed) => removed,
        Err(e) => {
            warn!(path = %dir.display(), error = %e, "could not remove empty directory");
            false
        }
    }
}

fn try_remove(dir: &Path) -> io::Result<bool> {
    let meta = fs::symlink_metadata(dir)?;
    if !meta.is_dir() {
        return Ok(false);
    }
    let mut incidental = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        if is_incidental(&name) && entry.file_type()?.is_file() {
            incidental.push(entry.path());
        } else {
            return Ok(false);
        }
    }
    for f in &incidental {
        fs::remove_file(f)?;
    }
    fs::remove_dir(dir)?;
    debug!(path = %dir.display(), artifacts = incidental.len(), "removed empty directory");
    Ok(true)
}

/// Bottom-up pass over `dir` and every directory below it; children are evaluated
/// before their parent. Returns the directories removed, deepest first.
pub fn remove_empty_tree(roots: &Roots, dir: &Path) -> Vec<PathBuf> {
    let mut removed = Vec::new();
    for entry in WalkDir::new(dir)
        .follow_links(false)
        .contents_first(true)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry during cleanup");
                continue;
            }
        };
        if entry.file_type().is_dir() && remove_if_empty(roots, entry.path()) {
            removed.push(entry.into_path());
        }
    }
    removed
}

/// Remove `start` and then each parent while they are empty, stopping at the
/// first non-empty directory or at a root.
pub fn prune_upwards(roots: &Roots, start: &Path) -> Vec<PathBuf> {
    let mut removed = Vec::new();
    let mut current = Some(start);
    while let Some(dir) = current {
        if !remove_if_empty(roots, dir) {
            break;
        }
        removed.push(dir.to_path_buf());
        current = dir.parent();
    }
    removed
}
