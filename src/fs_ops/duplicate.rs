//! Collision-free destination names.
//!
//! An occupied destination `dir/stem.ext` becomes `dir/stem_1.ext`, `dir/stem_2.ext`,
//! ... until a free name is found. Only the last extension counts:
//! "archive.tar.gz" -> "archive.tar_1.gz"; ".env" -> ".env_1".
//!
//! This only inspects current filesystem state; the copy step still refuses to
//! overwrite if a name is taken in between.

use std::ffi::{OsStr, OsString};
use std::io;
use std::path::{Path, PathBuf};
use tracing::trace;

const MAX_TRIES: u64 = 100_000;

#[cfg(windows)]
const MAX_FILENAME_LEN: usize = 240;
#[cfg(not(windows))]
const MAX_FILENAME_LEN: usize = 255;

/// Return `candidate` if free, else the first free `_n` variant.
pub fn unique_path(candidate: &Path) -> io::Result<PathBuf> {
    if !exists_no_follow(candidate) {
        return Ok(candidate.to_path_buf());
    }
    let dir = candidate.parent().unwrap_or_else(|| Path::new(""));
    let name = candidate
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    let base = Path::new(name);
    let stem = base
        .file_stem()
        .map(OsStr::to_os_string)
        .unwrap_or_else(|| name.to_os_string());
    let ext = base.extension();

    for n in 1..=MAX_TRIES {
        let next = dir.join(name_with_suffix(&stem, ext, &format!("_{n}")));
        if !exists_no_follow(&next) {
            if n > 1 {
                trace!(name = ?name, dir = %dir.display(), tries = n, "duplicate name resolved");
            }
            return Ok(next);
        }
    }
    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free name for {} after {MAX_TRIES} tries", candidate.display()),
    ))
}

/// A dangling symlink still occupies the name.
fn exists_no_follow(p: &Path) -> bool {
    p.symlink_metadata().is_ok()
}

#[cfg(unix)]
fn name_len_units(s: &OsStr) -> usize {
    use std::os::unix::ffi::OsStrExt;
    s.as_bytes().len()
}

#[cfg(not(unix))]
fn name_len_units(s: &OsStr) -> usize {
    s.to_string_lossy().len()
}

/// `stem + suffix + ["." + ext]`, shortening the stem if the result would exceed
/// the filename limit.
fn name_with_suffix(stem: &OsStr, ext: Option<&OsStr>, suffix: &str) -> OsString {
    let mut overhead = suffix.len();
    if let Some(e) = ext {
        overhead += 1 + name_len_units(e);
    }

    let mut stem_os = stem.to_os_string();
    if name_len_units(&stem_os) + overhead > MAX_FILENAME_LEN {
        let budget = MAX_FILENAME_LEN.saturating_sub(overhead).max(1);
        let lossy = stem.to_string_lossy();
        let mut acc = String::new();
        for ch in lossy.chars() {
            if acc.len() + ch.len_utf8() > budget {
                break;
            }
            acc.push(ch);
        }
        if acc.is_empty() {
            acc.push('f');
        }
        stem_os = OsString::from(acc);
    }

    let mut out = stem_os;
    out.push(suffix);
    if let Some(e) = ext {
        out.push(".");
        out.push(e);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn free_name_is_kept() {
        let td = tempdir().unwrap();
        let p = td.path().join("a.jpg");
        assert_eq!(unique_path(&p).unwrap(), p);
    }

    #[test]
    fn suffix_goes_before_extension_and_counts_up() {
        let td = tempdir().unwrap();
        fs::write(td.path().join("a.jpg"), b"").unwrap();
        assert_eq!(unique_path(&td.path().join("a.jpg")).unwrap(), td.path().join("a_1.jpg"));
        fs::write(td.path().join("a_1.jpg"), b"").unwrap();
        fs::write(td.path().join("a_2.jpg"), b"").unwrap();
        assert_eq!(unique_path(&td.path().join("a.jpg")).unwrap(), td.path().join("a_3.jpg"));
    }

    #[test]
    fn multi_dot_and_dotfile_names() {
        let td = tempdir().unwrap();
        fs::write(td.path().join("archive.tar.gz"), b"").unwrap();
        fs::write(td.path().join(".env"), b"").unwrap();
        fs::write(td.path().join("README"), b"").unwrap();
        assert_eq!(
            unique_path(&td.path().join("archive.tar.gz")).unwrap(),
            td.path().join("archive.tar_1.gz")
        );
        assert_eq!(unique_path(&td.path().join(".env")).unwrap(), td.path().join(".env_1"));
        assert_eq!(unique_path(&td.path().join("README")).unwrap(), td.path().join("README_1"));
    }

    #[test]
    fn long_stems_are_shortened_to_fit() {
        let stem = "x".repeat(300);
        let name = name_with_suffix(OsStr::new(&stem), Some(OsStr::new("jpg")), "_12");
        assert!(name_len_units(&name) <= MAX_FILENAME_LEN);
        assert!(name.to_string_lossy().ends_with("_12.jpg"));
    }
}
