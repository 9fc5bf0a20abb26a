//! Default path helpers and symlink checks.
//! Determines OS-appropriate config/data/log paths and detects symlinked ancestors for safety.

use dirs::{config_dir, data_dir};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::CONFIG_ENV;

/// Config path: `$SIFT_CONFIG` if set, else the OS config dir.
/// A relative `$SIFT_CONFIG` is resolved against the current directory.
pub fn default_config_path() -> Option<PathBuf> {
    if let Some(p) = env::var_os(CONFIG_ENV) {
        let p = PathBuf::from(p);
        if p.is_absolute() {
            return Some(p);
        }
        return env::current_dir().ok().map(|cwd| cwd.join(p));
    }
    if let Some(mut base) = config_dir() {
        base.push("sift");
        base.push("config.xml");
        Some(base)
    } else {
        env::var("HOME").ok().map(|h| {
            PathBuf::from(h)
                .join(".config")
                .join("sift")
                .join("config.xml")
        })
    }
}

/// Base directory under which default roots live.
pub fn default_data_dir() -> PathBuf {
    if let Some(mut base) = data_dir() {
        base.push("sift");
        base
    } else {
        env::var("HOME")
            .map(|h| PathBuf::from(h).join(".local").join("share").join("sift"))
            .unwrap_or_else(|_| PathBuf::from("sift"))
    }
}

/// OS-appropriate default log file path (data dir).
pub fn default_log_path() -> Option<PathBuf> {
    let base = default_data_dir();
    // best-effort; logging setup reports failures itself
    let _ = fs::create_dir_all(&base);
    Some(base.join("sift.log"))
}

/// Return true if any existing ancestor of `path` is a symlink.
pub fn path_has_symlink_ancestor(path: &Path) -> io::Result<bool> {
    let mut p = path.parent();
    while let Some(anc) = p {
        if anc.exists() {
            let meta = fs::symlink_metadata(anc)?;
            if meta.file_type().is_symlink() {
                return Ok(true);
            }
        }
        p = anc.parent();
    }
    Ok(false)
}
