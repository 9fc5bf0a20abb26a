//! I/O error helpers.
//!
//! Enrich io::Error with the operation, the path and a platform-aware hint so a
//! failed move reads as something a user can act on.
//!
//! Usage:
//!   fs::create_dir_all(dir).map_err(io_error_with_help("create destination directory", dir))?;

use anyhow::anyhow;
use std::io;
use std::path::Path;

fn hint_for(e: &io::Error) -> Option<&'static str> {
    #[cfg(unix)]
    if let Some(code) = e.raw_os_error() {
        let hint = match code {
            libc::EACCES | libc::EPERM => Some("permission denied; check ownership of both roots"),
            libc::EXDEV => Some("cross-filesystem; rename is not possible here"),
            libc::EBUSY => Some("resource busy; another process may hold the file"),
            libc::ENOENT => Some("path not found; it may have been moved by another process"),
            libc::EEXIST => Some("already exists; refusing to overwrite"),
            libc::ENOSPC => Some("no space left on the destination device"),
            libc::EROFS => Some("read-only filesystem"),
            libc::ENAMETOOLONG => Some("file name or path too long"),
            libc::EMFILE | libc::ENFILE => Some("too many open files"),
            _ => None,
        };
        if hint.is_some() {
            return hint;
        }
    }
    #[cfg(windows)]
    if let Some(code) = e.raw_os_error() {
        let hint = match code {
            5 => Some("access denied; check permissions"),
            32 => Some("sharing violation; the file is in use"),
            2 | 3 => Some("path not found; it may have been moved by another process"),
            80 | 183 => Some("already exists; refusing to overwrite"),
            112 => Some("not enough space on the destination disk"),
            206 => Some("file name or path too long"),
            _ => None,
        };
        if hint.is_some() {
            return hint;
        }
    }
    match e.kind() {
        io::ErrorKind::PermissionDenied => Some("permission denied; check ownership of both roots"),
        io::ErrorKind::NotFound => Some("path not found; it may have been moved by another process"),
        io::ErrorKind::AlreadyExists => Some("already exists; refusing to overwrite"),
        _ => None,
    }
}

pub(crate) fn build_message(op: &str, path: &Path, e: &io::Error) -> String {
    let mut msg = format!("{op} '{}': {e}", path.display());
    if let Some(hint) = hint_for(e) {
        msg.push_str(" (");
        msg.push_str(hint);
        msg.push(')');
    }
    if let Some(code) = e.raw_os_error() {
        msg.push_str(&format!(" [os code: {code}]"));
    }
    msg
}

/// Adapter for anyhow::Result code paths: `.map_err(io_error_with_help(op, path))`.
pub fn io_error_with_help<'a>(
    op: &'a str,
    path: &'a Path,
) -> impl FnOnce(io::Error) -> anyhow::Error + 'a {
    move |e: io::Error| anyhow!(build_message(op, path, &e))
}

/// Adapter for io::Result code paths; keeps the original ErrorKind.
pub fn io_error_with_help_io<'a>(
    op: &'a str,
    path: &'a Path,
) -> impl FnOnce(io::Error) -> io::Error + 'a {
    move |e: io::Error| io::Error::new(e.kind(), build_message(op, path, &e))
}
