//! Streaming copy that hashes the source as it goes.
//!
//! - The destination is first written to a temp sibling created with `create_new`
//!   (never clobbers), fsynced, then renamed into place.
//! - The returned hash covers exactly the bytes read from the source, so callers can
//!   compare it with a fresh hash of the destination.
//!
//! Snapshot semantics: the source is read once from start to EOF; bytes appended
//! concurrently are not included and will surface as a checksum mismatch.

use anyhow::{Context, Result, anyhow, bail};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

use super::checksum::BUF_SIZE;
use super::helpers::{io_error_with_help, io_error_with_help_io};
use crate::errors::SiftError;
use crate::platform::{fsync_dir, tmp_sibling_name};

#[derive(Debug, Clone, Copy)]
pub struct CopyResult {
    /// Bytes copied from source to destination.
    pub bytes: u64,
    /// BLAKE3 hash of the bytes read from the source.
    pub hash: blake3::Hash,
}

/// Copy an open source into new file `dst`, hashing while streaming, then fsync `dst`.
fn copy_stream(mut src_f: File, dst: &Path) -> io::Result<CopyResult> {
    let dst_f = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(dst)
        .map_err(io_error_with_help_io("create destination", dst))?;

    let mut writer = BufWriter::with_capacity(BUF_SIZE, dst_f);
    let mut hasher = blake3::Hasher::new();
    let mut buf = vec![0u8; BUF_SIZE];
    let mut bytes = 0u64;
    loop {
        let n = src_f.read(&mut buf)?;
        if n == 0 {
            break;
        }
        let chunk = &buf[..n];
        writer.write_all(chunk)?;
        hasher.update(chunk);
        bytes += n as u64;
    }
    writer.flush()?;
    writer.get_ref().sync_all()?;

    Ok(CopyResult {
        bytes,
        hash: hasher.finalize(),
    })
}

/// Copy `src` into a temp file beside `dest`, then rename it to `dest`.
///
/// `replace` controls whether an existing `dest` may be replaced; when false the
/// call fails instead of overwriting. The temp file is removed on any failure.
pub(super) fn copy_via_temp(src: &Path, dest: &Path, replace: bool) -> Result<CopyResult> {
    let dest_dir = dest
        .parent()
        .ok_or_else(|| anyhow!("destination has no parent: {}", dest.display()))?;
    fs::create_dir_all(dest_dir)
        .map_err(io_error_with_help("create destination directory", dest_dir))?;

    // A source that vanished surfaces as NotFound so batches can skip it.
    let src_f = File::open(src).map_err(|e| SiftError::from_io("open source", src, e))?;
    let tmp = tmp_sibling_name(dest);
    let copied = match copy_stream(src_f, &tmp) {
        Ok(c) => c,
        Err(e) => {
            let _ = fs::remove_file(&tmp);
            return Err(e).with_context(|| format!("copy '{}' -> '{}'", src.display(), tmp.display()));
        }
    };

    if !replace && dest.exists() {
        let _ = fs::remove_file(&tmp);
        bail!("destination appeared during copy: {}", dest.display());
    }
    if let Err(e) = fs::rename(&tmp, dest) {
        let _ = fs::remove_file(&tmp);
        return Err(io_error_with_help("rename temporary file into place", dest)(e));
    }
    let _ = fsync_dir(dest_dir);
    Ok(copied)
}
