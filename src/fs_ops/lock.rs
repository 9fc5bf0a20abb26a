//! Advisory store lock.
//!
//! One process at a time may mutate a metadata root. The guard holds an exclusive
//! `fs2` lock on `<metadata_root>/.sift.lock`; the lock is released when the guard
//! is dropped (or the process exits).

use anyhow::{Context, Result, bail};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::trace;

pub const LOCK_FILE_NAME: &str = ".sift.lock";

/// RAII guard for the metadata-root lock.
#[derive(Debug)]
pub struct StoreLock {
    file: File,
    path: PathBuf,
}

impl StoreLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

fn open_lock_file(path: &Path) -> io::Result<File> {
    let mut opts = OpenOptions::new();
    opts.read(true).write(true).create(true).truncate(false);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(0o600);
    }
    opts.open(path)
}

/// Try to take the lock without blocking; fails if another process holds it.
pub fn acquire_store_lock(metadata_root: &Path) -> Result<StoreLock> {
    std::fs::create_dir_all(metadata_root)
        .with_context(|| format!("create metadata root '{}'", metadata_root.display()))?;
    let path = metadata_root.join(LOCK_FILE_NAME);
    let file = open_lock_file(&path).with_context(|| format!("open lock '{}'", path.display()))?;
    match file.try_lock_exclusive() {
        Ok(()) => {
            trace!(path = %path.display(), "store lock acquired");
            Ok(StoreLock { file, path })
        }
        Err(e) if e.kind() == fs2::lock_contended_error().kind() => bail!(
            "metadata root '{}' is in use by another sift process",
            metadata_root.display()
        ),
        Err(e) => Err(e).with_context(|| format!("lock '{}'", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn second_lock_is_refused_until_first_drops() {
        let td = tempdir().unwrap();
        let first = acquire_store_lock(td.path()).unwrap();
        assert!(first.path().ends_with(LOCK_FILE_NAME));
        let err = acquire_store_lock(td.path()).unwrap_err();
        assert!(err.to_string().contains("in use"));
        drop(first);
        assert!(acquire_store_lock(td.path()).is_ok());
    }
}
