//! Integrity-checked move of one file between the two roots.
//!
//! Order of operations:
//! 1. remap the relative path onto the target root, creating missing directories;
//! 2. pick a free name (`_n` suffix) so nothing is overwritten;
//! 3. back the source up into the safe-delete area;
//! 4. copy via a temp file while hashing the source, then hash the destination;
//! 5. on a match delete the source, otherwise delete the copy and fail;
//! 6. migrate the metadata entry and, unless deferred, prune emptied directories.
//!
//! At every failure point exactly one live copy remains, in the source root.

use anyhow::{Result, anyhow};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use super::backup::create_backup;
use super::checksum::hash_file;
use super::copy::copy_via_temp;
use super::duplicate::unique_path;
use super::helpers::io_error_with_help;
use super::meta::preserve_from;
use super::sanitize::prune_upwards;
use crate::errors::SiftError;
use crate::metadata::MetadataStore;
use crate::status::Status;

/// When vacated source directories are cleaned up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cleanup {
    /// Prune the source directory and its empty ancestors right away.
    Immediate,
    /// Leave it to the caller (batch operations sweep once at the end).
    Deferred,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOutcome {
    /// Final destination; differs from the naive target after a collision rename.
    pub dest: PathBuf,
    /// Topmost directory that had to be created for the destination, if any.
    pub created_dir: Option<PathBuf>,
    pub backup: PathBuf,
    /// Source-side directories removed because the move left them empty.
    pub removed_dirs: Vec<PathBuf>,
}

/// Moves files between the roots of one metadata store.
#[derive(Debug, Clone)]
pub struct Mover {
    safe_delete_root: PathBuf,
    preserve_metadata: bool,
    /// Damage each destination copy before it is verified.
    #[cfg(test)]
    pub(crate) corrupt_copies: bool,
}

impl Mover {
    pub fn new(safe_delete_root: impl Into<PathBuf>, preserve_metadata: bool) -> Self {
        Self {
            safe_delete_root: safe_delete_root.into(),
            preserve_metadata,
            #[cfg(test)]
            corrupt_copies: false,
        }
    }

    pub fn safe_delete_root(&self) -> &Path {
        &self.safe_delete_root
    }

    /// Move `src` into the root for `target`. A file already under that root is
    /// returned unchanged.
    pub fn move_file(
        &self,
        store: &mut MetadataStore,
        src: &Path,
        target: Status,
        cleanup: Cleanup,
    ) -> Result<MoveOutcome> {
        let meta = fs::symlink_metadata(src).map_err(|e| SiftError::from_io("stat source", src, e))?;
        if meta.is_dir() {
            return Err(SiftError::IsDirectory(src.to_path_buf()).into());
        }
        let located = store
            .roots()
            .locate(src)
            .ok_or_else(|| SiftError::NotUnderRoot(src.to_path_buf()))?;

        if located.root == target {
            debug!(path = %src.display(), "already under target root");
            return Ok(MoveOutcome {
                dest: src.to_path_buf(),
                created_dir: None,
                backup: PathBuf::new(),
                removed_dirs: Vec::new(),
            });
        }

        let naive = store.roots().path_for(target, &located.relative);
        let dest_dir = naive
            .parent()
            .ok_or_else(|| anyhow!("destination has no parent: {}", naive.display()))?;
        let created_dir = topmost_missing(dest_dir);
        fs::create_dir_all(dest_dir)
            .map_err(io_error_with_help("create destination directory", dest_dir))?;
        if let Some(dir) = &created_dir {
            debug!(path = %dir.display(), "new directory created");
        }

        let dest = unique_path(&naive).map_err(io_error_with_help("choose destination name", &naive))?;
        if dest != naive {
            info!(wanted = %naive.display(), dest = %dest.display(), "destination exists; renamed");
        }

        let backup = create_backup(&self.safe_delete_root, located.root, &located.relative, src)?;

        let copied = copy_via_temp(src, &dest, false)?;
        #[cfg(test)]
        if self.corrupt_copies {
            use std::io::Write;
            fs::OpenOptions::new()
                .append(true)
                .open(&dest)
                .and_then(|mut f| f.write_all(b"!"))
                .map_err(|e| SiftError::from_io("corrupt copy", &dest, e))?;
        }
        let dest_hash = match hash_file(&dest) {
            Ok(h) => h,
            Err(e) => {
                discard_copy(&dest);
                return Err(SiftError::from_io("hash destination", &dest, e).into());
            }
        };
        if copied.hash != dest_hash {
            error!(
                src = %src.display(),
                dest = %dest.display(),
                "integrity check failed; source kept"
            );
            discard_copy(&dest);
            return Err(SiftError::Integrity {
                src: src.to_path_buf(),
                dest,
                src_hash: copied.hash.to_hex().to_string(),
                dest_hash: dest_hash.to_hex().to_string(),
            }
            .into());
        }

        if self.preserve_metadata
            && let Err(e) = preserve_from(src, &dest)
        {
            discard_copy(&dest);
            return Err(e);
        }

        if let Err(e) = fs::remove_file(src) {
            discard_copy(&dest);
            return Err(SiftError::from_io("remove source after copy", src, e).into());
        }
        info!(src = %src.display(), dest = %dest.display(), bytes = copied.bytes, "file moved");

        store.rename_entry(src, &dest)?;

        let removed_dirs = match (cleanup, src.parent()) {
            (Cleanup::Immediate, Some(parent)) => prune_upwards(store.roots(), parent),
            _ => Vec::new(),
        };

        Ok(MoveOutcome {
            dest,
            created_dir,
            backup,
            removed_dirs,
        })
    }
}

/// Remove a destination copy that must not survive a failed move.
fn discard_copy(dest: &Path) {
    if let Err(e) = fs::remove_file(dest) {
        warn!(path = %dest.display(), error = %e, "could not remove rejected copy");
    }
}

fn topmost_missing(dir: &Path) -> Option<PathBuf> {
    let mut missing = None;
    let mut cur = Some(dir);
    while let Some(d) = cur {
        if d.exists() {
            break;
        }
        missing = Some(d.to_path_buf());
        cur = d.parent();
    }
    missing
}
