//! Filesystem operations: verified moves, backups, directory cleanup and the
//! cross-process store lock.

mod backup;
mod checksum;
mod copy;
mod duplicate;
mod helpers;
mod lock;
mod meta;
mod mover;
mod sanitize;

pub use backup::{BackupCleanup, backup_path, cleanup_backups, create_backup};
pub use checksum::hash_file;
pub use copy::CopyResult;
pub use duplicate::unique_path;
pub use helpers::{io_error_with_help, io_error_with_help_io};
pub use lock::{LOCK_FILE_NAME, StoreLock, acquire_store_lock};
pub use mover::{Cleanup, MoveOutcome, Mover};
pub use sanitize::{
    INCIDENTAL_FILES, is_incidental, prune_upwards, remove_empty_tree, remove_if_empty,
};
