//! Core library for `sift`.
//!
//! Classifies files between a public and a private root. Moves are verified by
//! checksum and backed up before the source is removed; review metadata is kept in
//! per-(status, year) JSON shards with a rebuildable index.
//!
//! The entry point is [`Engine`]: open it over a validated [`Config`], then call
//! `classify`, `batch_classify`, `directory_status` and friends.

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod fs_ops;
pub mod metadata;
pub mod output;
pub mod platform;
pub mod shutdown;
pub mod status;

pub use config::types::{Config, LogLevel};
pub use config::{
    default_config_path, default_log_path, ensure_default_config_exists,
    load_config_from_default_xml, load_config_from_xml_env, load_config_from_xml_path,
    path_has_symlink_ancestor, validate_and_normalize,
};
pub use engine::{
    BatchFailure, BatchReport, ClassifyOutcome, DirectoryStatus, Engine, FileInfo, FileOutcome,
    NoopObserver, Observer,
};
pub use errors::SiftError;
pub use fs_ops::{BackupCleanup, remove_if_empty};
pub use metadata::{MetadataStore, RecentChange, SortingStatistics};
pub use shutdown::CancelToken;
pub use status::{FileState, Roots, Status, year_of};
