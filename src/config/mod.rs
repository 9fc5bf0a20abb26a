//! Config module.
//! Provides configuration types, default paths, XML loading, and validation.

pub mod paths;
pub mod types;
mod validate;
pub mod xml;

pub use paths::{default_config_path, default_data_dir, default_log_path, path_has_symlink_ancestor};
pub use types::{Config, LogLevel};
pub use validate::validate_and_normalize;
pub use xml::{
    create_template_config, ensure_default_config_exists, load_config_from_default_xml,
    load_config_from_xml_env, load_config_from_xml_path,
};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "SIFT_CONFIG";
/// Days a pre-move backup is kept before `cleanup_backups` purges it.
pub const BACKUP_RETENTION_DAYS_DEFAULT: u64 = 30;
