//! XML configuration support.
//! - Loads settings from config.xml (quick_xml).
//! - Creates a secure template if missing (unless SIFT_CONFIG is set).
//!
//! Notes:
//! - This module only reads/writes the config file; directory validation happens elsewhere.
//! - Unknown XML fields are rejected so misspelled settings surface early.

use anyhow::{Context, Result};
use quick_xml::de::from_str as from_xml_str;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::paths::{default_config_path, default_data_dir, path_has_symlink_ancestor};
use super::types::{Config, LogLevel};
use super::{BACKUP_RETENTION_DAYS_DEFAULT, CONFIG_ENV};

use crate::platform::{set_dir_mode_0700, set_file_mode_0600, write_config_secure_new_0600};

/// Struct mirroring the XML config for deserialization.
#[derive(Debug, Deserialize)]
#[serde(rename = "config")]
#[serde(deny_unknown_fields)]
struct XmlConfig {
    public_root: Option<String>,
    private_root: Option<String>,
    safe_delete_root: Option<String>,
    metadata_root: Option<String>,
    log_level: Option<String>,
    log_file: Option<String>,
    #[serde(default, deserialize_with = "de_u64_trimmed_opt")]
    backup_retention_days: Option<u64>,
    preserve_metadata: Option<bool>,
}

// Custom deserializer that trims surrounding whitespace for optional u64
fn de_u64_trimmed_opt<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.and_then(|s| s.trim().parse::<u64>().ok()))
}

fn trimmed_path(s: Option<&str>) -> Option<PathBuf> {
    s.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(PathBuf::from)
}

// Map XmlConfig -> Config; absent fields keep their defaults.
fn xml_to_config(parsed: XmlConfig) -> Config {
    let mut cfg = Config::default();

    if let Some(p) = trimmed_path(parsed.public_root.as_deref()) {
        cfg.public_root = p;
    }
    if let Some(p) = trimmed_path(parsed.private_root.as_deref()) {
        cfg.private_root = p;
    }
    if let Some(p) = trimmed_path(parsed.safe_delete_root.as_deref()) {
        cfg.safe_delete_root = p;
    }
    if let Some(p) = trimmed_path(parsed.metadata_root.as_deref()) {
        cfg.metadata_root = p;
    }
    if let Some(p) = trimmed_path(parsed.log_file.as_deref()) {
        cfg.log_file = Some(p);
    }
    if let Some(level) = parsed
        .log_level
        .as_deref()
        .and_then(|s| s.trim().parse::<LogLevel>().ok())
    {
        cfg.log_level = level;
    }
    cfg.backup_retention_days = parsed
        .backup_retention_days
        .unwrap_or(BACKUP_RETENTION_DAYS_DEFAULT);
    if let Some(preserve) = parsed.preserve_metadata {
        cfg.preserve_metadata = preserve;
    }
    cfg
}

/// Load a Config from a specific XML file path.
pub fn load_config_from_xml_path(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("read config xml '{}'", path.display()))?;
    let parsed: XmlConfig = from_xml_str(&contents)
        .with_context(|| format!("parse config xml '{}'", path.display()))?;
    debug!(path = %path.display(), "loaded config xml");
    Ok(xml_to_config(parsed))
}

/// If SIFT_CONFIG is set, load and return that Config; otherwise Ok(None).
pub fn load_config_from_xml_env() -> Result<Option<Config>> {
    match env::var_os(CONFIG_ENV) {
        Some(p) => load_config_from_xml_path(Path::new(&p)).map(Some),
        None => Ok(None),
    }
}

/// Try loading Config from the platform default config.xml path.
/// Returns Ok(Some(cfg)) if the file exists and parses; Ok(None) if missing.
pub fn load_config_from_default_xml() -> Result<Option<Config>> {
    let Some(path) = default_config_path() else {
        return Ok(None);
    };
    if !path.exists() {
        return Ok(None);
    }
    load_config_from_xml_path(&path).map(Some)
}

/// Create default template config file and parent directory (best-effort permissions).
pub fn create_template_config(path: &Path) -> Result<()> {
    if path_has_symlink_ancestor(path)? {
        anyhow::bail!(
            "Refusing to create config: ancestor of {} is a symlink",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
        let _ = set_dir_mode_0700(parent);
    }

    let base = default_data_dir();
    let content = format!(
        "<!--\n  sift configuration (XML)\n\n    public_root            -> directory holding files classified public\n    private_root           -> directory holding files classified private\n    safe_delete_root       -> pre-move backups (purged after backup_retention_days)\n    metadata_root          -> review metadata shards and index\n    log_level              -> quiet | normal | info | debug\n    log_file               -> path to log file (optional)\n    backup_retention_days  -> age at which backups are purged\n    preserve_metadata      -> keep timestamps and permissions on moved files\n\n  CLI flags override XML values.\n-->\n<config>\n  <public_root>{}</public_root>\n  <private_root>{}</private_root>\n  <safe_delete_root>{}</safe_delete_root>\n  <metadata_root>{}</metadata_root>\n  <log_level>normal</log_level>\n  <log_file>{}</log_file>\n  <backup_retention_days>{}</backup_retention_days>\n  <preserve_metadata>true</preserve_metadata>\n</config>\n",
        base.join("public").display(),
        base.join("private").display(),
        base.join("safe_delete").display(),
        base.join("metadata").display(),
        base.join("sift.log").display(),
        BACKUP_RETENTION_DAYS_DEFAULT,
    );

    write_config_secure_new_0600(path, content.as_bytes())?;
    let _ = set_file_mode_0600(path);

    info!("Created template config at {}", path.display());
    Ok(())
}

/// Create default config if SIFT_CONFIG is not set; return created path so the CLI can inform the user.
pub fn ensure_default_config_exists() -> Option<PathBuf> {
    if env::var_os(CONFIG_ENV).is_some() {
        return None;
    }
    let cfg_path = default_config_path()?;
    if cfg_path.exists() {
        return None;
    }
    match create_template_config(&cfg_path) {
        Ok(()) => Some(cfg_path),
        Err(e) => {
            debug!(path = %cfg_path.display(), error = %e, "template config not created");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn reads_all_fields() {
        let td = tempdir().unwrap();
        let path = td.path().join("config.xml");
        fs::write(
            &path,
            r#"<config>
  <public_root> /data/public </public_root>
  <private_root>/data/private</private_root>
  <safe_delete_root>/data/safe</safe_delete_root>
  <metadata_root>/data/meta</metadata_root>
  <log_level>debug</log_level>
  <backup_retention_days> 7 </backup_retention_days>
  <preserve_metadata>false</preserve_metadata>
</config>"#,
        )
        .unwrap();
        let cfg = load_config_from_xml_path(&path).unwrap();
        assert_eq!(cfg.public_root, PathBuf::from("/data/public"));
        assert_eq!(cfg.private_root, PathBuf::from("/data/private"));
        assert_eq!(cfg.safe_delete_root, PathBuf::from("/data/safe"));
        assert_eq!(cfg.metadata_root, PathBuf::from("/data/meta"));
        assert_eq!(cfg.log_level, LogLevel::Debug);
        assert_eq!(cfg.backup_retention_days, 7);
        assert!(!cfg.preserve_metadata);
    }

    #[test]
    fn unknown_field_is_rejected() {
        let td = tempdir().unwrap();
        let path = td.path().join("config.xml");
        fs::write(&path, "<config><download_base>/x</download_base></config>").unwrap();
        assert!(load_config_from_xml_path(&path).is_err());
    }

    #[test]
    fn template_round_trips_through_loader() {
        let td = tempdir().unwrap();
        let path = td.path().join("sub").join("config.xml");
        create_template_config(&path).unwrap();
        let cfg = load_config_from_xml_path(&path).unwrap();
        assert_eq!(cfg.log_level, LogLevel::Normal);
        assert_eq!(cfg.backup_retention_days, BACKUP_RETENTION_DAYS_DEFAULT);
        assert!(cfg.public_root.ends_with("public"));
    }
}
