//! Config validation logic.
//! Verifies directory existence, readability/writability and that the four
//! configured directories do not overlap in ways that would corrupt state.

use anyhow::{Context, Result, bail};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

use super::types::Config;
use crate::errors::SiftError;

impl Config {
    /// Validate existence, readability/writability and canonical paths.
    pub fn validate(&self) -> Result<()> {
        // 1) Content roots: must exist, be directories and be writable.
        for (root, name) in [
            (&self.public_root, "public_root"),
            (&self.private_root, "private_root"),
        ] {
            ensure_dir_exists_and_is_dir(root, name)?;
            ensure_readable(root, name)?;
            ensure_writable(root, name)?;
        }

        // 2) Bookkeeping dirs: created on demand.
        for (dir, name) in [
            (&self.safe_delete_root, "safe_delete_root"),
            (&self.metadata_root, "metadata_root"),
        ] {
            ensure_dir_is_or_create(dir, name)?;
            ensure_writable(dir, name)?;
        }

        // 3) Resolve symlinks and check overlap.
        let public = real(&self.public_root);
        let private = real(&self.private_root);
        let safe = real(&self.safe_delete_root);
        let meta = real(&self.metadata_root);

        if public.starts_with(&private) || private.starts_with(&public) {
            return Err(SiftError::InvalidConfig(format!(
                "public_root '{}' and private_root '{}' must be disjoint",
                public.display(),
                private.display()
            ))
            .into());
        }
        for (dir, name) in [(&safe, "safe_delete_root"), (&meta, "metadata_root")] {
            for (root, root_name) in [(&public, "public_root"), (&private, "private_root")] {
                if dir.starts_with(root) || root.starts_with(dir) {
                    return Err(SiftError::InvalidConfig(format!(
                        "{name} '{}' must not overlap {root_name} '{}'",
                        dir.display(),
                        root.display()
                    ))
                    .into());
                }
            }
        }
        if safe == meta {
            return Err(SiftError::InvalidConfig(format!(
                "safe_delete_root and metadata_root resolve to the same path: '{}'",
                safe.display()
            ))
            .into());
        }

        info!(
            "Config validated: public='{}' private='{}' safe_delete='{}' metadata='{}'",
            public.display(),
            private.display(),
            safe.display(),
            meta.display()
        );
        Ok(())
    }
}

/// Validate and replace every configured directory with its canonical form.
pub fn validate_and_normalize(cfg: &mut Config) -> Result<()> {
    cfg.validate()?;
    cfg.public_root = real(&cfg.public_root);
    cfg.private_root = real(&cfg.private_root);
    cfg.safe_delete_root = real(&cfg.safe_delete_root);
    cfg.metadata_root = real(&cfg.metadata_root);
    Ok(())
}

fn real(path: &Path) -> PathBuf {
    dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Ensure path exists and is a directory; emit clear errors with path context.
fn ensure_dir_exists_and_is_dir(path: &Path, name: &str) -> Result<()> {
    if !path.exists() {
        error!("{name} does not exist: {}", path.display());
        bail!("{name} does not exist: {}", path.display());
    }
    if !path.is_dir() {
        error!("{name} is not a directory: {}", path.display());
        bail!("{name} is not a directory: {}", path.display());
    }
    Ok(())
}

/// Ensure directory is readable by attempting to open its entries.
fn ensure_readable(path: &Path, name: &str) -> Result<()> {
    fs::read_dir(path).with_context(|| {
        format!(
            "Cannot read {name} directory '{}'; check permissions",
            path.display()
        )
    })?;
    debug!("{name} readable: {}", path.display());
    Ok(())
}

/// Ensure directory exists (create if missing). If exists, it must be a directory.
fn ensure_dir_is_or_create(path: &Path, name: &str) -> Result<()> {
    if path.exists() {
        if !path.is_dir() {
            error!("{name} exists but isn't a directory: {}", path.display());
            bail!("{name} exists but isn't a directory: {}", path.display());
        }
    } else {
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create {name} directory '{}'", path.display()))?;
        info!("Created {name} directory: {}", path.display());
    }
    Ok(())
}

/// Ensure directory is writable using a non-destructive probe file.
fn ensure_writable(path: &Path, name: &str) -> Result<()> {
    let probe = path.join(format!(".sift_probe_{}.tmp", std::process::id()));
    fs::OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(&probe)
        .with_context(|| format!("Cannot write to {name} '{}'; check permissions", path.display()))?;
    let _ = fs::remove_file(&probe);
    debug!("{name} writable: {}", path.display());
    Ok(())
}
