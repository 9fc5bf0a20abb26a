//! Metadata preservation.
//! Copies timestamps and (on Unix) permission bits from a source file onto its copy.

use anyhow::{Context, Result};
use filetime::{FileTime, set_file_times};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Apply `src_meta`'s atime/mtime and mode to `dest`. Failures are logged, not fatal.
pub(super) fn preserve_metadata(src_meta: &fs::Metadata, dest: &Path) {
    let (at, mt) = {
        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            let mt = FileTime::from_unix_time(src_meta.mtime(), src_meta.mtime_nsec() as u32);
            let at = FileTime::from_unix_time(src_meta.atime(), src_meta.atime_nsec() as u32);
            (Some(at), Some(mt))
        }
        #[cfg(not(unix))]
        {
            let at = src_meta.accessed().ok().map(FileTime::from_system_time);
            let mt = src_meta.modified().ok().map(FileTime::from_system_time);
            (at, mt)
        }
    };

    if let (Some(at), Some(mt)) = (at, mt)
        && let Err(e) = set_file_times(dest, at, mt)
    {
        debug!(path = %dest.display(), error = %e, "could not preserve timestamps");
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = src_meta.permissions().mode() & 0o777;
        if let Err(e) = fs::set_permissions(dest, fs::Permissions::from_mode(mode)) {
            debug!(path = %dest.display(), error = %e, "could not preserve permissions");
        }
    }
}

/// Stat `src` and preserve onto `dest`.
pub(super) fn preserve_from(src: &Path, dest: &Path) -> Result<()> {
    let meta = fs::metadata(src).with_context(|| format!("stat {}", src.display()))?;
    preserve_metadata(&meta, dest);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn mtime_is_copied() {
        let td = tempdir().unwrap();
        let src = td.path().join("src");
        let dest = td.path().join("dest");
        fs::write(&src, b"a").unwrap();
        fs::write(&dest, b"a").unwrap();
        let old = FileTime::from_unix_time(315_532_800, 0);
        set_file_times(&src, old, old).unwrap();

        preserve_from(&src, &dest).unwrap();
        let got = FileTime::from_last_modification_time(&fs::metadata(&dest).unwrap());
        assert_eq!(got, old);
    }

    #[cfg(unix)]
    #[test]
    fn mode_is_copied() {
        use std::os::unix::fs::PermissionsExt;
        let td = tempdir().unwrap();
        let src = td.path().join("src");
        let dest = td.path().join("dest");
        fs::write(&src, b"a").unwrap();
        fs::write(&dest, b"a").unwrap();
        fs::set_permissions(&src, fs::Permissions::from_mode(0o640)).unwrap();
        preserve_from(&src, &dest).unwrap();
        assert_eq!(fs::metadata(&dest).unwrap().permissions().mode() & 0o777, 0o640);
    }
}
