use filetime::{FileTime, set_file_mtime};
use std::fs;
use std::time::{Duration, SystemTime};
use tempfile::tempdir;

use sift::{BackupCleanup, Config, Engine};

#[test]
fn only_backups_older_than_the_window_are_purged() {
    let td = tempdir().unwrap();
    let base = fs::canonicalize(td.path()).unwrap();
    let cfg = Config::new(
        base.join("public"),
        base.join("private"),
        base.join("safe"),
        base.join("meta"),
    );
    fs::create_dir_all(&cfg.private_root).unwrap();
    for name in ["old.jpg", "new.jpg"] {
        let p = cfg.public_root.join("1980/roll").join(name);
        fs::create_dir_all(p.parent().unwrap()).unwrap();
        fs::write(&p, name).unwrap();
    }
    let engine = Engine::open(&cfg).unwrap();
    let report = engine
        .batch_classify(&cfg.public_root.join("1980"), false, &mut |_| {})
        .unwrap();
    assert_eq!(report.moved, 2);

    let old = cfg.safe_delete_root.join("public/1980/roll/old.jpg");
    let new = cfg.safe_delete_root.join("public/1980/roll/new.jpg");
    assert!(old.is_file() && new.is_file());
    let forty_days = SystemTime::now() - Duration::from_secs(40 * 86_400);
    set_file_mtime(&old, FileTime::from_system_time(forty_days)).unwrap();

    let cleaned = engine.cleanup_backups(30).unwrap();
    assert_eq!(cleaned.removed_files, 1);
    assert_eq!(cleaned.failures, 0);
    assert!(!old.exists());
    assert!(new.is_file());

    // Purging everything prunes the emptied tree but keeps the partitions.
    fs::remove_file(&new).unwrap();
    let cleaned = engine.cleanup_backups(0).unwrap();
    assert_eq!(cleaned.removed_files, 0);
    assert!(cleaned.removed_dirs >= 2);
    assert!(!cfg.safe_delete_root.join("public/1980").exists());
    assert!(cfg.safe_delete_root.join("public").is_dir());
}

#[test]
fn missing_safe_delete_area_is_not_an_error() {
    let td = tempdir().unwrap();
    let base = fs::canonicalize(td.path()).unwrap();
    let cfg = Config::new(
        base.join("public"),
        base.join("private"),
        base.join("safe"),
        base.join("meta"),
    );
    fs::create_dir_all(&cfg.public_root).unwrap();
    fs::create_dir_all(&cfg.private_root).unwrap();
    let engine = Engine::open(&cfg).unwrap();
    let cleaned = engine.cleanup_backups(30).unwrap();
    assert_eq!(cleaned, BackupCleanup::default());
}
