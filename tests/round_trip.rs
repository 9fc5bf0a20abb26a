use std::fs;
use tempfile::tempdir;

use sift::{Config, Engine, FileState, Status};

#[test]
fn public_to_private_and_back_restores_path_and_status() {
    let td = tempdir().unwrap();
    let base = fs::canonicalize(td.path()).unwrap();
    let cfg = Config::new(
        base.join("public"),
        base.join("private"),
        base.join("safe"),
        base.join("meta"),
    );
    fs::create_dir_all(&cfg.private_root).unwrap();
    let original = cfg.public_root.join("2004/summer/beach.png");
    fs::create_dir_all(original.parent().unwrap()).unwrap();
    fs::write(&original, b"waves").unwrap();

    let engine = Engine::open(&cfg).unwrap();
    let away = engine.classify(&original, false).unwrap();
    let away = match away {
        sift::ClassifyOutcome::File(f) => f.path,
        other => panic!("unexpected outcome: {other:?}"),
    };
    assert_eq!(away, cfg.private_root.join("2004/summer/beach.png"));

    let back = match engine.classify(&away, true).unwrap() {
        sift::ClassifyOutcome::File(f) => f.path,
        other => panic!("unexpected outcome: {other:?}"),
    };
    assert_eq!(back, original);
    assert_eq!(fs::read(&original).unwrap(), b"waves");
    assert!(!away.exists());
    assert_eq!(
        engine.file_status(&original),
        FileState {
            status: Some(Status::Public),
            reviewed: true
        }
    );
    assert_eq!(engine.file_status(&away), FileState::default());

    // Both directions left a backup in the partition of the root being left.
    assert!(cfg.safe_delete_root.join("public/2004/summer/beach.png").is_file());
    assert!(cfg.safe_delete_root.join("private/2004/summer/beach.png").is_file());
}
