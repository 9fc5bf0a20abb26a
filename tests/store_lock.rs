use std::fs;
use tempfile::tempdir;

use sift::fs_ops::LOCK_FILE_NAME;
use sift::{Config, Engine};

#[test]
fn a_second_engine_on_the_same_metadata_root_is_refused() {
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

    let first = Engine::open(&cfg).unwrap();
    assert!(cfg.metadata_root.join(LOCK_FILE_NAME).is_file());
    let err = Engine::open(&cfg).err().expect("second open must fail");
    assert!(err.to_string().contains("in use by another sift process"), "{err}");

    drop(first);
    Engine::open(&cfg).unwrap();
}
