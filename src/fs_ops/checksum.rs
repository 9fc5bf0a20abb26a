//! Content checksums (BLAKE3).

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

pub(super) const BUF_SIZE: usize = 1024 * 1024;

/// Hex digest of a file's content.
pub fn hash_file(path: &Path) -> io::Result<blake3::Hash> {
    let mut f = File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    let mut buf = vec![0u8; BUF_SIZE];
    loop {
        let n = f.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize())
}
