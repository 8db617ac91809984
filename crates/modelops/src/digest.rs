use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::Result;

/// BLAKE3 of the artifact bytes, hex encoded. Identifies exactly which file a
/// serving process loaded.
pub fn artifact_digest(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize().as_bytes()))
}
