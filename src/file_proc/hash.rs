//! Fingerprint engine: deterministic content digest over a file's bytes.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::errors::FileError;
use crate::model::Digest;

/// Bounded read size so arbitrarily large files never load whole into memory.
const CHUNK_SIZE: usize = 64 * 1024;

/// Hashes the full byte stream of `path`. Same bytes always produce the same
/// digest, across threads and across runs. A failed open or a read that dies
/// partway yields `ReadError`; no partial digest escapes.
pub fn fingerprint(path: &Path) -> Result<Digest, FileError> {
    let mut file = File::open(path).map_err(|source| FileError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        let bytes_read = file.read(&mut buffer).map_err(|source| FileError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(*hasher.finalize().as_bytes())
}
