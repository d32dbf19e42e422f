use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Store-level failures. `Unavailable` and `Store` are fatal to the run;
/// the run controller stops dispatching batches once one surfaces.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog at '{path}' cannot be opened: {source}")]
    Unavailable {
        path: String,
        #[source]
        source: rocksdb::Error,
    },
    #[error("catalog store error: {0}")]
    Store(#[from] rocksdb::Error),
    #[error("catalog codec error: {0}")]
    Codec(#[from] bincode::Error),
}

/// Per-file failures. These classify the file as `Failed` and never abort
/// the batch or other workers.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("read failed for '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("move failed for '{path}': {source}")]
    Move {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("digest+size for '{path}' already present in batch or catalog")]
    Conflict { path: PathBuf },
    #[error("batch insert failed for '{path}': {reason}")]
    BatchWrite { path: PathBuf, reason: String },
}
