use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

pub const DIGEST_LEN: usize = 32;

/// Fixed-length content fingerprint, the primary deduplication key
/// together with the file size.
pub type Digest = [u8; DIGEST_LEN];

pub fn digest_hex(digest: &Digest) -> String {
    let mut out = String::with_capacity(DIGEST_LEN * 2);
    for byte in digest {
        let _ = write!(out, "{:02x}", byte);
    }
    out
}

/// Seconds since the Unix epoch, negative for timestamps before it.
pub fn unix_seconds(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs() as i64,
        Err(e) => -(e.duration().as_secs() as i64),
    }
}

/// Extension-derived media class; decides which destination root a file
/// is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileClass {
    Image,
    Video,
}

impl FileClass {
    /// Classifies by lowercase extension: anything on the video list is a
    /// video, everything else counts as an image.
    pub fn of_path(path: &Path, video_extensions: &[String]) -> FileClass {
        let is_video = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext = ext.to_lowercase();
                video_extensions.iter().any(|v| v == &ext)
            })
            .unwrap_or(false);
        if is_video {
            FileClass::Video
        } else {
            FileClass::Image
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    New,
    Skipped,
    Duplicate,
    Moved,
    Failed,
}

/// A candidate file discovered by the scan. The digest stays `None` until
/// the fingerprint engine has read the file; status moves away from `New`
/// exactly once.
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub path: PathBuf,
    pub size: u64,
    pub mtime: i64,
    pub class: FileClass,
    pub digest: Option<Digest>,
    pub status: FileStatus,
}

impl FileRecord {
    pub fn new(path: PathBuf, size: u64, mtime: i64, class: FileClass) -> Self {
        FileRecord {
            path,
            size,
            mtime,
            class,
            digest: None,
            status: FileStatus::New,
        }
    }
}

/// Durable counterpart of a successfully moved file. Keyed on digest+size,
/// never mutated after insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub digest: Digest,
    pub size: u64,
    pub mtime: i64,
    pub class: FileClass,
    pub original_path: String,
    pub dest_path: String,
    pub processed_at: i64,
}

impl CatalogEntry {
    pub fn from_record(record: &FileRecord, digest: Digest, dest_path: &Path) -> Self {
        CatalogEntry {
            digest,
            size: record.size,
            mtime: record.mtime,
            class: record.class,
            original_path: record.path.to_string_lossy().into_owned(),
            dest_path: dest_path.to_string_lossy().into_owned(),
            processed_at: unix_seconds(SystemTime::now()),
        }
    }
}
