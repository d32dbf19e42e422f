//! Relocator: computes a date-derived destination for a unique file and
//! stages a copy there. The source is only removed by `commit`, after the
//! batch transaction has accepted the file's catalog entry; `discard` rolls
//! a staged copy back without touching the source.

use chrono::{DateTime, Local, TimeZone};
use dashmap::DashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::errors::FileError;
use crate::model::{digest_hex, Digest, FileClass, FileRecord};

/// Digest characters carried into the destination filename.
const NAME_DIGEST_CHARS: usize = 16;

/// A destination copy awaiting the batch verdict. The source file still
/// exists at `source` until `Relocator::commit` removes it.
#[derive(Debug)]
pub struct StagedMove {
    pub source: PathBuf,
    pub dest: PathBuf,
}

pub struct Relocator {
    image_root: PathBuf,
    video_root: PathBuf,
    /// Destination paths claimed during this run. The entry API gives an
    /// atomic check-and-claim, so two workers can never be handed the same
    /// destination even before either file lands on disk.
    claimed: DashMap<PathBuf, ()>,
}

impl Relocator {
    pub fn new(image_root: &Path, video_root: &Path) -> Self {
        Relocator {
            image_root: image_root.to_path_buf(),
            video_root: video_root.to_path_buf(),
            claimed: DashMap::new(),
        }
    }

    /// Copies `record` to `<root>/<YYYY>/<MM>/<DD>/<YYYY-MM-DD>-<digest16><ext>`
    /// under the class-appropriate root, suffixing `_1`, `_2`, ... on
    /// collision. The source stays in place either way; on failure the claim
    /// is released and no destination file remains.
    pub fn stage(&self, record: &FileRecord, digest: &Digest) -> Result<StagedMove, FileError> {
        let root = match record.class {
            FileClass::Image => &self.image_root,
            FileClass::Video => &self.video_root,
        };
        let (year, month, day) = date_parts(record.mtime);
        let target_dir = root.join(&year).join(&month).join(&day);
        fs::create_dir_all(&target_dir).map_err(|source| FileError::Move {
            path: record.path.clone(),
            source,
        })?;

        let stem = format!(
            "{}-{}-{}-{}",
            year,
            month,
            day,
            &digest_hex(digest)[..NAME_DIGEST_CHARS]
        );
        let extension = record
            .path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
            .unwrap_or_default();

        let dest = self.claim_destination(&target_dir, &stem, &extension);
        match copy_into_place(&record.path, &dest) {
            Ok(()) => {
                debug!("Staged {} -> {}", record.path.display(), dest.display());
                Ok(StagedMove {
                    source: record.path.clone(),
                    dest,
                })
            }
            Err(source) => {
                self.claimed.remove(&dest);
                Err(FileError::Move {
                    path: record.path.clone(),
                    source,
                })
            }
        }
    }

    /// Finalizes a staged move whose entry the catalog accepted: removes the
    /// source file. A failed removal leaves a redundant source copy behind,
    /// which is reported but does not fail the file.
    pub fn commit(&self, staged: &StagedMove) {
        if let Err(err) = fs::remove_file(&staged.source) {
            warn!(
                "Source {} could not be removed after commit: {}",
                staged.source.display(),
                err
            );
        }
    }

    /// Rolls a staged move back: removes the destination copy and releases
    /// its claim. The source file was never touched.
    pub fn discard(&self, staged: &StagedMove) {
        if let Err(err) = fs::remove_file(&staged.dest) {
            warn!(
                "Staged copy {} could not be removed: {}",
                staged.dest.display(),
                err
            );
        }
        self.claimed.remove(&staged.dest);
    }

    fn claim_destination(&self, dir: &Path, stem: &str, extension: &str) -> PathBuf {
        let mut counter = 0usize;
        loop {
            let name = if counter == 0 {
                format!("{stem}{extension}")
            } else {
                format!("{stem}_{counter}{extension}")
            };
            let candidate = dir.join(name);
            // on-disk probe covers files moved by earlier runs
            if candidate.exists() {
                counter += 1;
                continue;
            }
            match self.claimed.entry(candidate.clone()) {
                dashmap::mapref::entry::Entry::Vacant(slot) => {
                    slot.insert(());
                    return candidate;
                }
                dashmap::mapref::entry::Entry::Occupied(_) => {
                    counter += 1;
                }
            }
        }
    }
}

fn date_parts(mtime: i64) -> (String, String, String) {
    // unrepresentable mtimes land in a fixed epoch bucket so the same file
    // resolves to the same destination on every run
    let datetime = Local
        .timestamp_opt(mtime, 0)
        .single()
        .unwrap_or_else(|| DateTime::UNIX_EPOCH.with_timezone(&Local));
    (
        datetime.format("%Y").to_string(),
        datetime.format("%m").to_string(),
        datetime.format("%d").to_string(),
    )
}

/// Copies `src` to a `.part` sibling of `dest`, then swaps it into place,
/// so `dest` never appears partially written. The source is not touched.
fn copy_into_place(src: &Path, dest: &Path) -> io::Result<()> {
    let part_name = match dest.file_name() {
        Some(name) => {
            let mut part = name.to_os_string();
            part.push(".part");
            part
        }
        None => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "destination has no file name",
            ))
        }
    };
    let staging = dest.with_file_name(part_name);

    if let Err(err) = fs::copy(src, &staging) {
        let _ = fs::remove_file(&staging);
        return Err(err);
    }
    if let Err(err) = fs::rename(&staging, dest) {
        let _ = fs::remove_file(&staging);
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::unix_seconds;
    use std::fs;
    use tempfile::TempDir;

    fn record_for(path: &Path) -> FileRecord {
        record_with_class(path, FileClass::Image)
    }

    fn record_with_class(path: &Path, class: FileClass) -> FileRecord {
        let meta = fs::metadata(path).unwrap();
        FileRecord::new(
            path.to_path_buf(),
            meta.len(),
            unix_seconds(meta.modified().unwrap()),
            class,
        )
    }

    fn single_root(dest: &TempDir) -> Relocator {
        Relocator::new(dest.path(), dest.path())
    }

    #[test]
    fn destination_uses_date_directories_and_digest_name() {
        let src_dir = TempDir::new().unwrap();
        let dest_dir = TempDir::new().unwrap();
        let src = src_dir.path().join("IMG_0001.JPG");
        fs::write(&src, b"pixels").unwrap();

        let record = record_for(&src);
        let digest = [0xcd; 32];
        let relocator = single_root(&dest_dir);
        let staged = relocator.stage(&record, &digest).unwrap();

        let (year, month, day) = date_parts(record.mtime);
        assert_eq!(
            staged.dest,
            dest_dir
                .path()
                .join(&year)
                .join(&month)
                .join(&day)
                .join(format!("{year}-{month}-{day}-{}.jpg", "cd".repeat(8)))
        );
        assert!(staged.dest.is_file());
        // staging never removes the source
        assert!(src.exists());
        assert_eq!(fs::read(&staged.dest).unwrap(), b"pixels");

        relocator.commit(&staged);
        assert!(!src.exists());
        assert!(staged.dest.is_file());
    }

    #[test]
    fn videos_land_under_the_video_root() {
        let src_dir = TempDir::new().unwrap();
        let image_dir = TempDir::new().unwrap();
        let video_dir = TempDir::new().unwrap();
        let src = src_dir.path().join("clip.MOV");
        fs::write(&src, b"frames").unwrap();

        let relocator = Relocator::new(image_dir.path(), video_dir.path());
        let record = record_with_class(&src, FileClass::Video);
        let staged = relocator.stage(&record, &[0x33; 32]).unwrap();

        assert!(staged.dest.starts_with(video_dir.path()));
        assert!(staged.dest.to_string_lossy().ends_with(".mov"));
    }

    #[test]
    fn colliding_destinations_get_numeric_suffixes() {
        let src_dir = TempDir::new().unwrap();
        let dest_dir = TempDir::new().unwrap();
        let first = src_dir.path().join("a.jpg");
        let second = src_dir.path().join("b.jpg");
        fs::write(&first, b"same").unwrap();
        fs::write(&second, b"same").unwrap();

        let digest = [0x11; 32];
        let relocator = single_root(&dest_dir);
        let staged_a = relocator.stage(&record_for(&first), &digest).unwrap();
        let staged_b = relocator.stage(&record_for(&second), &digest).unwrap();

        assert_ne!(staged_a.dest, staged_b.dest);
        let name_b = staged_b
            .dest
            .file_name()
            .unwrap()
            .to_string_lossy()
            .into_owned();
        assert!(name_b.contains("_1"), "unexpected name {name_b}");
        assert!(staged_a.dest.is_file() && staged_b.dest.is_file());
    }

    #[test]
    fn failed_staging_leaves_source_intact() {
        let src_dir = TempDir::new().unwrap();
        let dest_parent = TempDir::new().unwrap();
        // dest root is a plain file, so creating date directories must fail
        let dest_root = dest_parent.path().join("blocked");
        fs::write(&dest_root, b"not a directory").unwrap();

        let src = src_dir.path().join("a.jpg");
        fs::write(&src, b"payload").unwrap();
        let relocator = Relocator::new(&dest_root, &dest_root);

        match relocator.stage(&record_for(&src), &[0x22; 32]) {
            Err(FileError::Move { path, .. }) => assert_eq!(path, src),
            other => panic!("expected MoveError, got {:?}", other),
        }
        assert!(src.exists());
        assert_eq!(fs::read(&src).unwrap(), b"payload");
    }

    #[test]
    fn discard_removes_the_copy_and_keeps_the_source() {
        let src_dir = TempDir::new().unwrap();
        let dest_dir = TempDir::new().unwrap();
        let src = src_dir.path().join("a.jpg");
        fs::write(&src, b"payload").unwrap();

        let relocator = single_root(&dest_dir);
        let staged = relocator.stage(&record_for(&src), &[0x44; 32]).unwrap();
        assert!(staged.dest.is_file());

        relocator.discard(&staged);
        assert!(!staged.dest.exists());
        assert!(src.exists());
        assert_eq!(fs::read(&src).unwrap(), b"payload");
    }

    #[test]
    fn out_of_range_mtime_maps_to_a_stable_date() {
        let a = date_parts(i64::MAX);
        let b = date_parts(i64::MAX);
        assert_eq!(a, b);
        // every unrepresentable value shares the same fixed bucket
        assert_eq!(date_parts(i64::MAX), date_parts(i64::MIN));
    }
}
