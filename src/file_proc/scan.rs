//! Directory scan: enumerates candidate files with their size and mtime.
//! Single-threaded, deterministic order (sorted by file name) so batch
//! composition is reproducible between runs.

use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::app_config::AppConfig;
use crate::file_proc::stats::RunStats;
use crate::model::{unix_seconds, FileClass, FileRecord};

pub fn collect_files(input_paths: &[String], config: &AppConfig, stats: &RunStats) -> Vec<FileRecord> {
    let mut records = Vec::new();

    for root in input_paths {
        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !is_skipped_dir(entry, &config.skip_dirs));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("Skipping unreadable entry under {}: {}", root, err);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let extension = entry.path().extension().and_then(|ext| ext.to_str());
            if !config.accepts_extension(extension) {
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(err) => {
                    warn!("No metadata for {}: {}", entry.path().display(), err);
                    continue;
                }
            };
            if metadata.len() < config.min_file_size {
                debug!("Below size threshold: {}", entry.path().display());
                continue;
            }
            let mtime = match metadata.modified() {
                Ok(modified) => unix_seconds(modified),
                Err(err) => {
                    warn!("No mtime for {}: {}", entry.path().display(), err);
                    continue;
                }
            };

            records.push(FileRecord::new(
                entry.path().to_path_buf(),
                metadata.len(),
                mtime,
                FileClass::of_path(entry.path(), &config.video_extensions),
            ));
        }
    }

    stats.add_scanned(records.len() as u64);
    records
}

fn is_skipped_dir(entry: &DirEntry, skip_dirs: &[String]) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .map(|name| skip_dirs.iter().any(|skip| skip == name))
            .unwrap_or(false)
}
