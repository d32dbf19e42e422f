//! Fast pre-check: skip hashing when a catalog entry already carries the
//! candidate's exact size and mtime.
//!
//! This is a heuristic, not a correctness guarantee: two distinct files can
//! coincidentally share size and mtime. `force_hash` disables the filter for
//! runs where that tradeoff is unacceptable.

use crate::catalog::CatalogStore;
use crate::errors::CatalogError;
use crate::model::FileRecord;

pub struct PreCheckFilter<'a> {
    catalog: &'a CatalogStore,
    enabled: bool,
}

impl<'a> PreCheckFilter<'a> {
    pub fn new(catalog: &'a CatalogStore, force_hash: bool) -> Self {
        PreCheckFilter {
            catalog,
            enabled: !force_hash,
        }
    }

    /// True when the record matches an existing entry bit-for-bit on size
    /// and mtime and can be classified `Skipped` without a digest.
    pub fn is_already_recorded(&self, record: &FileRecord) -> Result<bool, CatalogError> {
        if !self.enabled {
            return Ok(false);
        }
        Ok(self
            .catalog
            .lookup_by_size_and_mtime(record.size, record.mtime)?
            .is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CatalogEntry, FileClass};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn record(size: u64, mtime: i64) -> FileRecord {
        FileRecord::new(PathBuf::from("/src/p.jpg"), size, mtime, FileClass::Image)
    }

    fn seeded_store(dir: &TempDir, size: u64, mtime: i64) -> CatalogStore {
        let store = CatalogStore::open(&dir.path().join("catalog")).unwrap();
        let entry = CatalogEntry {
            digest: [9; 32],
            size,
            mtime,
            class: FileClass::Image,
            original_path: "/src/seed.jpg".to_string(),
            dest_path: "/dest/seed.jpg".to_string(),
            processed_at: 0,
        };
        store.insert_batch(&[entry]).unwrap();
        store
    }

    #[test]
    fn matching_size_and_mtime_hits() {
        let dir = TempDir::new().unwrap();
        let store = seeded_store(&dir, 100, 7_000);
        let filter = PreCheckFilter::new(&store, false);
        assert!(filter.is_already_recorded(&record(100, 7_000)).unwrap());
    }

    #[test]
    fn either_field_differing_misses() {
        let dir = TempDir::new().unwrap();
        let store = seeded_store(&dir, 100, 7_000);
        let filter = PreCheckFilter::new(&store, false);
        assert!(!filter.is_already_recorded(&record(100, 7_001)).unwrap());
        assert!(!filter.is_already_recorded(&record(101, 7_000)).unwrap());
    }

    #[test]
    fn force_hash_disables_the_filter() {
        let dir = TempDir::new().unwrap();
        let store = seeded_store(&dir, 100, 7_000);
        let filter = PreCheckFilter::new(&store, true);
        assert!(!filter.is_already_recorded(&record(100, 7_000)).unwrap());
    }
}
