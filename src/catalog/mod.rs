//! Durable catalog of processed files, backed by an embedded RocksDB store.
//!
//! Keyspaces share one column family with a one-byte prefix:
//! `e:` digest+size -> bincode [`CatalogEntry`] (primary),
//! `i:` size+mtime -> primary key (pre-check index),
//! `m:` run-aggregate counters.
//!
//! Reads go straight to RocksDB and run concurrently. Writes are funneled
//! through a single mutex so at most one batch commits at a time; each batch
//! is one atomic `WriteBatch`, so readers observe either none or all of it.

use rocksdb::{IteratorMode, Options, WriteBatch, DB};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, trace};

use crate::errors::CatalogError;
use crate::model::{CatalogEntry, Digest, DIGEST_LEN};

const ENTRY_PREFIX: u8 = b'e';
const INDEX_PREFIX: u8 = b'i';

static META_DUPLICATE_HITS: &[u8] = b"m:duplicate_hits";

fn entry_key(digest: &Digest, size: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(2 + DIGEST_LEN + 8);
    key.push(ENTRY_PREFIX);
    key.push(b':');
    key.extend_from_slice(digest);
    key.extend_from_slice(&size.to_be_bytes());
    key
}

fn index_key(size: u64, mtime: i64) -> Vec<u8> {
    let mut key = Vec::with_capacity(2 + 8 + 8);
    key.push(INDEX_PREFIX);
    key.push(b':');
    key.extend_from_slice(&size.to_be_bytes());
    key.extend_from_slice(&mtime.to_be_bytes());
    key
}

/// Result of one batch transaction. `conflicts` holds indices into the
/// submitted slice whose digest+size was already present (in the store or
/// earlier in the same batch); those entries were dropped, the rest
/// committed atomically.
#[derive(Debug)]
pub struct BatchCommit {
    pub inserted: usize,
    pub conflicts: Vec<usize>,
}

/// Read-only aggregates over the whole catalog.
#[derive(Debug, Clone, Default)]
pub struct AggregateStats {
    pub entry_count: u64,
    pub total_bytes: u64,
    pub duplicate_hits: u64,
}

pub struct CatalogStore {
    db: DB,
    // Single writer slot; readers never take this
    write_lock: Mutex<()>,
}

impl CatalogStore {
    /// Opens (or creates) the catalog. A store that cannot be opened, e.g.
    /// locked by another process or corrupt, is fatal to the run.
    pub fn open(path: &Path) -> Result<CatalogStore, CatalogError> {
        let mut db_options = Options::default();
        db_options.create_if_missing(true);
        let db = DB::open(&db_options, path).map_err(|source| CatalogError::Unavailable {
            path: path.to_string_lossy().into_owned(),
            source,
        })?;
        debug!("Catalog open at {}", path.display());
        Ok(CatalogStore {
            db,
            write_lock: Mutex::new(()),
        })
    }

    /// Point lookup on the primary dedup key.
    pub fn lookup(&self, digest: &Digest, size: u64) -> Result<Option<CatalogEntry>, CatalogError> {
        match self.db.get(entry_key(digest, size))? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    /// Exact-match lookup on the size+mtime index, used by the pre-check.
    pub fn lookup_by_size_and_mtime(
        &self,
        size: u64,
        mtime: i64,
    ) -> Result<Option<CatalogEntry>, CatalogError> {
        let primary = match self.db.get(index_key(size, mtime))? {
            Some(key) => key,
            None => return Ok(None),
        };
        match self.db.get(&primary)? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    /// All-or-nothing insert of one worker's batch. Serialized against all
    /// other writers; concurrent lookups see the pre- or post-commit state,
    /// never part of a batch.
    pub fn insert_batch(&self, entries: &[CatalogEntry]) -> Result<BatchCommit, CatalogError> {
        let _guard = self.write_lock.lock().unwrap();

        let mut batch = WriteBatch::default();
        let mut keys_in_batch: HashSet<Vec<u8>> = HashSet::with_capacity(entries.len());
        let mut conflicts = Vec::new();

        for (idx, entry) in entries.iter().enumerate() {
            let primary = entry_key(&entry.digest, entry.size);
            if keys_in_batch.contains(&primary) || self.db.get(&primary)?.is_some() {
                trace!("Conflicting entry for {}", entry.original_path);
                conflicts.push(idx);
                continue;
            }
            batch.put(&primary, bincode::serialize(entry)?);
            batch.put(index_key(entry.size, entry.mtime), &primary);
            keys_in_batch.insert(primary);
        }

        let inserted = keys_in_batch.len();
        self.db.write(batch)?;
        debug!("Committed batch of {} entries", inserted);

        Ok(BatchCommit {
            inserted,
            conflicts,
        })
    }

    /// Bumps the durable duplicate-hit counter. Takes the writer slot like
    /// any other write.
    pub fn record_duplicates(&self, count: u64) -> Result<(), CatalogError> {
        if count == 0 {
            return Ok(());
        }
        let _guard = self.write_lock.lock().unwrap();
        let current = match self.db.get(META_DUPLICATE_HITS)? {
            Some(value) => decode_counter(&value),
            None => 0,
        };
        self.db
            .put(META_DUPLICATE_HITS, (current + count).to_be_bytes())?;
        Ok(())
    }

    pub fn stats(&self) -> Result<AggregateStats, CatalogError> {
        let mut stats = AggregateStats::default();
        for item in self.db.iterator(IteratorMode::Start) {
            let (key, value) = item?;
            if key.first() != Some(&ENTRY_PREFIX) {
                continue;
            }
            let entry: CatalogEntry = bincode::deserialize(&value)?;
            stats.entry_count += 1;
            stats.total_bytes += entry.size;
        }
        if let Some(value) = self.db.get(META_DUPLICATE_HITS)? {
            stats.duplicate_hits = decode_counter(&value);
        }
        Ok(stats)
    }

    /// Most recently processed entries, newest first. Maintenance query for
    /// the `catalog-info` subcommand.
    pub fn recent_entries(&self, limit: usize) -> Result<Vec<CatalogEntry>, CatalogError> {
        let mut entries = Vec::new();
        for item in self.db.iterator(IteratorMode::Start) {
            let (key, value) = item?;
            if key.first() != Some(&ENTRY_PREFIX) {
                continue;
            }
            entries.push(bincode::deserialize::<CatalogEntry>(&value)?);
        }
        entries.sort_by(|a, b| b.processed_at.cmp(&a.processed_at));
        entries.truncate(limit);
        Ok(entries)
    }
}

fn decode_counter(value: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    let len = value.len().min(8);
    buf[..len].copy_from_slice(&value[..len]);
    u64::from_be_bytes(buf)
}
