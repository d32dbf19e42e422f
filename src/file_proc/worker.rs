//! Per-batch worker pipeline: pre-check, fingerprint, duplicate lookup,
//! relocation, then one catalog transaction for the whole batch.

use indicatif::ProgressBar;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::catalog::CatalogStore;
use crate::errors::{CatalogError, FileError};
use crate::file_proc::hash;
use crate::file_proc::precheck::PreCheckFilter;
use crate::file_proc::relocate::{Relocator, StagedMove};
use crate::file_proc::stats::{Outcome, RunStats};
use crate::model::{CatalogEntry, Digest, FileRecord};
use std::collections::HashSet;

pub struct WorkerContext<'a> {
    pub catalog: &'a CatalogStore,
    pub relocator: &'a Relocator,
    pub precheck: PreCheckFilter<'a>,
    pub stats: &'a RunStats,
}

/// What one batch produced: committed entries plus the files that failed,
/// with their reasons. Granularity survives the transaction boundary.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub committed: usize,
    pub skipped: usize,
    pub duplicates: usize,
    pub failed: Vec<(PathBuf, FileError)>,
}

enum FileVerdict {
    Skipped,
    Duplicate,
    Staged(CatalogEntry, StagedMove),
    Failed(FileError),
}

/// Runs the per-file pipeline over `batch` in order, then submits one
/// all-or-nothing insert for every staged file. Sources are only removed
/// after the transaction accepts their entries; a rejected or rolled-back
/// entry has its destination copy discarded and its source kept. Per-file
/// errors classify that file as failed and the batch continues; a store
/// error is fatal and propagates to the run controller.
pub fn process_batch(
    ctx: &WorkerContext,
    batch: &[FileRecord],
    progress: Option<&ProgressBar>,
) -> Result<BatchOutcome, CatalogError> {
    let mut outcome = BatchOutcome::default();
    let mut entries: Vec<CatalogEntry> = Vec::new();
    let mut staged: Vec<StagedMove> = Vec::new();
    // digests staged earlier in this batch but not yet committed; a later
    // identical file is a duplicate, not a second move
    let mut pending: HashSet<(Digest, u64)> = HashSet::new();

    for record in batch {
        match classify_file(ctx, record, &mut pending)? {
            FileVerdict::Skipped => {
                outcome.skipped += 1;
                ctx.stats.record(Outcome::Skipped);
            }
            FileVerdict::Duplicate => {
                debug!("Duplicate content: {}", record.path.display());
                outcome.duplicates += 1;
                ctx.stats.record(Outcome::Duplicate);
            }
            FileVerdict::Staged(entry, stage) => {
                entries.push(entry);
                staged.push(stage);
            }
            FileVerdict::Failed(err) => {
                warn!("{}", err);
                ctx.stats.record(Outcome::Failed);
                outcome.failed.push((record.path.clone(), err));
            }
        }
        if let Some(bar) = progress {
            bar.inc(1);
        }
    }

    if !entries.is_empty() {
        match ctx.catalog.insert_batch(&entries) {
            Ok(commit) => {
                let conflicts: HashSet<usize> = commit.conflicts.iter().copied().collect();
                for (idx, stage) in staged.iter().enumerate() {
                    if conflicts.contains(&idx) {
                        warn!(
                            "Entry for {} lost a dedup race, keeping its source",
                            stage.source.display()
                        );
                        ctx.relocator.discard(stage);
                        ctx.stats.record(Outcome::Failed);
                        outcome.failed.push((
                            stage.source.clone(),
                            FileError::Conflict {
                                path: stage.source.clone(),
                            },
                        ));
                    } else {
                        ctx.relocator.commit(stage);
                        ctx.stats.record(Outcome::Moved);
                        ctx.stats.add_bytes_moved(entries[idx].size);
                    }
                }
                outcome.committed = commit.inserted;
                ctx.stats.batch_committed();
            }
            Err(err) => {
                // the transaction rolled back whole; no entry is visible, so
                // every staged copy is discarded and every source survives
                let reason = err.to_string();
                for stage in &staged {
                    ctx.relocator.discard(stage);
                    ctx.stats.record(Outcome::Failed);
                    outcome.failed.push((
                        stage.source.clone(),
                        FileError::BatchWrite {
                            path: stage.source.clone(),
                            reason: reason.clone(),
                        },
                    ));
                }
                return Err(err);
            }
        }
    }

    if outcome.duplicates > 0 {
        ctx.catalog.record_duplicates(outcome.duplicates as u64)?;
    }

    Ok(outcome)
}

fn classify_file(
    ctx: &WorkerContext,
    record: &FileRecord,
    pending: &mut HashSet<(Digest, u64)>,
) -> Result<FileVerdict, CatalogError> {
    if ctx.precheck.is_already_recorded(record)? {
        debug!("Pre-check hit, skipping {}", record.path.display());
        return Ok(FileVerdict::Skipped);
    }

    let digest = match hash::fingerprint(&record.path) {
        Ok(digest) => digest,
        Err(err) => return Ok(FileVerdict::Failed(err)),
    };
    ctx.stats.add_bytes_hashed(record.size);

    if pending.contains(&(digest, record.size))
        || ctx.catalog.lookup(&digest, record.size)?.is_some()
    {
        return Ok(FileVerdict::Duplicate);
    }

    match ctx.relocator.stage(record, &digest) {
        Ok(stage) => {
            pending.insert((digest, record.size));
            let entry = CatalogEntry::from_record(record, digest, &stage.dest);
            Ok(FileVerdict::Staged(entry, stage))
        }
        Err(err) => Ok(FileVerdict::Failed(err)),
    }
}
