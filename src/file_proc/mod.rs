//! The processing pipeline: scan, batch, parallel workers, batched catalog
//! transactions, summary.

use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};

use crate::app_config::AppConfig;
use crate::catalog::CatalogStore;
use crate::errors::CatalogError;
use crate::model::FileRecord;
use crate::utils;

pub mod batch;
pub mod hash;
pub mod precheck;
pub mod relocate;
pub mod scan;
pub mod stats;
pub mod worker;

use precheck::PreCheckFilter;
use relocate::Relocator;
use stats::{RunStats, StatsSnapshot, StatsTimer};
use worker::WorkerContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    CompletedWithFailures,
    Aborted,
}

#[derive(Debug)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub stats: StatsSnapshot,
    /// First fatal store error observed, if any.
    pub first_fatal: Option<String>,
    pub catalog_entries: u64,
    pub catalog_bytes: u64,
}

/// Runs the whole pipeline once. `cancel` is the cooperative stop signal:
/// once observed, no further batches are dispatched and in-flight batches
/// drain; the caller decides what to do with the report.
pub fn run(config: &AppConfig, cancel: Arc<AtomicBool>) -> Result<RunReport, CatalogError> {
    let stats = RunStats::default();
    let mut process_timer = StatsTimer::start();

    // a catalog that cannot open is fatal before any work starts
    let catalog = CatalogStore::open(Path::new(&config.catalog_path))?;

    let input_paths = utils::non_overlapping_directories(config.input_folders.clone());
    info!("Processing directories: {:?}", input_paths);

    let mut scan_timer = StatsTimer::start();
    let records = scan::collect_files(&input_paths, config, &stats);
    scan_timer.finish();
    info!("{} candidate files discovered", records.len());

    let total_files = records.len() as u64;
    let batches = batch::partition(records, config.batch_size);
    let workers = config.effective_workers();
    debug!(
        "Dispatching {} batches (size <= {}) across {} workers",
        batches.len(),
        config.batch_size,
        workers
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .expect("failed to build worker pool");

    let relocator = Relocator::new(Path::new(&config.image_root), Path::new(&config.video_root));
    let progress = ProgressBar::new(total_files);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );

    let fatal = Mutex::new(None::<String>);
    let fatal_flag = AtomicBool::new(false);
    let next_batch = AtomicUsize::new(0);

    pool.scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|_| {
                worker_loop(
                    &batches,
                    &next_batch,
                    &cancel,
                    &fatal_flag,
                    &fatal,
                    &catalog,
                    &relocator,
                    config,
                    &stats,
                    &progress,
                );
            });
        }
    });
    progress.finish_and_clear();

    let aborted = cancel.load(Ordering::SeqCst) || fatal_flag.load(Ordering::SeqCst);
    if !aborted {
        for path in &input_paths {
            let removed = utils::remove_empty_dirs(Path::new(path), &config.skip_dirs);
            if removed > 0 {
                info!("Removed {} empty directories under {}", removed, path);
            }
        }
    }

    process_timer.finish();
    let snapshot = stats.snapshot(&scan_timer, &process_timer);
    let catalog_stats = catalog.stats().unwrap_or_else(|err| {
        warn!("Could not read catalog aggregates: {}", err);
        Default::default()
    });
    info!(
        "Catalog now holds {} entries ({} bytes), {} duplicate hits recorded",
        catalog_stats.entry_count, catalog_stats.total_bytes, catalog_stats.duplicate_hits
    );

    let outcome = if aborted {
        RunOutcome::Aborted
    } else if snapshot.failed > 0 {
        RunOutcome::CompletedWithFailures
    } else {
        RunOutcome::Completed
    };

    Ok(RunReport {
        outcome,
        stats: snapshot,
        first_fatal: fatal.into_inner().unwrap(),
        catalog_entries: catalog_stats.entry_count,
        catalog_bytes: catalog_stats.total_bytes,
    })
}

/// One worker: pull the next batch by index (discovery order), process it,
/// stop when the queue is empty or a stop condition is observed. A batch
/// that has started always runs to completion, including its transaction.
#[allow(clippy::too_many_arguments)]
fn worker_loop(
    batches: &[Vec<FileRecord>],
    next_batch: &AtomicUsize,
    cancel: &AtomicBool,
    fatal_flag: &AtomicBool,
    fatal: &Mutex<Option<String>>,
    catalog: &CatalogStore,
    relocator: &Relocator,
    config: &AppConfig,
    stats: &RunStats,
    progress: &ProgressBar,
) {
    loop {
        if cancel.load(Ordering::SeqCst) || fatal_flag.load(Ordering::SeqCst) {
            break;
        }
        let index = next_batch.fetch_add(1, Ordering::SeqCst);
        if index >= batches.len() {
            break;
        }

        let ctx = WorkerContext {
            catalog,
            relocator,
            precheck: PreCheckFilter::new(catalog, config.force_hash),
            stats,
        };
        match worker::process_batch(&ctx, &batches[index], Some(progress)) {
            Ok(outcome) => {
                debug!(
                    "Batch {}: {} committed, {} skipped, {} duplicate, {} failed",
                    index,
                    outcome.committed,
                    outcome.skipped,
                    outcome.duplicates,
                    outcome.failed.len()
                );
            }
            Err(err) => {
                error!("Fatal store error in batch {}: {}", index, err);
                fatal_flag.store(true, Ordering::SeqCst);
                let mut slot = fatal.lock().unwrap();
                if slot.is_none() {
                    *slot = Some(err.to_string());
                }
            }
        }
    }
}
