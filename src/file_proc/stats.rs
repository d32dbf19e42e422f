//! Run statistics: atomic counters updated by workers, snapshotted once
//! after the pool joins.

use colored::*;
use indicatif::{HumanBytes, HumanCount};
use std::fs::{self, OpenOptions};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub enum Outcome {
    Skipped,
    Duplicate,
    Moved,
    Failed,
}

#[derive(Debug, Default)]
pub struct RunStats {
    scanned: AtomicU64,
    skipped: AtomicU64,
    duplicate: AtomicU64,
    moved: AtomicU64,
    failed: AtomicU64,
    bytes_hashed: AtomicU64,
    bytes_moved: AtomicU64,
    batches_committed: AtomicU64,
}

impl RunStats {
    pub fn record(&self, outcome: Outcome) {
        let counter = match outcome {
            Outcome::Skipped => &self.skipped,
            Outcome::Duplicate => &self.duplicate,
            Outcome::Moved => &self.moved,
            Outcome::Failed => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_scanned(&self, count: u64) {
        self.scanned.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_bytes_hashed(&self, bytes: u64) {
        self.bytes_hashed.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn add_bytes_moved(&self, bytes: u64) {
        self.bytes_moved.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn batch_committed(&self) {
        self.batches_committed.fetch_add(1, Ordering::Relaxed);
    }

    /// Consistent view of the counters. Only meaningful after every worker
    /// has finished.
    pub fn snapshot(&self, scan_timer: &StatsTimer, process_timer: &StatsTimer) -> StatsSnapshot {
        StatsSnapshot {
            scanned: self.scanned.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            duplicate: self.duplicate.load(Ordering::Relaxed),
            moved: self.moved.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            bytes_hashed: self.bytes_hashed.load(Ordering::Relaxed),
            bytes_moved: self.bytes_moved.load(Ordering::Relaxed),
            batches_committed: self.batches_committed.load(Ordering::Relaxed),
            scan_secs: scan_timer.duration_secs(),
            process_secs: process_timer.duration_secs(),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct StatsTimer {
    start_time: Option<Instant>,
    duration: Duration,
}

impl StatsTimer {
    pub fn start() -> Self {
        StatsTimer {
            start_time: Some(Instant::now()),
            duration: Duration::new(0, 0),
        }
    }

    pub fn finish(&mut self) {
        if let Some(start) = self.start_time {
            self.duration = start.elapsed();
        }
    }

    pub fn duration_secs(&self) -> f64 {
        let secs = self.duration.as_secs() as f64;
        let subsecs = (self.duration.subsec_nanos() as f64) / 1_000_000_000.0;
        secs + subsecs
    }
}

#[derive(Debug, Clone, Default)]
pub struct StatsSnapshot {
    pub scanned: u64,
    pub skipped: u64,
    pub duplicate: u64,
    pub moved: u64,
    pub failed: u64,
    pub bytes_hashed: u64,
    pub bytes_moved: u64,
    pub batches_committed: u64,
    pub scan_secs: f64,
    pub process_secs: f64,
}

impl StatsSnapshot {
    pub fn print(&self) {
        println!();
        println!("{}", "Run summary".bold());
        println!("  scanned    {}", HumanCount(self.scanned));
        println!("  skipped    {}", HumanCount(self.skipped));
        println!(
            "  duplicate  {}",
            format!("{}", HumanCount(self.duplicate)).yellow()
        );
        println!(
            "  moved      {} ({})",
            format!("{}", HumanCount(self.moved)).green(),
            HumanBytes(self.bytes_moved)
        );
        println!(
            "  failed     {}",
            if self.failed > 0 {
                format!("{}", HumanCount(self.failed)).red().to_string()
            } else {
                "0".to_string()
            }
        );
        println!(
            "  hashed {} in {:.2}s (scan {:.2}s, {} batches)",
            HumanBytes(self.bytes_hashed),
            self.process_secs,
            self.scan_secs,
            self.batches_committed,
        );
    }

    /// Appends one row per run to `filename`, writing the header only when
    /// the file is new.
    pub fn write_csv(&self, filename: &str) -> std::io::Result<()> {
        let file_exists = fs::metadata(filename).is_ok();

        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(filename)?;
        let mut wtr = csv::Writer::from_writer(file);

        if !file_exists {
            wtr.write_record([
                "scanned",
                "skipped",
                "duplicate",
                "moved",
                "failed",
                "bytes_hashed",
                "bytes_moved",
                "batches_committed",
                "scan_secs",
                "process_secs",
            ])?;
        }

        wtr.write_record([
            self.scanned.to_string(),
            self.skipped.to_string(),
            self.duplicate.to_string(),
            self.moved.to_string(),
            self.failed.to_string(),
            self.bytes_hashed.to_string(),
            self.bytes_moved.to_string(),
            self.batches_committed.to_string(),
            format!("{:.3}", self.scan_secs),
            format!("{:.3}", self.process_secs),
        ])?;

        wtr.flush()?;
        Ok(())
    }
}
