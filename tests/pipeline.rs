//! End-to-end runs of the processing pipeline against real temp directories.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tempfile::TempDir;

use photosort::app_config::AppConfig;
use photosort::catalog::CatalogStore;
use photosort::file_proc::{self, RunOutcome};

struct Dirs {
    source: TempDir,
    dest: TempDir,
    catalog: TempDir,
}

impl Dirs {
    fn new() -> Self {
        Dirs {
            source: TempDir::new().unwrap(),
            dest: TempDir::new().unwrap(),
            catalog: TempDir::new().unwrap(),
        }
    }

    fn config(&self, workers: usize, batch_size: usize) -> AppConfig {
        AppConfig {
            input_folders: vec![self.source.path().to_string_lossy().into_owned()],
            image_root: self.dest.path().to_string_lossy().into_owned(),
            video_root: self
                .dest
                .path()
                .join("videos")
                .to_string_lossy()
                .into_owned(),
            catalog_path: self
                .catalog
                .path()
                .join("catalog")
                .to_string_lossy()
                .into_owned(),
            worker_count: workers,
            batch_size,
            min_file_size: 1,
            image_extensions: vec![],
            video_extensions: vec![],
            skip_dirs: vec![],
            single_thread: false,
            force_hash: false,
        }
    }

    fn write_source(&self, name: &str, content: &[u8]) {
        fs::write(self.source.path().join(name), content).unwrap();
    }

    fn dest_file_count(&self) -> usize {
        walkdir::WalkDir::new(self.dest.path())
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .count()
    }
}

fn run(config: &AppConfig) -> file_proc::RunReport {
    file_proc::run(config, Arc::new(AtomicBool::new(false))).unwrap()
}

#[test]
fn two_identical_and_one_distinct_yield_two_entries() {
    let dirs = Dirs::new();
    dirs.write_source("a.jpg", b"identical content here");
    dirs.write_source("b.jpg", b"identical content here");
    dirs.write_source("c.jpg", b"something else entirely");

    let report = run(&dirs.config(1, 100));

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.stats.scanned, 3);
    assert_eq!(report.stats.moved, 2);
    assert_eq!(report.stats.duplicate, 1);
    assert_eq!(report.stats.failed, 0);
    assert_eq!(report.catalog_entries, 2);
    assert_eq!(dirs.dest_file_count(), 2);

    // catalog agrees after the run
    let catalog = CatalogStore::open(Path::new(&dirs.config(1, 100).catalog_path)).unwrap();
    assert_eq!(catalog.stats().unwrap().entry_count, 2);
}

#[test]
fn second_run_moves_nothing() {
    let dirs = Dirs::new();
    dirs.write_source("a.jpg", b"unique one");
    dirs.write_source("b.jpg", b"unique two");
    dirs.write_source("dup1.jpg", b"twin payload");
    dirs.write_source("dup2.jpg", b"twin payload");
    let config = dirs.config(2, 2);

    let first = run(&config);
    assert_eq!(first.stats.moved, 3);
    assert_eq!(first.stats.duplicate, 1);

    // the duplicate was left in place; a second run must classify every
    // remaining candidate without moving anything
    let second = run(&config);
    assert_eq!(second.stats.moved, 0);
    assert_eq!(second.stats.failed, 0);
    assert_eq!(
        second.stats.skipped + second.stats.duplicate,
        second.stats.scanned
    );
    assert_eq!(second.catalog_entries, 3);
    assert_eq!(dirs.dest_file_count(), 3);
}

#[test]
fn one_and_eight_workers_agree_on_counts() {
    let contents: Vec<Vec<u8>> = (0..10u8).map(|i| vec![i; 2048]).collect();

    let single = Dirs::new();
    let parallel = Dirs::new();
    for (i, content) in contents.iter().enumerate() {
        single.write_source(&format!("f{i:02}.jpg"), content);
        parallel.write_source(&format!("f{i:02}.jpg"), content);
    }

    let single_report = run(&single.config(1, 3));
    let parallel_report = run(&parallel.config(8, 3));

    assert_eq!(single_report.stats.scanned, parallel_report.stats.scanned);
    assert_eq!(single_report.stats.moved, parallel_report.stats.moved);
    assert_eq!(
        single_report.stats.duplicate,
        parallel_report.stats.duplicate
    );
    assert_eq!(single_report.stats.failed, parallel_report.stats.failed);
    assert_eq!(single_report.catalog_entries, parallel_report.catalog_entries);
}

#[test]
fn unreadable_destination_fails_files_and_keeps_sources() {
    let dirs = Dirs::new();
    dirs.write_source("a.jpg", b"first");
    dirs.write_source("b.jpg", b"second");

    let mut config = dirs.config(1, 100);
    // destination root is a file, so every move must fail
    let blocked = dirs.dest.path().join("blocked");
    fs::write(&blocked, b"in the way").unwrap();
    config.image_root = blocked.to_string_lossy().into_owned();
    config.video_root = config.image_root.clone();

    let report = run(&config);
    assert_eq!(report.outcome, RunOutcome::CompletedWithFailures);
    assert_eq!(report.stats.failed, 2);
    assert_eq!(report.stats.moved, 0);
    assert_eq!(report.catalog_entries, 0);
    assert!(dirs.source.path().join("a.jpg").exists());
    assert!(dirs.source.path().join("b.jpg").exists());
}

#[test]
fn videos_are_routed_to_their_own_root() {
    let dirs = Dirs::new();
    dirs.write_source("holiday.jpg", b"a still image");
    dirs.write_source("holiday.mp4", b"a moving image");

    let mut config = dirs.config(1, 100);
    config.image_extensions = vec!["jpg".to_string()];
    config.video_extensions = vec!["mp4".to_string()];
    let report = run(&config);

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.stats.moved, 2);

    let video_files: Vec<_> = walkdir::WalkDir::new(dirs.dest.path().join("videos"))
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect();
    assert_eq!(video_files.len(), 1);
    assert!(video_files[0].to_string_lossy().ends_with(".mp4"));
    // the image landed outside the video subtree
    assert_eq!(dirs.dest_file_count(), 2);
}

#[test]
fn cancellation_before_dispatch_aborts_cleanly() {
    let dirs = Dirs::new();
    dirs.write_source("a.jpg", b"payload");

    let cancel = Arc::new(AtomicBool::new(false));
    cancel.store(true, Ordering::SeqCst);
    let report = file_proc::run(&dirs.config(2, 1), cancel).unwrap();

    assert_eq!(report.outcome, RunOutcome::Aborted);
    assert_eq!(report.stats.moved, 0);
    assert!(dirs.source.path().join("a.jpg").exists());
}

#[test]
fn empty_source_directories_are_swept_after_a_run() {
    let dirs = Dirs::new();
    fs::create_dir_all(dirs.source.path().join("2020/rolls")).unwrap();
    dirs.write_source("a.jpg", b"only file");

    let report = run(&dirs.config(1, 10));
    assert_eq!(report.outcome, RunOutcome::Completed);
    assert!(!dirs.source.path().join("2020").exists());
    assert!(dirs.source.path().exists());
}
