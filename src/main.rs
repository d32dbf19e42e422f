use clap::Parser;
use colored::*;
use dotenv::dotenv;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

use photosort::app_config::AppConfig;
use photosort::catalog::CatalogStore;
use photosort::cli::{Cli, Commands, ProcessArgs};
use photosort::file_proc::{self, RunOutcome};
use photosort::{logging, utils};

fn main() {
    dotenv().ok();

    let _guard = logging::init_logger();

    utils::hide_cursor();

    let args = Cli::parse();

    let exit_code = match args.command {
        Some(Commands::Process(process_args)) => run_process(process_args),
        Some(Commands::CatalogInfo) => run_catalog_info(),
        Some(Commands::PrintConfig) => run_print_config(),
        None => run_process(ProcessArgs::default()),
    };

    utils::show_cursor();

    std::process::exit(exit_code);
}

fn load_config(args: &ProcessArgs) -> Result<AppConfig, String> {
    let mut config =
        AppConfig::load().map_err(|err| format!("Error loading configuration: {}", err))?;

    if !args.input.is_empty() {
        config.input_folders = args.input.clone();
    }
    if args.single_thread {
        config.single_thread = true;
    }
    if let Some(workers) = args.workers {
        config.worker_count = workers;
    }
    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }
    if args.force_hash {
        config.force_hash = true;
    }

    Ok(config)
}

fn run_process(args: ProcessArgs) -> i32 {
    let config = match load_config(&args) {
        Ok(config) => config,
        Err(err) => {
            error!("{}", err);
            return 1;
        }
    };

    let cancel = Arc::new(AtomicBool::new(false));
    let cancel_handler = Arc::clone(&cancel);
    if let Err(err) = ctrlc::set_handler(move || {
        info!("Cancellation requested, draining in-flight batches...");
        cancel_handler.store(true, Ordering::SeqCst);
    }) {
        warn!("Could not install interrupt handler: {}", err);
    }

    match file_proc::run(&config, cancel) {
        Ok(report) => {
            report.stats.print();
            if let Err(err) = report.stats.write_csv("stats.csv") {
                warn!("Could not append stats.csv: {}", err);
            }
            if let Some(fatal) = &report.first_fatal {
                error!("First fatal error: {}", fatal);
            }
            match report.outcome {
                RunOutcome::Completed => {
                    println!("{}", "Run completed".green());
                    0
                }
                RunOutcome::CompletedWithFailures => {
                    println!("{}", "Run completed with failures".yellow());
                    1
                }
                RunOutcome::Aborted => {
                    println!("{}", "Run aborted".red());
                    2
                }
            }
        }
        Err(err) => {
            error!("Error processing files: {}", err);
            1
        }
    }
}

fn run_catalog_info() -> i32 {
    let config = match load_config(&ProcessArgs::default()) {
        Ok(config) => config,
        Err(err) => {
            error!("{}", err);
            return 1;
        }
    };

    let catalog = match CatalogStore::open(Path::new(&config.catalog_path)) {
        Ok(catalog) => catalog,
        Err(err) => {
            error!("{}", err);
            return 1;
        }
    };

    match catalog.stats().and_then(|stats| {
        let recent = catalog.recent_entries(10)?;
        Ok((stats, recent))
    }) {
        Ok((stats, recent)) => {
            println!("Catalog: {}", config.catalog_path);
            println!("  entries         {}", stats.entry_count);
            println!("  total bytes     {}", stats.total_bytes);
            println!("  duplicate hits  {}", stats.duplicate_hits);
            if !recent.is_empty() {
                println!("Most recent entries:");
                for entry in recent {
                    println!(
                        "  {}  {} bytes  {}",
                        &photosort::model::digest_hex(&entry.digest)[..16],
                        entry.size,
                        entry.dest_path
                    );
                }
            }
            0
        }
        Err(err) => {
            error!("Error reading catalog: {}", err);
            1
        }
    }
}

fn run_print_config() -> i32 {
    match load_config(&ProcessArgs::default()) {
        Ok(config) => {
            println!("{:#?}", config);
            0
        }
        Err(err) => {
            error!("{}", err);
            1
        }
    }
}
