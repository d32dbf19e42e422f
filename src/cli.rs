use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)] // requires `derive` feature
#[command(name = "photosort")]
#[command(about = "Deduplicate and file photos by content", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan, deduplicate and relocate files from the input folders
    Process(ProcessArgs),
    /// Print catalog totals and the most recent entries
    CatalogInfo,
    /// Print resolved configuration values
    PrintConfig,
}

#[derive(Debug, Args, Default)]
pub struct ProcessArgs {
    /// Override the configured input folders
    #[arg(long)]
    pub input: Vec<String>,
    /// Force single-threaded processing
    #[arg(long)]
    pub single_thread: bool,
    /// Number of worker threads (0 = one per compute unit)
    #[arg(long)]
    pub workers: Option<usize>,
    /// Files per batch transaction
    #[arg(long)]
    pub batch_size: Option<usize>,
    /// Skip the size+mtime pre-check and always hash
    #[arg(long)]
    pub force_hash: bool,
}
