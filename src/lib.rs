pub mod app_config;
pub mod catalog;
pub mod cli;
pub mod errors;
pub mod file_proc;
pub mod logging;
pub mod model;
pub mod utils;
