use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub input_folders: Vec<String>,
    /// Destination root for image files.
    pub image_root: String,
    /// Destination root for video files.
    pub video_root: String,
    #[serde(default = "default_catalog_path")]
    pub catalog_path: String,
    /// 0 means one worker per available compute unit.
    #[serde(default)]
    pub worker_count: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_min_file_size")]
    pub min_file_size: u64,
    /// Lowercase extensions classified as images. When both extension
    /// lists are empty the scan accepts everything as an image.
    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,
    /// Lowercase extensions classified as videos and routed to `video_root`.
    #[serde(default = "default_video_extensions")]
    pub video_extensions: Vec<String>,
    #[serde(default)]
    pub skip_dirs: Vec<String>,
    #[serde(default)]
    pub single_thread: bool,
    /// Disable the size+mtime pre-check and always hash.
    #[serde(default)]
    pub force_hash: bool,
}

fn default_catalog_path() -> String {
    "photosort_catalog".to_string()
}

fn default_batch_size() -> usize {
    100
}

fn default_min_file_size() -> u64 {
    1024
}

fn default_image_extensions() -> Vec<String> {
    ["jpg", "jpeg", "png", "gif", "bmp", "heic", "tif", "tiff", "webp"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_video_extensions() -> Vec<String> {
    ["mp4", "mov", "avi", "mkv", "m4v", "wmv"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl AppConfig {
    pub fn load() -> Result<AppConfig, ConfigError> {
        let builder = Config::builder()
            // Configuration values from 'Photosort.toml', if present
            .add_source(ConfigFile::with_name("Photosort").required(false))
            .add_source(Environment::with_prefix("PHOTOSORT").separator("__"))
            .build()?;

        builder.try_deserialize::<AppConfig>()
    }

    /// True when a scanned file's lowercase extension belongs to either
    /// class list. Empty lists accept every file.
    pub fn accepts_extension(&self, extension: Option<&str>) -> bool {
        if self.image_extensions.is_empty() && self.video_extensions.is_empty() {
            return true;
        }
        match extension {
            Some(ext) => {
                let ext = ext.to_lowercase();
                self.image_extensions.iter().any(|e| e == &ext)
                    || self.video_extensions.iter().any(|e| e == &ext)
            }
            None => false,
        }
    }

    pub fn effective_workers(&self) -> usize {
        if self.single_thread {
            return 1;
        }
        if self.worker_count > 0 {
            return self.worker_count;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
    }
}
