//! Service configuration, loaded once at startup.
//!
//! Settings come from three layers, later layers winning:
//! built-in defaults, an optional TOML file, then environment variables
//! (`MAX_FILE_SIZE_MB`, `CHUNK_SIZE_MB`, `USE_GPU`, `EXTRACTION_METHOD`,
//! `NATIVE_TEXT_THRESHOLD`, `OCR_TIMEOUT_SECS`). The resulting `Settings`
//! value is immutable and passed explicitly into each request pipeline.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Default maximum upload size in megabytes.
pub const DEFAULT_MAX_FILE_SIZE_MB: u64 = 500;

/// Default chunk size in megabytes for large-document processing.
pub const DEFAULT_CHUNK_SIZE_MB: u64 = 10;

/// Minimum non-whitespace characters for a page's native text layer to be
/// considered usable without OCR.
pub const DEFAULT_NATIVE_TEXT_THRESHOLD: usize = 50;

/// Default per-page OCR timeout in seconds.
pub const DEFAULT_OCR_TIMEOUT_SECS: u64 = 120;

/// Tuning knobs for the cross-page repetition/copyright filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    /// Fraction of pages a line must appear on to count as repetitive
    /// boilerplate (headers/footers).
    pub repetition_threshold: f64,
    /// Lines at or above this length are never classified as boilerplate,
    /// however frequent. Full paragraphs stay.
    pub boilerplate_max_len: usize,
    /// Upper bound on the fraction of a page's non-blank lines the filter
    /// may remove. Once reached, further candidates on that page are kept.
    pub max_removal_fraction: f64,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            repetition_threshold: 0.5,
            boilerplate_max_len: 200,
            max_removal_fraction: 0.5,
        }
    }
}

/// Process-wide settings. Constructed once at startup, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Maximum accepted upload size in megabytes.
    pub max_file_size_mb: u64,
    /// Target chunk size in megabytes; documents at or below this size are
    /// processed as a single chunk.
    pub chunk_size_mb: u64,
    /// Whether GPU-accelerated OCR was requested. Tesseract runs on CPU, so
    /// this only tightens OCR concurrency and shows up in status reporting.
    pub use_gpu: bool,
    /// OCR engine name, reported by the status endpoint.
    pub extraction_method: String,
    /// Minimum non-whitespace characters for the native text path.
    pub native_text_threshold: usize,
    /// Per-page OCR timeout; an expired page degrades instead of failing
    /// the whole document.
    pub ocr_timeout_secs: u64,
    /// Repetition/copyright filter tuning.
    pub filter: FilterSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_file_size_mb: DEFAULT_MAX_FILE_SIZE_MB,
            chunk_size_mb: DEFAULT_CHUNK_SIZE_MB,
            use_gpu: false,
            extraction_method: "tesseract".to_string(),
            native_text_threshold: DEFAULT_NATIVE_TEXT_THRESHOLD,
            ocr_timeout_secs: DEFAULT_OCR_TIMEOUT_SECS,
            filter: FilterSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from an optional TOML file, then apply environment
    /// variable overrides.
    pub fn load(config_path: Option<&Path>) -> anyhow::Result<Self> {
        let mut settings = match config_path {
            Some(path) => {
                let raw = fs::read_to_string(path)
                    .map_err(|e| anyhow::anyhow!("failed to read {}: {}", path.display(), e))?;
                toml::from_str(&raw)
                    .map_err(|e| anyhow::anyhow!("invalid config {}: {}", path.display(), e))?
            }
            None => Self::default(),
        };
        settings.apply_env();
        Ok(settings)
    }

    fn apply_env(&mut self) {
        if let Some(v) = env_parse("MAX_FILE_SIZE_MB") {
            self.max_file_size_mb = v;
        }
        if let Some(v) = env_parse("CHUNK_SIZE_MB") {
            self.chunk_size_mb = v;
        }
        if let Some(v) = env_bool("USE_GPU") {
            self.use_gpu = v;
        }
        if let Ok(v) = std::env::var("EXTRACTION_METHOD") {
            if !v.is_empty() {
                self.extraction_method = v;
            }
        }
        if let Some(v) = env_parse("NATIVE_TEXT_THRESHOLD") {
            self.native_text_threshold = v;
        }
        if let Some(v) = env_parse("OCR_TIMEOUT_SECS") {
            self.ocr_timeout_secs = v;
        }
    }

    /// Maximum upload size in bytes.
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb * 1024 * 1024
    }

    /// Chunk threshold in bytes.
    pub fn chunk_size_bytes(&self) -> u64 {
        self.chunk_size_mb * 1024 * 1024
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

fn env_bool(key: &str) -> Option<bool> {
    let value = std::env::var(key).ok()?;
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
