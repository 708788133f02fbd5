//! Batch configuration and its JSON file loading.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration for one batch run, built once and passed to every component.
///
/// Defaults mirror the reference deployment; a JSON file can override any
/// subset of fields via [`ScanConfig::load`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Root folders scanned recursively for images.
    pub roots: Vec<PathBuf>,
    /// Directory receiving the CSV report and the charts.
    pub output_dir: PathBuf,
    /// Quality-assessment service endpoint.
    pub endpoint: String,
    /// Upper bound on concurrently processed images.
    pub workers: usize,
    /// Extension allow-list, compared case-insensitively.
    pub extensions: Vec<String>,
    /// Timeout for a single assessment call, in seconds.
    pub timeout_secs: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            output_dir: PathBuf::from("quality_report"),
            endpoint: "http://localhost:4445/L9h/v3/assess".to_string(),
            workers: 6,
            extensions: ["jpg", "jpeg", "png", "bmp", "gif", "tiff", "webp"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            timeout_secs: 30,
        }
    }
}

impl ScanConfig {
    /// Loads a configuration file; absent fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read or parsed. Unlike an
    /// optional settings store, a config file named explicitly is expected to
    /// exist.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("could not read config file {}", path.display()))?;
        let config = serde_json::from_str(&contents)
            .with_context(|| format!("config file {} is not valid JSON", path.display()))?;
        Ok(config)
    }
}
