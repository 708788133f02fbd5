//! # quality_core
//!
//! `quality_core` exposes the building blocks for scanning folders of images,
//! asking the quality-assessment service for a per-image quality band, and
//! writing the CSV report plus distribution charts. This crate is kept free of
//! CLI concerns so the batch binary and any future service can reuse the same
//! pipeline.
//!
//! ## Examples
//!
//! ```no_run
//! use quality_core::{QualityClient, ScanConfig, scan_roots};
//!
//! # fn run() -> anyhow::Result<()> {
//! let config = ScanConfig {
//!     roots: vec!["/data/batch".into()],
//!     ..ScanConfig::default()
//! };
//! let images = scan_roots(&config)?;
//! let client = QualityClient::new(&config)?;
//! for entry in &images {
//!     println!("{}: {}", entry.path.display(), client.assess(&entry.path));
//! }
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

mod batch;
mod chart;
mod client;
mod config;
mod report;

pub use batch::{process_batch, process_image};
pub use chart::{band_counts, render_distribution, sanitize_label};
pub use client::QualityClient;
pub use config::ScanConfig;
pub use report::{REPORT_HEADERS, ReportWriter, read_report};

/// Quality band assigned by the assessment service.
///
/// The five scored bands follow the service's ascending code order;
/// [`QualityBand::Unscored`] is the sentinel used whenever a per-image
/// determination could not be obtained, for whatever reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QualityBand {
    Enrollment,
    Authentication,
    Search,
    Minimal,
    NoQuality,
    Unscored,
}

impl QualityBand {
    /// Every band in canonical chart order: scored codes ascending, sentinel
    /// last. Charts iterate this so no category is ever omitted.
    pub const ALL: [QualityBand; 6] = [
        QualityBand::Enrollment,
        QualityBand::Authentication,
        QualityBand::Search,
        QualityBand::Minimal,
        QualityBand::NoQuality,
        QualityBand::Unscored,
    ];

    /// Numeric code the service uses for this band.
    pub fn code(self) -> u16 {
        match self {
            QualityBand::Enrollment => 0,
            QualityBand::Authentication => 1,
            QualityBand::Search => 2,
            QualityBand::Minimal => 3,
            QualityBand::NoQuality => 4,
            QualityBand::Unscored => 422,
        }
    }

    /// Label written to the CSV and chart axes. The scored labels are the
    /// service's fixed vocabulary and are not translated.
    pub fn label(self) -> &'static str {
        match self {
            QualityBand::Enrollment => "Enrolamiento",
            QualityBand::Authentication => "Autenticacion",
            QualityBand::Search => "Busqueda",
            QualityBand::Minimal => "Minima",
            QualityBand::NoQuality => "No_Calidad",
            QualityBand::Unscored => "422",
        }
    }

    /// Maps a service code to its band. Unknown codes yield `None`; callers
    /// fall back to [`QualityBand::Unscored`].
    pub fn from_code(code: i64) -> Option<QualityBand> {
        match code {
            0 => Some(QualityBand::Enrollment),
            1 => Some(QualityBand::Authentication),
            2 => Some(QualityBand::Search),
            3 => Some(QualityBand::Minimal),
            4 => Some(QualityBand::NoQuality),
            422 => Some(QualityBand::Unscored),
            _ => None,
        }
    }

    /// Recovers a band from report text: either a label or a numeric code.
    pub fn parse(value: &str) -> Option<QualityBand> {
        let value = value.trim();
        if let Ok(code) = value.parse::<i64>() {
            return QualityBand::from_code(code);
        }
        QualityBand::ALL
            .into_iter()
            .find(|band| band.label() == value)
    }
}

impl fmt::Display for QualityBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An image file found during discovery, with its folder-derived group label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredImage {
    /// Absolute path to the file on disk.
    pub path: PathBuf,
    /// Top-level subfolder label used to partition the per-folder charts.
    pub group: String,
}

/// One finished row of the quality report.
///
/// Created once per discovered file and written exactly once as a CSV row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub group: String,
    pub file_name: String,
    pub path: String,
    pub width: u32,
    pub height: u32,
    pub quality: QualityBand,
}

impl ImageRecord {
    /// Row for an image whose worker never reported back: zero dimensions and
    /// the sentinel band, so the batch still ends with one row per file.
    pub fn fallback(entry: &DiscoveredImage) -> Self {
        Self {
            group: entry.group.clone(),
            file_name: file_name_of(&entry.path),
            path: entry.path.to_string_lossy().into_owned(),
            width: 0,
            height: 0,
            quality: QualityBand::Unscored,
        }
    }
}

pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string())
}

/// Recursively scans every configured root for supported images.
///
/// Roots are canonicalized up front; a missing root or a root that is not a
/// directory fails the run. Entries that cannot be read mid-walk are logged
/// and skipped. A file reachable from more than one configured root is
/// reported once.
///
/// # Errors
///
/// Returns an error when a configured root does not exist or is not a
/// directory.
pub fn scan_roots(config: &ScanConfig) -> Result<Vec<DiscoveredImage>> {
    let mut roots = Vec::with_capacity(config.roots.len());
    for root in &config.roots {
        let canonical = std::fs::canonicalize(root)
            .with_context(|| format!("root folder not found: {}", root.display()))?;
        if !canonical.is_dir() {
            anyhow::bail!("root is not a folder: {}", root.display());
        }
        roots.push(canonical);
    }

    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut images = Vec::new();
    for root in &roots {
        for entry in WalkDir::new(root) {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!("walkdir error: {}", e);
                    continue;
                }
            };
            let path = entry.path();
            if !path.is_file() || !is_supported_image(path, &config.extensions) {
                continue;
            }
            if !seen.insert(path.to_path_buf()) {
                continue;
            }
            images.push(DiscoveredImage {
                group: group_label(path, &roots),
                path: path.to_path_buf(),
            });
        }
    }
    Ok(images)
}

/// Derives the chart group for a file.
///
/// The longest configured root that is a path-prefix of the file wins; the
/// label is the first path segment under that root, or the root's own base
/// name when the file sits directly in the root. When no root matches, the
/// file's immediate parent directory name is used. The result depends only on
/// the path and the root list, never on traversal order.
pub fn group_label(path: &Path, roots: &[PathBuf]) -> String {
    let matched = roots
        .iter()
        .filter(|root| path.starts_with(root))
        .max_by_key(|root| root.as_os_str().len());
    let Some(root) = matched else {
        return parent_dir_name(path);
    };
    let Ok(relative) = path.strip_prefix(root) else {
        return parent_dir_name(path);
    };
    let mut components = relative.components();
    match (components.next(), components.next()) {
        (Some(first), Some(_)) => first.as_os_str().to_string_lossy().into_owned(),
        _ => root
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| root.to_string_lossy().into_owned()),
    }
}

fn parent_dir_name(path: &Path) -> String {
    path.parent()
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Returns true when the file extension is in the configured allow-list.
fn is_supported_image(path: &Path, extensions: &[String]) -> bool {
    match path.extension().and_then(|s| s.to_str()) {
        Some(ext) => extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext)),
        None => false,
    }
}

/// Reads the pixel dimensions of an image from its header, without decoding
/// the full file.
///
/// # Errors
///
/// Returns an error when the file cannot be opened or is not a recognizable
/// image. Callers degrade this to `(0, 0)` rather than dropping the row.
pub fn probe_dimensions(path: &Path) -> Result<(u32, u32)> {
    let (width, height) = image::image_dimensions(path)
        .with_context(|| format!("could not read image header: {}", path.display()))?;
    Ok((width, height))
}
