//! Entry point for the `imgqa` batch scanner.

use anyhow::{Context, Result};
use clap::Parser;
use quality_core::{
    ImageRecord, QualityClient, ReportWriter, ScanConfig, band_counts, process_batch,
    process_image, read_report, render_distribution, sanitize_label, scan_roots,
};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

const REPORT_FILE_NAME: &str = "image_quality.csv";

#[derive(Parser)]
#[command(
    name = "imgqa",
    about = "Batch image-quality audit against a local assessment service"
)]
struct Args {
    /// Root folders to scan; overrides the configured list when non-empty.
    roots: Vec<PathBuf>,

    /// Optional JSON configuration file; absent fields keep their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory receiving the CSV report and the charts.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Quality-assessment service endpoint.
    #[arg(long)]
    endpoint: Option<String>,

    /// Upper bound on concurrently processed images.
    #[arg(long)]
    workers: Option<usize>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();
    run(args)
}

fn resolve_config(args: &Args) -> Result<ScanConfig> {
    let mut config = match &args.config {
        Some(path) => ScanConfig::load(path)?,
        None => ScanConfig::default(),
    };
    if !args.roots.is_empty() {
        config.roots = args.roots.clone();
    }
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(endpoint) = &args.endpoint {
        config.endpoint = endpoint.clone();
    }
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if config.roots.is_empty() {
        anyhow::bail!("no root folders configured; pass them as arguments or via --config");
    }
    Ok(config)
}

fn run(args: Args) -> Result<()> {
    let config = resolve_config(&args)?;
    fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "could not create output directory {}",
            config.output_dir.display()
        )
    })?;

    let images = scan_roots(&config)?;
    info!("{} images discovered", images.len());
    if images.is_empty() {
        warn!("no images found under the configured roots");
    }

    let csv_path = config.output_dir.join(REPORT_FILE_NAME);
    let client = QualityClient::new(&config)?;
    let mut report = ReportWriter::create(&csv_path)?;
    process_batch(
        config.workers,
        &images,
        |entry| process_image(entry, &client),
        |record, done, total| {
            report.write(record)?;
            info!(
                "Processed {done}/{total} ({:.2}%)",
                done as f64 / total as f64 * 100.0
            );
            Ok(())
        },
    )?;
    report.finish()?;
    info!("CSV report written to {}", csv_path.display());

    drop(client);
    info!("Batch complete, connections released");

    let rows = read_report(&csv_path)?;
    render_charts(&config, &rows)
}

fn render_charts(config: &ScanConfig, rows: &[ImageRecord]) -> Result<()> {
    let global = band_counts(rows);
    info!("Quality summary:");
    for (band, count) in &global {
        info!("  {band}: {count}");
    }

    let global_path = config.output_dir.join("chart_global.png");
    render_distribution(&global, "Global quality distribution", &global_path)?;
    info!("Chart saved: {}", global_path.display());

    let mut groups: BTreeMap<&str, Vec<&ImageRecord>> = BTreeMap::new();
    for record in rows {
        groups.entry(record.group.as_str()).or_default().push(record);
    }
    for (label, group_rows) in groups {
        let counts = band_counts(group_rows.iter().copied());
        let path = config
            .output_dir
            .join(format!("chart_{}.png", sanitize_label(label)));
        render_distribution(&counts, &format!("Quality distribution - {label}"), &path)?;
        info!("Chart saved: {}", path.display());
    }
    Ok(())
}
