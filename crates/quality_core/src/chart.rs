//! Quality-band distribution charts.

use crate::{ImageRecord, QualityBand};
use anyhow::{Context, Result};
use plotters::coord::ranged1d::SegmentValue;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::{FontDesc, FontFamily, FontStyle, register_font};
use std::path::Path;
use std::sync::OnceLock;

// Embedded face so rendering does not depend on system fonts.
const FONT_BYTES: &[u8] = include_bytes!("../../../assets/DejaVuSans.ttf");
const CHART_SIZE: (u32, u32) = (1280, 640);
const BAR_FILL: RGBColor = RGBColor(135, 206, 235);

fn ensure_font() -> Result<()> {
    static REGISTERED: OnceLock<bool> = OnceLock::new();
    let ok = *REGISTERED.get_or_init(|| {
        register_font("sans-serif", FontStyle::Normal, FONT_BYTES).is_ok()
            && register_font("sans-serif", FontStyle::Bold, FONT_BYTES).is_ok()
    });
    if ok {
        Ok(())
    } else {
        anyhow::bail!("embedded chart font is invalid")
    }
}

/// Counts records per band in canonical order.
///
/// Bands with no records stay at zero so a chart never omits a category.
pub fn band_counts<'a, I>(records: I) -> Vec<(QualityBand, usize)>
where
    I: IntoIterator<Item = &'a ImageRecord>,
{
    let mut counts: Vec<(QualityBand, usize)> =
        QualityBand::ALL.into_iter().map(|band| (band, 0)).collect();
    for record in records {
        if let Some(slot) = counts.iter_mut().find(|(band, _)| *band == record.quality) {
            slot.1 += 1;
        }
    }
    counts
}

/// Turns a group label into a file-name-safe stem: trimmed, spaces to `_`,
/// anything outside `[A-Za-z0-9_.-]` to `_`.
pub fn sanitize_label(label: &str) -> String {
    label
        .trim()
        .chars()
        .map(|ch| match ch {
            ' ' => '_',
            ch if ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.') => ch,
            _ => '_',
        })
        .collect()
}

/// Renders a labeled bar chart of per-band counts to a PNG file.
///
/// Bars follow the canonical band order; every non-zero bar gets a bold count
/// label above it.
///
/// # Errors
///
/// Returns an error when the chart cannot be laid out or the file cannot be
/// written.
pub fn render_distribution(
    counts: &[(QualityBand, usize)],
    title: &str,
    out_path: &Path,
) -> Result<()> {
    ensure_font()?;
    let max = counts.iter().map(|(_, count)| *count).max().unwrap_or(0);
    let y_max = (max + max / 5 + 1) as u32;
    let bands = counts.len() as u32;

    let root = BitMapBackend::new(out_path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).context("chart background")?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 28))
        .margin(16)
        .x_label_area_size(48)
        .y_label_area_size(56)
        .build_cartesian_2d((0u32..bands).into_segmented(), 0u32..y_max)
        .context("chart layout")?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(counts.len())
        .x_label_formatter(&|position| match position {
            SegmentValue::CenterOf(index) | SegmentValue::Exact(index) => counts
                .get(*index as usize)
                .map(|(band, _)| band.label().to_string())
                .unwrap_or_default(),
            SegmentValue::Last => String::new(),
        })
        .x_desc("Quality band")
        .y_desc("Images")
        .draw()
        .context("chart axes")?;

    chart
        .draw_series(
            Histogram::vertical(&chart)
                .style(BAR_FILL.filled())
                .margin(12)
                .data(
                    counts
                        .iter()
                        .enumerate()
                        .map(|(index, (_, count))| (index as u32, *count as u32)),
                ),
        )
        .context("chart bars")?;

    let value_style = TextStyle::from(FontDesc::new(FontFamily::SansSerif, 18.0, FontStyle::Bold))
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Bottom));
    chart
        .draw_series(
            counts
                .iter()
                .enumerate()
                .filter(|(_, (_, count))| *count > 0)
                .map(|(index, (_, count))| {
                    Text::new(
                        count.to_string(),
                        (SegmentValue::CenterOf(index as u32), *count as u32),
                        value_style.clone(),
                    )
                }),
        )
        .context("chart value labels")?;

    root.present().context("writing chart file")?;
    Ok(())
}
