//! Fan-out/fan-in batch orchestration over a bounded worker pool.

use crate::{DiscoveredImage, ImageRecord, QualityClient, probe_dimensions};
use anyhow::{Context, Result};
use rayon::prelude::*;
use std::sync::mpsc;
use std::thread;

/// Runs the dimension probe and the quality assessment for one image.
///
/// Each stage's failure is converted into data at the point it occurs, so a
/// worker always produces a row: an undecodable file keeps zero dimensions and
/// an unassessable one keeps the sentinel band.
pub fn process_image(entry: &DiscoveredImage, client: &QualityClient) -> ImageRecord {
    let (width, height) = match probe_dimensions(&entry.path) {
        Ok(dimensions) => dimensions,
        Err(err) => {
            tracing::debug!("dimension probe failed for {}: {err:#}", entry.path.display());
            (0, 0)
        }
    };
    let quality = client.assess(&entry.path);
    ImageRecord {
        group: entry.group.clone(),
        file_name: crate::file_name_of(&entry.path),
        path: entry.path.to_string_lossy().into_owned(),
        width,
        height,
        quality,
    }
}

/// Processes every discovered image through `worker`, at most `workers` at a
/// time, delivering records to `sink` in completion order.
///
/// All tasks are submitted up front; the sink receives `(record, done, total)`
/// as each one finishes. After the pool drains, any entry that never produced
/// a record is synthesized as a fallback row, so the batch always ends with
/// exactly one row per discovered image. There are no retries and no
/// cancellation. The collected records are also returned, in delivery order.
///
/// # Errors
///
/// Returns an error when the worker pool cannot be built or the sink fails;
/// a sink failure (a broken report file) aborts the run.
pub fn process_batch<W, S>(
    workers: usize,
    images: &[DiscoveredImage],
    worker: W,
    mut sink: S,
) -> Result<Vec<ImageRecord>>
where
    W: Fn(&DiscoveredImage) -> ImageRecord + Sync,
    S: FnMut(&ImageRecord, usize, usize) -> Result<()>,
{
    let total = images.len();
    let mut rows = Vec::with_capacity(total);
    if total == 0 {
        return Ok(rows);
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .build()
        .context("building worker pool")?;
    let (tx, rx) = mpsc::channel::<(usize, ImageRecord)>();
    let mut seen = vec![false; total];
    let mut done = 0usize;
    let worker = &worker;

    thread::scope(|scope| -> Result<()> {
        let producer = scope.spawn(move || {
            pool.install(|| {
                images
                    .par_iter()
                    .enumerate()
                    .for_each_with(tx, |tx, (index, entry)| {
                        let _ = tx.send((index, worker(entry)));
                    });
            });
        });

        for (index, record) in rx {
            seen[index] = true;
            done += 1;
            sink(&record, done, total)?;
            rows.push(record);
        }

        if producer.join().is_err() {
            tracing::warn!("worker pool terminated abnormally; missing rows degrade to fallback");
        }
        Ok(())
    })?;

    for (index, reported) in seen.iter().enumerate() {
        if !*reported {
            let record = ImageRecord::fallback(&images[index]);
            done += 1;
            sink(&record, done, total)?;
            rows.push(record);
        }
    }

    Ok(rows)
}
