//! Chunked, bounded-concurrency object copy.
//!
//! The source object is planned into fixed-size ranges; each range is
//! downloaded, hashed, probed at the destination and uploaded when missing by
//! its own worker task. At most `concurrency` workers run at once. Once every
//! chunk has verified, a manifest stitching the parts together is written to
//! the destination key.

use std::sync::Arc;
use std::time::Instant;

use log::{debug, info, warn};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::errors::{CopyError, CopyResult};
use crate::plan::plan_chunks;
use crate::session::Session;
use crate::store::{ObjectPath, ObjectStore};
use crate::CopyConfig;

mod aggregator;
mod manifest;
mod progress;
mod summary;
mod worker;

use aggregator::ResultAggregator;
use worker::{part_path, transfer_chunk, JobContext};

pub use manifest::{assemble_manifest, ManifestItem};
pub use progress::{CopyProgress, ProgressEvent};
pub use summary::CopyReport;
pub use worker::{part_key, ChunkDisposition, ChunkResult};

/// Options for a single [`copy_object`] call.
#[derive(Clone)]
pub struct CopyOptions {
    pub chunk_size: u64,
    pub concurrency: usize,
    pub progress: Option<CopyProgress>,
    /// Stops dispatching new chunks once cancelled; in-flight chunks finish.
    pub cancel: Option<CancellationToken>,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self::from_config(&CopyConfig::default())
    }
}

impl CopyOptions {
    pub fn from_config(config: &CopyConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            concurrency: config.concurrency,
            progress: None,
            cancel: None,
        }
    }
}

/// Copy `source` to `dest` as a segmented object.
///
/// Parts are written as `<dest key>-<index>` next to the destination key, then
/// a manifest is written at the destination key itself. Parts that already
/// exist with a matching hash are not uploaded again, so re-running a failed
/// copy resumes where it left off. Parts uploaded by a failed run are left in
/// place.
pub async fn copy_object(
    store: Arc<dyn ObjectStore>,
    session: &Session,
    source: ObjectPath<'_>,
    dest: ObjectPath<'_>,
    options: CopyOptions,
) -> CopyResult<CopyReport> {
    if options.concurrency == 0 {
        return Err(CopyError::InvalidOptions(
            "concurrency must be at least 1".into(),
        ));
    }
    let start = Instant::now();

    let stat = store.stat(session, source).await?;
    let specs = plan_chunks(stat.size, options.chunk_size)?;
    let total = specs.len();
    info!(
        "copying {} ({} bytes) to {} in {} chunk(s) of up to {} bytes, {} at a time",
        source, stat.size, dest, total, options.chunk_size, options.concurrency
    );
    if let Some(progress) = &options.progress {
        progress.report_planned(total, stat.size);
    }

    let ctx = Arc::new(JobContext {
        store: Arc::clone(&store),
        session: session.clone(),
        source: source.into(),
        dest: dest.into(),
        progress: options.progress.clone(),
    });
    let cancel = options.cancel.clone().unwrap_or_default();
    let limiter = Arc::new(Semaphore::new(options.concurrency));
    let mut tasks: JoinSet<CopyResult<ChunkResult>> = JoinSet::new();
    let mut aggregator = ResultAggregator::new(total);
    let mut dispatched = 0usize;
    let mut cancelled = false;

    'dispatch: for spec in specs {
        // Wait for a free slot, draining finished workers while we wait so a
        // failure stops the dispatch as early as possible.
        let permit = loop {
            if aggregator.has_failed() {
                debug!("not dispatching chunk {} after failure", spec.index);
                break 'dispatch;
            }
            if cancel.is_cancelled() {
                cancelled = true;
                break 'dispatch;
            }
            tokio::select! {
                biased;
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    aggregator.record(joined);
                }
                _ = cancel.cancelled() => {}
                permit = Arc::clone(&limiter).acquire_owned() => match permit {
                    Ok(permit) => break permit,
                    Err(_) => break 'dispatch,
                },
            }
        };

        let destination_path = part_path(&ctx, spec.index);
        let worker_ctx = Arc::clone(&ctx);
        let handle = tasks.spawn(async move {
            let _permit = permit;
            transfer_chunk(&worker_ctx, spec).await
        });
        aggregator.track(handle.id(), spec.index, destination_path);
        dispatched += 1;
    }

    // Exactly one outcome per dispatched worker is drained before deciding.
    while let Some(joined) = tasks.join_next().await {
        aggregator.record(joined);
    }
    debug_assert_eq!(aggregator.observed(), dispatched);

    let results = aggregator.finish()?;
    if cancelled {
        warn!("copy of {source} cancelled after {dispatched} of {total} chunk(s)");
        return Err(CopyError::Cancelled { dispatched, total });
    }

    let manifest = assemble_manifest(&results);
    store.write_manifest(session, dest, &manifest).await?;

    let mut report = CopyReport {
        chunks: total,
        total_bytes: stat.size,
        duration: start.elapsed(),
        ..Default::default()
    };
    for result in &results {
        match result.disposition {
            ChunkDisposition::Uploaded => {
                report.uploaded_chunks += 1;
                report.bytes_uploaded += result.size;
            }
            ChunkDisposition::Skipped => report.skipped_chunks += 1,
        }
    }
    report.manifest = manifest;
    info!(
        "copied {} to {}: {} chunk(s) uploaded, {} already present, {:?}",
        source, dest, report.uploaded_chunks, report.skipped_chunks, report.duration
    );
    Ok(report)
}
