use std::time::Duration;

use cfcopy_core::{
    copy_object, CopyError, CopyOptions, CopyProgress, CopyReport, ObjectLocation, ProgressEvent,
};
use eyre::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::warn;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::cli::CopyArgs;
use crate::context::AppContext;

const RETRY_BACKOFF: Duration = Duration::from_secs(2);

fn spawn_progress_monitor(enabled: bool) -> (Option<CopyProgress>, Option<JoinHandle<()>>) {
    if !enabled {
        return (None, None);
    }

    let (tx, mut rx) = mpsc::unbounded_channel::<ProgressEvent>();
    let progress = CopyProgress::new(tx);
    let join = tokio::spawn(async move {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner} [{elapsed_precise}] {bar:40} {bytes}/{total_bytes} ({bytes_per_sec}) {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        pb.enable_steady_tick(Duration::from_millis(200));

        let mut chunks = 0usize;
        let mut done = 0usize;
        let mut skipped = 0usize;
        while let Some(event) = rx.recv().await {
            match event {
                ProgressEvent::Planned {
                    chunks: planned,
                    total_bytes,
                } => {
                    chunks = planned;
                    pb.set_length(total_bytes);
                }
                ProgressEvent::ChunkDownloaded { .. } => {}
                ProgressEvent::ChunkComplete {
                    bytes,
                    skipped: was_skipped,
                    ..
                } => {
                    done += 1;
                    if was_skipped {
                        skipped += 1;
                    }
                    pb.inc(bytes);
                }
            }
            pb.set_message(format!("{done}/{chunks} chunks, {skipped} already present"));
        }
        pb.finish_and_clear();
    });
    (Some(progress), Some(join))
}

pub async fn run_copy(ctx: &AppContext, args: &CopyArgs) -> Result<()> {
    let source = ObjectLocation::parse(&args.source)?;
    let dest = ObjectLocation::parse(&args.destination)?;
    let config = ctx.copy_config(args.chunk_size, args.concurrency);
    let store = ctx.store()?;

    println!(
        "cfcopy v{}: copying {} -> {}",
        env!("CARGO_PKG_VERSION"),
        source,
        dest
    );

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("interrupt received; waiting for in-flight chunks to finish");
            interrupt.cancel();
        }
    });

    let attempts = u32::from(args.retries) + 1;
    let mut attempt = 1u32;
    let report = loop {
        let session = store.authorize().await?;
        let (progress, monitor) = spawn_progress_monitor(args.progress);
        let mut options = CopyOptions::from_config(&config);
        options.progress = progress;
        options.cancel = Some(cancel.clone());

        let outcome = copy_object(
            store.clone(),
            &session,
            source.as_path(),
            dest.as_path(),
            options,
        )
        .await;
        if let Some(handle) = monitor {
            let _ = handle.await;
        }

        match outcome {
            Ok(report) => break report,
            Err(err) if should_retry(&err, attempt, attempts) => {
                warn!("attempt {attempt}/{attempts} failed: {err}; retrying");
                eprintln!("[warn] {err}; retrying ({attempt}/{attempts})");
                tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                attempt += 1;
            }
            Err(err) => {
                return Err(err).wrap_err_with(|| format!("copy of {source} to {dest} failed"));
            }
        }
    };

    print_summary(&report);
    Ok(())
}

fn should_retry(err: &CopyError, attempt: u32, attempts: u32) -> bool {
    attempt < attempts && err.should_retry()
}

fn print_summary(report: &CopyReport) {
    let secs = report.duration.as_secs_f64().max(1e-6);
    let mib = report.bytes_uploaded as f64 / (1024.0 * 1024.0);
    println!(
        "Completed: {} chunk(s), {} uploaded, {} already present \u{2022} {:.2} MiB uploaded in {:.2?} ({:.2} MiB/s)",
        report.chunks,
        report.uploaded_chunks,
        report.skipped_chunks,
        mib,
        report.duration,
        mib / secs,
    );
}
