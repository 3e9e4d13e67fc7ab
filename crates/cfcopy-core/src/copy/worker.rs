use std::sync::Arc;

use log::{debug, info};
use tokio::fs::File;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};

use super::progress::CopyProgress;
use crate::checksum::{etags_match, HashingWriter};
use crate::errors::{CopyError, CopyResult, TransferStage};
use crate::location::ObjectLocation;
use crate::plan::ChunkSpec;
use crate::session::Session;
use crate::store::{ByteSource, ObjectPath, ObjectStore};

/// Whether a chunk had to be uploaded or was already present at the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkDisposition {
    Uploaded,
    Skipped,
}

/// A chunk that reached the destination with a verified hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkResult {
    pub index: usize,
    /// `<container>/<key>-<index>` of the destination part.
    pub destination_path: String,
    pub content_hash: String,
    /// Bytes actually read from the source.
    pub size: u64,
    pub disposition: ChunkDisposition,
}

/// Everything a chunk worker needs, shared by all workers of one job.
pub(super) struct JobContext {
    pub store: Arc<dyn ObjectStore>,
    pub session: Session,
    pub source: ObjectLocation,
    pub dest: ObjectLocation,
    pub progress: Option<CopyProgress>,
}

/// Object key of the destination part holding chunk `index`.
pub fn part_key(dest_key: &str, index: usize) -> String {
    format!("{dest_key}-{index}")
}

/// `<container>/<key>-<index>` of the destination part for chunk `index`.
pub(super) fn part_path(ctx: &JobContext, index: usize) -> String {
    format!("{}/{}", ctx.dest.container, part_key(&ctx.dest.key, index))
}

/// Scoped local storage for one chunk.
///
/// Backed by an anonymous temporary file, so the space is reclaimed as soon as
/// the buffer (or the upload source it was turned into) is dropped.
struct ChunkBuffer {
    file: File,
}

impl ChunkBuffer {
    fn acquire(path: &ObjectPath<'_>) -> CopyResult<Self> {
        let file = tempfile::tempfile()
            .map_err(|e| CopyError::from_io(TransferStage::Download, path.to_string(), &e))?;
        Ok(Self {
            file: File::from_std(file),
        })
    }

    /// Download `spec` into the buffer, hashing exactly the bytes received.
    async fn fill(
        &mut self,
        ctx: &JobContext,
        source: ObjectPath<'_>,
        spec: ChunkSpec,
    ) -> CopyResult<(u64, String)> {
        let io_err = |e: std::io::Error| {
            CopyError::from_io(TransferStage::Download, source.to_string(), &e)
        };

        let mut writer = HashingWriter::new(&mut self.file);
        ctx.store
            .ranged_read(&ctx.session, source, spec.offset, spec.length, &mut writer)
            .await?;
        writer.flush().await.map_err(io_err)?;
        let (_, bytes, hash) = writer.finish();

        if bytes != spec.length {
            return Err(CopyError::download(
                source.to_string(),
                format!(
                    "short read for chunk {}: expected bytes {}..{}, got {}",
                    spec.index,
                    spec.offset,
                    spec.end(),
                    bytes
                ),
                true,
            ));
        }

        self.file.rewind().await.map_err(io_err)?;
        Ok((bytes, hash))
    }

    fn into_source(self) -> ByteSource {
        Box::new(self.file)
    }
}

/// Run one chunk through download, destination probe, upload and verification.
pub(super) async fn transfer_chunk(ctx: &JobContext, spec: ChunkSpec) -> CopyResult<ChunkResult> {
    let source = ctx.source.as_path();
    let part_name = part_key(&ctx.dest.key, spec.index);
    let part = ObjectPath::new(&ctx.dest.region, &ctx.dest.container, &part_name);
    let destination_path = part.to_string();

    debug!(
        "chunk {}: downloading {} bytes at offset {} from {}",
        spec.index, spec.length, spec.offset, source
    );
    let mut buffer = ChunkBuffer::acquire(&source)?;
    let (bytes, download_hash) = buffer.fill(ctx, source, spec).await?;
    if let Some(progress) = &ctx.progress {
        progress.report_downloaded(spec.index, bytes);
    }

    match ctx.store.stat(&ctx.session, part).await {
        Ok(existing) if etags_match(&existing.hash, &download_hash) => {
            info!("chunk {}: {} already present, skipping upload", spec.index, part);
            if let Some(progress) = &ctx.progress {
                progress.report_complete(spec.index, bytes, true);
            }
            return Ok(ChunkResult {
                index: spec.index,
                destination_path,
                content_hash: download_hash,
                size: bytes,
                disposition: ChunkDisposition::Skipped,
            });
        }
        Ok(_) => debug!("chunk {}: {} differs from source, re-uploading", spec.index, part),
        Err(err) if err.is_not_found() => debug!("chunk {}: {} not present", spec.index, part),
        Err(err) => debug!("chunk {}: probe of {} failed ({}), uploading", spec.index, part, err),
    }

    debug!("chunk {}: uploading {} bytes to {}", spec.index, bytes, part);
    let upload_hash = ctx
        .store
        .write(&ctx.session, part, buffer.into_source(), bytes)
        .await?;

    if !etags_match(&upload_hash, &download_hash) {
        return Err(CopyError::Integrity {
            path: destination_path,
            downloaded: download_hash,
            uploaded: upload_hash,
        });
    }

    if let Some(progress) = &ctx.progress {
        progress.report_complete(spec.index, bytes, false);
    }
    Ok(ChunkResult {
        index: spec.index,
        destination_path,
        content_hash: download_hash,
        size: bytes,
        disposition: ChunkDisposition::Uploaded,
    })
}
