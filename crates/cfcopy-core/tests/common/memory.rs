//! In-memory object store with call recording and fault injection.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use cfcopy_core::checksum::{md5_hex, ContentHasher};
use cfcopy_core::copy::ManifestItem;
use cfcopy_core::errors::TransferStage;
use cfcopy_core::store::{ByteSink, ByteSource, ObjectPath, ObjectStat, ObjectStore, ReadOutcome};
use cfcopy_core::{CopyError, CopyResult, Session};

/// Uploads larger than this keep only their size and etag.
const RETAIN_LIMIT: u64 = 16 * 1024 * 1024;
const IO_PIECE: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Stat(String),
    Read { path: String, offset: u64, length: u64 },
    Write(String),
    WriteManifest(String),
}

enum Content {
    Bytes(Vec<u8>),
    /// Synthetic object whose byte `i` is `pattern_byte(i)`.
    Pattern(u64),
    Digest(u64),
}

enum Range {
    Bytes(Vec<u8>),
    Pattern { start: u64, end: u64 },
}

struct StoredObject {
    content: Content,
    etag: String,
}

impl StoredObject {
    fn size(&self) -> u64 {
        match &self.content {
            Content::Bytes(data) => data.len() as u64,
            Content::Pattern(size) | Content::Digest(size) => *size,
        }
    }
}

fn pattern_byte(i: u64) -> u8 {
    (i % 251) as u8
}

/// Bytes `[offset, offset + len)` of a pattern object.
pub fn pattern_bytes(offset: u64, len: u64) -> Vec<u8> {
    (offset..offset + len).map(pattern_byte).collect()
}

fn object_key(path: &ObjectPath<'_>) -> String {
    format!("{}:{}/{}", path.region, path.container, path.key)
}

#[derive(Default)]
pub struct MemoryStore {
    regions: Vec<String>,
    objects: Mutex<HashMap<String, StoredObject>>,
    calls: Mutex<Vec<Call>>,
    manifests: Mutex<Vec<(String, Vec<ManifestItem>)>>,
    corrupt_uploads: Mutex<HashSet<String>>,
    failing_reads: Mutex<HashSet<u64>>,
    manifest_rejection: Mutex<Option<String>>,
    read_delay: Duration,
    write_delay: Duration,
    active_reads: AtomicUsize,
    max_active_reads: AtomicUsize,
    /// Reads, stats and writes currently in progress.
    active_ops: AtomicUsize,
    max_active_ops: AtomicUsize,
}

/// Counts one in-progress store call until dropped.
struct OpGuard<'a> {
    active: &'a AtomicUsize,
}

impl<'a> OpGuard<'a> {
    fn enter(active: &'a AtomicUsize, peak: &AtomicUsize) -> Self {
        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        Self { active }
    }
}

impl Drop for OpGuard<'_> {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            regions: vec![super::SRC_REGION.to_string(), super::DST_REGION.to_string()],
            ..Default::default()
        }
    }

    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = delay;
        self
    }

    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = delay;
        self
    }

    pub fn put_object(&self, region: &str, container: &str, key: &str, data: Vec<u8>) {
        let etag = md5_hex(&data);
        self.objects.lock().insert(
            object_key(&ObjectPath::new(region, container, key)),
            StoredObject {
                content: Content::Bytes(data),
                etag,
            },
        );
    }

    pub fn put_pattern(&self, region: &str, container: &str, key: &str, size: u64) {
        self.objects.lock().insert(
            object_key(&ObjectPath::new(region, container, key)),
            StoredObject {
                content: Content::Pattern(size),
                etag: format!("pattern-{size}"),
            },
        );
    }

    pub fn object(&self, region: &str, container: &str, key: &str) -> Option<Vec<u8>> {
        let objects = self.objects.lock();
        match &objects
            .get(&object_key(&ObjectPath::new(region, container, key)))?
            .content
        {
            Content::Bytes(data) => Some(data.clone()),
            Content::Pattern(size) => Some(pattern_bytes(0, *size)),
            Content::Digest(_) => None,
        }
    }

    /// Make the upload of `path` (`container/key`) report a wrong etag.
    pub fn corrupt_upload_of(&self, path: &str) {
        self.corrupt_uploads.lock().insert(path.to_string());
    }

    /// Fail ranged reads starting at `offset`.
    pub fn fail_read_at(&self, offset: u64) {
        self.failing_reads.lock().insert(offset);
    }

    pub fn reject_manifests(&self, message: &str) {
        *self.manifest_rejection.lock() = Some(message.to_string());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    pub fn writes(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Write(path) => Some(path),
                _ => None,
            })
            .collect()
    }

    pub fn reads(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Read { .. }))
            .count()
    }

    pub fn manifests(&self) -> Vec<(String, Vec<ManifestItem>)> {
        self.manifests.lock().clone()
    }

    pub fn max_active_reads(&self) -> usize {
        self.max_active_reads.load(Ordering::SeqCst)
    }

    /// Peak number of reads, stats and writes that overlapped. Each chunk
    /// worker issues its calls one at a time, so this bounds active workers
    /// from below.
    pub fn max_active_ops(&self) -> usize {
        self.max_active_ops.load(Ordering::SeqCst)
    }

    fn op(&self) -> OpGuard<'_> {
        OpGuard::enter(&self.active_ops, &self.max_active_ops)
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }

    fn check_region(&self, session: &Session, path: &ObjectPath<'_>) -> CopyResult<()> {
        session.endpoint(path.region).map(|_| ())
    }

    async fn read_range(
        &self,
        path: ObjectPath<'_>,
        offset: u64,
        length: u64,
        sink: ByteSink<'_>,
    ) -> CopyResult<ReadOutcome> {
        if !self.read_delay.is_zero() {
            tokio::time::sleep(self.read_delay).await;
        }
        if self.failing_reads.lock().contains(&offset) {
            return Err(CopyError::download(
                path.to_string(),
                "injected read failure",
                true,
            ));
        }

        // Copy what is needed out of the map so no guard is held across awaits.
        let (range, whole_etag) = {
            let objects = self.objects.lock();
            let obj = objects
                .get(&object_key(&path))
                .ok_or_else(|| CopyError::NotFound {
                    path: path.to_string(),
                })?;
            let size = obj.size();
            let end = if length == 0 {
                size
            } else {
                (offset + length).min(size)
            };
            let start = offset.min(end);
            let range = match &obj.content {
                Content::Bytes(bytes) => Range::Bytes(bytes[start as usize..end as usize].to_vec()),
                Content::Pattern(_) => Range::Pattern { start, end },
                Content::Digest(_) => {
                    return Err(CopyError::download(
                        path.to_string(),
                        "content not retained",
                        false,
                    ))
                }
            };
            let whole = offset == 0 && length == 0;
            (range, whole.then(|| obj.etag.clone()))
        };

        let io_err =
            |e: std::io::Error| CopyError::from_io(TransferStage::Download, path.to_string(), &e);
        let mut hasher = ContentHasher::new();
        match range {
            Range::Bytes(bytes) => {
                sink.write_all(&bytes).await.map_err(io_err)?;
                hasher.update(&bytes);
            }
            Range::Pattern { start, end } => {
                let mut pos = start;
                while pos < end {
                    let piece = pattern_bytes(pos, (end - pos).min(IO_PIECE as u64));
                    sink.write_all(&piece).await.map_err(io_err)?;
                    hasher.update(&piece);
                    pos += piece.len() as u64;
                }
            }
        }
        sink.flush().await.map_err(io_err)?;

        let written = hasher.bytes();
        let hash = whole_etag.unwrap_or_else(|| hasher.finalize_hex());
        Ok(ReadOutcome {
            bytes: written,
            hash,
        })
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn authorize(&self) -> CopyResult<Session> {
        let endpoints = self
            .regions
            .iter()
            .map(|r| (r.clone(), format!("memory://{}", r.to_lowercase())))
            .collect();
        Ok(Session::new("memory-token", "memory-tenant", endpoints))
    }

    async fn stat(&self, session: &Session, path: ObjectPath<'_>) -> CopyResult<ObjectStat> {
        self.record(Call::Stat(path.to_string()));
        self.check_region(session, &path)?;
        let _op = self.op();
        let objects = self.objects.lock();
        let obj = objects
            .get(&object_key(&path))
            .ok_or_else(|| CopyError::NotFound {
                path: path.to_string(),
            })?;
        Ok(ObjectStat {
            size: obj.size(),
            hash: obj.etag.clone(),
        })
    }

    async fn ranged_read(
        &self,
        session: &Session,
        path: ObjectPath<'_>,
        offset: u64,
        length: u64,
        sink: ByteSink<'_>,
    ) -> CopyResult<ReadOutcome> {
        self.record(Call::Read {
            path: path.to_string(),
            offset,
            length,
        });
        self.check_region(session, &path)?;

        let _op = self.op();
        let _read = OpGuard::enter(&self.active_reads, &self.max_active_reads);
        self.read_range(path, offset, length, sink).await
    }

    async fn write(
        &self,
        session: &Session,
        path: ObjectPath<'_>,
        mut source: ByteSource,
        length: u64,
    ) -> CopyResult<String> {
        self.record(Call::Write(path.to_string()));
        self.check_region(session, &path)?;
        let _op = self.op();
        if !self.write_delay.is_zero() {
            tokio::time::sleep(self.write_delay).await;
        }

        let retain = length <= RETAIN_LIMIT;
        let mut kept = Vec::new();
        let mut hasher = ContentHasher::new();
        let mut buf = vec![0u8; IO_PIECE];
        loop {
            let n = source
                .read(&mut buf)
                .await
                .map_err(|e| CopyError::from_io(TransferStage::Upload, path.to_string(), &e))?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
            if retain {
                kept.extend_from_slice(&buf[..n]);
            }
        }
        if hasher.bytes() != length {
            return Err(CopyError::upload(
                path.to_string(),
                format!("expected {} bytes, received {}", length, hasher.bytes()),
                true,
            ));
        }

        let etag = hasher.finalize_hex();
        let content = if retain {
            Content::Bytes(kept)
        } else {
            Content::Digest(length)
        };
        self.objects.lock().insert(
            object_key(&path),
            StoredObject {
                content,
                etag: etag.clone(),
            },
        );

        if self.corrupt_uploads.lock().contains(&path.to_string()) {
            return Ok("00000000000000000000000000000000".to_string());
        }
        Ok(etag)
    }

    async fn write_manifest(
        &self,
        session: &Session,
        path: ObjectPath<'_>,
        items: &[ManifestItem],
    ) -> CopyResult<()> {
        self.record(Call::WriteManifest(path.to_string()));
        self.check_region(session, &path)?;
        if let Some(message) = self.manifest_rejection.lock().clone() {
            return Err(CopyError::Manifest {
                path: path.to_string(),
                message,
            });
        }
        self.manifests
            .lock()
            .push((path.to_string(), items.to_vec()));
        Ok(())
    }
}
