//! Object store client interface consumed by the copy orchestrator.

use std::fmt;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::copy::ManifestItem;
use crate::errors::CopyResult;
use crate::session::Session;

pub mod swift;

pub use swift::SwiftClient;

/// Writable destination for ranged reads.
pub type ByteSink<'a> = &'a mut (dyn AsyncWrite + Send + Unpin);

/// Owned byte source handed to uploads.
pub type ByteSource = Box<dyn AsyncRead + Send + Unpin>;

/// Address of one object: region, container and key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectPath<'a> {
    pub region: &'a str,
    pub container: &'a str,
    pub key: &'a str,
}

impl<'a> ObjectPath<'a> {
    pub fn new(region: &'a str, container: &'a str, key: &'a str) -> Self {
        Self {
            region,
            container,
            key,
        }
    }
}

impl fmt::Display for ObjectPath<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.container, self.key)
    }
}

/// Result of a stat call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectStat {
    pub size: u64,
    pub hash: String,
}

/// Result of a ranged read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOutcome {
    pub bytes: u64,
    pub hash: String,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Exchange credentials for a session; called once per job.
    async fn authorize(&self) -> CopyResult<Session>;

    async fn stat(&self, session: &Session, path: ObjectPath<'_>) -> CopyResult<ObjectStat>;

    /// Stream `[offset, offset + length)` of the object into `sink`.
    ///
    /// With `length == 0` the read runs from `offset` to the end of the
    /// object. The returned hash covers exactly the bytes written, except for
    /// a whole-object read (`offset == 0`, `length == 0`), which returns the
    /// service-reported whole-object hash.
    async fn ranged_read(
        &self,
        session: &Session,
        path: ObjectPath<'_>,
        offset: u64,
        length: u64,
        sink: ByteSink<'_>,
    ) -> CopyResult<ReadOutcome>;

    /// Upload `length` bytes from `source`, returning the hash the store reports.
    async fn write(
        &self,
        session: &Session,
        path: ObjectPath<'_>,
        source: ByteSource,
        length: u64,
    ) -> CopyResult<String>;

    /// Submit the ordered part list that assembles `path` from its segments.
    async fn write_manifest(
        &self,
        session: &Session,
        path: ObjectPath<'_>,
        items: &[ManifestItem],
    ) -> CopyResult<()>;
}
