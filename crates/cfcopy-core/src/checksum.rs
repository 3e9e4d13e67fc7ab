//! Checksum and etag utilities
//!
//! The object store reports MD5 etags, so chunk hashes are MD5 hex digests
//! computed over exactly the bytes that were read.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::AsyncWrite;

/// Incremental MD5 over a byte stream.
pub struct ContentHasher {
    ctx: md5::Context,
    bytes: u64,
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentHasher {
    pub fn new() -> Self {
        Self {
            ctx: md5::Context::new(),
            bytes: 0,
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        self.ctx.consume(data);
        self.bytes = self.bytes.saturating_add(data.len() as u64);
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Finish hashing and return the lowercase hex digest.
    pub fn finalize_hex(self) -> String {
        format!("{:x}", self.ctx.compute())
    }
}

/// Hex MD5 of a complete buffer.
pub fn md5_hex(data: &[u8]) -> String {
    format!("{:x}", md5::compute(data))
}

/// Strip the quoting and case differences a service may apply to an etag header.
pub fn normalize_etag(raw: &str) -> String {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix("W/").unwrap_or(trimmed);
    trimmed.trim_matches('"').to_ascii_lowercase()
}

/// Compare two etags after normalisation. Empty etags never match.
pub fn etags_match(a: &str, b: &str) -> bool {
    let a = normalize_etag(a);
    !a.is_empty() && a == normalize_etag(b)
}

/// `AsyncWrite` adapter that hashes every byte accepted by the inner writer.
pub struct HashingWriter<W> {
    inner: W,
    hasher: ContentHasher,
}

impl<W> HashingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: ContentHasher::new(),
        }
    }

    /// Return the inner writer together with the hex digest of everything written.
    pub fn finish(self) -> (W, u64, String) {
        let bytes = self.hasher.bytes();
        (self.inner, bytes, self.hasher.finalize_hex())
    }
}

impl<W: AsyncWrite + Unpin> AsyncWrite for HashingWriter<W> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_write(cx, buf) {
            Poll::Ready(Ok(n)) => {
                this.hasher.update(&buf[..n]);
                Poll::Ready(Ok(n))
            }
            other => other,
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}
