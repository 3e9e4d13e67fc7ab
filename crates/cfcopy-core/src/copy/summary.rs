use std::time::Duration;

use super::ManifestItem;

/// Summary of a completed object copy.
#[derive(Clone, Debug, Default)]
pub struct CopyReport {
    pub chunks: usize,
    pub uploaded_chunks: usize,
    pub skipped_chunks: usize,
    pub bytes_uploaded: u64,
    pub total_bytes: u64,
    pub manifest: Vec<ManifestItem>,
    pub duration: Duration,
}
