//! Manifest assembly for segmented destination objects.

use serde::{Deserialize, Serialize};

use super::worker::ChunkResult;

/// One segment entry of a multipart manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestItem {
    pub path: String,
    pub etag: String,
    #[serde(rename = "size_bytes")]
    pub size: u64,
}

impl From<&ChunkResult> for ManifestItem {
    fn from(result: &ChunkResult) -> Self {
        Self {
            path: result.destination_path.clone(),
            etag: result.content_hash.clone(),
            size: result.size,
        }
    }
}

/// Build the manifest for a set of completed chunks, ordered by `path`.
///
/// The order depends only on the paths, never on the order chunks finished in.
pub fn assemble_manifest(results: &[ChunkResult]) -> Vec<ManifestItem> {
    let mut items: Vec<ManifestItem> = results.iter().map(ManifestItem::from).collect();
    items.sort_by(|a, b| a.path.cmp(&b.path));
    items
}
