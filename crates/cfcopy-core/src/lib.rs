pub mod checksum;
pub mod config;
pub mod copy;
pub mod errors;
pub mod location;
pub mod plan;
pub mod session;
pub mod store;

pub use copy::{copy_object, CopyOptions, CopyProgress, CopyReport, ProgressEvent};
pub use errors::{CopyError, CopyResult, ErrorCategory};
pub use location::ObjectLocation;
pub use plan::{plan_chunks, ChunkSpec};
pub use session::Session;
pub use store::{ObjectPath, ObjectStat, ObjectStore};

/// 256 MiB
pub const DEFAULT_CHUNK_SIZE: u64 = 256 * 1024 * 1024;
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Tuning for a chunked copy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CopyConfig {
    pub chunk_size: u64,
    pub concurrency: usize,
}

impl Default for CopyConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}
