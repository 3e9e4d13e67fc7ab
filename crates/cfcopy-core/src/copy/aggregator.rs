use std::collections::HashMap;

use log::{debug, warn};
use tokio::task::{Id, JoinError};

use super::worker::ChunkResult;
use crate::errors::{CopyError, CopyResult, TransferStage};

/// Collects chunk outcomes in arrival order and latches the first failure.
///
/// Only the orchestrator task touches the aggregator; workers hand their
/// outcome over through the join set, so no locking is needed here.
pub(super) struct ResultAggregator {
    results: Vec<ChunkResult>,
    first_error: Option<CopyError>,
    observed: usize,
    ignored_after_failure: usize,
    /// Task id -> (chunk index, destination part) for naming failed workers.
    workers: HashMap<Id, (usize, String)>,
}

impl ResultAggregator {
    pub fn new(expected: usize) -> Self {
        Self {
            results: Vec::with_capacity(expected),
            first_error: None,
            observed: 0,
            ignored_after_failure: 0,
            workers: HashMap::with_capacity(expected),
        }
    }

    /// Remember which chunk the task `id` is transferring.
    pub fn track(&mut self, id: Id, index: usize, destination_path: String) {
        self.workers.insert(id, (index, destination_path));
    }

    /// Record the outcome of one finished worker task.
    pub fn record(&mut self, joined: Result<CopyResult<ChunkResult>, JoinError>) {
        self.observed += 1;
        let outcome = joined.unwrap_or_else(|join_err| {
            let (path, message) = match self.workers.get(&join_err.id()) {
                Some((index, path)) => (path.clone(), format!("chunk {index}: {join_err}")),
                None => (String::from("<unknown chunk>"), join_err.to_string()),
            };
            Err(CopyError::Transfer {
                stage: TransferStage::Worker,
                path,
                message,
                retryable: false,
            })
        });

        match outcome {
            Ok(result) if self.first_error.is_none() => {
                debug!("chunk {} complete ({} bytes)", result.index, result.size);
                self.results.push(result);
            }
            Ok(result) => {
                self.ignored_after_failure += 1;
                debug!(
                    "chunk {} finished after the copy already failed; part left in place",
                    result.index
                );
            }
            Err(err) if self.first_error.is_none() => {
                warn!("copy failed: {err}");
                self.first_error = Some(err);
            }
            Err(err) => {
                self.ignored_after_failure += 1;
                warn!("additional chunk failure after first error: {err}");
            }
        }
    }

    pub fn has_failed(&self) -> bool {
        self.first_error.is_some()
    }

    /// Number of worker outcomes drained so far.
    pub fn observed(&self) -> usize {
        self.observed
    }

    /// Completed results, or the first latched error.
    pub fn finish(self) -> CopyResult<Vec<ChunkResult>> {
        if self.ignored_after_failure > 0 {
            debug!(
                "{} outcome(s) drained after the first failure",
                self.ignored_after_failure
            );
        }
        match self.first_error {
            Some(err) => Err(err),
            None => Ok(self.results),
        }
    }
}
