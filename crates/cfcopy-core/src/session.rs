use std::collections::HashMap;

use crate::errors::{CopyError, CopyResult, TransferStage};

/// Authenticated session produced once by [`crate::ObjectStore::authorize`].
///
/// Immutable after creation and passed explicitly into every store call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub tenant_id: String,
    endpoints: HashMap<String, String>,
}

impl Session {
    pub fn new(
        token: impl Into<String>,
        tenant_id: impl Into<String>,
        endpoints: HashMap<String, String>,
    ) -> Self {
        Self {
            token: token.into(),
            tenant_id: tenant_id.into(),
            endpoints,
        }
    }

    /// Base URL of the object store in `region`.
    pub fn endpoint(&self, region: &str) -> CopyResult<&str> {
        self.endpoints
            .get(region)
            .map(String::as_str)
            .ok_or_else(|| CopyError::Transfer {
                stage: TransferStage::Download,
                path: region.to_string(),
                message: format!("could not find region {region} in service catalog"),
                retryable: false,
            })
    }

    pub fn regions(&self) -> impl Iterator<Item = &str> {
        self.endpoints.keys().map(String::as_str)
    }
}
