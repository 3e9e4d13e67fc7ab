use std::sync::Arc;

use cfcopy_core::config::ClientConfig;
use cfcopy_core::store::SwiftClient;
use cfcopy_core::{CopyConfig, ObjectStore};
use eyre::{Context, Result};

#[derive(Debug, Clone)]
pub struct AppContext {
    pub config: ClientConfig,
}

impl AppContext {
    pub fn load() -> Result<Self> {
        let config = ClientConfig::load().wrap_err("failed to load cfcopy configuration")?;
        Ok(Self { config })
    }

    /// Copy tuning from the config file with command-line overrides applied.
    pub fn copy_config(&self, chunk_size: Option<u64>, concurrency: Option<usize>) -> CopyConfig {
        let mut config = self.config.copy_config();
        if let Some(chunk_size) = chunk_size {
            config.chunk_size = chunk_size;
        }
        if let Some(concurrency) = concurrency {
            config.concurrency = concurrency;
        }
        config
    }

    pub fn store(&self) -> Result<Arc<dyn ObjectStore>> {
        let credentials = self.config.credentials()?;
        Ok(Arc::new(SwiftClient::new(credentials)))
    }
}
