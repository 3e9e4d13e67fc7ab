use directories::{BaseDirs, ProjectDirs};
use eyre::{eyre, Context, Result};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::CopyConfig;

pub const CONFIG_FILE_NAME: &str = "cfcopy.toml";
pub const DEFAULT_IDENTITY_URL: &str = "https://identity.api.rackspacecloud.com/v2.0/tokens";

pub const ENV_USERNAME: &str = "CFCOPY_USERNAME";
pub const ENV_API_KEY: &str = "CFCOPY_API_KEY";

static CONFIG_DIR_OVERRIDE: Lazy<RwLock<Option<PathBuf>>> = Lazy::new(|| RwLock::new(None));

/// Override the configuration directory for the current process.
/// Subsequent calls replace the previous override.
pub fn set_config_dir<P: AsRef<Path>>(path: P) {
    *CONFIG_DIR_OVERRIDE.write() = Some(path.as_ref().to_path_buf());
}

/// Clear any previously configured override.
pub fn clear_config_dir_override() {
    CONFIG_DIR_OVERRIDE.write().take();
}

/// Resolve the configuration directory.
/// Priority: explicit override -> platform standard -> ~/.config/cfcopy
pub fn config_dir() -> Result<PathBuf> {
    if let Some(path) = CONFIG_DIR_OVERRIDE.read().clone() {
        return Ok(path);
    }

    if let Some(proj) = ProjectDirs::from("com", "cfcopy", "cfcopy") {
        return Ok(proj.config_dir().to_path_buf());
    }

    if let Some(base) = BaseDirs::new() {
        return Ok(base.home_dir().join(".config").join("cfcopy"));
    }

    Err(eyre!(
        "unable to determine configuration directory for cfcopy (no override and no platform default)"
    ))
}

/// Contents of `cfcopy.toml`.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ClientConfig {
    /// Account user name for the identity service
    pub username: Option<String>,
    /// API key for the identity service
    pub api_key: Option<String>,
    /// Identity endpoint (defaults to the Rackspace v2.0 token URL)
    pub identity_url: Option<String>,
    /// Chunk size in bytes
    pub chunk_size: Option<u64>,
    /// Maximum number of chunks in flight
    pub concurrency: Option<usize>,
}

/// Credentials resolved from config file and environment.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub api_key: String,
    pub identity_url: String,
}

impl ClientConfig {
    /// Load `cfcopy.toml` from the resolved config directory. A missing file yields defaults.
    pub fn load() -> Result<Self> {
        let path = config_dir()?.join(CONFIG_FILE_NAME);
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read config file: {}", path.display()))?;
        Self::parse(&content)
            .wrap_err_with(|| format!("failed to parse config file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: ClientConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Copy tuning from the file layered over the built-in defaults.
    pub fn copy_config(&self) -> CopyConfig {
        let defaults = CopyConfig::default();
        CopyConfig {
            chunk_size: self.chunk_size.unwrap_or(defaults.chunk_size),
            concurrency: self.concurrency.unwrap_or(defaults.concurrency),
        }
    }

    /// Resolve credentials; environment variables take precedence over the file.
    pub fn credentials(&self) -> Result<Credentials> {
        self.credentials_with(|name| std::env::var(name).ok())
    }

    fn credentials_with(&self, env: impl Fn(&str) -> Option<String>) -> Result<Credentials> {
        let username = env(ENV_USERNAME)
            .or_else(|| self.username.clone())
            .ok_or_else(|| {
                eyre!("no username configured (set {ENV_USERNAME} or `username` in {CONFIG_FILE_NAME})")
            })?;
        let api_key = env(ENV_API_KEY)
            .or_else(|| self.api_key.clone())
            .ok_or_else(|| {
                eyre!("no API key configured (set {ENV_API_KEY} or `api_key` in {CONFIG_FILE_NAME})")
            })?;
        Ok(Credentials {
            username,
            api_key,
            identity_url: self
                .identity_url
                .clone()
                .unwrap_or_else(|| DEFAULT_IDENTITY_URL.to_string()),
        })
    }
}
