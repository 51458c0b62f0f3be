//! Configuration service implementation.
//!
//! Loads `StorefrontConfig` from `config.toml`, writing the defaults when the
//! file is missing, and layers environment overrides on top.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use storefront_core::config::StorefrontConfig;
use storefront_core::error::{Result, StorefrontError};

use crate::paths::StorefrontPaths;
use crate::storage::AtomicFile;

/// Overrides `api.base_url`.
pub const ENV_API_URL: &str = "STOREFRONT_API_URL";
/// Overrides `channel.url`.
pub const ENV_CHANNEL_URL: &str = "STOREFRONT_CHANNEL_URL";
/// Overrides `storage.data_dir`.
pub const ENV_DATA_DIR: &str = "STOREFRONT_DATA_DIR";

/// Configuration service that loads and caches the configuration file.
#[derive(Debug, Clone)]
pub struct ConfigService {
    path: PathBuf,
    /// Cached configuration loaded from file.
    /// Uses RwLock for thread-safe lazy loading.
    config: Arc<RwLock<Option<StorefrontConfig>>>,
}

impl ConfigService {
    /// Creates a service for an explicit config file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Creates a service for the platform config file.
    pub fn from_default_location() -> Result<Self> {
        let path = StorefrontPaths::default()
            .config_file()
            .map_err(|e| StorefrontError::config(e.to_string()))?;
        Ok(Self::new(path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Gets the configuration, loading from file if not cached.
    ///
    /// Environment overrides are applied on every load.
    pub fn get_config(&self) -> Result<StorefrontConfig> {
        {
            let read_lock = self.config.read().unwrap_or_else(|e| e.into_inner());
            if let Some(ref cached) = *read_lock {
                return Ok(cached.clone());
            }
        }

        let mut loaded = self.load_file()?;
        apply_overrides(&mut loaded, |name| std::env::var(name).ok());
        loaded.validate()?;

        {
            let mut write_lock = self.config.write().unwrap_or_else(|e| e.into_inner());
            *write_lock = Some(loaded.clone());
        }

        Ok(loaded)
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        let mut write_lock = self.config.write().unwrap_or_else(|e| e.into_inner());
        *write_lock = None;
    }

    fn load_file(&self) -> Result<StorefrontConfig> {
        let file = AtomicFile::new(self.path.clone());
        let content = file
            .read()
            .map_err(|e| StorefrontError::io(format!("{}: {}", self.path.display(), e)))?;

        match content {
            Some(text) => StorefrontConfig::from_toml_str(&text),
            None => {
                let default_config = StorefrontConfig::default();
                tracing::info!(
                    "[ConfigService] No config at {}, writing defaults",
                    self.path.display()
                );
                file.write(&default_config.to_toml_string()?).map_err(|e| {
                    StorefrontError::io(format!("{}: {}", self.path.display(), e))
                })?;
                Ok(default_config)
            }
        }
    }
}

/// Applies `STOREFRONT_*` overrides read through `lookup`.
pub fn apply_overrides<F>(config: &mut StorefrontConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.is_empty()) {
        tracing::debug!("[ConfigService] api.base_url overridden by {}", ENV_API_URL);
        config.api.base_url = url;
    }
    if let Some(url) = lookup(ENV_CHANNEL_URL).filter(|v| !v.is_empty()) {
        tracing::debug!("[ConfigService] channel.url overridden by {}", ENV_CHANNEL_URL);
        config.channel.url = url;
    }
    if let Some(dir) = lookup(ENV_DATA_DIR).filter(|v| !v.is_empty()) {
        config.storage.data_dir = Some(PathBuf::from(dir));
    }
}
