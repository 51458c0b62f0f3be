use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

use storefront_core::cart::CartReconciler;
use storefront_core::clock::SystemClock;
use storefront_core::config::StorefrontConfig;
use storefront_infrastructure::{ConfigService, FileStore, StorefrontPaths};

/// Everything a command needs: the effective configuration and paths.
pub struct AppContext {
    pub config: StorefrontConfig,
    pub config_path: PathBuf,
    paths: StorefrontPaths,
}

impl AppContext {
    /// Loads configuration from `config_path` (or the platform default).
    ///
    /// The data directory resolves as: `--data-dir`, then `[storage] data_dir`
    /// (which `STOREFRONT_DATA_DIR` overrides), then the platform data dir.
    pub fn load(config_path: Option<PathBuf>, data_dir: Option<PathBuf>) -> Result<Self> {
        let service = match config_path {
            Some(path) => ConfigService::new(path),
            None => ConfigService::from_default_location()?,
        };
        let config = service
            .get_config()
            .with_context(|| format!("Failed to load {}", service.path().display()))?;

        let data_dir = data_dir.or_else(|| config.storage.data_dir.clone());
        Ok(Self {
            config_path: service.path().to_path_buf(),
            paths: StorefrontPaths::new(data_dir),
            config,
        })
    }

    pub fn store_dir(&self) -> Result<PathBuf> {
        self.paths
            .store_dir()
            .context("Failed to resolve the data directory")
    }

    /// Restores the cart from the file store.
    pub fn open_cart(&self) -> Result<CartReconciler> {
        let store = FileStore::new(self.store_dir()?);
        Ok(CartReconciler::restore(
            Arc::new(store),
            Arc::new(SystemClock),
            self.config.cart.staleness_horizon(),
        ))
    }
}
