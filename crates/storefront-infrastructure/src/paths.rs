//! Unified path management for storefront files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/storefront/            # Config directory
//! └── config.toml                  # Application configuration
//!
//! ~/.local/share/storefront/       # Data directory
//! ├── store/                       # Durable key/value store (FileStore)
//! └── logs/                        # Application logs
//!     └── storefront.log.YYYY-MM-DD
//! ```

use std::path::PathBuf;

const APP_DIR: &str = "storefront";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Home directory could not be determined.
    HomeDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::HomeDirNotFound => write!(f, "Cannot find home directory"),
        }
    }
}

impl std::error::Error for PathError {}

/// Path resolution, optionally rooted at an explicit data directory.
#[derive(Debug, Clone, Default)]
pub struct StorefrontPaths {
    data_dir_override: Option<PathBuf>,
}

impl StorefrontPaths {
    /// # Arguments
    ///
    /// * `data_dir_override` - Use this directory instead of the platform data dir.
    pub fn new(data_dir_override: Option<PathBuf>) -> Self {
        Self { data_dir_override }
    }

    /// Returns the storefront configuration directory (e.g. `~/.config/storefront/`).
    pub fn config_dir(&self) -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Returns the path to the main configuration file.
    pub fn config_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("config.toml"))
    }

    /// Returns the storefront data directory (e.g. `~/.local/share/storefront/`).
    pub fn data_dir(&self) -> Result<PathBuf, PathError> {
        if let Some(dir) = &self.data_dir_override {
            return Ok(dir.clone());
        }
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Directory for the durable key/value store.
    pub fn store_dir(&self) -> Result<PathBuf, PathError> {
        Ok(self.data_dir()?.join("store"))
    }

    pub fn logs_dir(&self) -> Result<PathBuf, PathError> {
        Ok(self.data_dir()?.join("logs"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_roots_data_paths() {
        let paths = StorefrontPaths::new(Some(PathBuf::from("/tmp/sf")));
        assert_eq!(paths.data_dir().unwrap(), PathBuf::from("/tmp/sf"));
        assert_eq!(paths.store_dir().unwrap(), PathBuf::from("/tmp/sf/store"));
        assert_eq!(paths.logs_dir().unwrap(), PathBuf::from("/tmp/sf/logs"));
    }
}
