//! Layered configuration
//!
//! Three layers, later wins: built-in defaults, the user config file
//! (`~/.config/cargohold/config.toml`, or `CARGOHOLD_CONFIG`), then
//! environment variables.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Env var overriding the config file location
pub const CONFIG_PATH_ENV: &str = "CARGOHOLD_CONFIG";

/// Env var overriding the store root directory
pub const STORE_ROOT_ENV: &str = "CARGOHOLD_STORE_ROOT";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// On-disk config schema; every field optional
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    store_root: Option<PathBuf>,
    instance_image: Option<String>,
    http_proxy: Option<String>,
    https_proxy: Option<String>,
}

/// Effective configuration after merging all layers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Root directory of the file-backed store
    pub store_root: PathBuf,
    /// Image used for provisioned lint instances
    pub instance_image: String,
    pub http_proxy: Option<String>,
    pub https_proxy: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        let store_root = match env::var("HOME") {
            Ok(home) => PathBuf::from(home).join(".cache/cargohold/store"),
            Err(_) => PathBuf::from("/tmp/cargohold/store"),
        };
        Self {
            store_root,
            instance_image: crate::environment::DEFAULT_IMAGE.to_string(),
            http_proxy: None,
            https_proxy: None,
        }
    }
}

impl Config {
    /// Load the effective configuration: defaults, then file, then env
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = config_file_path() {
            if path.exists() {
                config.apply_file(&path)?;
            }
        }

        config.apply_env();
        Ok(config)
    }

    fn apply_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: FileConfig = toml::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        if let Some(store_root) = file.store_root {
            self.store_root = store_root;
        }
        if let Some(image) = file.instance_image {
            self.instance_image = image;
        }
        if file.http_proxy.is_some() {
            self.http_proxy = file.http_proxy;
        }
        if file.https_proxy.is_some() {
            self.https_proxy = file.https_proxy;
        }
        Ok(())
    }

    fn apply_env(&mut self) {
        if let Ok(root) = env::var(STORE_ROOT_ENV) {
            self.store_root = PathBuf::from(root);
        }
        if self.http_proxy.is_none() {
            self.http_proxy = env::var("http_proxy").ok();
        }
        if self.https_proxy.is_none() {
            self.https_proxy = env::var("https_proxy").ok();
        }
    }
}

fn config_file_path() -> Option<PathBuf> {
    if let Ok(path) = env::var(CONFIG_PATH_ENV) {
        return Some(PathBuf::from(path));
    }
    env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".config/cargohold/config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_layer_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "store_root = \"/srv/store\"\ninstance_image = \"ubuntu:24.04\"\n",
        )
        .unwrap();

        let mut config = Config::default();
        config.apply_file(&path).unwrap();
        assert_eq!(config.store_root, PathBuf::from("/srv/store"));
        assert_eq!(config.instance_image, "ubuntu:24.04");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "no_such_key = 1\n").unwrap();

        let mut config = Config::default();
        let err = config.apply_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "http_proxy = \"http://proxy:3128\"\n").unwrap();

        let defaults = Config::default();
        let mut config = Config::default();
        config.apply_file(&path).unwrap();
        assert_eq!(config.store_root, defaults.store_root);
        assert_eq!(config.http_proxy.as_deref(), Some("http://proxy:3128"));
    }
}
