//! Store backend configuration.
//!
//! Read from `<config_dir>/qpolicy/config.yaml`:
//!
//! ```yaml
//! backend: qrexec          # or: directory
//! client: /usr/bin/qrexec-client-vm
//! target: dom0
//! ```
//!
//! ```yaml
//! backend: directory
//! root: /etc/qubes/policy.d
//! ```
//!
//! A missing file means the qrexec backend with default settings.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::admin::PolicyAdmin;
use crate::directory::DirectoryAdmin;
use crate::error::ConfigError;
use crate::qrexec::QrexecAdmin;

pub const DEFAULT_QREXEC_CLIENT: &str = "qrexec-client-vm";
pub const DEFAULT_ADMIN_TARGET: &str = "dom0";
pub const DEFAULT_POLICY_DIR: &str = "/etc/qubes/policy.d";
pub const CONFIG_FILE: &str = "config.yaml";

/// Which admin transport to use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StoreConfig {
    Qrexec {
        #[serde(default = "default_client")]
        client: PathBuf,
        #[serde(default = "default_target")]
        target: String,
    },
    Directory {
        #[serde(default = "default_root")]
        root: PathBuf,
    },
}

fn default_client() -> PathBuf {
    PathBuf::from(DEFAULT_QREXEC_CLIENT)
}

fn default_target() -> String {
    DEFAULT_ADMIN_TARGET.to_string()
}

fn default_root() -> PathBuf {
    PathBuf::from(DEFAULT_POLICY_DIR)
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Qrexec {
            client: default_client(),
            target: default_target(),
        }
    }
}

/// `<config_dir>/qpolicy/config.yaml`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("qpolicy").join(CONFIG_FILE))
}

impl StoreConfig {
    /// Parse the config file at `path`.
    pub fn load_at(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `path`, or the default config path when `None`. A file that does
    /// not exist yields [`StoreConfig::default`].
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path.map(Path::to_path_buf).or_else(default_config_path) {
            Some(path) => path,
            None => return Ok(Self::default()),
        };
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no store config, using defaults");
            return Ok(Self::default());
        }
        let config = Self::load_at(&path)?;
        tracing::debug!(path = %path.display(), ?config, "store config loaded");
        Ok(config)
    }

    /// Build the configured admin client.
    pub fn connect(&self) -> Box<dyn PolicyAdmin> {
        match self {
            StoreConfig::Qrexec { client, target } => {
                Box::new(QrexecAdmin::new(client.clone(), target.clone()))
            }
            StoreConfig::Directory { root } => Box::new(DirectoryAdmin::new(root.clone())),
        }
    }
}
