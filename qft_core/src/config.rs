use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, TransferError};

/// Environment variable naming the directory that holds `config.json`
pub const CONFIG_DIR_ENV: &str = "QFT_CONFIG_DIR";
const CONFIG_FILE: &str = "config.json";

const DEFAULT_UPLOAD_DIR: &str = "./uploads";
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Where received files are stored, relative to the working directory
    pub upload_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 4222)),
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub connect_timeout_secs: u64,
    /// TLS server name presented during the handshake
    pub server_name: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            server_name: "localhost".to_string(),
        }
    }
}

impl ClientConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Both halves live in one file so client and server can share it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub client: ClientConfig,
}

impl AppConfig {
    fn get_config_path() -> Option<PathBuf> {
        std::env::var_os(CONFIG_DIR_ENV).map(|dir| PathBuf::from(dir).join(CONFIG_FILE))
    }

    /// Load from `$QFT_CONFIG_DIR/config.json`, or defaults when the variable is unset
    pub fn load() -> Result<Self> {
        match Self::get_config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| TransferError::Config(format!("cannot read {:?}: {}", path, e)))?;
        serde_json::from_str(&content)
            .map_err(|e| TransferError::Config(format!("invalid {:?}: {}", path, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULT_BIND_ADDR: &str = "127.0.0.1:4222";

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(config.server.upload_dir, PathBuf::from("./uploads"));
        assert_eq!(config.client.connect_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, r#"{"server": {"upload_dir": "/srv/incoming"}}"#).unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.server.upload_dir, PathBuf::from("/srv/incoming"));
        assert_eq!(config.server.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(config.client.connect_timeout_secs, 5);
    }

    #[test]
    fn test_serialized_config_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let mut config = AppConfig::default();
        config.client.connect_timeout_secs = 1;
        fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.client.connect_timeout_secs, 1);
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(TransferError::Config(_))
        ));
    }
}
