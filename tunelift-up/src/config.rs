//! Service configuration
//!
//! Settings resolve in priority order: CLI argument, environment variable,
//! TOML config file, compiled default.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tunelift_common::Result;

/// Default listen port for tunelift-up
pub const DEFAULT_PORT: u16 = 5871;

/// Per-kind upload size caps, enforced before any network transfer
#[derive(Debug, Clone)]
pub struct UploadLimits {
    pub cover_max_bytes: u64,
    pub audio_max_bytes: u64,
    pub document_max_bytes: u64,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            cover_max_bytes: 5 * 1024 * 1024,
            audio_max_bytes: 10 * 1024 * 1024,
            document_max_bytes: 5 * 1024 * 1024,
        }
    }
}

/// Resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// HTTP listen port
    pub port: u16,

    /// Directory holding the drafts database
    pub data_dir: PathBuf,

    /// Base URL of the binary storage service
    pub storage_base_url: String,

    /// Base URL of the release gateway
    pub gateway_base_url: String,

    /// Outbound request timeout; expiry surfaces as a network error
    pub request_timeout_secs: u64,

    pub limits: UploadLimits,
}

/// Optional overrides read from the TOML config file
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    port: Option<u16>,
    storage_base_url: Option<String>,
    gateway_base_url: Option<String>,
    request_timeout_secs: Option<u64>,
    cover_max_bytes: Option<u64>,
    audio_max_bytes: Option<u64>,
    document_max_bytes: Option<u64>,
}

impl ServiceConfig {
    /// Build the configuration from defaults, the TOML file (if present),
    /// and CLI overrides, in ascending priority.
    pub fn load(
        data_dir: PathBuf,
        config_file: Option<&Path>,
        cli_port: Option<u16>,
    ) -> Result<Self> {
        let file_config = match config_file {
            Some(path) => {
                tunelift_common::config::load_toml::<FileConfig>(path)?.unwrap_or_default()
            }
            None => match tunelift_common::config::default_config_file() {
                Ok(path) => {
                    tunelift_common::config::load_toml::<FileConfig>(&path)?.unwrap_or_default()
                }
                Err(_) => FileConfig::default(),
            },
        };

        let defaults = UploadLimits::default();
        let config = Self {
            port: cli_port.or(file_config.port).unwrap_or(DEFAULT_PORT),
            data_dir,
            storage_base_url: file_config
                .storage_base_url
                .unwrap_or_else(|| "http://127.0.0.1:5870".to_string()),
            gateway_base_url: file_config
                .gateway_base_url
                .unwrap_or_else(|| "http://127.0.0.1:5869".to_string()),
            request_timeout_secs: file_config.request_timeout_secs.unwrap_or(60),
            limits: UploadLimits {
                cover_max_bytes: file_config.cover_max_bytes.unwrap_or(defaults.cover_max_bytes),
                audio_max_bytes: file_config.audio_max_bytes.unwrap_or(defaults.audio_max_bytes),
                document_max_bytes: file_config
                    .document_max_bytes
                    .unwrap_or(defaults.document_max_bytes),
            },
        };

        Ok(config)
    }

    /// Path of the drafts database inside the data directory
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("tunelift-up.db")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_port_wins_over_file_port() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "port = 6000\naudio_max_bytes = 1048576\n").unwrap();

        let config =
            ServiceConfig::load(dir.path().to_path_buf(), Some(&path), Some(7000)).unwrap();
        assert_eq!(config.port, 7000);
        assert_eq!(config.limits.audio_max_bytes, 1024 * 1024);
        // Untouched fields keep their defaults
        assert_eq!(config.limits.cover_max_bytes, 5 * 1024 * 1024);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let config = ServiceConfig::load(dir.path().to_path_buf(), Some(&missing), None).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.request_timeout_secs, 60);
    }
}
