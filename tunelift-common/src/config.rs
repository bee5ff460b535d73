//! Configuration loading and data directory resolution

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Data directory resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file (`data_dir` key)
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_data_dir(cli_arg: Option<&Path>, env_var_name: &str) -> Result<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Ok(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        return Ok(PathBuf::from(path));
    }

    // Priority 3: TOML config file
    if let Ok(config_path) = default_config_file() {
        if let Ok(toml_content) = std::fs::read_to_string(&config_path) {
            if let Ok(config) = toml::from_str::<toml::Value>(&toml_content) {
                if let Some(data_dir) = config.get("data_dir").and_then(|v| v.as_str()) {
                    return Ok(PathBuf::from(data_dir));
                }
            }
        }
    }

    // Priority 4: OS-dependent compiled default
    Ok(default_data_dir())
}

/// Default configuration file path for the platform
pub fn default_config_file() -> Result<PathBuf> {
    if cfg!(target_os = "linux") {
        // Try ~/.config/tunelift/config.toml first, then /etc/tunelift/config.toml
        if let Some(path) = dirs::config_dir().map(|d| d.join("tunelift").join("config.toml")) {
            if path.exists() {
                return Ok(path);
            }
        }
        let system_config = PathBuf::from("/etc/tunelift/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }
        Err(Error::Config("No config file found".to_string()))
    } else {
        dirs::config_dir()
            .map(|d| d.join("tunelift").join("config.toml"))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
    }
}

/// Default data directory for the platform
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("tunelift"))
        .unwrap_or_else(|| PathBuf::from("./tunelift-data"))
}

/// Parse a TOML config file into a typed config structure.
///
/// A missing file is not an error; the caller's defaults apply.
pub fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)?;
    let parsed = toml::from_str::<T>(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
    Ok(Some(parsed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct SampleConfig {
        port: u16,
        name: Option<String>,
    }

    #[test]
    fn load_toml_missing_file_is_none() {
        let loaded: Option<SampleConfig> =
            load_toml(Path::new("/nonexistent/tunelift/config.toml")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn load_toml_parses_typed_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "port = 5871\nname = \"upload\"\n").unwrap();

        let loaded: SampleConfig = load_toml(&path).unwrap().unwrap();
        assert_eq!(loaded.port, 5871);
        assert_eq!(loaded.name.as_deref(), Some("upload"));
    }

    #[test]
    fn cli_argument_wins_over_environment() {
        let cli = PathBuf::from("/tmp/from-cli");
        let resolved =
            resolve_data_dir(Some(cli.as_path()), "TUNELIFT_TEST_UNSET_VAR").unwrap();
        assert_eq!(resolved, cli);
    }
}
