use std::{
    fs::{self, File},
    io::Write,
    path::PathBuf,
};

use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;
use url::Url;

use crate::assets::{get_config_dir, get_data_dir, get_default_config};

/// Backend used when neither the environment nor the config file name one.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Environment variable overriding `api_url`.
pub const API_URL_ENV: &str = "ZUSCHAT_API_URL";

pub const DEFAULT_QUOTA_BYTES: usize = 5 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("File system error: {0}")]
    IO(#[from] std::io::Error),
    #[error("YAML parsing error: {0}")]
    YAMLError(#[from] serde_yaml::Error),
    #[error("Configuration error: {0}")]
    Config(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StorageConfig {
    /// Directory for the chat history file, `None` means the platform data dir.
    pub dir: Option<PathBuf>,
    pub quota_bytes: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: None,
            quota_bytes: DEFAULT_QUOTA_BYTES,
        }
    }
}

impl StorageConfig {
    /// Resolves the directory the file store writes to, creating the default one if needed.
    pub fn resolve_dir(&self) -> std::io::Result<PathBuf> {
        match &self.dir {
            Some(dir) => {
                fs::create_dir_all(dir)?;
                Ok(dir.clone())
            }
            None => get_data_dir(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_url: Url,
    pub storage: StorageConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: Url::parse(DEFAULT_API_URL).expect("default api url is valid"),
            storage: StorageConfig::default(),
        }
    }
}

#[derive(Deserialize, Debug, Default)]
struct RawConfig {
    api_url: Option<String>,
    #[serde(default)]
    storage: RawStorageConfig,
}

#[derive(Deserialize, Debug, Default)]
struct RawStorageConfig {
    dir: Option<String>,
    quota_bytes: Option<usize>,
}

/// Picks the backend URL: a non-empty environment value wins, then the file, then the default.
fn resolve_api_url(env_value: Option<String>, file_value: Option<&str>) -> String {
    env_value
        .filter(|v| !v.trim().is_empty())
        .or_else(|| {
            file_value
                .filter(|v| !v.trim().is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| DEFAULT_API_URL.to_string())
}

impl RawConfig {
    #[instrument]
    fn to_config(&self, env_api_url: Option<String>) -> Result<Config, ConfigError> {
        let api_url = resolve_api_url(env_api_url, self.api_url.as_deref());
        let api_url = Url::parse(api_url.trim())
            .map_err(|e| ConfigError::Config(format!("Invalid api_url '{api_url}': {e}")))?;
        if api_url.cannot_be_a_base() {
            return Err(ConfigError::Config(format!(
                "api_url '{api_url}' cannot be used as a base URL"
            )));
        }

        let quota_bytes = self.storage.quota_bytes.unwrap_or(DEFAULT_QUOTA_BYTES);
        if quota_bytes == 0 {
            return Err(ConfigError::Config(
                "storage.quota_bytes must be greater than zero".to_string(),
            ));
        }

        Ok(Config {
            api_url,
            storage: StorageConfig {
                dir: self.storage.dir.as_ref().map(PathBuf::from),
                quota_bytes,
            },
        })
    }
}

#[instrument(skip(config_path))]
pub fn create_or_get_config_file(
    config_path: Option<PathBuf>,
) -> Result<(bool, PathBuf), ConfigError> {
    let actual_path = config_path.unwrap_or_else(|| get_config_dir().join("zuschat.yml"));

    let parent_dir = actual_path.parent().ok_or_else(|| {
        ConfigError::IO(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "Config path has no parent directory",
        ))
    })?;

    if !parent_dir.exists() {
        fs::create_dir_all(parent_dir)?;
    }

    if actual_path.exists() {
        Ok((true, actual_path))
    } else {
        File::create(&actual_path)?.write_all(get_default_config().as_bytes())?;
        Ok((false, actual_path))
    }
}

/// Loads the config file (creating the default one on first run) and applies
/// the `ZUSCHAT_API_URL` override.
#[instrument(skip(config_path))]
pub fn get_config(config_path: Option<PathBuf>) -> Result<Config, ConfigError> {
    let (_, config_file) = create_or_get_config_file(config_path)?;
    let content = fs::read_to_string(&config_file)?;
    let raw: RawConfig = if content.trim().is_empty() {
        RawConfig::default()
    } else {
        serde_yaml::from_str(&content)?
    };
    raw.to_config(std::env::var(API_URL_ENV).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn raw(content: &str) -> RawConfig {
        serde_yaml::from_str(content).unwrap()
    }

    #[test]
    fn test_resolve_api_url_precedence() {
        assert_eq!(
            resolve_api_url(Some("http://env:1".to_string()), Some("http://file:2")),
            "http://env:1"
        );
        assert_eq!(
            resolve_api_url(Some("  ".to_string()), Some("http://file:2")),
            "http://file:2"
        );
        assert_eq!(resolve_api_url(None, None), DEFAULT_API_URL);
        assert_eq!(resolve_api_url(None, Some("")), DEFAULT_API_URL);
    }

    #[test]
    fn test_to_config_full() {
        let config = raw(
            r#"
api_url: https://chat.example.com/backend
storage:
  dir: /tmp/zuschat-test
  quota_bytes: 1024
"#,
        )
        .to_config(None)
        .unwrap();

        assert_eq!(config.api_url.as_str(), "https://chat.example.com/backend");
        assert_eq!(config.storage.dir, Some(PathBuf::from("/tmp/zuschat-test")));
        assert_eq!(config.storage.quota_bytes, 1024);
    }

    #[test]
    fn test_to_config_defaults() {
        let config = RawConfig::default().to_config(None).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_to_config_env_override() {
        let config = raw("api_url: http://file:9000\n")
            .to_config(Some("http://override:7000".to_string()))
            .unwrap();
        assert_eq!(config.api_url.as_str(), "http://override:7000/");
    }

    #[test]
    fn test_to_config_invalid_url() {
        let err = raw("api_url: not a url\n").to_config(None).unwrap_err();
        assert!(matches!(err, ConfigError::Config(_)));
        assert!(err.to_string().contains("Invalid api_url"));

        let err = raw("api_url: \"mailto:someone@example.com\"\n")
            .to_config(None)
            .unwrap_err();
        assert!(err.to_string().contains("cannot be used as a base URL"));
    }

    #[test]
    fn test_to_config_zero_quota() {
        let err = raw("storage:\n  quota_bytes: 0\n")
            .to_config(None)
            .unwrap_err();
        assert!(err.to_string().contains("quota_bytes"));
    }

    #[test]
    fn test_create_or_get_config_file_writes_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("zuschat.yml");

        let (existed, actual) = create_or_get_config_file(Some(path.clone())).unwrap();
        assert!(!existed);
        assert_eq!(actual, path);
        assert_eq!(fs::read_to_string(&path).unwrap(), get_default_config());

        let (existed, _) = create_or_get_config_file(Some(path)).unwrap();
        assert!(existed);
    }

    #[test]
    fn test_get_config_from_default_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("zuschat.yml");
        let config = get_config(Some(path)).unwrap();
        assert_eq!(config.storage.quota_bytes, DEFAULT_QUOTA_BYTES);
        assert_eq!(config.storage.dir, None);
    }

    #[test]
    fn test_get_config_bad_yaml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("zuschat.yml");
        fs::write(&path, "api_url: [unclosed").unwrap();
        let err = get_config(Some(path)).unwrap_err();
        assert!(matches!(err, ConfigError::YAMLError(_)));
    }

    #[test]
    fn test_storage_resolve_dir_creates_custom_dir() {
        let dir = tempdir().unwrap();
        let custom = dir.path().join("state");
        let storage = StorageConfig {
            dir: Some(custom.clone()),
            quota_bytes: 10,
        };
        assert_eq!(storage.resolve_dir().unwrap(), custom);
        assert!(custom.is_dir());
    }
}
