//! Configuration loading.
//!
//! The file is TOML, located by `--config <path>`, then `ACUERDOS_CONFIG`,
//! then `config/acuerdos.toml`. `ACUERDOS_API_URL` overrides the base URL.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_PATH: &str = "config/acuerdos.toml";
pub const CONFIG_ENV: &str = "ACUERDOS_CONFIG";
pub const API_URL_ENV: &str = "ACUERDOS_API_URL";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Root of the agreements API, e.g. `http://host:8011/api`.
    #[serde(default)]
    pub api_base_url: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Per-request timeout. Unset means requests wait indefinitely.
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    #[serde(default = "default_log_file")]
    pub file: PathBuf,
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_max_size_kb")]
    pub max_size_kb: u64,
    #[serde(default = "default_archives")]
    pub archives: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: default_log_file(),
            level: default_log_level(),
            max_size_kb: default_max_size_kb(),
            archives: default_archives(),
        }
    }
}

fn default_page_size() -> u32 {
    10
}

fn default_log_file() -> PathBuf {
    PathBuf::from("logs/acuerdos.log")
}

fn default_log_level() -> String {
    String::from("info")
}

fn default_max_size_kb() -> u64 {
    1024
}

fn default_archives() -> u32 {
    3
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl AppConfig {
    /// Resolves the config file, applies environment overrides and validates.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path_from_args()
            .or_else(config_path_from_env)
            .or_else(|| {
                let fallback = PathBuf::from(DEFAULT_CONFIG_PATH);
                fallback.exists().then_some(fallback)
            });
        let mut config = match path {
            Some(path) => Self::from_path(&path)?,
            None => Self::from_toml("")?,
        };
        config.apply_overrides(env::var(API_URL_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn apply_overrides(&mut self, api_url: Option<String>) {
        if let Some(url) = api_url.filter(|url| !url.trim().is_empty()) {
            self.api_base_url = url.trim().to_string();
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.api_base_url.trim();
        if url.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "api_base_url",
                reason: format!("must be set in the config file or {}", API_URL_ENV),
            });
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                field: "api_base_url",
                reason: "must start with http:// or https://".to_string(),
            });
        }
        if self.page_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "page_size",
                reason: "must be > 0".to_string(),
            });
        }
        if self.request_timeout_ms == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_ms",
                reason: "must be > 0 when set".to_string(),
            });
        }
        if self.logging.file.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "logging.file",
                reason: "must not be empty".to_string(),
            });
        }
        if self.logging.level.parse::<log::LevelFilter>().is_err() {
            return Err(ConfigError::InvalidValue {
                field: "logging.level",
                reason: format!("unknown level '{}'", self.logging.level),
            });
        }
        if self.logging.archives == 0 {
            return Err(ConfigError::InvalidValue {
                field: "logging.archives",
                reason: "must be > 0".to_string(),
            });
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

fn config_path_from_env() -> Option<PathBuf> {
    env::var(CONFIG_ENV).ok().map(PathBuf::from)
}

fn config_path_from_args() -> Option<PathBuf> {
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
    }
    None
}
