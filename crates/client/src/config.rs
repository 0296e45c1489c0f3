use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// Environment variable that overrides the configured backend url.
pub const BACKEND_URL_ENV: &str = "PLATE_BACKEND_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid backend url `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub backend: BackendConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Explicit base url. When unset, the url is derived from `loopback` and `port`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub loopback: Loopback,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: None,
            loopback: Loopback::default(),
            port: default_port(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_port() -> u16 {
    8080
}

fn default_timeout_secs() -> u64 {
    30
}

/// How the device reaches a backend running on the developer's machine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Loopback {
    /// Same host: simulators, web, desktop.
    #[default]
    Host,
    /// Android emulator, where the host is aliased to 10.0.2.2.
    AndroidEmulator,
}

impl Loopback {
    pub fn host(self) -> &'static str {
        match self {
            Loopback::Host => "localhost",
            Loopback::AndroidEmulator => "10.0.2.2",
        }
    }
}

impl ClientConfig {
    /// Config pointing at an explicit backend url.
    pub fn for_backend(url: impl Into<String>) -> Self {
        Self {
            backend: BackendConfig {
                url: Some(url.into()),
                ..BackendConfig::default()
            },
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg: ClientConfig = toml::from_str(&s)?;
        Ok(cfg)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let s = toml::to_string_pretty(self)?;
        std::fs::write(path, s).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `PLATE_BACKEND_URL` if it is set and non-empty.
    pub fn with_env_overrides(self) -> Self {
        self.with_backend_override(std::env::var(BACKEND_URL_ENV).ok())
    }

    fn with_backend_override(mut self, value: Option<String>) -> Self {
        match value.map(|v| v.trim().to_string()) {
            Some(url) if !url.is_empty() => {
                info!("{BACKEND_URL_ENV} set, using backend {url}");
                self.backend.url = Some(url);
            }
            Some(_) => warn!("{BACKEND_URL_ENV} is empty, ignoring"),
            None => {}
        }
        self
    }

    /// Resolved backend base url.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let raw = match &self.backend.url {
            Some(url) => url.clone(),
            None => format!(
                "http://{}:{}",
                self.backend.loopback.host(),
                self.backend.port
            ),
        };
        let url = Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl {
            url: raw.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
            return Err(ConfigError::InvalidUrl {
                url: raw,
                reason: "expected an http(s) base url".into(),
            });
        }
        Ok(url)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.backend.timeout_secs)
    }
}
