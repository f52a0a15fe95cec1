use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use translator_logging::{client_info, LogDestination};
use translator_remote::{ChannelSettings, GatewaySettings};

/// Looked up in the working directory when no `--config` is given.
pub const CONFIG_FILENAME: &str = "translator.ron";
pub const API_BASE_ENV: &str = "TRANSLATOR_API_BASE";
pub const WS_BASE_ENV: &str = "TRANSLATOR_WS_BASE";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("invalid {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

/// Settings for one client process. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub api_base: String,
    pub ws_base: String,
    pub keepalive_secs: u64,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub max_download_bytes: u64,
    pub preferences_dir: PathBuf,
    /// `terminal`, `file` or `both`.
    pub log_destination: String,
    pub log_file: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        let gateway = GatewaySettings::default();
        let channel = ChannelSettings::default();
        Self {
            api_base: gateway.api_base,
            ws_base: channel.ws_base,
            keepalive_secs: channel.keepalive_interval.as_secs(),
            connect_timeout_secs: gateway.connect_timeout.as_secs(),
            request_timeout_secs: gateway.request_timeout.as_secs(),
            max_download_bytes: gateway.max_download_bytes,
            preferences_dir: PathBuf::from(".translator"),
            log_destination: "terminal".to_string(),
            log_file: translator_logging::default_log_file(),
        }
    }
}

/// Values given on the command line. They win over the file and the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_base: Option<String>,
    pub ws_base: Option<String>,
    pub preferences_dir: Option<PathBuf>,
    pub log_destination: Option<String>,
}

impl AppConfig {
    /// File (explicit path, else `translator.ron` if present), then environment, then `overrides`.
    pub fn load(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(CONFIG_FILENAME).is_file() => {
                Self::from_file(Path::new(CONFIG_FILENAME))?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.apply_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_ron(&text).map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })?;
        client_info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    pub fn from_ron(text: &str) -> Result<Self, String> {
        ron::from_str(text).map_err(|err| err.to_string())
    }

    /// Applies `TRANSLATOR_API_BASE` / `TRANSLATOR_WS_BASE` as returned by `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        if let Some(api_base) = non_empty(API_BASE_ENV) {
            self.api_base = api_base;
        }
        if let Some(ws_base) = non_empty(WS_BASE_ENV) {
            self.ws_base = ws_base;
        }
    }

    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(api_base) = &overrides.api_base {
            self.api_base = api_base.clone();
        }
        if let Some(ws_base) = &overrides.ws_base {
            self.ws_base = ws_base.clone();
        }
        if let Some(dir) = &overrides.preferences_dir {
            self.preferences_dir = dir.clone();
        }
        if let Some(destination) = &overrides.log_destination {
            self.log_destination = destination.clone();
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.api_base.starts_with("http://") || self.api_base.starts_with("https://")) {
            return Err(invalid(
                "api_base",
                format!("expected an http(s) url, got {:?}", self.api_base),
            ));
        }
        if !(self.ws_base.starts_with("ws://") || self.ws_base.starts_with("wss://")) {
            return Err(invalid(
                "ws_base",
                format!("expected a ws(s) url, got {:?}", self.ws_base),
            ));
        }
        if self.keepalive_secs == 0 {
            return Err(invalid("keepalive_secs", "must be greater than zero".to_string()));
        }
        if self.request_timeout_secs == 0 || self.connect_timeout_secs == 0 {
            return Err(invalid("timeout", "must be greater than zero".to_string()));
        }
        if LogDestination::parse(&self.log_destination).is_none() {
            return Err(invalid(
                "log_destination",
                format!("expected terminal, file or both, got {:?}", self.log_destination),
            ));
        }
        Ok(())
    }

    pub fn log_destination(&self) -> LogDestination {
        LogDestination::parse(&self.log_destination).unwrap_or_default()
    }

    pub fn gateway_settings(&self) -> GatewaySettings {
        GatewaySettings {
            api_base: self.api_base.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            max_download_bytes: self.max_download_bytes,
        }
    }

    pub fn channel_settings(&self) -> ChannelSettings {
        ChannelSettings {
            ws_base: self.ws_base.clone(),
            keepalive_interval: Duration::from_secs(self.keepalive_secs),
        }
    }
}

fn invalid(field: &'static str, message: String) -> ConfigError {
    ConfigError::Invalid { field, message }
}
