use serde::{Deserialize, Serialize};
use std::path::Path;

use super::errors::ConfigError;
use super::host::HostConfig;
use super::proxy::ProxyConfig;

/// Overrides `host.resolv_conf_path`, mainly for rootless setups and tests.
pub const HOST_RESOLV_CONF_ENV: &str = "NSRESOLV_HOST_RESOLV_CONF";

/// Engine configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub host: HostConfig,

    #[serde(default)]
    pub proxy: ProxyConfig,
}

impl EngineConfig {
    /// Load configuration from file or use defaults
    ///
    /// Priority order:
    /// 1. Explicitly provided path
    /// 2. nsresolv.toml in current directory
    /// 3. /etc/nsresolv/config.toml
    /// 4. Default configuration
    ///
    /// The `NSRESOLV_HOST_RESOLV_CONF` environment variable wins over the
    /// file for the host resolver path.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = path {
            Self::from_file(path)?
        } else if Path::new("nsresolv.toml").exists() {
            Self::from_file("nsresolv.toml")?
        } else if Path::new("/etc/nsresolv/config.toml").exists() {
            Self::from_file("/etc/nsresolv/config.toml")?
        } else {
            Self::default()
        };

        config.apply_host_path_override(std::env::var(HOST_RESOLV_CONF_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_string(), e.to_string()))?;
        Self::from_toml(&contents)
    }

    pub fn apply_host_path_override(&mut self, path: Option<String>) {
        if let Some(path) = path.filter(|p| !p.trim().is_empty()) {
            self.host.resolv_conf_path = path;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.resolv_conf_path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "host.resolv_conf_path cannot be empty".to_string(),
            ));
        }
        if self.host.poll_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "host.poll_interval_secs must be greater than 0".to_string(),
            ));
        }
        if self.proxy.upstream_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "proxy.upstream_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.proxy.tcp_idle_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "proxy.tcp_idle_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.proxy.cache_max_entries == 0 {
            return Err(ConfigError::Validation(
                "proxy.cache_max_entries must be greater than 0".to_string(),
            ));
        }
        if self.proxy.upstream_port == 0 {
            return Err(ConfigError::Validation(
                "proxy.upstream_port cannot be 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn save(&self, path: &str) -> Result<(), ConfigError> {
        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Parse(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, toml_string)
            .map_err(|e| ConfigError::FileWrite(path.to_string(), e.to_string()))?;
        Ok(())
    }
}
