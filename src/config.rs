//! Configuration management for the file service
//!
//! Layers built-in defaults, optional config files and `FILE_SERVICE__*`
//! environment overrides. Every value has a default, so the service runs
//! without a config file.

use config::{Config, ConfigBuilder, ConfigError, Environment, File, builder::DefaultState};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Files searched when no explicit path is given. Both are optional.
const CONFIG_PATHS: [&str; 2] = ["configs/config", "/app/configs/config"];

const ENV_PREFIX: &str = "FILE_SERVICE";

/// Complete service configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub server: ServerSection,
    pub storage: StorageSection,
    pub bus: BusSection,
}

/// Synchronous (HTTP) adapter settings
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSection {
    pub bind_address: String,
    pub port: u16,
    /// Mount point of the file routes, e.g. `/api/v1/files`.
    pub route_prefix: String,
    pub max_body_bytes: usize,
    /// How long in-flight requests get after a shutdown signal.
    pub shutdown_grace_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageSection {
    /// Sandbox root, created at startup if absent.
    pub path: String,
}

/// Asynchronous (message bus) adapter settings
#[derive(Debug, Deserialize, Clone)]
pub struct BusSection {
    pub enabled: bool,
    pub url: String,
    /// Subjects are `<prefix>.<operation>`.
    pub subject_prefix: String,
    pub queue_group: String,
}

impl ServiceConfig {
    /// Load from the default search paths with environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Self::defaults()?;
        for path in CONFIG_PATHS {
            builder = builder.add_source(File::with_name(path).required(false));
        }
        Self::finish(builder)
    }

    /// Load from an explicit file (which must exist) with environment overrides.
    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        let builder = Self::defaults()?.add_source(File::with_name(path));
        Self::finish(builder)
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("server.bind_address", "0.0.0.0")?
            .set_default("server.port", 8081_i64)?
            .set_default("server.route_prefix", "/api/v1/files")?
            .set_default("server.max_body_bytes", 16_i64 * 1024 * 1024)?
            .set_default("server.shutdown_grace_secs", 5_i64)?
            .set_default("storage.path", "./data")?
            .set_default("bus.enabled", true)?
            .set_default("bus.url", "nats://127.0.0.1:4222")?
            .set_default("bus.subject_prefix", "file")?
            .set_default("bus.queue_group", "file-service")
    }

    fn finish(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let config: ServiceConfig = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validation for all configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Message("server.port cannot be 0".into()));
        }

        if !self.server.route_prefix.starts_with('/') {
            return Err(ConfigError::Message(
                "server.route_prefix must start with '/'".into(),
            ));
        }

        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::Message(
                "server.max_body_bytes must be greater than 0".into(),
            ));
        }

        if self.storage.path.trim().is_empty() {
            return Err(ConfigError::Message("storage.path cannot be empty".into()));
        }

        let prefix = &self.bus.subject_prefix;
        if prefix.is_empty()
            || prefix.contains(|c: char| c == '*' || c == '>' || c.is_whitespace())
        {
            return Err(ConfigError::Message(format!(
                "bus.subject_prefix is not a literal subject: {prefix:?}"
            )));
        }

        Ok(())
    }
}

impl ServerSection {
    /// Bind address and port as a socket address string
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    /// Route prefix without a trailing slash.
    pub fn prefix(&self) -> &str {
        self.route_prefix.trim_end_matches('/')
    }
}

impl StorageSection {
    pub fn root(&self) -> PathBuf {
        PathBuf::from(&self.path)
    }
}

impl BusSection {
    pub fn subject(&self, operation: &str) -> String {
        format!("{}.{}", self.subject_prefix, operation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn defaults_are_complete() {
        let config = ServiceConfig::finish(ServiceConfig::defaults().unwrap()).unwrap();
        assert_eq!(config.server.port, 8081);
        assert_eq!(config.server.prefix(), "/api/v1/files");
        assert_eq!(config.storage.path, "./data");
        assert_eq!(config.bus.url, "nats://127.0.0.1:4222");
        assert_eq!(config.bus.subject("write"), "file.write");
        assert_eq!(config.server.shutdown_grace(), Duration::from_secs(5));
    }

    #[test]
    fn file_overrides_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("service.toml");
        fs::write(
            &path,
            "[server]\nport = 9100\n\n[storage]\npath = \"/srv/files\"\n\n[bus]\nenabled = false\n",
        )
        .unwrap();

        let config = ServiceConfig::load_from(path.to_str().unwrap()).unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.storage.root(), PathBuf::from("/srv/files"));
        assert!(!config.bus.enabled);
        assert_eq!(config.bus.subject_prefix, "file");
    }

    #[test]
    fn validation_rejects_bad_values() {
        let base = ServiceConfig::finish(ServiceConfig::defaults().unwrap()).unwrap();

        let mut config = base.clone();
        config.server.port = 0;
        assert!(config.validate().is_err());

        let mut config = base.clone();
        config.bus.subject_prefix = "file.*".into();
        assert!(config.validate().is_err());

        let mut config = base.clone();
        config.server.route_prefix = "api".into();
        assert!(config.validate().is_err());

        let mut config = base;
        config.storage.path = " ".into();
        assert!(config.validate().is_err());
    }
}
