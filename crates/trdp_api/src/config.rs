//! Server configuration.

use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;
use trdp_core::{EngineConfig, TrdpConfig};

use crate::error::ConfigError;

/// Default address the API listens on.
pub const DEFAULT_BIND: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8000);

/// Default directory holding scenario and device files.
pub const DEFAULT_CATALOG_DIR: &str = "resources/trdp";

/// Default dashboard page served at `/ui`.
pub const DEFAULT_DASHBOARD: &str = "resources/ui/dashboard.html";

/// Configuration of the automation API server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Socket address to listen on
    pub bind: SocketAddr,
    /// Directory scanned for `*.yaml` scenarios and `*.xml` devices
    pub catalog_dir: PathBuf,
    /// HTML page served at `/ui`; a plain heading is served if it is missing
    pub dashboard: PathBuf,
    /// Application name reported by the TRDP session
    pub application_name: String,
    /// Whether the TRDP session runs with redundancy
    pub redundancy: bool,
    /// Granularity of step delays, in milliseconds
    pub delay_chunk_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let trdp = TrdpConfig::default();
        Self {
            bind: DEFAULT_BIND,
            catalog_dir: PathBuf::from(DEFAULT_CATALOG_DIR),
            dashboard: PathBuf::from(DEFAULT_DASHBOARD),
            application_name: trdp.application_name,
            redundancy: trdp.redundancy,
            delay_chunk_ms: EngineConfig::default().delay_chunk.as_millis() as u64,
        }
    }
}

impl ServerConfig {
    /// Load a configuration file. Missing keys take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!("Loading server config from {:?}", path);

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.application_name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "application_name cannot be empty".to_string(),
            ));
        }
        if self.delay_chunk_ms == 0 {
            return Err(ConfigError::Invalid(
                "delay_chunk_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn bind(mut self, bind: SocketAddr) -> Self {
        self.bind = bind;
        self
    }

    pub fn catalog_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.catalog_dir = dir.into();
        self
    }

    pub fn trdp_config(&self) -> TrdpConfig {
        TrdpConfig::new(self.application_name.clone()).redundancy(self.redundancy)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::default().delay_chunk(Duration::from_millis(self.delay_chunk_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind.to_string(), "127.0.0.1:8000");
        assert_eq!(config.catalog_dir, PathBuf::from("resources/trdp"));
        assert_eq!(config.dashboard, PathBuf::from("resources/ui/dashboard.html"));
        assert_eq!(config.application_name, "trdp-sim");
        assert!(!config.redundancy);
        assert_eq!(config.delay_chunk_ms, 50);
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bind = \"0.0.0.0:9000\"").unwrap();
        writeln!(file, "redundancy = true").unwrap();

        let config = ServerConfig::load(file.path()).unwrap();
        assert_eq!(config.bind.port(), 9000);
        assert!(config.redundancy);
        assert_eq!(config.application_name, "trdp-sim");
        assert!(config.trdp_config().redundancy);
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = 9000").unwrap();

        let err = ServerConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_zero_delay_chunk_is_invalid() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "delay_chunk_ms = 0").unwrap();

        let err = ServerConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = ServerConfig::load("/nonexistent/trdp.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_engine_config_uses_chunk() {
        let config = ServerConfig {
            delay_chunk_ms: 10,
            ..ServerConfig::default()
        };
        assert_eq!(config.engine_config().delay_chunk, Duration::from_millis(10));
    }
}
