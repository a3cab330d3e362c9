//! Server configuration.
//!
//! Loaded from an optional TOML file; every field has a default so an empty
//! file (or no file) yields a working server.
//!
//! ```toml
//! bind = "0.0.0.0:8008"
//! version = "0.1.5"
//! poll_interval_ms = 500
//!
//! [[metrics]]
//! name = "availability"
//! description = "The uptime"
//! type = "Double"
//!
//! [release]
//! version = "0.2.0"
//!
//! [[release.metrics]]
//! name = "user_satisfaction"
//! description = "The user satisfaction"
//! type = "Double"
//! ```

use crate::error::{ServerError, ServerResult};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use versync_core::{Metric, MetricCatalogue, MetricKind, Version};

/// Default listening port.
pub const DEFAULT_PORT: u16 = 8008;

/// Top-level server configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the WebSocket service listens on.
    pub bind: SocketAddr,
    /// Version the server starts at.
    pub version: Version,
    /// Metric catalogue the server starts with.
    pub metrics: MetricCatalogue,
    /// How often the accept loop and connection readers check for shutdown.
    pub poll_interval_ms: u64,
    /// What the "release new version" action adopts.
    pub release: ReleaseConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let mut metrics = MetricCatalogue::defaults();
        metrics.insert(Metric::new(
            "os_name",
            "Operational system name",
            MetricKind::String,
        ));

        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            version: Version::new(0, 1, 5),
            metrics,
            poll_interval_ms: 500,
            release: ReleaseConfig::default(),
        }
    }
}

/// A version the administrator can roll out at runtime.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReleaseConfig {
    pub version: Version,
    /// Metrics added to the catalogue by the release.
    pub metrics: MetricCatalogue,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            version: Version::new(0, 2, 0),
            metrics: [Metric::new(
                "user_satisfaction",
                "The user satisfaction",
                MetricKind::Double,
            )]
            .into_iter()
            .collect(),
        }
    }
}

impl ServerConfig {
    /// Load and validate a TOML config file.
    pub fn load(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ServerError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&text).map_err(|source| ServerError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ServerResult<()> {
        if self.poll_interval_ms == 0 {
            return Err(ServerError::InvalidConfig(
                "poll_interval_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(text: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind.port(), DEFAULT_PORT);
        assert_eq!(config.version.to_string(), "0.1.5");
        assert_eq!(
            config.metrics.names().collect::<Vec<_>>(),
            ["availability", "os_name", "performance"]
        );
        assert_eq!(config.release.version.to_string(), "0.2.0");
        assert!(config.release.metrics.contains("user_satisfaction"));
        assert_eq!(config.poll_interval(), Duration::from_millis(500));
    }

    #[test]
    fn empty_file_is_default() {
        let file = write_config("");
        assert_eq!(ServerConfig::load(file.path()).unwrap(), ServerConfig::default());
    }

    #[test]
    fn partial_file_overrides() {
        let file = write_config(
            r#"
            version = "1.0.0"
            poll_interval_ms = 50

            [[metrics]]
            name = "latency"
            description = "Round trip"
            type = "Integer"

            [release]
            version = "1.1.0"
            "#,
        );
        let config = ServerConfig::load(file.path()).unwrap();
        assert_eq!(config.version, Version::new(1, 0, 0));
        assert_eq!(config.metrics.names().collect::<Vec<_>>(), ["latency"]);
        assert_eq!(config.release.version, Version::new(1, 1, 0));
        assert!(config.release.metrics.contains("user_satisfaction"));
        assert_eq!(config.bind.port(), DEFAULT_PORT);
    }

    #[test]
    fn bad_version_is_a_parse_error() {
        let file = write_config(r#"version = "latest""#);
        assert!(matches!(
            ServerConfig::load(file.path()),
            Err(ServerError::ConfigParse { .. })
        ));
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let file = write_config("poll_interval_ms = 0");
        assert!(matches!(
            ServerConfig::load(file.path()),
            Err(ServerError::InvalidConfig(_))
        ));
    }

    #[test]
    fn missing_file() {
        assert!(matches!(
            ServerConfig::load(Path::new("/nonexistent/versync.toml")),
            Err(ServerError::ConfigRead { .. })
        ));
    }
}
