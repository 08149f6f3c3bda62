//! Node configuration.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::Result;
use crate::protocol::wire::MAX_BODY_LENGTH;

/// Tunables for one node. Every field has a working default, so a config
/// file only needs the entries it changes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Dispatch and send attempts allowed per message before it is dropped.
    pub retry_attempts: u32,
    /// Stream I/O block size in bytes.
    pub block_size: usize,
    /// Largest frame body in either direction. A request claiming more
    /// tears the connection down; a response serializing to more is
    /// reported as an internal error.
    pub max_body_length: u16,
    /// How long shutdown waits after broadcasting the shutting-down
    /// notification before closing connections.
    pub shutdown_grace_ms: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            retry_attempts: 5,
            block_size: 512,
            max_body_length: MAX_BODY_LENGTH,
            shutdown_grace_ms: 1000,
        }
    }
}

impl NodeConfig {
    /// Loads a config from a JSON file; missing fields take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// The shutdown grace period as a [`Duration`].
    #[inline]
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_sane() {
        let config = NodeConfig::default();
        assert_eq!(config.retry_attempts, 5);
        assert_eq!(config.block_size, 512);
        assert_eq!(config.max_body_length, MAX_BODY_LENGTH);
        assert_eq!(config.shutdown_grace(), Duration::from_millis(1000));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: NodeConfig = serde_json::from_str(r#"{"retry_attempts": 2}"#).unwrap();
        assert_eq!(config.retry_attempts, 2);
        assert_eq!(config.block_size, 512);
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"block_size": 64, "shutdown_grace_ms": 10}}"#).unwrap();

        let config = NodeConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.block_size, 64);
        assert_eq!(config.shutdown_grace_ms, 10);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        assert!(NodeConfig::from_json_file("/nonexistent/node.json").is_err());
    }
}
