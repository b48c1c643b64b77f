//! Configuration structures.
//!
//! Every section defaults sensibly, so a partial JSON document (or none at all)
//! yields a usable configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::errors::{ErrorKind, Result};

/// Largest message the 16-bit size field of the header can describe.
pub const WIRE_SIZE_LIMIT: usize = u16::MAX as usize;

/// Global configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Wire codec limits.
    #[serde(default)]
    pub wire: WireConfig,

    /// Dispatch policy.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Reference server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Parse a configuration document.
    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }
}

/// Wire codec limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WireConfig {
    /// Maximum encoded message size in bytes, header included.
    pub max_message_size: usize,

    /// Maximum number of file descriptors attached to one message.
    pub max_fds_per_message: usize,
}

impl Default for WireConfig {
    fn default() -> Self {
        Self {
            max_message_size: 4096,
            max_fds_per_message: 28,
        }
    }
}

impl WireConfig {
    /// Effective message size limit, capped by what the header can encode.
    pub fn message_size_limit(&self) -> usize {
        self.max_message_size.min(WIRE_SIZE_LIMIT)
    }
}

/// Dispatch policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Error kinds that terminate the connection. Everything else is logged
    /// and the connection keeps going.
    pub fatal_errors: Vec<ErrorKind>,

    /// Destroyed ids remembered per connection, so late requests to them
    /// report `ObjectDestroyed` instead of `UnknownObject`. Oldest first out.
    pub released_id_capacity: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            fatal_errors: vec![
                ErrorKind::MalformedArgument,
                ErrorKind::MissingDescriptor,
                ErrorKind::UnknownObject,
                ErrorKind::ObjectIdInUse,
                ErrorKind::Io,
            ],
            released_id_capacity: 4096,
        }
    }
}

impl DispatchConfig {
    pub fn is_fatal(&self, kind: ErrorKind) -> bool {
        self.fatal_errors.contains(&kind)
    }
}

/// Reference server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Unix socket path the server listens on.
    pub socket_path: PathBuf,

    /// Maximum concurrent connections. Connections beyond this limit are
    /// refused.
    pub max_connections: usize,

    /// Idle time allowed between two frames before the connection is dropped.
    #[serde(with = "humantime_serde")]
    pub read_timeout: Duration,

    /// Time allowed for one outgoing frame to be written.
    #[serde(with = "humantime_serde")]
    pub write_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from("/tmp/objwire-0"),
            max_connections: 256,
            read_timeout: Duration::from_secs(300),
            write_timeout: Duration::from_secs(10),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Tracing log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable JSON log formatting.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_document_uses_defaults() {
        let config = Config::from_json_str(
            r#"{ "wire": { "max_message_size": 8192 }, "server": { "read_timeout": "2s" } }"#,
        )
        .unwrap();
        assert_eq!(config.wire.max_message_size, 8192);
        assert_eq!(config.wire.max_fds_per_message, 28);
        assert_eq!(config.server.read_timeout, Duration::from_secs(2));
        assert_eq!(config.server.write_timeout, Duration::from_secs(10));
        assert!(config.dispatch.is_fatal(ErrorKind::MalformedArgument));
        assert!(!config.dispatch.is_fatal(ErrorKind::VersionTooLow));
        assert_eq!(config.dispatch.released_id_capacity, 4096);
    }

    #[test]
    fn test_message_size_limit_capped() {
        let wire = WireConfig {
            max_message_size: 1 << 20,
            ..WireConfig::default()
        };
        assert_eq!(wire.message_size_limit(), WIRE_SIZE_LIMIT);
    }

    #[test]
    fn test_invalid_document_is_serialization_error() {
        let err = Config::from_json_str("{ not json").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Serialization);
    }
}
