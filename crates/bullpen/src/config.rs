//! Server settings read from the environment.

use std::time::Duration;

use bullpen_room::RoomConfig;

/// Default listen address.
pub const DEFAULT_BIND: &str = "0.0.0.0:5000";

/// Default time without any inbound frame before a connection is dropped.
pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Default inbound frame limit (1 MiB), large enough for short voice clips.
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 1024 * 1024;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable was set to something unusable.
    #[error("invalid {key}={value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Everything the binary needs to start a server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
    pub room: RoomConfig,
    pub connection_timeout: Duration,
    pub max_message_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            room: RoomConfig::default(),
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
        }
    }
}

impl ServerConfig {
    /// Reads the configuration from `BULLPEN_*` environment variables.
    ///
    /// | Variable                          | Default        |
    /// |-----------------------------------|----------------|
    /// | `BULLPEN_BIND`                    | `0.0.0.0:5000` |
    /// | `BULLPEN_ROOM_IDLE_SECS`          | unset (never)  |
    /// | `BULLPEN_CONNECTION_TIMEOUT_SECS` | `30`           |
    /// | `BULLPEN_MAX_MESSAGE_BYTES`       | `1048576`      |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through
    /// `lookup` instead.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(bind) = lookup("BULLPEN_BIND") {
            if bind.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    key: "BULLPEN_BIND",
                    value: bind,
                    reason: "must not be empty".into(),
                });
            }
            config.bind = bind;
        }

        if let Some(secs) = parse_positive(&lookup, "BULLPEN_ROOM_IDLE_SECS")? {
            config.room.idle_timeout = Some(Duration::from_secs(secs));
        }
        if let Some(secs) = parse_positive(&lookup, "BULLPEN_CONNECTION_TIMEOUT_SECS")? {
            config.connection_timeout = Duration::from_secs(secs);
        }
        if let Some(bytes) = parse_positive(&lookup, "BULLPEN_MAX_MESSAGE_BYTES")? {
            config.max_message_bytes = usize::try_from(bytes).map_err(|e| ConfigError::Invalid {
                key: "BULLPEN_MAX_MESSAGE_BYTES",
                value: bytes.to_string(),
                reason: e.to_string(),
            })?;
        }

        Ok(config)
    }
}

fn parse_positive(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<u64>, ConfigError> {
    let Some(value) = lookup(key) else {
        return Ok(None);
    };
    match value.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::Invalid {
            key,
            value,
            reason: "must be greater than zero".into(),
        }),
        Ok(n) => Ok(Some(n)),
        Err(e) => Err(ConfigError::Invalid {
            key,
            value,
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_from_lookup_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bind, "0.0.0.0:5000");
        assert!(config.room.idle_timeout.is_none());
        assert_eq!(config.connection_timeout, Duration::from_secs(30));
        assert_eq!(config.max_message_bytes, 1024 * 1024);
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("BULLPEN_BIND", "127.0.0.1:9000"),
            ("BULLPEN_ROOM_IDLE_SECS", "600"),
            ("BULLPEN_CONNECTION_TIMEOUT_SECS", " 45 "),
            ("BULLPEN_MAX_MESSAGE_BYTES", "2048"),
        ]))
        .unwrap();
        assert_eq!(config.bind, "127.0.0.1:9000");
        assert_eq!(config.room.idle_timeout, Some(Duration::from_secs(600)));
        assert_eq!(config.connection_timeout, Duration::from_secs(45));
        assert_eq!(config.max_message_bytes, 2048);
    }

    #[test]
    fn test_from_lookup_rejects_garbage_and_zero() {
        let err = ServerConfig::from_lookup(lookup(&[("BULLPEN_ROOM_IDLE_SECS", "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains("BULLPEN_ROOM_IDLE_SECS"));

        let err = ServerConfig::from_lookup(lookup(&[("BULLPEN_MAX_MESSAGE_BYTES", "0")]))
            .unwrap_err();
        assert!(err.to_string().contains("greater than zero"));

        assert!(ServerConfig::from_lookup(lookup(&[("BULLPEN_BIND", "  ")])).is_err());
    }
}
