//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use hearts::{
    GameSettings,
    constants::DEFAULT_POINTS_LIMIT,
    server::{DEFAULT_LOBBY_POLL, HeartsConfig},
};
use std::{
    net::{Ipv4Addr, SocketAddr, SocketAddrV4},
    str::FromStr,
    time::Duration,
};

/// Default server bind address
pub const DEFAULT_BIND: SocketAddr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 6969));

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Points at which the game ends
    pub points_limit: u32,
    /// Whether every fourth round skips passing
    pub hold_rounds: bool,
    /// Idle time before a seat is pinged; `None` waits indefinitely
    pub turn_timeout: Option<Duration>,
    /// Interval between lobby polls
    pub lobby_poll: Duration,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `points_limit_override` - Optional points limit override (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set but can't be parsed, or the
    /// resulting configuration is invalid
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        points_limit_override: Option<u32>,
    ) -> Result<Self, ConfigError> {
        Self::from_lookup(
            |key| std::env::var(key).ok(),
            bind_override,
            points_limit_override,
        )
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        bind_override: Option<SocketAddr>,
        points_limit_override: Option<u32>,
    ) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(bind) => bind,
            None => parse_var_or(&lookup, "SERVER_BIND", DEFAULT_BIND)?,
        };

        let points_limit = match points_limit_override {
            Some(limit) => limit,
            None => parse_var_or(&lookup, "POINTS_LIMIT", DEFAULT_POINTS_LIMIT)?,
        };

        let turn_timeout = match parse_var_or(&lookup, "TURN_TIMEOUT_SECS", 0u64)? {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        let default_poll_ms = DEFAULT_LOBBY_POLL.as_millis() as u64;
        let lobby_poll = Duration::from_millis(parse_var_or(&lookup, "LOBBY_POLL_MS", default_poll_ms)?);

        let config = ServerConfig {
            bind,
            points_limit,
            hold_rounds: parse_var_or(&lookup, "HOLD_ROUNDS", false)?,
            turn_timeout,
            lobby_poll,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration after loading
    ///
    /// # Errors
    ///
    /// Returns the first setting that's out of range
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.points_limit == 0 {
            return Err(ConfigError::Invalid {
                var: "POINTS_LIMIT".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.lobby_poll.is_zero() {
            return Err(ConfigError::Invalid {
                var: "LOBBY_POLL_MS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    pub fn hearts_config(&self) -> HeartsConfig {
        HeartsConfig {
            game: GameSettings::new(self.points_limit, self.hold_rounds, self.turn_timeout),
            lobby_poll: self.lobby_poll,
        }
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Parse a variable if it's set, falling back to `default` when it isn't.
fn parse_var_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var: key.to_string(),
            reason: format!("{value:?}: {e}"),
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned(), None, None)
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.bind, DEFAULT_BIND);
        assert_eq!(config.points_limit, 100);
        assert!(!config.hold_rounds);
        assert_eq!(config.turn_timeout, None);
        assert_eq!(config.lobby_poll, DEFAULT_LOBBY_POLL);
    }

    #[test]
    fn test_env_values() {
        let config = load(&[
            ("SERVER_BIND", "0.0.0.0:7000"),
            ("POINTS_LIMIT", "50"),
            ("HOLD_ROUNDS", "true"),
            ("TURN_TIMEOUT_SECS", "30"),
            ("LOBBY_POLL_MS", "100"),
        ])
        .unwrap();
        assert_eq!(config.bind.port(), 7000);
        assert_eq!(config.points_limit, 50);
        assert!(config.hold_rounds);
        assert_eq!(config.turn_timeout, Some(Duration::from_secs(30)));

        let hearts = config.hearts_config();
        assert_eq!(hearts.game.points_limit, 50);
        assert_eq!(hearts.lobby_poll, Duration::from_millis(100));
    }

    #[test]
    fn test_overrides_win() {
        let bind: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let config = ServerConfig::from_lookup(
            |key| (key == "POINTS_LIMIT").then(|| "5".to_string()),
            Some(bind),
            Some(20),
        )
        .unwrap();
        assert_eq!(config.bind, bind);
        assert_eq!(config.points_limit, 20);
    }

    #[test]
    fn test_unparsable_value() {
        let err = load(&[("POINTS_LIMIT", "lots")]).unwrap_err();
        assert!(err.to_string().contains("POINTS_LIMIT"));
    }

    #[test]
    fn test_config_validation_zero_limit() {
        let err = load(&[("POINTS_LIMIT", "0")]).unwrap_err();
        assert!(err.to_string().contains("Must be greater than 0"));
        assert!(load(&[("LOBBY_POLL_MS", "0")]).is_err());
    }
}
