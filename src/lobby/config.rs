//! Engine configuration.
//!
//! Consolidates all tunables with environment variable overrides and
//! validation.

use crate::game::grid::CARD_CELLS;
use std::time::Duration;
use thiserror::Error;

/// Engine tuning for lobby formation and gameplay
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Minimum players required for a game to start
    pub capacity_min: usize,
    /// Maximum players per lobby
    pub capacity_max: usize,
    /// Buy-in charged on join (and credited to the pot)
    pub buy_in_amount: i64,
    /// Numbers are drawn from 1..=max_number
    pub max_number: u8,
    /// How long a lobby accepts joins after the first player arrives
    pub forming_timer: Duration,
    /// Delay between called numbers
    pub call_interval: Duration,
    /// Bounded lifetime of lobby/player records in the store
    pub lobby_ttl: Duration,
    /// Expiry of the start-game lease; must exceed the start path's
    /// worst-case latency
    pub start_lease_ttl: Duration,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            capacity_min: 2,
            capacity_max: 10,
            buy_in_amount: 3500,
            max_number: 50,
            forming_timer: Duration::from_secs(120),
            call_interval: Duration::from_secs(3),
            lobby_ttl: Duration::from_secs(600),
            start_lease_ttl: Duration::from_secs(30),
        }
    }
}

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

impl GameConfig {
    /// Load configuration from environment variables, falling back to the
    /// defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            capacity_min: parse_env_or("LOBBY_CAPACITY_MIN", defaults.capacity_min),
            capacity_max: parse_env_or("LOBBY_CAPACITY_MAX", defaults.capacity_max),
            buy_in_amount: parse_env_or("LOBBY_BUY_IN", defaults.buy_in_amount),
            max_number: parse_env_or("BINGO_MAX_NUMBER", defaults.max_number),
            forming_timer: Duration::from_secs(parse_env_or(
                "LOBBY_FORMING_TIMER_SECS",
                defaults.forming_timer.as_secs(),
            )),
            call_interval: Duration::from_secs(parse_env_or(
                "NUMBER_CALL_INTERVAL_SECS",
                defaults.call_interval.as_secs(),
            )),
            lobby_ttl: Duration::from_secs(parse_env_or(
                "LOBBY_TTL_SECS",
                defaults.lobby_ttl.as_secs(),
            )),
            start_lease_ttl: Duration::from_secs(parse_env_or(
                "START_LEASE_TTL_SECS",
                defaults.start_lease_ttl.as_secs(),
            )),
        }
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity_min < 1 {
            return Err(ConfigError::Invalid {
                var: "LOBBY_CAPACITY_MIN".to_string(),
                reason: "Must be at least 1".to_string(),
            });
        }

        if self.capacity_max < self.capacity_min {
            return Err(ConfigError::Invalid {
                var: "LOBBY_CAPACITY_MAX".to_string(),
                reason: format!("Must be at least the minimum ({})", self.capacity_min),
            });
        }

        if self.buy_in_amount <= 0 {
            return Err(ConfigError::Invalid {
                var: "LOBBY_BUY_IN".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if (self.max_number as usize) < CARD_CELLS {
            return Err(ConfigError::Invalid {
                var: "BINGO_MAX_NUMBER".to_string(),
                reason: format!("Must be at least {CARD_CELLS} (one card of distinct numbers)"),
            });
        }

        if self.forming_timer.is_zero() || self.call_interval.is_zero() {
            return Err(ConfigError::Invalid {
                var: "LOBBY_FORMING_TIMER_SECS".to_string(),
                reason: "Timers must be greater than 0".to_string(),
            });
        }

        if self.start_lease_ttl.is_zero() {
            return Err(ConfigError::Invalid {
                var: "START_LEASE_TTL_SECS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        // The record must outlive the forming phase it was created for.
        if self.lobby_ttl <= self.forming_timer {
            return Err(ConfigError::Invalid {
                var: "LOBBY_TTL_SECS".to_string(),
                reason: format!(
                    "Must exceed the forming timer ({}s)",
                    self.forming_timer.as_secs()
                ),
            });
        }

        Ok(())
    }
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(GameConfig::default().validate().is_ok());
    }

    #[test]
    fn test_capacity_max_below_min_rejected() {
        let config = GameConfig {
            capacity_min: 4,
            capacity_max: 2,
            ..GameConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_zero_buy_in_rejected() {
        let config = GameConfig {
            buy_in_amount: 0,
            ..GameConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_number_range_must_fill_a_card() {
        let config = GameConfig {
            max_number: 8,
            ..GameConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_ttl_must_outlive_forming_timer() {
        let config = GameConfig {
            lobby_ttl: Duration::from_secs(60),
            ..GameConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
