//! Relay Configuration

use serde::{Deserialize, Serialize};

/// Configuration for a stats relay instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Intake channel capacity; a full channel blocks producers (default: 1024)
    pub channel_capacity: usize,
    /// Time-to-live applied to every written key, in seconds (default: 7200)
    pub stats_ttl_secs: u64,
}

impl Default for StatsConfig {
    fn default() -> Self {
        StatsConfig {
            channel_capacity: 1024,
            stats_ttl_secs: 7200, // 2 hours
        }
    }
}

impl StatsConfig {
    /// Configuration for testing (small intake so backpressure is reachable)
    pub fn test() -> Self {
        StatsConfig {
            channel_capacity: 16,
            stats_ttl_secs: 7200,
        }
    }

    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset or unparsable.
    ///
    /// - `STATS_RELAY_CHANNEL_CAPACITY`
    /// - `STATS_RELAY_TTL_SECS`
    pub fn from_env() -> Self {
        let defaults = StatsConfig::default();
        StatsConfig {
            channel_capacity: std::env::var("STATS_RELAY_CHANNEL_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.channel_capacity),
            stats_ttl_secs: std::env::var("STATS_RELAY_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.stats_ttl_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StatsConfig::default();
        assert_eq!(config.channel_capacity, 1024);
        assert_eq!(config.stats_ttl_secs, 7200);
    }

    #[test]
    fn test_test_config() {
        let config = StatsConfig::test();
        assert_eq!(config.channel_capacity, 16);
    }

    #[test]
    fn test_config_serialization() {
        let config = StatsConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: StatsConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, parsed);
    }
}
