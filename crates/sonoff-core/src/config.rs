//! Driver configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Runtime parameters shared by all drivers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Endpoint hosting the relay clusters
    pub endpoint: u8,
    /// How long to wait for a read or write response
    pub request_timeout_ms: u64,
    /// Delay before reading back power-on behavior after a write
    pub verify_delay_ms: u64,
    /// Capacity of the event broadcast channel
    pub event_capacity: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            endpoint: 1,
            request_timeout_ms: 5000,
            verify_delay_ms: 1000,
            event_capacity: 64,
        }
    }
}

impl DriverConfig {
    /// Defaults overridden by `SONOFF_*` environment variables.
    /// Unparseable values are ignored.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(endpoint) = env_parse("SONOFF_ENDPOINT") {
            config.endpoint = endpoint;
        }
        if let Some(timeout) = env_parse("SONOFF_REQUEST_TIMEOUT_MS") {
            config.request_timeout_ms = timeout;
        }
        if let Some(delay) = env_parse("SONOFF_VERIFY_DELAY_MS") {
            config.verify_delay_ms = delay;
        }
        if let Some(capacity) = env_parse("SONOFF_EVENT_CAPACITY") {
            config.event_capacity = capacity;
        }

        config
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    #[must_use]
    pub fn verify_delay(&self) -> Duration {
        Duration::from_millis(self.verify_delay_ms)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring invalid {}={:?}", key, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DriverConfig::default();
        assert_eq!(config.endpoint, 1);
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.verify_delay(), Duration::from_secs(1));
        assert_eq!(config.event_capacity, 64);
    }

    #[test]
    fn test_partial_json() {
        let config: DriverConfig =
            serde_json::from_str(r#"{ "endpoint": 2, "verify_delay_ms": 250 }"#).unwrap();
        assert_eq!(config.endpoint, 2);
        assert_eq!(config.verify_delay_ms, 250);
        assert_eq!(config.request_timeout_ms, 5000);
    }
}
