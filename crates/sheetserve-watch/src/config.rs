//! Configuration for session file watching

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tuning for a session watch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Debounce delay for file system events (milliseconds)
    #[serde(default = "default_debounce_delay")]
    pub debounce_delay_ms: u64,

    /// Capacity of the change-event channel; events beyond it are dropped
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

const fn default_debounce_delay() -> u64 {
    250
}

const fn default_channel_capacity() -> usize {
    64
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_delay_ms: default_debounce_delay(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl WatchConfig {
    /// Debounce delay as a [`Duration`]
    #[must_use]
    pub const fn debounce_delay(&self) -> Duration {
        Duration::from_millis(self.debounce_delay_ms)
    }
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = WatchConfig::default();
        assert_eq!(config.debounce_delay_ms, 250);
        assert_eq!(config.channel_capacity, 64);
        assert_eq!(config.debounce_delay(), Duration::from_millis(250));
    }

    #[test]
    fn test_partial_deserialization() {
        let config: WatchConfig = serde_json::from_str(r#"{"debounce_delay_ms": 50}"#).unwrap();
        assert_eq!(config.debounce_delay_ms, 50);
        assert_eq!(config.channel_capacity, 64);
    }
}
