//! Protocol configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the subscription protocol engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubscriptionConfig {
    /// Keep-alive interval in milliseconds. Absent or zero disables the
    /// keep-alive ticker.
    pub keep_alive_interval: Option<u64>,
    /// Maximum concurrent operations per session.
    pub max_operations: usize,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            keep_alive_interval: None,
            max_operations: 100,
        }
    }
}

impl SubscriptionConfig {
    /// Create a config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the keep-alive interval in milliseconds.
    #[must_use]
    pub fn keep_alive_interval(mut self, millis: u64) -> Self {
        self.keep_alive_interval = Some(millis);
        self
    }

    /// Set the maximum concurrent operations per session.
    #[must_use]
    pub fn max_operations(mut self, max: usize) -> Self {
        self.max_operations = max;
        self
    }

    /// Effective keep-alive interval. `None` when disabled.
    #[must_use]
    pub fn keep_alive(&self) -> Option<Duration> {
        self.keep_alive_interval
            .filter(|millis| *millis > 0)
            .map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_disables_keep_alive() {
        let cfg = SubscriptionConfig::default();
        assert!(cfg.keep_alive().is_none());
    }

    #[test]
    fn default_max_operations() {
        let cfg = SubscriptionConfig::default();
        assert_eq!(cfg.max_operations, 100);
    }

    #[test]
    fn builder_sets_interval() {
        let cfg = SubscriptionConfig::new().keep_alive_interval(500);
        assert_eq!(cfg.keep_alive(), Some(Duration::from_millis(500)));
    }

    #[test]
    fn zero_interval_disables_keep_alive() {
        let cfg = SubscriptionConfig::new().keep_alive_interval(0);
        assert!(cfg.keep_alive().is_none());
    }

    #[test]
    fn builder_sets_max_operations() {
        let cfg = SubscriptionConfig::new().max_operations(3);
        assert_eq!(cfg.max_operations, 3);
    }

    #[test]
    fn deserialize_camel_case_wire_names() {
        let cfg: SubscriptionConfig =
            serde_json::from_str(r#"{"keepAliveInterval":500}"#).unwrap();
        assert_eq!(cfg.keep_alive(), Some(Duration::from_millis(500)));
        assert_eq!(cfg.max_operations, 100);
    }

    #[test]
    fn deserialize_null_interval() {
        let cfg: SubscriptionConfig =
            serde_json::from_str(r#"{"keepAliveInterval":null}"#).unwrap();
        assert!(cfg.keep_alive().is_none());
    }

    #[test]
    fn serde_round_trip() {
        let cfg = SubscriptionConfig::new()
            .keep_alive_interval(250)
            .max_operations(8);
        let json = serde_json::to_string(&cfg).unwrap();
        let back: SubscriptionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.keep_alive_interval, Some(250));
        assert_eq!(back.max_operations, 8);
    }
}
