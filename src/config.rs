// Engine configuration
// Plain structs with defaults; callers may also load them from JSON

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

// How an existing reservation is tested against a requested stay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    // Blocks when the existing arrival or the existing departure falls inside
    // [arrival, departure], both ends inclusive. A reservation that fully
    // contains the requested stay is NOT detected.
    #[default]
    Endpoints,
    // Half-open interval overlap: existing.arrival < departure && existing.departure > arrival
    Interval,
}

// Process-local; it only sees bookings made through the engine that owns it.
// Off by default so several engines or processes can share one database file.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SearchCacheConfig {
    pub enabled: bool,
    pub ttl_seconds: u64,
    pub max_entries: usize,
}

impl Default for SearchCacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ttl_seconds: 30,
            max_entries: 1024,
        }
    }
}

impl SearchCacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    pub booking_id_length: usize,
    pub max_booking_id_attempts: u32,
    pub overlap_policy: OverlapPolicy,
    pub busy_timeout_ms: u64,
    pub search_cache: SearchCacheConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            booking_id_length: 10,
            max_booking_id_attempts: 3,
            overlap_policy: OverlapPolicy::Endpoints,
            busy_timeout_ms: 5000,
            search_cache: SearchCacheConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.booking_id_length == 0 {
            return Err(ConfigError::InvalidValue(
                "booking_id_length must be positive".to_string(),
            ));
        }
        if self.max_booking_id_attempts == 0 {
            return Err(ConfigError::InvalidValue(
                "max_booking_id_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.booking_id_length, 10);
        assert_eq!(config.max_booking_id_attempts, 3);
        assert_eq!(config.overlap_policy, OverlapPolicy::Endpoints);
        assert!(!config.search_cache.enabled);
        assert_eq!(config.busy_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EngineConfig::from_json_str(
            r#"{ "overlap_policy": "interval", "search_cache": { "ttl_seconds": 5 } }"#,
        )
        .unwrap();

        assert_eq!(config.overlap_policy, OverlapPolicy::Interval);
        assert_eq!(config.search_cache.ttl_seconds, 5);
        assert_eq!(config.search_cache.max_entries, 1024);
        assert_eq!(config.booking_id_length, 10);
    }

    #[test]
    fn test_rejects_invalid_values() {
        let result = EngineConfig::from_json_str(r#"{ "booking_id_length": 0 }"#);
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));

        let result = EngineConfig::from_json_str("not json");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        std::fs::write(&path, r#"{ "max_booking_id_attempts": 7 }"#).unwrap();

        let config = EngineConfig::from_json_file(&path).unwrap();
        assert_eq!(config.max_booking_id_attempts, 7);

        let missing = EngineConfig::from_json_file(dir.path().join("missing.json"));
        assert!(matches!(missing, Err(ConfigError::IoError(_))));
    }
}
