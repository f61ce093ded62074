/// Runtime configuration, optionally stored under the `trackerConfig` key
use crate::store::Store;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const CONFIG_KEY: &str = "trackerConfig";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TrackerConfig {
    /// Durable key holding the per-day aggregates
    pub storage_key: String,
    /// How often a tracked session checks for a local date change
    pub date_check_secs: u64,
    pub log_level: String,
    pub badge: BadgeConfig,
    pub popup: PopupConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BadgeConfig {
    pub fast_refresh_ms: u64,
    pub slow_refresh_ms: u64,
    /// Total seconds after which the slow cadence applies
    pub slow_after_secs: u64,
    /// Chance that a refresh tick re-evaluates the cadence
    pub cadence_check_probability: f64,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PopupConfig {
    pub items_per_page: usize,
    pub chart_top: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        TrackerConfig {
            storage_key: "siteInfo".to_string(),
            date_check_secs: 30,
            log_level: "info".to_string(),
            badge: BadgeConfig::default(),
            popup: PopupConfig::default(),
        }
    }
}

impl Default for BadgeConfig {
    fn default() -> Self {
        BadgeConfig {
            fast_refresh_ms: 1000,
            slow_refresh_ms: 5000,
            slow_after_secs: 60,
            cadence_check_probability: 0.2,
            color: "#4361ee".to_string(),
        }
    }
}

impl Default for PopupConfig {
    fn default() -> Self {
        PopupConfig {
            items_per_page: 4,
            chart_top: 10,
        }
    }
}

impl TrackerConfig {
    pub fn date_check_interval(&self) -> Duration {
        Duration::from_secs(self.date_check_secs.max(1))
    }

    pub fn log_level(&self) -> log::Level {
        self.log_level.parse().unwrap_or(log::Level::Info)
    }

    /// Read the config from the store, falling back to defaults when it is
    /// missing, unreadable or malformed
    pub async fn load<S: Store>(store: &S) -> TrackerConfig {
        match store.get(CONFIG_KEY).await {
            Ok(Some(value)) => serde_json::from_value(value).unwrap_or_else(|e| {
                log::warn!("Ignoring malformed {}: {}", CONFIG_KEY, e);
                TrackerConfig::default()
            }),
            Ok(None) => TrackerConfig::default(),
            Err(e) => {
                log::warn!("Could not read {}: {}", CONFIG_KEY, e);
                TrackerConfig::default()
            }
        }
    }
}

impl BadgeConfig {
    pub fn fast_refresh(&self) -> Duration {
        Duration::from_millis(self.fast_refresh_ms)
    }

    pub fn slow_refresh(&self) -> Duration {
        Duration::from_millis(self.slow_refresh_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStore;
    use futures::executor::block_on;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let config = TrackerConfig::default();

        assert_eq!(config.storage_key, "siteInfo");
        assert_eq!(config.date_check_interval(), Duration::from_secs(30));
        assert_eq!(config.badge.fast_refresh(), Duration::from_secs(1));
        assert_eq!(config.badge.slow_refresh(), Duration::from_secs(5));
        assert_eq!(config.popup.items_per_page, 4);
        assert_eq!(config.log_level(), log::Level::Info);
    }

    #[test]
    fn test_partial_config_keeps_other_defaults() {
        let config: TrackerConfig =
            serde_json::from_value(json!({"dateCheckSecs": 10, "badge": {"color": "#000000"}})).unwrap();

        assert_eq!(config.date_check_secs, 10);
        assert_eq!(config.badge.color, "#000000");
        assert_eq!(config.badge.slow_after_secs, 60);
        assert_eq!(config.storage_key, "siteInfo");
    }

    #[test]
    fn test_unknown_log_level_falls_back_to_info() {
        let config = TrackerConfig {
            log_level: "chatty".to_string(),
            ..TrackerConfig::default()
        };
        assert_eq!(config.log_level(), log::Level::Info);
    }

    #[test]
    fn test_load_missing_and_malformed() {
        let store = MemoryStore::new();
        assert_eq!(block_on(TrackerConfig::load(&store)), TrackerConfig::default());

        store.insert(CONFIG_KEY, json!({"dateCheckSecs": "soon"}));
        assert_eq!(block_on(TrackerConfig::load(&store)), TrackerConfig::default());

        store.insert(CONFIG_KEY, json!({"logLevel": "debug"}));
        assert_eq!(block_on(TrackerConfig::load(&store)).log_level(), log::Level::Debug);
    }
}
