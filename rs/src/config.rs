//! Scheduler configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Scheduler configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Max concurrent in-flight requests
    #[serde(rename = "max-concurrent", default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Requests between mandatory cooldown pauses (0 disables cooldowns)
    #[serde(rename = "requests-per-cooldown", default = "default_requests_per_cooldown")]
    pub requests_per_cooldown: u32,

    /// Cooldown pause in milliseconds
    #[serde(rename = "cooldown-ms", default = "default_cooldown_ms")]
    pub cooldown_ms: u64,

    /// Max requests per rate window (0 means unlimited)
    #[serde(rename = "max-requests-per-window", default)]
    pub max_requests_per_window: u32,

    /// Rate limit window duration in seconds
    #[serde(rename = "rate-window-secs", default = "default_rate_window_secs")]
    pub rate_window_secs: u64,

    /// Retry budget per request
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Backoff unit in milliseconds, scaled by the retry count
    #[serde(rename = "retry-backoff-ms", default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

fn default_max_concurrent() -> usize {
    6
}

fn default_requests_per_cooldown() -> u32 {
    40
}

fn default_cooldown_ms() -> u64 {
    5_000
}

fn default_rate_window_secs() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1_000
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            requests_per_cooldown: default_requests_per_cooldown(),
            cooldown_ms: default_cooldown_ms(),
            max_requests_per_window: 0,
            rate_window_secs: default_rate_window_secs(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl SchedulerConfig {
    /// Number of dispatch slots; a zero setting still allows one request at a time
    pub fn slots(&self) -> usize {
        self.max_concurrent.max(1)
    }

    /// Get the cooldown pause as a Duration
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    /// Requests between cooldowns, or None when cooldowns are disabled
    pub fn cooldown_every(&self) -> Option<u32> {
        (self.requests_per_cooldown > 0).then_some(self.requests_per_cooldown)
    }

    /// Get the rate window as a Duration
    pub fn rate_window(&self) -> Duration {
        Duration::from_secs(self.rate_window_secs)
    }

    /// Per-window dispatch cap, or None when the rate window is unlimited
    pub fn window_limit(&self) -> Option<u32> {
        (self.max_requests_per_window > 0 && self.rate_window_secs > 0).then_some(self.max_requests_per_window)
    }

    /// Get the retry backoff unit as a Duration
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SchedulerConfig::default();
        assert_eq!(config.max_concurrent, 6);
        assert_eq!(config.requests_per_cooldown, 40);
        assert_eq!(config.cooldown_ms, 5_000);
        assert_eq!(config.max_requests_per_window, 0);
        assert_eq!(config.rate_window_secs, 60);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_backoff_ms, 1_000);
    }

    #[test]
    fn test_durations() {
        let config = SchedulerConfig {
            cooldown_ms: 250,
            rate_window_secs: 120,
            retry_backoff_ms: 40,
            ..Default::default()
        };
        assert_eq!(config.cooldown(), Duration::from_millis(250));
        assert_eq!(config.rate_window(), Duration::from_secs(120));
        assert_eq!(config.retry_backoff(), Duration::from_millis(40));
    }

    #[test]
    fn test_zero_means_unlimited() {
        let config = SchedulerConfig {
            max_concurrent: 0,
            requests_per_cooldown: 0,
            max_requests_per_window: 0,
            ..Default::default()
        };
        assert_eq!(config.slots(), 1);
        assert_eq!(config.cooldown_every(), None);
        assert_eq!(config.window_limit(), None);

        let config = SchedulerConfig {
            max_requests_per_window: 10,
            rate_window_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.window_limit(), None);
    }

    #[test]
    fn test_parse_yaml_with_defaults() {
        let yaml = "max-concurrent: 2\nmax-requests-per-window: 100\ncooldown-ms: 0\n";
        let config: SchedulerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.max_concurrent, 2);
        assert_eq!(config.window_limit(), Some(100));
        assert_eq!(config.cooldown_ms, 0);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.rate_window_secs, 60);
    }
}
