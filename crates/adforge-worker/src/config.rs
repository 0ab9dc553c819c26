//! Worker configuration.

use std::time::Duration;

/// Background poller configuration.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Interval between polling sweeps.
    pub poll_interval: Duration,
    /// Maximum vendor polls in flight at once.
    pub max_concurrent_polls: usize,
    /// Active jobs fetched per table per sweep.
    pub batch_size: u32,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            max_concurrent_polls: 8,
            batch_size: 50,
        }
    }
}

impl PollerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let poll_interval_secs: u64 = std::env::var("POLL_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);

        let max_concurrent_polls: usize = std::env::var("MAX_CONCURRENT_POLLS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(8);

        let batch_size: u32 = std::env::var("POLL_BATCH_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(50);

        Self {
            poll_interval: Duration::from_secs(poll_interval_secs),
            max_concurrent_polls,
            batch_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PollerConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(10));
        assert_eq!(config.max_concurrent_polls, 8);
        assert_eq!(config.batch_size, 50);
    }
}
