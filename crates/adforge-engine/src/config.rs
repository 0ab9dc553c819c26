//! Engine configuration.

/// Tunables for the job orchestrator.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Consecutive transient poll failures before a job is failed outright.
    pub poll_retry_limit: u32,
    /// Default page size for org job listings.
    pub list_limit: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_retry_limit: 5,
            list_limit: 50,
        }
    }
}

impl EngineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let poll_retry_limit: u32 = std::env::var("ENGINE_POLL_RETRY_LIMIT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        let list_limit: u32 = std::env::var("ENGINE_LIST_LIMIT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(50);

        Self {
            poll_retry_limit,
            list_limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_retry_limit() {
        assert_eq!(EngineConfig::default().poll_retry_limit, 5);
    }
}
