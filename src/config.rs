use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable overriding the role cache timeout.
pub const CACHE_TIMEOUT_ENV: &str = "COURSE_AUTHZ_CACHE_TIMEOUT_MS";

/// Evaluator settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvaluatorConfig {
    /// How long a role's grant list is reused before the store is queried again.
    pub cache_timeout_ms: u64,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self { cache_timeout_ms: 5 * 60 * 1000 }
    }
}

impl EvaluatorConfig {
    /// Defaults overlaid with the environment. Unparseable values are ignored.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(ms) = std::env::var(CACHE_TIMEOUT_ENV).ok().and_then(|v| v.trim().parse::<u64>().ok()) {
            cfg.cache_timeout_ms = ms;
        }
        cfg
    }

    pub fn with_cache_timeout(mut self, timeout: Duration) -> Self {
        self.cache_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn cache_timeout(&self) -> Duration { Duration::from_millis(self.cache_timeout_ms) }
}
