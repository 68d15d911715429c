/// Server configuration - loaded from environment variables with
/// defaults matching the documented engine behavior
use mailsurge_core::constants::{
    DEFAULT_GLOBAL_CONCURRENCY, DEFAULT_SESSION_CONCURRENCY_CAP, RETRY_BASE_DELAY_MS,
    SESSION_MAX_AGE_HOURS, WORKER_TICK_INTERVAL_MS,
};
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address for the HTTP surface
    pub bind_addr: String,
    /// Sends in flight across all sessions
    pub global_concurrency: usize,
    /// Ceiling on concurrently processing jobs within one session
    pub session_concurrency_cap: usize,
    /// Dispatch loop tick interval in milliseconds
    pub tick_interval_ms: u64,
    /// Base for the per-job retry backoff in milliseconds
    pub retry_base_delay_ms: u64,
    /// Sessions older than this are swept from the store
    pub session_max_age_hours: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3001".to_string(),
            global_concurrency: DEFAULT_GLOBAL_CONCURRENCY,
            session_concurrency_cap: DEFAULT_SESSION_CONCURRENCY_CAP,
            tick_interval_ms: WORKER_TICK_INTERVAL_MS,
            retry_base_delay_ms: RETRY_BASE_DELAY_MS,
            session_max_age_hours: SESSION_MAX_AGE_HOURS,
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

impl ServerConfig {
    /// Reads `MAILSURGE_*` variables, falling back to defaults for
    /// anything unset or unparseable
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: std::env::var("MAILSURGE_BIND").unwrap_or(defaults.bind_addr),
            global_concurrency: env_or("MAILSURGE_GLOBAL_CONCURRENCY", defaults.global_concurrency),
            session_concurrency_cap: env_or(
                "MAILSURGE_SESSION_CONCURRENCY_CAP",
                defaults.session_concurrency_cap,
            ),
            tick_interval_ms: env_or("MAILSURGE_TICK_INTERVAL_MS", defaults.tick_interval_ms),
            retry_base_delay_ms: env_or(
                "MAILSURGE_RETRY_BASE_DELAY_MS",
                defaults.retry_base_delay_ms,
            ),
            session_max_age_hours: env_or(
                "MAILSURGE_SESSION_MAX_AGE_HOURS",
                defaults.session_max_age_hours,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.global_concurrency, 3);
        assert_eq!(config.session_concurrency_cap, 2);
        assert_eq!(config.tick_interval_ms, 1000);
        assert_eq!(config.retry_base_delay_ms, 5000);
        assert_eq!(config.session_max_age_hours, 24);
    }

    #[test]
    fn test_env_or_falls_back_on_garbage() {
        // SAFETY: test-local variable, no concurrent reader cares
        unsafe { std::env::set_var("MAILSURGE_TEST_GARBAGE", "not-a-number") };
        assert_eq!(env_or("MAILSURGE_TEST_GARBAGE", 7usize), 7);
        assert_eq!(env_or("MAILSURGE_TEST_UNSET", 9usize), 9);
    }
}
