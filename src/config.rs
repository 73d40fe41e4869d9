//! # Reconciler Configuration
//!
//! Process-level settings loaded from environment variables.

use crate::controller::budget::RetryBudget;
use std::time::Duration;

/// Reconciler configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcilerConfig {
    /// Region the Global Accelerator client talks to
    pub region: String,
    /// Delay returned with every polling `InProgress` event (seconds)
    pub poll_interval_secs: u64,
    /// Maximum time an operation may spend stabilizing (seconds)
    /// Together with the poll interval this fixes the retry budget
    pub max_stabilization_secs: u64,
    /// Global log level (ERROR, WARN, INFO, DEBUG, TRACE), used when `RUST_LOG` is unset
    pub log_level: String,
    /// Log format (json, text)
    pub log_format: String,
    /// Enable metrics collection
    pub enable_metrics: bool,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        use crate::constants::*;
        Self {
            region: DEFAULT_REGION.to_string(),
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            max_stabilization_secs: DEFAULT_MAX_STABILIZATION_SECS,
            log_level: "INFO".to_string(),
            log_format: "text".to_string(),
            enable_metrics: true,
        }
    }
}

impl ReconcilerConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        use crate::constants::*;
        Self {
            region: env_var_or_default_str("GA_REGION", DEFAULT_REGION),
            poll_interval_secs: env_var_or_default(
                "GA_POLL_INTERVAL_SECS",
                DEFAULT_POLL_INTERVAL_SECS,
            ),
            max_stabilization_secs: env_var_or_default(
                "GA_MAX_STABILIZATION_SECS",
                DEFAULT_MAX_STABILIZATION_SECS,
            ),
            log_level: env_var_or_default_str("LOG_LEVEL", "INFO"),
            log_format: env_var_or_default_str("LOG_FORMAT", "text"),
            enable_metrics: env_var_or_default_bool("ENABLE_METRICS", true),
        }
    }

    /// Get poll interval duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Get maximum stabilization duration
    pub fn max_stabilization(&self) -> Duration {
        Duration::from_secs(self.max_stabilization_secs)
    }

    /// Retry budget derived from the poll interval and maximum wait
    pub fn retry_budget(&self) -> RetryBudget {
        RetryBudget::new(self.poll_interval(), self.max_stabilization())
    }
}

/// Read environment variable or return default value
fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T
where
    <T as std::str::FromStr>::Err: std::fmt::Debug,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Read environment variable as boolean or return default
fn env_var_or_default_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes" | "on"))
        .unwrap_or(default)
}

/// Read environment variable as string or return default
fn env_var_or_default_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_budget_is_four_hours_of_one_second_polls() {
        let config = ReconcilerConfig::default();
        assert_eq!(config.region, "us-west-2");
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.retry_budget().max_retries(), 14_400);
    }

    #[test]
    fn test_budget_follows_configured_interval() {
        let config = ReconcilerConfig {
            poll_interval_secs: 30,
            max_stabilization_secs: 600,
            ..ReconcilerConfig::default()
        };
        assert_eq!(config.retry_budget().max_retries(), 20);
        assert_eq!(config.retry_budget().poll_delay_secs(), 30);
    }

    #[test]
    fn test_env_helpers_fall_back_to_defaults() {
        assert_eq!(
            env_var_or_default("GA_TEST_UNSET_NUMBER_7F3A", 42_u64),
            42
        );
        assert!(env_var_or_default_bool("GA_TEST_UNSET_BOOL_7F3A", true));
        assert_eq!(env_var_or_default_str("GA_TEST_UNSET_STR_7F3A", "x"), "x");
    }
}
