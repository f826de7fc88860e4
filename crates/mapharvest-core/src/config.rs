//! Engine configuration.
//!
//! Every timed wait the traversal engine performs is a named field here so it
//! can be tuned independently (and zeroed for deterministic replay). Values
//! load from `MAPHARVEST_`-prefixed environment variables with defaults that
//! match the behavior observed on live result pages.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for environment variable {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

/// Timings, retry budgets, and loop-gating switches for one engine session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Bounded wait for the results feed root to appear before the session
    /// fails. Not retried once exhausted.
    pub feed_wait_timeout: Duration,
    /// Polling interval while waiting for the feed root (and, when pause
    /// gating is enabled, while paused).
    pub feed_poll_interval: Duration,
    /// Settle delay after activating a listing, before the detail panel is
    /// read.
    pub click_settle: Duration,
    /// Settle delay inside the detail extractor for the panel to populate.
    pub extract_settle: Duration,
    /// Settle delay after clicking the back/close control, for the list view
    /// to restore.
    pub close_settle: Duration,
    /// Delay before re-querying after a locator pass found no listings.
    pub no_results_delay: Duration,
    /// Settle delay after scrolling the last listing into view, for
    /// lazy-loaded content to append.
    pub scroll_settle: Duration,
    /// Empty locator passes tolerated before the session fails. Independent
    /// of the scroll budget.
    pub max_empty_retries: u32,
    /// Scroll passes tolerated before the session completes as
    /// end-of-results. Independent of the empty-retry budget.
    pub max_scroll_retries: u32,
    /// When `true` the traversal loop waits at iteration boundaries while the
    /// externally toggled pause flag is set. Defaults to `false`: the flag is
    /// delivered to the session but the loop does not consult it, matching
    /// the behavior observed in the field.
    pub gate_on_pause: bool,
    /// Default log filter for hosts that do not set `RUST_LOG`.
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            feed_wait_timeout: Duration::from_millis(10_000),
            feed_poll_interval: Duration::from_millis(100),
            click_settle: Duration::from_millis(2_500),
            extract_settle: Duration::from_millis(2_000),
            close_settle: Duration::from_millis(1_500),
            no_results_delay: Duration::from_millis(1_500),
            scroll_settle: Duration::from_millis(2_500),
            max_empty_retries: 3,
            max_scroll_retries: 5,
            gate_on_pause: false,
            log_level: "info".to_owned(),
        }
    }
}

impl EngineConfig {
    /// Configuration with every timed wait zeroed.
    ///
    /// Used for offline replay against a recorded page script, where render
    /// settle delays have nothing to wait for, and throughout the test suite.
    /// Retry budgets and gating keep their defaults.
    #[must_use]
    pub fn immediate() -> Self {
        Self {
            feed_wait_timeout: Duration::ZERO,
            feed_poll_interval: Duration::ZERO,
            click_settle: Duration::ZERO,
            extract_settle: Duration::ZERO,
            close_settle: Duration::ZERO,
            no_results_delay: Duration::ZERO,
            scroll_settle: Duration::ZERO,
            ..Self::default()
        }
    }
}

/// Load engine configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env
/// vars.
///
/// # Errors
///
/// Returns `ConfigError` if a variable is present but unparseable.
pub fn load_engine_config() -> Result<EngineConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_engine_config_from_env()
}

/// Load engine configuration from environment variables already in the
/// process.
///
/// Unlike [`load_engine_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a variable is present but unparseable.
pub fn load_engine_config_from_env() -> Result<EngineConfig, ConfigError> {
    build_engine_config(|key| std::env::var(key))
}

/// Build engine configuration using the provided env-var lookup function.
///
/// This is the parsing/validation logic, decoupled from the actual
/// environment so it can be tested with a pure `HashMap` lookup.
fn build_engine_config<F>(lookup: F) -> Result<EngineConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_ms = |var: &str, default: &str| -> Result<Duration, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_bool = |var: &str, default: &str| -> Result<bool, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<bool>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    Ok(EngineConfig {
        feed_wait_timeout: parse_ms("MAPHARVEST_FEED_WAIT_TIMEOUT_MS", "10000")?,
        feed_poll_interval: parse_ms("MAPHARVEST_FEED_POLL_INTERVAL_MS", "100")?,
        click_settle: parse_ms("MAPHARVEST_CLICK_SETTLE_MS", "2500")?,
        extract_settle: parse_ms("MAPHARVEST_EXTRACT_SETTLE_MS", "2000")?,
        close_settle: parse_ms("MAPHARVEST_CLOSE_SETTLE_MS", "1500")?,
        no_results_delay: parse_ms("MAPHARVEST_NO_RESULTS_DELAY_MS", "1500")?,
        scroll_settle: parse_ms("MAPHARVEST_SCROLL_SETTLE_MS", "2500")?,
        max_empty_retries: parse_u32("MAPHARVEST_MAX_EMPTY_RETRIES", "3")?,
        max_scroll_retries: parse_u32("MAPHARVEST_MAX_SCROLL_RETRIES", "5")?,
        gate_on_pause: parse_bool("MAPHARVEST_GATE_ON_PAUSE", "false")?,
        log_level: or_default("MAPHARVEST_LOG_LEVEL", "info"),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::env::VarError;

    use super::*;

    fn lookup_from_map<'a>(
        map: &'a HashMap<&'a str, &'a str>,
    ) -> impl Fn(&str) -> Result<String, VarError> + 'a {
        move |key| {
            map.get(key)
                .map(|v| (*v).to_string())
                .ok_or(VarError::NotPresent)
        }
    }

    #[test]
    fn defaults_apply_with_empty_env() {
        let map: HashMap<&str, &str> = HashMap::new();
        let cfg = build_engine_config(lookup_from_map(&map)).unwrap();
        assert_eq!(cfg, EngineConfig::default());
    }

    #[test]
    fn default_timings_match_observed_page_behavior() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.feed_wait_timeout, Duration::from_secs(10));
        assert_eq!(cfg.feed_poll_interval, Duration::from_millis(100));
        assert_eq!(cfg.click_settle, Duration::from_millis(2500));
        assert_eq!(cfg.extract_settle, Duration::from_millis(2000));
        assert_eq!(cfg.close_settle, Duration::from_millis(1500));
        assert_eq!(cfg.no_results_delay, Duration::from_millis(1500));
        assert_eq!(cfg.scroll_settle, Duration::from_millis(2500));
        assert_eq!(cfg.max_empty_retries, 3);
        assert_eq!(cfg.max_scroll_retries, 5);
        assert!(!cfg.gate_on_pause);
    }

    #[test]
    fn timing_override_applies() {
        let mut map = HashMap::new();
        map.insert("MAPHARVEST_CLICK_SETTLE_MS", "50");
        let cfg = build_engine_config(lookup_from_map(&map)).unwrap();
        assert_eq!(cfg.click_settle, Duration::from_millis(50));
        // Untouched fields keep their defaults.
        assert_eq!(cfg.extract_settle, Duration::from_millis(2000));
    }

    #[test]
    fn invalid_timing_is_rejected() {
        let mut map = HashMap::new();
        map.insert("MAPHARVEST_SCROLL_SETTLE_MS", "not-a-number");
        let result = build_engine_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "MAPHARVEST_SCROLL_SETTLE_MS"),
            "expected InvalidEnvVar(MAPHARVEST_SCROLL_SETTLE_MS), got: {result:?}"
        );
    }

    #[test]
    fn retry_ceiling_override_applies() {
        let mut map = HashMap::new();
        map.insert("MAPHARVEST_MAX_SCROLL_RETRIES", "9");
        let cfg = build_engine_config(lookup_from_map(&map)).unwrap();
        assert_eq!(cfg.max_scroll_retries, 9);
        assert_eq!(cfg.max_empty_retries, 3);
    }

    #[test]
    fn gate_on_pause_parses_true() {
        let mut map = HashMap::new();
        map.insert("MAPHARVEST_GATE_ON_PAUSE", "true");
        let cfg = build_engine_config(lookup_from_map(&map)).unwrap();
        assert!(cfg.gate_on_pause);
    }

    #[test]
    fn gate_on_pause_rejects_non_boolean() {
        let mut map = HashMap::new();
        map.insert("MAPHARVEST_GATE_ON_PAUSE", "yes");
        let result = build_engine_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "MAPHARVEST_GATE_ON_PAUSE"),
            "expected InvalidEnvVar(MAPHARVEST_GATE_ON_PAUSE), got: {result:?}"
        );
    }

    #[test]
    fn immediate_zeroes_every_wait_but_keeps_budgets() {
        let cfg = EngineConfig::immediate();
        assert_eq!(cfg.feed_wait_timeout, Duration::ZERO);
        assert_eq!(cfg.feed_poll_interval, Duration::ZERO);
        assert_eq!(cfg.click_settle, Duration::ZERO);
        assert_eq!(cfg.extract_settle, Duration::ZERO);
        assert_eq!(cfg.close_settle, Duration::ZERO);
        assert_eq!(cfg.no_results_delay, Duration::ZERO);
        assert_eq!(cfg.scroll_settle, Duration::ZERO);
        assert_eq!(cfg.max_empty_retries, 3);
        assert_eq!(cfg.max_scroll_retries, 5);
    }

    #[test]
    fn log_level_override_applies() {
        let mut map = HashMap::new();
        map.insert("MAPHARVEST_LOG_LEVEL", "debug");
        let cfg = build_engine_config(lookup_from_map(&map)).unwrap();
        assert_eq!(cfg.log_level, "debug");
    }
}
