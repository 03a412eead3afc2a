use std::time::Duration;

use crate::error::ConfigError;

const DEQUEUE_TIMEOUT_VAR: &str = "PLANQ_DEQUEUE_TIMEOUT_MS";
const STATS_INTERVAL_VAR: &str = "PLANQ_STATS_INTERVAL_MS";
const LOG_LEVEL_VAR: &str = "PLANQ_LOG_LEVEL";

/// Runtime settings for a leader term's queue, applier and stats reporter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanQueueConfig {
    /// How long the applier waits on an empty queue before looping.
    pub dequeue_timeout: Duration,
    /// How often the queue depth is reported.
    pub stats_interval: Duration,
    pub log_level: String,
}

impl Default for PlanQueueConfig {
    fn default() -> Self {
        Self {
            dequeue_timeout: Duration::from_millis(500),
            stats_interval: Duration::from_secs(1),
            log_level: "info".to_string(),
        }
    }
}

impl PlanQueueConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any key lookup; unset keys fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let dequeue_timeout = match lookup(DEQUEUE_TIMEOUT_VAR) {
            Some(value) => parse_millis(DEQUEUE_TIMEOUT_VAR, value)?,
            None => defaults.dequeue_timeout,
        };

        let stats_interval = match lookup(STATS_INTERVAL_VAR) {
            Some(value) => parse_millis(STATS_INTERVAL_VAR, value)?,
            None => defaults.stats_interval,
        };

        let log_level = lookup(LOG_LEVEL_VAR).unwrap_or(defaults.log_level);

        Ok(Self {
            dequeue_timeout,
            stats_interval,
            log_level,
        })
    }
}

/// Parse a positive millisecond count.
fn parse_millis(var: &'static str, value: String) -> Result<Duration, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Ok(Duration::from_millis(ms)),
        _ => Err(ConfigError::Invalid { var, value }),
    }
}

/// Parse a positive count. Zero and non-numeric values are rejected.
pub fn parse_count(var: &'static str, value: String) -> Result<usize, ConfigError> {
    match value.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::Invalid { var, value }),
    }
}

/// Look up `var` and parse it with [`parse_count`], or return `default` when unset.
pub fn count_or<F>(lookup: &F, var: &'static str, default: usize) -> Result<usize, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        Some(value) => parse_count(var, value),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rstest::rstest;

    use super::*;

    fn lookup_in(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = PlanQueueConfig::from_lookup(lookup_in(&[])).unwrap();
        assert_eq!(config, PlanQueueConfig::default());
    }

    #[test]
    fn overrides_are_applied() {
        let config = PlanQueueConfig::from_lookup(lookup_in(&[
            (DEQUEUE_TIMEOUT_VAR, "250"),
            (STATS_INTERVAL_VAR, " 5000 "),
            (LOG_LEVEL_VAR, "debug"),
        ]))
        .unwrap();

        assert_eq!(config.dequeue_timeout, Duration::from_millis(250));
        assert_eq!(config.stats_interval, Duration::from_secs(5));
        assert_eq!(config.log_level, "debug");
    }

    #[rstest]
    #[case("0")]
    #[case("-1")]
    #[case("soon")]
    #[case("")]
    fn invalid_durations_are_rejected(#[case] value: &str) {
        let err = PlanQueueConfig::from_lookup(lookup_in(&[(DEQUEUE_TIMEOUT_VAR, value)]))
            .unwrap_err();
        let ConfigError::Invalid { var, value: got } = err;
        assert_eq!(var, DEQUEUE_TIMEOUT_VAR);
        assert_eq!(got, value);
    }

    #[test]
    fn count_falls_back_when_unset() {
        let lookup = lookup_in(&[("PLANQ_WORKERS", "8")]);
        assert_eq!(count_or(&lookup, "PLANQ_WORKERS", 4).unwrap(), 8);
        assert_eq!(count_or(&lookup, "PLANQ_PLANS_PER_WORKER", 25).unwrap(), 25);
    }

    #[rstest]
    #[case("0")]
    #[case("-3")]
    #[case("many")]
    #[case("1.5")]
    fn invalid_counts_are_rejected(#[case] value: &str) {
        let err = parse_count("PLANQ_WORKERS", value.to_string()).unwrap_err();
        let ConfigError::Invalid { var, value: got } = err;
        assert_eq!(var, "PLANQ_WORKERS");
        assert_eq!(got, value);
    }
}
