use std::{path::PathBuf, str::FromStr, time::Duration};

use crate::log_warn;

const ENABLE_LOGS: bool = true;

#[derive(Debug, Clone, PartialEq)]
pub struct TimerConfig {
    pub api_base_url: String,
    pub request_timeout: Duration,
    /// Active-session refresh cadence while a session is believed active.
    pub poll_interval: Duration,
    pub foreground_tick: Duration,
    pub background_tick: Duration,
    /// Wait before re-reading the selection after a switch commits.
    pub settle_delay: Duration,
    pub default_countdown_secs: u64,
    pub store_path: Option<PathBuf>,
    pub debug: bool,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8000/api".to_string(),
            request_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_secs(1),
            foreground_tick: Duration::from_millis(250),
            background_tick: Duration::from_secs(1),
            settle_delay: Duration::from_millis(16),
            default_countdown_secs: 25 * 60,
            store_path: None,
            debug: false,
        }
    }
}

impl TimerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        config.debug = lookup("FOCUSTREE_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        if config.debug {
            config.foreground_tick = Duration::from_millis(100);
        }

        if let Some(url) = lookup("FOCUSTREE_API_URL").filter(|v| !v.trim().is_empty()) {
            config.api_base_url = url;
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "FOCUSTREE_REQUEST_TIMEOUT_SECS") {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "FOCUSTREE_POLL_MS") {
            config.poll_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "FOCUSTREE_TICK_MS") {
            config.foreground_tick = Duration::from_millis(ms);
        }
        if let Some(path) = lookup("FOCUSTREE_STORE_PATH").filter(|v| !v.trim().is_empty()) {
            config.store_path = Some(PathBuf::from(path));
        }

        config
    }
}

/// Zero is rejected along with anything unparseable.
fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T>
where
    T: FromStr + PartialEq + Default,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) if value != T::default() => Some(value),
        _ => {
            log_warn!("Ignoring invalid {}={:?}, using default", key, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn env_overrides_defaults() {
        let config = TimerConfig::from_lookup(lookup_from(&[
            ("FOCUSTREE_API_URL", "http://example.test/api"),
            ("FOCUSTREE_POLL_MS", "500"),
            ("FOCUSTREE_STORE_PATH", "/tmp/selection.json"),
        ]));
        assert_eq!(config.api_base_url, "http://example.test/api");
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert_eq!(config.store_path, Some(PathBuf::from("/tmp/selection.json")));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn debug_flag_speeds_up_the_tick() {
        let config = TimerConfig::from_lookup(lookup_from(&[("FOCUSTREE_DEBUG", "TRUE")]));
        assert!(config.debug);
        assert_eq!(config.foreground_tick, Duration::from_millis(100));
    }

    #[test]
    fn invalid_values_fall_back() {
        let config = TimerConfig::from_lookup(lookup_from(&[
            ("FOCUSTREE_POLL_MS", "soon"),
            ("FOCUSTREE_TICK_MS", "0"),
        ]));
        assert_eq!(config, TimerConfig::default());
    }
}
