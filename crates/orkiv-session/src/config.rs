//! Session configuration loaded from environment variables.
//!
//! Every setting has a default so a session can start with zero
//! configuration.

use std::time::Duration;

use orkiv_shared::constants::{
    DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_DISCONNECT_GRACE_MS, DEFAULT_EVENT_BUFFER,
    DEFAULT_SEND_TIMEOUT_SECS,
};
use orkiv_shared::Show;

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Upper bound for the connect + authenticate + roster handshake.
    /// Env: `ORKIV_CONNECT_TIMEOUT_SECS`
    /// Default: `30`
    pub connect_timeout: Duration,

    /// Upper bound for handing one message or presence to the transport.
    /// Env: `ORKIV_SEND_TIMEOUT_SECS`
    /// Default: `10`
    pub send_timeout: Duration,

    /// How long `disconnect` waits for the transport to close.
    /// Env: `ORKIV_DISCONNECT_GRACE_MS`
    /// Default: `2000`
    pub disconnect_grace: Duration,

    /// Capacity of the transport event channel and the subscriber channel.
    /// Env: `ORKIV_EVENT_BUFFER`
    /// Default: `256`
    pub event_buffer: usize,

    /// Presence announced once the roster is in.
    /// Env: `ORKIV_INITIAL_SHOW`
    /// Default: `available`
    pub initial_show: Show,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            send_timeout: Duration::from_secs(DEFAULT_SEND_TIMEOUT_SECS),
            disconnect_grace: Duration::from_millis(DEFAULT_DISCONNECT_GRACE_MS),
            event_buffer: DEFAULT_EVENT_BUFFER,
            initial_show: Show::Available,
        }
    }
}

impl SessionConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(val) = lookup("ORKIV_CONNECT_TIMEOUT_SECS") {
            match val.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.connect_timeout = Duration::from_secs(secs),
                _ => tracing::warn!(
                    value = %val,
                    "Invalid ORKIV_CONNECT_TIMEOUT_SECS, using default"
                ),
            }
        }

        if let Some(val) = lookup("ORKIV_SEND_TIMEOUT_SECS") {
            match val.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.send_timeout = Duration::from_secs(secs),
                _ => tracing::warn!(value = %val, "Invalid ORKIV_SEND_TIMEOUT_SECS, using default"),
            }
        }

        if let Some(val) = lookup("ORKIV_DISCONNECT_GRACE_MS") {
            match val.trim().parse::<u64>() {
                Ok(ms) => config.disconnect_grace = Duration::from_millis(ms),
                Err(_) => tracing::warn!(
                    value = %val,
                    "Invalid ORKIV_DISCONNECT_GRACE_MS, using default"
                ),
            }
        }

        if let Some(val) = lookup("ORKIV_EVENT_BUFFER") {
            // tokio channels panic on a zero capacity
            match val.trim().parse::<usize>() {
                Ok(n) if n > 0 => config.event_buffer = n,
                _ => tracing::warn!(value = %val, "Invalid ORKIV_EVENT_BUFFER, using default"),
            }
        }

        if let Some(val) = lookup("ORKIV_INITIAL_SHOW") {
            match val.parse::<Show>() {
                Ok(Show::Offline) | Err(_) => tracing::warn!(
                    value = %val,
                    "Invalid ORKIV_INITIAL_SHOW, using default"
                ),
                Ok(show) => config.initial_show = show,
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
        assert_eq!(config.send_timeout, Duration::from_secs(10));
        assert_eq!(config.disconnect_grace, Duration::from_millis(2000));
        assert_eq!(config.event_buffer, 256);
        assert_eq!(config.initial_show, Show::Available);
    }

    #[test]
    fn test_overrides() {
        let config = SessionConfig::from_lookup(lookup_from(&[
            ("ORKIV_CONNECT_TIMEOUT_SECS", "5"),
            ("ORKIV_SEND_TIMEOUT_SECS", "3"),
            ("ORKIV_DISCONNECT_GRACE_MS", "250"),
            ("ORKIV_EVENT_BUFFER", "16"),
            ("ORKIV_INITIAL_SHOW", "dnd"),
        ]));
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.send_timeout, Duration::from_secs(3));
        assert_eq!(config.disconnect_grace, Duration::from_millis(250));
        assert_eq!(config.event_buffer, 16);
        assert_eq!(config.initial_show, Show::Dnd);
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let config = SessionConfig::from_lookup(lookup_from(&[
            ("ORKIV_CONNECT_TIMEOUT_SECS", "0"),
            ("ORKIV_SEND_TIMEOUT_SECS", "-1"),
            ("ORKIV_EVENT_BUFFER", "lots"),
            ("ORKIV_INITIAL_SHOW", "offline"),
        ]));
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
        assert_eq!(config.send_timeout, Duration::from_secs(10));
        assert_eq!(config.event_buffer, 256);
        assert_eq!(config.initial_show, Show::Available);
    }
}
