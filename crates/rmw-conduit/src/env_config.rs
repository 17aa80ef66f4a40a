// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Environment variable configuration for rmw_conduit.
//!
//! - `CONDUIT_DOMAIN_ID`: domain joined by every node (default: 0, or
//!   `ROS_DOMAIN_ID` if set)
//! - `CONDUIT_LOG_LEVEL`: logging level (default: "info")
//! - `CONDUIT_WAIT_POLL_MS`: longest single transport wait inside `wait`
//!   before the deadline is re-checked (default: 1000)
//! - `CONDUIT_MAX_HANDLES`: capacity of each handle table (default: 4096)
//!
//! # Example
//!
//! ```bash
//! export CONDUIT_DOMAIN_ID=42
//! export CONDUIT_LOG_LEVEL=debug
//! export CONDUIT_WAIT_POLL_MS=100
//! ```

use std::env;
use std::time::Duration;

/// Environment variable names
pub const ENV_DOMAIN_ID: &str = "CONDUIT_DOMAIN_ID";
pub const ENV_LOG_LEVEL: &str = "CONDUIT_LOG_LEVEL";
pub const ENV_WAIT_POLL_MS: &str = "CONDUIT_WAIT_POLL_MS";
pub const ENV_MAX_HANDLES: &str = "CONDUIT_MAX_HANDLES";

/// ROS 2 environment variable for domain ID (fallback)
pub const ENV_ROS_DOMAIN_ID: &str = "ROS_DOMAIN_ID";

/// Default transport wait slice.
pub const DEFAULT_WAIT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default number of live handles per resource kind.
pub const DEFAULT_MAX_HANDLES: usize = 4096;

/// Runtime configuration from environment variables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvConfig {
    /// Domain ID (0-232)
    pub domain_id: u32,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Longest single transport wait; `wait` re-checks its deadline after
    /// each slice.
    pub wait_poll_interval: Duration,

    /// Capacity of each handle table; creation beyond it fails with
    /// `ResourceExhausted`.
    pub max_handles: usize,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            domain_id: 0,
            log_level: "info".to_string(),
            wait_poll_interval: DEFAULT_WAIT_POLL_INTERVAL,
            max_handles: DEFAULT_MAX_HANDLES,
        }
    }
}

impl EnvConfig {
    /// Load configuration from environment variables
    ///
    /// Priority for domain ID:
    /// 1. CONDUIT_DOMAIN_ID
    /// 2. ROS_DOMAIN_ID
    /// 3. Default (0)
    ///
    /// Unparsable values fall back to their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let domain_id = env::var(ENV_DOMAIN_ID)
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .or_else(|| {
                env::var(ENV_ROS_DOMAIN_ID)
                    .ok()
                    .and_then(|s| s.parse::<u32>().ok())
            })
            .unwrap_or(0);

        let log_level = env::var(ENV_LOG_LEVEL)
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "info".to_string());

        let wait_poll_interval = env::var(ENV_WAIT_POLL_MS)
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_WAIT_POLL_INTERVAL);

        let max_handles = env::var(ENV_MAX_HANDLES)
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_MAX_HANDLES);

        Self {
            domain_id,
            log_level,
            wait_poll_interval,
            max_handles,
        }
    }

    /// Same configuration on another domain.
    #[must_use]
    pub fn with_domain_id(mut self, domain_id: u32) -> Self {
        self.domain_id = domain_id;
        self
    }

    /// Check if any custom configuration was provided
    #[must_use]
    pub fn is_custom(&self) -> bool {
        self != &Self::default()
    }

    /// Apply log level to the logging subsystem
    pub fn apply_log_level(&self) {
        if let Err(e) = env::var("RUST_LOG") {
            // Only set if RUST_LOG is not already set
            if e == env::VarError::NotPresent {
                env::set_var("RUST_LOG", &self.log_level);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::{const_mutex, Mutex};

    // Tests below mutate process-wide variables.
    static ENV_LOCK: Mutex<()> = const_mutex(());

    fn with_vars<R>(vars: &[(&str, Option<&str>)], body: impl FnOnce() -> R) -> R {
        let _guard = ENV_LOCK.lock();
        let saved: Vec<(String, Option<String>)> = vars
            .iter()
            .map(|(name, _)| (name.to_string(), env::var(name).ok()))
            .collect();
        for (name, value) in vars {
            match value {
                Some(value) => env::set_var(name, value),
                None => env::remove_var(name),
            }
        }

        let result = body();

        for (name, value) in saved {
            match value {
                Some(value) => env::set_var(&name, value),
                None => env::remove_var(&name),
            }
        }
        result
    }

    #[test]
    fn test_default_config() {
        let config = EnvConfig::default();
        assert_eq!(config.domain_id, 0);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.wait_poll_interval, Duration::from_millis(1000));
        assert_eq!(config.max_handles, 4096);
        assert!(!config.is_custom());
    }

    #[test]
    fn test_from_env_with_conduit_domain_id() {
        let config = with_vars(
            &[(ENV_DOMAIN_ID, Some("42")), (ENV_ROS_DOMAIN_ID, Some("99"))],
            EnvConfig::from_env,
        );
        assert_eq!(config.domain_id, 42);
    }

    #[test]
    fn test_from_env_fallback_to_ros_domain_id() {
        let config = with_vars(
            &[(ENV_DOMAIN_ID, None), (ENV_ROS_DOMAIN_ID, Some("77"))],
            EnvConfig::from_env,
        );
        assert_eq!(config.domain_id, 77);
    }

    #[test]
    fn test_from_env_wait_and_handles() {
        let config = with_vars(
            &[
                (ENV_WAIT_POLL_MS, Some("25")),
                (ENV_MAX_HANDLES, Some("8")),
            ],
            EnvConfig::from_env,
        );
        assert_eq!(config.wait_poll_interval, Duration::from_millis(25));
        assert_eq!(config.max_handles, 8);
    }

    #[test]
    fn test_from_env_rejects_zero_and_garbage() {
        let config = with_vars(
            &[
                (ENV_WAIT_POLL_MS, Some("0")),
                (ENV_MAX_HANDLES, Some("many")),
                (ENV_LOG_LEVEL, Some("")),
            ],
            EnvConfig::from_env,
        );
        assert_eq!(config.wait_poll_interval, DEFAULT_WAIT_POLL_INTERVAL);
        assert_eq!(config.max_handles, DEFAULT_MAX_HANDLES);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_context_from_env_applies_log_level() {
        let rust_log = with_vars(
            &[
                ("RUST_LOG", None),
                (ENV_LOG_LEVEL, Some("debug")),
                (ENV_DOMAIN_ID, Some("206")),
            ],
            || {
                let ctx = crate::RmwContext::from_env().expect("Failed to create context");
                assert_eq!(ctx.config().domain_id, 206);
                env::var("RUST_LOG").ok()
            },
        );
        assert_eq!(rust_log.as_deref(), Some("debug"));
    }

    #[test]
    fn test_context_from_env_keeps_existing_rust_log() {
        let rust_log = with_vars(
            &[
                ("RUST_LOG", Some("warn")),
                (ENV_LOG_LEVEL, Some("trace")),
                (ENV_DOMAIN_ID, Some("207")),
            ],
            || {
                crate::RmwContext::from_env().expect("Failed to create context");
                env::var("RUST_LOG").ok()
            },
        );
        assert_eq!(rust_log.as_deref(), Some("warn"));
    }

    #[test]
    fn test_is_custom() {
        let mut config = EnvConfig::default();
        assert!(!config.is_custom());

        config = config.with_domain_id(1);
        assert!(config.is_custom());

        config.domain_id = 0;
        config.wait_poll_interval = Duration::from_millis(10);
        assert!(config.is_custom());
    }
}
