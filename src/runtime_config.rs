//! # Runtime Configuration Module
//!
//! The runtime configuration module provides environment variable-based configuration
//! for coercion behavior.
//!
//! ## Overview
//!
//! This module loads configuration from environment variables that affect:
//! - Walker cache behavior
//! - Error reporting detail
//!
//! ## Environment Variables
//!
//! ### `COAX_WALKER_CACHE`
//!
//! Enables or disables the compiled walker cache. Accepts `on`/`off`,
//! `true`/`false`, `1`/`0`.
//!
//! Default: `on`
//!
//! A disabled cache compiles a fresh walker on every lookup, which is useful
//! when measuring compilation cost or bisecting cache-related behavior.
//!
//! ### `COAX_MAX_VIOLATIONS`
//!
//! Caps how many schema violations a single coercion error carries. Deeply
//! broken payloads (a 10,000 element array of the wrong type) can otherwise
//! produce one violation per element. Zero is treated as unset.
//!
//! Default: `16`
//!
//! ### `COAX_SNAPSHOT_BODY`
//!
//! When `off`, the request snapshot embedded in coercion errors omits the
//! request body. Worth switching off when bodies are large or carry data
//! that must not reach logs.
//!
//! Default: `on`
//!
//! ## Usage
//!
//! ```rust
//! use coax::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! println!("walker cache enabled: {}", config.walker_cache);
//! ```
//!
//! ## Example Configuration
//!
//! ```bash
//! # Disable the walker cache and keep request bodies out of error snapshots
//! export COAX_WALKER_CACHE=off
//! export COAX_SNAPSHOT_BODY=off
//!
//! # Start your service
//! cargo run
//! ```

use once_cell::sync::Lazy;
use std::env;

const DEFAULT_MAX_VIOLATIONS: usize = 16;

static GLOBAL: Lazy<RuntimeConfig> = Lazy::new(RuntimeConfig::from_env);

/// Runtime configuration loaded from environment variables.
///
/// Load this at startup using [`RuntimeConfig::from_env()`], or rely on
/// [`RuntimeConfig::global()`] which reads the environment once on first use.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeConfig {
    /// Whether compiled walkers are cached and shared (default: true)
    pub walker_cache: bool,
    /// Maximum schema violations carried per coercion error (default: 16)
    pub max_violations: usize,
    /// Whether error snapshots include the request body (default: true)
    pub snapshot_body: bool,
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let max_violations = match env::var("COAX_MAX_VIOLATIONS") {
            Ok(val) => val
                .parse()
                .ok()
                .filter(|&n| n > 0)
                .unwrap_or(DEFAULT_MAX_VIOLATIONS),
            Err(_) => DEFAULT_MAX_VIOLATIONS,
        };
        RuntimeConfig {
            walker_cache: env_flag("COAX_WALKER_CACHE", true),
            max_violations,
            snapshot_body: env_flag("COAX_SNAPSHOT_BODY", true),
        }
    }

    /// Process-wide configuration, read from the environment once on first use.
    #[must_use]
    pub fn global() -> &'static RuntimeConfig {
        &GLOBAL
    }
}

/// Parse an on/off style flag, falling back to `default` when the variable is
/// unset or holds an unrecognized value.
fn env_flag(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(val) => match val.to_ascii_lowercase().as_str() {
            "on" | "true" | "1" => true,
            "off" | "false" | "0" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_flag_values() {
        // Unique variable names so parallel tests cannot interfere.
        env::set_var("COAX_TEST_FLAG_ON", "on");
        env::set_var("COAX_TEST_FLAG_TRUE", "TRUE");
        env::set_var("COAX_TEST_FLAG_ONE", "1");
        env::set_var("COAX_TEST_FLAG_OFF", "off");
        env::set_var("COAX_TEST_FLAG_FALSE", "False");
        env::set_var("COAX_TEST_FLAG_ZERO", "0");
        env::set_var("COAX_TEST_FLAG_JUNK", "maybe");

        assert!(env_flag("COAX_TEST_FLAG_ON", false));
        assert!(env_flag("COAX_TEST_FLAG_TRUE", false));
        assert!(env_flag("COAX_TEST_FLAG_ONE", false));
        assert!(!env_flag("COAX_TEST_FLAG_OFF", true));
        assert!(!env_flag("COAX_TEST_FLAG_FALSE", true));
        assert!(!env_flag("COAX_TEST_FLAG_ZERO", true));
        assert!(env_flag("COAX_TEST_FLAG_JUNK", true));
        assert!(!env_flag("COAX_TEST_FLAG_JUNK", false));
        assert!(env_flag("COAX_TEST_FLAG_UNSET", true));

        for name in [
            "COAX_TEST_FLAG_ON",
            "COAX_TEST_FLAG_TRUE",
            "COAX_TEST_FLAG_ONE",
            "COAX_TEST_FLAG_OFF",
            "COAX_TEST_FLAG_FALSE",
            "COAX_TEST_FLAG_ZERO",
            "COAX_TEST_FLAG_JUNK",
        ] {
            env::remove_var(name);
        }
    }

    #[test]
    fn test_from_env() {
        // Single test covers defaults and overrides so the shared variables
        // are only touched from one thread.
        env::remove_var("COAX_WALKER_CACHE");
        env::remove_var("COAX_MAX_VIOLATIONS");
        env::remove_var("COAX_SNAPSHOT_BODY");

        let defaults = RuntimeConfig::from_env();
        assert!(defaults.walker_cache);
        assert_eq!(defaults.max_violations, 16);
        assert!(defaults.snapshot_body);

        env::set_var("COAX_WALKER_CACHE", "off");
        env::set_var("COAX_MAX_VIOLATIONS", "3");
        env::set_var("COAX_SNAPSHOT_BODY", "off");
        let overridden = RuntimeConfig::from_env();
        assert!(!overridden.walker_cache);
        assert_eq!(overridden.max_violations, 3);
        assert!(!overridden.snapshot_body);

        // Zero and garbage fall back to the default cap.
        env::set_var("COAX_MAX_VIOLATIONS", "0");
        assert_eq!(RuntimeConfig::from_env().max_violations, 16);
        env::set_var("COAX_MAX_VIOLATIONS", "lots");
        assert_eq!(RuntimeConfig::from_env().max_violations, 16);

        env::remove_var("COAX_WALKER_CACHE");
        env::remove_var("COAX_MAX_VIOLATIONS");
        env::remove_var("COAX_SNAPSHOT_BODY");
    }
}
