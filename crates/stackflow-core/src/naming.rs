//! Environment-derived resource naming
//!
//! Resource names are prefixed with `{env}-{org}-{service}-`, read from the
//! process environment with fixed fallbacks:
//!
//! | variable      | fallback         |
//! |---------------|------------------|
//! | `vpcenv`      | `test`           |
//! | `corpname`    | `samcorp`        |
//! | `servicename` | `albtest`        |
//! | `keypair`     | `sample_keypair` |

use serde::{Deserialize, Serialize};

pub const ENV_VAR: &str = "vpcenv";
pub const ORG_VAR: &str = "corpname";
pub const SERVICE_VAR: &str = "servicename";
pub const KEY_PAIR_VAR: &str = "keypair";

pub const DEFAULT_ENV: &str = "test";
pub const DEFAULT_ORG: &str = "samcorp";
pub const DEFAULT_SERVICE: &str = "albtest";
pub const DEFAULT_KEY_PAIR: &str = "sample_keypair";

/// Naming inputs for a stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamingConfig {
    /// Environment name (test, stg, prod ...)
    pub env: String,

    /// Organization name
    pub org: String,

    /// Service name
    pub service: String,

    /// EC2 key pair attached to instances
    pub key_pair: String,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            env: DEFAULT_ENV.to_string(),
            org: DEFAULT_ORG.to_string(),
            service: DEFAULT_SERVICE.to_string(),
            key_pair: DEFAULT_KEY_PAIR.to_string(),
        }
    }
}

impl NamingConfig {
    /// Read naming from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read naming through `lookup`; `None` falls back to the default.
    /// A variable set to the empty string is taken as-is.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let config = Self {
            env: lookup(ENV_VAR).unwrap_or_else(|| DEFAULT_ENV.to_string()),
            org: lookup(ORG_VAR).unwrap_or_else(|| DEFAULT_ORG.to_string()),
            service: lookup(SERVICE_VAR).unwrap_or_else(|| DEFAULT_SERVICE.to_string()),
            key_pair: lookup(KEY_PAIR_VAR).unwrap_or_else(|| DEFAULT_KEY_PAIR.to_string()),
        };
        tracing::debug!(prefix = %config.prefix(), key_pair = %config.key_pair, "Resolved naming");
        config
    }

    /// `{env}-{org}-{service}-`
    pub fn prefix(&self) -> String {
        format!("{}-{}-{}-", self.env, self.org, self.service)
    }

    /// Prefixed resource name, `{prefix}-{suffix}`
    ///
    /// The prefix already ends in `-`, so names carry a double dash
    /// (`test-samcorp-albtest--vpc`). Deployed resources are named this way.
    pub fn name(&self, suffix: &str) -> String {
        format!("{}-{}", self.prefix(), suffix)
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
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = NamingConfig::from_lookup(|_| None);
        assert_eq!(config, NamingConfig::default());
        assert_eq!(config.prefix(), "test-samcorp-albtest-");
        assert_eq!(config.key_pair, "sample_keypair");
    }

    #[test]
    fn test_every_combination_of_set_and_unset() {
        let values = [(ENV_VAR, "prod"), (ORG_VAR, "acme"), (SERVICE_VAR, "web")];
        let defaults = [DEFAULT_ENV, DEFAULT_ORG, DEFAULT_SERVICE];

        for mask in 0..8u8 {
            let pairs: Vec<(&str, &str)> = values
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, pair)| *pair)
                .collect();
            let config = NamingConfig::from_lookup(lookup_from(&pairs));

            let expected: Vec<&str> = (0..3)
                .map(|i| {
                    if mask & (1 << i) != 0 {
                        values[i].1
                    } else {
                        defaults[i]
                    }
                })
                .collect();
            assert_eq!(
                config.prefix(),
                format!("{}-{}-{}-", expected[0], expected[1], expected[2]),
                "mask {mask:03b}"
            );
        }
    }

    #[test]
    fn test_empty_value_is_kept() {
        let config = NamingConfig::from_lookup(lookup_from(&[(ENV_VAR, "")]));
        assert_eq!(config.prefix(), "-samcorp-albtest-");
    }

    #[test]
    fn test_name_keeps_double_dash() {
        let config = NamingConfig::default();
        assert_eq!(config.name("vpc"), "test-samcorp-albtest--vpc");
    }

    #[test]
    fn test_from_env() {
        temp_env::with_vars(
            [
                (ENV_VAR, Some("stg")),
                (ORG_VAR, None),
                (SERVICE_VAR, Some("shop")),
                (KEY_PAIR_VAR, Some("ops-key")),
            ],
            || {
                let config = NamingConfig::from_env();
                assert_eq!(config.prefix(), "stg-samcorp-shop-");
                assert_eq!(config.key_pair, "ops-key");
            },
        );
    }
}
