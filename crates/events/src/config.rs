//! Registry configuration.

use serde::{Deserialize, Serialize};

/// Environment variable read by [`RegistryConfig::from_env`].
pub const SWEEP_INTERVAL_ENV: &str = "TETHER_SWEEP_INTERVAL";

pub const DEFAULT_SWEEP_INTERVAL: u32 = 256;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Registrations between automatic sweeps of dropped targets (`0` = never).
    pub sweep_interval: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl RegistryConfig {
    /// Build from the process environment, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let sweep_interval = match lookup(SWEEP_INTERVAL_ENV) {
            None => DEFAULT_SWEEP_INTERVAL,
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!(
                    value = %raw,
                    "{SWEEP_INTERVAL_ENV} is not a valid u32; using default {DEFAULT_SWEEP_INTERVAL}"
                );
                DEFAULT_SWEEP_INTERVAL
            }),
        };
        Self { sweep_interval }
    }
}
