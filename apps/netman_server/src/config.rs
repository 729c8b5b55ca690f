//! Configuration loading (§6): an optional YAML file overridden field by
//! field by `NETMAN_`-prefixed environment variables.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8282";
const DEFAULT_INACTIVITY_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetmanConfig {
    pub bind_address: String,
    pub session_inactivity_timeout_secs: u64,
}

impl Default for NetmanConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            session_inactivity_timeout_secs: DEFAULT_INACTIVITY_TIMEOUT_SECS,
        }
    }
}

impl NetmanConfig {
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var("NETMAN_CONFIG_FILE") {
            Ok(path) => {
                let raw = std::fs::read_to_string(&path).with_context(|| format!("reading config file {path}"))?;
                serde_yaml::from_str(&raw).with_context(|| format!("parsing config file {path}"))?
            }
            Err(_) => NetmanConfig::default(),
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(value) = std::env::var("NETMAN_BIND_ADDRESS") {
            self.bind_address = value;
        }
        if let Ok(value) = std::env::var("NETMAN_SESSION_INACTIVITY_TIMEOUT_SECS") {
            self.session_inactivity_timeout_secs =
                value.parse().context("NETMAN_SESSION_INACTIVITY_TIMEOUT_SECS must be an integer")?;
        }
        Ok(())
    }

    pub fn session_inactivity_timeout(&self) -> Duration {
        Duration::from_secs(self.session_inactivity_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = NetmanConfig::default();
        assert_eq!(config.bind_address, DEFAULT_BIND_ADDRESS);
        assert_eq!(config.session_inactivity_timeout(), Duration::from_secs(300));
    }
}
