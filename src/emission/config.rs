use std::time::Duration;

use serde::Deserialize;

use super::poller::{Backoff, PollPolicy};
use crate::gateway::{ConfigError, env_parse};

/// Emission workflow settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EmissionConfig {
    pub poll: PollPolicy,
    /// Deadline for one gateway call, in milliseconds.
    pub gateway_timeout_ms: u64,
    /// Deadline for one store call, in milliseconds.
    pub store_timeout_ms: u64,
}

impl Default for EmissionConfig {
    fn default() -> Self {
        Self {
            poll: PollPolicy::default(),
            gateway_timeout_ms: 45_000,
            store_timeout_ms: 5_000,
        }
    }
}

impl EmissionConfig {
    /// Load configuration from environment variables, defaulting each one.
    ///
    /// Variables:
    /// - `EMISSAO_POLL_MAX_ATTEMPTS` (default: 20)
    /// - `EMISSAO_POLL_DELAY_MS` (default: 3000)
    /// - `EMISSAO_POLL_BACKOFF`: `fixed` or `linear` (default: fixed)
    /// - `EMISSAO_POLL_BUDGET_MS` (default: unset)
    /// - `EMISSAO_GATEWAY_CALL_TIMEOUT_MS` (default: 45000)
    /// - `EMISSAO_STORE_TIMEOUT_MS` (default: 5000)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let backoff = match std::env::var("EMISSAO_POLL_BACKOFF") {
            Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "fixed" => Backoff::Fixed,
                "linear" => Backoff::Linear,
                other => {
                    return Err(ConfigError::InvalidValue(
                        "EMISSAO_POLL_BACKOFF".into(),
                        format!("expected fixed or linear, got '{other}'"),
                    ));
                }
            },
            Err(_) => defaults.poll.backoff,
        };
        let budget_ms = match std::env::var("EMISSAO_POLL_BUDGET_MS") {
            Ok(_) => Some(env_parse("EMISSAO_POLL_BUDGET_MS", 0u64)?),
            Err(_) => None,
        };

        Ok(Self {
            poll: PollPolicy {
                max_attempts: env_parse("EMISSAO_POLL_MAX_ATTEMPTS", defaults.poll.max_attempts)?,
                delay_ms: env_parse("EMISSAO_POLL_DELAY_MS", defaults.poll.delay_ms)?,
                backoff,
                budget_ms,
            },
            gateway_timeout_ms: env_parse(
                "EMISSAO_GATEWAY_CALL_TIMEOUT_MS",
                defaults.gateway_timeout_ms,
            )?,
            store_timeout_ms: env_parse("EMISSAO_STORE_TIMEOUT_MS", defaults.store_timeout_ms)?,
        })
    }

    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_millis(self.gateway_timeout_ms)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = EmissionConfig::default();
        assert_eq!(cfg.poll.max_attempts, 20);
        assert_eq!(cfg.gateway_timeout(), Duration::from_secs(45));
        assert_eq!(cfg.store_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn partial_deserialization_keeps_defaults() {
        let cfg: EmissionConfig =
            serde_json::from_str(r#"{"poll":{"max_attempts":5,"backoff":"linear"}}"#).unwrap();
        assert_eq!(cfg.poll.max_attempts, 5);
        assert_eq!(cfg.poll.backoff, Backoff::Linear);
        assert_eq!(cfg.poll.delay_ms, 3_000);
        assert_eq!(cfg.store_timeout_ms, 5_000);
    }
}
