//! Gateway connection configuration.
//!
//! One base URL per [`Environment`]; defaults point to the public
//! production and homologation hosts. Override through environment
//! variables or explicit construction for tests.

use serde::Deserialize;
use url::Url;

use crate::core::Environment;

/// Default production host.
pub const DEFAULT_PRODUCTION_URL: &str = "https://api.focusnfe.com.br";

/// Default homologation (sandbox) host.
pub const DEFAULT_SANDBOX_URL: &str = "https://homologacao.focusnfe.com.br";

/// Default HTTP request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Where and how the HTTP adapter talks to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GatewayConfig {
    pub production_url: Url,
    pub sandbox_url: Url,
    /// Per-request timeout of the HTTP client.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl GatewayConfig {
    /// Public production and homologation hosts.
    pub fn public() -> Result<Self, ConfigError> {
        Ok(Self {
            production_url: parse_url("production_url", DEFAULT_PRODUCTION_URL)?,
            sandbox_url: parse_url("sandbox_url", DEFAULT_SANDBOX_URL)?,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        })
    }

    /// Route both environments to one base URL (mock servers, proxies).
    pub fn single(base_url: &str) -> Result<Self, ConfigError> {
        let url = parse_url("base_url", base_url)?;
        Ok(Self {
            production_url: url.clone(),
            sandbox_url: url,
            timeout_secs: 5,
        })
    }

    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `EMISSAO_GATEWAY_PRODUCTION_URL` (default: [`DEFAULT_PRODUCTION_URL`])
    /// - `EMISSAO_GATEWAY_SANDBOX_URL` (default: [`DEFAULT_SANDBOX_URL`])
    /// - `EMISSAO_GATEWAY_TIMEOUT_SECS` (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            production_url: env_url("EMISSAO_GATEWAY_PRODUCTION_URL", DEFAULT_PRODUCTION_URL)?,
            sandbox_url: env_url("EMISSAO_GATEWAY_SANDBOX_URL", DEFAULT_SANDBOX_URL)?,
            timeout_secs: env_parse("EMISSAO_GATEWAY_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?,
        })
    }

    /// Base URL of an environment.
    pub fn base_url(&self, environment: Environment) -> &Url {
        match environment {
            Environment::Production => &self.production_url,
            Environment::Sandbox => &self.sandbox_url,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

fn parse_url(name: &str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::InvalidUrl(name.to_string(), e.to_string()))
}

fn env_url(var: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    parse_url(var, &raw)
}

/// Parse an optional variable, falling back to `default` when unset.
pub(crate) fn env_parse<T>(var: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidValue(var.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_hosts() {
        let cfg = GatewayConfig::public().unwrap();
        assert_eq!(
            cfg.base_url(Environment::Production).as_str(),
            "https://api.focusnfe.com.br/"
        );
        assert_eq!(
            cfg.base_url(Environment::Sandbox).as_str(),
            "https://homologacao.focusnfe.com.br/"
        );
        assert_eq!(cfg.timeout_secs, 30);
    }

    #[test]
    fn single_routes_both_environments() {
        let cfg = GatewayConfig::single("http://127.0.0.1:9000").unwrap();
        assert_eq!(cfg.base_url(Environment::Production), cfg.base_url(Environment::Sandbox));
    }

    #[test]
    fn env_url_uses_default_when_var_absent() {
        let url = env_url("EMISSAO_NONEXISTENT_VAR_12345", "https://example.com").unwrap();
        assert_eq!(url.as_str(), "https://example.com/");
    }

    #[test]
    fn rejects_invalid_url() {
        assert!(matches!(
            GatewayConfig::single("not a url"),
            Err(ConfigError::InvalidUrl(..))
        ));
    }

    #[test]
    fn deserializes_with_default_timeout() {
        let cfg: GatewayConfig = serde_json::from_str(
            r#"{"production_url":"https://a.example","sandbox_url":"https://b.example"}"#,
        )
        .unwrap();
        assert_eq!(cfg.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }
}
