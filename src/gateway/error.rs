//! Gateway error types.

use super::config::ConfigError;
use super::response::truncate_diagnostic;

/// Errors from gateway calls.
///
/// Business rejections are not errors; they arrive as
/// [`GatewayResponse::Rejected`](super::GatewayResponse::Rejected).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum GatewayError {
    /// Connection, TLS or protocol failure.
    #[error("transport error calling {endpoint}: {message}")]
    Transport { endpoint: String, message: String },
    /// The call did not complete in time.
    #[error("gateway {operation} timed out after {elapsed_ms} ms")]
    Timeout { operation: String, elapsed_ms: u64 },
    /// The body could not be interpreted as a gateway response.
    #[error("malformed response from {endpoint} (HTTP {status}): {raw}")]
    Malformed {
        endpoint: String,
        status: u16,
        raw: String,
    },
    /// Non-success status for a binary download.
    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: String, status: u16 },
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl GatewayError {
    /// Diagnostic text to persist as a status reason: the raw body for
    /// malformed responses, the error message otherwise. At most 500 characters.
    pub fn diagnostic(&self) -> String {
        match self {
            Self::Malformed { raw, .. } if !raw.trim().is_empty() => truncate_diagnostic(raw),
            other => truncate_diagnostic(&other.to_string()),
        }
    }
}
