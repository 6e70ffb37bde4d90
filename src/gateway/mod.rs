//! Authorization gateway client.
//!
//! [`FiscalGateway`] is the seam the emission workflow talks through;
//! [`HttpGateway`] implements it over HTTPS. Responses are interpreted
//! into [`GatewayResponse`] before anyone else sees them.
//!
//! # Example
//!
//! ```no_run
//! use emissao::core::*;
//! use emissao::gateway::*;
//!
//! # async fn run() -> Result<(), GatewayError> {
//! let gateway = HttpGateway::new(GatewayConfig::from_env()?)?;
//! let credentials = IssuerCredentials::new(Environment::Sandbox, Credential::new("token"));
//! match gateway.status(&credentials, "doc-1_1718452800000_ab12cd").await? {
//!     GatewayResponse::Accepted(ack) => println!("{}", ack.status.as_str()),
//!     GatewayResponse::Rejected(failure) => println!("{}", failure.reason()),
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod error;
mod http;
mod response;

pub use client::{AssetKind, FiscalGateway, IssuerCredentials};
pub use config::{
    ConfigError, DEFAULT_PRODUCTION_URL, DEFAULT_SANDBOX_URL, DEFAULT_TIMEOUT_SECS, GatewayConfig,
};
pub(crate) use config::env_parse;
pub use error::GatewayError;
pub use http::HttpGateway;
pub use response::{
    Acknowledgment, DUPLICATE_SEFAZ_CODE, Failure, GatewayResponse, GatewayStatus,
    MAX_DIAGNOSTIC_CHARS, ParseError, truncate_diagnostic,
};
