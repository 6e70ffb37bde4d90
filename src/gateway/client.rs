use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::GatewayError;
use super::response::GatewayResponse;
use crate::core::{Credential, Environment, IssuerProfile};
use crate::payload::NfePayload;

/// Environment and token a call is made with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuerCredentials {
    pub environment: Environment,
    pub token: Credential,
}

impl IssuerCredentials {
    pub fn new(environment: Environment, token: Credential) -> Self {
        Self { environment, token }
    }

    pub fn from_profile(issuer: &IssuerProfile) -> Self {
        Self::new(issuer.environment, issuer.credential.clone())
    }
}

/// Downloadable authorization asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    /// Authorized XML.
    Xml,
    /// Human-readable rendition (DANFE PDF).
    Rendition,
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Xml => "xml",
            Self::Rendition => "rendition",
        })
    }
}

/// Third-party authorization gateway.
///
/// Every call is keyed by the caller-chosen reference. Business
/// rejections come back as [`GatewayResponse::Rejected`]; only transport,
/// timeout and parse failures are errors.
#[async_trait]
pub trait FiscalGateway: Send + Sync {
    /// Submit a document under `reference`.
    async fn submit(
        &self,
        credentials: &IssuerCredentials,
        reference: &str,
        payload: &NfePayload,
    ) -> Result<GatewayResponse, GatewayError>;

    /// Query the processing status of `reference`.
    async fn status(
        &self,
        credentials: &IssuerCredentials,
        reference: &str,
    ) -> Result<GatewayResponse, GatewayError>;

    /// Cancel an authorized document.
    async fn cancel(
        &self,
        credentials: &IssuerCredentials,
        reference: &str,
        justification: &str,
    ) -> Result<GatewayResponse, GatewayError>;

    /// Register a correction letter (carta de correção).
    async fn correct(
        &self,
        credentials: &IssuerCredentials,
        reference: &str,
        correction: &str,
    ) -> Result<GatewayResponse, GatewayError>;

    /// Fetch an asset by the path or URL the gateway returned; bytes are unmodified.
    async fn download(
        &self,
        credentials: &IssuerCredentials,
        location: &str,
    ) -> Result<Vec<u8>, GatewayError>;
}
