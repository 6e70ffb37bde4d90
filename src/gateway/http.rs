//! reqwest-backed [`FiscalGateway`].
//!
//! - `POST   /v2/nfe?ref={reference}`: submit
//! - `GET    /v2/nfe/{reference}`: status
//! - `DELETE /v2/nfe/{reference}`: cancel, body `{"justificativa": ...}`
//! - `POST   /v2/nfe/{reference}/carta_correcao`: correction, body `{"correcao": ...}`
//!
//! Authentication is HTTP basic with the issuer token as user name.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};
use url::Url;

use super::client::{FiscalGateway, IssuerCredentials};
use super::config::{ConfigError, GatewayConfig};
use super::error::GatewayError;
use super::response::GatewayResponse;
use crate::payload::NfePayload;

/// HTTP client for the authorization gateway.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    config: GatewayConfig,
}

impl HttpGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GatewayError::Transport {
                endpoint: "client".into(),
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    fn url(&self, credentials: &IssuerCredentials, segments: &[&str]) -> Result<Url, GatewayError> {
        let mut url = self.config.base_url(credentials.environment).clone();
        let base = url.to_string();
        url.path_segments_mut()
            .map_err(|_| ConfigError::InvalidUrl(base, "cannot be a base URL".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorized(
        &self,
        request: reqwest::RequestBuilder,
        credentials: &IssuerCredentials,
    ) -> reqwest::RequestBuilder {
        request.basic_auth(credentials.token.expose(), Some(""))
    }

    /// Send a request and interpret the body.
    async fn execute(
        &self,
        operation: &str,
        url: Url,
        request: reqwest::RequestBuilder,
    ) -> Result<GatewayResponse, GatewayError> {
        let endpoint = endpoint_label(&url);
        debug!(operation, endpoint = %endpoint, "sending gateway request");

        let resp = request.send().await.map_err(|e| self.transport_error(operation, &endpoint, e))?;
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| self.transport_error(operation, &endpoint, e))?;

        GatewayResponse::parse(status, &body).map_err(|e| {
            warn!(operation, endpoint = %endpoint, status, "unreadable gateway response: {e}");
            GatewayError::Malformed {
                endpoint,
                status,
                raw: body,
            }
        })
    }

    fn transport_error(&self, operation: &str, endpoint: &str, e: reqwest::Error) -> GatewayError {
        warn!(operation, endpoint, "gateway request failed: {e}");
        if e.is_timeout() {
            GatewayError::Timeout {
                operation: operation.to_string(),
                elapsed_ms: self.config.timeout_secs * 1000,
            }
        } else {
            GatewayError::Transport {
                endpoint: endpoint.to_string(),
                message: e.to_string(),
            }
        }
    }
}

/// URL without query string; references are fine to log, tokens never reach the URL.
fn endpoint_label(url: &Url) -> String {
    let mut label = url.clone();
    label.set_query(None);
    label.to_string()
}

#[async_trait]
impl FiscalGateway for HttpGateway {
    async fn submit(
        &self,
        credentials: &IssuerCredentials,
        reference: &str,
        payload: &NfePayload,
    ) -> Result<GatewayResponse, GatewayError> {
        let mut url = self.url(credentials, &["v2", "nfe"])?;
        url.query_pairs_mut().append_pair("ref", reference);
        let request = self.authorized(self.client.post(url.clone()).json(payload), credentials);
        self.execute("submit", url, request).await
    }

    async fn status(
        &self,
        credentials: &IssuerCredentials,
        reference: &str,
    ) -> Result<GatewayResponse, GatewayError> {
        let url = self.url(credentials, &["v2", "nfe", reference])?;
        let request = self.authorized(self.client.get(url.clone()), credentials);
        self.execute("status", url, request).await
    }

    async fn cancel(
        &self,
        credentials: &IssuerCredentials,
        reference: &str,
        justification: &str,
    ) -> Result<GatewayResponse, GatewayError> {
        let url = self.url(credentials, &["v2", "nfe", reference])?;
        let body = serde_json::json!({ "justificativa": justification });
        let request = self.authorized(self.client.delete(url.clone()).json(&body), credentials);
        self.execute("cancel", url, request).await
    }

    async fn correct(
        &self,
        credentials: &IssuerCredentials,
        reference: &str,
        correction: &str,
    ) -> Result<GatewayResponse, GatewayError> {
        let url = self.url(credentials, &["v2", "nfe", reference, "carta_correcao"])?;
        let body = serde_json::json!({ "correcao": correction });
        let request = self.authorized(self.client.post(url.clone()).json(&body), credentials);
        self.execute("correct", url, request).await
    }

    async fn download(
        &self,
        credentials: &IssuerCredentials,
        location: &str,
    ) -> Result<Vec<u8>, GatewayError> {
        // Paths are relative to the environment's host
        let url = match Url::parse(location) {
            Ok(absolute) => absolute,
            Err(_) => {
                let base = self.config.base_url(credentials.environment);
                base.join(location).map_err(|e| {
                    ConfigError::InvalidUrl(location.to_string(), e.to_string())
                })?
            }
        };
        let endpoint = endpoint_label(&url);
        debug!(endpoint = %endpoint, "downloading gateway asset");

        let resp = self
            .authorized(self.client.get(url), credentials)
            .send()
            .await
            .map_err(|e| self.transport_error("download", &endpoint, e))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(GatewayError::Status {
                endpoint,
                status: status.as_u16(),
            });
        }
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| self.transport_error("download", &endpoint, e))?;
        Ok(bytes.to_vec())
    }
}
