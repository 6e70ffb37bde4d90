//! Gateway response model.
//!
//! The gateway answers every call with a loosely typed JSON object. It is
//! parsed into a private wire struct and then into [`GatewayResponse`]:
//! either an acknowledgment carrying a processing status, or a failure
//! carrying the gateway's error code and messages.

use serde::{Deserialize, Deserializer, Serialize};

use crate::core::{Artifacts, DocumentNumber, DocumentStatus};

/// SEFAZ status code for "duplicate NF-e with a different access key".
pub const DUPLICATE_SEFAZ_CODE: u16 = 539;

/// Upper bound on persisted diagnostic text.
pub const MAX_DIAGNOSTIC_CHARS: usize = 500;

/// Truncate diagnostic text to [`MAX_DIAGNOSTIC_CHARS`] characters.
pub fn truncate_diagnostic(raw: &str) -> String {
    raw.chars().take(MAX_DIAGNOSTIC_CHARS).collect()
}

/// Processing status reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GatewayStatus {
    /// `processando_autorizacao`
    Processing,
    /// `autorizado`
    Authorized,
    /// `cancelado`
    Cancelled,
    /// `erro_autorizacao`
    AuthorizationError,
    /// `denegado`
    Denied,
    /// `erro_cancelamento`
    CancellationError,
    /// Anything else; treated as still processing.
    Other(String),
}

impl GatewayStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "processando_autorizacao" => Self::Processing,
            "autorizado" => Self::Authorized,
            "cancelado" => Self::Cancelled,
            "erro_autorizacao" => Self::AuthorizationError,
            "denegado" => Self::Denied,
            "erro_cancelamento" => Self::CancellationError,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Processing => "processando_autorizacao",
            Self::Authorized => "autorizado",
            Self::Cancelled => "cancelado",
            Self::AuthorizationError => "erro_autorizacao",
            Self::Denied => "denegado",
            Self::CancellationError => "erro_cancelamento",
            Self::Other(s) => s,
        }
    }

    /// Lifecycle status this gateway status maps to.
    ///
    /// A failed cancellation leaves the document authorized.
    pub fn document_status(&self) -> DocumentStatus {
        match self {
            Self::Processing | Self::Other(_) => DocumentStatus::Processing,
            Self::Authorized | Self::CancellationError => DocumentStatus::Authorized,
            Self::Cancelled => DocumentStatus::Cancelled,
            Self::AuthorizationError => DocumentStatus::ErrorAuthorization,
            Self::Denied => DocumentStatus::Rejected,
        }
    }
}

/// A response carrying a processing status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acknowledgment {
    /// Reference echoed by the gateway.
    pub reference: Option<String>,
    pub status: GatewayStatus,
    pub artifacts: Artifacts,
    /// `status_sefaz`
    pub sefaz_code: Option<u16>,
    /// `mensagem_sefaz`
    pub sefaz_message: Option<String>,
    /// Event XML of a cancellation or correction letter.
    pub event_xml_url: Option<String>,
    /// Sequence number of a correction letter.
    pub correction_sequence: Option<u32>,
}

impl Acknowledgment {
    pub fn is_duplicate(&self) -> bool {
        self.sefaz_code == Some(DUPLICATE_SEFAZ_CODE)
    }

    pub fn document_status(&self) -> DocumentStatus {
        self.status.document_status()
    }

    /// SEFAZ message, prefixed with its code when known.
    pub fn reason(&self) -> Option<String> {
        let message = self.sefaz_message.as_deref().map(str::trim)?;
        Some(match self.sefaz_code {
            Some(code) => format!("{code}: {message}"),
            None => message.to_string(),
        })
    }
}

/// A business failure reported by the gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    /// HTTP status of the response.
    pub http_status: u16,
    /// `codigo`, e.g. `requisicao_invalida`, `nfe_nao_autorizada`.
    pub error_code: Option<String>,
    /// `mensagem`
    pub message: Option<String>,
    /// `status_sefaz`
    pub sefaz_code: Option<u16>,
    /// `mensagem_sefaz`
    pub sefaz_message: Option<String>,
}

impl Failure {
    pub fn is_duplicate(&self) -> bool {
        self.sefaz_code == Some(DUPLICATE_SEFAZ_CODE)
    }

    /// Most specific reason available: SEFAZ message, gateway message, code.
    pub fn reason(&self) -> String {
        let text = self
            .sefaz_message
            .as_deref()
            .or(self.message.as_deref())
            .or(self.error_code.as_deref())
            .unwrap_or("rejected without a message");
        let text = match self.sefaz_code {
            Some(code) => format!("{code}: {}", text.trim()),
            None => text.trim().to_string(),
        };
        truncate_diagnostic(&text)
    }
}

/// Interpreted gateway response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GatewayResponse {
    Accepted(Acknowledgment),
    Rejected(Failure),
}

/// Why a body could not be interpreted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct ParseError {
    pub reason: String,
}

impl GatewayResponse {
    /// Interpret a response body.
    ///
    /// Server errors and non-JSON bodies are not gateway answers and fail
    /// here; the caller treats them as transport failures.
    pub fn parse(http_status: u16, body: &str) -> Result<Self, ParseError> {
        if http_status >= 500 {
            return Err(ParseError {
                reason: format!("server error HTTP {http_status}"),
            });
        }

        let wire: WireResponse = serde_json::from_str(body).map_err(|e| ParseError {
            reason: format!("not a JSON object: {e}"),
        })?;

        if let Some(status) = wire.status.as_deref().filter(|s| !s.trim().is_empty()) {
            let status = GatewayStatus::parse(status);
            return Ok(Self::Accepted(Acknowledgment {
                reference: wire.reference,
                status,
                artifacts: Artifacts {
                    authorization_key: wire
                        .chave_nfe
                        .or(wire.chave)
                        .as_deref()
                        .map(normalize_access_key),
                    protocol: wire.protocolo,
                    numbering: numbering(wire.serie.as_deref(), wire.numero.as_deref()),
                    xml_url: wire.caminho_xml_nota_fiscal,
                    rendition_url: wire.caminho_danfe,
                },
                sefaz_code: wire.status_sefaz,
                sefaz_message: wire.mensagem_sefaz,
                event_xml_url: wire.caminho_xml_cancelamento.or(wire.caminho_xml_carta_correcao),
                correction_sequence: wire
                    .numero_carta_correcao
                    .as_deref()
                    .and_then(|n| n.trim().parse().ok()),
            }));
        }

        if wire.codigo.is_some() || wire.mensagem.is_some() || wire.status_sefaz.is_some() {
            return Ok(Self::Rejected(Failure {
                http_status,
                error_code: wire.codigo,
                message: wire.mensagem,
                sefaz_code: wire.status_sefaz,
                sefaz_message: wire.mensagem_sefaz,
            }));
        }

        Err(ParseError {
            reason: "response has neither a status nor an error code".into(),
        })
    }
}

/// Strip the `NFe` prefix some responses carry on the access key.
fn normalize_access_key(raw: &str) -> String {
    let raw = raw.trim();
    raw.strip_prefix("NFe").unwrap_or(raw).to_string()
}

fn numbering(series: Option<&str>, number: Option<&str>) -> Option<DocumentNumber> {
    Some(DocumentNumber {
        series: series?.trim().parse().ok()?,
        number: number?.trim().parse().ok()?,
    })
}

#[derive(Debug, Default, Deserialize)]
struct WireResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default, rename = "ref")]
    reference: Option<String>,
    #[serde(default)]
    chave: Option<String>,
    #[serde(default)]
    chave_nfe: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    numero: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    serie: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    protocolo: Option<String>,
    #[serde(default)]
    caminho_xml_nota_fiscal: Option<String>,
    #[serde(default)]
    caminho_danfe: Option<String>,
    #[serde(default)]
    caminho_xml_cancelamento: Option<String>,
    #[serde(default)]
    caminho_xml_carta_correcao: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    numero_carta_correcao: Option<String>,
    #[serde(default)]
    codigo: Option<String>,
    #[serde(default)]
    mensagem: Option<String>,
    #[serde(default)]
    mensagem_sefaz: Option<String>,
    #[serde(default, deserialize_with = "lenient_code")]
    status_sefaz: Option<u16>,
}

/// Accept a string or a number.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// `status_sefaz` arrives as `539` or `"539"`.
fn lenient_code<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_string(deserializer)?.and_then(|s| s.trim().parse().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_processing_acknowledgment() {
        let body = r#"{"cnpj_emitente":"11222333000181","ref":"doc-1_1718452800000_ab12cd","status":"processando_autorizacao"}"#;
        let GatewayResponse::Accepted(ack) = GatewayResponse::parse(202, body).unwrap() else {
            panic!("expected acknowledgment");
        };
        assert_eq!(ack.status, GatewayStatus::Processing);
        assert_eq!(ack.reference.as_deref(), Some("doc-1_1718452800000_ab12cd"));
        assert_eq!(ack.document_status(), DocumentStatus::Processing);
        assert!(!ack.is_duplicate());
    }

    #[test]
    fn parses_authorized_artifacts() {
        let body = r#"{
            "status":"autorizado","status_sefaz":"100","mensagem_sefaz":"Autorizado o uso da NF-e",
            "chave_nfe":"NFe51240611222333000181550010000001231000001234",
            "numero":"123","serie":"1","protocolo":151240000012345,
            "caminho_xml_nota_fiscal":"/arquivos/51240611222333000181550010000001231000001234-nfe.xml",
            "caminho_danfe":"/arquivos/51240611222333000181550010000001231000001234.pdf"
        }"#;
        let GatewayResponse::Accepted(ack) = GatewayResponse::parse(200, body).unwrap() else {
            panic!("expected acknowledgment");
        };
        assert_eq!(ack.sefaz_code, Some(100));
        assert_eq!(
            ack.artifacts.authorization_key.as_deref(),
            Some("51240611222333000181550010000001231000001234")
        );
        assert_eq!(ack.artifacts.protocol.as_deref(), Some("151240000012345"));
        assert_eq!(ack.artifacts.numbering, Some(DocumentNumber { series: 1, number: 123 }));
        assert!(ack.artifacts.rendition_url.as_ref().unwrap().ends_with(".pdf"));
        assert_eq!(ack.reason().as_deref(), Some("100: Autorizado o uso da NF-e"));
    }

    #[test]
    fn duplicate_code_numeric_or_string() {
        for code in ["539", "\"539\""] {
            let body = format!(
                r#"{{"status":"erro_autorizacao","status_sefaz":{code},"mensagem_sefaz":"Rejeicao: Duplicidade de NF-e com diferenca na Chave de Acesso"}}"#
            );
            let GatewayResponse::Accepted(ack) = GatewayResponse::parse(200, &body).unwrap() else {
                panic!("expected acknowledgment");
            };
            assert!(ack.is_duplicate(), "{code}");
            assert_eq!(ack.document_status(), DocumentStatus::ErrorAuthorization);
        }
    }

    #[test]
    fn parses_failure() {
        let body = r#"{"codigo":"requisicao_invalida","mensagem":"CNPJ do emitente não autorizado"}"#;
        let GatewayResponse::Rejected(f) = GatewayResponse::parse(422, body).unwrap() else {
            panic!("expected failure");
        };
        assert_eq!(f.http_status, 422);
        assert_eq!(f.error_code.as_deref(), Some("requisicao_invalida"));
        assert_eq!(f.reason(), "CNPJ do emitente não autorizado");
        assert!(!f.is_duplicate());
    }

    #[test]
    fn failure_with_duplicate_code() {
        let body = r#"{"codigo":"erro_validacao_schema","status_sefaz":539,"mensagem_sefaz":"Duplicidade de NF-e"}"#;
        let GatewayResponse::Rejected(f) = GatewayResponse::parse(400, body).unwrap() else {
            panic!("expected failure");
        };
        assert!(f.is_duplicate());
        assert_eq!(f.reason(), "539: Duplicidade de NF-e");
    }

    #[test]
    fn non_json_and_server_errors_fail() {
        assert!(GatewayResponse::parse(200, "<html>Bad Gateway</html>").is_err());
        assert!(GatewayResponse::parse(502, r#"{"codigo":"erro"}"#).is_err());
        assert!(GatewayResponse::parse(200, "{}").is_err());
        assert!(GatewayResponse::parse(200, "[]").is_err());
    }

    #[test]
    fn unknown_status_keeps_processing() {
        let GatewayResponse::Accepted(ack) =
            GatewayResponse::parse(200, r#"{"status":"em_processamento"}"#).unwrap()
        else {
            panic!("expected acknowledgment");
        };
        assert_eq!(ack.status, GatewayStatus::Other("em_processamento".into()));
        assert_eq!(ack.document_status(), DocumentStatus::Processing);
    }

    #[test]
    fn truncates_on_char_boundaries() {
        let raw = "ç".repeat(600);
        let t = truncate_diagnostic(&raw);
        assert_eq!(t.chars().count(), MAX_DIAGNOSTIC_CHARS);
        assert_eq!(truncate_diagnostic("short"), "short");
    }
}
