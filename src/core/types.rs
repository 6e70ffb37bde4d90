use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::EmissaoError;
use super::taxes::{LineTaxes, ProductOrigin, ProductTaxOverride, RateTable, SituationCodes, TaxIncidence, TaxRegime};

/// NF-e (modelo 55): the top-level fiscal document as held by the lifecycle store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FiscalDocument {
    /// Internal document identifier. Prefix of every gateway reference.
    pub id: String,
    /// Operation metadata (natureza, direction, finalidade, presence).
    pub operation: OperationInfo,
    /// Emission timestamp sent as `data_emissao`.
    pub issued_at: DateTime<Utc>,
    /// Identifier of the issuing profile.
    pub issuer_id: String,
    /// Snapshot of the recipient at the time the document was drafted.
    pub recipient: Party,
    /// `modFrete`: who is responsible for freight.
    pub freight: FreightMode,
    /// `tPag`: payment method.
    pub payment: PaymentMethod,
    /// Totals derived from the lines when the document was built.
    pub totals: DocumentTotals,
    /// Series and number, once assigned locally or by the gateway.
    pub numbering: Option<DocumentNumber>,
    /// `infCpl`: free-text additional information.
    pub additional_info: Option<String>,
    /// Lifecycle status.
    pub status: DocumentStatus,
    /// Reference of the latest submission still valid at the gateway.
    pub gateway_reference: Option<String>,
    /// 44-digit access key (chave de acesso), once issued.
    pub authorization_key: Option<String>,
    /// Last reason reported by the gateway or recorded locally.
    pub status_reason: Option<String>,
    /// Authorization protocol and downloadable assets.
    pub artifacts: Artifacts,
    /// Latest submission attempt, kept so a cleared reference is never reused.
    pub last_attempt: Option<EmissionAttempt>,
}

/// Operation metadata of a document (grupo `ide`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationInfo {
    /// `natOp`: nature of the operation (e.g. "Venda de produção do estabelecimento").
    pub nature: String,
    /// `tpNF`: inbound or outbound.
    pub direction: Direction,
    /// `finNFe`: purpose of the document.
    pub purpose: Purpose,
    /// `indPres`: buyer presence indicator.
    pub presence: Presence,
}

/// `tpNF`: operation direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// 0: Entrada.
    Inbound,
    /// 1: Saída.
    Outbound,
}

impl Direction {
    pub fn code(&self) -> u8 {
        match self {
            Self::Inbound => 0,
            Self::Outbound => 1,
        }
    }
}

/// `finNFe`: document purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Purpose {
    /// 1: Normal issuance.
    Normal,
    /// 2: Complementary document.
    Complementary,
    /// 3: Adjustment.
    Adjustment,
    /// 4: Return of goods.
    Return,
}

impl Purpose {
    pub fn code(&self) -> u8 {
        match self {
            Self::Normal => 1,
            Self::Complementary => 2,
            Self::Adjustment => 3,
            Self::Return => 4,
        }
    }

    /// Parse from the `finNFe` numeric code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Normal),
            2 => Some(Self::Complementary),
            3 => Some(Self::Adjustment),
            4 => Some(Self::Return),
            _ => None,
        }
    }
}

/// `indPres`: buyer presence indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Presence {
    /// 0: Not applicable.
    NotApplicable,
    /// 1: In-person operation.
    InPerson,
    /// 2: Internet.
    Internet,
    /// 3: Telemarketing.
    Telemarketing,
    /// 4: Home delivery.
    Delivery,
    /// 9: Other non-presential operation.
    Other,
}

impl Presence {
    pub fn code(&self) -> u8 {
        match self {
            Self::NotApplicable => 0,
            Self::InPerson => 1,
            Self::Internet => 2,
            Self::Telemarketing => 3,
            Self::Delivery => 4,
            Self::Other => 9,
        }
    }
}

/// `modFrete`: freight responsibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FreightMode {
    /// 0: Contracted by the issuer (CIF).
    ByIssuer,
    /// 1: Contracted by the recipient (FOB).
    ByRecipient,
    /// 2: Contracted by a third party.
    ByThirdParty,
    /// 3: Own transport of the issuer.
    OwnByIssuer,
    /// 4: Own transport of the recipient.
    OwnByRecipient,
    /// 9: No freight.
    NoFreight,
}

impl FreightMode {
    pub fn code(&self) -> u8 {
        match self {
            Self::ByIssuer => 0,
            Self::ByRecipient => 1,
            Self::ByThirdParty => 2,
            Self::OwnByIssuer => 3,
            Self::OwnByRecipient => 4,
            Self::NoFreight => 9,
        }
    }

    /// Parse from the `modFrete` numeric code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::ByIssuer),
            1 => Some(Self::ByRecipient),
            2 => Some(Self::ByThirdParty),
            3 => Some(Self::OwnByIssuer),
            4 => Some(Self::OwnByRecipient),
            9 => Some(Self::NoFreight),
            _ => None,
        }
    }
}

/// `tPag`: payment method codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    /// 01: Cash.
    Cash,
    /// 02: Check.
    Check,
    /// 03: Credit card.
    CreditCard,
    /// 04: Debit card.
    DebitCard,
    /// 05: Store credit.
    StoreCredit,
    /// 15: Bank slip (boleto).
    BankSlip,
    /// 17: PIX.
    Pix,
    /// 90: No payment (e.g. remessa, consignment).
    NoPayment,
    /// 99: Other.
    Other,
}

impl PaymentMethod {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Cash => "01",
            Self::Check => "02",
            Self::CreditCard => "03",
            Self::DebitCard => "04",
            Self::StoreCredit => "05",
            Self::BankSlip => "15",
            Self::Pix => "17",
            Self::NoPayment => "90",
            Self::Other => "99",
        }
    }
}

/// Document totals (grupo `ICMSTot`, monetary part).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentTotals {
    /// `vProd`: sum of gross line values (quantity * unit price).
    pub products: Decimal,
    /// `vDesc`: sum of line discounts.
    pub discount: Decimal,
    /// `vFrete`: freight value.
    pub freight: Decimal,
    /// `vNF`: products - discount + freight.
    pub total: Decimal,
}

/// Series and number of an NF-e.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentNumber {
    pub series: u16,
    pub number: u32,
}

/// Lifecycle status of a fiscal document.
///
/// `Draft → Processing → {Authorized | Rejected | ErrorAuthorization}`,
/// `Authorized → Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Draft,
    Processing,
    Authorized,
    Rejected,
    /// Terminal for the current attempt; retryable with a new reference.
    ErrorAuthorization,
    Cancelled,
}

impl DocumentStatus {
    /// Whether polling should stop on this status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Authorized | Self::Rejected | Self::ErrorAuthorization | Self::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Processing => "processing",
            Self::Authorized => "authorized",
            Self::Rejected => "rejected",
            Self::ErrorAuthorization => "error_authorization",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authorization artifacts reported by the gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifacts {
    /// 44-digit access key.
    pub authorization_key: Option<String>,
    /// SEFAZ authorization protocol number.
    pub protocol: Option<String>,
    /// Number and series assigned to the document.
    pub numbering: Option<DocumentNumber>,
    /// Path or URL of the authorized XML.
    pub xml_url: Option<String>,
    /// Path or URL of the human-readable rendition (DANFE).
    pub rendition_url: Option<String>,
}

impl Artifacts {
    /// Overlay `other` on top of `self`, keeping existing values where `other` has none.
    pub fn merge(&mut self, other: Artifacts) {
        if other.authorization_key.is_some() {
            self.authorization_key = other.authorization_key;
        }
        if other.protocol.is_some() {
            self.protocol = other.protocol;
        }
        if other.numbering.is_some() {
            self.numbering = other.numbering;
        }
        if other.xml_url.is_some() {
            self.xml_url = other.xml_url;
        }
        if other.rendition_url.is_some() {
            self.rendition_url = other.rendition_url;
        }
    }
}

/// One submission attempt under a specific reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmissionAttempt {
    pub reference: String,
    pub at: DateTime<Utc>,
    pub outcome: AttemptOutcome,
}

/// How a submission attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Accepted,
    Rejected,
    Duplicate,
    TransportFailure,
}

/// What happens to the stored reference when an attempt fails authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferenceDisposition {
    /// Drop reference, number and authorization fields; the next attempt
    /// must mint a new reference and carry a different number.
    Invalidate,
    /// Keep the stored reference.
    Retain,
}

/// A state-machine transition applied to a [`FiscalDocument`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// The gateway accepted a submission made under `attempt.reference`.
    Accepted {
        attempt: EmissionAttempt,
        status: DocumentStatus,
        artifacts: Artifacts,
        reason: Option<String>,
    },
    /// Latest status observed through polling or an on-demand resync.
    Observed {
        status: DocumentStatus,
        artifacts: Artifacts,
        reason: Option<String>,
    },
    /// Transport failure or business rejection.
    Rejected {
        attempt: Option<EmissionAttempt>,
        reason: String,
    },
    /// `error_authorization`, with the reference kept or invalidated.
    AuthorizationFailed {
        attempt: Option<EmissionAttempt>,
        reason: String,
        reference: ReferenceDisposition,
    },
    /// Cancellation confirmed by the gateway.
    Cancelled { reason: String },
    /// Number assigned before submission.
    Numbered { numbering: DocumentNumber },
}

impl FiscalDocument {
    /// Apply a lifecycle transition.
    ///
    /// Status and reason are last-write-wins; the transition is refused
    /// when it would leave an authorized or cancelled document without a
    /// reference, or cancel a document that is not authorized.
    pub fn apply(&mut self, transition: Transition) -> Result<(), EmissaoError> {
        match transition {
            Transition::Accepted {
                attempt,
                status,
                artifacts,
                reason,
            } => {
                if status == DocumentStatus::Cancelled {
                    return Err(self.refuse("a submission cannot be accepted as cancelled"));
                }
                self.gateway_reference = Some(attempt.reference.clone());
                self.authorization_key = None;
                self.artifacts = Artifacts::default();
                self.record_artifacts(artifacts);
                self.status = status;
                self.status_reason = reason;
                self.last_attempt = Some(attempt);
            }
            Transition::Observed {
                status,
                artifacts,
                reason,
            } => {
                if matches!(
                    status,
                    DocumentStatus::Authorized | DocumentStatus::Cancelled
                ) && self.gateway_reference.is_none()
                {
                    return Err(self.refuse(format!("{status} requires a gateway reference")));
                }
                self.record_artifacts(artifacts);
                self.status = status;
                self.status_reason = reason;
            }
            Transition::Rejected { attempt, reason } => {
                if let Some(attempt) = attempt {
                    self.gateway_reference = Some(attempt.reference.clone());
                    self.last_attempt = Some(attempt);
                }
                self.authorization_key = None;
                self.status = DocumentStatus::Rejected;
                self.status_reason = Some(reason);
            }
            Transition::AuthorizationFailed {
                attempt,
                reason,
                reference,
            } => {
                if let Some(attempt) = attempt {
                    if reference == ReferenceDisposition::Retain {
                        self.gateway_reference = Some(attempt.reference.clone());
                    }
                    self.last_attempt = Some(attempt);
                }
                if reference == ReferenceDisposition::Invalidate {
                    self.gateway_reference = None;
                    self.authorization_key = None;
                    self.numbering = None;
                    self.artifacts = Artifacts::default();
                }
                self.status = DocumentStatus::ErrorAuthorization;
                self.status_reason = Some(reason);
            }
            Transition::Cancelled { reason } => {
                if self.status != DocumentStatus::Authorized {
                    return Err(self.refuse("only authorized documents can be cancelled"));
                }
                self.status = DocumentStatus::Cancelled;
                self.status_reason = Some(reason);
            }
            Transition::Numbered { numbering } => {
                if matches!(
                    self.status,
                    DocumentStatus::Processing | DocumentStatus::Authorized | DocumentStatus::Cancelled
                ) {
                    return Err(self.refuse("a submitted document cannot be renumbered"));
                }
                self.numbering = Some(numbering);
            }
        }
        Ok(())
    }

    /// Check the lifecycle invariants of the stored record.
    pub fn check_invariants(&self) -> Result<(), EmissaoError> {
        if matches!(
            self.status,
            DocumentStatus::Authorized | DocumentStatus::Cancelled
        ) && self.gateway_reference.is_none()
        {
            return Err(self.refuse(format!("{} document has no gateway reference", self.status)));
        }
        Ok(())
    }

    /// References this document must never be submitted under again.
    pub fn used_references(&self) -> impl Iterator<Item = &str> {
        self.gateway_reference
            .as_deref()
            .into_iter()
            .chain(self.last_attempt.as_ref().map(|a| a.reference.as_str()))
    }

    fn record_artifacts(&mut self, artifacts: Artifacts) {
        self.artifacts.merge(artifacts);
        if self.artifacts.authorization_key.is_some() {
            self.authorization_key = self.artifacts.authorization_key.clone();
        }
        if self.artifacts.numbering.is_some() {
            self.numbering = self.artifacts.numbering;
        }
    }

    fn refuse(&self, reason: impl Into<String>) -> EmissaoError {
        EmissaoError::Transition {
            from: self.status,
            reason: reason.into(),
        }
    }
}

/// Issuer or recipient of a document (grupos `emit` / `dest`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Party {
    /// `xNome`: legal name.
    pub name: String,
    /// CPF or CNPJ, with or without punctuation.
    pub identifier: Option<String>,
    /// `IE`: state registration (inscrição estadual).
    pub state_registration: Option<String>,
    /// Postal address.
    pub address: Address,
    /// Telephone, with or without punctuation.
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// Postal address (grupos `enderEmit` / `enderDest`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Address {
    /// `xLgr`: street.
    pub street: String,
    /// `nro`: street number. Sent as "S/N" when absent.
    pub number: Option<String>,
    /// `xCpl`: complement.
    pub complement: Option<String>,
    /// `xBairro`: district.
    pub district: String,
    /// `xMun`: municipality name.
    pub city: String,
    /// `cMun`: IBGE municipality code.
    pub city_code: Option<String>,
    /// `UF`: two-letter state code, "EX" for foreign recipients.
    pub state: String,
    /// `CEP`: postal code, with or without punctuation.
    pub postal_code: String,
}

/// Document line (grupo `det`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentLine {
    /// `nItem`: 1-based, contiguous within the document.
    pub number: u32,
    /// `cProd`: product code.
    pub product_code: String,
    /// `xProd`: description.
    pub description: String,
    /// `NCM`: Mercosur classification code.
    pub ncm: String,
    /// CFOP and the tax rules attached to it.
    pub operation: OperationCode,
    /// `uCom`: commercial unit (e.g. "SC" for sacas, "KG").
    pub unit: String,
    /// `qCom`.
    pub quantity: Decimal,
    /// `vUnCom`.
    pub unit_price: Decimal,
    /// `vDesc`.
    pub discount: Decimal,
    /// Stored line total: quantity * unit_price - discount.
    pub total: Decimal,
    /// `orig`: product origin.
    pub origin: ProductOrigin,
    /// Product-level tax overrides; win over the operation code.
    pub tax_override: Option<ProductTaxOverride>,
    /// Computed taxes, set once the line has been resolved.
    pub taxes: Option<LineTaxes>,
}

impl DocumentLine {
    /// `vProd`: quantity * unit price, before discount. `None` on overflow.
    pub fn gross(&self) -> Option<Decimal> {
        self.quantity.checked_mul(self.unit_price)
    }

    /// Line total re-derived from quantity, price and discount.
    pub fn expected_total(&self) -> Option<Decimal> {
        self.gross()?.checked_sub(self.discount)
    }
}

/// CFOP-equivalent operation code with its tax flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationCode {
    /// Four-digit CFOP (e.g. "5101", "6102").
    pub cfop: String,
    /// Which taxes this operation attracts.
    pub incidence: TaxIncidence,
    /// Operation-level default situation codes.
    pub situation_codes: SituationCodes,
}

/// A document referenced by the NF-e (grupo `NFref`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ReferencedDocument {
    /// `refNFe`: another electronic document by its 44-digit access key.
    Electronic { access_key: String },
    /// `refNFP`: a rural producer's paper invoice.
    Producer(ProducerReference),
}

/// `refNFP`: producer invoice reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProducerReference {
    /// `cUF`: issuing state, as a two-letter code.
    pub state: String,
    /// `AAMM`: year and month of issuance.
    pub period: String,
    /// Producer CPF or CNPJ.
    pub identifier: String,
    /// Producer state registration.
    pub state_registration: String,
    pub series: String,
    pub number: String,
}

/// Gateway environment an issuer emits against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Production,
    /// Homologação: documents have no fiscal value.
    Sandbox,
}

/// Gateway API token of an issuer.
///
/// `Debug` is redacted so the token never reaches log output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential([REDACTED])")
    }
}

/// Issuer configuration resolved per emission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuerProfile {
    pub id: String,
    /// Issuer identity and address.
    pub party: Party,
    /// `CRT`: unresolved regimes are treated as [`TaxRegime::Normal`].
    pub regime: Option<TaxRegime>,
    /// Per-tax default rates.
    pub rates: RateTable,
    pub environment: Environment,
    pub credential: Credential,
}

impl IssuerProfile {
    /// Regime to apply, defaulting to normal when the profile has none.
    pub fn effective_regime(&self) -> TaxRegime {
        self.regime.unwrap_or(TaxRegime::Normal)
    }
}

/// Everything needed to build a payload for one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmissionContext {
    pub document: FiscalDocument,
    pub lines: Vec<DocumentLine>,
    pub referenced: Vec<ReferencedDocument>,
    pub issuer: IssuerProfile,
}
