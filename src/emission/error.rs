use crate::core::{DocumentStatus, EmissaoError, ValidationError, join_errors};
use crate::gateway::{AssetKind, GatewayError};

/// Errors from the lifecycle store.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StoreError {
    #[error("document {0} not found")]
    NotFound(String),
    /// The stored document refused the transition.
    #[error("transition refused for document {document_id}: {source}")]
    Refused {
        document_id: String,
        source: EmissaoError,
    },
    #[error("store {operation} timed out after {elapsed_ms} ms")]
    Timeout { operation: String, elapsed_ms: u64 },
    /// Backend-specific failure.
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Errors from emission operations.
///
/// Gateway rejections are not errors: submissions report them as a
/// [`SubmissionOutcome`](super::SubmissionOutcome).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum EmissionError {
    /// Local validation failed; the gateway was not contacted.
    #[error("document is invalid: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
    #[error("document {document_id} is already {status}")]
    AlreadyAuthorized {
        document_id: String,
        status: DocumentStatus,
    },
    #[error("document {document_id} has a submission in flight; poll its reference instead")]
    InFlight { document_id: String },
    #[error("document {document_id} is {status}, not authorized")]
    NotAuthorized {
        document_id: String,
        status: DocumentStatus,
    },
    #[error("{field} needs at least {min} characters, got {actual}")]
    JustificationTooShort {
        field: &'static str,
        min: usize,
        actual: usize,
    },
    #[error("document {document_id} has no gateway reference")]
    MissingReference { document_id: String },
    #[error("document {document_id} has no {asset} to download")]
    AssetUnavailable {
        document_id: String,
        asset: AssetKind,
    },
    #[error("cannot assign a document number: {0}")]
    Numbering(EmissaoError),
    /// The gateway answered but declined the request.
    #[error("gateway declined {operation}: {reason}")]
    Declined {
        operation: &'static str,
        reason: String,
    },
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
