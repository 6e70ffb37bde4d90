use thiserror::Error;

use super::types::DocumentStatus;

/// Errors that can occur while constructing or mutating fiscal documents.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EmissaoError {
    /// One or more validation rules failed.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Builder encountered invalid or missing configuration.
    #[error("builder error: {0}")]
    Builder(String),

    /// Document number sequencing error.
    #[error("numbering error: {0}")]
    Numbering(String),

    /// A lifecycle transition is not allowed from the current status.
    #[error("invalid transition from {from}: {reason}")]
    Transition {
        /// Status the document was in when the transition was attempted.
        from: DocumentStatus,
        /// Why the transition was refused.
        reason: String,
    },
}

/// A single validation error with field path and message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dot-separated path to the invalid field (e.g. "recipient.address.postal_code").
    pub field: String,
    /// Human-readable error description.
    pub message: String,
    /// NF-e layout field id if applicable (e.g. "E02" for the recipient CNPJ).
    pub tag: Option<String>,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(tag) = &self.tag {
            write!(f, "[{}] {}: {}", tag, self.field, self.message)
        } else {
            write!(f, "{}: {}", self.field, self.message)
        }
    }
}

impl ValidationError {
    /// Create a validation error without a layout tag.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            tag: None,
        }
    }

    /// Create a validation error bound to an NF-e layout field id.
    pub fn with_tag(
        field: impl Into<String>,
        message: impl Into<String>,
        tag: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            tag: Some(tag.into()),
        }
    }
}

/// Join a list of validation errors into one line, as used in error messages.
pub fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
