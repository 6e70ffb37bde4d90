use crate::core::ReferenceDisposition;

/// What to do with the stored reference after a duplicate rejection (539).
///
/// Gateways that cache responses per reference keep answering 539 for a
/// reference once it was rejected as a duplicate, so the default drops it.
pub trait DuplicatePolicy: Send + Sync + std::fmt::Debug {
    fn on_duplicate(&self, reference: &str) -> ReferenceDisposition;
}

/// Clear reference and authorization fields; the next submission mints a new reference.
#[derive(Debug, Clone, Copy, Default)]
pub struct InvalidateReference;

impl DuplicatePolicy for InvalidateReference {
    fn on_duplicate(&self, _reference: &str) -> ReferenceDisposition {
        ReferenceDisposition::Invalidate
    }
}

/// Keep the stored reference, for gateways without per-reference caching.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetainReference;

impl DuplicatePolicy for RetainReference {
    fn on_duplicate(&self, _reference: &str) -> ReferenceDisposition {
        ReferenceDisposition::Retain
    }
}
