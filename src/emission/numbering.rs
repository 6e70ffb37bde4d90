use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::core::{DocumentNumber, DocumentNumberSequence, EmissaoError};

/// Hands out NF-e numbers to documents submitted without one.
///
/// SEFAZ answers 539 when a number is reused with different content; the
/// emitter passes such numbers back through [`skip_past`](Self::skip_past)
/// so the source never issues them again.
pub trait NumberSource: Send + Sync + std::fmt::Debug {
    fn next_number(&self) -> Result<DocumentNumber, EmissaoError>;

    fn skip_past(&self, used: DocumentNumber);
}

/// [`NumberSource`] over one in-process series.
#[derive(Debug)]
pub struct SeriesNumbers(Mutex<DocumentNumberSequence>);

impl SeriesNumbers {
    pub fn new(sequence: DocumentNumberSequence) -> Self {
        Self(Mutex::new(sequence))
    }

    /// Next number to be issued, without consuming it.
    pub fn peek(&self) -> DocumentNumber {
        self.sequence().peek()
    }

    fn sequence(&self) -> MutexGuard<'_, DocumentNumberSequence> {
        // The sequence stays consistent even if a holder panicked
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl NumberSource for SeriesNumbers {
    fn next_number(&self) -> Result<DocumentNumber, EmissaoError> {
        self.sequence().next_number()
    }

    fn skip_past(&self, used: DocumentNumber) {
        self.sequence().skip_past(used);
    }
}
