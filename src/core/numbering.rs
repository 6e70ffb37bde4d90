use super::error::EmissaoError;
use super::types::DocumentNumber;

/// Largest number the NF-e layout accepts (`nNF`, 9 digits).
pub const MAX_DOCUMENT_NUMBER: u32 = 999_999_999;

/// Largest series the NF-e layout accepts (`serie`, 3 digits).
pub const MAX_SERIES: u16 = 999;

/// Sequential NF-e number generator for one issuer series.
///
/// SEFAZ rejects a number already used in the same series (the duplicate
/// condition), so numbers are handed out strictly increasing and a
/// consumed number is never returned again.
#[derive(Debug, Clone)]
pub struct DocumentNumberSequence {
    series: u16,
    next_number: u32,
}

impl DocumentNumberSequence {
    /// Create a sequence starting at 1.
    pub fn new(series: u16) -> Result<Self, EmissaoError> {
        Self::starting_at(series, 1)
    }

    /// Create a sequence continuing from a given number.
    pub fn starting_at(series: u16, next_number: u32) -> Result<Self, EmissaoError> {
        if series > MAX_SERIES {
            return Err(EmissaoError::Numbering(format!(
                "series {series} exceeds {MAX_SERIES}"
            )));
        }
        if next_number == 0 || next_number > MAX_DOCUMENT_NUMBER {
            return Err(EmissaoError::Numbering(format!(
                "number {next_number} outside 1..={MAX_DOCUMENT_NUMBER}"
            )));
        }
        Ok(Self {
            series,
            next_number,
        })
    }

    /// Issue the next number.
    pub fn next_number(&mut self) -> Result<DocumentNumber, EmissaoError> {
        if self.next_number > MAX_DOCUMENT_NUMBER {
            return Err(EmissaoError::Numbering(format!(
                "series {} is exhausted",
                self.series
            )));
        }
        let issued = DocumentNumber {
            series: self.series,
            number: self.next_number,
        };
        self.next_number += 1;
        Ok(issued)
    }

    /// Preview the next number without consuming it.
    pub fn peek(&self) -> DocumentNumber {
        DocumentNumber {
            series: self.series,
            number: self.next_number,
        }
    }

    pub fn series(&self) -> u16 {
        self.series
    }

    /// Skip past a number the gateway reported as already used.
    ///
    /// Returns true if the sequence moved.
    pub fn skip_past(&mut self, used: DocumentNumber) -> bool {
        if used.series == self.series && used.number >= self.next_number {
            self.next_number = used.number.saturating_add(1);
            true
        } else {
            false
        }
    }

    /// Switch to a new series, restarting at 1.
    pub fn advance_series(&mut self, series: u16) -> Result<(), EmissaoError> {
        if series <= self.series {
            return Err(EmissaoError::Numbering(format!(
                "new series {series} must be greater than current series {}",
                self.series
            )));
        }
        if series > MAX_SERIES {
            return Err(EmissaoError::Numbering(format!(
                "series {series} exceeds {MAX_SERIES}"
            )));
        }
        self.series = series;
        self.next_number = 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_numbering() {
        let mut seq = DocumentNumberSequence::new(1).unwrap();
        assert_eq!(seq.next_number().unwrap().number, 1);
        assert_eq!(seq.next_number().unwrap().number, 2);
        assert_eq!(seq.next_number().unwrap().number, 3);
    }

    #[test]
    fn peek_does_not_consume() {
        let mut seq = DocumentNumberSequence::new(1).unwrap();
        assert_eq!(seq.peek().number, 1);
        assert_eq!(seq.peek().number, 1);
        assert_eq!(seq.next_number().unwrap().number, 1);
        assert_eq!(seq.peek().number, 2);
    }

    #[test]
    fn starting_at() {
        let mut seq = DocumentNumberSequence::starting_at(2, 42).unwrap();
        let n = seq.next_number().unwrap();
        assert_eq!(n, DocumentNumber { series: 2, number: 42 });
    }

    #[test]
    fn rejects_out_of_range() {
        assert!(DocumentNumberSequence::new(1000).is_err());
        assert!(DocumentNumberSequence::starting_at(1, 0).is_err());
        assert!(DocumentNumberSequence::starting_at(1, MAX_DOCUMENT_NUMBER + 1).is_err());
    }

    #[test]
    fn exhausted_series() {
        let mut seq = DocumentNumberSequence::starting_at(1, MAX_DOCUMENT_NUMBER).unwrap();
        assert!(seq.next_number().is_ok());
        assert!(seq.next_number().is_err());
    }

    #[test]
    fn skip_past_used_number() {
        let mut seq = DocumentNumberSequence::starting_at(1, 10).unwrap();
        assert!(seq.skip_past(DocumentNumber { series: 1, number: 15 }));
        assert_eq!(seq.peek().number, 16);
        // Lower numbers and other series don't move the sequence
        assert!(!seq.skip_past(DocumentNumber { series: 1, number: 3 }));
        assert!(!seq.skip_past(DocumentNumber { series: 2, number: 99 }));
        assert_eq!(seq.peek().number, 16);
    }

    #[test]
    fn series_advance() {
        let mut seq = DocumentNumberSequence::new(1).unwrap();
        seq.next_number().unwrap();
        seq.advance_series(2).unwrap();
        assert_eq!(seq.next_number().unwrap(), DocumentNumber { series: 2, number: 1 });
        assert!(seq.advance_series(2).is_err());
        assert!(seq.advance_series(1).is_err());
    }
}
