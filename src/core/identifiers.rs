//! CPF / CNPJ handling and digit normalization.
//!
//! Identifiers, postal codes and phone numbers are transmitted as bare
//! digits; the kind of a taxpayer identifier is inferred from its length.

use std::fmt;

/// Kind of a Brazilian taxpayer identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    /// CPF: individual taxpayer, 11 digits.
    Individual,
    /// CNPJ: company taxpayer, 14 digits.
    Company,
}

/// Error returned when an identifier fails format or check-digit validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierError {
    /// The invalid input value.
    pub value: String,
    /// Why the value failed validation.
    pub reason: String,
}

impl fmt::Display for IdentifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid identifier '{}': {}", self.value, self.reason)
    }
}

impl std::error::Error for IdentifierError {}

/// Strip everything that is not an ASCII digit.
pub fn digits_only(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

/// Infer CPF vs. CNPJ from the digit count after normalization.
pub fn infer_kind(identifier: &str) -> Option<IdentifierKind> {
    match digits_only(identifier).len() {
        11 => Some(IdentifierKind::Individual),
        14 => Some(IdentifierKind::Company),
        _ => None,
    }
}

/// Validate a CPF or CNPJ and return its kind and bare digits.
pub fn validate_identifier(identifier: &str) -> Result<(IdentifierKind, String), IdentifierError> {
    let digits = digits_only(identifier);
    let err = |reason: &str| IdentifierError {
        value: identifier.to_string(),
        reason: reason.into(),
    };

    let kind = match digits.len() {
        11 => IdentifierKind::Individual,
        14 => IdentifierKind::Company,
        0 => return Err(err("no digits")),
        _ => return Err(err("must have 11 (CPF) or 14 (CNPJ) digits")),
    };

    let bytes: Vec<u32> = digits.bytes().map(|b| u32::from(b - b'0')).collect();
    if bytes.iter().all(|d| *d == bytes[0]) {
        return Err(err("repeated digits are not a valid identifier"));
    }

    let valid = match kind {
        IdentifierKind::Individual => cpf_check_digits_match(&bytes),
        IdentifierKind::Company => cnpj_check_digits_match(&bytes),
    };
    if !valid {
        return Err(err("check digits do not match"));
    }

    Ok((kind, digits))
}

fn mod11_digit(sum: u32) -> u32 {
    let r = sum % 11;
    if r < 2 { 0 } else { 11 - r }
}

fn cpf_check_digits_match(d: &[u32]) -> bool {
    let first = mod11_digit((0..9).map(|i| d[i] * (10 - i as u32)).sum());
    let second = mod11_digit((0..10).map(|i| d[i] * (11 - i as u32)).sum());
    d[9] == first && d[10] == second
}

fn cnpj_check_digits_match(d: &[u32]) -> bool {
    const W1: [u32; 12] = [5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
    const W2: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
    let first = mod11_digit(W1.iter().zip(d).map(|(w, x)| w * x).sum());
    let second = mod11_digit(W2.iter().zip(d).map(|(w, x)| w * x).sum());
    d[12] == first && d[13] == second
}

/// Whether `key` is a 44-digit NF-e access key.
pub fn is_access_key(key: &str) -> bool {
    key.len() == 44 && key.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_punctuation() {
        assert_eq!(digits_only("11.222.333/0001-81"), "11222333000181");
        assert_eq!(digits_only("(65) 3322-1100"), "6533221100");
        assert_eq!(digits_only("78.000-000"), "78000000");
    }

    #[test]
    fn infers_kind_from_length() {
        assert_eq!(infer_kind("529.982.247-25"), Some(IdentifierKind::Individual));
        assert_eq!(infer_kind("11.222.333/0001-81"), Some(IdentifierKind::Company));
        assert_eq!(infer_kind("12345"), None);
    }

    #[test]
    fn valid_cpf() {
        let (kind, digits) = validate_identifier("529.982.247-25").unwrap();
        assert_eq!(kind, IdentifierKind::Individual);
        assert_eq!(digits, "52998224725");
        assert!(validate_identifier("111.444.777-35").is_ok());
    }

    #[test]
    fn valid_cnpj() {
        let (kind, digits) = validate_identifier("11.222.333/0001-81").unwrap();
        assert_eq!(kind, IdentifierKind::Company);
        assert_eq!(digits, "11222333000181");
        assert!(validate_identifier("11444777000161").is_ok());
    }

    #[test]
    fn wrong_check_digit_rejected() {
        assert!(validate_identifier("529.982.247-24").is_err());
        assert!(validate_identifier("11.222.333/0001-82").is_err());
    }

    #[test]
    fn repeated_digits_rejected() {
        assert!(validate_identifier("111.111.111-11").is_err());
        assert!(validate_identifier("00000000000000").is_err());
    }

    #[test]
    fn wrong_length_rejected() {
        let err = validate_identifier("1234567").unwrap_err();
        assert!(err.reason.contains("11 (CPF) or 14 (CNPJ)"));
        assert!(validate_identifier("").is_err());
    }

    #[test]
    fn access_key_shape() {
        assert!(is_access_key(&"5".repeat(44)));
        assert!(!is_access_key(&"5".repeat(43)));
        assert!(!is_access_key(&format!("{}A", "5".repeat(43))));
    }
}
