use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::error::ValidationError;
use super::identifiers::{is_access_key, validate_identifier};
use super::states::{FOREIGN_STATE, is_known_state};
use super::types::*;

/// Tolerance when comparing stored totals with totals re-derived from lines.
pub const TOTAL_TOLERANCE: Decimal = dec!(0.01);

/// Most `det` groups an NF-e can carry.
pub const MAX_LINES: usize = 990;

/// `qCom` and `vUnCom` carry at most 11 integer digits.
const MAX_UNIT_FIELD: Decimal = dec!(99999999999);

/// `vProd`, `vDesc` and `vNF` carry at most 13 integer digits.
const MAX_VALUE_FIELD: Decimal = dec!(9999999999999.99);

/// Validate everything a payload is built from.
/// Returns all validation errors found (not just the first).
pub fn validate_emission(ctx: &EmissionContext) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if ctx.document.operation.nature.trim().is_empty() {
        errors.push(ValidationError::with_tag(
            "operation.nature",
            "nature of operation must not be empty",
            "B04",
        ));
    }

    validate_issuer(&ctx.issuer.party, &mut errors);
    validate_recipient(&ctx.document.recipient, &mut errors);

    if ctx.lines.is_empty() {
        errors.push(ValidationError::with_tag(
            "lines",
            "document must have at least one line",
            "H01",
        ));
    } else if ctx.lines.len() > MAX_LINES {
        errors.push(ValidationError::with_tag(
            "lines",
            format!("document cannot have more than {MAX_LINES} lines, got {}", ctx.lines.len()),
            "H01",
        ));
    }
    validate_line_numbers(&ctx.lines, &mut errors);
    for (i, line) in ctx.lines.iter().enumerate() {
        validate_line(line, i, &mut errors);
    }

    for (i, reference) in ctx.referenced.iter().enumerate() {
        validate_reference(reference, i, &mut errors);
    }

    errors.extend(validate_totals(&ctx.document, &ctx.lines));

    errors
}

/// Check the stored document total against the total re-derived from lines.
pub fn validate_totals(document: &FiscalDocument, lines: &[DocumentLine]) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let derived = calculate_totals(lines, document.totals.freight);

    if !within_tolerance(derived.total, document.totals.total) {
        errors.push(ValidationError::with_tag(
            "totals.total",
            format!(
                "document total {} does not match total derived from lines {}",
                document.totals.total, derived.total
            ),
            "W16",
        ));
    }

    errors
}

/// Derive document totals from lines plus the document-level freight.
///
/// Sums saturate instead of overflowing; out-of-range lines are reported
/// by [`validate_emission`].
pub fn calculate_totals(lines: &[DocumentLine], freight: Decimal) -> DocumentTotals {
    let products = lines.iter().fold(Decimal::ZERO, |acc, l| {
        acc.saturating_add(l.quantity.saturating_mul(l.unit_price))
    });
    let discount = lines
        .iter()
        .fold(Decimal::ZERO, |acc, l| acc.saturating_add(l.discount));
    DocumentTotals {
        products,
        discount,
        freight,
        total: products.saturating_sub(discount).saturating_add(freight),
    }
}

fn within_tolerance(a: Decimal, b: Decimal) -> bool {
    a.checked_sub(b)
        .is_some_and(|diff| diff.abs() <= TOTAL_TOLERANCE)
}

/// Round a Decimal to `dp` decimal places using half-up (commercial rounding).
pub fn round_half_up(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
}

fn validate_issuer(party: &Party, errors: &mut Vec<ValidationError>) {
    match party.identifier.as_deref().map(str::trim) {
        None | Some("") => errors.push(ValidationError::with_tag(
            "issuer.identifier",
            "issuer must have a CPF or CNPJ",
            "C02",
        )),
        Some(id) => {
            if let Err(e) = validate_identifier(id) {
                errors.push(ValidationError::with_tag(
                    "issuer.identifier",
                    e.reason,
                    "C02",
                ));
            }
        }
    }

    if party.name.trim().is_empty() {
        errors.push(ValidationError::with_tag(
            "issuer.name",
            "issuer name must not be empty",
            "C03",
        ));
    }

    validate_address(&party.address, "issuer.address", 'C', errors);
}

fn validate_recipient(party: &Party, errors: &mut Vec<ValidationError>) {
    match party.identifier.as_deref().map(str::trim) {
        None | Some("") => errors.push(ValidationError::with_tag(
            "recipient.identifier",
            "recipient must have a CPF or CNPJ",
            "E02",
        )),
        Some(id) => {
            if let Err(e) = validate_identifier(id) {
                errors.push(ValidationError::with_tag(
                    "recipient.identifier",
                    e.reason,
                    "E02",
                ));
            }
        }
    }

    if party.name.trim().is_empty() {
        errors.push(ValidationError::with_tag(
            "recipient.name",
            "recipient name must not be empty",
            "E04",
        ));
    }

    validate_address(&party.address, "recipient.address", 'E', errors);
}

/// `group` is the layout group letter: 'C' for the issuer, 'E' for the recipient.
fn validate_address(address: &Address, prefix: &str, group: char, errors: &mut Vec<ValidationError>) {
    let required = [
        ("street", &address.street, "06"),
        ("district", &address.district, "09"),
        ("city", &address.city, "11"),
    ];
    for (field, value, tag) in required {
        if value.trim().is_empty() {
            errors.push(ValidationError::with_tag(
                format!("{prefix}.{field}"),
                format!("{field} must not be empty"),
                format!("{group}{tag}"),
            ));
        }
    }

    let state = address.state.trim();
    if state.is_empty() {
        errors.push(ValidationError::with_tag(
            format!("{prefix}.state"),
            "state (UF) must not be empty",
            format!("{group}12"),
        ));
    } else if state != FOREIGN_STATE && !is_known_state(state) {
        errors.push(ValidationError::with_tag(
            format!("{prefix}.state"),
            format!("'{state}' is not a known UF"),
            format!("{group}12"),
        ));
    }

    // Addresses abroad carry no CEP
    if state != FOREIGN_STATE {
        let cep = super::identifiers::digits_only(&address.postal_code);
        if cep.is_empty() {
            errors.push(ValidationError::with_tag(
                format!("{prefix}.postal_code"),
                "postal code (CEP) must not be empty",
                format!("{group}13"),
            ));
        } else if cep.len() != 8 {
            errors.push(ValidationError::with_tag(
                format!("{prefix}.postal_code"),
                "postal code (CEP) must have 8 digits",
                format!("{group}13"),
            ));
        }
    }
}

fn validate_line_numbers(lines: &[DocumentLine], errors: &mut Vec<ValidationError>) {
    let mut numbers: Vec<u32> = lines.iter().map(|l| l.number).collect();
    numbers.sort_unstable();
    let contiguous = numbers
        .iter()
        .enumerate()
        .all(|(i, n)| *n as usize == i + 1);
    if !contiguous {
        errors.push(ValidationError::with_tag(
            "lines",
            format!("line numbers must be unique and contiguous from 1, got {numbers:?}"),
            "H02",
        ));
    }
}

fn validate_line(line: &DocumentLine, index: usize, errors: &mut Vec<ValidationError>) {
    let prefix = format!("lines[{index}]");

    if line.description.trim().is_empty() {
        errors.push(ValidationError::with_tag(
            format!("{prefix}.description"),
            "description must not be empty",
            "I04",
        ));
    }

    if line.quantity <= Decimal::ZERO {
        errors.push(ValidationError::with_tag(
            format!("{prefix}.quantity"),
            "quantity must be greater than zero",
            "I10",
        ));
    } else if line.quantity > MAX_UNIT_FIELD {
        errors.push(ValidationError::with_tag(
            format!("{prefix}.quantity"),
            "quantity exceeds 11 integer digits",
            "I10",
        ));
    }

    if line.unit_price <= Decimal::ZERO {
        errors.push(ValidationError::with_tag(
            format!("{prefix}.unit_price"),
            "unit price must be greater than zero",
            "I10a",
        ));
    } else if line.unit_price > MAX_UNIT_FIELD {
        errors.push(ValidationError::with_tag(
            format!("{prefix}.unit_price"),
            "unit price exceeds 11 integer digits",
            "I10a",
        ));
    }

    if line.operation.cfop.trim().is_empty() {
        errors.push(ValidationError::with_tag(
            format!("{prefix}.operation.cfop"),
            "operation code (CFOP) must not be empty",
            "I08",
        ));
    }

    if line.ncm.trim().is_empty() {
        errors.push(ValidationError::with_tag(
            format!("{prefix}.ncm"),
            "classification code (NCM) must not be empty",
            "I05",
        ));
    }

    if line.discount.is_sign_negative() {
        errors.push(ValidationError::with_tag(
            format!("{prefix}.discount"),
            "discount must not be negative",
            "I17",
        ));
    } else if line.discount > MAX_VALUE_FIELD {
        errors.push(ValidationError::with_tag(
            format!("{prefix}.discount"),
            "discount exceeds 13 integer digits",
            "I17",
        ));
    }

    match line.gross() {
        Some(gross) if gross.abs() <= MAX_VALUE_FIELD => {
            if let Some(expected) = line.expected_total() {
                if !within_tolerance(line.total, expected) {
                    errors.push(ValidationError::with_tag(
                        format!("{prefix}.total"),
                        format!(
                            "line total {} does not match quantity * unit price - discount = {}",
                            line.total, expected
                        ),
                        "I11",
                    ));
                }
            }
        }
        _ => errors.push(ValidationError::with_tag(
            format!("{prefix}.total"),
            "quantity * unit price exceeds 13 integer digits",
            "I11",
        )),
    }
}

fn validate_reference(reference: &ReferencedDocument, index: usize, errors: &mut Vec<ValidationError>) {
    let prefix = format!("referenced[{index}]");
    match reference {
        ReferencedDocument::Electronic { access_key } => {
            if !is_access_key(access_key) {
                errors.push(ValidationError::with_tag(
                    format!("{prefix}.access_key"),
                    "access key must have exactly 44 digits",
                    "BA02",
                ));
            }
        }
        ReferencedDocument::Producer(p) => {
            let required = [
                ("state", &p.state),
                ("period", &p.period),
                ("identifier", &p.identifier),
                ("state_registration", &p.state_registration),
                ("series", &p.series),
                ("number", &p.number),
            ];
            for (field, value) in required {
                if value.trim().is_empty() {
                    errors.push(ValidationError::with_tag(
                        format!("{prefix}.{field}"),
                        format!("producer reference {field} must not be empty"),
                        "BA10",
                    ));
                }
            }
            if !p.state.trim().is_empty() && !is_known_state(p.state.trim()) {
                errors.push(ValidationError::with_tag(
                    format!("{prefix}.state"),
                    format!("'{}' is not a known UF", p.state),
                    "BA10",
                ));
            }
            let period = p.period.trim();
            if !period.is_empty() && !is_year_month(period) {
                errors.push(ValidationError::with_tag(
                    format!("{prefix}.period"),
                    "period must be AAMM (two-digit year and month)",
                    "BA10",
                ));
            }
            if !p.identifier.trim().is_empty() {
                if let Err(e) = validate_identifier(&p.identifier) {
                    errors.push(ValidationError::with_tag(
                        format!("{prefix}.identifier"),
                        e.reason,
                        "BA10",
                    ));
                }
            }
        }
    }
}

fn is_year_month(period: &str) -> bool {
    period.len() == 4
        && period.bytes().all(|b| b.is_ascii_digit())
        && matches!(period[2..].parse::<u8>(), Ok(1..=12))
}
