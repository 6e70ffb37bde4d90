use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::interstate::{interstate_icms_rate, is_interstate};
use super::situation::{is_effectively_taxed, regime_default_code};
use crate::core::{
    LineTaxes, ProductOrigin, ProductTaxOverride, RateTable, SituationCodes, TaxComponent,
    TaxIncidence, TaxKind, TaxRegime, round_half_up,
};

/// Everything the resolver needs for one line.
#[derive(Debug, Clone)]
pub struct TaxInput<'a> {
    /// Line total (quantity * unit price - discount); the tax base.
    pub line_total: Decimal,
    pub regime: TaxRegime,
    /// Issuer default rates.
    pub rates: &'a RateTable,
    /// Operation-code incidence flags.
    pub incidence: TaxIncidence,
    /// Operation-code default situation codes.
    pub operation_codes: &'a SituationCodes,
    pub product_override: Option<&'a ProductTaxOverride>,
    pub issuer_state: &'a str,
    pub destination_state: &'a str,
    pub origin: ProductOrigin,
}

/// Resolve every tax of a line.
pub fn resolve_line(input: &TaxInput<'_>) -> LineTaxes {
    LineTaxes {
        icms: resolve_component(TaxKind::Icms, input),
        pis: resolve_component(TaxKind::Pis, input),
        cofins: resolve_component(TaxKind::Cofins, input),
        ibs: resolve_component(TaxKind::Ibs, input),
        cbs: resolve_component(TaxKind::Cbs, input),
    }
}

/// Resolve one tax of a line.
///
/// 1. Situation code: product override, else operation code, else regime default.
/// 2. No incidence for this tax on the operation: zero amounts.
/// 3. Code outside the effectively-taxed set: zero amounts.
/// 4. Otherwise base = line total, rate = override or default (interstate
///    ICMS replaces it), amount rounded half-up to cents.
pub fn resolve_component(kind: TaxKind, input: &TaxInput<'_>) -> TaxComponent {
    let code = input
        .product_override
        .and_then(|o| o.code_for(kind))
        .or_else(|| input.operation_codes.get(kind))
        .unwrap_or_else(|| regime_default_code(kind, input.regime))
        .to_string();

    if !input.incidence.applies(kind) || !is_effectively_taxed(kind, &code) {
        return TaxComponent::zero(kind, code);
    }

    let base = input.line_total;
    let mut rate = input
        .product_override
        .and_then(|o| o.rate_for(kind))
        .unwrap_or_else(|| input.rates.rate(kind));

    if kind == TaxKind::Icms && is_interstate(input.issuer_state, input.destination_state) {
        rate = interstate_icms_rate(input.origin, input.issuer_state, input.destination_state);
    }

    TaxComponent {
        kind,
        situation_code: code,
        base,
        rate,
        amount: round_half_up(base * rate / Decimal::ONE_HUNDRED, 2),
    }
}

/// Document-level tax totals (grupo `ICMSTot`, tax part).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxTotals {
    pub icms_base: Decimal,
    pub icms: Decimal,
    pub pis: Decimal,
    pub cofins: Decimal,
    pub ibs: Decimal,
    pub cbs: Decimal,
}

/// Sum resolved line taxes into document totals.
pub fn sum_taxes<'a>(lines: impl IntoIterator<Item = &'a LineTaxes>) -> TaxTotals {
    lines.into_iter().fold(TaxTotals::default(), |mut acc, t| {
        acc.icms_base += t.icms.base;
        acc.icms += t.icms.amount;
        acc.pis += t.pis.amount;
        acc.cofins += t.cofins.amount;
        acc.ibs += t.ibs.amount;
        acc.cbs += t.cbs.amount;
        acc
    })
}
