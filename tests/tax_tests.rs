#![cfg(feature = "tax")]

use emissao::core::*;
use emissao::tax::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const REGIMES: [TaxRegime; 3] = [
    TaxRegime::Simplified,
    TaxRegime::SimplifiedExcess,
    TaxRegime::Normal,
];

fn incidences() -> Vec<TaxIncidence> {
    let mut all = Vec::new();
    for icms in [false, true] {
        for pis_cofins in [false, true] {
            for successor in [false, true] {
                all.push(TaxIncidence {
                    icms,
                    pis_cofins,
                    successor,
                });
            }
        }
    }
    all
}

fn input<'a>(
    rates: &'a RateTable,
    codes: &'a SituationCodes,
    product: Option<&'a ProductTaxOverride>,
) -> TaxInput<'a> {
    TaxInput {
        line_total: dec!(1000),
        regime: TaxRegime::Normal,
        rates,
        incidence: TaxIncidence::ALL,
        operation_codes: codes,
        product_override: product,
        issuer_state: "MT",
        destination_state: "MT",
        origin: ProductOrigin::National,
    }
}

// --- Reference scenario ---

#[test]
fn normal_regime_pis_cofins_only() {
    let rates = RateTable::default();
    let codes = SituationCodes::new();
    let mut i = input(&rates, &codes, None);
    i.incidence = TaxIncidence {
        icms: false,
        pis_cofins: true,
        successor: false,
    };

    let taxes = resolve_line(&i);
    assert_eq!(taxes.icms.amount, Decimal::ZERO);
    assert_eq!(taxes.icms.situation_code, "00");
    assert_eq!(taxes.pis.situation_code, "01");
    assert_eq!(taxes.pis.base, dec!(1000));
    assert_eq!(taxes.pis.rate, dec!(1.65));
    assert_eq!(taxes.pis.amount, dec!(16.50));
    assert_eq!(taxes.cofins.rate, dec!(7.6));
    assert_eq!(taxes.cofins.amount, dec!(76.00));
    assert_eq!(taxes.ibs.amount, Decimal::ZERO);
    assert_eq!(taxes.cbs.amount, Decimal::ZERO);
}

// --- Exhaustive table ---

/// Every regime, incidence combination and override source: the amount is
/// zero exactly when the tax has no incidence or the code does not charge.
#[test]
fn exhaustive_incidence_table() {
    let rates = RateTable::default();
    let no_codes = SituationCodes::new();
    let op_codes = SituationCodes::new()
        .with(TaxKind::Icms, "41")
        .with(TaxKind::Pis, "01")
        .with(TaxKind::Cofins, "06");
    let product = ProductTaxOverride::new()
        .situation_code(TaxKind::Icms, "00")
        .rate(TaxKind::Icms, dec!(12))
        .situation_code(TaxKind::Cofins, "01");

    let sources: [(&SituationCodes, Option<&ProductTaxOverride>); 3] = [
        (&no_codes, None),
        (&op_codes, None),
        (&op_codes, Some(&product)),
    ];

    for regime in REGIMES {
        for incidence in incidences() {
            for (codes, product) in sources {
                let mut i = input(&rates, codes, product);
                i.regime = regime;
                i.incidence = incidence;
                let taxes = resolve_line(&i);

                for kind in TaxKind::ALL {
                    let component = taxes.get(kind);
                    let expected_code = product
                        .and_then(|p| p.code_for(kind))
                        .or_else(|| codes.get(kind))
                        .unwrap_or_else(|| regime_default_code(kind, regime));
                    assert_eq!(component.situation_code, expected_code);

                    let charges =
                        incidence.applies(kind) && is_effectively_taxed(kind, expected_code);
                    if charges {
                        assert_eq!(component.base, dec!(1000));
                        assert_eq!(
                            component.amount,
                            round_half_up(component.base * component.rate / dec!(100), 2),
                            "{regime:?} {incidence:?} {kind:?}"
                        );
                        assert!(component.amount > Decimal::ZERO);
                    } else {
                        assert_eq!(component.base, Decimal::ZERO, "{regime:?} {incidence:?} {kind:?}");
                        assert_eq!(component.amount, Decimal::ZERO, "{regime:?} {incidence:?} {kind:?}");
                    }
                }
            }
        }
    }
}

#[test]
fn no_incidence_means_zero_for_every_regime() {
    let rates = RateTable::default();
    let codes = SituationCodes::new();
    for regime in REGIMES {
        let mut i = input(&rates, &codes, None);
        i.regime = regime;
        i.incidence = TaxIncidence::NONE;
        let taxes = resolve_line(&i);
        for kind in TaxKind::ALL {
            assert_eq!(taxes.get(kind).amount, Decimal::ZERO);
        }
    }
}

#[test]
fn simples_nacional_charges_only_successor_taxes() {
    let rates = RateTable::default();
    let codes = SituationCodes::new();
    let mut i = input(&rates, &codes, None);
    i.regime = TaxRegime::Simplified;
    let taxes = resolve_line(&i);

    assert_eq!(taxes.icms.situation_code, "102");
    assert_eq!(taxes.icms.amount, Decimal::ZERO);
    assert_eq!(taxes.pis.situation_code, "49");
    assert_eq!(taxes.pis.amount, Decimal::ZERO);
    assert_eq!(taxes.ibs.amount, dec!(1.00));
    assert_eq!(taxes.cbs.amount, dec!(9.00));
}

// --- Overrides ---

#[test]
fn product_override_beats_operation_code() {
    let rates = RateTable::default();
    let codes = SituationCodes::new().with(TaxKind::Icms, "40");
    let product = ProductTaxOverride::new()
        .situation_code(TaxKind::Icms, "20")
        .rate(TaxKind::Icms, dec!(7));
    let taxes = resolve_line(&input(&rates, &codes, Some(&product)));
    assert_eq!(taxes.icms.situation_code, "20");
    assert_eq!(taxes.icms.rate, dec!(7));
    assert_eq!(taxes.icms.amount, dec!(70.00));
}

#[test]
fn operation_code_beats_regime_default() {
    let rates = RateTable::default();
    let codes = SituationCodes::new().with(TaxKind::Pis, "07");
    let taxes = resolve_line(&input(&rates, &codes, None));
    assert_eq!(taxes.pis.situation_code, "07");
    assert_eq!(taxes.pis.amount, Decimal::ZERO);
}

// --- Interstate ---

#[test]
fn imported_origin_uses_four_percent() {
    let rates = RateTable::default();
    let codes = SituationCodes::new();
    let mut i = input(&rates, &codes, None);
    i.issuer_state = "SP";
    i.destination_state = "MT";
    i.origin = ProductOrigin::ForeignDirectImport;
    let taxes = resolve_line(&i);
    assert_eq!(taxes.icms.rate, dec!(4));
    assert_eq!(taxes.icms.amount, dec!(40.00));
}

#[test]
fn interstate_rate_replaces_product_rate() {
    let rates = RateTable::default();
    let codes = SituationCodes::new();
    let product = ProductTaxOverride::new().rate(TaxKind::Icms, dec!(25));
    let mut i = input(&rates, &codes, Some(&product));
    i.destination_state = "SP";
    assert_eq!(resolve_line(&i).icms.rate, dec!(12));

    i.issuer_state = "SP";
    i.destination_state = "GO";
    assert_eq!(resolve_line(&i).icms.rate, dec!(7));

    i.destination_state = "SP";
    assert_eq!(resolve_line(&i).icms.rate, dec!(25));
}

// --- Rounding and totals ---

#[test]
fn amounts_round_half_up_to_cents() {
    let rates = RateTable::default();
    let codes = SituationCodes::new();
    let mut i = input(&rates, &codes, None);
    // 30.30 * 1.65% = 0.49995
    i.line_total = dec!(30.30);
    assert_eq!(resolve_component(TaxKind::Pis, &i).amount, dec!(0.50));
    // 0.50 * 1.65% = 0.00825
    i.line_total = dec!(0.50);
    assert_eq!(resolve_component(TaxKind::Pis, &i).amount, dec!(0.01));
}

#[test]
fn totals_sum_line_amounts() {
    let rates = RateTable::default();
    let codes = SituationCodes::new();
    let mut i = input(&rates, &codes, None);
    let first = resolve_line(&i);
    i.line_total = dec!(500);
    i.incidence = TaxIncidence {
        icms: false,
        pis_cofins: true,
        successor: true,
    };
    let second = resolve_line(&i);

    let totals = sum_taxes([&first, &second]);
    assert_eq!(totals.icms_base, dec!(1000));
    assert_eq!(totals.icms, dec!(180.00));
    assert_eq!(totals.pis, dec!(24.75));
    assert_eq!(totals.cofins, dec!(114.00));
    assert_eq!(totals.ibs, dec!(1.50));
    assert_eq!(totals.cbs, dec!(13.50));
}

#[test]
fn resolution_is_deterministic() {
    let rates = RateTable::default();
    let codes = SituationCodes::new();
    let i = input(&rates, &codes, None);
    assert_eq!(resolve_line(&i), resolve_line(&i));
}
