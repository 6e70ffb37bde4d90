//! Regime default situation codes and the "effectively taxed" code sets.

use crate::core::{TaxKind, TaxRegime};

/// ICMS codes that carry a charge: CST 00, 10, 20, 51, 70, 90 and CSOSN 900.
const ICMS_TAXED: &[&str] = &["00", "10", "20", "51", "70", "90", "900"];

/// PIS/COFINS codes that carry a charge: 01 (basic rate), 02 (differentiated rate).
const PIS_COFINS_TAXED: &[&str] = &["01", "02"];

/// IBS/CBS codes that carry a charge: 000 (full), 200 (reduced rate).
const SUCCESSOR_TAXED: &[&str] = &["000", "200"];

/// Situation code used when neither the product nor the operation sets one.
///
/// Simples Nacional issuers do not highlight ICMS (CSOSN 102) and use
/// PIS/COFINS 49; everyone else defaults to the fully taxed codes.
pub fn regime_default_code(kind: TaxKind, regime: TaxRegime) -> &'static str {
    match (kind, regime) {
        (TaxKind::Icms, TaxRegime::Simplified) => "102",
        (TaxKind::Icms, TaxRegime::SimplifiedExcess | TaxRegime::Normal) => "00",
        (TaxKind::Pis | TaxKind::Cofins, TaxRegime::Simplified) => "49",
        (TaxKind::Pis | TaxKind::Cofins, _) => "01",
        (TaxKind::Ibs | TaxKind::Cbs, _) => "000",
    }
}

/// Whether `code` charges tax for `kind`. Exempt, deferred and
/// non-taxed codes still travel on the line but with zero amounts.
pub fn is_effectively_taxed(kind: TaxKind, code: &str) -> bool {
    let set = match kind {
        TaxKind::Icms => ICMS_TAXED,
        TaxKind::Pis | TaxKind::Cofins => PIS_COFINS_TAXED,
        TaxKind::Ibs | TaxKind::Cbs => SUCCESSOR_TAXED,
    };
    set.contains(&code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regime_defaults() {
        assert_eq!(regime_default_code(TaxKind::Icms, TaxRegime::Simplified), "102");
        assert_eq!(regime_default_code(TaxKind::Icms, TaxRegime::SimplifiedExcess), "00");
        assert_eq!(regime_default_code(TaxKind::Icms, TaxRegime::Normal), "00");
        assert_eq!(regime_default_code(TaxKind::Pis, TaxRegime::Simplified), "49");
        assert_eq!(regime_default_code(TaxKind::Cofins, TaxRegime::Normal), "01");
        assert_eq!(regime_default_code(TaxKind::Cbs, TaxRegime::Simplified), "000");
    }

    #[test]
    fn every_regime_default_is_consistent() {
        // Simples Nacional defaults never charge ICMS or PIS/COFINS; the others always do
        for kind in TaxKind::ALL {
            let normal = regime_default_code(kind, TaxRegime::Normal);
            assert!(is_effectively_taxed(kind, normal), "{kind:?} {normal}");
        }
        for kind in [TaxKind::Icms, TaxKind::Pis, TaxKind::Cofins] {
            let simples = regime_default_code(kind, TaxRegime::Simplified);
            assert!(!is_effectively_taxed(kind, simples), "{kind:?} {simples}");
        }
    }

    #[test]
    fn exempt_codes_not_taxed() {
        for code in ["40", "41", "50", "60", "101", "102", "103", "300", "400", "500"] {
            assert!(!is_effectively_taxed(TaxKind::Icms, code), "ICMS {code}");
        }
        for code in ["04", "06", "07", "08", "09", "49", "99"] {
            assert!(!is_effectively_taxed(TaxKind::Pis, code), "PIS {code}");
            assert!(!is_effectively_taxed(TaxKind::Cofins, code), "COFINS {code}");
        }
        assert!(!is_effectively_taxed(TaxKind::Ibs, "410"));
    }
}
