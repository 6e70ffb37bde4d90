use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Tax types computed per document line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxKind {
    /// State VAT on goods and services.
    Icms,
    Pis,
    Cofins,
    /// Imposto sobre Bens e Serviços (successor of ICMS/ISS).
    Ibs,
    /// Contribuição sobre Bens e Serviços (successor of PIS/COFINS).
    Cbs,
}

impl TaxKind {
    pub const ALL: [TaxKind; 5] = [Self::Icms, Self::Pis, Self::Cofins, Self::Ibs, Self::Cbs];

    /// Payload field prefix (e.g. "icms" in `icms_valor`).
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Icms => "icms",
            Self::Pis => "pis",
            Self::Cofins => "cofins",
            Self::Ibs => "ibs",
            Self::Cbs => "cbs",
        }
    }
}

/// `CRT`: issuer tax regime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaxRegime {
    /// 1: Simples Nacional.
    Simplified,
    /// 2: Simples Nacional, gross revenue above the sublimit.
    SimplifiedExcess,
    /// 3: Regime normal.
    Normal,
}

impl TaxRegime {
    pub fn code(&self) -> u8 {
        match self {
            Self::Simplified => 1,
            Self::SimplifiedExcess => 2,
            Self::Normal => 3,
        }
    }

    /// Parse from the `CRT` numeric code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Simplified),
            2 => Some(Self::SimplifiedExcess),
            3 => Some(Self::Normal),
            _ => None,
        }
    }
}

/// `orig`: product origin (0–8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductOrigin {
    /// 0: National.
    National,
    /// 1: Foreign, direct import.
    ForeignDirectImport,
    /// 2: Foreign, acquired in the domestic market.
    ForeignDomesticMarket,
    /// 3: National, import content above 40% and up to 70%.
    NationalImportContentOver40,
    /// 4: National, produced under basic production processes (PPB).
    NationalBasicProcess,
    /// 5: National, import content up to 40%.
    NationalImportContentUpTo40,
    /// 6: Foreign, direct import without national similar (CAMEX list).
    ForeignDirectImportNoSimilar,
    /// 7: Foreign, domestic market without national similar (CAMEX list).
    ForeignDomesticMarketNoSimilar,
    /// 8: National, import content above 70%.
    NationalImportContentOver70,
}

impl ProductOrigin {
    pub fn code(&self) -> u8 {
        match self {
            Self::National => 0,
            Self::ForeignDirectImport => 1,
            Self::ForeignDomesticMarket => 2,
            Self::NationalImportContentOver40 => 3,
            Self::NationalBasicProcess => 4,
            Self::NationalImportContentUpTo40 => 5,
            Self::ForeignDirectImportNoSimilar => 6,
            Self::ForeignDomesticMarketNoSimilar => 7,
            Self::NationalImportContentOver70 => 8,
        }
    }

    /// Parse from the `orig` numeric code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::National),
            1 => Some(Self::ForeignDirectImport),
            2 => Some(Self::ForeignDomesticMarket),
            3 => Some(Self::NationalImportContentOver40),
            4 => Some(Self::NationalBasicProcess),
            5 => Some(Self::NationalImportContentUpTo40),
            6 => Some(Self::ForeignDirectImportNoSimilar),
            7 => Some(Self::ForeignDomesticMarketNoSimilar),
            8 => Some(Self::NationalImportContentOver70),
            _ => None,
        }
    }

    /// Origins subject to the 4% interstate ICMS rate (Resolução do Senado 13/2012).
    pub fn is_imported_for_interstate(&self) -> bool {
        matches!(
            self,
            Self::ForeignDirectImport
                | Self::ForeignDomesticMarket
                | Self::NationalImportContentOver40
                | Self::NationalImportContentOver70
        )
    }
}

/// Which taxes an operation code attracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxIncidence {
    pub icms: bool,
    /// PIS and COFINS always go together.
    pub pis_cofins: bool,
    /// IBS and CBS.
    pub successor: bool,
}

impl TaxIncidence {
    /// Every tax applies.
    pub const ALL: TaxIncidence = TaxIncidence {
        icms: true,
        pis_cofins: true,
        successor: true,
    };

    /// No tax applies.
    pub const NONE: TaxIncidence = TaxIncidence {
        icms: false,
        pis_cofins: false,
        successor: false,
    };

    pub fn applies(&self, kind: TaxKind) -> bool {
        match kind {
            TaxKind::Icms => self.icms,
            TaxKind::Pis | TaxKind::Cofins => self.pis_cofins,
            TaxKind::Ibs | TaxKind::Cbs => self.successor,
        }
    }
}

impl Default for TaxIncidence {
    fn default() -> Self {
        Self::ALL
    }
}

/// Tax situation codes (CST / CSOSN) keyed by tax type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SituationCodes(BTreeMap<TaxKind, String>);

impl SituationCodes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: TaxKind, code: impl Into<String>) -> Self {
        self.0.insert(kind, code.into());
        self
    }

    /// Non-blank code for `kind`, if one is set.
    pub fn get(&self, kind: TaxKind) -> Option<&str> {
        self.0
            .get(&kind)
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
    }
}

/// Product-level override of situation code and/or rate for one tax.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxOverride {
    pub situation_code: Option<String>,
    pub rate: Option<Decimal>,
}

/// Product-level tax overrides, keyed by tax type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductTaxOverride(BTreeMap<TaxKind, TaxOverride>);

impl ProductTaxOverride {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn situation_code(mut self, kind: TaxKind, code: impl Into<String>) -> Self {
        self.0.entry(kind).or_default().situation_code = Some(code.into());
        self
    }

    pub fn rate(mut self, kind: TaxKind, rate: Decimal) -> Self {
        self.0.entry(kind).or_default().rate = Some(rate);
        self
    }

    pub fn code_for(&self, kind: TaxKind) -> Option<&str> {
        self.0
            .get(&kind)
            .and_then(|o| o.situation_code.as_deref())
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }

    pub fn rate_for(&self, kind: TaxKind) -> Option<Decimal> {
        self.0.get(&kind).and_then(|o| o.rate)
    }
}

/// Issuer default rates, in percent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateTable {
    /// Internal (intrastate) ICMS rate of the issuer's state.
    pub icms: Decimal,
    pub pis: Decimal,
    pub cofins: Decimal,
    pub ibs: Decimal,
    pub cbs: Decimal,
}

impl RateTable {
    pub fn rate(&self, kind: TaxKind) -> Decimal {
        match kind {
            TaxKind::Icms => self.icms,
            TaxKind::Pis => self.pis,
            TaxKind::Cofins => self.cofins,
            TaxKind::Ibs => self.ibs,
            TaxKind::Cbs => self.cbs,
        }
    }
}

impl Default for RateTable {
    /// Non-cumulative PIS/COFINS, 18% internal ICMS and the 2026 IBS/CBS test rates.
    fn default() -> Self {
        Self {
            icms: dec!(18),
            pis: dec!(1.65),
            cofins: dec!(7.6),
            ibs: dec!(0.1),
            cbs: dec!(0.9),
        }
    }
}

/// Resolved base, rate and amount of one tax on one line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxComponent {
    pub kind: TaxKind,
    /// CST or CSOSN applied.
    pub situation_code: String,
    pub base: Decimal,
    /// Rate in percent.
    pub rate: Decimal,
    pub amount: Decimal,
}

impl TaxComponent {
    /// A component that carries a code but no charge.
    pub fn zero(kind: TaxKind, situation_code: impl Into<String>) -> Self {
        Self {
            kind,
            situation_code: situation_code.into(),
            base: Decimal::ZERO,
            rate: Decimal::ZERO,
            amount: Decimal::ZERO,
        }
    }
}

/// All taxes of one line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineTaxes {
    pub icms: TaxComponent,
    pub pis: TaxComponent,
    pub cofins: TaxComponent,
    pub ibs: TaxComponent,
    pub cbs: TaxComponent,
}

impl LineTaxes {
    pub fn get(&self, kind: TaxKind) -> &TaxComponent {
        match kind {
            TaxKind::Icms => &self.icms,
            TaxKind::Pis => &self.pis,
            TaxKind::Cofins => &self.cofins,
            TaxKind::Ibs => &self.ibs,
            TaxKind::Cbs => &self.cbs,
        }
    }
}
