//! Tax rule resolution for document lines.
//!
//! Resolves ICMS, PIS, COFINS and the successor taxes IBS/CBS for a line
//! from the issuer regime, the operation code's incidence flags and
//! product-level overrides. Everything here is pure and deterministic;
//! the rate tables are static data shared freely across threads.
//!
//! # Example
//!
//! ```
//! use emissao::core::*;
//! use emissao::tax::*;
//! use rust_decimal_macros::dec;
//!
//! let rates = RateTable::default();
//! let input = TaxInput {
//!     line_total: dec!(1000),
//!     regime: TaxRegime::Normal,
//!     rates: &rates,
//!     incidence: TaxIncidence { icms: false, pis_cofins: true, successor: false },
//!     operation_codes: &SituationCodes::new(),
//!     product_override: None,
//!     issuer_state: "MT",
//!     destination_state: "MT",
//!     origin: ProductOrigin::National,
//! };
//! let taxes = resolve_line(&input);
//! assert_eq!(taxes.icms.amount, dec!(0));
//! assert_eq!(taxes.pis.amount, dec!(16.50));
//! assert_eq!(taxes.cofins.amount, dec!(76.00));
//! ```

mod interstate;
mod resolver;
mod situation;

pub use interstate::{IMPORTED_INTERSTATE_RATE, interstate_icms_rate, is_interstate};
pub use resolver::{TaxInput, TaxTotals, resolve_component, resolve_line, sum_taxes};
pub use situation::{is_effectively_taxed, regime_default_code};
