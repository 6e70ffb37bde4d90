//! Interstate ICMS rates by origin/destination region.
//!
//! - Imported goods (origin 1, 2, 3, 8): 4%.
//! - From South/Southeast (except ES) to North, Northeast, Center-West or ES: 7%.
//! - Every other interstate pair: 12%.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::core::ProductOrigin;
use crate::core::states::{Region, region_of};

/// Interstate rate for imported goods (Resolução do Senado 13/2012).
pub const IMPORTED_INTERSTATE_RATE: Decimal = dec!(4);

const REDUCED_INTERSTATE_RATE: Decimal = dec!(7);
const STANDARD_INTERSTATE_RATE: Decimal = dec!(12);

/// Whether an operation between two UFs is interstate.
pub fn is_interstate(issuer_state: &str, destination_state: &str) -> bool {
    !issuer_state.trim().eq_ignore_ascii_case(destination_state.trim())
}

/// ICMS rate for an interstate operation.
pub fn interstate_icms_rate(
    origin: ProductOrigin,
    issuer_state: &str,
    destination_state: &str,
) -> Decimal {
    if origin.is_imported_for_interstate() {
        return IMPORTED_INTERSTATE_RATE;
    }

    let from = issuer_state.trim().to_ascii_uppercase();
    let to = destination_state.trim().to_ascii_uppercase();

    let from_developed = matches!(region_of(&from), Some(Region::South | Region::Southeast))
        && from != "ES";
    let to_developing = matches!(
        region_of(&to),
        Some(Region::North | Region::Northeast | Region::CenterWest)
    ) || to == "ES";

    if from_developed && to_developing {
        REDUCED_INTERSTATE_RATE
    } else {
        STANDARD_INTERSTATE_RATE
    }
}
