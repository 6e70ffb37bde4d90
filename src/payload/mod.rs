//! Gateway payload construction.
//!
//! Turns an [`EmissionContext`](crate::core::EmissionContext) into the flat
//! JSON document the authorization gateway accepts. Validation runs first
//! and every violation is reported at once; taxes are resolved per line
//! and summed into the document totals.
//!
//! # Example
//!
//! ```no_run
//! use emissao::core::*;
//! use emissao::payload;
//!
//! let ctx: EmissionContext = todo!(); // build via DocumentBuilder
//! match payload::build_payload(&ctx) {
//!     Ok(built) => println!("{}", serde_json::to_string(&built.payload).unwrap()),
//!     Err(errors) => eprintln!("{}", join_errors(&errors)),
//! }
//! ```

mod build;
mod model;

pub use build::{
    BuiltPayload, NO_STREET_NUMBER, PRODUCER_INVOICE_MODEL, attach_taxes, build_payload,
    resolve_line_taxes,
};
pub use model::{NfePayload, PayloadItem, PayloadPayment, PayloadReference};
