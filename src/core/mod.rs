//! Core fiscal document types, validation, and numbering.
//!
//! This module provides the NF-e domain model as held by the lifecycle
//! store, the document state machine, and accumulated validation of
//! everything a payload is built from.

mod builder;
mod error;
pub mod identifiers;
mod numbering;
pub mod states;
mod taxes;
mod types;
mod validation;

pub use builder::*;
pub use error::*;
pub use numbering::*;
pub use taxes::*;
pub use types::*;
pub use validation::*;
