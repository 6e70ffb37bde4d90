//! # emissao
//!
//! Brazilian NF-e (modelo 55) emission engine: tax resolution, payload
//! building, gateway submission and confirmation polling.
//!
//! All monetary values use [`rust_decimal::Decimal`], never floating point.
//! Taxes are rounded half-up to cents.
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use emissao::core::*;
//! use rust_decimal_macros::dec;
//!
//! let issuer = IssuerBuilder::new(
//!     "fazenda",
//!     PartyBuilder::new("Fazenda Boa Vista Ltda", AddressBuilder::new("Rod. MT-130", "Zona Rural", "Primavera do Leste", "MT", "78850-000").build())
//!         .identifier("11.222.333/0001-81")
//!         .build(),
//! )
//! .regime(TaxRegime::Normal)
//! .build();
//!
//! let ctx = DocumentBuilder::new("doc-1", Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap())
//!     .nature("Venda de produção do estabelecimento")
//!     .recipient(PartyBuilder::new("Armazém Central S.A.", AddressBuilder::new("Av. Brasil", "Centro", "Rondonópolis", "MT", "78700-000").build())
//!         .identifier("11.444.777/0001-61")
//!         .build())
//!     .add_line(LineBuilder::new(1, "SOJA", "Soja em grãos", dec!(1000), dec!(1))
//!         .ncm("12019000")
//!         .cfop("5101", TaxIncidence { icms: false, pis_cofins: true, successor: false })
//!         .build())
//!     .build(issuer)
//!     .unwrap();
//!
//! assert!(validate_emission(&ctx).is_empty());
//! assert_eq!(ctx.document.totals.total, dec!(1000));
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `core` (default) | Document types, validation, identifiers, numbering |
//! | `tax` | ICMS / PIS / COFINS / IBS / CBS resolution |
//! | `payload` | Gateway payload building |
//! | `gateway` | Gateway response model, `FiscalGateway` trait, HTTP adapter |
//! | `emission` | Submission orchestrator, confirmation poller, lifecycle store |
//! | `all` | Everything |

#[cfg(feature = "core")]
pub mod core;

#[cfg(feature = "tax")]
pub mod tax;

#[cfg(feature = "payload")]
pub mod payload;

#[cfg(feature = "gateway")]
pub mod gateway;

#[cfg(feature = "emission")]
pub mod emission;

// Re-export core types at crate root for convenience
#[cfg(feature = "core")]
pub use crate::core::*;
