//! Submission and confirmation workflow.
//!
//! [`Emitter::submit`] validates a stored document, mints a fresh
//! idempotency reference, submits it and persists the acknowledgment.
//! [`ConfirmationPoller`] then queries the gateway by reference until the
//! document reaches a terminal status or the poll budget runs out.
//! Status changes go through [`LifecycleStore::apply`] as explicit
//! [`Transition`](crate::core::Transition)s.
//!
//! ```text
//! draft ──submit──▶ processing ──poll──▶ authorized ──cancel──▶ cancelled
//!   ▲                   │
//!   │                   ├──▶ rejected
//!   └──── resubmit ─────┴──▶ error_authorization (539: reference dropped)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use emissao::emission::*;
//! use emissao::gateway::{GatewayConfig, HttpGateway};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let gateway = Arc::new(HttpGateway::new(GatewayConfig::from_env()?)?);
//! let store = Arc::new(InMemoryStore::new());
//! let emitter = Emitter::new(gateway, store).with_config(EmissionConfig::from_env()?);
//!
//! let report = emitter.submit_and_confirm("doc-1", &CancelSignal::never()).await?;
//! println!("{:?}", report.submission.outcome);
//! # Ok(())
//! # }
//! ```

mod calls;
mod config;
mod error;
mod numbering;
mod orchestrator;
mod poller;
mod policy;
mod reference;
mod store;

pub use config::EmissionConfig;
pub use error::{EmissionError, StoreError};
pub use numbering::{NumberSource, SeriesNumbers};
pub use orchestrator::{
    DUPLICATE_HINT, EmissionReport, Emitter, EventReport, MIN_JUSTIFICATION_CHARS, ResyncReport,
    SubmissionOutcome, SubmissionReport,
};
pub use poller::{
    Backoff, CancelHandle, CancelSignal, ConfirmationPoller, Observation, PollOutcome,
    PollPolicy, PollReport, Sleeper, TokioSleeper,
};
pub use policy::{DuplicatePolicy, InvalidateReference, RetainReference};
pub use reference::{ReferenceGenerator, SUFFIX_LEN};
pub use store::{InMemoryStore, LifecycleStore};
