use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::calls::{gateway_call, store_call};
use super::config::EmissionConfig;
use super::error::{EmissionError, StoreError};
use super::numbering::NumberSource;
use super::poller::{CancelSignal, ConfirmationPoller, PollReport, Sleeper, TokioSleeper};
use super::policy::{DuplicatePolicy, InvalidateReference};
use super::reference::ReferenceGenerator;
use super::store::LifecycleStore;
use crate::core::{
    AttemptOutcome, DocumentNumber, DocumentStatus, EmissionAttempt, EmissionContext,
    FiscalDocument, Transition,
};
use crate::gateway::{
    Acknowledgment, AssetKind, FiscalGateway, GatewayResponse, IssuerCredentials,
};
use crate::payload::build_payload;

/// Minimum length of cancellation justifications and correction texts.
pub const MIN_JUSTIFICATION_CHARS: usize = 15;

/// Hint attached to duplicate rejections.
pub const DUPLICATE_HINT: &str = "retry with a different document number";

/// How a submission ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// The gateway took the document; `status` is usually processing.
    Accepted {
        reference: String,
        status: DocumentStatus,
    },
    /// No usable answer; persisted as rejected and safe to retry.
    Transport { diagnostic: String },
    /// Business rejection by the gateway or the authority.
    Rejected { reason: String },
    /// SEFAZ 539: the reference was handled per the duplicate policy.
    Duplicate { reason: String, hint: &'static str },
}

/// Result of one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReport {
    pub document_id: String,
    /// Reference the attempt was made under.
    pub reference: String,
    /// Series and number sent with the attempt, if any.
    pub numbering: Option<DocumentNumber>,
    pub outcome: SubmissionOutcome,
    /// Set when the outcome could not be persisted.
    pub store_warning: Option<String>,
}

/// Submission followed by confirmation polling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmissionReport {
    pub submission: SubmissionReport,
    /// `None` when the submission did not leave the document processing.
    pub poll: Option<PollReport>,
}

/// Result of a cancellation or correction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventReport {
    pub document_id: String,
    pub acknowledgment: Acknowledgment,
    pub store_warning: Option<String>,
}

/// Result of an on-demand status query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResyncReport {
    pub document_id: String,
    pub reference: String,
    pub status: Option<DocumentStatus>,
    pub store_warning: Option<String>,
}

/// Drives documents through submission, confirmation and post-authorization events.
#[derive(Clone)]
pub struct Emitter {
    gateway: Arc<dyn FiscalGateway>,
    store: Arc<dyn LifecycleStore>,
    policy: Arc<dyn DuplicatePolicy>,
    sleeper: Arc<dyn Sleeper>,
    numbers: Option<Arc<dyn NumberSource>>,
    references: Arc<ReferenceGenerator>,
    config: EmissionConfig,
}

impl std::fmt::Debug for Emitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter")
            .field("policy", &self.policy)
            .field("numbers", &self.numbers)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Emitter {
    pub fn new(gateway: Arc<dyn FiscalGateway>, store: Arc<dyn LifecycleStore>) -> Self {
        Self {
            gateway,
            store,
            policy: Arc::new(InvalidateReference),
            sleeper: Arc::new(TokioSleeper),
            numbers: None,
            references: Arc::new(ReferenceGenerator::new()),
            config: EmissionConfig::default(),
        }
    }

    pub fn with_policy(mut self, policy: Arc<dyn DuplicatePolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Number documents that have none from `numbers` before submitting.
    /// Without a source, unnumbered documents are numbered by the gateway.
    pub fn with_numbers(mut self, numbers: Arc<dyn NumberSource>) -> Self {
        self.numbers = Some(numbers);
        self
    }

    pub fn with_config(mut self, config: EmissionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &EmissionConfig {
        &self.config
    }

    /// Poller sharing this emitter's collaborators.
    pub fn poller(&self) -> ConfirmationPoller {
        ConfirmationPoller::new(
            self.gateway.clone(),
            self.store.clone(),
            self.policy.clone(),
            self.sleeper.clone(),
            self.config.clone(),
        )
        .with_numbers(self.numbers.clone())
    }

    /// Validate, mint a fresh reference, submit and persist the outcome.
    ///
    /// Validation failures return [`EmissionError::Validation`] without
    /// contacting the gateway or writing status. A number drawn from the
    /// number source is persisted before the gateway is called. Every
    /// gateway outcome is written; a failed write is reported as `store_warning`.
    pub async fn submit(&self, document_id: &str) -> Result<SubmissionReport, EmissionError> {
        let ctx = self.load_context(document_id).await?;
        check_submittable(&ctx.document)?;

        let mut built = build_payload(&ctx).map_err(EmissionError::Validation)?;
        let numbering = self.assign_number(&ctx.document).await?;
        if let Some(n) = numbering {
            built.payload.serie = Some(n.series);
            built.payload.numero = Some(n.number);
        }
        let reference = self
            .references
            .mint(&ctx.document.id, ctx.document.used_references());
        let credentials = IssuerCredentials::from_profile(&ctx.issuer);

        info!(
            document_id,
            reference = %reference,
            environment = ?credentials.environment,
            items = built.payload.items.len(),
            "submitting document"
        );

        let result = gateway_call(
            self.config.gateway_timeout(),
            "submit",
            self.gateway.submit(&credentials, &reference, &built.payload),
        )
        .await;

        let attempt = |outcome| EmissionAttempt {
            reference: reference.clone(),
            at: Utc::now(),
            outcome,
        };

        let (outcome, transition) = match result {
            Err(e) => {
                let diagnostic = e.diagnostic();
                warn!(document_id, reference = %reference, "submission failed in transport: {e}");
                (
                    SubmissionOutcome::Transport {
                        diagnostic: diagnostic.clone(),
                    },
                    Transition::Rejected {
                        attempt: Some(attempt(AttemptOutcome::TransportFailure)),
                        reason: diagnostic,
                    },
                )
            }
            Ok(GatewayResponse::Rejected(failure)) if failure.is_duplicate() => self.duplicate(
                document_id,
                &reference,
                numbering,
                failure.reason(),
                attempt(AttemptOutcome::Duplicate),
            ),
            Ok(GatewayResponse::Rejected(failure)) => {
                let reason = failure.reason();
                info!(document_id, reference = %reference, http_status = failure.http_status, "submission rejected: {reason}");
                (
                    SubmissionOutcome::Rejected {
                        reason: reason.clone(),
                    },
                    Transition::Rejected {
                        attempt: Some(attempt(AttemptOutcome::Rejected)),
                        reason,
                    },
                )
            }
            Ok(GatewayResponse::Accepted(ack)) if ack.is_duplicate() => {
                let reason = ack.reason().unwrap_or_else(|| ack.status.as_str().to_string());
                self.duplicate(
                    document_id,
                    &reference,
                    numbering,
                    reason,
                    attempt(AttemptOutcome::Duplicate),
                )
            }
            Ok(GatewayResponse::Accepted(ack)) => {
                let status = ack.document_status();
                let reason = ack.reason();
                match status {
                    // Refused synchronously: stored as rejected, like any other business rejection
                    DocumentStatus::ErrorAuthorization | DocumentStatus::Rejected => {
                        let reason = reason.unwrap_or_else(|| ack.status.as_str().to_string());
                        info!(document_id, reference = %reference, %status, "submission refused: {reason}");
                        (
                            SubmissionOutcome::Rejected {
                                reason: reason.clone(),
                            },
                            Transition::Rejected {
                                attempt: Some(attempt(AttemptOutcome::Rejected)),
                                reason,
                            },
                        )
                    }
                    _ => {
                        info!(document_id, reference = %reference, %status, "submission accepted");
                        (
                            SubmissionOutcome::Accepted {
                                reference: reference.clone(),
                                status,
                            },
                            Transition::Accepted {
                                attempt: attempt(AttemptOutcome::Accepted),
                                status,
                                artifacts: ack.artifacts,
                                reason,
                            },
                        )
                    }
                }
            }
        };

        let store_warning = self.persist(document_id, &reference, transition).await;
        Ok(SubmissionReport {
            document_id: document_id.to_string(),
            reference,
            numbering,
            outcome,
            store_warning,
        })
    }

    /// Submit, then poll while the document is processing.
    pub async fn submit_and_confirm(
        &self,
        document_id: &str,
        cancel: &CancelSignal,
    ) -> Result<EmissionReport, EmissionError> {
        let submission = self.submit(document_id).await?;
        let poll = match &submission.outcome {
            SubmissionOutcome::Accepted { reference, status } if !status.is_terminal() => {
                let ctx = self.load_context(document_id).await?;
                let credentials = IssuerCredentials::from_profile(&ctx.issuer);
                Some(
                    self.poller()
                        .poll(document_id, reference, &credentials, cancel)
                        .await,
                )
            }
            _ => None,
        };
        Ok(EmissionReport { submission, poll })
    }

    /// Resume polling a document under its stored reference.
    pub async fn confirm(
        &self,
        document_id: &str,
        cancel: &CancelSignal,
    ) -> Result<PollReport, EmissionError> {
        let ctx = self.load_context(document_id).await?;
        let reference = stored_reference(&ctx.document)?;
        let credentials = IssuerCredentials::from_profile(&ctx.issuer);
        Ok(self
            .poller()
            .poll(document_id, &reference, &credentials, cancel)
            .await)
    }

    /// One status query by stored reference, persisted like a poll attempt.
    pub async fn resync(&self, document_id: &str) -> Result<ResyncReport, EmissionError> {
        let ctx = self.load_context(document_id).await?;
        let reference = stored_reference(&ctx.document)?;
        let credentials = IssuerCredentials::from_profile(&ctx.issuer);
        let observation = self
            .poller()
            .poll_once(document_id, &reference, &credentials)
            .await?;
        Ok(ResyncReport {
            document_id: document_id.to_string(),
            reference,
            status: observation.status,
            store_warning: observation.store_warning,
        })
    }

    /// Cancel an authorized document.
    pub async fn cancel(
        &self,
        document_id: &str,
        justification: &str,
    ) -> Result<EventReport, EmissionError> {
        let justification = justification.trim();
        check_text_length("justification", justification)?;
        let ctx = self.load_context(document_id).await?;
        let reference = authorized_reference(&ctx.document)?;
        let credentials = IssuerCredentials::from_profile(&ctx.issuer);

        info!(document_id, reference = %reference, "cancelling document");
        let response = gateway_call(
            self.config.gateway_timeout(),
            "cancel",
            self.gateway.cancel(&credentials, &reference, justification),
        )
        .await?;

        let ack = accepted("cancel", response)?;
        if ack.document_status() != DocumentStatus::Cancelled {
            return Err(EmissionError::Declined {
                operation: "cancel",
                reason: ack.reason().unwrap_or_else(|| ack.status.as_str().to_string()),
            });
        }

        let store_warning = self
            .persist(
                document_id,
                &reference,
                Transition::Cancelled {
                    reason: justification.to_string(),
                },
            )
            .await;
        Ok(EventReport {
            document_id: document_id.to_string(),
            acknowledgment: ack,
            store_warning,
        })
    }

    /// Register a correction letter. Status and taxes are unchanged.
    pub async fn correct(
        &self,
        document_id: &str,
        correction: &str,
    ) -> Result<EventReport, EmissionError> {
        let correction = correction.trim();
        check_text_length("correction", correction)?;
        let ctx = self.load_context(document_id).await?;
        let reference = authorized_reference(&ctx.document)?;
        let credentials = IssuerCredentials::from_profile(&ctx.issuer);

        info!(document_id, reference = %reference, "registering correction letter");
        let response = gateway_call(
            self.config.gateway_timeout(),
            "correct",
            self.gateway.correct(&credentials, &reference, correction),
        )
        .await?;

        Ok(EventReport {
            document_id: document_id.to_string(),
            acknowledgment: accepted("correct", response)?,
            store_warning: None,
        })
    }

    /// Fetch an authorization asset, unmodified.
    pub async fn download(
        &self,
        document_id: &str,
        asset: AssetKind,
    ) -> Result<Vec<u8>, EmissionError> {
        let ctx = self.load_context(document_id).await?;
        let location = match asset {
            AssetKind::Xml => ctx.document.artifacts.xml_url.as_deref(),
            AssetKind::Rendition => ctx.document.artifacts.rendition_url.as_deref(),
        }
        .filter(|l| !l.trim().is_empty())
        .ok_or_else(|| EmissionError::AssetUnavailable {
            document_id: document_id.to_string(),
            asset,
        })?;
        let credentials = IssuerCredentials::from_profile(&ctx.issuer);

        Ok(gateway_call(
            self.config.gateway_timeout(),
            "download",
            self.gateway.download(&credentials, location),
        )
        .await?)
    }

    /// Number to submit under: the stored one, else a fresh one from the
    /// number source, persisted before use.
    async fn assign_number(
        &self,
        document: &FiscalDocument,
    ) -> Result<Option<DocumentNumber>, EmissionError> {
        if document.numbering.is_some() {
            return Ok(document.numbering);
        }
        let Some(numbers) = &self.numbers else {
            return Ok(None);
        };
        let numbering = numbers.next_number().map_err(EmissionError::Numbering)?;
        store_call(
            self.config.store_timeout(),
            "apply",
            self.store.apply(&document.id, Transition::Numbered { numbering }),
        )
        .await?;
        info!(
            document_id = %document.id,
            series = numbering.series,
            number = numbering.number,
            "assigned document number"
        );
        Ok(Some(numbering))
    }

    fn duplicate(
        &self,
        document_id: &str,
        reference: &str,
        numbering: Option<DocumentNumber>,
        reason: String,
        attempt: EmissionAttempt,
    ) -> (SubmissionOutcome, Transition) {
        let disposition = self.policy.on_duplicate(reference);
        warn!(document_id, reference, ?disposition, ?numbering, "duplicate submission: {reason}");
        if let (Some(numbers), Some(used)) = (&self.numbers, numbering) {
            numbers.skip_past(used);
        }
        (
            SubmissionOutcome::Duplicate {
                reason: reason.clone(),
                hint: DUPLICATE_HINT,
            },
            Transition::AuthorizationFailed {
                attempt: Some(attempt),
                reason,
                reference: disposition,
            },
        )
    }

    async fn load_context(&self, document_id: &str) -> Result<EmissionContext, StoreError> {
        store_call(
            self.config.store_timeout(),
            "load_context",
            self.store.load_context(document_id),
        )
        .await
    }

    /// Apply a transition; a failure comes back as a warning, never silently.
    async fn persist(
        &self,
        document_id: &str,
        reference: &str,
        transition: Transition,
    ) -> Option<String> {
        match store_call(
            self.config.store_timeout(),
            "apply",
            self.store.apply(document_id, transition),
        )
        .await
        {
            Ok(_) => None,
            Err(e) => {
                warn!(document_id, reference, "failed to persist outcome: {e}");
                Some(e.to_string())
            }
        }
    }
}

fn check_submittable(document: &FiscalDocument) -> Result<(), EmissionError> {
    match document.status {
        DocumentStatus::Authorized | DocumentStatus::Cancelled => {
            Err(EmissionError::AlreadyAuthorized {
                document_id: document.id.clone(),
                status: document.status,
            })
        }
        DocumentStatus::Processing => Err(EmissionError::InFlight {
            document_id: document.id.clone(),
        }),
        DocumentStatus::Draft | DocumentStatus::Rejected | DocumentStatus::ErrorAuthorization => {
            Ok(())
        }
    }
}

fn stored_reference(document: &FiscalDocument) -> Result<String, EmissionError> {
    document
        .gateway_reference
        .clone()
        .ok_or_else(|| EmissionError::MissingReference {
            document_id: document.id.clone(),
        })
}

fn authorized_reference(document: &FiscalDocument) -> Result<String, EmissionError> {
    if document.status != DocumentStatus::Authorized {
        return Err(EmissionError::NotAuthorized {
            document_id: document.id.clone(),
            status: document.status,
        });
    }
    stored_reference(document)
}

fn check_text_length(field: &'static str, text: &str) -> Result<(), EmissionError> {
    let actual = text.chars().count();
    if actual < MIN_JUSTIFICATION_CHARS {
        return Err(EmissionError::JustificationTooShort {
            field,
            min: MIN_JUSTIFICATION_CHARS,
            actual,
        });
    }
    Ok(())
}

fn accepted(operation: &'static str, response: GatewayResponse) -> Result<Acknowledgment, EmissionError> {
    match response {
        GatewayResponse::Accepted(ack) => Ok(ack),
        GatewayResponse::Rejected(failure) => Err(EmissionError::Declined {
            operation,
            reason: failure.reason(),
        }),
    }
}
