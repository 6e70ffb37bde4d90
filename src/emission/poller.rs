use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::calls::{gateway_call, store_call};
use super::config::EmissionConfig;
use super::numbering::NumberSource;
use super::policy::DuplicatePolicy;
use super::store::LifecycleStore;
use crate::core::{DocumentStatus, ReferenceDisposition, Transition};
use crate::gateway::{FiscalGateway, GatewayError, GatewayResponse, IssuerCredentials};

/// Delay growth between status queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backoff {
    /// Same delay before every query.
    Fixed,
    /// Delay times the number of attempts made so far.
    Linear,
}

/// Bounds of a polling run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollPolicy {
    pub max_attempts: u32,
    /// Base delay between queries, in milliseconds.
    pub delay_ms: u64,
    pub backoff: Backoff,
    /// Optional time budget for the whole run, in milliseconds.
    ///
    /// Time spent is read from the tokio clock and never counts less than
    /// the delays handed to the [`Sleeper`].
    pub budget_ms: Option<u64>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 20,
            delay_ms: 3_000,
            backoff: Backoff::Fixed,
            budget_ms: None,
        }
    }
}

impl PollPolicy {
    /// Delay after the `attempt`-th query (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let base = Duration::from_millis(self.delay_ms);
        match self.backoff {
            Backoff::Fixed => base,
            Backoff::Linear => base.saturating_mul(attempt.max(1)),
        }
    }

    pub fn budget(&self) -> Option<Duration> {
        self.budget_ms.map(Duration::from_millis)
    }
}

/// Sleeps between status queries. Injected so tests run without real delays.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// [`Sleeper`] backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Sender half of a cancellation signal.
#[derive(Debug)]
pub struct CancelHandle(watch::Sender<bool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.send_replace(true);
    }
}

/// Observed by the poller before every query and during every sleep.
#[derive(Debug, Clone)]
pub struct CancelSignal(watch::Receiver<bool>);

impl CancelSignal {
    /// A linked handle/signal pair.
    pub fn pair() -> (CancelHandle, CancelSignal) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle(tx), CancelSignal(rx))
    }

    /// A signal that never fires.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self(rx)
    }

    pub fn is_cancelled(&self) -> bool {
        *self.0.borrow()
    }

    /// Resolves once cancelled; pending forever if the handle is dropped first.
    pub async fn cancelled(&self) {
        let mut rx = self.0.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// How a polling run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The gateway reported a terminal status.
    Terminal(DocumentStatus),
    /// Attempts or time budget exhausted; resumable with the same reference.
    TimedOut { last_status: Option<DocumentStatus> },
    Cancelled { last_status: Option<DocumentStatus> },
}

/// Result of a polling run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollReport {
    pub document_id: String,
    pub reference: String,
    pub outcome: PollOutcome,
    /// Status queries issued.
    pub attempts: u32,
    /// Store writes that failed; the gateway state is ahead of the record.
    pub store_warnings: Vec<String>,
}

/// What a single status query observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    /// `None` when the gateway answered with an error instead of a status.
    pub status: Option<DocumentStatus>,
    pub store_warning: Option<String>,
}

/// Queries the gateway until a document reaches a terminal status.
#[derive(Clone)]
pub struct ConfirmationPoller {
    gateway: Arc<dyn FiscalGateway>,
    store: Arc<dyn LifecycleStore>,
    policy: Arc<dyn DuplicatePolicy>,
    sleeper: Arc<dyn Sleeper>,
    numbers: Option<Arc<dyn NumberSource>>,
    config: EmissionConfig,
}

impl std::fmt::Debug for ConfirmationPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfirmationPoller")
            .field("policy", &self.policy)
            .field("numbers", &self.numbers)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ConfirmationPoller {
    pub fn new(
        gateway: Arc<dyn FiscalGateway>,
        store: Arc<dyn LifecycleStore>,
        policy: Arc<dyn DuplicatePolicy>,
        sleeper: Arc<dyn Sleeper>,
        config: EmissionConfig,
    ) -> Self {
        Self {
            gateway,
            store,
            policy,
            sleeper,
            numbers: None,
            config,
        }
    }

    /// Source told about numbers the authority reports as duplicate.
    pub fn with_numbers(mut self, numbers: Option<Arc<dyn NumberSource>>) -> Self {
        self.numbers = numbers;
        self
    }

    /// Poll `reference` until terminal, timed out or cancelled.
    ///
    /// Every response is persisted. Transport errors count as attempts.
    pub async fn poll(
        &self,
        document_id: &str,
        reference: &str,
        credentials: &IssuerCredentials,
        cancel: &CancelSignal,
    ) -> PollReport {
        let policy = &self.config.poll;
        let started = Instant::now();
        let mut slept = Duration::ZERO;
        let mut attempts = 0;
        let mut last_status = None;
        let mut store_warnings = Vec::new();

        let outcome = loop {
            if cancel.is_cancelled() {
                break PollOutcome::Cancelled { last_status };
            }
            if attempts >= policy.max_attempts {
                break PollOutcome::TimedOut { last_status };
            }

            attempts += 1;
            match self.poll_once(document_id, reference, credentials).await {
                Ok(observation) => {
                    store_warnings.extend(observation.store_warning);
                    if let Some(status) = observation.status {
                        last_status = Some(status);
                        if status.is_terminal() {
                            break PollOutcome::Terminal(status);
                        }
                    }
                }
                Err(e) => {
                    warn!(document_id, reference, attempt = attempts, "status query failed: {e}");
                }
            }

            let delay = policy.delay_after(attempts);
            let spent = started.elapsed().max(slept);
            let out_of_time = policy
                .budget()
                .is_some_and(|budget| spent.saturating_add(delay) > budget);
            if attempts >= policy.max_attempts || out_of_time {
                break PollOutcome::TimedOut { last_status };
            }

            debug!(document_id, reference, attempt = attempts, ?delay, "document still processing");
            let cancelled = tokio::select! {
                _ = self.sleeper.sleep(delay) => false,
                _ = cancel.cancelled() => true,
            };
            if cancelled {
                break PollOutcome::Cancelled { last_status };
            }
            slept = slept.saturating_add(delay);
        };

        info!(document_id, reference, attempts, outcome = ?outcome, "polling finished");
        PollReport {
            document_id: document_id.to_string(),
            reference: reference.to_string(),
            outcome,
            attempts,
            store_warnings,
        }
    }

    /// One status query, persisted.
    pub async fn poll_once(
        &self,
        document_id: &str,
        reference: &str,
        credentials: &IssuerCredentials,
    ) -> Result<Observation, GatewayError> {
        let response = gateway_call(
            self.config.gateway_timeout(),
            "status",
            self.gateway.status(credentials, reference),
        )
        .await?;

        let Some((status, transition)) = self.interpret(reference, response) else {
            return Ok(Observation {
                status: None,
                store_warning: None,
            });
        };

        let store_warning = store_call(
            self.config.store_timeout(),
            "apply",
            self.store.apply(document_id, transition),
        )
        .await
        .err()
        .map(|e| {
            warn!(document_id, reference, "failed to persist polled status: {e}");
            e.to_string()
        });

        Ok(Observation {
            status: Some(status),
            store_warning,
        })
    }

    /// Transition for a polled response, or `None` when it carries no status.
    fn interpret(
        &self,
        reference: &str,
        response: GatewayResponse,
    ) -> Option<(DocumentStatus, Transition)> {
        match response {
            GatewayResponse::Accepted(ack) if ack.is_duplicate() => {
                warn!(reference, numbering = ?ack.artifacts.numbering, "gateway reports duplicate submission");
                if let (Some(numbers), Some(used)) = (&self.numbers, ack.artifacts.numbering) {
                    numbers.skip_past(used);
                }
                Some((
                    DocumentStatus::ErrorAuthorization,
                    Transition::AuthorizationFailed {
                        attempt: None,
                        reason: ack.reason().unwrap_or_else(|| "duplicate submission".into()),
                        reference: self.policy.on_duplicate(reference),
                    },
                ))
            }
            GatewayResponse::Accepted(ack) => {
                let status = ack.document_status();
                let transition = match status {
                    DocumentStatus::ErrorAuthorization => Transition::AuthorizationFailed {
                        attempt: None,
                        reason: ack.reason().unwrap_or_else(|| ack.status.as_str().to_string()),
                        reference: ReferenceDisposition::Retain,
                    },
                    DocumentStatus::Rejected => Transition::Rejected {
                        attempt: None,
                        reason: ack.reason().unwrap_or_else(|| ack.status.as_str().to_string()),
                    },
                    _ => Transition::Observed {
                        status,
                        reason: ack.reason(),
                        artifacts: ack.artifacts,
                    },
                };
                Some((status, transition))
            }
            GatewayResponse::Rejected(failure) if failure.is_duplicate() => {
                warn!(reference, "gateway reports duplicate submission");
                Some((
                    DocumentStatus::ErrorAuthorization,
                    Transition::AuthorizationFailed {
                        attempt: None,
                        reason: failure.reason(),
                        reference: self.policy.on_duplicate(reference),
                    },
                ))
            }
            GatewayResponse::Rejected(failure) => {
                warn!(reference, http_status = failure.http_status, "status query declined: {}", failure.reason());
                None
            }
        }
    }
}
