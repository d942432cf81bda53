//! WebhookIngestor - Verifies, deduplicates and applies processor webhooks.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};

use crate::domain::foundation::{MerchantRef, OrganizationId, Timestamp};
use crate::domain::onboarding::{
    OnboardingError, OnboardingStatus, ProcessorWebhookPayload, ProcessorWebhookVerifier,
    RejectionReason,
};
use crate::ports::{ReceiptOutcome, WebhookReceipt, WebhookReceiptStore};

use super::apply_status_transition::{StatusTransitionGuard, TransitionOutcome};

/// Default window in which a redelivered webhook is treated as a duplicate.
pub const DEFAULT_DEDUP_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

/// Result of ingesting one webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookIngestResult {
    /// Status changed.
    Applied {
        organization_id: OrganizationId,
        from: OnboardingStatus,
        to: OnboardingStatus,
    },
    /// Status already matched.
    NoOp {
        organization_id: OrganizationId,
        status: OnboardingStatus,
    },
    /// Transition refused by the state machine; acknowledged anyway.
    Rejected {
        organization_id: OrganizationId,
        reason: RejectionReason,
    },
    /// Same event already processed inside the dedup window.
    Duplicate { dedup_key: String },
    /// Status vocabulary not recognised.
    Ignored { event_type: String },
}

impl WebhookIngestResult {
    /// Short outcome label for response bodies and logs.
    pub fn outcome(&self) -> &'static str {
        match self {
            WebhookIngestResult::Applied { .. } => "applied",
            WebhookIngestResult::NoOp { .. } => "no_op",
            WebhookIngestResult::Rejected { .. } => "rejected",
            WebhookIngestResult::Duplicate { .. } => "duplicate",
            WebhookIngestResult::Ignored { .. } => "ignored",
        }
    }
}

impl From<TransitionOutcome> for WebhookIngestResult {
    fn from(outcome: TransitionOutcome) -> Self {
        match outcome {
            TransitionOutcome::Applied {
                organization_id,
                from,
                to,
                ..
            } => WebhookIngestResult::Applied {
                organization_id,
                from,
                to,
            },
            TransitionOutcome::NoOp {
                organization_id,
                status,
            } => WebhookIngestResult::NoOp {
                organization_id,
                status,
            },
            TransitionOutcome::Rejected {
                organization_id,
                reason,
                ..
            } => WebhookIngestResult::Rejected {
                organization_id,
                reason,
            },
        }
    }
}

/// Push channel into the status transition guard.
///
/// A delivery that fails (bad signature, unknown merchant, lost race,
/// storage error) records no receipt, so the processor's retry is handled
/// as a fresh delivery.
pub struct WebhookIngestor {
    verifier: ProcessorWebhookVerifier,
    guard: Arc<StatusTransitionGuard>,
    receipts: Arc<dyn WebhookReceiptStore>,
    dedup_window: Duration,
}

impl WebhookIngestor {
    pub fn new(
        verifier: ProcessorWebhookVerifier,
        guard: Arc<StatusTransitionGuard>,
        receipts: Arc<dyn WebhookReceiptStore>,
    ) -> Self {
        Self {
            verifier,
            guard,
            receipts,
            dedup_window: DEFAULT_DEDUP_WINDOW,
        }
    }

    pub fn with_dedup_window(mut self, window: Duration) -> Self {
        self.dedup_window = window;
        self
    }

    /// Ingests one raw webhook delivery.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` - signature missing or wrong; body never parsed
    /// - `MalformedPayload` - body not understood
    /// - `NotFound` - merchant ref not linked to any organization
    /// - `ConcurrencyConflict` / `Repository` - retry expected
    pub async fn ingest(
        &self,
        raw_body: &[u8],
        signature_header: Option<&str>,
    ) -> Result<WebhookIngestResult, OnboardingError> {
        let payload = self.verifier.verify_and_parse(raw_body, signature_header)?;
        let received_at = Timestamp::now();
        let dedup_key = payload.dedup_key();

        if let Some(key) = &dedup_key {
            let window_start = received_at.minus_secs(self.dedup_window.as_secs() as i64);
            if self.receipts.find_since(key, window_start).await?.is_some() {
                tracing::debug!(
                    dedup_key = %key,
                    event_type = %payload.event_type,
                    "Duplicate webhook acknowledged"
                );
                return Ok(WebhookIngestResult::Duplicate {
                    dedup_key: key.clone(),
                });
            }
        }

        let Some(event) = payload.to_status_event(received_at)? else {
            tracing::info!(
                event_type = %payload.event_type,
                status = payload.status.as_deref().unwrap_or(""),
                merchant_id = %payload.merchant_id,
                "Webhook with unknown status vocabulary ignored"
            );
            self.record_receipt(&payload, dedup_key, None, received_at, ReceiptOutcome::Ignored)
                .await;
            return Ok(WebhookIngestResult::Ignored {
                event_type: payload.event_type,
            });
        };

        let merchant_ref = event.merchant_ref.clone();
        let outcome = self.guard.apply(event).await?;

        let receipt_outcome = match &outcome {
            TransitionOutcome::Applied { .. } => ReceiptOutcome::Applied,
            TransitionOutcome::NoOp { .. } => ReceiptOutcome::NoOp,
            TransitionOutcome::Rejected { .. } => ReceiptOutcome::Rejected,
        };
        self.record_receipt(
            &payload,
            dedup_key,
            Some(merchant_ref),
            received_at,
            receipt_outcome,
        )
        .await;

        Ok(outcome.into())
    }

    /// Deletes receipts older than the dedup window. Returns how many.
    pub async fn purge_expired_receipts(&self) -> Result<u64, OnboardingError> {
        let cutoff = Timestamp::now().minus_secs(self.dedup_window.as_secs() as i64);
        Ok(self.receipts.delete_before(cutoff).await?)
    }

    /// Purges expired receipts every `period` until the shutdown signal is
    /// `true` or its sender is dropped. The first purge runs immediately.
    pub async fn run_receipt_pruning(
        &self,
        period: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) {
        if *shutdown.borrow() {
            return;
        }

        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }

                _ = interval.tick() => {
                    match self.purge_expired_receipts().await {
                        Ok(0) => {}
                        Ok(purged) => tracing::debug!(purged, "Expired webhook receipts purged"),
                        Err(e) => tracing::warn!(error = %e, "Webhook receipt pruning failed"),
                    }
                }
            }
        }
    }

    /// The status change is already durable at this point; a lost receipt
    /// only means a redelivery reaches the guard again. Deliveries without a
    /// dedup key leave no receipt.
    async fn record_receipt(
        &self,
        payload: &ProcessorWebhookPayload,
        dedup_key: Option<String>,
        merchant_ref: Option<MerchantRef>,
        received_at: Timestamp,
        outcome: ReceiptOutcome,
    ) {
        let Some(dedup_key) = dedup_key else {
            return;
        };
        let receipt = WebhookReceipt::new(
            dedup_key,
            payload.event_type.clone(),
            merchant_ref,
            received_at,
            outcome,
        );
        if let Err(e) = self.receipts.record(receipt).await {
            tracing::warn!(
                event_type = %payload.event_type,
                error = %e,
                "Failed to record webhook receipt"
            );
        }
    }
}
