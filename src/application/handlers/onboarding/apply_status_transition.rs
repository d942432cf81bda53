//! StatusTransitionGuard - The only writer of organization onboarding status.
//!
//! Every channel (webhook, poll, submission) turns what it saw into a
//! `StatusEvent` and hands it here. The guard serializes writes per merchant
//! with an in-process async mutex and uses compare-and-swap on
//! `status_version` against writers in other processes.
//!
//! No network call happens while a merchant lock is held.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::domain::foundation::{MerchantRef, OrganizationId, Timestamp};
use crate::domain::onboarding::{
    evaluate_transition, is_order_sensitive, EventSource, OnboardingError, OnboardingStatus,
    Organization, RejectionReason, StatusChange, StatusChangeNotice, StatusEvent,
    TransitionDecision,
};
use crate::ports::{OnboardingNotifier, OrganizationRepository};

/// Compare-and-swap attempts before giving up with `ConcurrencyConflict`.
const MAX_CAS_ATTEMPTS: usize = 2;

/// Outcome of applying one status event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// Status changed and was persisted.
    Applied {
        organization_id: OrganizationId,
        from: OnboardingStatus,
        to: OnboardingStatus,
        version: u64,
    },

    /// Proposed status equals the current one. Nothing written.
    NoOp {
        organization_id: OrganizationId,
        status: OnboardingStatus,
    },

    /// Proposed change refused. Nothing written.
    Rejected {
        organization_id: OrganizationId,
        from: OnboardingStatus,
        to: OnboardingStatus,
        reason: RejectionReason,
    },
}

impl TransitionOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, TransitionOutcome::Applied { .. })
    }

    pub fn organization_id(&self) -> OrganizationId {
        match self {
            TransitionOutcome::Applied { organization_id, .. }
            | TransitionOutcome::NoOp { organization_id, .. }
            | TransitionOutcome::Rejected { organization_id, .. } => *organization_id,
        }
    }
}

/// Applies status events under a per-merchant lock.
pub struct StatusTransitionGuard {
    repository: Arc<dyn OrganizationRepository>,
    notifier: Arc<dyn OnboardingNotifier>,
    locks: DashMap<MerchantRef, Arc<Mutex<()>>>,
}

impl StatusTransitionGuard {
    pub fn new(
        repository: Arc<dyn OrganizationRepository>,
        notifier: Arc<dyn OnboardingNotifier>,
    ) -> Self {
        Self {
            repository,
            notifier,
            locks: DashMap::new(),
        }
    }

    /// Applies `event` to the organization linked to its merchant ref.
    ///
    /// # Errors
    ///
    /// - `NotFound` - no organization carries this merchant ref, or it was
    ///   removed while the write was in flight
    /// - `ConcurrencyConflict` - the version moved under us twice
    /// - `Repository` - storage failed
    pub async fn apply(&self, event: StatusEvent) -> Result<TransitionOutcome, OnboardingError> {
        let lock = self.lock_for(&event.merchant_ref);
        let _held = lock.lock().await;

        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let organization = self
                .repository
                .find_by_merchant_ref(&event.merchant_ref)
                .await?
                .ok_or_else(|| OnboardingError::NotFound(event.merchant_ref.clone()))?;

            let decision = match evaluate_transition(organization.status, event.proposed_status) {
                TransitionDecision::Apply
                    if is_order_sensitive(organization.status, event.proposed_status)
                        && organization.is_stale_observation(&event.observed_at) =>
                {
                    TransitionDecision::Reject(RejectionReason::Stale)
                }
                decision => decision,
            };

            match decision {
                TransitionDecision::NoOp => {
                    tracing::debug!(
                        merchant_ref = %event.merchant_ref,
                        status = %organization.status,
                        source = %event.source,
                        "Status unchanged"
                    );
                    return Ok(TransitionOutcome::NoOp {
                        organization_id: organization.id,
                        status: organization.status,
                    });
                }
                TransitionDecision::Reject(reason) => {
                    tracing::warn!(
                        merchant_ref = %event.merchant_ref,
                        from = %organization.status,
                        to = %event.proposed_status,
                        source = %event.source,
                        reason = %reason,
                        "Status transition rejected"
                    );
                    return Ok(TransitionOutcome::Rejected {
                        organization_id: organization.id,
                        from: organization.status,
                        to: event.proposed_status,
                        reason,
                    });
                }
                TransitionDecision::Apply => {
                    let change = StatusChange {
                        status: event.proposed_status,
                        reason: event.reason.clone(),
                        observed_at: processor_observation(&event),
                    };

                    let swapped = self
                        .repository
                        .compare_and_swap_status(
                            &organization.id,
                            organization.status_version,
                            change,
                        )
                        .await?;

                    if swapped {
                        return Ok(self.applied(&organization, &event));
                    }

                    tracing::warn!(
                        merchant_ref = %event.merchant_ref,
                        expected_version = organization.status_version,
                        attempt,
                        "Status version moved during update"
                    );

                    if attempt == MAX_CAS_ATTEMPTS
                        && self.repository.find_by_id(&organization.id).await?.is_none()
                    {
                        return Err(OnboardingError::NotFound(event.merchant_ref));
                    }
                }
            }
        }

        Err(OnboardingError::ConcurrencyConflict(event.merchant_ref))
    }

    /// Number of merchants that have a lock entry.
    pub fn tracked_merchants(&self) -> usize {
        self.locks.len()
    }

    fn lock_for(&self, merchant_ref: &MerchantRef) -> Arc<Mutex<()>> {
        self.locks
            .entry(merchant_ref.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone()
    }

    fn applied(&self, organization: &Organization, event: &StatusEvent) -> TransitionOutcome {
        let version = organization.status_version + 1;

        tracing::info!(
            organization_id = %organization.id,
            merchant_ref = %event.merchant_ref,
            from = %organization.status,
            to = %event.proposed_status,
            source = %event.source,
            version,
            "Onboarding status updated"
        );

        let notice = StatusChangeNotice {
            organization_id: organization.id,
            organization_name: organization.name.clone(),
            merchant_ref: event.merchant_ref.clone(),
            from: organization.status,
            to: event.proposed_status,
            reason: event.reason.clone(),
            version,
            source: event.source,
            occurred_at: Timestamp::now(),
        };
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            let organization_id = notice.organization_id;
            if let Err(e) = notifier.status_changed(notice).await {
                tracing::warn!(
                    organization_id = %organization_id,
                    error = %e,
                    "Status change notification failed"
                );
            }
        });

        TransitionOutcome::Applied {
            organization_id: organization.id,
            from: organization.status,
            to: event.proposed_status,
            version,
        }
    }
}

/// Only processor-clock times are kept for later staleness checks.
fn processor_observation(event: &StatusEvent) -> Option<Timestamp> {
    match event.source {
        EventSource::Submission => None,
        EventSource::Webhook | EventSource::Poll => Some(event.observed_at),
    }
}
