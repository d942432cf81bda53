//! Organization record, as far as onboarding is concerned.
//!
//! The surrounding application owns the full organization profile; this
//! module only models the fields the onboarding core reads or writes.

use serde::{Deserialize, Serialize};

use super::status::OnboardingStatus;
use crate::domain::foundation::{MerchantRef, OrganizationId, Timestamp};

/// Onboarding view of a charitable organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,

    /// Assigned by the processor once a merchant account exists.
    pub merchant_ref: Option<MerchantRef>,

    pub status: OnboardingStatus,
    pub status_reason: Option<String>,

    /// Bumped by exactly one on every applied status change.
    pub status_version: u64,

    /// Processor-side observation time of the stored status. `None` when the
    /// status was set locally (submission).
    pub status_observed_at: Option<Timestamp>,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Organization {
    /// Registers a new organization at `Pending` with no merchant account.
    pub fn register(id: OrganizationId, name: impl Into<String>, now: Timestamp) -> Self {
        Self {
            id,
            name: name.into(),
            merchant_ref: None,
            status: OnboardingStatus::Pending,
            status_reason: None,
            status_version: 0,
            status_observed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns the same organization linked to a processor merchant.
    pub fn with_merchant_ref(mut self, merchant_ref: MerchantRef) -> Self {
        self.merchant_ref = Some(merchant_ref);
        self
    }

    /// Returns true if the reconciliation loop should poll this organization.
    pub fn is_pollable(&self) -> bool {
        self.merchant_ref.is_some() && self.status.is_in_flight()
    }

    /// Returns true if `observed_at` predates the stored status.
    pub fn is_stale_observation(&self, observed_at: &Timestamp) -> bool {
        self.status_observed_at
            .map(|stored| observed_at.is_before(&stored))
            .unwrap_or(false)
    }

    /// Applies a status change in memory, mirroring what a compare-and-swap
    /// write persists.
    pub fn apply_change(&mut self, change: &StatusChange, now: Timestamp) {
        self.status = change.status;
        self.status_reason = change.reason.clone();
        self.status_observed_at = change.observed_at;
        self.status_version += 1;
        self.updated_at = now;
    }
}

/// Write payload of a compare-and-swap status update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub status: OnboardingStatus,
    pub reason: Option<String>,
    /// Processor clock only; local events leave this `None`.
    pub observed_at: Option<Timestamp>,
}
