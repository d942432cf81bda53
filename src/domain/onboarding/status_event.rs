//! Status events fed into the transition guard, and the notices it emits.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::status::OnboardingStatus;
use crate::domain::foundation::{MerchantRef, OrganizationId, Timestamp};

/// Channel a status event arrived through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    /// Pushed by the processor.
    Webhook,
    /// Pulled by the reconciliation loop.
    Poll,
    /// Produced locally after a merchant application was submitted.
    Submission,
}

impl fmt::Display for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventSource::Webhook => "webhook",
            EventSource::Poll => "poll",
            EventSource::Submission => "submission",
        };
        f.write_str(s)
    }
}

/// A proposed status for a merchant, as observed by one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEvent {
    pub merchant_ref: MerchantRef,
    pub proposed_status: OnboardingStatus,
    pub reason: Option<String>,
    pub observed_at: Timestamp,
    pub source: EventSource,
}

impl StatusEvent {
    pub fn new(
        merchant_ref: MerchantRef,
        proposed_status: OnboardingStatus,
        observed_at: Timestamp,
        source: EventSource,
    ) -> Self {
        Self {
            merchant_ref,
            proposed_status,
            reason: None,
            observed_at,
            source,
        }
    }

    pub fn with_reason(mut self, reason: Option<String>) -> Self {
        self.reason = reason.filter(|r| !r.trim().is_empty());
        self
    }
}

/// Emitted after a status change is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusChangeNotice {
    pub organization_id: OrganizationId,
    pub organization_name: String,
    pub merchant_ref: MerchantRef,
    pub from: OnboardingStatus,
    pub to: OnboardingStatus,
    pub reason: Option<String>,
    pub version: u64,
    pub source: EventSource,
    pub occurred_at: Timestamp,
}
