//! WebhookReceiptStore port - Dedup records for processor webhooks.
//!
//! The processor redelivers a webhook whenever it does not see a 2xx in
//! time, so the same event can arrive several times. A receipt is written
//! once an event reached a final outcome; a second delivery with the same
//! dedup key inside the window is acknowledged without touching the guard.
//!
//! Failed deliveries (unknown merchant, lost race, storage error) get no
//! receipt so the processor's retry is processed normally.

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::foundation::{DomainError, MerchantRef, Timestamp};

/// Final outcome of a processed webhook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptOutcome {
    Applied,
    NoOp,
    Rejected,
    Ignored,
}

impl ReceiptOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReceiptOutcome::Applied => "applied",
            ReceiptOutcome::NoOp => "no_op",
            ReceiptOutcome::Rejected => "rejected",
            ReceiptOutcome::Ignored => "ignored",
        }
    }
}

/// Record of a processed webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookReceipt {
    /// `evt:<id>` or `tuple:<merchant>|<status>|<timestamp>`.
    pub dedup_key: String,

    /// Processor event type (e.g. "merchant.approved").
    pub event_type: String,

    pub merchant_ref: Option<MerchantRef>,

    pub received_at: Timestamp,

    pub outcome: ReceiptOutcome,
}

impl WebhookReceipt {
    pub fn new(
        dedup_key: impl Into<String>,
        event_type: impl Into<String>,
        merchant_ref: Option<MerchantRef>,
        received_at: Timestamp,
        outcome: ReceiptOutcome,
    ) -> Self {
        Self {
            dedup_key: dedup_key.into(),
            event_type: event_type.into(),
            merchant_ref,
            received_at,
            outcome,
        }
    }
}

/// Result of attempting to record a receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveResult {
    /// First receipt for this key.
    Inserted,
    /// Another delivery recorded the key first.
    AlreadyExists,
}

/// Port for storing webhook receipts.
///
/// Implementations should key on `dedup_key` with insert-if-absent
/// semantics so concurrent deliveries cannot both insert.
#[async_trait]
pub trait WebhookReceiptStore: Send + Sync {
    /// Find a receipt for `dedup_key` received at or after `since`.
    async fn find_since(
        &self,
        dedup_key: &str,
        since: Timestamp,
    ) -> Result<Option<WebhookReceipt>, DomainError>;

    /// Record a receipt; existing keys are left untouched.
    async fn record(&self, receipt: WebhookReceipt) -> Result<SaveResult, DomainError>;

    /// Delete receipts received before `cutoff`. Returns the number removed.
    async fn delete_before(&self, cutoff: Timestamp) -> Result<u64, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn webhook_receipt_store_is_object_safe() {
        fn _accepts_dyn(_store: &dyn WebhookReceiptStore) {}
    }

    #[test]
    fn outcome_serializes_snake_case() {
        let json = serde_json::to_string(&ReceiptOutcome::NoOp).unwrap();
        assert_eq!(json, "\"no_op\"");
    }
}
