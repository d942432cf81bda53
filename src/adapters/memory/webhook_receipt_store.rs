//! In-memory webhook receipt store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, Timestamp};
use crate::ports::{SaveResult, WebhookReceipt, WebhookReceiptStore};

#[derive(Debug, Clone, Default)]
pub struct InMemoryWebhookReceiptStore {
    receipts: Arc<RwLock<HashMap<String, WebhookReceipt>>>,
}

impl InMemoryWebhookReceiptStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.receipts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.receipts.read().await.is_empty()
    }
}

#[async_trait]
impl WebhookReceiptStore for InMemoryWebhookReceiptStore {
    async fn find_since(
        &self,
        dedup_key: &str,
        since: Timestamp,
    ) -> Result<Option<WebhookReceipt>, DomainError> {
        let receipts = self.receipts.read().await;
        Ok(receipts
            .get(dedup_key)
            .filter(|r| !r.received_at.is_before(&since))
            .cloned())
    }

    async fn record(&self, receipt: WebhookReceipt) -> Result<SaveResult, DomainError> {
        let mut receipts = self.receipts.write().await;
        match receipts.get(&receipt.dedup_key) {
            // An expired receipt is replaced so the window restarts.
            Some(existing) if !existing.received_at.is_before(&receipt.received_at) => {
                Ok(SaveResult::AlreadyExists)
            }
            _ => {
                receipts.insert(receipt.dedup_key.clone(), receipt);
                Ok(SaveResult::Inserted)
            }
        }
    }

    async fn delete_before(&self, cutoff: Timestamp) -> Result<u64, DomainError> {
        let mut receipts = self.receipts.write().await;
        let before = receipts.len();
        receipts.retain(|_, r| !r.received_at.is_before(&cutoff));
        Ok((before - receipts.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::ReceiptOutcome;

    fn receipt(key: &str, received_at: Timestamp) -> WebhookReceipt {
        WebhookReceipt::new(key, "merchant.approved", None, received_at, ReceiptOutcome::Applied)
    }

    #[tokio::test]
    async fn record_then_find_within_window() {
        let store = InMemoryWebhookReceiptStore::new();
        let now = Timestamp::now();

        assert_eq!(store.record(receipt("evt:1", now)).await.unwrap(), SaveResult::Inserted);

        let found = store.find_since("evt:1", now.minus_secs(60)).await.unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn receipt_outside_window_is_not_found() {
        let store = InMemoryWebhookReceiptStore::new();
        let now = Timestamp::now();
        store.record(receipt("evt:1", now.minus_secs(7200))).await.unwrap();

        let found = store.find_since("evt:1", now.minus_secs(3600)).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn second_record_for_same_key_already_exists() {
        let store = InMemoryWebhookReceiptStore::new();
        let now = Timestamp::now();
        store.record(receipt("evt:1", now)).await.unwrap();

        let result = store.record(receipt("evt:1", now)).await.unwrap();
        assert_eq!(result, SaveResult::AlreadyExists);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn delete_before_prunes_old_receipts() {
        let store = InMemoryWebhookReceiptStore::new();
        let now = Timestamp::now();
        store.record(receipt("old", now.minus_secs(90_000))).await.unwrap();
        store.record(receipt("new", now)).await.unwrap();

        let deleted = store.delete_before(now.minus_secs(86_400)).await.unwrap();

        assert_eq!(deleted, 1);
        assert_eq!(store.len().await, 1);
    }
}
