//! Processor webhook payload and its mapping onto `StatusEvent`.

use std::collections::HashMap;

use serde::Deserialize;

use super::errors::OnboardingError;
use super::status::OnboardingStatus;
use super::status_event::{EventSource, StatusEvent};
use crate::domain::foundation::{MerchantRef, Timestamp};

/// Keys in `additionalData` that may carry a stable delivery id.
const EVENT_ID_KEYS: [&str; 2] = ["eventId", "event_id"];

/// Body of a processor webhook.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessorWebhookPayload {
    pub event_type: String,
    pub merchant_id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub timestamp: Option<ProcessorTimestamp>,
    #[serde(default)]
    pub additional_data: HashMap<String, serde_json::Value>,
}

/// Processors send either RFC 3339 strings or Unix seconds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ProcessorTimestamp {
    UnixSeconds(i64),
    Text(String),
}

impl ProcessorTimestamp {
    pub fn to_timestamp(&self) -> Option<Timestamp> {
        match self {
            ProcessorTimestamp::UnixSeconds(secs) => Timestamp::from_unix_secs(*secs),
            ProcessorTimestamp::Text(text) => Timestamp::parse_rfc3339(text),
        }
    }

    fn as_key(&self) -> String {
        match self {
            ProcessorTimestamp::UnixSeconds(secs) => secs.to_string(),
            ProcessorTimestamp::Text(text) => text.clone(),
        }
    }
}

impl ProcessorWebhookPayload {
    /// The processor's own delivery id, if it sent one.
    pub fn event_id(&self) -> Option<&str> {
        EVENT_ID_KEYS
            .iter()
            .find_map(|key| self.additional_data.get(*key))
            .and_then(|value| value.as_str())
            .filter(|id| !id.is_empty())
    }

    /// Key used to recognise redeliveries of the same event.
    ///
    /// Prefers the processor's event id; falls back to
    /// `merchant|status|timestamp`. Without either there is nothing that
    /// tells a redelivery from a new event with the same status, so `None`.
    pub fn dedup_key(&self) -> Option<String> {
        if let Some(id) = self.event_id() {
            return Some(format!("evt:{}", id));
        }
        let timestamp = self.timestamp.as_ref()?.as_key();
        let status = self
            .status
            .as_deref()
            .unwrap_or(self.event_type.as_str())
            .to_ascii_lowercase();
        Some(format!("tuple:{}|{}|{}", self.merchant_id.trim(), status, timestamp))
    }

    /// Status the processor is reporting.
    ///
    /// Uses `status` when present, otherwise the last segment of the event
    /// type (`merchant.approved` -> `approved`).
    pub fn proposed_status(&self) -> Option<OnboardingStatus> {
        if let Some(status) = self.status.as_deref().filter(|s| !s.trim().is_empty()) {
            return OnboardingStatus::from_processor_vocabulary(status);
        }
        self.event_type
            .rsplit('.')
            .next()
            .and_then(OnboardingStatus::from_processor_vocabulary)
    }

    /// Converts into a guard input.
    ///
    /// Returns `Ok(None)` when the status vocabulary is unknown; those events
    /// are acknowledged and dropped.
    pub fn to_status_event(
        &self,
        received_at: Timestamp,
    ) -> Result<Option<StatusEvent>, OnboardingError> {
        let merchant_ref = MerchantRef::new(self.merchant_id.clone())
            .map_err(|e| OnboardingError::MalformedPayload(e.to_string()))?;

        let observed_at = match &self.timestamp {
            Some(ts) => ts.to_timestamp().ok_or_else(|| {
                OnboardingError::MalformedPayload(format!(
                    "unparseable timestamp '{}'",
                    ts.as_key()
                ))
            })?,
            None => received_at,
        };

        let Some(status) = self.proposed_status() else {
            return Ok(None);
        };

        Ok(Some(
            StatusEvent::new(merchant_ref, status, observed_at, EventSource::Webhook)
                .with_reason(self.reason.clone()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> ProcessorWebhookPayload {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn parses_camel_case_body() {
        let payload = parse(json!({
            "eventType": "merchant.status_changed",
            "merchantId": "M1",
            "status": "under_review",
            "reason": "documents received",
            "timestamp": "2024-01-15T10:00:00Z",
            "additionalData": { "eventId": "evt_1", "attempt": 2 }
        }));

        assert_eq!(payload.event_id(), Some("evt_1"));
        assert_eq!(payload.proposed_status(), Some(OnboardingStatus::KycSubmitted));
    }

    #[test]
    fn status_falls_back_to_event_type_suffix() {
        let payload = parse(json!({
            "eventType": "merchant.approved",
            "merchantId": "M1"
        }));

        assert_eq!(
            payload.proposed_status(),
            Some(OnboardingStatus::MerchantApproved)
        );
    }

    #[test]
    fn dedup_key_prefers_event_id() {
        let payload = parse(json!({
            "eventType": "merchant.approved",
            "merchantId": "M1",
            "additionalData": { "event_id": "evt_9" }
        }));
        assert_eq!(payload.dedup_key().as_deref(), Some("evt:evt_9"));
    }

    #[test]
    fn dedup_key_falls_back_to_tuple() {
        let payload = parse(json!({
            "eventType": "merchant.status_changed",
            "merchantId": "M1",
            "status": "Active",
            "timestamp": 1705312800
        }));
        assert_eq!(payload.dedup_key().as_deref(), Some("tuple:M1|active|1705312800"));
    }

    #[test]
    fn no_dedup_key_without_id_or_timestamp() {
        let payload = parse(json!({
            "eventType": "merchant.status_changed",
            "merchantId": "M1",
            "status": "Active"
        }));
        assert_eq!(payload.dedup_key(), None);
    }

    #[test]
    fn unix_timestamp_becomes_observed_at() {
        let payload = parse(json!({
            "eventType": "merchant.status_changed",
            "merchantId": "M1",
            "status": "active",
            "timestamp": 1705312800
        }));

        let event = payload.to_status_event(Timestamp::now()).unwrap().unwrap();

        assert_eq!(event.observed_at.as_unix_secs(), 1705312800);
        assert_eq!(event.source, EventSource::Webhook);
    }

    #[test]
    fn missing_timestamp_uses_receive_time() {
        let received = Timestamp::from_unix_secs(42).unwrap();
        let payload = parse(json!({ "eventType": "merchant.active", "merchantId": "M1" }));

        let event = payload.to_status_event(received).unwrap().unwrap();

        assert_eq!(event.observed_at, received);
    }

    #[test]
    fn unknown_vocabulary_yields_none() {
        let payload = parse(json!({
            "eventType": "merchant.payout_sent",
            "merchantId": "M1"
        }));
        assert!(payload.to_status_event(Timestamp::now()).unwrap().is_none());
    }

    #[test]
    fn blank_merchant_is_malformed() {
        let payload = parse(json!({ "eventType": "merchant.active", "merchantId": " " }));
        assert!(matches!(
            payload.to_status_event(Timestamp::now()),
            Err(OnboardingError::MalformedPayload(_))
        ));
    }

    #[test]
    fn garbage_timestamp_is_malformed() {
        let payload = parse(json!({
            "eventType": "merchant.active",
            "merchantId": "M1",
            "timestamp": "last tuesday"
        }));
        assert!(matches!(
            payload.to_status_event(Timestamp::now()),
            Err(OnboardingError::MalformedPayload(_))
        ));
    }
}
