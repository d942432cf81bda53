//! Data Transfer Objects for onboarding HTTP endpoints.

use serde::{Deserialize, Serialize};

use crate::application::handlers::onboarding::{SchedulerState, WebhookIngestResult};
use crate::domain::onboarding::OnboardingStatus;

// ════════════════════════════════════════════════════════════════════════════════
// Webhook
// ════════════════════════════════════════════════════════════════════════════════

/// Acknowledgement returned to the processor for every accepted delivery.
///
/// Rejected, duplicate and ignored events are acknowledged too, so the
/// processor stops redelivering them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WebhookAckResponse {
    pub received: bool,
    /// applied | no_op | rejected | duplicate | ignored
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OnboardingStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl From<&WebhookIngestResult> for WebhookAckResponse {
    fn from(result: &WebhookIngestResult) -> Self {
        let mut response = Self {
            received: true,
            outcome: result.outcome().to_string(),
            organization_id: None,
            status: None,
            detail: None,
        };
        match result {
            WebhookIngestResult::Applied {
                organization_id,
                to,
                ..
            } => {
                response.organization_id = Some(organization_id.to_string());
                response.status = Some(*to);
            }
            WebhookIngestResult::NoOp {
                organization_id,
                status,
            } => {
                response.organization_id = Some(organization_id.to_string());
                response.status = Some(*status);
            }
            WebhookIngestResult::Rejected {
                organization_id,
                reason,
            } => {
                response.organization_id = Some(organization_id.to_string());
                response.detail = Some(reason.to_string());
            }
            WebhookIngestResult::Duplicate { dedup_key } => {
                response.detail = Some(dedup_key.clone());
            }
            WebhookIngestResult::Ignored { event_type } => {
                response.detail = Some(event_type.clone());
            }
        }
        response
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Health
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
    /// Absent when reconciliation is disabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reconciliation: Option<SchedulerState>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Errors
// ════════════════════════════════════════════════════════════════════════════════

/// Standard error response body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
        }
    }
}
