//! HTTP handlers for onboarding endpoints.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Json, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;

use crate::application::handlers::onboarding::{ReconciliationScheduler, WebhookIngestor};
use crate::domain::onboarding::{OnboardingError, SIGNATURE_HEADER};

use super::dto::{ErrorResponse, HealthResponse, WebhookAckResponse};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state for onboarding routes.
#[derive(Clone)]
pub struct OnboardingAppState {
    pub webhook_ingestor: Arc<WebhookIngestor>,
    /// `None` when reconciliation is disabled.
    pub scheduler: Option<Arc<ReconciliationScheduler>>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/webhooks/processor - Handle processor status webhooks
pub async fn handle_processor_webhook(
    State(state): State<OnboardingAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAckResponse>, OnboardingApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    let result = state.webhook_ingestor.ingest(&body, signature).await?;

    Ok(Json(WebhookAckResponse::from(&result)))
}

/// GET /health - Liveness probe
pub async fn health(State(state): State<OnboardingAppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        reconciliation: state.scheduler.as_ref().map(|s| s.state()),
    })
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts onboarding errors to HTTP responses.
#[derive(Debug)]
pub struct OnboardingApiError(OnboardingError);

impl From<OnboardingError> for OnboardingApiError {
    fn from(err: OnboardingError) -> Self {
        Self(err)
    }
}

impl IntoResponse for OnboardingApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.0.status_code();

        // Storage details stay in the log.
        let message = match &self.0 {
            OnboardingError::Repository(e) => {
                tracing::error!(error = %e, "Webhook processing failed");
                "Internal error".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorResponse::new(self.0.error_code(), message);
        (status, Json(body)).into_response()
    }
}
