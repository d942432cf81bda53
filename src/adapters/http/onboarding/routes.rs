//! Axum router configuration for onboarding endpoints.

use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{handle_processor_webhook, health, OnboardingAppState};

/// Create the processor webhook router.
///
/// # Routes
/// - `POST /processor` - Handle processor webhooks (signature verified)
pub fn webhook_routes() -> Router<OnboardingAppState> {
    Router::new().route("/processor", post(handle_processor_webhook))
}

/// Create the complete onboarding router.
///
/// Mounts webhooks under `/api/webhooks` and the health probe at `/health`.
pub fn onboarding_router() -> Router<OnboardingAppState> {
    Router::new()
        .route("/health", get(health))
        .nest("/api/webhooks", webhook_routes())
}

/// Build the service: routes, state, request tracing and a per-request
/// timeout. Requests exceeding `request_timeout` get 408.
///
/// # Example
///
/// ```ignore
/// let app = build_app(state, Duration::from_secs(30));
/// axum::serve(listener, app).await?;
/// ```
pub fn build_app(state: OnboardingAppState, request_timeout: Duration) -> Router {
    onboarding_router()
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
