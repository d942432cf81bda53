//! HTTP adapter for onboarding endpoints.
//!
//! - `POST /api/webhooks/processor` - Processor status webhooks
//! - `GET /health` - Liveness probe

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::{OnboardingApiError, OnboardingAppState};
pub use routes::{build_app, onboarding_router, webhook_routes};
