//! Onboarding error taxonomy.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | Unauthorized | 401 |
//! | MalformedPayload | 400 |
//! | NotFound / OrganizationNotFound | 404 |
//! | InvalidTransition | 409 |
//! | ConcurrencyConflict | 503 |
//! | ExternalService | 502 |
//! | Repository | 500 |

use axum::http::StatusCode;
use thiserror::Error;

use super::status::OnboardingStatus;
use crate::domain::foundation::{DomainError, MerchantRef, OrganizationId};
use crate::ports::ProcessorError;

/// Errors raised by the onboarding core.
#[derive(Debug, Error)]
pub enum OnboardingError {
    /// Webhook signature missing or wrong. Nothing was mutated.
    #[error("Invalid webhook signature")]
    Unauthorized,

    /// Webhook body could not be understood.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// No organization is linked to this merchant reference.
    #[error("Unknown merchant reference: {0}")]
    NotFound(MerchantRef),

    /// No organization exists with this id.
    #[error("Organization not found: {0}")]
    OrganizationNotFound(OrganizationId),

    /// The requested operation is not valid in the current status.
    #[error("Invalid transition from {from} to {to}: {reason}")]
    InvalidTransition {
        from: OnboardingStatus,
        to: OnboardingStatus,
        reason: String,
    },

    /// The processor call failed, timed out, or answered with an error.
    #[error("External service error: {0}")]
    ExternalService(#[from] ProcessorError),

    /// Compare-and-swap lost twice in a row.
    #[error("Concurrent status update lost for merchant {0}")]
    ConcurrencyConflict(MerchantRef),

    /// Persistence failed.
    #[error("Repository error: {0}")]
    Repository(#[from] DomainError),
}

impl OnboardingError {
    pub fn invalid_transition(
        from: OnboardingStatus,
        to: OnboardingStatus,
        reason: impl Into<String>,
    ) -> Self {
        OnboardingError::InvalidTransition {
            from,
            to,
            reason: reason.into(),
        }
    }

    /// Returns true if repeating the same request later may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            OnboardingError::ConcurrencyConflict(_) | OnboardingError::Repository(_) => true,
            OnboardingError::ExternalService(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Machine-readable error code for response bodies.
    pub fn error_code(&self) -> &'static str {
        match self {
            OnboardingError::Unauthorized => "INVALID_WEBHOOK_SIGNATURE",
            OnboardingError::MalformedPayload(_) => "MALFORMED_PAYLOAD",
            OnboardingError::NotFound(_) => "MERCHANT_NOT_FOUND",
            OnboardingError::OrganizationNotFound(_) => "ORGANIZATION_NOT_FOUND",
            OnboardingError::InvalidTransition { .. } => "INVALID_STATE_TRANSITION",
            OnboardingError::ExternalService(_) => "EXTERNAL_SERVICE_ERROR",
            OnboardingError::ConcurrencyConflict(_) => "CONCURRENCY_CONFLICT",
            OnboardingError::Repository(_) => "INTERNAL_ERROR",
        }
    }

    /// Maps the error to an HTTP status code.
    ///
    /// Status codes drive processor retry behavior: 5xx responses are
    /// redelivered, 4xx are not.
    pub fn status_code(&self) -> StatusCode {
        match self {
            OnboardingError::Unauthorized => StatusCode::UNAUTHORIZED,
            OnboardingError::MalformedPayload(_) => StatusCode::BAD_REQUEST,
            OnboardingError::NotFound(_) | OnboardingError::OrganizationNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            OnboardingError::InvalidTransition { .. } => StatusCode::CONFLICT,
            OnboardingError::ExternalService(_) => StatusCode::BAD_GATEWAY,
            OnboardingError::ConcurrencyConflict(_) => StatusCode::SERVICE_UNAVAILABLE,
            OnboardingError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
