//! Processor API request and response bodies.
//!
//! These mirror the processor's JSON exactly and are mapped to port types by
//! the HTTP client. Field names are camelCase on the wire except in the
//! OAuth token response, which follows RFC 6749.

use serde::{Deserialize, Serialize};

use crate::domain::onboarding::ProcessorTimestamp;
use crate::ports::{DocumentStatus, MerchantApplication};

// ════════════════════════════════════════════════════════════════════════════════
// OAuth
// ════════════════════════════════════════════════════════════════════════════════

/// Client-credentials token response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Lifetime in seconds.
    pub expires_in: u64,
}

// ════════════════════════════════════════════════════════════════════════════════
// Merchants
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMerchantRequest<'a> {
    pub external_id: &'a str,
    pub legal_name: &'a str,
    pub registration_number: &'a str,
    pub contact_email: &'a str,
    pub country: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<&'a str>,
}

impl<'a> From<&'a MerchantApplication> for CreateMerchantRequest<'a> {
    fn from(application: &'a MerchantApplication) -> Self {
        Self {
            external_id: &application.external_id,
            legal_name: &application.legal_name,
            registration_number: &application.registration_number,
            contact_email: &application.contact_email,
            country: &application.country,
            template_id: application.template_id.as_deref(),
        }
    }
}

/// Merchant object returned by create and get.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerchantResponse {
    pub merchant_id: String,
    pub status: String,
    #[serde(default)]
    pub status_reason: Option<String>,
    /// When the processor last changed the status.
    #[serde(default)]
    pub updated_at: Option<ProcessorTimestamp>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Documents
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentResponse {
    pub document_id: String,
    pub status: DocumentStatus,
}

/// Error body the processor sends with 4xx/5xx responses.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorResponse {
    /// Best human-readable description, falling back to the raw body.
    pub fn describe(body: &str) -> String {
        match serde_json::from_str::<ErrorResponse>(body) {
            Ok(parsed) => parsed
                .message
                .or(parsed.error)
                .unwrap_or_else(|| body.to_string()),
            Err(_) => body.to_string(),
        }
    }
}
