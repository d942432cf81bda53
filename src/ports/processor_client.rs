//! Processor client port for the external card-acquiring platform.
//!
//! Defines the contract for merchant creation, status lookup and KYC
//! document upload. Implementations own authentication (token acquisition
//! and caching) and transport timeouts; callers only see typed results or a
//! `ProcessorError`.
//!
//! # Design
//!
//! - **Leaf dependency**: no knowledge of local organization state
//! - **Environment agnostic**: sandbox and production share this contract
//! - **Errors are never swallowed**: timeouts and 4xx/5xx surface as `ProcessorError`

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, ErrorCode, MerchantRef, Timestamp};
use crate::domain::onboarding::OnboardingStatus;

/// Port for card processor integrations.
#[async_trait]
pub trait ProcessorClient: Send + Sync {
    /// Create a merchant account for an organization.
    ///
    /// Returns the processor's merchant reference and initial status.
    async fn create_merchant(
        &self,
        application: MerchantApplication,
    ) -> Result<CreatedMerchant, ProcessorError>;

    /// Fetch the current merchant status as the processor sees it.
    async fn get_merchant_status(
        &self,
        merchant_ref: &MerchantRef,
    ) -> Result<MerchantStatusSnapshot, ProcessorError>;

    /// Upload one KYC document for a merchant.
    async fn upload_document(
        &self,
        merchant_ref: &MerchantRef,
        document: DocumentUpload,
    ) -> Result<UploadedDocument, ProcessorError>;
}

/// Organization details sent when creating a merchant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerchantApplication {
    /// Our organization id, echoed back by the processor as external id.
    pub external_id: String,
    pub legal_name: String,
    pub registration_number: String,
    pub contact_email: String,
    pub country: String,

    /// Processor onboarding template; the configured default applies when `None`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
}

/// Merchant account returned by `create_merchant`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedMerchant {
    pub merchant_ref: MerchantRef,

    /// `None` when the processor used vocabulary we do not recognise.
    pub status: Option<OnboardingStatus>,
}

/// Processor-side status of a merchant at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerchantStatusSnapshot {
    pub status: OnboardingStatus,
    pub reason: Option<String>,
    pub observed_at: Timestamp,
}

/// KYC document category expected by the processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentCategory {
    RegistrationCertificate,
    TaxExemption,
    BankStatement,
    DirectorIdentity,
    ProofOfAddress,
}

impl DocumentCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentCategory::RegistrationCertificate => "registration_certificate",
            DocumentCategory::TaxExemption => "tax_exemption",
            DocumentCategory::BankStatement => "bank_statement",
            DocumentCategory::DirectorIdentity => "director_identity",
            DocumentCategory::ProofOfAddress => "proof_of_address",
        }
    }
}

/// One document to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentUpload {
    pub category: DocumentCategory,
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// Review state of an uploaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Received,
    UnderReview,
    Accepted,
    Rejected,
    #[serde(other)]
    Unknown,
}

/// Result of `upload_document`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedDocument {
    pub document_id: String,
    pub status: DocumentStatus,
}

/// Errors from processor operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorError {
    /// Error code for categorization.
    pub code: ProcessorErrorCode,

    /// Human-readable message.
    pub message: String,

    /// HTTP status returned by the processor, if any.
    pub http_status: Option<u16>,
}

impl ProcessorError {
    /// Create a new processor error.
    pub fn new(code: ProcessorErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            http_status: None,
        }
    }

    /// Classify a non-success HTTP response.
    pub fn from_http_status(status: u16, body: impl Into<String>) -> Self {
        let code = match status {
            401 | 403 => ProcessorErrorCode::Authentication,
            404 => ProcessorErrorCode::NotFound,
            429 => ProcessorErrorCode::RateLimited,
            400..=499 => ProcessorErrorCode::Rejected,
            _ => ProcessorErrorCode::Unavailable,
        };
        Self {
            code,
            message: body.into(),
            http_status: Some(status),
        }
    }

    /// Create a timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ProcessorErrorCode::Timeout, message)
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProcessorErrorCode::Network, message)
    }

    /// Create an error for a response body we could not decode.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ProcessorErrorCode::InvalidResponse, message)
    }

    /// Whether the same call may succeed later.
    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

impl std::fmt::Display for ProcessorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.http_status {
            Some(status) => write!(f, "{} (HTTP {}): {}", self.code, status, self.message),
            None => write!(f, "{}: {}", self.code, self.message),
        }
    }
}

impl std::error::Error for ProcessorError {}

impl From<ProcessorError> for DomainError {
    fn from(err: ProcessorError) -> Self {
        DomainError::new(ErrorCode::ExternalServiceError, err.to_string())
    }
}

/// Processor error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessorErrorCode {
    /// Request exceeded the configured timeout.
    Timeout,

    /// Connection failed before a response arrived.
    Network,

    /// Credentials refused (401/403) or token exchange failed.
    Authentication,

    /// Merchant or resource unknown to the processor.
    NotFound,

    /// Rate limit exceeded (429).
    RateLimited,

    /// Any other 4xx: the processor refused the request.
    Rejected,

    /// 5xx from the processor.
    Unavailable,

    /// Success status but a body we could not decode.
    InvalidResponse,
}

impl ProcessorErrorCode {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProcessorErrorCode::Timeout
                | ProcessorErrorCode::Network
                | ProcessorErrorCode::RateLimited
                | ProcessorErrorCode::Unavailable
        )
    }
}

impl std::fmt::Display for ProcessorErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProcessorErrorCode::Timeout => "timeout",
            ProcessorErrorCode::Network => "network_error",
            ProcessorErrorCode::Authentication => "authentication_error",
            ProcessorErrorCode::NotFound => "not_found",
            ProcessorErrorCode::RateLimited => "rate_limited",
            ProcessorErrorCode::Rejected => "rejected",
            ProcessorErrorCode::Unavailable => "unavailable",
            ProcessorErrorCode::InvalidResponse => "invalid_response",
        };
        write!(f, "{}", s)
    }
}
