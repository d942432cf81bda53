//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the onboarding core and the outside world. Adapters implement these ports.
//!
//! ## Processor
//!
//! - `ProcessorClient` - Merchant creation, status lookup, KYC uploads
//!
//! ## Persistence
//!
//! - `OrganizationRepository` - Onboarding state with compare-and-swap writes
//! - `WebhookReceiptStore` - Webhook redelivery dedup
//!
//! ## Notification
//!
//! - `OnboardingNotifier` - Receives applied status changes

mod onboarding_notifier;
mod organization_repository;
mod processor_client;
mod webhook_receipt_store;

pub use onboarding_notifier::OnboardingNotifier;
pub use organization_repository::OrganizationRepository;
pub use processor_client::{
    CreatedMerchant, DocumentCategory, DocumentStatus, DocumentUpload, MerchantApplication,
    MerchantStatusSnapshot, ProcessorClient, ProcessorError, ProcessorErrorCode,
    UploadedDocument,
};
pub use webhook_receipt_store::{ReceiptOutcome, SaveResult, WebhookReceipt, WebhookReceiptStore};
