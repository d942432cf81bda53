//! Onboarding handlers.
//!
//! Three producers feed the status transition guard: processor webhooks,
//! the reconciliation loop, and merchant application submission.

mod apply_status_transition;
mod ingest_processor_webhook;
mod reconciliation_scheduler;
mod submit_merchant_application;

pub use apply_status_transition::{StatusTransitionGuard, TransitionOutcome};
pub use ingest_processor_webhook::{WebhookIngestResult, WebhookIngestor, DEFAULT_DEDUP_WINDOW};
pub use reconciliation_scheduler::{
    CycleReport, ReconciliationScheduler, ReconciliationSchedulerConfig, SchedulerState,
};
pub use submit_merchant_application::{
    SubmitMerchantApplicationCommand, SubmitMerchantApplicationHandler,
    SubmitMerchantApplicationResult,
};
