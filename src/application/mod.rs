//! Application layer - Command handlers and background services.
//!
//! This layer orchestrates domain operations and coordinates between ports.

pub mod handlers;

pub use handlers::onboarding::{
    CycleReport, ReconciliationScheduler, ReconciliationSchedulerConfig, SchedulerState,
    StatusTransitionGuard, SubmitMerchantApplicationCommand, SubmitMerchantApplicationHandler,
    SubmitMerchantApplicationResult, TransitionOutcome, WebhookIngestResult, WebhookIngestor,
};
