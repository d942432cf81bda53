//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid host address: {0}")]
    InvalidHost(String),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Invalid processor URL: {0}")]
    InvalidProcessorUrl(String),

    #[error("Processor URL must use HTTPS in production")]
    ProcessorUrlMustBeHttps,

    #[error("Sandbox processor cannot be used in production")]
    SandboxInProduction,

    #[error("Token expiry buffer must be between 0 and 60 minutes")]
    InvalidTokenBuffer,

    #[error("Reconciliation interval must be between one minute and one week")]
    InvalidReconciliationInterval,

    #[error("Reconciliation item delay must be at most one hour")]
    InvalidItemDelay,

    #[error("Webhook dedup window must be between one minute and thirty days")]
    InvalidDedupWindow,
}
