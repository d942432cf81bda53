//! Application handlers.
//!
//! Command handlers that orchestrate domain operations through ports.

pub mod onboarding;
