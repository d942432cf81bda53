//! HTTP adapters - REST API implementations.

pub mod onboarding;

pub use onboarding::{build_app, onboarding_router, OnboardingAppState};
