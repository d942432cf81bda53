//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, errors)
//! - `onboarding` - Merchant onboarding status machine and webhook vocabulary

pub mod foundation;
pub mod onboarding;
