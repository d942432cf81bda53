//! Charity Onboarding - Merchant onboarding for charitable organizations
//!
//! This crate registers charities as merchants with a card processor and keeps
//! their onboarding status in step with the processor, fed by signed webhooks
//! and a periodic reconciliation poll.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
