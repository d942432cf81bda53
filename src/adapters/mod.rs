//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the onboarding core to external systems:
//! - `processor` - Processor REST client and its mock
//! - `memory` - In-memory persistence
//! - `notifier` - Status change notification
//! - `http` - Axum webhook and health endpoints

pub mod http;
pub mod memory;
pub mod notifier;
pub mod processor;

pub use memory::{InMemoryOrganizationRepository, InMemoryWebhookReceiptStore};
pub use notifier::TracingNotifier;
pub use processor::{HttpProcessorClient, HttpProcessorConfig, MockProcessorClient};
