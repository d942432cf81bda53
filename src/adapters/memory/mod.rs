//! In-memory persistence adapters.
//!
//! Reference implementations of the persistence ports. Used by the binary
//! until a database adapter is wired in, and by tests.

mod organization_repository;
mod webhook_receipt_store;

pub use organization_repository::InMemoryOrganizationRepository;
pub use webhook_receipt_store::InMemoryWebhookReceiptStore;
