//! Processor client adapters.
//!
//! - `HttpProcessorClient` - reqwest client for the processor REST API
//! - `MockProcessorClient` - configurable in-memory client for tests

mod http_client;
mod mock_processor_client;
mod token_cache;
mod wire_types;

pub use http_client::{HttpProcessorClient, HttpProcessorConfig};
pub use mock_processor_client::{MethodCall, MockProcessorClient};
pub use token_cache::{FetchedToken, TokenCache, DEFAULT_EXPIRY_BUFFER};
