//! Onboarding domain module.
//!
//! Merchant onboarding status, its transition rules, and the processor
//! webhook vocabulary.
//!
//! # Module Structure
//!
//! - `status` - OnboardingStatus state machine
//! - `transition` - The transition table shared by every channel
//! - `organization` - Onboarding view of an organization
//! - `status_event` - Guard inputs and change notices
//! - `processor_event` - Webhook payload mapping
//! - `webhook_verifier` - HMAC signature verification
//! - `errors` - OnboardingError taxonomy

mod errors;
mod organization;
mod processor_event;
mod status;
mod status_event;
mod transition;
mod webhook_verifier;

pub use errors::OnboardingError;
pub use organization::{Organization, StatusChange};
pub use processor_event::{ProcessorTimestamp, ProcessorWebhookPayload};
pub use status::OnboardingStatus;
pub use status_event::{EventSource, StatusChangeNotice, StatusEvent};
pub use transition::{evaluate_transition, is_order_sensitive, RejectionReason, TransitionDecision};
pub use webhook_verifier::{sign_payload, ProcessorWebhookVerifier, SIGNATURE_HEADER};
