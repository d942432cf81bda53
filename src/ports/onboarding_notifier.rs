//! Notification port for applied status changes.
//!
//! Delivery (email, staff alerts) is owned by the surrounding application.
//! The transition guard calls this on a detached task after a change is
//! persisted, so implementations may be slow without holding up webhooks.

use async_trait::async_trait;

use crate::domain::foundation::DomainError;
use crate::domain::onboarding::StatusChangeNotice;

#[async_trait]
pub trait OnboardingNotifier: Send + Sync {
    /// Called once per applied status change. Never called for no-ops.
    async fn status_changed(&self, notice: StatusChangeNotice) -> Result<(), DomainError>;
}
