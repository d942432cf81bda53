//! Notifier that writes status changes to the log.
//!
//! Stands in for email and staff alerts until a delivery adapter is wired.

use async_trait::async_trait;

use crate::domain::foundation::DomainError;
use crate::domain::onboarding::StatusChangeNotice;
use crate::ports::OnboardingNotifier;

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl TracingNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl OnboardingNotifier for TracingNotifier {
    async fn status_changed(&self, notice: StatusChangeNotice) -> Result<(), DomainError> {
        tracing::info!(
            organization_id = %notice.organization_id,
            organization = %notice.organization_name,
            merchant_ref = %notice.merchant_ref,
            from = %notice.from,
            to = %notice.to,
            reason = notice.reason.as_deref().unwrap_or(""),
            version = notice.version,
            source = %notice.source,
            "Onboarding status changed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{MerchantRef, OrganizationId, Timestamp};
    use crate::domain::onboarding::{EventSource, OnboardingStatus};

    #[tokio::test]
    async fn status_changed_never_fails() {
        let notice = StatusChangeNotice {
            organization_id: OrganizationId::new(),
            organization_name: "Shelter".to_string(),
            merchant_ref: MerchantRef::new("M1").unwrap(),
            from: OnboardingStatus::MerchantApproved,
            to: OnboardingStatus::Active,
            reason: None,
            version: 3,
            source: EventSource::Webhook,
            occurred_at: Timestamp::now(),
        };

        assert!(TracingNotifier::new().status_changed(notice).await.is_ok());
    }
}
