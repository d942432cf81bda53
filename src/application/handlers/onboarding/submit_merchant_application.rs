//! SubmitMerchantApplicationHandler - Creates the processor merchant and
//! uploads KYC documents for a pending organization.

use std::sync::Arc;

use crate::domain::foundation::{MerchantRef, OrganizationId, Timestamp};
use crate::domain::onboarding::{EventSource, OnboardingError, OnboardingStatus, StatusEvent};
use crate::ports::{
    DocumentUpload, MerchantApplication, OrganizationRepository, ProcessorClient,
    UploadedDocument,
};

use super::apply_status_transition::{StatusTransitionGuard, TransitionOutcome};

/// Command to submit an organization's merchant application.
#[derive(Debug, Clone)]
pub struct SubmitMerchantApplicationCommand {
    pub organization_id: OrganizationId,
    pub application: MerchantApplication,
    pub documents: Vec<DocumentUpload>,
}

/// Result of a successful submission.
#[derive(Debug, Clone)]
pub struct SubmitMerchantApplicationResult {
    pub merchant_ref: MerchantRef,
    /// False when an earlier attempt already created the merchant.
    pub merchant_created: bool,
    pub documents: Vec<UploadedDocument>,
    pub outcome: TransitionOutcome,
}

/// Handler for merchant application submission.
///
/// A failed upload leaves the organization `Pending` with its merchant ref
/// linked, so a retry reuses the merchant and the reconciliation loop can
/// already see it.
pub struct SubmitMerchantApplicationHandler {
    repository: Arc<dyn OrganizationRepository>,
    processor: Arc<dyn ProcessorClient>,
    guard: Arc<StatusTransitionGuard>,
    default_template_id: Option<String>,
}

impl SubmitMerchantApplicationHandler {
    pub fn new(
        repository: Arc<dyn OrganizationRepository>,
        processor: Arc<dyn ProcessorClient>,
        guard: Arc<StatusTransitionGuard>,
    ) -> Self {
        Self {
            repository,
            processor,
            guard,
            default_template_id: None,
        }
    }

    /// Template applied to applications that do not name one.
    pub fn with_default_template(mut self, template_id: Option<String>) -> Self {
        self.default_template_id = template_id.filter(|t| !t.trim().is_empty());
        self
    }

    pub async fn handle(
        &self,
        cmd: SubmitMerchantApplicationCommand,
    ) -> Result<SubmitMerchantApplicationResult, OnboardingError> {
        // 1. Only pending organizations can apply
        let organization = self
            .repository
            .find_by_id(&cmd.organization_id)
            .await?
            .ok_or(OnboardingError::OrganizationNotFound(cmd.organization_id))?;

        if organization.status != OnboardingStatus::Pending {
            return Err(OnboardingError::invalid_transition(
                organization.status,
                OnboardingStatus::KycSubmitted,
                "merchant application already submitted",
            ));
        }

        // 2. Create the merchant unless a previous attempt already did
        let (merchant_ref, merchant_created) = match organization.merchant_ref {
            Some(existing) => {
                tracing::info!(
                    organization_id = %organization.id,
                    merchant_ref = %existing,
                    "Resubmitting application for existing merchant"
                );
                (existing, false)
            }
            None => {
                let mut application = cmd.application;
                if application.template_id.is_none() {
                    application.template_id = self.default_template_id.clone();
                }
                let created = self.processor.create_merchant(application).await?;
                self.repository
                    .link_merchant_ref(&organization.id, &created.merchant_ref)
                    .await?;
                tracing::info!(
                    organization_id = %organization.id,
                    merchant_ref = %created.merchant_ref,
                    "Processor merchant created"
                );
                (created.merchant_ref, true)
            }
        };

        // 3. Upload documents one at a time; first failure aborts
        let mut documents = Vec::with_capacity(cmd.documents.len());
        for document in cmd.documents {
            let category = document.category;
            let uploaded = self
                .processor
                .upload_document(&merchant_ref, document)
                .await
                .map_err(|e| {
                    tracing::warn!(
                        merchant_ref = %merchant_ref,
                        category = category.as_str(),
                        error = %e,
                        "KYC document upload failed"
                    );
                    OnboardingError::ExternalService(e)
                })?;
            documents.push(uploaded);
        }

        // 4. Record the submission through the guard
        let event = StatusEvent::new(
            merchant_ref.clone(),
            OnboardingStatus::KycSubmitted,
            Timestamp::now(),
            EventSource::Submission,
        );
        let outcome = self.guard.apply(event).await?;

        Ok(SubmitMerchantApplicationResult {
            merchant_ref,
            merchant_created,
            documents,
            outcome,
        })
    }
}
