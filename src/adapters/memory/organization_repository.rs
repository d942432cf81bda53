//! In-memory organization repository.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, MerchantRef, OrganizationId, Timestamp};
use crate::domain::onboarding::{OnboardingStatus, Organization, StatusChange};
use crate::ports::OrganizationRepository;

/// Organization store backed by a `HashMap` behind an async `RwLock`.
///
/// Compare-and-swap runs under the write lock, so it is atomic with respect
/// to every other writer of the same store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrganizationRepository {
    organizations: Arc<RwLock<HashMap<OrganizationId, Organization>>>,
}

impl InMemoryOrganizationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a repository pre-populated with `organizations`.
    pub fn with_organizations(organizations: impl IntoIterator<Item = Organization>) -> Self {
        let map = organizations.into_iter().map(|org| (org.id, org)).collect();
        Self {
            organizations: Arc::new(RwLock::new(map)),
        }
    }

    /// Number of stored organizations.
    pub async fn len(&self) -> usize {
        self.organizations.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.organizations.read().await.is_empty()
    }
}

#[async_trait]
impl OrganizationRepository for InMemoryOrganizationRepository {
    async fn insert(&self, organization: &Organization) -> Result<(), DomainError> {
        let mut organizations = self.organizations.write().await;
        if organizations.contains_key(&organization.id) {
            return Err(DomainError::validation(
                "id",
                format!("Organization {} already exists", organization.id),
            ));
        }
        organizations.insert(organization.id, organization.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &OrganizationId) -> Result<Option<Organization>, DomainError> {
        Ok(self.organizations.read().await.get(id).cloned())
    }

    async fn find_by_merchant_ref(
        &self,
        merchant_ref: &MerchantRef,
    ) -> Result<Option<Organization>, DomainError> {
        let organizations = self.organizations.read().await;
        Ok(organizations
            .values()
            .find(|org| org.merchant_ref.as_ref() == Some(merchant_ref))
            .cloned())
    }

    async fn find_by_status(
        &self,
        status: OnboardingStatus,
    ) -> Result<Vec<Organization>, DomainError> {
        let organizations = self.organizations.read().await;
        let mut matching: Vec<Organization> = organizations
            .values()
            .filter(|org| org.status == status)
            .cloned()
            .collect();
        // Oldest first, so long-waiting organizations are polled first.
        matching.sort_by_key(|org| org.created_at);
        Ok(matching)
    }

    async fn compare_and_swap_status(
        &self,
        id: &OrganizationId,
        expected_version: u64,
        change: StatusChange,
    ) -> Result<bool, DomainError> {
        let mut organizations = self.organizations.write().await;
        match organizations.get_mut(id) {
            Some(org) if org.status_version == expected_version => {
                org.apply_change(&change, Timestamp::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn link_merchant_ref(
        &self,
        id: &OrganizationId,
        merchant_ref: &MerchantRef,
    ) -> Result<(), DomainError> {
        let mut organizations = self.organizations.write().await;

        let taken = organizations
            .values()
            .any(|org| &org.id != id && org.merchant_ref.as_ref() == Some(merchant_ref));
        if taken {
            return Err(DomainError::validation(
                "merchant_ref",
                format!("Merchant {} is linked to another organization", merchant_ref),
            ));
        }

        let org = organizations.get_mut(id).ok_or_else(|| {
            DomainError::new(
                ErrorCode::OrganizationNotFound,
                format!("Organization {} not found", id),
            )
        })?;

        match &org.merchant_ref {
            Some(existing) if existing == merchant_ref => Ok(()),
            Some(existing) => Err(DomainError::validation(
                "merchant_ref",
                format!("Organization already linked to merchant {}", existing),
            )),
            None => {
                org.merchant_ref = Some(merchant_ref.clone());
                org.updated_at = Timestamp::now();
                Ok(())
            }
        }
    }
}
