//! Organization repository port.
//!
//! Persistence is owned by the surrounding application; the onboarding core
//! only needs these reads and a compare-and-swap status write.
//!
//! # Design
//!
//! - **Single status writer**: only the status transition guard calls
//!   `compare_and_swap_status`
//! - **Optimistic locking**: writes succeed only against the expected version

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, MerchantRef, OrganizationId};
use crate::domain::onboarding::{OnboardingStatus, Organization, StatusChange};

/// Repository port for organization onboarding state.
#[async_trait]
pub trait OrganizationRepository: Send + Sync {
    /// Store a newly registered organization.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if the id already exists
    async fn insert(&self, organization: &Organization) -> Result<(), DomainError>;

    /// Find an organization by id.
    async fn find_by_id(&self, id: &OrganizationId) -> Result<Option<Organization>, DomainError>;

    /// Find the organization linked to a processor merchant reference.
    async fn find_by_merchant_ref(
        &self,
        merchant_ref: &MerchantRef,
    ) -> Result<Option<Organization>, DomainError>;

    /// All organizations currently in `status`.
    async fn find_by_status(
        &self,
        status: OnboardingStatus,
    ) -> Result<Vec<Organization>, DomainError>;

    /// Write `change` only if the stored version still equals `expected_version`.
    ///
    /// On success the stored version becomes `expected_version + 1`.
    /// Returns `false` when the version moved (lost race) or the id is unknown.
    async fn compare_and_swap_status(
        &self,
        id: &OrganizationId,
        expected_version: u64,
        change: StatusChange,
    ) -> Result<bool, DomainError>;

    /// Link a merchant reference to an organization that has none yet.
    ///
    /// # Errors
    ///
    /// - `OrganizationNotFound` if the id is unknown
    /// - `ValidationFailed` if a different reference is already linked, or
    ///   the reference belongs to another organization
    async fn link_merchant_ref(
        &self,
        id: &OrganizationId,
        merchant_ref: &MerchantRef,
    ) -> Result<(), DomainError>;
}
