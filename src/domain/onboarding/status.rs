//! Onboarding status state machine.
//!
//! Defines every approval state an organization can be in on the card
//! processor, and how processor vocabulary maps onto them.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::transition::evaluate_transition;
use crate::domain::foundation::StateMachine;

/// Organization approval status on the card processor.
///
/// The primary path is `Pending -> KycSubmitted -> MerchantApproved -> Active`.
/// `Rejected` and `Suspended` are side branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStatus {
    /// Registered locally, nothing submitted to the processor yet.
    Pending,

    /// KYC documents submitted, awaiting processor review.
    KycSubmitted,

    /// Processor approved the merchant account.
    MerchantApproved,

    /// Merchant account is live and can take donations.
    Active,

    /// Processor declined the application. Terminal.
    Rejected,

    /// Processor suspended a live account. Only reactivation leaves it.
    Suspended,
}

impl OnboardingStatus {
    /// Every status, in declaration order.
    pub const ALL: [OnboardingStatus; 6] = [
        OnboardingStatus::Pending,
        OnboardingStatus::KycSubmitted,
        OnboardingStatus::MerchantApproved,
        OnboardingStatus::Active,
        OnboardingStatus::Rejected,
        OnboardingStatus::Suspended,
    ];

    /// Position on the primary path, `None` for the side branches.
    pub fn primary_rank(&self) -> Option<u8> {
        match self {
            OnboardingStatus::Pending => Some(0),
            OnboardingStatus::KycSubmitted => Some(1),
            OnboardingStatus::MerchantApproved => Some(2),
            OnboardingStatus::Active => Some(3),
            OnboardingStatus::Rejected | OnboardingStatus::Suspended => None,
        }
    }

    /// Returns true while the processor may still move this organization.
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            OnboardingStatus::Pending
                | OnboardingStatus::KycSubmitted
                | OnboardingStatus::MerchantApproved
        )
    }

    /// Stable snake_case name, identical to the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            OnboardingStatus::Pending => "pending",
            OnboardingStatus::KycSubmitted => "kyc_submitted",
            OnboardingStatus::MerchantApproved => "merchant_approved",
            OnboardingStatus::Active => "active",
            OnboardingStatus::Rejected => "rejected",
            OnboardingStatus::Suspended => "suspended",
        }
    }

    /// Maps a processor status word onto a local status.
    ///
    /// Matching is case-insensitive and tolerates `-` or spaces in place of
    /// `_`. Returns `None` for vocabulary we do not understand.
    pub fn from_processor_vocabulary(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        let status = match normalized.as_str() {
            "pending" | "created" | "new" => OnboardingStatus::Pending,
            "kyc_submitted" | "under_review" | "in_review" | "documents_received" => {
                OnboardingStatus::KycSubmitted
            }
            "approved" | "merchant_approved" => OnboardingStatus::MerchantApproved,
            "active" | "enabled" | "live" | "activated" | "reactivated" => OnboardingStatus::Active,
            "rejected" | "declined" | "denied" | "closed" => OnboardingStatus::Rejected,
            "suspended" | "disabled" | "on_hold" => OnboardingStatus::Suspended,
            _ => return None,
        };
        Some(status)
    }
}

impl fmt::Display for OnboardingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl StateMachine for OnboardingStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        evaluate_transition(*self, *target).is_apply()
    }

    fn valid_transitions(&self) -> Vec<Self> {
        OnboardingStatus::ALL
            .into_iter()
            .filter(|target| self.can_transition_to(target))
            .collect()
    }
}
