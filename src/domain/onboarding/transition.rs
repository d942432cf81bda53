//! Transition table for onboarding status changes.
//!
//! `evaluate_transition` is the single source of truth for which status
//! changes are accepted. Both the webhook and polling channels reach it
//! through the status transition guard.

use std::fmt;

use serde::Serialize;

use super::status::OnboardingStatus;

/// Why a proposed status change was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    /// Current status is `Rejected`; nothing leaves it.
    TerminalState,

    /// Proposed status is behind the current one on the primary path.
    Regression,

    /// `Suspended` was proposed for an organization that is not `Active`.
    SuspensionRequiresActive,

    /// A suspended organization may only be reactivated.
    SuspendedOnlyReactivates,

    /// An `Active`/`Suspended` flip observed before the stored status.
    Stale,
}

impl RejectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionReason::TerminalState => "terminal_state",
            RejectionReason::Regression => "regression",
            RejectionReason::SuspensionRequiresActive => "suspension_requires_active",
            RejectionReason::SuspendedOnlyReactivates => "suspended_only_reactivates",
            RejectionReason::Stale => "stale",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of checking a proposed status against the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionDecision {
    /// The change is valid and should be persisted.
    Apply,

    /// The proposed status equals the current one.
    NoOp,

    /// The change violates the state machine.
    Reject(RejectionReason),
}

impl TransitionDecision {
    pub fn is_apply(&self) -> bool {
        matches!(self, TransitionDecision::Apply)
    }
}

/// Decides whether `current -> proposed` is allowed.
///
/// Rules, in order:
/// 1. Same status is a no-op.
/// 2. `Rejected` absorbs everything.
/// 3. `Suspended` leaves only to `Active`.
/// 4. `Rejected` is reachable from every other status.
/// 5. Only `Active` may be suspended.
/// 6. On the primary path, only forward moves (skips included) are allowed.
pub fn evaluate_transition(
    current: OnboardingStatus,
    proposed: OnboardingStatus,
) -> TransitionDecision {
    use OnboardingStatus::*;

    if current == proposed {
        return TransitionDecision::NoOp;
    }

    match (current, proposed) {
        (Rejected, _) => TransitionDecision::Reject(RejectionReason::TerminalState),
        (Suspended, Active) => TransitionDecision::Apply,
        (Suspended, _) => TransitionDecision::Reject(RejectionReason::SuspendedOnlyReactivates),
        (_, Rejected) => TransitionDecision::Apply,
        (Active, Suspended) => TransitionDecision::Apply,
        (_, Suspended) => TransitionDecision::Reject(RejectionReason::SuspensionRequiresActive),
        _ => match (current.primary_rank(), proposed.primary_rank()) {
            (Some(from), Some(to)) if to > from => TransitionDecision::Apply,
            _ => TransitionDecision::Reject(RejectionReason::Regression),
        },
    }
}

/// Returns true when rank order cannot tell which of two events is newer.
///
/// Only the `Active`/`Suspended` pair moves both ways, so only there does
/// the processor's observation time decide between a late event and a
/// fresh one. Every other `Apply` is already ordered by the table.
pub fn is_order_sensitive(current: OnboardingStatus, proposed: OnboardingStatus) -> bool {
    use OnboardingStatus::*;

    matches!((current, proposed), (Active, Suspended) | (Suspended, Active))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use OnboardingStatus::*;

    fn any_status() -> impl Strategy<Value = OnboardingStatus> {
        prop::sample::select(OnboardingStatus::ALL.to_vec())
    }

    #[test]
    fn forward_skip_is_applied() {
        assert_eq!(evaluate_transition(KycSubmitted, Active), TransitionDecision::Apply);
        assert_eq!(evaluate_transition(Pending, MerchantApproved), TransitionDecision::Apply);
    }

    #[test]
    fn stale_poll_after_active_is_regression() {
        assert_eq!(
            evaluate_transition(Active, KycSubmitted),
            TransitionDecision::Reject(RejectionReason::Regression)
        );
    }

    #[test]
    fn suspended_rejects_merchant_approved() {
        assert_eq!(
            evaluate_transition(Suspended, MerchantApproved),
            TransitionDecision::Reject(RejectionReason::SuspendedOnlyReactivates)
        );
    }

    #[test]
    fn suspended_accepts_reactivation() {
        assert_eq!(evaluate_transition(Suspended, Active), TransitionDecision::Apply);
    }

    #[test]
    fn suspended_cannot_be_rejected_directly() {
        assert_eq!(
            evaluate_transition(Suspended, Rejected),
            TransitionDecision::Reject(RejectionReason::SuspendedOnlyReactivates)
        );
        assert_eq!(evaluate_transition(Active, Rejected), TransitionDecision::Apply);
    }

    #[test]
    fn only_the_suspension_pair_is_order_sensitive() {
        assert!(is_order_sensitive(Active, Suspended));
        assert!(is_order_sensitive(Suspended, Active));
        assert!(!is_order_sensitive(KycSubmitted, MerchantApproved));
        assert!(!is_order_sensitive(Pending, Active));
        assert!(!is_order_sensitive(Active, Rejected));
    }

    #[test]
    fn kyc_submitted_cannot_be_suspended() {
        assert_eq!(
            evaluate_transition(KycSubmitted, Suspended),
            TransitionDecision::Reject(RejectionReason::SuspensionRequiresActive)
        );
    }

    #[test]
    fn rejected_refuses_everything_but_itself() {
        for proposed in OnboardingStatus::ALL {
            let expected = if proposed == Rejected {
                TransitionDecision::NoOp
            } else {
                TransitionDecision::Reject(RejectionReason::TerminalState)
            };
            assert_eq!(evaluate_transition(Rejected, proposed), expected);
        }
    }

    proptest! {
        #[test]
        fn same_status_is_always_noop(status in any_status()) {
            prop_assert_eq!(evaluate_transition(status, status), TransitionDecision::NoOp);
        }

        #[test]
        fn primary_path_never_regresses(current in any_status(), proposed in any_status()) {
            if let (Some(from), Some(to)) = (current.primary_rank(), proposed.primary_rank()) {
                let decision = evaluate_transition(current, proposed);
                if to < from {
                    prop_assert_eq!(decision, TransitionDecision::Reject(RejectionReason::Regression));
                } else if to > from {
                    prop_assert_eq!(decision, TransitionDecision::Apply);
                }
            }
        }

        #[test]
        fn applied_moves_are_never_reversible_except_suspension(
            current in any_status(),
            proposed in any_status(),
        ) {
            let forward = evaluate_transition(current, proposed);
            let backward = evaluate_transition(proposed, current);
            if forward.is_apply() && backward.is_apply() {
                let pair = [current, proposed];
                prop_assert!(pair.contains(&Active) && pair.contains(&Suspended));
            }
        }
    }
}
