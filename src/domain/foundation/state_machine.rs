//! Status enums with a closed transition table.

use super::ValidationError;

/// A status enum whose legal moves are known up front.
///
/// Implementors supply the table; checked moves and terminal detection
/// follow from it.
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Whether `self -> target` is an allowed move.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Every status reachable in one move.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Returns `target` if the move is allowed.
    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if !self.can_transition_to(&target) {
            return Err(ValidationError::invalid_format(
                "status",
                format!("{:?} cannot move to {:?}", self, target),
            ));
        }
        Ok(target)
    }

    /// No outgoing moves remain.
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}
