//! State machine trait for status enums.
//!
//! Provides a consistent interface for validating and performing state
//! transitions across the booking, payment, and subscription lifecycles.

use super::DomainError;

/// Trait for status enums that represent state machines.
///
/// Implementors define valid state transitions and get validated
/// transition methods for free.
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Returns true if transition from self to target is valid.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Returns all valid target states from current state.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Performs transition with validation, returning error if invalid.
    ///
    /// This is the preferred way to change state, as it ensures the
    /// transition is valid according to the state machine rules.
    fn transition_to(&self, target: Self) -> Result<Self, DomainError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(DomainError::invalid_transition(format!(
                "Cannot transition from {:?} to {:?}",
                self, target
            )))
        }
    }

    /// Checks if current state is terminal (no valid outgoing transitions).
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum TestStatus {
        Draft,
        Open,
        Closed,
    }

    impl StateMachine for TestStatus {
        fn can_transition_to(&self, target: &Self) -> bool {
            matches!(
                (self, target),
                (TestStatus::Draft, TestStatus::Open) | (TestStatus::Open, TestStatus::Closed)
            )
        }

        fn valid_transitions(&self) -> Vec<Self> {
            match self {
                TestStatus::Draft => vec![TestStatus::Open],
                TestStatus::Open => vec![TestStatus::Closed],
                TestStatus::Closed => vec![],
            }
        }
    }

    #[test]
    fn valid_transition_succeeds() {
        let status = TestStatus::Draft;
        assert_eq!(status.transition_to(TestStatus::Open), Ok(TestStatus::Open));
    }

    #[test]
    fn invalid_transition_fails() {
        let status = TestStatus::Draft;
        assert!(status.transition_to(TestStatus::Closed).is_err());
    }

    #[test]
    fn terminal_state_has_no_transitions() {
        assert!(TestStatus::Closed.is_terminal());
        assert!(!TestStatus::Open.is_terminal());
    }
}
