//! Lifecycle of a single order-recording attempt.
//!
//! ```text
//! Draft -> Validating -> Persisting -> Committed
//!              |             |
//!              +-> Aborted <-+
//! ```
//!
//! Only `Committed` leaves anything behind in storage. There is no externally
//! visible intermediate state: an order is either fully absent or fully present.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderPhase {
    Draft,
    Validating,
    Persisting,
    Committed,
    Aborted,
}

impl OrderPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderPhase::Committed | OrderPhase::Aborted)
    }

    pub fn can_advance_to(self, next: OrderPhase) -> bool {
        use OrderPhase::*;
        matches!(
            (self, next),
            (Draft, Validating)
                | (Validating, Persisting)
                | (Validating, Aborted)
                | (Persisting, Committed)
                | (Persisting, Aborted)
        )
    }

    /// Move to `next`, rejecting transitions the lifecycle does not allow.
    pub fn advance(self, next: OrderPhase) -> DomainResult<OrderPhase> {
        if self.can_advance_to(next) {
            Ok(next)
        } else {
            Err(DomainError::invariant(format!(
                "order attempt cannot move from {} to {}",
                self.as_str(),
                next.as_str()
            )))
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderPhase::Draft => "draft",
            OrderPhase::Validating => "validating",
            OrderPhase::Persisting => "persisting",
            OrderPhase::Committed => "committed",
            OrderPhase::Aborted => "aborted",
        }
    }
}

impl core::fmt::Display for OrderPhase {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_reaches_committed() {
        let phase = OrderPhase::Draft
            .advance(OrderPhase::Validating)
            .and_then(|p| p.advance(OrderPhase::Persisting))
            .and_then(|p| p.advance(OrderPhase::Committed))
            .unwrap();
        assert_eq!(phase, OrderPhase::Committed);
        assert!(phase.is_terminal());
    }

    #[test]
    fn both_validating_and_persisting_may_abort() {
        assert!(OrderPhase::Validating.can_advance_to(OrderPhase::Aborted));
        assert!(OrderPhase::Persisting.can_advance_to(OrderPhase::Aborted));
        assert!(!OrderPhase::Draft.can_advance_to(OrderPhase::Aborted));
    }

    #[test]
    fn terminal_phases_do_not_move() {
        for next in [
            OrderPhase::Draft,
            OrderPhase::Validating,
            OrderPhase::Persisting,
            OrderPhase::Committed,
            OrderPhase::Aborted,
        ] {
            assert!(OrderPhase::Committed.advance(next).is_err());
            assert!(OrderPhase::Aborted.advance(next).is_err());
        }
    }

    #[test]
    fn skipping_validation_is_rejected() {
        let err = OrderPhase::Draft.advance(OrderPhase::Persisting).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(msg) if msg.contains("draft to persisting")));
    }
}
