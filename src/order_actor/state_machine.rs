use thiserror::Error;

use crate::domain::OrderStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("illegal status transition from {from} to {to}")]
pub struct IllegalTransition {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

/// Checks a status move against the order lifecycle.
///
/// `pending -> accepted -> preparing -> ready -> delivered` may only move
/// forward, though intermediate states can be skipped. `cancelled` is
/// reachable from any non-terminal state. Nothing leaves `delivered` or
/// `cancelled`, and a state never transitions to itself.
pub fn check_transition(from: OrderStatus, to: OrderStatus) -> Result<(), IllegalTransition> {
    let illegal = IllegalTransition { from, to };

    if from.is_terminal() || from == to {
        return Err(illegal);
    }
    if to == OrderStatus::Cancelled {
        return Ok(());
    }
    match (from.rank(), to.rank()) {
        (Some(current), Some(next)) if next > current => Ok(()),
        _ => Err(illegal),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrderStatus::*;

    #[test]
    fn test_forward_path() {
        assert!(check_transition(Pending, Accepted).is_ok());
        assert!(check_transition(Accepted, Preparing).is_ok());
        assert!(check_transition(Preparing, Ready).is_ok());
        assert!(check_transition(Ready, Delivered).is_ok());
        assert!(check_transition(Accepted, Ready).is_ok());
    }

    #[test]
    fn test_backward_and_self_moves_are_rejected() {
        assert_eq!(
            check_transition(Ready, Accepted),
            Err(IllegalTransition { from: Ready, to: Accepted })
        );
        assert!(check_transition(Pending, Pending).is_err());
        assert!(check_transition(Preparing, Pending).is_err());
    }

    #[test]
    fn test_cancel_from_any_open_state() {
        for from in [Pending, Accepted, Preparing, Ready] {
            assert!(check_transition(from, Cancelled).is_ok(), "{} -> cancelled", from);
        }
    }

    #[test]
    fn test_terminal_states_are_final() {
        for to in OrderStatus::ALL {
            assert!(check_transition(Delivered, to).is_err());
            assert!(check_transition(Cancelled, to).is_err());
        }
    }

    #[test]
    fn test_error_names_the_transition() {
        let err = check_transition(Delivered, Cancelled).unwrap_err();
        assert_eq!(err.to_string(), "illegal status transition from delivered to cancelled");
    }
}
