//! Session state
//!
//! The states a control session passes through. Transitions only ever move
//! forward; a failed step ends the session rather than retrying it.

use std::fmt;

use crate::protocol::Command;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    AwaitDataPort,
    AwaitCommand,
    AwaitHost,
    Dispatch(Command),
    DataTransfer,
    Closed,
}

impl SessionState {
    fn rank(&self) -> u8 {
        match self {
            SessionState::AwaitDataPort => 0,
            SessionState::AwaitCommand => 1,
            SessionState::AwaitHost => 2,
            SessionState::Dispatch(_) => 3,
            SessionState::DataTransfer => 4,
            SessionState::Closed => 5,
        }
    }

    /// Whether `next` may follow `self`. Dispatch may skip the data
    /// transfer, and any state may close.
    pub fn can_advance_to(&self, next: &SessionState) -> bool {
        match (self, next) {
            (SessionState::Closed, _) => false,
            (_, SessionState::Closed) => true,
            (SessionState::Dispatch(cmd), SessionState::DataTransfer) => cmd.needs_data_channel(),
            _ => next.rank() == self.rank() + 1,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::AwaitDataPort => write!(f, "AwaitDataPort"),
            SessionState::AwaitCommand => write!(f, "AwaitCommand"),
            SessionState::AwaitHost => write!(f, "AwaitHost"),
            SessionState::Dispatch(cmd) => write!(f, "Dispatch({})", cmd),
            SessionState::DataTransfer => write!(f, "DataTransfer"),
            SessionState::Closed => write!(f, "Closed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handshake_states_advance_one_at_a_time() {
        assert!(SessionState::AwaitDataPort.can_advance_to(&SessionState::AwaitCommand));
        assert!(SessionState::AwaitCommand.can_advance_to(&SessionState::AwaitHost));
        assert!(SessionState::AwaitHost.can_advance_to(&SessionState::Dispatch(Command::List)));
        assert!(!SessionState::AwaitDataPort.can_advance_to(&SessionState::AwaitHost));
        assert!(!SessionState::AwaitHost.can_advance_to(&SessionState::AwaitCommand));
    }

    #[test]
    fn invalid_command_never_reaches_data_transfer() {
        let invalid = SessionState::Dispatch(Command::Invalid("x".into()));
        assert!(!invalid.can_advance_to(&SessionState::DataTransfer));
        assert!(invalid.can_advance_to(&SessionState::Closed));
        assert!(SessionState::Dispatch(Command::Get).can_advance_to(&SessionState::DataTransfer));
    }

    #[test]
    fn closed_is_terminal() {
        assert!(SessionState::AwaitCommand.can_advance_to(&SessionState::Closed));
        assert!(!SessionState::Closed.can_advance_to(&SessionState::AwaitDataPort));
        assert!(!SessionState::Closed.can_advance_to(&SessionState::Closed));
    }
}
