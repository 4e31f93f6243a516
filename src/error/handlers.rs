//! Error handlers
//!
//! Decides how session failures are reported once they reach the session boundary.

use crate::error::types::{ProtocolError, SessionError};
use log::{error, warn};
use std::net::SocketAddr;

/// Log a session error at a level matching who caused it
pub fn handle_session_error(peer: SocketAddr, err: &SessionError) {
    if is_client_fault(err) {
        warn!("Session with {} aborted: {}", peer, err);
    } else {
        error!("Session with {} failed: {}", peer, err);
    }
}

/// Returns true when the failure was caused by what the client sent or
/// by the client going away, rather than by the server itself.
pub fn is_client_fault(err: &SessionError) -> bool {
    match err {
        SessionError::Protocol(e) => !matches!(e, ProtocolError::MalformedPayload(_)),
        SessionError::Resolution(_) | SessionError::Connect(_) => true,
        SessionError::Transfer(_) | SessionError::Directory(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::types::{ConnectError, DirectoryError, ResolutionError};
    use crate::protocol::Field;
    use std::io;
    use std::path::PathBuf;

    #[test]
    fn client_side_failures_are_client_faults() {
        let closed = SessionError::from(ProtocolError::ConnectionClosed(Field::Host));
        let port = SessionError::from(ResolutionError::InvalidPort("abc".into()));
        let connect = SessionError::from(ConnectError::NoEndpoint);
        assert!(is_client_fault(&closed));
        assert!(is_client_fault(&port));
        assert!(is_client_fault(&connect));
    }

    #[test]
    fn directory_failures_are_server_faults() {
        let err = SessionError::from(DirectoryError::Open(
            PathBuf::from("/nowhere"),
            io::Error::from(io::ErrorKind::NotFound),
        ));
        assert!(!is_client_fault(&err));
    }
}
