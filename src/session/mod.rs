//! Control sessions
//!
//! One session per accepted control connection.

pub mod handler;
pub mod results;
pub mod state;

pub use handler::{ControlSession, SessionContext, SessionRequest};
pub use results::SessionOutcome;
pub use state::SessionState;
