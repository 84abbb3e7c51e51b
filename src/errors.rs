use thiserror::Error;

use crate::session::SessionState;

pub type KwirthResult<T> = Result<T, KwirthError>;

#[derive(Debug, Error)]
pub enum KwirthError {
    /// HTTP transport failure, non-success status or unreadable body.
    #[error("network error: {0}")]
    Network(String),

    /// Malformed or unrecognized frame.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Operation invoked without its precondition.
    #[error("{0}")]
    State(String),

    #[error("cannot {op} while {state}")]
    InvalidTransition {
        op: &'static str,
        state: SessionState,
    },
}

impl From<serde_json::Error> for KwirthError {
    fn from(err: serde_json::Error) -> Self {
        KwirthError::Protocol(err.to_string())
    }
}
