use thiserror::Error;

use crate::models::FailureKind;

/// The remote service answered with something we cannot interpret
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("missing node: {0}")]
    MissingNode(String),
    #[error("remote fault {code}: {message}")]
    Fault { code: String, message: String },
    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

/// The remote call did not produce a usable response
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportFailure {
    /// A read failed after every allowed attempt
    #[error("subscription service unavailable: {0}")]
    Unavailable(String),
    /// A mutation failed; it may or may not have been applied remotely
    #[error("subscription service outcome unknown: {0}")]
    Indeterminate(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    #[error(transparent)]
    Transport(#[from] TransportFailure),
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl SubscriptionError {
    pub fn kind(&self) -> FailureKind {
        match self {
            SubscriptionError::Transport(TransportFailure::Unavailable(_)) => {
                FailureKind::Unavailable
            }
            SubscriptionError::Transport(TransportFailure::Indeterminate(_)) => {
                FailureKind::Indeterminate
            }
            SubscriptionError::Protocol(_) => FailureKind::Protocol,
        }
    }
}
