//! Bridge to the remote SOAP subscription service.

pub mod classifier;
pub mod client;
pub mod codec;
pub mod errors;
pub mod transport;

pub use classifier::{ResultClassifier, ValidateLiterals};
pub use client::{RetryPolicy, SubscriptionClient};
pub use errors::{ProtocolError, SubscriptionError, TransportFailure};
pub use transport::{HttpTransport, SoapResponse, SoapTransport, TransportError};

/// Remote capabilities of the subscription service
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Validate,
    Approve,
    Reject,
    ListPending,
    ListSubscribers,
}

impl Operation {
    /// Mutations must never be replayed automatically
    pub fn is_retryable(self) -> bool {
        !matches!(self, Operation::Approve | Operation::Reject)
    }
}
