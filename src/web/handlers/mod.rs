pub mod authorization;
pub mod subscriptions;

pub use authorization::{authorize, authorize_batch};
pub use subscriptions::{accept_subscription, pending_requests, reject_subscription, subscribers};
