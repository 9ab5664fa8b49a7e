use serde::{Deserialize, Serialize};

/// Identifies one creator/subscriber relationship on the remote service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionQuery {
    #[serde(rename = "creatorID")]
    pub creator_id: i64,
    #[serde(rename = "subscriberID")]
    pub subscriber_id: i64,
}

impl SubscriptionQuery {
    pub fn new(creator_id: i64, subscriber_id: i64) -> Self {
        Self {
            creator_id,
            subscriber_id,
        }
    }
}

/// Business outcome of a remote subscription operation.
///
/// Only [`ResultClassifier`](crate::subscription::classifier::ResultClassifier)
/// turns wire literals into one of these.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SubscriptionOutcome {
    Approved,
    Rejected,
    NotFound,
    AlreadyProcessed,
    Unclassified,
}

/// Snapshot of a subscription as reported by the list operations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    #[serde(rename = "creatorID")]
    pub creator_id: i64,
    #[serde(rename = "subscriberID")]
    pub subscriber_id: i64,
    #[serde(rename = "creatorName")]
    pub creator_name: String,
    #[serde(rename = "subscriberName")]
    pub subscriber_name: String,
}

/// Coarse classification of a failed remote call, kept for logging only
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Unavailable,
    Indeterminate,
    Protocol,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DecisionReason {
    Outcome(SubscriptionOutcome),
    Failure(FailureKind),
}

/// Result of an authorization check.
///
/// The fields are private so that `allowed` can only be derived from a
/// classified outcome: nothing but [`SubscriptionOutcome::Approved`] grants access.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AuthorizationDecision {
    allowed: bool,
    reason: DecisionReason,
}

impl AuthorizationDecision {
    pub(crate) fn from_outcome(outcome: SubscriptionOutcome) -> Self {
        Self {
            allowed: outcome == SubscriptionOutcome::Approved,
            reason: DecisionReason::Outcome(outcome),
        }
    }

    pub(crate) fn from_failure(kind: FailureKind) -> Self {
        Self {
            allowed: false,
            reason: DecisionReason::Failure(kind),
        }
    }

    pub fn allowed(&self) -> bool {
        self.allowed
    }

    pub fn reason(&self) -> DecisionReason {
        self.reason
    }
}
