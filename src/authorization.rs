//! Access checks for paid content.
//!
//! Content-serving code asks an [`AuthorizationGate`] whether a subscriber
//! may see a creator's content. A gate belongs to one request or listing:
//! it remembers every decision it made for the configured TTL, so checking
//! a whole catalog costs one remote call per creator/subscriber pair rather
//! than one per item. Decisions are never shared between scopes.
//!
//! Access is granted only for an explicit, classified `Approved` answer.
//! Unknown answers, transport failures and protocol errors all deny.

use std::time::Duration;

use futures::{stream, StreamExt};

use crate::{
    config::CacheConfig,
    models::{AuthorizationDecision, SubscriptionOutcome, SubscriptionQuery},
    subscription::SubscriptionClient,
    utils::cache::Cache,
};

const DEFAULT_MAX_CONCURRENCY: usize = 16;

/// Process-wide factory of request-scoped gates
pub struct Authorizer {
    client: SubscriptionClient,
    ttl: Duration,
    max_capacity: u64,
    max_concurrency: usize,
}

impl Authorizer {
    pub fn new(client: SubscriptionClient, ttl: Duration, max_capacity: u64) -> Self {
        Self {
            client,
            ttl,
            max_capacity,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    pub fn from_config(client: SubscriptionClient, config: &CacheConfig) -> Self {
        Self::new(client, Duration::from_secs(config.ttl), config.max_capacity)
            .with_max_concurrency(config.max_concurrency)
    }

    /// Bound the remote checks a single `authorize_many` runs at once
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Open a gate for a single request or listing
    pub fn scope(&self) -> AuthorizationGate {
        AuthorizationGate {
            client: self.client.clone(),
            cache: Cache::new(self.ttl, self.max_capacity),
            max_concurrency: self.max_concurrency,
        }
    }
}

#[derive(Clone)]
pub struct AuthorizationGate {
    client: SubscriptionClient,
    cache: Cache,
    max_concurrency: usize,
}

impl AuthorizationGate {
    /// Decide whether `subscriber_id` may access content of `creator_id`.
    ///
    /// Concurrent misses for the same pair are coalesced by the cache, so
    /// only one of them reaches the remote service.
    pub async fn authorize(&self, creator_id: i64, subscriber_id: i64) -> AuthorizationDecision {
        let query = SubscriptionQuery::new(creator_id, subscriber_id);
        let client = &self.client;
        self.cache
            .decision_cache
            .get_with(query, async move { decide(client, query).await })
            .await
    }

    /// Authorize every creator of a listing for one subscriber.
    ///
    /// Checks run concurrently up to the gate's limit; decisions come back in
    /// the order of `creator_ids`.
    pub async fn authorize_many(
        &self,
        subscriber_id: i64,
        creator_ids: &[i64],
    ) -> Vec<(i64, AuthorizationDecision)> {
        stream::iter(creator_ids.iter().copied())
            .map(move |creator_id| async move {
                (creator_id, self.authorize(creator_id, subscriber_id).await)
            })
            .buffered(self.max_concurrency)
            .collect()
            .await
    }
}

async fn decide(client: &SubscriptionClient, query: SubscriptionQuery) -> AuthorizationDecision {
    match client.validate(query).await {
        Ok(outcome) => {
            if outcome != SubscriptionOutcome::Approved {
                tracing::info!(
                    "Access denied for subscriber {} to creator {}: {outcome:?}",
                    query.subscriber_id,
                    query.creator_id
                );
            }
            AuthorizationDecision::from_outcome(outcome)
        }
        Err(err) => {
            tracing::warn!(
                "Access denied for subscriber {} to creator {}, validation failed: {err}",
                query.subscriber_id,
                query.creator_id
            );
            AuthorizationDecision::from_failure(err.kind())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{DecisionReason, FailureKind},
        subscription::{ResultClassifier, ValidateLiterals},
        test_utils::{test_client, validate_response, MockReply, MockTransport},
    };
    use std::sync::Arc;

    const VALID: &str = "Subscription valid";

    fn authorizer(transport: MockTransport, ttl: Duration) -> Authorizer {
        let client = test_client(transport).with_classifier(ResultClassifier::new(
            &ValidateLiterals {
                approved: vec![VALID.into()],
                rejected: vec!["Subscription rejected".into()],
                ..Default::default()
            },
        ));
        Authorizer::new(client, ttl, 100)
    }

    #[tokio::test]
    async fn test_approved_is_allowed() {
        let transport = MockTransport::new([validate_response(VALID)]);
        let gate = authorizer(transport, Duration::from_secs(60)).scope();

        let decision = gate.authorize(1, 2).await;
        assert!(decision.allowed());
        assert_eq!(
            decision.reason(),
            DecisionReason::Outcome(SubscriptionOutcome::Approved)
        );
    }

    #[tokio::test]
    async fn test_fails_closed() {
        let cases = [
            (
                validate_response("Subscription rejected"),
                DecisionReason::Outcome(SubscriptionOutcome::Rejected),
            ),
            (
                validate_response("Something new"),
                DecisionReason::Outcome(SubscriptionOutcome::Unclassified),
            ),
            (
                MockReply::Hang,
                DecisionReason::Failure(FailureKind::Unavailable),
            ),
            (
                MockReply::ConnectError,
                DecisionReason::Failure(FailureKind::Unavailable),
            ),
            (
                MockReply::Status(502),
                DecisionReason::Failure(FailureKind::Unavailable),
            ),
            (
                MockReply::Respond {
                    status: 200,
                    body: "not xml".into(),
                },
                DecisionReason::Failure(FailureKind::Protocol),
            ),
        ];

        for (reply, reason) in cases {
            let gate = authorizer(MockTransport::repeating(reply), Duration::from_secs(60)).scope();
            let decision = gate.authorize(1, 2).await;
            assert!(!decision.allowed(), "{reason:?} must deny");
            assert_eq!(decision.reason(), reason);
        }
    }

    #[tokio::test]
    async fn test_concurrent_calls_are_deduplicated() {
        let transport =
            MockTransport::repeating(validate_response(VALID)).with_delay(Duration::from_millis(50));
        let gate = Arc::new(authorizer(transport.clone(), Duration::from_secs(60)).scope());

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let gate = gate.clone();
                tokio::spawn(async move { gate.authorize(5, 9).await })
            })
            .collect();

        for handle in handles {
            assert!(handle.await.unwrap().allowed());
        }
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_listing_makes_one_call_per_creator() {
        let transport = MockTransport::repeating(validate_response(VALID));
        let gate = authorizer(transport.clone(), Duration::from_secs(60)).scope();

        // A listing with many items by only two creators
        let creators = [1, 2, 1, 1, 2, 1, 2, 2, 1, 1];
        let decisions = gate.authorize_many(9, &creators).await;

        assert_eq!(decisions.len(), creators.len());
        assert!(decisions.iter().all(|(_, d)| d.allowed()));
        assert_eq!(
            decisions.iter().map(|(c, _)| *c).collect::<Vec<_>>(),
            creators
        );
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_listing_bounds_concurrent_calls() {
        let transport =
            MockTransport::repeating(validate_response(VALID)).with_delay(Duration::from_millis(20));
        let gate = authorizer(transport.clone(), Duration::from_secs(60))
            .with_max_concurrency(3)
            .scope();

        let creators: Vec<i64> = (1..=12).collect();
        let decisions = gate.authorize_many(9, &creators).await;

        assert_eq!(
            decisions.iter().map(|(c, _)| *c).collect::<Vec<_>>(),
            creators
        );
        assert!(decisions.iter().all(|(_, d)| d.allowed()));
        assert_eq!(transport.calls(), 12);
        assert!(transport.peak_in_flight() <= 3);
        assert!(transport.peak_in_flight() > 1);
    }

    #[tokio::test]
    async fn test_failures_are_cached_within_scope() {
        let transport = MockTransport::new([MockReply::Status(500)]);
        let gate = authorizer(transport.clone(), Duration::from_secs(60)).scope();

        assert!(!gate.authorize(1, 2).await.allowed());
        assert!(!gate.authorize(1, 2).await.allowed());
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_scopes_do_not_share_decisions() {
        let transport = MockTransport::repeating(validate_response(VALID));
        let authorizer = authorizer(transport.clone(), Duration::from_secs(60));

        assert!(authorizer.scope().authorize(1, 2).await.allowed());
        assert!(authorizer.scope().authorize(1, 2).await.allowed());
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_decisions_expire() {
        let transport = MockTransport::repeating(validate_response(VALID));
        let gate = authorizer(transport.clone(), Duration::from_millis(100)).scope();

        gate.authorize(1, 2).await;
        gate.authorize(1, 2).await;
        assert_eq!(transport.calls(), 1);

        tokio::time::sleep(Duration::from_millis(250)).await;
        gate.authorize(1, 2).await;
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_cancellation_drops_remote_call() {
        let transport = MockTransport::repeating(MockReply::Hang);
        let client = test_client(transport.clone()).with_timeout(Duration::from_secs(60));
        let gate = Authorizer::new(client, Duration::from_secs(60), 100).scope();

        let task = tokio::spawn(async move { gate.authorize(1, 2).await });
        while transport.in_flight() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());
        assert_eq!(transport.in_flight(), 0);
    }
}
