use std::{sync::Arc, time::Duration};

use axum::body::Bytes;
use secrecy::{ExposeSecret, SecretString};
use tracing::instrument;

use super::{
    classifier::ResultClassifier,
    codec::{self, OperationName, ParsedNode},
    errors::{ProtocolError, SubscriptionError, TransportFailure},
    transport::{HttpTransport, SoapResponse, SoapTransport, TransportError},
    Operation,
};
use crate::{
    config::SoapConfig,
    models::{SubscriptionOutcome, SubscriptionQuery, SubscriptionRecord},
};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);
// SOAP faults are delivered with this status and still carry a parseable body
const SOAP_FAULT_STATUS: u16 = 500;

/// Retry behaviour for read operations. Mutations are never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff: Duration::from_millis(200),
        }
    }
}

/// Client for the remote subscription service.
///
/// Built once at startup and shared through the application state. Every
/// attempt is bounded by the configured timeout; reads are retried with
/// exponential backoff, approve and reject are sent exactly once.
#[derive(Clone)]
pub struct SubscriptionClient {
    transport: Arc<dyn SoapTransport>,
    auth_key: SecretString,
    timeout: Duration,
    retry: RetryPolicy,
    classifier: Arc<ResultClassifier>,
    validate_operation: OperationName,
}

impl SubscriptionClient {
    pub fn new(transport: impl SoapTransport + 'static, auth_key: SecretString) -> Self {
        Self {
            transport: Arc::new(transport),
            auth_key,
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
            classifier: Arc::new(ResultClassifier::default()),
            validate_operation: OperationName::conventional("checkSubscribe"),
        }
    }

    /// Build an HTTP-backed client from the `soap` configuration section
    pub fn from_config(config: &SoapConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.timeout())
            .build()?;
        let transport = HttpTransport::new(http, config.endpoint());
        tracing::info!("Subscription service endpoint: {}", transport.endpoint());

        Ok(Self::new(transport, config.key.clone())
            .with_timeout(config.timeout())
            .with_retry_policy(RetryPolicy {
                max_retries: config.max_retries,
                initial_backoff: config.retry_backoff(),
            })
            .with_classifier(ResultClassifier::new(&config.validate_literals))
            .with_validate_operation(config.validate_operation.clone()))
    }

    /// Set the per-attempt timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_classifier(mut self, classifier: ResultClassifier) -> Self {
        self.classifier = Arc::new(classifier);
        self
    }

    /// Set the remote name of the validate operation
    pub fn with_validate_operation(mut self, name: impl Into<String>) -> Self {
        self.validate_operation = OperationName::conventional(name);
        self
    }

    #[instrument(
        skip(self),
        fields(creator_id = query.creator_id, subscriber_id = query.subscriber_id)
    )]
    pub async fn validate(
        &self,
        query: SubscriptionQuery,
    ) -> Result<SubscriptionOutcome, SubscriptionError> {
        self.classified(Operation::Validate, query).await
    }

    #[instrument(
        skip(self),
        fields(creator_id = query.creator_id, subscriber_id = query.subscriber_id)
    )]
    pub async fn approve(
        &self,
        query: SubscriptionQuery,
    ) -> Result<SubscriptionOutcome, SubscriptionError> {
        self.classified(Operation::Approve, query).await
    }

    #[instrument(
        skip(self),
        fields(creator_id = query.creator_id, subscriber_id = query.subscriber_id)
    )]
    pub async fn reject(
        &self,
        query: SubscriptionQuery,
    ) -> Result<SubscriptionOutcome, SubscriptionError> {
        self.classified(Operation::Reject, query).await
    }

    /// Pending subscription requests addressed to `subscriber_id`.
    ///
    /// The remote side omits `data` entirely when there is nothing pending.
    #[instrument(skip(self))]
    pub async fn list_pending_for_creator(
        &self,
        subscriber_id: i64,
    ) -> Result<Vec<SubscriptionRecord>, SubscriptionError> {
        let response = self
            .call(Operation::ListPending, &[subscriber_id.to_string()])
            .await?;

        let Some(result) = response.child("return") else {
            return Ok(Vec::new());
        };
        let records = result
            .children("data")
            .map(parse_record)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Subscribers of `creator_id`, one `return` element per record
    #[instrument(skip(self))]
    pub async fn list_subscribers(
        &self,
        creator_id: i64,
    ) -> Result<Vec<SubscriptionRecord>, SubscriptionError> {
        let response = self
            .call(Operation::ListSubscribers, &[creator_id.to_string()])
            .await?;

        let records = response
            .children("return")
            .filter(|node| !node.children.is_empty())
            .map(parse_record)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    async fn classified(
        &self,
        operation: Operation,
        query: SubscriptionQuery,
    ) -> Result<SubscriptionOutcome, SubscriptionError> {
        let args = [query.creator_id.to_string(), query.subscriber_id.to_string()];
        let response = self.call(operation, &args).await?;
        let outcome = self.classifier.classify(&response, operation);
        tracing::debug!("{operation:?} classified as {outcome:?}");
        Ok(outcome)
    }

    fn operation_name(&self, operation: Operation) -> OperationName {
        match operation {
            Operation::Validate => self.validate_operation.clone(),
            Operation::Approve => OperationName::APPROVE,
            Operation::Reject => OperationName::REJECT,
            Operation::ListPending => OperationName::LIST_PENDING,
            Operation::ListSubscribers => OperationName::LIST_SUBSCRIBERS,
        }
    }

    async fn call(
        &self,
        operation: Operation,
        args: &[String],
    ) -> Result<ParsedNode, SubscriptionError> {
        let name = self.operation_name(operation);
        let envelope = Bytes::from(codec::build_request(
            &name,
            args,
            self.auth_key.expose_secret(),
        ));

        let response = if operation.is_retryable() {
            self.send_with_retry(operation, envelope).await?
        } else {
            self.send_once(operation, envelope).await?
        };

        codec::parse_response(&response.body, &name).map_err(|err| {
            tracing::error!("Invalid {operation:?} response (HTTP {}): {err}", response.status);
            SubscriptionError::Protocol(err)
        })
    }

    async fn send_with_retry(
        &self,
        operation: Operation,
        envelope: Bytes,
    ) -> Result<SoapResponse, TransportFailure> {
        let mut backoff = self.retry.initial_backoff;
        let mut retries = 0;
        loop {
            match self.attempt(envelope.clone()).await {
                Ok(response) => return Ok(response),
                Err(err) if retries < self.retry.max_retries => {
                    retries += 1;
                    tracing::warn!(
                        "{operation:?} attempt failed: {err}; retry {retries}/{} in {backoff:?}",
                        self.retry.max_retries
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = backoff.saturating_mul(2);
                }
                Err(err) => {
                    tracing::error!("{operation:?} failed after {} attempts: {err}", retries + 1);
                    return Err(TransportFailure::Unavailable(err.to_string()));
                }
            }
        }
    }

    async fn send_once(
        &self,
        operation: Operation,
        envelope: Bytes,
    ) -> Result<SoapResponse, TransportFailure> {
        // The remote state is unknown after any failure of a mutation
        self.attempt(envelope).await.map_err(|err| {
            tracing::error!("{operation:?} failed, not retrying: {err}");
            TransportFailure::Indeterminate(err.to_string())
        })
    }

    async fn attempt(&self, envelope: Bytes) -> Result<SoapResponse, TransportError> {
        let response = tokio::time::timeout(self.timeout, self.transport.send(envelope))
            .await
            .map_err(|_| TransportError::Timeout)??;

        if (200..300).contains(&response.status) || response.status == SOAP_FAULT_STATUS {
            Ok(response)
        } else {
            Err(TransportError::Status(response.status))
        }
    }
}

fn parse_record(node: &ParsedNode) -> Result<SubscriptionRecord, ProtocolError> {
    let id = |field: &str| -> Result<i64, ProtocolError> {
        let raw = node.require_child(field)?.text().trim();
        raw.parse()
            .map_err(|_| ProtocolError::InvalidRecord(format!("{field} is not an integer: {raw:?}")))
    };
    let name = |field: &str| -> Result<String, ProtocolError> {
        Ok(node.require_child(field)?.text().to_string())
    };

    Ok(SubscriptionRecord {
        creator_id: id("creatorID")?,
        subscriber_id: id("subscriberID")?,
        creator_name: name("creatorName")?,
        subscriber_name: name("subscriberName")?,
    })
}
