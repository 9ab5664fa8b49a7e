use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use axum::body::Bytes;
use secrecy::SecretString;

use crate::{
    authorization::Authorizer,
    subscription::{
        RetryPolicy, SoapResponse, SoapTransport, SubscriptionClient, TransportError,
    },
    utils::state::AppState,
};

/// Scripted answer of [`MockTransport`]
#[derive(Clone, Debug)]
pub enum MockReply {
    Respond { status: u16, body: Bytes },
    Status(u16),
    ConnectError,
    /// Never answers, so the client timeout fires
    Hang,
}

#[derive(Default)]
struct MockInner {
    replies: Mutex<VecDeque<MockReply>>,
    fallback: Option<MockReply>,
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    requests: Mutex<Vec<String>>,
}

/// In-memory transport recording every request it receives
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<MockInner>,
}

impl MockTransport {
    /// Answer with `replies` in order, then fail to connect
    pub fn new(replies: impl IntoIterator<Item = MockReply>) -> Self {
        Self {
            inner: Arc::new(MockInner {
                replies: Mutex::new(replies.into_iter().collect()),
                ..Default::default()
            }),
        }
    }

    /// Answer every request with `reply`
    pub fn repeating(reply: MockReply) -> Self {
        Self {
            inner: Arc::new(MockInner {
                fallback: Some(reply),
                ..Default::default()
            }),
        }
    }

    /// Delay every answer, so concurrent callers overlap
    pub fn with_delay(self, delay: Duration) -> Self {
        let inner = MockInner {
            replies: Mutex::new(self.inner.replies.lock().unwrap().clone()),
            fallback: self.inner.fallback.clone(),
            delay,
            ..Default::default()
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn calls(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }

    /// Requests currently awaiting an answer
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    /// Most requests ever awaiting an answer at the same time
    pub fn peak_in_flight(&self) -> usize {
        self.inner.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<String> {
        self.inner.requests.lock().unwrap().clone()
    }

    fn next_reply(&self) -> MockReply {
        self.inner
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .or_else(|| self.inner.fallback.clone())
            .unwrap_or(MockReply::ConnectError)
    }
}

struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl SoapTransport for MockTransport {
    async fn send(&self, envelope: Bytes) -> Result<SoapResponse, TransportError> {
        self.inner.calls.fetch_add(1, Ordering::SeqCst);
        let in_flight = self.inner.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner
            .peak_in_flight
            .fetch_max(in_flight, Ordering::SeqCst);
        let _guard = InFlightGuard(&self.inner.in_flight);
        self.inner
            .requests
            .lock()
            .unwrap()
            .push(String::from_utf8_lossy(&envelope).into_owned());

        let reply = self.next_reply();
        if !self.inner.delay.is_zero() {
            tokio::time::sleep(self.inner.delay).await;
        }

        match reply {
            MockReply::Respond { status, body } => Ok(SoapResponse { status, body }),
            MockReply::Status(status) => Ok(SoapResponse {
                status,
                body: Bytes::new(),
            }),
            MockReply::ConnectError => Err(TransportError::Connect("connection refused".into())),
            MockReply::Hang => {
                std::future::pending::<()>().await;
                Err(TransportError::Timeout)
            }
        }
    }
}

pub fn soap_envelope(body: &str) -> Bytes {
    Bytes::from(format!(
        r#"<?xml version="1.0" ?><S:Envelope xmlns:S="http://schemas.xmlsoap.org/soap/envelope/"><S:Body>{body}</S:Body></S:Envelope>"#
    ))
}

fn literal_response(element: &str, literal: &str) -> MockReply {
    MockReply::Respond {
        status: 200,
        body: soap_envelope(&format!(
            r#"<ns2:{element} xmlns:ns2="http://services.kinokuniya/"><return>{literal}</return></ns2:{element}>"#
        )),
    }
}

pub fn approve_response(literal: &str) -> MockReply {
    literal_response("approveSubscribeResponse", literal)
}

pub fn reject_response(literal: &str) -> MockReply {
    literal_response("rejectSubscribeResponse", literal)
}

/// Answer of the validate operation under its default name
pub fn validate_response(literal: &str) -> MockReply {
    literal_response("checkSubscribeResponse", literal)
}

fn record(fields: &(i64, i64, &str, &str)) -> String {
    let (creator_id, subscriber_id, creator_name, subscriber_name) = fields;
    format!(
        "<creatorID>{creator_id}</creatorID><subscriberID>{subscriber_id}</subscriberID><creatorName>{creator_name}</creatorName><subscriberName>{subscriber_name}</subscriberName>"
    )
}

pub fn list_pending_response(records: &[(i64, i64, &str, &str)]) -> MockReply {
    let data: String = records
        .iter()
        .map(|r| format!("<data>{}</data>", record(r)))
        .collect();
    MockReply::Respond {
        status: 200,
        body: soap_envelope(&format!(
            r#"<ns2:getAllReqSubscribeResponse xmlns:ns2="http://services.kinokuniya/"><return>{data}</return></ns2:getAllReqSubscribeResponse>"#
        )),
    }
}

pub fn list_subscribers_response(records: &[(i64, i64, &str, &str)]) -> MockReply {
    let returns: String = records
        .iter()
        .map(|r| format!("<return>{}</return>", record(r)))
        .collect();
    MockReply::Respond {
        status: 200,
        body: soap_envelope(&format!(
            r#"<ns2:getAllSubscriberResponse xmlns:ns2="http://services.kinokuniya/">{returns}</ns2:getAllSubscriberResponse>"#
        )),
    }
}

/// Client over `transport` with timings short enough for tests
pub fn test_client(transport: MockTransport) -> SubscriptionClient {
    SubscriptionClient::new(transport, SecretString::from("test-key".to_string()))
        .with_timeout(Duration::from_millis(100))
        .with_retry_policy(RetryPolicy {
            max_retries: 2,
            initial_backoff: Duration::from_millis(1),
        })
}

pub fn test_app_state(client: SubscriptionClient) -> AppState {
    AppState {
        client: client.clone(),
        authorizer: Arc::new(Authorizer::new(client, Duration::from_secs(60), 100)),
    }
}
