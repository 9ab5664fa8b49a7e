use async_trait::async_trait;
use axum::body::Bytes;
use reqwest::{header::CONTENT_TYPE, Client};
use thiserror::Error;

use super::codec;

#[derive(Debug, Error)]
pub enum TransportError {
    /// The connection was never established
    #[error("failed to connect: {0}")]
    Connect(String),
    #[error("request timed out")]
    Timeout,
    #[error("request failed: {0}")]
    Request(String),
    #[error("unexpected HTTP status {0}")]
    Status(u16),
}

/// Raw answer of the remote endpoint
#[derive(Debug, Clone)]
pub struct SoapResponse {
    pub status: u16,
    pub body: Bytes,
}

/// Carries an encoded envelope to the remote service.
///
/// Implementations perform a single attempt; timeouts and retries are
/// owned by [`SubscriptionClient`](super::SubscriptionClient).
#[async_trait]
pub trait SoapTransport: Send + Sync {
    async fn send(&self, envelope: Bytes) -> Result<SoapResponse, TransportError>;
}

/// HTTP POST transport backed by a shared [`reqwest::Client`]
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SoapTransport for HttpTransport {
    async fn send(&self, envelope: Bytes) -> Result<SoapResponse, TransportError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, codec::CONTENT_TYPE)
            .body(envelope)
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(classify_reqwest_error)?;
        Ok(SoapResponse { status, body })
    }
}

fn classify_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_connect() {
        TransportError::Connect(err.to_string())
    } else {
        TransportError::Request(err.to_string())
    }
}
