//! Outbound HTTP invocation.
//!
//! One shared connection pool serves all backends. Concurrency is
//! bounded by a semaphore in front of the pool: a caller that cannot
//! get a slot within the acquire deadline fails fast instead of queuing
//! behind an already saturated pool. Response bodies are accumulated
//! with a hard byte bound so a misbehaving backend cannot balloon
//! gateway memory.

use super::errors::BackendError;
use crate::config::ClientConfig;
use bytes::BytesMut;
use futures_util::StreamExt;
use reqwest::header::{HeaderName, CONTENT_TYPE};
use std::{sync::Arc, time::Duration};
use tokio::sync::Semaphore;

const TEXT_XML: &str = "text/xml; charset=utf-8";
const ERROR_BODY_SNIPPET: usize = 512;

/// Bounded SOAP-over-HTTP caller.
pub struct BackendInvoker {
    client: reqwest::Client,
    slots: Arc<Semaphore>,
    acquire_timeout: Duration,
    call_timeout: Duration,
    max_response_bytes: usize,
}

impl BackendInvoker {
    /// Builds the invoker and its connection pool.
    ///
    /// # Errors
    ///
    /// Returns the underlying builder error if the TLS backend cannot
    /// be initialized.
    pub fn new(config: &ClientConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(config.pool_idle_timeout_secs))
            .tcp_keepalive(Duration::from_secs(30))
            .tcp_nodelay(true)
            .build()?;

        Ok(Self {
            client,
            slots: Arc::new(Semaphore::new(config.max_in_flight)),
            acquire_timeout: config.acquire_timeout(),
            call_timeout: config.call_timeout(),
            max_response_bytes: config.max_response_bytes,
        })
    }

    /// POSTs a SOAP envelope and returns the raw response document.
    ///
    /// `extra_headers` are forwarded verbatim; the stub route uses this
    /// to carry the company-code header through to the stub backend.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] on slot exhaustion, transport failure,
    /// a non-2xx status, an oversized body, or a non-UTF-8 body.
    pub async fn invoke(
        &self,
        url: &str,
        envelope: String,
        extra_headers: &[(HeaderName, String)],
    ) -> Result<String, BackendError> {
        let _permit = tokio::time::timeout(self.acquire_timeout, self.slots.acquire())
            .await
            .map_err(|_| BackendError::PoolExhausted)?
            .map_err(|_| BackendError::PoolExhausted)?;

        let mut request = self
            .client
            .post(url)
            .timeout(self.call_timeout)
            .header(CONTENT_TYPE, TEXT_XML)
            .body(envelope);
        for (name, value) in extra_headers {
            request = request.header(name, value.as_str());
        }

        let response = request.send().await?;
        let status = response.status();

        let body = self.read_bounded(response).await?;
        if !status.is_success() {
            let snippet = body.chars().take(ERROR_BODY_SNIPPET).collect();
            return Err(BackendError::HttpStatus { status: status.as_u16(), body: snippet });
        }
        Ok(body)
    }

    async fn read_bounded(&self, response: reqwest::Response) -> Result<String, BackendError> {
        let mut buf = BytesMut::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if buf.len() + chunk.len() > self.max_response_bytes {
                return Err(BackendError::BodyTooLarge { limit: self.max_response_bytes });
            }
            buf.extend_from_slice(&chunk);
        }
        String::from_utf8(buf.to_vec()).map_err(|_| BackendError::InvalidEncoding)
    }

    /// Currently free outbound slots. Exposed for metrics.
    #[must_use]
    pub fn available_slots(&self) -> usize {
        self.slots.available_permits()
    }
}
