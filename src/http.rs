//! Retrying HTTP client for catalog and icon requests
//!
//! Two independent retry tiers, mirroring the configuration in
//! [`crate::config::RequestConfig`]:
//!
//! 1. **Transport tier**: connection errors, timeouts, and truncated bodies
//!    re-issue the request up to `max_retries` times with a fixed pause
//!    between attempts.
//! 2. **Status tier**: inside each attempt, responses with a server-error /
//!    rate-limit status (500, 502, 503, 504, 408, 429) are retried with
//!    exponential backoff before anything is handed back at all.
//!
//! A received HTTP response is never an error here: once the status tier
//! gives up, the last response (4xx/5xx included) is returned to the caller
//! as-is. Only exhausted transport failures produce
//! [`Error::RetriesExhausted`].
//!
//! Responses are read to completion inside the retry tiers, so a body that
//! breaks off mid-transfer is retried like any other transport failure.

use crate::config::RequestConfig;
use crate::error::{Error, Result};
use crate::retry::{IsRetryable, retry_with_backoff};
use reqwest::StatusCode;
use std::collections::HashMap;

/// Status codes retried by the backoff tier
const RETRYABLE_STATUS: &[u16] = &[500, 502, 503, 504, 408, 429];

/// A fully received HTTP response (status + body)
#[derive(Clone, Debug)]
pub struct HttpResponse {
    status: StatusCode,
    body: Vec<u8>,
}

impl HttpResponse {
    fn new(status: StatusCode, body: Vec<u8>) -> Self {
        Self { status, body }
    }

    /// HTTP status code of the response
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Whether the status code is in the 2xx range
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Raw response body
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Consume the response, returning the body bytes
    pub fn into_body(self) -> Vec<u8> {
        self.body
    }

    /// Deserialize the body as JSON
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] if the body is not valid JSON for `T`.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// HTTP client with bounded retry and per-request timeout
///
/// Stateless per call apart from reqwest's internal connection pool, which
/// is safe to share across workers; clones share the pool.
#[derive(Clone, Debug)]
pub struct HttpClient {
    client: reqwest::Client,
    config: RequestConfig,
}

/// Outcome of a single send as seen by the status tier
#[derive(Debug)]
enum SendError {
    /// The request never produced a complete response
    Transport(reqwest::Error),
    /// A response arrived with a status the backoff tier retries
    RetryableStatus {
        status: StatusCode,
        response: reqwest::Response,
    },
}

impl std::fmt::Display for SendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SendError::Transport(e) => write!(f, "{e}"),
            SendError::RetryableStatus { status, .. } => {
                write!(f, "retryable status {status}")
            }
        }
    }
}

impl IsRetryable for SendError {
    fn is_retryable(&self) -> bool {
        // Transport failures belong to the outer fixed-delay tier
        matches!(self, SendError::RetryableStatus { .. })
    }
}

impl HttpClient {
    /// Create a client with the per-request timeout from `config`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Network`] if the underlying reqwest client cannot be
    /// constructed (TLS backend initialization, for example).
    pub fn new(config: RequestConfig) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    /// GET a URL with no extra query parameters
    ///
    /// See [`HttpClient::get_with_query`] for retry semantics.
    pub async fn get(&self, url: &str) -> Result<HttpResponse> {
        self.get_with_query(url, &HashMap::new()).await
    }

    /// GET a URL with query parameters, retrying per the configured tiers
    ///
    /// # Errors
    ///
    /// Returns [`Error::RetriesExhausted`] when every attempt failed at the
    /// transport level. A response that was actually received is always
    /// `Ok`, whatever its status code; callers decide what non-2xx means.
    pub async fn get_with_query(
        &self,
        url: &str,
        params: &HashMap<String, String>,
    ) -> Result<HttpResponse> {
        let mut attempt = 1;

        loop {
            let outcome = retry_with_backoff(&self.config.backoff, || {
                let request = self.client.get(url).query(params);
                async move {
                    let response = request.send().await.map_err(SendError::Transport)?;
                    let status = response.status();
                    if RETRYABLE_STATUS.contains(&status.as_u16()) {
                        return Err(SendError::RetryableStatus { status, response });
                    }
                    let body = response.bytes().await.map_err(SendError::Transport)?;
                    Ok(HttpResponse::new(status, body.to_vec()))
                }
            })
            .await;

            // Normalize: an exhausted retryable status still counts as a
            // received response, provided its body can be read.
            let attempt_result = match outcome {
                Ok(response) => Ok(response),
                Err(SendError::RetryableStatus { status, response }) => {
                    tracing::warn!(
                        url,
                        status = status.as_u16(),
                        "Server kept returning a retryable status, passing response through"
                    );
                    match response.bytes().await {
                        Ok(body) => Ok(HttpResponse::new(status, body.to_vec())),
                        Err(e) => Err(e),
                    }
                }
                Err(SendError::Transport(e)) => Err(e),
            };

            match attempt_result {
                Ok(response) => return Ok(response),
                Err(e) if attempt < self.config.max_retries => {
                    tracing::warn!(
                        url,
                        error = %e,
                        attempt = attempt,
                        max_retries = self.config.max_retries,
                        timeout = e.is_timeout(),
                        connect = e.is_connect(),
                        delay_ms = self.config.retry_delay.as_millis(),
                        "Request failed, retrying"
                    );
                    tokio::time::sleep(self.config.retry_delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(
                        url,
                        error = %e,
                        attempts = attempt,
                        "Request failed after all attempts"
                    );
                    return Err(Error::RetriesExhausted {
                        url: url.to_string(),
                        attempts: attempt,
                        source: e,
                    });
                }
            }
        }
    }
}
