use llmgate_common::{GatewayError, ProviderError, Result};
use reqwest::header::HeaderMap;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::retry::{AttemptFailure, RetryPolicy};

/// Longest error detail kept from a failed response body
const MAX_DETAIL_CHARS: usize = 2048;

/// Successful provider response, body not yet interpreted
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderResponse {
    pub status: u16,
    pub body: String,
}

/// HTTP transport with per-call timeout and policy-driven retries.
///
/// Owns the connection pool. Clones of the inner client share the same pool,
/// so the transport is never cloned; share the owning client behind an `Arc`
/// instead. The pool is released when the transport is dropped.
#[derive(Debug)]
pub struct ResilientTransport {
    http: Client,
    policy: RetryPolicy,
    timeout: Duration,
}

impl ResilientTransport {
    /// Create transport with its own connection pool
    pub fn new(timeout: Duration, policy: RetryPolicy) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::config(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            "Provider transport initialized: timeout={:?}, max_attempts={}",
            timeout, policy.max_attempts
        );

        Ok(Self {
            http,
            policy,
            timeout,
        })
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// POST a JSON body, retrying per policy
    pub async fn post<B>(
        &self,
        url: &str,
        headers: HeaderMap,
        body: &B,
    ) -> std::result::Result<ProviderResponse, ProviderError>
    where
        B: Serialize + ?Sized,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.try_post(url, &headers, body).await {
                Ok(response) => {
                    debug!(
                        "Provider responded - Status: {}, Length: {}, Attempt: {}",
                        response.status,
                        response.body.len(),
                        attempt
                    );
                    return Ok(response);
                }
                Err(failure) => {
                    if attempt >= max_attempts || !self.policy.should_retry(&failure) {
                        warn!(
                            "Provider request to {} failed (attempt {}/{}): {}. Giving up",
                            url, attempt, max_attempts, failure
                        );
                        return Err(failure.into_provider_error(attempt));
                    }

                    let delay = self.policy.backoff_for_attempt(attempt);
                    warn!(
                        "Provider request to {} failed (attempt {}/{}): {}. Retrying in {:?}...",
                        url, attempt, max_attempts, failure, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Single attempt
    async fn try_post<B>(
        &self,
        url: &str,
        headers: &HeaderMap,
        body: &B,
    ) -> std::result::Result<ProviderResponse, AttemptFailure>
    where
        B: Serialize + ?Sized,
    {
        let response = self
            .http
            .post(url)
            .headers(headers.clone())
            .json(body)
            .send()
            .await
            .map_err(AttemptFailure::Transport)?;

        let status = response.status();
        if !status.is_success() {
            // The status decides retryability; an unreadable body only loses the detail
            let text = response.text().await.unwrap_or_default();
            return Err(AttemptFailure::Status {
                status: status.as_u16(),
                detail: extract_detail(&text),
            });
        }

        let text = response.text().await.map_err(AttemptFailure::Transport)?;

        Ok(ProviderResponse {
            status: status.as_u16(),
            body: text,
        })
    }

    /// Release the connection pool now rather than at end of scope
    pub fn shutdown(self) {
        info!("Shutting down provider transport");
    }
}

impl Drop for ResilientTransport {
    fn drop(&mut self) {
        debug!("Provider transport released");
    }
}

/// Structured detail when the body is JSON, otherwise the raw text
fn extract_detail(body: &str) -> String {
    let detail = match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => value.to_string(),
        Err(_) => body.trim().to_string(),
    };

    if detail.chars().count() > MAX_DETAIL_CHARS {
        let truncated: String = detail.chars().take(MAX_DETAIL_CHARS).collect();
        format!("{}...", truncated)
    } else {
        detail
    }
}
