//! HTTP retry helpers for transient errors.
//!
//! Fetchers call [`send_bytes`] or [`send_json`] instead of
//! `reqwest::RequestBuilder::send()` directly, so every request gets
//! automatic retry with exponential backoff on timeouts, connection
//! resets, HTTP 429, and HTTP 5xx. Other 4xx statuses are permanent and
//! fail immediately.

use std::time::Duration;

use crate::FetchError;

/// Maximum retry attempts for transient HTTP errors. With exponential
/// backoff (2s, 4s, 8s, 16s, 32s) the total wait before giving up is 62
/// seconds.
const MAX_RETRIES: u32 = 5;

/// Sends a request and returns the response body as bytes.
///
/// The `build_request` closure is called on each attempt to construct a
/// fresh [`reqwest::RequestBuilder`], since builders are consumed by
/// `.send()`.
///
/// # Errors
///
/// Returns [`FetchError`] when all retries are exhausted or a permanent
/// 4xx status is received.
pub async fn send_bytes(
    build_request: impl Fn() -> reqwest::RequestBuilder,
) -> Result<Vec<u8>, FetchError> {
    let response = send_inner(&build_request).await?;
    Ok(response.bytes().await?.to_vec())
}

/// Sends a request and parses the response body as JSON.
///
/// # Errors
///
/// Returns [`FetchError`] on exhausted retries, permanent status, or a
/// body that is not valid JSON.
pub async fn send_json(
    build_request: impl Fn() -> reqwest::RequestBuilder,
) -> Result<serde_json::Value, FetchError> {
    let body = send_bytes(build_request).await?;
    Ok(serde_json::from_slice(&body)?)
}

async fn send_inner(
    build_request: &impl Fn() -> reqwest::RequestBuilder,
) -> Result<reqwest::Response, FetchError> {
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        let result = build_request().send().await;

        match result {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return Ok(response);
                }
                let transient = status.as_u16() == 429 || status.is_server_error();
                if !transient || attempt > MAX_RETRIES {
                    return Err(FetchError::Status {
                        status: status.as_u16(),
                        url: response.url().to_string(),
                    });
                }
                log::warn!(
                    "HTTP {status} (attempt {attempt}/{MAX_RETRIES}); retrying"
                );
            }
            Err(e) => {
                let transient = e.is_timeout() || e.is_connect() || e.is_request();
                if !transient || attempt > MAX_RETRIES {
                    return Err(e.into());
                }
                log::warn!("Request failed: {e} (attempt {attempt}/{MAX_RETRIES}); retrying");
            }
        }

        let backoff = Duration::from_secs(2u64.saturating_pow(attempt));
        tokio::time::sleep(backoff).await;
    }
}
