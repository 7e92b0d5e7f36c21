//! Core Twitter API utilities.
//!
//! This module contains low-level API utilities for making authenticated requests
//! to the Twitter API, including automatic token refresh on 401 errors and bounded
//! retries for rate limits and server errors.

use log::{debug, error, info, warn};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::time::Duration;
use tokio::sync::RwLock;

use crate::config::TwitterConfig;
use crate::error::{FetchError, PostError};
use crate::oauth::build_oauth2_user_context_header;

/// Attempts per request before a transient failure is handed to the caller.
const MAX_ATTEMPTS: u32 = 3;
/// Upper bound on how long we sleep for a rate limit window to reset.
const MAX_RATE_LIMIT_WAIT: Duration = Duration::from_secs(15 * 60);

/// Sanitizes text for safe logging by truncating and escaping control characters.
///
/// This function:
/// - Truncates long text to prevent log flooding
/// - Replaces control characters that could manipulate log output
/// - Escapes newlines to prevent log injection
///
/// # Parameters
///
/// - `text`: The text to sanitize
/// - `max_len`: Maximum number of characters kept before truncation
///
/// # Returns
///
/// A sanitized string safe for logging
pub fn sanitize_for_logging(text: &str, max_len: usize) -> String {
    let sanitized: String = text
        .chars()
        .map(|c| match c {
            '\n' | '\r' | '\t' => ' ',
            c if c.is_control() => '?',
            c => c,
        })
        .collect();

    if sanitized.chars().count() > max_len {
        let truncated: String = sanitized.chars().take(max_len).collect();
        format!(
            "{}... [truncated, {} total bytes]",
            truncated,
            text.len()
        )
    } else {
        sanitized
    }
}

/// Why an authenticated request did not produce a response body.
#[derive(Debug)]
pub(crate) enum RequestError {
    /// Network failure, rate limit or server error that outlasted our retries.
    Transient(String),
    /// 401 that a token refresh could not fix.
    Unauthorized(String),
    /// 403 for this particular resource.
    Forbidden(String),
    NotFound(String),
    /// Any other 4xx.
    Rejected(String),
}

impl From<RequestError> for FetchError {
    fn from(e: RequestError) -> Self {
        match e {
            RequestError::Transient(msg) => FetchError::Transient(msg),
            RequestError::Unauthorized(msg)
            | RequestError::Forbidden(msg)
            | RequestError::NotFound(msg)
            | RequestError::Rejected(msg) => FetchError::Fatal(msg),
        }
    }
}

impl From<RequestError> for PostError {
    fn from(e: RequestError) -> Self {
        match e {
            RequestError::Transient(msg) => PostError::Transient(msg),
            RequestError::Unauthorized(msg) => PostError::Fatal(msg),
            RequestError::Forbidden(msg)
            | RequestError::NotFound(msg)
            | RequestError::Rejected(msg) => PostError::Rejected(msg),
        }
    }
}

/// How long to wait before retrying a rate-limited or failed request.
///
/// Rate-limited responses carry the window reset as a unix timestamp in
/// `x-rate-limit-reset`; otherwise back off exponentially.
fn retry_delay(response: Option<&Response>, attempt: u32) -> Duration {
    let reset = response
        .filter(|r| r.status() == StatusCode::TOO_MANY_REQUESTS)
        .and_then(|r| r.headers().get("x-rate-limit-reset"))
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<i64>().ok());

    match reset {
        Some(reset_at) => {
            let wait = reset_at - chrono::Utc::now().timestamp();
            Duration::from_secs(wait.max(1) as u64).min(MAX_RATE_LIMIT_WAIT)
        }
        None => Duration::from_secs(2u64.pow(attempt)),
    }
}

/// Makes an authenticated request to the Twitter API with automatic token refresh on 401 errors.
///
/// `build` is called once per attempt with the current Authorization header value, so a
/// refreshed token is picked up by the retry.
///
/// # Parameters
///
/// - `client`: The HTTP client
/// - `config`: Shared credentials (may be updated with a new token)
/// - `build`: Builds the request for a given Authorization header
/// - `operation_name`: Human-readable name for the operation (for logging)
///
/// # Returns
///
/// - `Ok(String)`: The API response body on success
/// - `Err(RequestError)`: Classified failure
pub(crate) async fn make_authenticated_request<F>(
    client: &Client,
    config: &RwLock<TwitterConfig>,
    build: F,
    operation_name: &str,
) -> Result<String, RequestError>
where
    F: Fn(&Client, String) -> RequestBuilder,
{
    debug!(
        "Making authenticated request for operation: {}",
        operation_name
    );

    let mut refreshed = false;
    let mut attempt = 0;

    loop {
        attempt += 1;
        let auth_header = build_oauth2_user_context_header(&config.read().await.access_token);

        let response = match build(client, auth_header).send().await {
            Ok(response) => response,
            Err(e) => {
                if attempt < MAX_ATTEMPTS {
                    let wait = retry_delay(None, attempt);
                    warn!(
                        "Request for '{}' failed ({}), retrying in {:?}",
                        operation_name, e, wait
                    );
                    tokio::time::sleep(wait).await;
                    continue;
                }
                error!("Request for '{}' failed: {}", operation_name, e);
                return Err(RequestError::Transient(format!(
                    "request for '{}' failed: {}",
                    operation_name, e
                )));
            }
        };

        let status = response.status();
        debug!(
            "Received response with status: {} for operation: {}",
            status, operation_name
        );

        if status.is_success() {
            let response_text = response.text().await.map_err(|e| {
                RequestError::Transient(format!(
                    "failed to read response for '{}': {}",
                    operation_name, e
                ))
            })?;
            debug!(
                "Response summary for '{}': {} bytes received",
                operation_name,
                response_text.len()
            );
            return Ok(response_text);
        }

        // Handle 401 Unauthorized - token might be expired
        if status == StatusCode::UNAUTHORIZED && !refreshed {
            refreshed = true;
            warn!(
                "Received 401 Unauthorized for operation '{}' - access token may be expired",
                operation_name
            );

            let mut credentials = config.write().await;
            if !credentials.can_refresh_token() {
                error!(
                    "Cannot refresh token for operation '{}' - missing refresh credentials",
                    operation_name
                );
                return Err(RequestError::Unauthorized(format!(
                    "Twitter API error (401) for operation '{}' and token refresh not available",
                    operation_name
                )));
            }
            if let Err(e) = credentials.refresh_access_token(client).await {
                error!(
                    "Token refresh failed for operation '{}': {}",
                    operation_name, e
                );
                return Err(RequestError::Unauthorized(format!(
                    "token refresh failed for operation '{}': {}",
                    operation_name, e
                )));
            }
            info!(
                "Token refreshed successfully, retrying operation '{}'",
                operation_name
            );
            continue;
        }

        let retriable = status == StatusCode::TOO_MANY_REQUESTS
            || status == StatusCode::REQUEST_TIMEOUT
            || status.is_server_error();
        if retriable && attempt < MAX_ATTEMPTS {
            let wait = retry_delay(Some(&response), attempt);
            warn!(
                "Operation '{}' got {}, retrying in {:?} (attempt {}/{})",
                operation_name, status, wait, attempt, MAX_ATTEMPTS
            );
            tokio::time::sleep(wait).await;
            continue;
        }

        let error_text = response.text().await.unwrap_or_default();
        error!("Operation '{}' failed - Status: {}", operation_name, status);
        debug!(
            "Error response for '{}': {}",
            operation_name,
            sanitize_for_logging(&error_text, 200)
        );

        let message = format!(
            "Twitter API error for operation '{}' ({})",
            operation_name, status
        );
        return Err(match status {
            _ if retriable => RequestError::Transient(message),
            StatusCode::UNAUTHORIZED => RequestError::Unauthorized(message),
            StatusCode::FORBIDDEN => RequestError::Forbidden(message),
            StatusCode::NOT_FOUND => RequestError::NotFound(message),
            _ => RequestError::Rejected(message),
        });
    }
}
