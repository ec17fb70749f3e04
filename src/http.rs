//! Shared HTTP plumbing for model backends.
//!
//! Maps transport failures and HTTP status codes onto the error taxonomy:
//!
//! | Condition | Error |
//! |-----------|-------|
//! | HTTP 401 / 403 | [`Error::Auth`] |
//! | HTTP 429 | [`Error::RateLimit`] |
//! | HTTP 5xx, timeout, connection failure | [`Error::Unavailable`] |
//! | other non-2xx, bad JSON | [`Error::Backend`] |
//!
//! Only the first two rows are worth retrying; see [`Error::is_transient`].

use reqwest::StatusCode;
use std::time::Duration;

use docqa_core::{Error, Result};

use crate::config::ApiKey;

/// Build a client with a whole-request timeout.
pub fn build_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| Error::Backend(format!("failed to build HTTP client: {}", e)))
}

/// POST a JSON body and return the parsed JSON response.
///
/// `backend` names the remote service in error messages (e.g. `"Ollama"`).
/// The bearer key, if any, is sent as a header and never logged.
pub async fn post_json(
    client: &reqwest::Client,
    url: &str,
    api_key: Option<&ApiKey>,
    body: &serde_json::Value,
    backend: &str,
) -> Result<serde_json::Value> {
    let mut request = client
        .post(url)
        .header("Content-Type", "application/json")
        .json(body);
    if let Some(key) = api_key {
        request = request.bearer_auth(key.expose());
    }

    let response = request
        .send()
        .await
        .map_err(|e| transport_error(backend, url, &e))?;

    let status = response.status();
    if !status.is_success() {
        let body_text = response.text().await.unwrap_or_default();
        return Err(classify_status(backend, status, &body_text));
    }

    response
        .json()
        .await
        .map_err(|e| Error::Backend(format!("{} returned invalid JSON: {}", backend, e)))
}

/// Turn a non-success status into the matching error kind.
pub fn classify_status(backend: &str, status: StatusCode, body: &str) -> Error {
    let detail = format!("{} API error {}: {}", backend, status, body.trim());
    match status.as_u16() {
        401 | 403 => Error::Auth(detail),
        429 => Error::RateLimit(detail),
        _ if status.is_server_error() => Error::Unavailable(detail),
        _ => Error::Backend(detail),
    }
}

fn transport_error(backend: &str, url: &str, e: &reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Unavailable(format!("{} request to {} timed out", backend, url))
    } else if e.is_connect() {
        Error::Unavailable(format!(
            "{} connection error (is it running at {}?): {}",
            backend, url, e
        ))
    } else {
        Error::Backend(format!("{} request failed: {}", backend, e))
    }
}
