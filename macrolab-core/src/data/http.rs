//! Blocking HTTP plumbing shared by the provider clients.
//!
//! One attempt per request: status codes map onto `FetchError` variants and
//! are returned to the caller as-is.

use super::provider::FetchError;
use reqwest::blocking::{Client, Request, Response};
use reqwest::{StatusCode, Url};
use std::time::Duration;

pub(crate) fn build_client(timeout_secs: u64, user_agent: &str) -> Result<Client, FetchError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(user_agent)
        .build()
        .map_err(|e| FetchError::NetworkUnreachable(format!("failed to build HTTP client: {e}")))
}

/// Parse a configured endpoint.
pub(crate) fn parse_base_url(base: &str) -> Result<Url, FetchError> {
    Url::parse(base).map_err(|e| FetchError::InvalidUrl(format!("{base}: {e}")))
}

/// Build a GET request for `url`; query values are encoded by reqwest.
pub(crate) fn get_request(
    client: &Client,
    url: Url,
    query: &[(&str, String)],
) -> Result<Request, FetchError> {
    client
        .get(url)
        .query(query)
        .build()
        .map_err(|e| FetchError::InvalidUrl(e.to_string()))
}

/// Send `request` once and return the response if the status is a success.
pub(crate) fn send(client: &Client, request: Request, what: &str) -> Result<Response, FetchError> {
    let resp = client
        .execute(request)
        .map_err(|e| FetchError::NetworkUnreachable(e.to_string()))?;

    match classify_status(resp.status(), retry_after(&resp), what) {
        Some(err) => Err(err),
        None => Ok(resp),
    }
}

fn retry_after(resp: &Response) -> Option<u64> {
    resp.headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
}

/// Map a non-success status onto a fetch error. `None` for 2xx.
pub(crate) fn classify_status(
    status: StatusCode,
    retry_after_secs: Option<u64>,
    what: &str,
) -> Option<FetchError> {
    if status.is_success() {
        return None;
    }
    let err = match status {
        StatusCode::TOO_MANY_REQUESTS => FetchError::RateLimited { retry_after_secs },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            FetchError::AuthenticationRequired(format!("HTTP {} for {what}", status.as_u16()))
        }
        StatusCode::NOT_FOUND => FetchError::NotFound(what.to_string()),
        other => FetchError::HttpStatus {
            status: other.as_u16(),
            what: what.to_string(),
        },
    };
    Some(err)
}
