use crate::core::error::{LookupError, Result};
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = concat!("marketpeek/", env!("CARGO_PKG_VERSION"));

/// Builds the HTTP client shared by a provider's requests.
pub fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| LookupError::Transport(format!("Failed to build HTTP client: {e}")))
}

/// Appends `segments` to `base_url` as individual path segments. Each one is
/// percent-encoded, so a symbol such as `A?B` or `USD/../latest` stays a
/// single segment instead of reshaping the request.
pub fn endpoint_url(base_url: &str, segments: &[&str]) -> Result<Url> {
    let mut url = Url::parse(base_url)
        .map_err(|e| LookupError::InvalidInput(format!("Invalid base URL {base_url}: {e}")))?;
    url.path_segments_mut()
        .map_err(|_| LookupError::InvalidInput(format!("Base URL cannot take a path: {base_url}")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Maps a non-success status to the matching lookup failure.
pub fn check_status(status: StatusCode, what: &str) -> Result<()> {
    if status.is_success() {
        return Ok(());
    }
    Err(match status {
        StatusCode::TOO_MANY_REQUESTS => LookupError::RateLimited(what.to_string()),
        StatusCode::NOT_FOUND => LookupError::UnknownIdentifier(what.to_string()),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            LookupError::Rejected(format!("HTTP {status} for {what}"))
        }
        _ => LookupError::Transport(format!("HTTP error: {status} for {what}")),
    })
}

/// Checks the status, then decodes the body as JSON.
pub async fn read_json<T: DeserializeOwned>(response: Response, what: &str) -> Result<T> {
    check_status(response.status(), what)?;
    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| {
        debug!(error = %e, response = %text, "Failed to parse response");
        LookupError::InvalidResponse(format!("Failed to parse JSON response for {what}: {e}"))
    })
}

/// Hides an API key embedded in a URL before it is logged.
pub fn redact(url: &str, secret: &str) -> String {
    if secret.is_empty() {
        url.to_string()
    } else {
        url.replace(secret, "***")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(check_status(StatusCode::OK, "AAPL").is_ok());
        assert_eq!(
            check_status(StatusCode::TOO_MANY_REQUESTS, "AAPL"),
            Err(LookupError::RateLimited("AAPL".to_string()))
        );
        assert_eq!(
            check_status(StatusCode::NOT_FOUND, "AAPL"),
            Err(LookupError::UnknownIdentifier("AAPL".to_string()))
        );
        assert!(matches!(
            check_status(StatusCode::FORBIDDEN, "AAPL"),
            Err(LookupError::Rejected(_))
        ));
        assert_eq!(
            check_status(StatusCode::BAD_GATEWAY, "AAPL"),
            Err(LookupError::Transport(
                "HTTP error: 502 Bad Gateway for AAPL".to_string()
            ))
        );
    }

    #[test]
    fn test_endpoint_url_encodes_each_segment() {
        let url = endpoint_url("http://127.0.0.1:8080", &["v3", "reference", "tickers", "A?B"]).unwrap();
        assert_eq!(url.path(), "/v3/reference/tickers/A%3FB");
        assert_eq!(url.query(), None);

        let url = endpoint_url("http://127.0.0.1:8080", &["v6", "key", "latest", "A#B"]).unwrap();
        assert_eq!(url.path(), "/v6/key/latest/A%23B");
        assert_eq!(url.fragment(), None);

        let url = endpoint_url("http://127.0.0.1:8080/", &["pair", "USD/../latest", "EUR"]).unwrap();
        assert_eq!(url.path(), "/pair/USD%2F..%2Flatest/EUR");
    }

    #[test]
    fn test_endpoint_url_keeps_base_path() {
        let url = endpoint_url("https://proxy.local/polygon", &["v2", "aggs"]).unwrap();
        assert_eq!(url.as_str(), "https://proxy.local/polygon/v2/aggs");
        assert!(matches!(
            endpoint_url("not a url", &["x"]),
            Err(LookupError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_redact() {
        assert_eq!(
            redact("https://host/v6/secret/pair/USD/EUR", "secret"),
            "https://host/v6/***/pair/USD/EUR"
        );
        assert_eq!(redact("https://host/x", ""), "https://host/x");
    }
}
