use crate::common::constants::BROWSER_USER_AGENT;
use crate::common::error::Result;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER, USER_AGENT};
use std::time::Duration;

/// What a provider expects to receive back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accept {
    Json,
    Html,
}

/// Build a client for one provider call. The client, and its connection
/// pool, is dropped when the call returns.
pub fn build_client(timeout_secs: u64, accept: Accept, referer: Option<&str>) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    match accept {
        Accept::Json => {
            headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        }
        Accept::Html => {
            headers.insert(
                ACCEPT,
                HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
            );
            headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("ru-RU,ru;q=0.9,en;q=0.8"));
        }
    }
    if let Some(value) = referer.and_then(|r| HeaderValue::from_str(r).ok()) {
        headers.insert(REFERER, value);
    }

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .default_headers(headers)
        .build()?;
    Ok(client)
}
