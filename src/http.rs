//! Shared HTTP plumbing for the backend clients.
//!
//! Each backend owns one `reqwest::Client` built at startup with that
//! backend's timeout, so a slow provider surfaces as an ordinary request
//! error (and the pipeline degrades) instead of stalling a chat turn.

use anyhow::{bail, Result};
use std::time::Duration;

/// Longest error body echoed into an error message.
const MAX_ERROR_BODY: usize = 500;

pub(crate) fn build_client(timeout_secs: u64) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

/// Decode a JSON response, turning non-2xx statuses into errors that carry
/// the (truncated) response body.
pub(crate) async fn read_json(
    response: reqwest::Response,
    service: &str,
) -> Result<serde_json::Value> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        bail!(
            "{} API error {}: {}",
            service,
            status,
            truncate(&body, MAX_ERROR_BODY)
        );
    }
    Ok(response.json().await?)
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("short", 100), "short");
    }
}
