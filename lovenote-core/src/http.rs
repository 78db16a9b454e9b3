use std::time::Duration;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

use crate::error::{LoveNoteError, Result, truncate_body};

pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

pub(crate) fn client() -> Result<Client> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| LoveNoteError::Configuration(format!("failed to build HTTP client: {e}")))
}

/// Reads the body and decodes it as JSON. Returns the raw text alongside the
/// parsed value so callers can quote it in protocol errors.
pub(crate) async fn read_json<T: DeserializeOwned>(
    provider: &'static str,
    res: Response,
) -> Result<(T, String)> {
    let status = res.status();
    let body = res
        .text()
        .await
        .map_err(|e| LoveNoteError::transport(provider, e))?;

    if !status.is_success() {
        return Err(LoveNoteError::Transport {
            provider,
            status: Some(status),
            body: truncate_body(&body),
        });
    }

    let parsed = serde_json::from_str(&body).map_err(|e| LoveNoteError::Transport {
        provider,
        status: Some(status),
        body: format!("non-JSON body ({e}): {}", truncate_body(&body)),
    })?;

    Ok((parsed, body))
}
