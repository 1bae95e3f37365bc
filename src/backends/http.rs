//! Request plumbing shared by the HTTP providers.

use crate::core::ProviderError;

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// Longest error body carried into `ProviderError::Http`.
const MAX_ERROR_BODY: usize = 512;

pub(crate) fn build_client(provider: &str, timeout: Duration) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .timeout(timeout)
        .build()
        .map_err(|e| {
            ProviderError::unavailable(provider, format!("failed to create HTTP client: {}", e))
        })
}

/// Sends `body` and decodes a successful response as `R`.
pub(crate) async fn post_json<B, R>(
    provider: &str,
    timeout: Duration,
    request: reqwest::RequestBuilder,
    body: &B,
) -> Result<R, ProviderError>
where
    B: Serialize + ?Sized,
    R: DeserializeOwned,
{
    let response = request.json(body).send().await.map_err(|e| {
        if e.is_timeout() {
            ProviderError::timeout(provider, timeout)
        } else {
            ProviderError::unavailable(provider, e.to_string())
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        let mut text = response.text().await.unwrap_or_default();
        if text.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !text.is_char_boundary(cut) {
                cut -= 1;
            }
            text.truncate(cut);
        }
        return Err(ProviderError::Http {
            provider: provider.to_string(),
            status: status.as_u16(),
            body: text,
        });
    }

    response
        .json::<R>()
        .await
        .map_err(|e| ProviderError::malformed(provider, e.to_string()))
}

/// Rejects blank completion text.
pub(crate) fn non_empty(provider: &str, text: Option<String>) -> Result<String, ProviderError> {
    match text {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(ProviderError::EmptyResponse {
            provider: provider.to_string(),
        }),
    }
}
