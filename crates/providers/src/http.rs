use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

/// Upper bound for a user-info response body.
pub const MAX_RESPONSE_BYTES: usize = 1024 * 1024;

/// Failures talking to a remote identity API. Always surfaced to callers
/// wrapped in [`AuthError::ProviderFailed`](warden_core::AuthError::ProviderFailed).
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{provider}: request failed: {source}")]
    Transport {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider}: non 200 HTTP response ({status})")]
    Status {
        provider: &'static str,
        status: reqwest::StatusCode,
    },

    #[error("{provider}: response body exceeds {limit} bytes")]
    TooLarge { provider: &'static str, limit: usize },

    #[error("{provider}: invalid user info payload: {source}")]
    Decode {
        provider: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{provider}: {reason}")]
    Request { provider: &'static str, reason: String },
}

/// GET `url` and decode a JSON body of at most [`MAX_RESPONSE_BYTES`].
pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    provider: &'static str,
    url: Url,
) -> Result<T, ProviderError> {
    let transport = |source| ProviderError::Transport { provider, source };

    let mut response = client
        .get(url)
        .header(ACCEPT, "application/json")
        .send()
        .await
        .map_err(transport)?;

    let status = response.status();
    if status != reqwest::StatusCode::OK {
        return Err(ProviderError::Status { provider, status });
    }

    if response
        .content_length()
        .is_some_and(|len| len > MAX_RESPONSE_BYTES as u64)
    {
        return Err(ProviderError::TooLarge {
            provider,
            limit: MAX_RESPONSE_BYTES,
        });
    }

    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(transport)? {
        if body.len() + chunk.len() > MAX_RESPONSE_BYTES {
            return Err(ProviderError::TooLarge {
                provider,
                limit: MAX_RESPONSE_BYTES,
            });
        }
        body.extend_from_slice(&chunk);
    }

    serde_json::from_slice(&body).map_err(|source| ProviderError::Decode { provider, source })
}
