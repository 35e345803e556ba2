//! OAuth2 authorization-code callback handling.
//!
//! The exchange itself (talking to the authorization server's token endpoint)
//! is delegated to a [`CodeExchanger`]; this module checks the round-trip
//! `state` and turns the exchanged token into [`OAuth2AuthData`], which any
//! bearer-token provider can consume.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use http::Request;
use serde::{Deserialize, Serialize};
use tracing::debug;

use warden_core::{AuthData, AuthDataParser, AuthError, AuthResult, BoxError};

/// Token obtained from an authorization server.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuth2Token {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl OAuth2Token {
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: Some("Bearer".to_string()),
            refresh_token: None,
            expires_at: None,
        }
    }
}

impl core::fmt::Debug for OAuth2Token {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("OAuth2Token")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Auth data produced by an OAuth2 flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuth2AuthData {
    /// Which OAuth2 service issued the token, e.g. `"google"`.
    pub service_name: String,
    pub token: OAuth2Token,
}

impl OAuth2AuthData {
    pub fn new(service_name: impl Into<String>, token: OAuth2Token) -> Self {
        Self {
            service_name: service_name.into(),
            token,
        }
    }
}

impl AuthData for OAuth2AuthData {
    fn access_token(&self) -> Option<&str> {
        Some(&self.token.access_token)
    }

    fn service_name(&self) -> Option<&str> {
        Some(&self.service_name)
    }
}

/// Returns the `state` value previously issued to the user agent, consuming it.
///
/// `Ok(None)` means nothing was stored for this request.
#[async_trait]
pub trait OAuth2StateStore: Send + Sync {
    async fn take_state(&self, request: &Request<Bytes>) -> Result<Option<String>, BoxError>;
}

/// Exchanges an authorization code for a token.
#[async_trait]
pub trait CodeExchanger: Send + Sync {
    async fn exchange(&self, code: &str) -> Result<OAuth2Token, BoxError>;
}

/// Compare a returned `state` with the stored one without short-circuiting
/// on the first differing byte.
pub fn verify_state(expected: &str, returned: &str) -> AuthResult<()> {
    let (a, b) = (expected.as_bytes(), returned.as_bytes());
    if a.len() != b.len() {
        return Err(AuthError::OAuth2StateMismatch);
    }
    let diff = a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y));
    if diff == 0 {
        Ok(())
    } else {
        Err(AuthError::OAuth2StateMismatch)
    }
}

/// Parses the redirect back from an authorization server
/// (`?code=...&state=...`) into [`OAuth2AuthData`].
#[derive(Clone)]
pub struct OAuth2CallbackParser {
    service_name: String,
    state_store: Arc<dyn OAuth2StateStore>,
    exchanger: Arc<dyn CodeExchanger>,
}

impl OAuth2CallbackParser {
    pub fn new(
        service_name: impl Into<String>,
        state_store: Arc<dyn OAuth2StateStore>,
        exchanger: Arc<dyn CodeExchanger>,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            state_store,
            exchanger,
        }
    }
}

#[async_trait]
impl AuthDataParser for OAuth2CallbackParser {
    async fn parse_auth_data(&self, request: &Request<Bytes>) -> AuthResult<Box<dyn AuthData>> {
        let query: HashMap<String, String> = request
            .uri()
            .query()
            .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
            .unwrap_or_default();

        if let Some(error) = query.get("error") {
            return Err(AuthError::OAuth2TokenExchange(
                format!("authorization server returned error: {error}").into(),
            ));
        }

        let code = query
            .get("code")
            .ok_or_else(|| AuthError::malformed("missing `code` query parameter"))?;
        let returned_state = query
            .get("state")
            .ok_or_else(|| AuthError::malformed("missing `state` query parameter"))?;

        let stored_state = self
            .state_store
            .take_state(request)
            .await
            .map_err(AuthError::OAuth2StateManager)?
            .ok_or(AuthError::OAuth2StateMismatch)?;
        verify_state(&stored_state, returned_state)?;

        let token = self
            .exchanger
            .exchange(code)
            .await
            .map_err(AuthError::OAuth2TokenExchange)?;

        debug!(service = %self.service_name, "oauth2 code exchanged");
        Ok(Box::new(OAuth2AuthData::new(self.service_name.clone(), token)))
    }
}
