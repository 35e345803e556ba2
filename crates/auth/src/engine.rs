//! Inbound path: credentials → user data → auth token → wire.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response};
use tracing::{debug, warn};

use warden_core::{
    AuthData, AuthDataParser, AuthError, AuthResult, AuthToken, AuthTokenSerializer,
    Authenticator, HttpAuthTokenSerializer, UserData, UserDataProvider,
};

/// Authenticates a user from an incoming request and creates auth tokens.
///
/// High-level entry point intended to be called from a login handler.
#[async_trait]
pub trait AuthEngine: Send + Sync {
    async fn authenticate_request(
        &self,
        request: &Request<Bytes>,
    ) -> AuthResult<Box<dyn AuthToken>>;

    async fn authenticate_auth_data(&self, data: &dyn AuthData) -> AuthResult<Box<dyn AuthToken>>;

    /// Strips secret info from `token` (in place) and writes it to `response`.
    async fn serialize_auth_token_to_response(
        &self,
        token: &mut dyn AuthToken,
        response: &mut Response<Bytes>,
    ) -> AuthResult<()>;

    /// Strips secret info from `token` (in place) and serializes it.
    async fn serialize_auth_token(&self, token: &mut dyn AuthToken) -> AuthResult<Vec<u8>>;
}

/// [`AuthEngine`] assembled from pluggable collaborators.
///
/// Only the authenticator is mandatory. Entry points whose collaborator is
/// missing fail with [`AuthError::NotConfigured`].
#[derive(Clone)]
pub struct DefaultAuthEngine {
    parser: Option<Arc<dyn AuthDataParser>>,
    providers: Vec<Arc<dyn UserDataProvider>>,
    authenticator: Arc<dyn Authenticator>,
    serializer: Option<Arc<dyn AuthTokenSerializer>>,
    http_serializer: Option<Arc<dyn HttpAuthTokenSerializer>>,
}

impl DefaultAuthEngine {
    pub fn new(authenticator: Arc<dyn Authenticator>) -> Self {
        Self {
            parser: None,
            providers: Vec::new(),
            authenticator,
            serializer: None,
            http_serializer: None,
        }
    }

    pub fn with_parser(mut self, parser: Arc<dyn AuthDataParser>) -> Self {
        self.parser = Some(parser);
        self
    }

    /// Append a provider. Providers are consulted in the order they were added.
    pub fn with_provider(mut self, provider: Arc<dyn UserDataProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn with_serializer(mut self, serializer: Arc<dyn AuthTokenSerializer>) -> Self {
        self.serializer = Some(serializer);
        self
    }

    pub fn with_http_serializer(mut self, serializer: Arc<dyn HttpAuthTokenSerializer>) -> Self {
        self.http_serializer = Some(serializer);
        self
    }

    pub fn providers(&self) -> usize {
        self.providers.len()
    }

    /// First provider to return user data wins; declines are skipped, any
    /// other error aborts.
    async fn resolve_user_data(&self, data: &dyn AuthData) -> AuthResult<Box<dyn UserData>> {
        for (index, provider) in self.providers.iter().enumerate() {
            match provider.get_user_data(data).await {
                Ok(user) => {
                    debug!(provider = index, "user data resolved");
                    return Ok(user);
                }
                Err(e) if e.is_not_supported() => {
                    debug!(provider = index, "auth data not supported by provider, trying next");
                }
                Err(e) => {
                    warn!(provider = index, error = %e, "user data provider failed");
                    return Err(e);
                }
            }
        }

        Err(AuthError::NoUserData)
    }
}

#[async_trait]
impl AuthEngine for DefaultAuthEngine {
    async fn authenticate_request(
        &self,
        request: &Request<Bytes>,
    ) -> AuthResult<Box<dyn AuthToken>> {
        let parser = self
            .parser
            .as_ref()
            .ok_or(AuthError::NotConfigured("auth data parser"))?;

        let data = parser.parse_auth_data(request).await?;
        self.authenticate_auth_data(data.as_ref()).await
    }

    async fn authenticate_auth_data(&self, data: &dyn AuthData) -> AuthResult<Box<dyn AuthToken>> {
        let user = self.resolve_user_data(data).await?;
        self.authenticator.authenticate(data, user).await
    }

    async fn serialize_auth_token_to_response(
        &self,
        token: &mut dyn AuthToken,
        response: &mut Response<Bytes>,
    ) -> AuthResult<()> {
        let serializer = self
            .http_serializer
            .as_ref()
            .ok_or(AuthError::NotConfigured("http auth token serializer"))?;

        // Stripping is the serializer's job too; do it here regardless.
        token.strip_secret_info();
        serializer.serialize_auth_token_to_response(token, response).await
    }

    async fn serialize_auth_token(&self, token: &mut dyn AuthToken) -> AuthResult<Vec<u8>> {
        let serializer = self
            .serializer
            .as_ref()
            .ok_or(AuthError::NotConfigured("auth token serializer"))?;

        token.strip_secret_info();
        serializer.serialize_auth_token(token).await
    }
}
