//! Continuation path: wire → validated, refilled auth token.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::Request;
use tracing::{debug, trace};

use warden_core::{
    AuthError, AuthResult, AuthToken, AuthTokenRefiller, AuthTokenSerializer, AuthTokenValidator,
    HttpAuthTokenSerializer,
};

/// Restores the auth token carried by an already-authenticated request.
#[async_trait]
pub trait SessionEngine: Send + Sync {
    async fn restore_from_request(
        &self,
        request: &Request<Bytes>,
    ) -> AuthResult<Box<dyn AuthToken>>;

    async fn restore_from_bytes(&self, data: &[u8]) -> AuthResult<Box<dyn AuthToken>>;
}

/// Whether after-refill validation runs when a refiller produced the token.
///
/// Historically a successful refill returns straight away and the after-refill
/// validation only runs when no refiller fired. That remains the default;
/// `Always` validates both paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AfterRefillPolicy {
    #[default]
    SkipWhenRefilled,
    Always,
}

/// [`SessionEngine`] assembled from pluggable collaborators.
#[derive(Clone, Default)]
pub struct DefaultSessionEngine {
    deserializer: Option<Arc<dyn AuthTokenSerializer>>,
    http_deserializer: Option<Arc<dyn HttpAuthTokenSerializer>>,
    validator: Option<Arc<dyn AuthTokenValidator>>,
    refillers: Vec<Arc<dyn AuthTokenRefiller>>,
    after_refill: AfterRefillPolicy,
}

impl DefaultSessionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deserializer(mut self, deserializer: Arc<dyn AuthTokenSerializer>) -> Self {
        self.deserializer = Some(deserializer);
        self
    }

    pub fn with_http_deserializer(
        mut self,
        deserializer: Arc<dyn HttpAuthTokenSerializer>,
    ) -> Self {
        self.http_deserializer = Some(deserializer);
        self
    }

    /// Use [`AuthTokenValidators`](crate::AuthTokenValidators) to combine several.
    pub fn with_validator(mut self, validator: Arc<dyn AuthTokenValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Append a refiller. Refillers are tried in the order they were added.
    pub fn with_refiller(mut self, refiller: Arc<dyn AuthTokenRefiller>) -> Self {
        self.refillers.push(refiller);
        self
    }

    pub fn with_after_refill_policy(mut self, policy: AfterRefillPolicy) -> Self {
        self.after_refill = policy;
        self
    }

    pub fn after_refill_policy(&self) -> AfterRefillPolicy {
        self.after_refill
    }

    async fn restore(&self, token: Box<dyn AuthToken>) -> AuthResult<Box<dyn AuthToken>> {
        if let Some(validator) = &self.validator {
            validator.validate_pre_refill(token.as_ref()).await?;
        }

        let mut token = token;
        let mut refilled = false;
        for (index, refiller) in self.refillers.iter().enumerate() {
            let outcome = refiller.process_auth_token(token.as_ref()).await;
            match outcome {
                Ok(new_token) => {
                    debug!(refiller = index, "auth token refilled");
                    token = new_token;
                    refilled = true;
                    break;
                }
                Err(e) if e.is_not_supported() => {
                    trace!(refiller = index, "refiller declined auth token");
                }
                Err(e) => return Err(e),
            }
        }

        if refilled && self.after_refill == AfterRefillPolicy::SkipWhenRefilled {
            return Ok(token);
        }

        if let Some(validator) = &self.validator {
            validator.validate_after_refill(token.as_ref()).await?;
        }

        Ok(token)
    }
}

#[async_trait]
impl SessionEngine for DefaultSessionEngine {
    async fn restore_from_request(
        &self,
        request: &Request<Bytes>,
    ) -> AuthResult<Box<dyn AuthToken>> {
        let deserializer = self
            .http_deserializer
            .as_ref()
            .ok_or(AuthError::NotConfigured("http auth token deserializer"))?;

        let token = deserializer.deserialize_auth_token_from_request(request).await?;
        self.restore(token).await
    }

    async fn restore_from_bytes(&self, data: &[u8]) -> AuthResult<Box<dyn AuthToken>> {
        let deserializer = self
            .deserializer
            .as_ref()
            .ok_or(AuthError::NotConfigured("auth token deserializer"))?;

        let token = deserializer.deserialize_auth_token(data).await?;
        self.restore(token).await
    }
}
