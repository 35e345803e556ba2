//! Auth token contracts: capabilities, serialization, validation and refill.

use core::fmt::Debug;

use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response};

use crate::any::{impl_downcast, AsAny};
use crate::error::AuthResult;
use crate::validity::Validity;

/// Result of authentication.
///
/// It should carry information about the authenticated user, possibly the whole
/// user entity. Capabilities are optional and declared by overriding the
/// default methods.
pub trait AuthToken: AsAny + Debug + Send + Sync {
    /// Secret-stripping capability. Engines call it before any outbound
    /// serialization.
    fn secret_info(&mut self) -> Option<&mut dyn HasSecretInfo> {
        None
    }

    /// Time window capability, consumed by expiry validators.
    fn validity(&self) -> Option<Validity> {
        None
    }
}

impl_downcast!(AuthToken);

impl dyn AuthToken {
    /// Strip secret info if the token has any. Returns whether stripping ran.
    pub fn strip_secret_info(&mut self) -> bool {
        match self.secret_info() {
            Some(secret) => {
                secret.strip_secret_info();
                true
            }
            None => false,
        }
    }
}

/// Something holding secret info which can be removed before it leaves the
/// process.
pub trait HasSecretInfo {
    /// Removes secret info in place.
    fn strip_secret_info(&mut self);
}

/// Validates auth tokens, for instance their expiration.
///
/// Called twice per restore: once on the token as deserialized and once after
/// the refiller chain ran.
#[async_trait]
pub trait AuthTokenValidator: Send + Sync {
    async fn validate_pre_refill(&self, token: &dyn AuthToken) -> AuthResult<()>;
    async fn validate_after_refill(&self, token: &dyn AuthToken) -> AuthResult<()>;
}

/// Serializes whatever auth token types the application uses to bytes.
///
/// The serializer is responsible for token authenticity and integrity. It is
/// also responsible for stripping secret info before emitting, unless the
/// serialized form is encrypted rather than only signed.
#[async_trait]
pub trait AuthTokenSerializer: Send + Sync {
    async fn serialize_auth_token(&self, token: &mut dyn AuthToken) -> AuthResult<Vec<u8>>;

    /// Returns a new token rather than filling one in, so that several token
    /// types can share one serializer.
    async fn deserialize_auth_token(&self, data: &[u8]) -> AuthResult<Box<dyn AuthToken>>;
}

/// Writes auth tokens to HTTP responses and reads them back from requests.
///
/// Same authenticity and stripping responsibilities as [`AuthTokenSerializer`].
#[async_trait]
pub trait HttpAuthTokenSerializer: Send + Sync {
    async fn serialize_auth_token_to_response(
        &self,
        token: &mut dyn AuthToken,
        response: &mut Response<Bytes>,
    ) -> AuthResult<()>;

    async fn deserialize_auth_token_from_request(
        &self,
        request: &Request<Bytes>,
    ) -> AuthResult<Box<dyn AuthToken>>;
}

/// Reverses the transformation applied by [`HasSecretInfo::strip_secret_info`].
///
/// Returns a new token: either the same type repopulated or an entirely
/// different one. Refillers that do not handle the given token return
/// [`AuthError::AuthDataNotSupported`](crate::AuthError::AuthDataNotSupported).
#[async_trait]
pub trait AuthTokenRefiller: Send + Sync {
    async fn process_auth_token(&self, token: &dyn AuthToken) -> AuthResult<Box<dyn AuthToken>>;
}
