//! Token codecs: JSON bytes and `Authorization: Bearer` transport.
//!
//! Neither codec signs or encrypts anything. Wrap [`JsonTokenCodec`] in a
//! serializer that does before exposing tokens to untrusted clients.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use bytes::Bytes;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, Request, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use warden_core::{
    AuthError, AuthResult, AuthToken, AuthTokenSerializer, HttpAuthTokenSerializer,
};

/// Serializes one concrete token type `T` as JSON.
///
/// Secret info is stripped before encoding. Tokens of any other type are
/// refused with a serialization error.
pub struct JsonTokenCodec<T> {
    _token: PhantomData<fn() -> T>,
}

impl<T> JsonTokenCodec<T> {
    pub fn new() -> Self {
        Self {
            _token: PhantomData,
        }
    }
}

impl<T> Default for JsonTokenCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for JsonTokenCodec<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T> AuthTokenSerializer for JsonTokenCodec<T>
where
    T: AuthToken + Serialize + DeserializeOwned,
{
    async fn serialize_auth_token(&self, token: &mut dyn AuthToken) -> AuthResult<Vec<u8>> {
        token.strip_secret_info();
        let token = token.downcast_ref::<T>().ok_or_else(|| {
            AuthError::serialization(format!(
                "unsupported auth token type, expected {}",
                std::any::type_name::<T>()
            ))
        })?;
        serde_json::to_vec(token).map_err(AuthError::serialization)
    }

    async fn deserialize_auth_token(&self, data: &[u8]) -> AuthResult<Box<dyn AuthToken>> {
        let token: T = serde_json::from_slice(data).map_err(AuthError::serialization)?;
        Ok(Box::new(token))
    }
}

/// Carries a byte-serialized token as a base64url bearer token.
///
/// Responses get a JSON body `{"access_token": "...", "token_type": "Bearer"}`;
/// requests are read from the `Authorization: Bearer ...` header.
#[derive(Clone)]
pub struct BearerTokenCodec {
    inner: Arc<dyn AuthTokenSerializer>,
}

impl BearerTokenCodec {
    pub fn new(inner: Arc<dyn AuthTokenSerializer>) -> Self {
        Self { inner }
    }

    /// Encode an already serialized token for the `Authorization` header.
    pub fn encode(data: &[u8]) -> String {
        URL_SAFE_NO_PAD.encode(data)
    }
}

#[derive(Serialize)]
struct BearerBody<'a> {
    access_token: &'a str,
    token_type: &'static str,
}

#[async_trait]
impl HttpAuthTokenSerializer for BearerTokenCodec {
    async fn serialize_auth_token_to_response(
        &self,
        token: &mut dyn AuthToken,
        response: &mut Response<Bytes>,
    ) -> AuthResult<()> {
        let data = self.inner.serialize_auth_token(token).await?;
        let encoded = Self::encode(&data);
        let body = serde_json::to_vec(&BearerBody {
            access_token: &encoded,
            token_type: "Bearer",
        })
        .map_err(AuthError::serialization)?;

        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        *response.body_mut() = Bytes::from(body);
        Ok(())
    }

    async fn deserialize_auth_token_from_request(
        &self,
        request: &Request<Bytes>,
    ) -> AuthResult<Box<dyn AuthToken>> {
        let encoded = extract_bearer(request.headers())?;
        let data = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(AuthError::serialization)?;
        self.inner.deserialize_auth_token(&data).await
    }
}

/// Pull the token out of an `Authorization: Bearer <token>` header.
pub fn extract_bearer(headers: &HeaderMap) -> AuthResult<&str> {
    let header = headers.get(AUTHORIZATION).ok_or(AuthError::MissingToken)?;

    let header = header
        .to_str()
        .map_err(|_| AuthError::malformed("authorization header is not valid ascii"))?;

    let header = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AuthError::malformed("authorization scheme is not Bearer"))?;

    let token = header.trim();
    if token.is_empty() {
        return Err(AuthError::MissingToken);
    }

    Ok(token)
}
