//! Username/password credentials, parsed from a JSON request body.

use async_trait::async_trait;
use bytes::Bytes;
use http::Request;
use serde::{Deserialize, Serialize};

use warden_core::{AuthData, AuthDataParser, AuthError, AuthResult};

/// Username and password as submitted by a login form.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassicAuthData {
    pub username: String,
    pub password: String,
}

impl ClassicAuthData {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl core::fmt::Debug for ClassicAuthData {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ClassicAuthData")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl AuthData for ClassicAuthData {}

/// Parses [`ClassicAuthData`] from a JSON body:
/// `{"username": "...", "password": "..."}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassicAuthDataParser;

#[async_trait]
impl AuthDataParser for ClassicAuthDataParser {
    async fn parse_auth_data(&self, request: &Request<Bytes>) -> AuthResult<Box<dyn AuthData>> {
        let data: ClassicAuthData =
            serde_json::from_slice(request.body()).map_err(AuthError::malformed)?;
        Ok(Box::new(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn parses_json_body() {
        let request = Request::post("/login")
            .body(Bytes::from_static(br#"{"username":"alice","password":"s3cret"}"#))
            .unwrap();

        let data = ClassicAuthDataParser.parse_auth_data(&request).await.unwrap();
        let data = data.downcast_ref::<ClassicAuthData>().unwrap();

        assert_eq!(data, &ClassicAuthData::new("alice", "s3cret"));
        assert_eq!(data.access_token(), None);
    }

    #[tokio::test]
    async fn rejects_malformed_body() {
        let request = Request::post("/login")
            .body(Bytes::from_static(b"username=alice"))
            .unwrap();

        let err = ClassicAuthDataParser.parse_auth_data(&request).await.unwrap_err();
        assert!(matches!(err, AuthError::MalformedAuthData(_)));
    }

    #[test]
    fn debug_never_prints_password() {
        let rendered = format!("{:?}", ClassicAuthData::new("alice", "s3cret"));
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("s3cret"));
    }
}
