//! Demo wiring: an in-memory user list, a JSON session token carried as a
//! bearer token, and optional remote identity providers.
//!
//! Passwords are compared as plain strings. Do not point this at real users.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use http::Request;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use warden_auth::{
    AuthEngine, BearerTokenCodec, ClassicAuthData, ClassicAuthDataParser, DefaultAuthEngine,
    DefaultSessionEngine, ExpiryValidator, JsonTokenCodec, OAuth2AuthData, OAuth2Token,
};
use warden_core::{
    AuthData, AuthDataParser, AuthError, AuthResult, AuthToken, AuthTokenRefiller,
    AuthTokenSerializer, Authenticator, HasSecretInfo, HttpAuthTokenSerializer, UserData,
    UserDataProvider, Validity,
};
use warden_perm::{HasPermissions, Permission};

use crate::app::AppServices;
use crate::authz::document_manager;
use crate::config::{ApiConfig, ConfigError};

pub const STATIC_PROVIDER: &str = "static";

#[derive(Clone, PartialEq, Eq)]
pub struct DemoUser {
    pub username: String,
    pub password: String,
    pub permissions: Vec<Permission>,
}

impl std::fmt::Debug for DemoUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DemoUser")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("permissions", &self.permissions)
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct StaticUsers {
    users: HashMap<String, DemoUser>,
}

impl StaticUsers {
    pub fn new(users: impl IntoIterator<Item = DemoUser>) -> Self {
        Self {
            users: users.into_iter().map(|u| (u.username.clone(), u)).collect(),
        }
    }

    pub fn get(&self, username: &str) -> Option<&DemoUser> {
        self.users.get(username)
    }
}

fn passwords_match(expected: &str, given: &str) -> bool {
    let (a, b) = (expected.as_bytes(), given.as_bytes());
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticProfile {
    pub username: String,
    pub permissions: Vec<Permission>,
}

impl UserData for StaticProfile {
    fn provider_name(&self) -> Option<&str> {
        Some(STATIC_PROVIDER)
    }

    fn user_id(&self) -> Option<&str> {
        Some(&self.username)
    }
}

/// Resolves [`ClassicAuthData`] against [`StaticUsers`].
pub struct StaticUserProvider {
    users: Arc<StaticUsers>,
}

impl StaticUserProvider {
    pub fn new(users: Arc<StaticUsers>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl UserDataProvider for StaticUserProvider {
    async fn get_user_data(&self, data: &dyn AuthData) -> AuthResult<Box<dyn UserData>> {
        let Some(credentials) = data.downcast_ref::<ClassicAuthData>() else {
            return Err(AuthError::AuthDataNotSupported);
        };

        match self.users.get(&credentials.username) {
            Some(user) if passwords_match(&user.password, &credentials.password) => {
                Ok(Box::new(StaticProfile {
                    username: user.username.clone(),
                    permissions: user.permissions.clone(),
                }))
            }
            _ => Err(AuthError::rejected("invalid username or password")),
        }
    }
}

/// Token handed out by the demo server.
///
/// Permissions are not serialized; [`StaticUserRefiller`] reloads them on
/// every request. The upstream access token is secret and stripped before
/// the token leaves the process.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionToken {
    /// Unique per login; survives refills.
    pub session_id: Uuid,
    pub user_id: String,
    pub provider: String,
    #[serde(flatten)]
    pub validity: Validity,
    #[serde(skip)]
    pub permissions: Vec<Permission>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionToken")
            .field("session_id", &self.session_id)
            .field("user_id", &self.user_id)
            .field("provider", &self.provider)
            .field("validity", &self.validity)
            .field("permissions", &self.permissions)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl HasSecretInfo for SessionToken {
    fn strip_secret_info(&mut self) {
        self.access_token = None;
    }
}

impl AuthToken for SessionToken {
    fn secret_info(&mut self) -> Option<&mut dyn HasSecretInfo> {
        Some(self)
    }

    fn validity(&self) -> Option<Validity> {
        Some(self.validity)
    }
}

impl HasPermissions for SessionToken {
    fn granted_permissions(&self) -> &[Permission] {
        &self.permissions
    }
}

/// Issues a [`SessionToken`] valid for `ttl`.
pub struct SessionAuthenticator {
    ttl: chrono::Duration,
}

impl SessionAuthenticator {
    pub fn new(ttl: chrono::Duration) -> Self {
        Self { ttl }
    }
}

#[async_trait]
impl Authenticator for SessionAuthenticator {
    async fn authenticate(
        &self,
        data: &dyn AuthData,
        user: Box<dyn UserData>,
    ) -> AuthResult<Box<dyn AuthToken>> {
        let (Some(provider), Some(user_id)) = (user.provider_name(), user.user_id()) else {
            return Err(AuthError::rejected("user data carries no identity"));
        };

        let permissions = user
            .downcast_ref::<StaticProfile>()
            .map(|profile| profile.permissions.clone())
            .unwrap_or_default();

        let validity = Validity::starting_at(Utc::now(), self.ttl)?;
        let session_id = Uuid::now_v7();
        debug!(%session_id, %provider, %user_id, "issuing session token");
        Ok(Box::new(SessionToken {
            session_id,
            user_id: user_id.to_owned(),
            provider: provider.to_owned(),
            validity,
            permissions,
            access_token: data.access_token().map(str::to_owned),
        }))
    }
}

/// Reloads the permissions of static users into restored session tokens.
pub struct StaticUserRefiller {
    users: Arc<StaticUsers>,
}

impl StaticUserRefiller {
    pub fn new(users: Arc<StaticUsers>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl AuthTokenRefiller for StaticUserRefiller {
    async fn process_auth_token(&self, token: &dyn AuthToken) -> AuthResult<Box<dyn AuthToken>> {
        let session = token
            .downcast_ref::<SessionToken>()
            .filter(|s| s.provider == STATIC_PROVIDER)
            .ok_or(AuthError::AuthDataNotSupported)?;

        let user = self
            .users
            .get(&session.user_id)
            .ok_or_else(|| AuthError::rejected("user no longer exists"))?;

        let mut refilled = session.clone();
        refilled.permissions = user.permissions.clone();
        Ok(Box::new(refilled))
    }
}

#[derive(Deserialize)]
struct AccessTokenBody {
    service: String,
    access_token: String,
}

/// Parses `{"service": "...", "access_token": "..."}`, for clients that ran
/// the OAuth2 flow themselves and only need the token resolved to a user.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessTokenParser;

#[async_trait]
impl AuthDataParser for AccessTokenParser {
    async fn parse_auth_data(&self, request: &Request<Bytes>) -> AuthResult<Box<dyn AuthData>> {
        let body: AccessTokenBody =
            serde_json::from_slice(request.body()).map_err(AuthError::malformed)?;
        if body.access_token.is_empty() {
            return Err(AuthError::malformed("empty access_token"));
        }
        let token = OAuth2Token::bearer(body.access_token);
        Ok(Box::new(OAuth2AuthData::new(body.service, token)))
    }
}

/// Engines and permission manager for the demo server.
pub fn build_services(config: &ApiConfig) -> Result<AppServices, ConfigError> {
    let users = Arc::new(StaticUsers::new(config.demo_users.iter().cloned()));
    let codec: Arc<dyn AuthTokenSerializer> = Arc::new(JsonTokenCodec::<SessionToken>::new());
    let bearer: Arc<dyn HttpAuthTokenSerializer> = Arc::new(BearerTokenCodec::new(codec));
    let authenticator: Arc<dyn Authenticator> =
        Arc::new(SessionAuthenticator::new(config.token_ttl));

    let login = DefaultAuthEngine::new(authenticator.clone())
        .with_parser(Arc::new(ClassicAuthDataParser))
        .with_provider(Arc::new(StaticUserProvider::new(users.clone())))
        .with_http_serializer(bearer.clone());

    let remote = config.providers.build(&config.providers.http_client()?)?;
    let token_login = if remote.is_empty() {
        None
    } else {
        let engine = remote.into_iter().fold(
            DefaultAuthEngine::new(authenticator)
                .with_parser(Arc::new(AccessTokenParser))
                .with_http_serializer(bearer.clone()),
            DefaultAuthEngine::with_provider,
        );
        Some(engine)
    };

    let session = DefaultSessionEngine::new()
        .with_http_deserializer(bearer)
        .with_validator(Arc::new(ExpiryValidator::new().require_validity()))
        .with_refiller(Arc::new(StaticUserRefiller::new(users)));

    Ok(AppServices {
        login: Arc::new(login),
        token_login: token_login.map(|engine| -> Arc<dyn AuthEngine> { Arc::new(engine) }),
        session: Arc::new(session),
        permissions: Arc::new(document_manager()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> Arc<StaticUsers> {
        Arc::new(StaticUsers::new([DemoUser {
            username: "alice".to_owned(),
            password: "wonderland".to_owned(),
            permissions: vec![Permission::from("document.read")],
        }]))
    }

    #[tokio::test]
    async fn static_provider_checks_password() {
        let provider = StaticUserProvider::new(users());

        let user = provider
            .get_user_data(&ClassicAuthData::new("alice", "wonderland"))
            .await
            .unwrap();
        assert_eq!(user.user_id(), Some("alice"));

        let err = provider
            .get_user_data(&ClassicAuthData::new("alice", "looking-glass"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Rejected(_)));

        let token = OAuth2AuthData::new("google", OAuth2Token::bearer("t"));
        assert!(provider.get_user_data(&token).await.unwrap_err().is_not_supported());
    }

    #[tokio::test]
    async fn authenticator_copies_identity_and_secret() {
        let authenticator = SessionAuthenticator::new(chrono::Duration::minutes(5));
        let data = OAuth2AuthData::new("google", OAuth2Token::bearer("ya29"));
        let user = Box::new(StaticProfile {
            username: "alice".to_owned(),
            permissions: vec![Permission::from("*")],
        });

        let token = authenticator.authenticate(&data, user).await.unwrap();
        let session = token.downcast_ref::<SessionToken>().unwrap();

        assert_eq!(session.user_id, "alice");
        assert_eq!(session.provider, STATIC_PROVIDER);
        assert_eq!(session.access_token.as_deref(), Some("ya29"));
        assert_eq!(session.permissions, vec![Permission::from("*")]);
    }

    #[tokio::test]
    async fn unrepresentable_ttl_fails_login_instead_of_panicking() {
        let ttl = chrono::Duration::seconds(10_000_000_000_000);
        let authenticator = SessionAuthenticator::new(ttl);
        let data = ClassicAuthData::new("alice", "wonderland");
        let user = Box::new(StaticProfile {
            username: "alice".to_owned(),
            permissions: Vec::new(),
        });

        let err = authenticator.authenticate(&data, user).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
    }

    #[tokio::test]
    async fn refiller_restores_permissions_and_declines_foreign_tokens() {
        let refiller = StaticUserRefiller::new(users());
        let stripped = SessionToken {
            session_id: Uuid::now_v7(),
            user_id: "alice".to_owned(),
            provider: STATIC_PROVIDER.to_owned(),
            validity: Validity::starting_at(Utc::now(), chrono::Duration::minutes(5))
                .unwrap(),
            permissions: Vec::new(),
            access_token: None,
        };

        let refilled = refiller.process_auth_token(&stripped).await.unwrap();
        let refilled = refilled.downcast_ref::<SessionToken>().unwrap();
        assert_eq!(refilled.permissions, vec![Permission::from("document.read")]);

        let mut remote = stripped.clone();
        remote.provider = "google".to_owned();
        assert!(refiller.process_auth_token(&remote).await.unwrap_err().is_not_supported());
    }

    #[tokio::test]
    async fn login_then_restore_round_trip() {
        let config = ApiConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            token_ttl: chrono::Duration::minutes(5),
            demo_users: vec![DemoUser {
                username: "alice".to_owned(),
                password: "wonderland".to_owned(),
                permissions: vec![Permission::from("document.read")],
            }],
            providers: Default::default(),
        };
        let services = build_services(&config).unwrap();
        assert!(services.token_login.is_none());

        let login = Request::builder()
            .method("POST")
            .body(Bytes::from_static(br#"{"username":"alice","password":"wonderland"}"#))
            .unwrap();
        let mut token = services.login.authenticate_request(&login).await.unwrap();

        let mut response = http::Response::new(Bytes::new());
        services
            .login
            .serialize_auth_token_to_response(token.as_mut(), &mut response)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        let bearer = body["access_token"].as_str().unwrap();

        let next = Request::builder()
            .header("authorization", format!("Bearer {bearer}"))
            .body(Bytes::new())
            .unwrap();
        let restored = services.session.restore_from_request(&next).await.unwrap();
        let session = restored.downcast_ref::<SessionToken>().unwrap();

        assert_eq!(session.user_id, "alice");
        assert_eq!(session.permissions, vec![Permission::from("document.read")]);
        let issued = token.downcast_ref::<SessionToken>().unwrap();
        assert_eq!(session.session_id, issued.session_id);
    }

    #[tokio::test]
    async fn access_token_parser() {
        let body = br#"{"service":"google","access_token":"ya29"}"#;
        let request = Request::new(Bytes::from_static(body));
        let data = AccessTokenParser.parse_auth_data(&request).await.unwrap();
        assert_eq!(data.access_token(), Some("ya29"));
        assert_eq!(data.service_name(), Some("google"));

        let request = Request::new(Bytes::from_static(br#"{"service":"google"}"#));
        let err = AccessTokenParser.parse_auth_data(&request).await.unwrap_err();
        assert!(matches!(err, AuthError::MalformedAuthData(_)));
    }
}
