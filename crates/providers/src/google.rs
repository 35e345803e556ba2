use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use warden_core::{AuthData, AuthError, AuthResult, UserData, UserDataProvider};

use crate::access_token_for;
use crate::config::{ConfigError, GoogleConfig};
use crate::http::get_json;

pub const PROVIDER_NAME: &str = "google";

/// User information returned by Google's OAuth2 `userinfo` endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoogleUserInfo {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, rename = "picture", skip_serializing_if = "Option::is_none")]
    pub picture_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
}

impl UserData for GoogleUserInfo {
    fn provider_name(&self) -> Option<&str> {
        Some(PROVIDER_NAME)
    }

    fn user_id(&self) -> Option<&str> {
        Some(&self.id)
    }
}

/// Resolves access tokens issued by Google (or by an unnamed service).
#[derive(Debug, Clone)]
pub struct GoogleProvider {
    client: reqwest::Client,
    endpoint: Url,
}

impl GoogleProvider {
    pub fn new(client: reqwest::Client, config: &GoogleConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            client,
            endpoint: config.endpoint_url()?,
        })
    }
}

#[async_trait]
impl UserDataProvider for GoogleProvider {
    async fn get_user_data(&self, data: &dyn AuthData) -> AuthResult<Box<dyn UserData>> {
        let token = access_token_for(data, PROVIDER_NAME)?;

        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("access_token", token);

        let info: GoogleUserInfo = get_json(&self.client, PROVIDER_NAME, url)
            .await
            .map_err(AuthError::provider_failed)?;

        debug!(provider = PROVIDER_NAME, user_id = %info.id, "fetched user info");
        Ok(Box::new(info))
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use warden_core::ErrorKind;

    #[derive(Debug)]
    struct Token(&'static str);

    impl AuthData for Token {
        fn access_token(&self) -> Option<&str> {
            Some(self.0)
        }
    }

    #[derive(Debug)]
    struct Issued {
        service: &'static str,
        token: &'static str,
    }

    impl AuthData for Issued {
        fn access_token(&self) -> Option<&str> {
            Some(self.token)
        }

        fn service_name(&self) -> Option<&str> {
            Some(self.service)
        }
    }

    #[derive(Debug)]
    struct Password;

    impl AuthData for Password {}

    async fn provider(server: &MockServer) -> GoogleProvider {
        let config = GoogleConfig {
            userinfo_endpoint: format!("{}/oauth2/v2/userinfo", server.uri()),
        };
        GoogleProvider::new(reqwest::Client::new(), &config).unwrap()
    }

    #[tokio::test]
    async fn fetches_user_info() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/oauth2/v2/userinfo"))
            .and(query_param("access_token", "ya29.token"))
            .and(header("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "42",
                "email": "ada@example.com",
                "picture": "https://example.com/ada.png",
                "verified_email": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let user = provider(&server)
            .await
            .get_user_data(&Token("ya29.token"))
            .await
            .unwrap();

        assert_eq!(user.provider_name(), Some("google"));
        assert_eq!(user.user_id(), Some("42"));
        let info = user.downcast_ref::<GoogleUserInfo>().unwrap();
        assert_eq!(info.email.as_deref(), Some("ada@example.com"));
        assert_eq!(info.picture_url.as_deref(), Some("https://example.com/ada.png"));
    }

    #[tokio::test]
    async fn declines_credentials_without_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = provider(&server).await.get_user_data(&Password).await.unwrap_err();
        assert!(err.is_not_supported());
    }

    #[tokio::test]
    async fn non_200_is_provider_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid token"))
            .mount(&server)
            .await;

        let err = provider(&server)
            .await
            .get_user_data(&Token("expired"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProviderFailed);
    }

    #[tokio::test]
    async fn garbage_body_is_provider_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = provider(&server)
            .await
            .get_user_data(&Token("t"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProviderFailed);
        assert!(std::error::Error::source(&err).is_some());
    }

    #[tokio::test]
    async fn declines_tokens_issued_by_another_service() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let foreign = Issued {
            service: "facebook",
            token: "issued-elsewhere",
        };
        let err = provider(&server).await.get_user_data(&foreign).await.unwrap_err();
        assert!(err.is_not_supported());
    }

    #[tokio::test]
    async fn accepts_tokens_naming_google() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("access_token", "ya29.named"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "7" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let named = Issued {
            service: "google",
            token: "ya29.named",
        };
        let user = provider(&server).await.get_user_data(&named).await.unwrap();
        assert_eq!(user.user_id(), Some("7"));
    }
}
