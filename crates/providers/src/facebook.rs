use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::debug;
use url::Url;

use warden_core::{AuthData, AuthError, AuthResult, UserData, UserDataProvider};

use crate::access_token_for;
use crate::config::{ConfigError, FacebookConfig};
use crate::http::{get_json, ProviderError};

pub const PROVIDER_NAME: &str = "facebook";

/// Flattened Graph API `/me` response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacebookUserInfo {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hometown: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birthday: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub about: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl UserData for FacebookUserInfo {
    fn provider_name(&self) -> Option<&str> {
        Some(PROVIDER_NAME)
    }

    fn user_id(&self) -> Option<&str> {
        Some(&self.id)
    }
}

/// Wire shape; `picture` and `location` are nested objects in the Graph API.
#[derive(Debug, Deserialize)]
struct GraphUser {
    id: String,
    email: Option<String>,
    link: Option<String>,
    hometown: Option<String>,
    birthday: Option<String>,
    about: Option<String>,
    name: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    picture: Option<GraphPicture>,
    location: Option<GraphLocation>,
}

#[derive(Debug, Deserialize)]
struct GraphPicture {
    data: GraphPictureData,
}

#[derive(Debug, Deserialize)]
struct GraphPictureData {
    url: String,
}

#[derive(Debug, Deserialize)]
struct GraphLocation {
    name: String,
}

impl From<GraphUser> for FacebookUserInfo {
    fn from(u: GraphUser) -> Self {
        Self {
            id: u.id,
            email: u.email,
            link: u.link,
            hometown: u.hometown,
            birthday: u.birthday,
            about: u.about,
            name: u.name,
            first_name: u.first_name,
            last_name: u.last_name,
            picture_url: u.picture.map(|p| p.data.url),
            location: u.location.map(|l| l.name),
        }
    }
}

/// `appsecret_proof` for a Graph API call: hex encoded HMAC-SHA256 of the
/// access token keyed with the app secret.
pub fn appsecret_proof(app_secret: &str, access_token: &str) -> Result<String, ProviderError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(app_secret.as_bytes()).map_err(|e| {
        ProviderError::Request {
            provider: PROVIDER_NAME,
            reason: e.to_string(),
        }
    })?;
    mac.update(access_token.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Resolves access tokens issued by Facebook (or by an unnamed service)
/// against the Graph API.
#[derive(Clone)]
pub struct FacebookProvider {
    client: reqwest::Client,
    endpoint: Url,
    app_secret: Option<String>,
    fields: String,
}

impl std::fmt::Debug for FacebookProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FacebookProvider")
            .field("endpoint", &self.endpoint.as_str())
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

impl FacebookProvider {
    pub fn new(client: reqwest::Client, config: &FacebookConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            client,
            endpoint: config.endpoint_url()?,
            app_secret: config.app_secret.clone(),
            fields: config.fields_param()?,
        })
    }

    fn request_url(&self, token: &str) -> Result<Url, ProviderError> {
        let mut url = self.endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("access_token", token);
            if let Some(secret) = &self.app_secret {
                query.append_pair("appsecret_proof", &appsecret_proof(secret, token)?);
            }
            query.append_pair("fields", &self.fields);
        }
        Ok(url)
    }
}

#[async_trait]
impl UserDataProvider for FacebookProvider {
    async fn get_user_data(&self, data: &dyn AuthData) -> AuthResult<Box<dyn UserData>> {
        let token = access_token_for(data, PROVIDER_NAME)?;

        let url = self.request_url(token).map_err(AuthError::provider_failed)?;
        let user: GraphUser = get_json(&self.client, PROVIDER_NAME, url)
            .await
            .map_err(AuthError::provider_failed)?;

        debug!(provider = PROVIDER_NAME, user_id = %user.id, "fetched user info");
        Ok(Box::new(FacebookUserInfo::from(user)))
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path, query_param};
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

    fn provider(
        server: &MockServer,
        app_secret: Option<&str>,
        fields: &[&str],
    ) -> FacebookProvider {
        let config = FacebookConfig {
            endpoint: format!("{}/me", server.uri()),
            app_secret: app_secret.map(str::to_owned),
            fields: fields.iter().map(|f| (*f).to_owned()).collect(),
        };
        FacebookProvider::new(reqwest::Client::new(), &config).unwrap()
    }

    #[test]
    fn appsecret_proof_is_hmac_sha256_hex() {
        let proof = appsecret_proof("key", "The quick brown fox jumps over the lazy dog").unwrap();
        assert_eq!(proof, "f7bc83f430538424b13298e6aa6fb143ef4d59a14946175997479dbc2d1a3cd8");
    }

    #[tokio::test]
    async fn flattens_graph_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me"))
            .and(query_param("access_token", "EAAB"))
            .and(query_param("fields", "id,email"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "1001",
                "email": "grace@example.com",
                "picture": { "data": { "url": "https://example.com/grace.jpg" } },
                "location": { "id": "7", "name": "Arlington" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let user = provider(&server, None, &[])
            .get_user_data(&Token("EAAB"))
            .await
            .unwrap();

        assert_eq!(user.provider_name(), Some("facebook"));
        assert_eq!(user.user_id(), Some("1001"));
        let info = user.downcast_ref::<FacebookUserInfo>().unwrap();
        assert_eq!(info.picture_url.as_deref(), Some("https://example.com/grace.jpg"));
        assert_eq!(info.location.as_deref(), Some("Arlington"));
    }

    #[tokio::test]
    async fn sends_appsecret_proof_and_custom_fields() {
        let server = MockServer::start().await;
        let proof = appsecret_proof("app-secret", "EAAB").unwrap();
        Mock::given(method("GET"))
            .and(path("/me"))
            .and(query_param("appsecret_proof", proof.as_str()))
            .and(query_param("fields", "id,name"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "1001",
                "name": "Grace"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let user = provider(&server, Some("app-secret"), &["id", "name"])
            .get_user_data(&Token("EAAB"))
            .await
            .unwrap();
        let info = user.downcast_ref::<FacebookUserInfo>().unwrap();
        assert_eq!(info.name.as_deref(), Some("Grace"));
        assert_eq!(info.email, None);
    }

    #[tokio::test]
    async fn declines_credentials_without_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = provider(&server, None, &[])
            .get_user_data(&Password)
            .await
            .unwrap_err();
        assert!(err.is_not_supported());
    }

    #[tokio::test]
    async fn server_error_is_provider_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = provider(&server, None, &[])
            .get_user_data(&Token("EAAB"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProviderFailed);
    }

    #[tokio::test]
    async fn oversized_body_is_provider_failure() {
        let server = MockServer::start().await;
        let padding = "x".repeat(crate::http::MAX_RESPONSE_BYTES);
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "1001",
                "about": padding
            })))
            .mount(&server)
            .await;

        let err = provider(&server, None, &[])
            .get_user_data(&Token("EAAB"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProviderFailed);
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
            service: "google",
            token: "issued-elsewhere",
        };
        let err = provider(&server, None, &[]).get_user_data(&foreign).await.unwrap_err();
        assert!(err.is_not_supported());
    }

    #[test]
    fn construction_requires_id_field() {
        let config = FacebookConfig {
            fields: vec!["email".to_owned()],
            ..FacebookConfig::default()
        };
        let err = FacebookProvider::new(reqwest::Client::new(), &config).unwrap_err();
        assert!(matches!(err, ConfigError::FieldsWithoutId));
    }
}
