//! Identity providers backed by remote user-info APIs.
//!
//! Providers never build their own HTTP client: the caller injects a
//! `reqwest::Client` (usually from [`ProvidersConfig::http_client`]) so that
//! timeouts, proxies and test servers are controlled in one place.

use std::sync::Arc;

use warden_core::{AuthData, AuthError, AuthResult, UserDataProvider};

pub mod config;
pub mod facebook;
pub mod google;
pub mod http;

pub use config::{ConfigError, FacebookConfig, GoogleConfig, ProvidersConfig};
pub use facebook::{appsecret_proof, FacebookProvider, FacebookUserInfo};
pub use google::{GoogleProvider, GoogleUserInfo};
pub use http::ProviderError;

/// Access token to send to `provider`, or a decline.
///
/// Credentials issued by another service are declined before anything leaves
/// the process; credentials that name no service are accepted.
pub(crate) fn access_token_for<'a>(data: &'a dyn AuthData, provider: &str) -> AuthResult<&'a str> {
    if data.service_name().is_some_and(|service| service != provider) {
        return Err(AuthError::AuthDataNotSupported);
    }
    data.access_token().ok_or(AuthError::AuthDataNotSupported)
}

impl ProvidersConfig {
    /// Every enabled provider, in a stable order (Google first), sharing `client`.
    pub fn build(
        &self,
        client: &reqwest::Client,
    ) -> Result<Vec<Arc<dyn UserDataProvider>>, ConfigError> {
        let mut providers: Vec<Arc<dyn UserDataProvider>> = Vec::new();
        if let Some(google) = &self.google {
            providers.push(Arc::new(GoogleProvider::new(client.clone(), google)?));
        }
        if let Some(facebook) = &self.facebook {
            providers.push(Arc::new(FacebookProvider::new(client.clone(), facebook)?));
        }
        Ok(providers)
    }
}
