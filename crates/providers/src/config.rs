//! Provider configuration.
//!
//! Values come either from a deserialized config file or from `WARDEN_*`
//! environment variables via [`ProvidersConfig::from_env`].

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;
use url::Url;

pub const DEFAULT_GOOGLE_USERINFO_ENDPOINT: &str =
    "https://www.googleapis.com/oauth2/v2/userinfo";
pub const DEFAULT_FACEBOOK_ENDPOINT: &str = "https://graph.facebook.com/me";
pub const DEFAULT_FACEBOOK_FIELDS: &[&str] = &["id", "email"];
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidValue { var: &'static str, reason: String },

    #[error("unknown identity provider '{0}'")]
    UnknownProvider(String),

    #[error("invalid endpoint url '{url}': {source}")]
    InvalidEndpoint {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("facebook field list must contain 'id'")]
    FieldsWithoutId,

    #[error("failed to build http client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GoogleConfig {
    #[serde(default = "default_google_endpoint")]
    pub userinfo_endpoint: String,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            userinfo_endpoint: default_google_endpoint(),
        }
    }
}

impl GoogleConfig {
    pub fn endpoint_url(&self) -> Result<Url, ConfigError> {
        parse_endpoint(&self.userinfo_endpoint)
    }
}

#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct FacebookConfig {
    #[serde(default = "default_facebook_endpoint")]
    pub endpoint: String,

    /// Used to compute `appsecret_proof` on every Graph API call.
    #[serde(default)]
    pub app_secret: Option<String>,

    /// Requested fields. Must contain `id`; empty means `id,email`.
    #[serde(default)]
    pub fields: Vec<String>,
}

impl Default for FacebookConfig {
    fn default() -> Self {
        Self {
            endpoint: default_facebook_endpoint(),
            app_secret: None,
            fields: Vec::new(),
        }
    }
}

impl std::fmt::Debug for FacebookConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FacebookConfig")
            .field("endpoint", &self.endpoint)
            .field("app_secret", &self.app_secret.as_ref().map(|_| "<redacted>"))
            .field("fields", &self.fields)
            .finish()
    }
}

impl FacebookConfig {
    pub fn endpoint_url(&self) -> Result<Url, ConfigError> {
        parse_endpoint(&self.endpoint)
    }

    /// Comma separated field list sent to the Graph API.
    ///
    /// The user id is read from `id`, so a list without it is refused.
    pub fn fields_param(&self) -> Result<String, ConfigError> {
        if self.fields.is_empty() {
            return Ok(DEFAULT_FACEBOOK_FIELDS.join(","));
        }
        if !self.fields.iter().any(|f| f == "id") {
            return Err(ConfigError::FieldsWithoutId);
        }
        Ok(self.fields.join(","))
    }
}

/// Which providers are enabled, and how to talk to them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub google: Option<GoogleConfig>,
    #[serde(default)]
    pub facebook: Option<FacebookConfig>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            google: None,
            facebook: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ProvidersConfig {
    /// Reads:
    ///
    /// - `WARDEN_PROVIDERS`: comma separated list of `google`, `facebook`
    /// - `WARDEN_GOOGLE_USERINFO_URL`
    /// - `WARDEN_FACEBOOK_URL`, `WARDEN_FACEBOOK_APP_SECRET`, `WARDEN_FACEBOOK_FIELDS`
    /// - `WARDEN_PROVIDER_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = lookup("WARDEN_PROVIDER_TIMEOUT_SECS") {
            config.timeout_secs = raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
                var: "WARDEN_PROVIDER_TIMEOUT_SECS",
                reason: format!("{e}"),
            })?;
        }

        let enabled = lookup("WARDEN_PROVIDERS").unwrap_or_default();
        for name in split_list(&enabled) {
            match name.to_ascii_lowercase().as_str() {
                "google" => {
                    let mut google = GoogleConfig::default();
                    if let Some(url) = lookup("WARDEN_GOOGLE_USERINFO_URL") {
                        google.userinfo_endpoint = url;
                    }
                    google.endpoint_url()?;
                    config.google = Some(google);
                }
                "facebook" => {
                    let mut facebook = FacebookConfig::default();
                    if let Some(url) = lookup("WARDEN_FACEBOOK_URL") {
                        facebook.endpoint = url;
                    }
                    facebook.app_secret =
                        lookup("WARDEN_FACEBOOK_APP_SECRET").filter(|s| !s.is_empty());
                    if facebook.app_secret.is_none() {
                        warn!(
                            "WARDEN_FACEBOOK_APP_SECRET not set; \
                             graph api calls will not carry appsecret_proof"
                        );
                    }
                    if let Some(fields) = lookup("WARDEN_FACEBOOK_FIELDS") {
                        facebook.fields = split_list(&fields).map(str::to_owned).collect();
                    }
                    if let Err(e) = facebook.fields_param() {
                        return Err(ConfigError::InvalidValue {
                            var: "WARDEN_FACEBOOK_FIELDS",
                            reason: e.to_string(),
                        });
                    }
                    facebook.endpoint_url()?;
                    config.facebook = Some(facebook);
                }
                other => return Err(ConfigError::UnknownProvider(other.to_owned())),
            }
        }

        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Client shared by every provider built from this config.
    pub fn http_client(&self) -> Result<reqwest::Client, ConfigError> {
        Ok(reqwest::Client::builder()
            .timeout(self.timeout())
            .connect_timeout(Duration::from_secs(2))
            .build()?)
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn parse_endpoint(raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|source| ConfigError::InvalidEndpoint {
        url: raw.to_owned(),
        source,
    })
}

fn default_google_endpoint() -> String {
    DEFAULT_GOOGLE_USERINFO_ENDPOINT.to_owned()
}

fn default_facebook_endpoint() -> String {
    DEFAULT_FACEBOOK_ENDPOINT.to_owned()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
