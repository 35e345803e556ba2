//! Error taxonomy shared by every stage of the pipeline.
//!
//! Collaborators report failures through [`AuthError`]. The engines only ever
//! *interpret* one variant, [`AuthError::AuthDataNotSupported`], which tells a
//! list iteration to move on to the next collaborator. Everything else halts the
//! call and is returned to the caller as-is.

use thiserror::Error;

use crate::validity::TokenValidationError;

/// Boxed cause carried by wrapping variants.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type used across the auth pipeline.
pub type AuthResult<T> = Result<T, AuthError>;

/// Coarse classification of an [`AuthError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A provider or refiller declined the input shape; try the next one.
    UnsupportedInput,
    /// No collaborator in a list produced a result.
    Exhaustion,
    /// A parser, authenticator, serializer, validator or state store failed.
    Collaborator,
    /// A remote identity provider failed (transport, status, payload).
    ProviderFailed,
    /// OAuth2 round-trip state did not match the stored value.
    StateMismatch,
    /// An engine entry point was called without its collaborator.
    Configuration,
}

/// Error returned by every collaborator and engine in the pipeline.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("given type of auth data is not supported")]
    AuthDataNotSupported,

    #[error("no user data can be supplied for given auth data, no provider matched")]
    NoUserData,

    #[error("malformed auth data: {0}")]
    MalformedAuthData(#[source] BoxError),

    #[error("auth token serialization failed: {0}")]
    Serialization(#[source] BoxError),

    #[error("no auth token present in request")]
    MissingToken,

    #[error("invalid auth token: {0}")]
    InvalidToken(#[from] TokenValidationError),

    /// Validator rejection that is not a time-window problem.
    #[error("auth token rejected: {0}")]
    Rejected(String),

    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("provider failed to get user's detail info: {0}")]
    ProviderFailed(#[source] BoxError),

    #[error("oauth2 state mismatch")]
    OAuth2StateMismatch,

    #[error("oauth2 state manager error: {0}")]
    OAuth2StateManager(#[source] BoxError),

    #[error("oauth2 token exchange error: {0}")]
    OAuth2TokenExchange(#[source] BoxError),

    #[error(transparent)]
    Other(BoxError),
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AuthDataNotSupported => ErrorKind::UnsupportedInput,
            Self::NoUserData => ErrorKind::Exhaustion,
            Self::ProviderFailed(_) => ErrorKind::ProviderFailed,
            Self::OAuth2StateMismatch => ErrorKind::StateMismatch,
            Self::NotConfigured(_) => ErrorKind::Configuration,
            Self::MalformedAuthData(_)
            | Self::Serialization(_)
            | Self::MissingToken
            | Self::InvalidToken(_)
            | Self::Rejected(_)
            | Self::OAuth2StateManager(_)
            | Self::OAuth2TokenExchange(_)
            | Self::Other(_) => ErrorKind::Collaborator,
        }
    }

    pub fn is_kind(&self, kind: ErrorKind) -> bool {
        self.kind() == kind
    }

    /// True when a collaborator declined the input and iteration should continue.
    pub fn is_not_supported(&self) -> bool {
        matches!(self, Self::AuthDataNotSupported)
    }

    pub fn malformed(err: impl Into<BoxError>) -> Self {
        Self::MalformedAuthData(err.into())
    }

    pub fn serialization(err: impl Into<BoxError>) -> Self {
        Self::Serialization(err.into())
    }

    pub fn provider_failed(err: impl Into<BoxError>) -> Self {
        Self::ProviderFailed(err.into())
    }

    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }

    pub fn other(err: impl Into<BoxError>) -> Self {
        Self::Other(err.into())
    }
}
