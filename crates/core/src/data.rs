//! Credentials, resolved user data and the collaborators that produce them.

use core::fmt::Debug;

use async_trait::async_trait;
use bytes::Bytes;
use http::Request;

use crate::any::{impl_downcast, AsAny};
use crate::error::AuthResult;
use crate::token::AuthToken;

/// Data needed to authenticate a user, for instance username and password.
///
/// Concrete credential types opt into capabilities by overriding the default
/// methods; the pipeline never inspects the concrete type itself.
pub trait AuthData: AsAny + Debug + Send + Sync {
    /// Bearer token capability, used by providers that call a remote API on
    /// behalf of the user (OAuth2 exchange results, API keys).
    fn access_token(&self) -> Option<&str> {
        None
    }

    /// Service the credential was issued by, e.g. `"google"`. Providers bound
    /// to one service decline credentials naming another.
    fn service_name(&self) -> Option<&str> {
        None
    }
}

impl_downcast!(AuthData);

/// User data fetched by exactly one [`UserDataProvider`] per authentication.
pub trait UserData: AsAny + Debug + Send + Sync {
    /// Name of the identity provider this data came from, if it records one.
    fn provider_name(&self) -> Option<&str> {
        None
    }

    /// Provider-scoped user identifier, if it records one.
    fn user_id(&self) -> Option<&str> {
        None
    }
}

impl_downcast!(UserData);

/// Parses [`AuthData`] from an incoming request.
#[async_trait]
pub trait AuthDataParser: Send + Sync {
    async fn parse_auth_data(&self, request: &Request<Bytes>) -> AuthResult<Box<dyn AuthData>>;
}

/// Fetches [`UserData`] for given [`AuthData`].
///
/// It may call some 3rd party service or query a database. Implementations
/// that do not recognise the credential shape must return
/// [`AuthError::AuthDataNotSupported`](crate::AuthError::AuthDataNotSupported)
/// without touching any shared state.
#[async_trait]
pub trait UserDataProvider: Send + Sync {
    async fn get_user_data(&self, data: &dyn AuthData) -> AuthResult<Box<dyn UserData>>;
}

/// Turns credentials plus resolved user data into an [`AuthToken`].
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(
        &self,
        data: &dyn AuthData,
        user: Box<dyn UserData>,
    ) -> AuthResult<Box<dyn AuthToken>>;
}
