use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use warden_core::AuthToken;

use crate::app::errors::ApiError;

/// Identity restored by the session middleware for the current request.
///
/// Handlers take it as an extractor; it is only present on routes behind
/// [`session_middleware`](crate::middleware::session_middleware).
#[derive(Debug, Clone)]
pub struct Authenticated(Arc<dyn AuthToken>);

impl Authenticated {
    pub fn new(token: Box<dyn AuthToken>) -> Self {
        Self(Arc::from(token))
    }

    pub fn token(&self) -> &dyn AuthToken {
        &*self.0
    }

    pub fn downcast_ref<T: AuthToken>(&self) -> Option<&T> {
        self.token().downcast_ref::<T>()
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Authenticated>()
            .cloned()
            .ok_or_else(|| {
                ApiError::Internal(
                    "identity not found - session middleware not configured".to_owned(),
                )
            })
    }
}
