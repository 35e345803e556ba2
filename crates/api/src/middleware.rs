use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use bytes::Bytes;

use warden_auth::SessionEngine;

use crate::app::errors::ApiError;
use crate::context::Authenticated;

#[derive(Clone)]
pub struct SessionState {
    pub engine: Arc<dyn SessionEngine>,
}

/// Restores the caller's identity through the session engine and makes it
/// available to handlers as [`Authenticated`].
pub async fn session_middleware(
    State(state): State<SessionState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let head = head_only(&req);

    let token = state
        .engine
        .restore_from_request(&head)
        .await
        .map_err(ApiError::Session)?;

    req.extensions_mut().insert(Authenticated::new(token));

    Ok(next.run(req).await)
}

/// Copy of the request line and headers with an empty body.
///
/// Session deserializers read transport headers only, so the body stays
/// untouched for the handler.
pub(crate) fn head_only<B>(req: &Request<B>) -> Request<Bytes> {
    let mut head = Request::new(Bytes::new());
    *head.method_mut() = req.method().clone();
    *head.uri_mut() = req.uri().clone();
    *head.version_mut() = req.version();
    *head.headers_mut() = req.headers().clone();
    head
}
