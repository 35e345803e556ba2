use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use bytes::Bytes;
use serde_json::json;
use tower::ServiceBuilder;

use warden_auth::{AuthEngine, SessionEngine};
use warden_perm::Manager;

use crate::authz::{authorize, Document, READ_DOCUMENT};
use crate::context::Authenticated;
use crate::middleware::{session_middleware, SessionState};

pub mod demo;
pub mod errors;

use demo::SessionToken;
use errors::ApiError;

/// Login bodies are tiny; anything bigger is rejected before parsing.
const MAX_LOGIN_BODY: usize = 16 * 1024;

#[derive(Clone)]
pub struct AppServices {
    /// Username/password login.
    pub login: Arc<dyn AuthEngine>,
    /// Access-token login against remote providers, when any are configured.
    pub token_login: Option<Arc<dyn AuthEngine>>,
    pub session: Arc<dyn SessionEngine>,
    pub permissions: Arc<dyn Manager<SessionToken, Document>>,
}

pub fn build_app(services: AppServices) -> Router {
    let session_state = SessionState {
        engine: services.session.clone(),
    };

    // Protected routes: require a restorable session. Unmatched paths fall
    // through to the 404 fallback without touching the session engine.
    let protected = Router::new()
        .route("/whoami", get(whoami))
        .route("/documents/:owner/:name", get(read_document))
        .route_layer(axum::middleware::from_fn_with_state(session_state, session_middleware));

    let mut public = Router::new()
        .route("/health", get(health))
        .route("/login", post(login));
    if services.token_login.is_some() {
        public = public.route("/login/token", post(token_login));
    }

    public
        .merge(protected)
        .with_state(services)
        .layer(ServiceBuilder::new())
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn login(
    State(services): State<AppServices>,
    req: Request<Body>,
) -> Result<Response, ApiError> {
    run_login(services.login.as_ref(), req).await
}

async fn token_login(
    State(services): State<AppServices>,
    req: Request<Body>,
) -> Result<Response, ApiError> {
    let engine = services
        .token_login
        .ok_or_else(|| ApiError::Internal("token login is not configured".to_owned()))?;
    run_login(engine.as_ref(), req).await
}

/// Authenticate the request and answer with the serialized token.
async fn run_login(engine: &dyn AuthEngine, req: Request<Body>) -> Result<Response, ApiError> {
    let (parts, body) = req.into_parts();
    let body = axum::body::to_bytes(body, MAX_LOGIN_BODY)
        .await
        .map_err(|e| ApiError::BadRequest(format!("unreadable body: {e}")))?;
    let request = Request::from_parts(parts, body);

    let mut token = engine
        .authenticate_request(&request)
        .await
        .map_err(ApiError::Login)?;

    let mut response = http::Response::new(Bytes::new());
    engine
        .serialize_auth_token_to_response(token.as_mut(), &mut response)
        .await
        .map_err(ApiError::Login)?;

    Ok(response.map(Body::from))
}

fn session_token(identity: &Authenticated) -> Result<&SessionToken, ApiError> {
    identity
        .downcast_ref::<SessionToken>()
        .ok_or_else(|| ApiError::Internal("unexpected auth token type".to_owned()))
}

async fn whoami(identity: Authenticated) -> Result<impl IntoResponse, ApiError> {
    let session = session_token(&identity)?;
    Ok(Json(json!({
        "session_id": session.session_id,
        "user_id": session.user_id,
        "provider": session.provider,
        "permissions": session.permissions,
        "expires_at": session.validity.expires_at,
    })))
}

async fn read_document(
    State(services): State<AppServices>,
    Path((owner, name)): Path<(String, String)>,
    identity: Authenticated,
) -> Result<impl IntoResponse, ApiError> {
    let session = session_token(&identity)?;
    let document = Document { owner, name };

    let result = authorize(
        services.permissions.as_ref(),
        session,
        READ_DOCUMENT,
        document.clone(),
    )
    .await?;

    Ok(Json(json!({
        "document": document,
        "voter_results": result.voter_results(),
    })))
}
