//! `warden-auth`: the auth token lifecycle pipeline.
//!
//! [`DefaultAuthEngine`] runs once, at login: it parses credentials, resolves
//! user data through an ordered list of providers and asks the authenticator
//! for a token. [`DefaultSessionEngine`] runs on every later request: it
//! deserializes the token, validates it, refills stripped fields and
//! validates again.
//!
//! This crate is transport-agnostic: requests and responses are plain
//! `http::Request<Bytes>` / `http::Response<Bytes>` values.

pub mod classic;
pub mod codec;
pub mod engine;
pub mod oauth2;
pub mod session;
pub mod validate;

pub use classic::{ClassicAuthData, ClassicAuthDataParser};
pub use codec::{extract_bearer, BearerTokenCodec, JsonTokenCodec};
pub use engine::{AuthEngine, DefaultAuthEngine};
pub use oauth2::{
    verify_state, CodeExchanger, OAuth2AuthData, OAuth2CallbackParser, OAuth2StateStore,
    OAuth2Token,
};
pub use session::{AfterRefillPolicy, DefaultSessionEngine, SessionEngine};
pub use validate::{AuthTokenValidators, ExpiryValidator, ValidationStage};

pub use warden_core::*;
