//! `warden-core`: shared contracts of the auth token lifecycle.
//!
//! This crate only defines capabilities, collaborator traits and the error
//! taxonomy. Orchestration lives in `warden-auth`; concrete identity providers
//! live in `warden-providers`.

pub mod any;
pub mod data;
pub mod error;
pub mod token;
pub mod validity;

pub use any::AsAny;
pub use data::{AuthData, AuthDataParser, Authenticator, UserData, UserDataProvider};
pub use error::{AuthError, AuthResult, BoxError, ErrorKind};
pub use token::{
    AuthToken, AuthTokenRefiller, AuthTokenSerializer, AuthTokenValidator, HasSecretInfo,
    HttpAuthTokenSerializer,
};
pub use validity::{TokenValidationError, Validity};
