//! `warden-perm`: permission voting.
//!
//! A [`DefaultManager`] asks every configured [`Voter`] whether a user may
//! perform a [`Permission`] on a subject. Any `Deny` wins; otherwise one
//! `Agree` is required. Every consulted voter's answer is kept in the
//! [`CheckResult`] for auditing.
//!
//! This crate is independent of the token lifecycle in `warden-auth`.

pub mod check;
pub mod error;
pub mod manager;
pub mod permission;
pub mod voter;

pub use check::{Check, CheckResult, VoterResult};
pub use error::{BoxError, PermissionError};
pub use manager::{ensure_allowed, DefaultManager, Manager};
pub use permission::Permission;
pub use voter::{FnVoter, GrantVoter, HasPermissions, NamedVoter, Voter};
