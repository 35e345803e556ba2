use std::sync::Arc;

use async_trait::async_trait;

use crate::{Check, Permission, PermissionError, VoterResult};

/// Votes on a specific permission on a given subject, for a given user.
#[async_trait]
pub trait Voter<U, S>: Send + Sync {
    async fn vote_on_access(&self, check: &Check<U, S>) -> Result<VoterResult, PermissionError>;
}

/// Adapts a plain closure into a [`Voter`].
pub struct FnVoter<F>(pub F);

impl<F> FnVoter<F> {
    /// Pins the closure signature so argument types need no annotation.
    pub fn new<U, S>(f: F) -> Self
    where
        F: Fn(&Check<U, S>) -> Result<VoterResult, PermissionError> + Send + Sync,
    {
        Self(f)
    }
}

#[async_trait]
impl<U, S, F> Voter<U, S> for FnVoter<F>
where
    U: Send + Sync,
    S: Send + Sync,
    F: Fn(&Check<U, S>) -> Result<VoterResult, PermissionError> + Send + Sync,
{
    async fn vote_on_access(&self, check: &Check<U, S>) -> Result<VoterResult, PermissionError> {
        (self.0)(check)
    }
}

/// A voter together with the name it is reported under.
pub struct NamedVoter<U, S> {
    pub name: String,
    pub voter: Arc<dyn Voter<U, S>>,
}

impl<U, S> NamedVoter<U, S> {
    pub fn new(name: impl Into<String>, voter: Arc<dyn Voter<U, S>>) -> Self {
        Self {
            name: name.into(),
            voter,
        }
    }
}

impl<U, S> Clone for NamedVoter<U, S> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            voter: self.voter.clone(),
        }
    }
}

/// Users that carry an explicit set of granted permissions.
pub trait HasPermissions {
    fn granted_permissions(&self) -> &[Permission];
}

impl<T: HasPermissions + ?Sized> HasPermissions for &T {
    fn granted_permissions(&self) -> &[Permission] {
        (**self).granted_permissions()
    }
}

impl<T: HasPermissions + ?Sized> HasPermissions for Arc<T> {
    fn granted_permissions(&self) -> &[Permission] {
        (**self).granted_permissions()
    }
}

/// Agrees when the user was granted the permission (or `*`), otherwise
/// abstains with [`VoterResult::NoSupport`]. Never denies.
#[derive(Debug, Clone, Copy, Default)]
pub struct GrantVoter;

#[async_trait]
impl<U, S> Voter<U, S> for GrantVoter
where
    U: HasPermissions + Send + Sync,
    S: Send + Sync,
{
    async fn vote_on_access(&self, check: &Check<U, S>) -> Result<VoterResult, PermissionError> {
        let granted = check
            .user
            .granted_permissions()
            .iter()
            .any(|p| p.grants(&check.permission));

        Ok(if granted {
            VoterResult::Agree
        } else {
            VoterResult::NoSupport
        })
    }
}
