use thiserror::Error;

use crate::{CheckResult, Permission};

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum PermissionError {
    /// A voter could not reach a decision (backend down, bad input...).
    #[error("voter failed: {0}")]
    Voter(#[source] BoxError),

    /// Only produced by [`ensure_allowed`](crate::ensure_allowed).
    #[error("forbidden: permission '{permission}' was not granted")]
    Forbidden {
        permission: Permission,
        result: CheckResult,
    },
}

impl PermissionError {
    pub fn voter(err: impl Into<BoxError>) -> Self {
        Self::Voter(err.into())
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::Forbidden { .. })
    }
}
