use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::Permission;

/// Single question for the voters: may `user` do `permission` on `subject`?
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Check<U, S> {
    pub permission: Permission,
    pub user: U,
    pub subject: S,
}

impl<U, S> Check<U, S> {
    pub fn new(permission: impl Into<Permission>, user: U, subject: S) -> Self {
        Self {
            permission: permission.into(),
            user,
            subject,
        }
    }
}

/// Opinion of one voter on one [`Check`].
///
/// There is no "unset" variant: a voter that has not voted is simply absent
/// from [`CheckResult::voter_results`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoterResult {
    /// The voter understands the check but has no opinion.
    Neutral,
    /// The voter does not handle this kind of check.
    NoSupport,
    Agree,
    Deny,
}

/// Outcome of a permission check, with the per-voter audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    allowed: bool,
    permission: Permission,
    voter_results: HashMap<String, VoterResult>,
}

impl CheckResult {
    pub(crate) fn new(
        allowed: bool,
        permission: Permission,
        voter_results: HashMap<String, VoterResult>,
    ) -> Self {
        Self {
            allowed,
            permission,
            voter_results,
        }
    }

    /// True if voting succeeded for the user on the subject.
    pub fn allow(&self) -> bool {
        self.allowed
    }

    pub fn permission(&self) -> &Permission {
        &self.permission
    }

    /// Result of the named voter, if it was consulted.
    pub fn voter_result(&self, voter: &str) -> Option<VoterResult> {
        self.voter_results.get(voter).copied()
    }

    pub fn voter_results(&self) -> &HashMap<String, VoterResult> {
        &self.voter_results
    }
}
