use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, trace};

use crate::{Check, CheckResult, NamedVoter, PermissionError, Voter, VoterResult};

/// Takes care of checking permissions.
#[async_trait]
pub trait Manager<U, S>: Send + Sync {
    async fn check_permission(&self, check: &Check<U, S>) -> Result<CheckResult, PermissionError>;
}

/// Default voting logic:
///
/// - denies if at least one voter votes against (remaining voters are skipped);
/// - denies when every voter is neutral or does not support the check;
/// - allows if nobody denied and at least one voter agreed.
///
/// Voter errors abort the check. There is no fail-open or fail-closed
/// fallback here; see [`ensure_allowed`] for the latter.
pub struct DefaultManager<U, S> {
    voters: Vec<NamedVoter<U, S>>,
}

impl<U, S> Default for DefaultManager<U, S> {
    fn default() -> Self {
        Self { voters: Vec::new() }
    }
}

impl<U, S> Clone for DefaultManager<U, S> {
    fn clone(&self) -> Self {
        Self {
            voters: self.voters.clone(),
        }
    }
}

impl<U, S> DefaultManager<U, S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a voter. Voters are consulted in the order they were added;
    /// names should be unique since they key the audit map.
    pub fn with_voter(mut self, name: impl Into<String>, voter: Arc<dyn Voter<U, S>>) -> Self {
        self.voters.push(NamedVoter::new(name, voter));
        self
    }

    pub fn voter_names(&self) -> impl Iterator<Item = &str> {
        self.voters.iter().map(|v| v.name.as_str())
    }
}

impl<U, S> From<Vec<NamedVoter<U, S>>> for DefaultManager<U, S> {
    fn from(voters: Vec<NamedVoter<U, S>>) -> Self {
        Self { voters }
    }
}

#[async_trait]
impl<U, S> Manager<U, S> for DefaultManager<U, S>
where
    U: Send + Sync,
    S: Send + Sync,
{
    async fn check_permission(&self, check: &Check<U, S>) -> Result<CheckResult, PermissionError> {
        let mut results = HashMap::with_capacity(self.voters.len());
        let mut agreed = 0usize;

        for named in &self.voters {
            let vote = named.voter.vote_on_access(check).await?;
            trace!(voter = %named.name, permission = %check.permission, ?vote, "voter result");
            results.insert(named.name.clone(), vote);

            match vote {
                VoterResult::Agree => agreed += 1,
                VoterResult::Deny => {
                    debug!(
                        voter = %named.name,
                        permission = %check.permission,
                        "permission denied by voter"
                    );
                    return Ok(CheckResult::new(false, check.permission.clone(), results));
                }
                VoterResult::Neutral | VoterResult::NoSupport => {}
            }
        }

        Ok(CheckResult::new(agreed > 0, check.permission.clone(), results))
    }
}

/// Fail-closed wrapper: a denied check becomes [`PermissionError::Forbidden`].
pub async fn ensure_allowed<U, S, M>(
    manager: &M,
    check: &Check<U, S>,
) -> Result<CheckResult, PermissionError>
where
    M: Manager<U, S> + ?Sized,
{
    let result = manager.check_permission(check).await?;
    if result.allow() {
        Ok(result)
    } else {
        Err(PermissionError::Forbidden {
            permission: check.permission.clone(),
            result,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use proptest::prelude::*;

    use super::*;
    use crate::{FnVoter, GrantVoter, HasPermissions, Permission};

    #[derive(Debug, Clone)]
    struct User {
        id: u32,
        granted: Vec<Permission>,
    }

    impl HasPermissions for User {
        fn granted_permissions(&self) -> &[Permission] {
            &self.granted
        }
    }

    #[derive(Debug, Clone)]
    struct Document {
        owner: u32,
    }

    type DocCheck = Check<User, Document>;

    struct Fixed {
        vote: VoterResult,
        calls: AtomicUsize,
    }

    impl Fixed {
        fn new(vote: VoterResult) -> Arc<Self> {
            Arc::new(Self {
                vote,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Voter<User, Document> for Fixed {
        async fn vote_on_access(&self, _check: &DocCheck) -> Result<VoterResult, PermissionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.vote)
        }
    }

    fn check(permission: &'static str) -> DocCheck {
        Check::new(
            permission,
            User {
                id: 1,
                granted: vec![],
            },
            Document { owner: 2 },
        )
    }

    fn manager(votes: &[VoterResult]) -> DefaultManager<User, Document> {
        votes
            .iter()
            .enumerate()
            .fold(DefaultManager::new(), |m, (i, vote)| {
                m.with_voter(format!("v{i}"), Fixed::new(*vote))
            })
    }

    #[tokio::test]
    async fn owner_abstains_admin_agrees() {
        let manager: DefaultManager<User, Document> = DefaultManager::new()
            .with_voter("owner", Fixed::new(VoterResult::NoSupport))
            .with_voter("admin", Fixed::new(VoterResult::Agree));

        let result = manager.check_permission(&check("edit")).await.unwrap();

        assert!(result.allow());
        assert_eq!(result.permission().as_str(), "edit");
        assert_eq!(result.voter_results().len(), 2);
        assert_eq!(result.voter_result("owner"), Some(VoterResult::NoSupport));
        assert_eq!(result.voter_result("admin"), Some(VoterResult::Agree));
    }

    #[tokio::test]
    async fn deny_short_circuits_and_keeps_partial_audit() {
        let before = Fixed::new(VoterResult::Agree);
        let denier = Fixed::new(VoterResult::Deny);
        let after = Fixed::new(VoterResult::Agree);
        let manager: DefaultManager<User, Document> = DefaultManager::new()
            .with_voter("before", before.clone())
            .with_voter("denier", denier.clone())
            .with_voter("after", after.clone());

        let result = manager.check_permission(&check("edit")).await.unwrap();

        assert!(!result.allow());
        assert_eq!(result.voter_result("before"), Some(VoterResult::Agree));
        assert_eq!(result.voter_result("denier"), Some(VoterResult::Deny));
        assert_eq!(result.voter_result("after"), None);
        assert_eq!(after.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn no_voters_denies() {
        let result = manager(&[]).check_permission(&check("edit")).await.unwrap();
        assert!(!result.allow());
        assert!(result.voter_results().is_empty());
    }

    #[tokio::test]
    async fn voter_error_aborts_without_result() {
        let after = Fixed::new(VoterResult::Agree);
        let manager: DefaultManager<User, Document> = DefaultManager::new()
            .with_voter(
                "flaky",
                Arc::new(FnVoter::new(|_: &DocCheck| {
                    Err(PermissionError::voter("acl store timeout"))
                })),
            )
            .with_voter("after", after.clone());

        let err = manager.check_permission(&check("edit")).await.unwrap_err();

        assert!(matches!(err, PermissionError::Voter(_)));
        assert_eq!(after.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn closure_voter_sees_user_and_subject() {
        let owner_voter = FnVoter::new(|c: &DocCheck| {
            Ok(if c.user.id == c.subject.owner {
                VoterResult::Agree
            } else {
                VoterResult::Neutral
            })
        });
        let manager: DefaultManager<User, Document> =
            DefaultManager::new().with_voter("owner", Arc::new(owner_voter));

        let mut own = check("edit");
        own.subject.owner = own.user.id;
        assert!(manager.check_permission(&own).await.unwrap().allow());
        assert!(!manager.check_permission(&check("edit")).await.unwrap().allow());
    }

    #[tokio::test]
    async fn grant_voter_honours_wildcard() {
        let manager: DefaultManager<User, Document> =
            DefaultManager::new().with_voter("grants", Arc::new(GrantVoter));

        let mut c = check("document.edit");
        c.user.granted = vec![Permission::from("document.read")];
        let result = manager.check_permission(&c).await.unwrap();
        assert_eq!(result.voter_result("grants"), Some(VoterResult::NoSupport));
        assert!(!result.allow());

        c.user.granted = vec![Permission::from("*")];
        assert!(manager.check_permission(&c).await.unwrap().allow());
    }

    #[tokio::test]
    async fn ensure_allowed_fails_closed() {
        let manager = manager(&[VoterResult::Neutral]);
        let err = ensure_allowed(&manager, &check("edit")).await.unwrap_err();

        match err {
            PermissionError::Forbidden { permission, result } => {
                assert_eq!(permission.as_str(), "edit");
                assert_eq!(result.voter_result("v0"), Some(VoterResult::Neutral));
            }
            other => panic!("unexpected error: {other}"),
        }

        let allowed = manager_with_agree();
        assert!(ensure_allowed(&allowed, &check("edit")).await.is_ok());
    }

    fn manager_with_agree() -> DefaultManager<User, Document> {
        manager(&[VoterResult::Agree])
    }

    #[test]
    fn audit_trail_serializes() {
        let result = CheckResult::new(
            true,
            Permission::from("edit"),
            HashMap::from([("admin".to_string(), VoterResult::Agree)]),
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["allowed"], true);
        assert_eq!(json["voter_results"]["admin"], "agree");
    }

    fn vote() -> impl Strategy<Value = VoterResult> {
        prop_oneof![
            Just(VoterResult::Neutral),
            Just(VoterResult::NoSupport),
            Just(VoterResult::Agree),
            Just(VoterResult::Deny),
        ]
    }

    fn run(votes: &[VoterResult]) -> CheckResult {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        rt.block_on(manager(votes).check_permission(&check("edit"))).unwrap()
    }

    proptest! {
        #[test]
        fn deny_wins(votes in proptest::collection::vec(vote(), 0..12)) {
            let result = run(&votes);

            match votes.iter().position(|v| *v == VoterResult::Deny) {
                Some(first_deny) => {
                    prop_assert!(!result.allow());
                    prop_assert_eq!(result.voter_results().len(), first_deny + 1);
                    for i in 0..votes.len() {
                        let recorded = result.voter_result(&format!("v{i}")).is_some();
                        prop_assert_eq!(recorded, i <= first_deny);
                    }
                }
                None => {
                    let any_agree = votes.contains(&VoterResult::Agree);
                    prop_assert_eq!(result.allow(), any_agree);
                    prop_assert_eq!(result.voter_results().len(), votes.len());
                }
            }
        }
    }
}
