//! API-side authorization for document routes.
//!
//! Handlers build a [`Check`] from the restored session and the requested
//! document and run it through the permission manager before touching
//! anything.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use warden_perm::{
    ensure_allowed, Check, CheckResult, DefaultManager, GrantVoter, Manager, Permission,
    PermissionError, Voter, VoterResult,
};

use crate::app::demo::SessionToken;
use crate::app::errors::ApiError;

pub const READ_DOCUMENT: Permission = Permission::from_static("document.read");
pub const WRITE_DOCUMENT: Permission = Permission::from_static("document.write");

pub type DocumentCheck = Check<SessionToken, Document>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    pub owner: String,
    pub name: String,
}

/// Owners may do anything with their own documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct OwnerVoter;

#[async_trait]
impl Voter<SessionToken, Document> for OwnerVoter {
    async fn vote_on_access(&self, check: &DocumentCheck) -> Result<VoterResult, PermissionError> {
        Ok(if check.user.user_id == check.subject.owner {
            VoterResult::Agree
        } else {
            VoterResult::NoSupport
        })
    }
}

/// Owner voter first, then explicit grants carried by the session.
pub fn document_manager() -> DefaultManager<SessionToken, Document> {
    DefaultManager::new()
        .with_voter("owner", Arc::new(OwnerVoter))
        .with_voter("grants", Arc::new(GrantVoter))
}

/// Check authorization for `permission` on `document` in the current request.
pub async fn authorize(
    manager: &dyn Manager<SessionToken, Document>,
    session: &SessionToken,
    permission: Permission,
    document: Document,
) -> Result<CheckResult, ApiError> {
    let check = Check::new(permission, session.clone(), document);
    Ok(ensure_allowed(manager, &check).await?)
}
