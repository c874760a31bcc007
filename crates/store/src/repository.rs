//! Store contracts for users, roles, and the audit log.
//!
//! All operations are async and object-safe so the api layer can hold
//! implementations behind `Arc<dyn …>`. Conflict/NotFound outcomes surface
//! as `DomainError` variants; the stores themselves are the final arbiter
//! of uniqueness.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use warden_core::error::DomainResult;
use warden_core::{Page, PageParams, RoleId, UserId};

use crate::model::{
    AuditEntry, NewAuditEntry, NewRole, NewUser, Role, RolePatch, User, UserPatch, UserStats,
};

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Stable id-ordered pagination; `skip = (page-1)*limit`.
    async fn list(&self, page: PageParams) -> DomainResult<Page<User>>;

    async fn get(&self, id: UserId) -> DomainResult<User>;

    /// Case-sensitive email lookup (login path).
    async fn find_by_email(&self, email: &str) -> DomainResult<Option<User>>;

    /// Conflict if the email is already in use.
    async fn insert(&self, new: NewUser) -> DomainResult<User>;

    /// Partial merge; Conflict if an email change collides. The stored
    /// credential hash is untouchable through this path by construction
    /// ([`UserPatch`] has no credential field).
    async fn update(&self, id: UserId, patch: UserPatch) -> DomainResult<User>;

    /// Removes and returns the user. No cascade anywhere.
    async fn delete(&self, id: UserId) -> DomainResult<User>;

    /// Dashboard counts; `signups_since` bounds the new-signup window.
    async fn stats(&self, signups_since: DateTime<Utc>) -> DomainResult<UserStats>;
}

#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn list(&self) -> DomainResult<Vec<Role>>;

    async fn get(&self, id: RoleId) -> DomainResult<Role>;

    /// Conflict if the role name is already in use.
    async fn insert(&self, new: NewRole) -> DomainResult<Role>;

    /// Partial merge: provided permission keys are merged into the existing
    /// complete mapping (never removing entries); renaming onto an existing
    /// name is a Conflict.
    async fn update(&self, id: RoleId, patch: RolePatch) -> DomainResult<Role>;

    /// Removes and returns the role. Users referencing it are not touched.
    async fn delete(&self, id: RoleId) -> DomainResult<Role>;
}

#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Append-only; the store assigns id and timestamp.
    async fn append(&self, entry: NewAuditEntry) -> DomainResult<AuditEntry>;

    /// Newest first.
    async fn list(&self, page: PageParams) -> DomainResult<Page<AuditEntry>>;
}
