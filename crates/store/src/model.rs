//! Domain records persisted by the stores.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use warden_auth::{PermissionGrants, RoleName};
use warden_core::error::DomainError;
use warden_core::{AuditEntryId, RoleId, UserId};

/// User account status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum UserStatus {
    #[default]
    Active,
    Inactive,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "Active",
            UserStatus::Inactive => "Inactive",
        }
    }
}

impl core::fmt::Display for UserStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for UserStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Active" => Ok(UserStatus::Active),
            "Inactive" => Ok(UserStatus::Inactive),
            other => Err(DomainError::validation(format!(
                "status must be 'Active' or 'Inactive', got '{other}'"
            ))),
        }
    }
}

/// A user account as stored.
///
/// `password_hash` holds only the one-way Argon2id output and is never
/// serialized outward — this type deliberately does not implement
/// `Serialize`; the api layer maps it to JSON field by field.
///
/// `role` is a reference by name, not a foreign key: deleting the role a
/// user points at leaves the user untouched (orphaned reference, tolerated).
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: RoleName,
    pub status: UserStatus,
    pub photo: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a user. The credential is already hashed by the time
/// it reaches a store.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: RoleName,
    pub status: UserStatus,
    pub photo: Option<String>,
}

/// Partial user update.
///
/// There is intentionally no credential field: the general update path
/// cannot touch the stored hash (credential rotation is a separate
/// operation).
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<RoleName>,
    pub status: Option<UserStatus>,
    pub photo: Option<String>,
}

/// Aggregate counts for the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UserStats {
    pub total: u64,
    pub active: u64,
    pub inactive: u64,
    /// Accounts created inside the requested signup window.
    pub new_signups: u64,
}

/// A role as stored: a unique name plus a complete permission grant mapping.
#[derive(Debug, Clone)]
pub struct Role {
    pub id: RoleId,
    pub name: RoleName,
    pub description: Option<String>,
    pub permissions: PermissionGrants,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a role. `permissions` is already normalized to a
/// complete mapping by the caller.
#[derive(Debug, Clone)]
pub struct NewRole {
    pub name: RoleName,
    pub description: Option<String>,
    pub permissions: PermissionGrants,
}

/// Partial role update. `permissions` carries only the keys the caller
/// provided; stores merge them into the existing complete mapping.
#[derive(Debug, Clone, Default)]
pub struct RolePatch {
    pub name: Option<RoleName>,
    pub description: Option<String>,
    pub permissions: Option<BTreeMap<String, bool>>,
}

/// One append-only audit record. References the actor by id without
/// referential integrity — the actor may since have been deleted.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub id: AuditEntryId,
    pub actor: UserId,
    pub action: String,
    pub details: String,
    pub timestamp: DateTime<Utc>,
}

/// Input for appending an audit record; the timestamp is assigned at write
/// time by the store.
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub actor: UserId,
    pub action: String,
    pub details: String,
}
