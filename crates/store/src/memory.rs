//! In-memory store implementations (dev/test default).
//!
//! Uniqueness checks and the subsequent write happen under one write-lock
//! acquisition, so check-and-insert is atomic with respect to concurrent
//! requests.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use warden_core::error::{DomainError, DomainResult};
use warden_core::{AuditEntryId, Page, PageParams, RoleId, UserId};

use crate::model::{
    AuditEntry, NewAuditEntry, NewRole, NewUser, Role, RolePatch, User, UserPatch, UserStats,
    UserStatus,
};
use crate::repository::{AuditStore, RoleStore, UserStore};

fn poisoned(what: &str) -> DomainError {
    DomainError::internal(format!("{what} store lock poisoned"))
}

fn paginate<T>(mut items: Vec<T>, total: u64, page: PageParams) -> Page<T> {
    let skip = page.skip().min(items.len() as u64) as usize;
    let mut items = items.split_off(skip);
    items.truncate(page.limit as usize);
    Page {
        items,
        total,
        page: page.page,
        limit: page.limit,
    }
}

/// In-memory user store.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    inner: RwLock<HashMap<UserId, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn list(&self, page: PageParams) -> DomainResult<Page<User>> {
        let map = self.inner.read().map_err(|_| poisoned("user"))?;
        let mut users: Vec<User> = map.values().cloned().collect();
        // Creation order: v7 ids are time-ordered.
        users.sort_by_key(|u| *u.id.as_uuid());
        let total = users.len() as u64;
        Ok(paginate(users, total, page))
    }

    async fn get(&self, id: UserId) -> DomainResult<User> {
        let map = self.inner.read().map_err(|_| poisoned("user"))?;
        map.get(&id).cloned().ok_or(DomainError::NotFound("User"))
    }

    async fn find_by_email(&self, email: &str) -> DomainResult<Option<User>> {
        let map = self.inner.read().map_err(|_| poisoned("user"))?;
        Ok(map.values().find(|u| u.email == email).cloned())
    }

    async fn insert(&self, new: NewUser) -> DomainResult<User> {
        let mut map = self.inner.write().map_err(|_| poisoned("user"))?;
        if map.values().any(|u| u.email == new.email) {
            return Err(DomainError::conflict("Email already in use"));
        }

        let now = Utc::now();
        let user = User {
            id: UserId::new(),
            name: new.name,
            email: new.email,
            password_hash: new.password_hash,
            role: new.role,
            status: new.status,
            photo: new.photo,
            created_at: now,
            updated_at: now,
        };
        map.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, id: UserId, patch: UserPatch) -> DomainResult<User> {
        let mut map = self.inner.write().map_err(|_| poisoned("user"))?;

        if let Some(email) = &patch.email {
            if map.values().any(|u| u.id != id && &u.email == email) {
                return Err(DomainError::conflict("Email already in use"));
            }
        }

        let user = map.get_mut(&id).ok_or(DomainError::NotFound("User"))?;
        if let Some(name) = patch.name {
            user.name = name;
        }
        if let Some(email) = patch.email {
            user.email = email;
        }
        if let Some(role) = patch.role {
            user.role = role;
        }
        if let Some(status) = patch.status {
            user.status = status;
        }
        if let Some(photo) = patch.photo {
            user.photo = Some(photo);
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn delete(&self, id: UserId) -> DomainResult<User> {
        let mut map = self.inner.write().map_err(|_| poisoned("user"))?;
        map.remove(&id).ok_or(DomainError::NotFound("User"))
    }

    async fn stats(&self, signups_since: DateTime<Utc>) -> DomainResult<UserStats> {
        let map = self.inner.read().map_err(|_| poisoned("user"))?;
        let mut stats = UserStats {
            total: 0,
            active: 0,
            inactive: 0,
            new_signups: 0,
        };
        for user in map.values() {
            stats.total += 1;
            match user.status {
                UserStatus::Active => stats.active += 1,
                UserStatus::Inactive => stats.inactive += 1,
            }
            if user.created_at >= signups_since {
                stats.new_signups += 1;
            }
        }
        Ok(stats)
    }
}

/// In-memory role store.
#[derive(Debug, Default)]
pub struct InMemoryRoleStore {
    inner: RwLock<HashMap<RoleId, Role>>,
}

impl InMemoryRoleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoleStore for InMemoryRoleStore {
    async fn list(&self) -> DomainResult<Vec<Role>> {
        let map = self.inner.read().map_err(|_| poisoned("role"))?;
        let mut roles: Vec<Role> = map.values().cloned().collect();
        roles.sort_by_key(|r| *r.id.as_uuid());
        Ok(roles)
    }

    async fn get(&self, id: RoleId) -> DomainResult<Role> {
        let map = self.inner.read().map_err(|_| poisoned("role"))?;
        map.get(&id).cloned().ok_or(DomainError::NotFound("Role"))
    }

    async fn insert(&self, new: NewRole) -> DomainResult<Role> {
        let mut map = self.inner.write().map_err(|_| poisoned("role"))?;
        if map.values().any(|r| r.name == new.name) {
            return Err(DomainError::conflict("Role name already in use"));
        }

        let now = Utc::now();
        let role = Role {
            id: RoleId::new(),
            name: new.name,
            description: new.description,
            permissions: new.permissions,
            created_at: now,
            updated_at: now,
        };
        map.insert(role.id, role.clone());
        Ok(role)
    }

    async fn update(&self, id: RoleId, patch: RolePatch) -> DomainResult<Role> {
        let mut map = self.inner.write().map_err(|_| poisoned("role"))?;

        if let Some(name) = &patch.name {
            if map.values().any(|r| r.id != id && &r.name == name) {
                return Err(DomainError::conflict("Role name already in use"));
            }
        }

        let role = map.get_mut(&id).ok_or(DomainError::NotFound("Role"))?;
        if let Some(name) = patch.name {
            role.name = name;
        }
        if let Some(description) = patch.description {
            role.description = Some(description);
        }
        if let Some(partial) = patch.permissions {
            role.permissions
                .merge_partial(partial.iter().map(|(k, v)| (k.as_str(), *v)));
        }
        role.updated_at = Utc::now();
        Ok(role.clone())
    }

    async fn delete(&self, id: RoleId) -> DomainResult<Role> {
        let mut map = self.inner.write().map_err(|_| poisoned("role"))?;
        map.remove(&id).ok_or(DomainError::NotFound("Role"))
    }
}

/// In-memory append-only audit log.
#[derive(Debug, Default)]
pub struct InMemoryAuditStore {
    inner: RwLock<Vec<AuditEntry>>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn append(&self, entry: NewAuditEntry) -> DomainResult<AuditEntry> {
        let mut log = self.inner.write().map_err(|_| poisoned("audit"))?;
        let record = AuditEntry {
            id: AuditEntryId::new(),
            actor: entry.actor,
            action: entry.action,
            details: entry.details,
            timestamp: Utc::now(),
        };
        log.push(record.clone());
        Ok(record)
    }

    async fn list(&self, page: PageParams) -> DomainResult<Page<AuditEntry>> {
        let log = self.inner.read().map_err(|_| poisoned("audit"))?;
        let newest_first: Vec<AuditEntry> = log.iter().rev().cloned().collect();
        let total = newest_first.len() as u64;
        Ok(paginate(newest_first, total, page))
    }
}
