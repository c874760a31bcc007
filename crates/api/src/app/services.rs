//! Service orchestration: domain operations over the stores.
//!
//! Handlers call in here after authorization. Each privileged mutation takes
//! the acting user id and side-records one audit entry through the
//! fire-and-forget sink; the sink never fails the primary operation.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration, Utc};

use warden_auth::{Hs256TokenCodec, PermissionGrants, RoleName, password};
use warden_core::error::{DomainError, DomainResult};
use warden_core::{Page, PageParams, RoleId, UserId};
use warden_store::{
    AuditEntry, AuditSink, AuditStore, NewRole, NewUser, Role, RolePatch, RoleStore, User,
    UserPatch, UserStats, UserStatus, UserStore,
};

/// Admin account to bootstrap at startup (idempotent).
#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Input for creating a user; the password is still plaintext here and is
/// hashed exactly once, below, before it reaches a store.
#[derive(Debug)]
pub struct CreateUserInput {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: RoleName,
    pub status: UserStatus,
    pub photo: Option<String>,
}

pub struct AppServices {
    users: Arc<dyn UserStore>,
    roles: Arc<dyn RoleStore>,
    logs: Arc<dyn AuditStore>,
    audit: AuditSink,
    tokens: Arc<Hs256TokenCodec>,
}

impl AppServices {
    pub fn new(
        users: Arc<dyn UserStore>,
        roles: Arc<dyn RoleStore>,
        logs: Arc<dyn AuditStore>,
        tokens: Arc<Hs256TokenCodec>,
    ) -> Self {
        Self {
            users,
            roles,
            logs: logs.clone(),
            audit: AuditSink::new(logs),
            tokens,
        }
    }

    // ---- auth ----

    /// Verify credentials and issue a session token carrying the user's
    /// role-at-login as the snapshot claim.
    ///
    /// Lookup failure and password mismatch collapse into one message so the
    /// response does not reveal which half was wrong. Inactive accounts
    /// cannot start new sessions (outstanding tokens are unaffected —
    /// sessions are stateless).
    pub async fn login(&self, email: &str, plaintext: &str) -> DomainResult<(String, User)> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or_else(|| DomainError::unauthenticated("Invalid credentials"))?;

        let valid = password::verify_password(plaintext, &user.password_hash)
            .map_err(|e| DomainError::internal(e.to_string()))?;
        if !valid {
            return Err(DomainError::unauthenticated("Invalid credentials"));
        }

        if user.status == UserStatus::Inactive {
            return Err(DomainError::unauthenticated("Account is inactive"));
        }

        let token = self
            .tokens
            .issue(user.id, user.role.clone(), Utc::now())
            .map_err(|e| DomainError::internal(e.to_string()))?;

        tracing::info!(user = %user.id, "login");
        Ok((token, user))
    }

    // ---- users ----

    pub async fn list_users(&self, page: PageParams) -> DomainResult<Page<User>> {
        self.users.list(page).await
    }

    pub async fn get_user(&self, id: UserId) -> DomainResult<User> {
        self.users.get(id).await
    }

    pub async fn create_user(&self, actor: UserId, input: CreateUserInput) -> DomainResult<User> {
        // The single place a plaintext credential is transformed.
        let password_hash = password::hash_password(&input.password)
            .map_err(|e| DomainError::internal(e.to_string()))?;

        let user = self
            .users
            .insert(NewUser {
                name: input.name,
                email: input.email,
                password_hash,
                role: input.role,
                status: input.status,
                photo: input.photo,
            })
            .await?;

        self.audit
            .record(actor, "Created user", format!("User {} created", user.id))
            .await;
        Ok(user)
    }

    pub async fn update_user(
        &self,
        actor: UserId,
        id: UserId,
        patch: UserPatch,
    ) -> DomainResult<User> {
        let user = self.users.update(id, patch).await?;
        self.audit
            .record(actor, "Updated user", format!("User {} updated", user.id))
            .await;
        Ok(user)
    }

    pub async fn delete_user(&self, actor: UserId, id: UserId) -> DomainResult<User> {
        let user = self.users.delete(id).await?;
        self.audit
            .record(actor, "Deleted user", format!("User {id} deleted"))
            .await;
        Ok(user)
    }

    pub async fn user_stats(&self) -> DomainResult<UserStats> {
        self.users.stats(Utc::now() - Duration::days(7)).await
    }

    // ---- roles ----

    pub async fn list_roles(&self) -> DomainResult<Vec<Role>> {
        self.roles.list().await
    }

    pub async fn get_role(&self, id: RoleId) -> DomainResult<Role> {
        self.roles.get(id).await
    }

    pub async fn create_role(
        &self,
        actor: UserId,
        name: RoleName,
        description: Option<String>,
        permissions: BTreeMap<String, bool>,
    ) -> DomainResult<Role> {
        let grants =
            PermissionGrants::from_partial(permissions.iter().map(|(k, v)| (k.as_str(), *v)));

        let role = self
            .roles
            .insert(NewRole {
                name,
                description,
                permissions: grants,
            })
            .await?;

        self.audit
            .record(
                actor,
                "Created role",
                format!("Role {} ({}) created", role.id, role.name),
            )
            .await;
        Ok(role)
    }

    pub async fn update_role(
        &self,
        actor: UserId,
        id: RoleId,
        patch: RolePatch,
    ) -> DomainResult<Role> {
        let role = self.roles.update(id, patch).await?;
        self.audit
            .record(
                actor,
                "Updated role",
                format!("Role {} ({}) updated", role.id, role.name),
            )
            .await;
        Ok(role)
    }

    pub async fn delete_role(&self, actor: UserId, id: RoleId) -> DomainResult<Role> {
        let role = self.roles.delete(id).await?;
        self.audit
            .record(
                actor,
                "Deleted role",
                format!("Role {} ({}) deleted", id, role.name),
            )
            .await;
        Ok(role)
    }

    // ---- logs ----

    pub async fn list_logs(&self, page: PageParams) -> DomainResult<Page<AuditEntry>> {
        self.logs.list(page).await
    }

    // ---- bootstrap ----

    /// Create the `admin` role (every permission granted) and the configured
    /// admin account unless they already exist. Races with a concurrent
    /// seeder resolve through the stores' Conflict arbitration.
    pub async fn seed_admin(&self, seed: &AdminSeed) -> DomainResult<()> {
        if self.users.find_by_email(&seed.email).await?.is_some() {
            tracing::info!(email = %seed.email, "admin already present, skipping seed");
            return Ok(());
        }

        let admin_role = RoleName::new("admin");
        let have_role = self
            .roles
            .list()
            .await?
            .iter()
            .any(|r| r.name == admin_role);
        if !have_role {
            match self
                .roles
                .insert(NewRole {
                    name: admin_role.clone(),
                    description: Some("Full access".to_string()),
                    permissions: PermissionGrants::all(),
                })
                .await
            {
                Ok(_) | Err(DomainError::Conflict(_)) => {}
                Err(e) => return Err(e),
            }
        }

        let password_hash = password::hash_password(&seed.password)
            .map_err(|e| DomainError::internal(e.to_string()))?;
        match self
            .users
            .insert(NewUser {
                name: seed.name.clone(),
                email: seed.email.clone(),
                password_hash,
                role: admin_role,
                status: UserStatus::Active,
                photo: None,
            })
            .await
        {
            Ok(user) => {
                tracing::info!(email = %user.email, "admin seeded");
                Ok(())
            }
            Err(DomainError::Conflict(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }
}
