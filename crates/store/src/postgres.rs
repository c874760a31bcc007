//! Postgres-backed stores (enabled with the `postgres` feature).
//!
//! Uniqueness is enforced by unique indexes; duplicate-key failures
//! (SQLSTATE 23505) surface as the same Conflict error the in-memory stores
//! produce, keeping the store the final arbiter under concurrency.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};

use warden_core::error::{DomainError, DomainResult};
use warden_core::{AuditEntryId, Page, PageParams, RoleId, UserId};

use crate::model::{
    AuditEntry, NewAuditEntry, NewRole, NewUser, Role, RolePatch, User, UserPatch, UserStats,
    UserStatus,
};
use crate::repository::{AuditStore, RoleStore, UserStore};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id            UUID PRIMARY KEY,
    name          TEXT NOT NULL,
    email         TEXT NOT NULL,
    password_hash TEXT NOT NULL,
    role          TEXT NOT NULL,
    status        TEXT NOT NULL,
    photo         TEXT,
    created_at    TIMESTAMPTZ NOT NULL,
    updated_at    TIMESTAMPTZ NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS users_email_key ON users (email);

CREATE TABLE IF NOT EXISTS roles (
    id          UUID PRIMARY KEY,
    name        TEXT NOT NULL,
    description TEXT,
    permissions JSONB NOT NULL,
    created_at  TIMESTAMPTZ NOT NULL,
    updated_at  TIMESTAMPTZ NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS roles_name_key ON roles (name);

CREATE TABLE IF NOT EXISTS audit_log (
    id        UUID PRIMARY KEY,
    actor     UUID NOT NULL,
    action    TEXT NOT NULL,
    details   TEXT NOT NULL,
    timestamp TIMESTAMPTZ NOT NULL
);
"#;

/// Create tables and unique indexes if they do not exist yet.
pub async fn init_schema(pool: &PgPool) -> DomainResult<()> {
    for statement in SCHEMA.split(';').filter(|s| !s.trim().is_empty()) {
        sqlx::query(statement).execute(pool).await.map_err(db_err)?;
    }
    Ok(())
}

fn db_err(e: sqlx::Error) -> DomainError {
    DomainError::internal(format!("database error: {e}"))
}

fn unique_err(e: sqlx::Error, conflict_msg: &str) -> DomainError {
    if let sqlx::Error::Database(db) = &e {
        if db.code().as_deref() == Some("23505") {
            return DomainError::conflict(conflict_msg);
        }
    }
    db_err(e)
}

fn user_from_row(row: &PgRow) -> DomainResult<User> {
    let status: String = row.try_get("status").map_err(db_err)?;
    Ok(User {
        id: UserId::from_uuid(row.try_get("id").map_err(db_err)?),
        name: row.try_get("name").map_err(db_err)?,
        email: row.try_get("email").map_err(db_err)?,
        password_hash: row.try_get("password_hash").map_err(db_err)?,
        role: warden_auth::RoleName::new(row.try_get::<String, _>("role").map_err(db_err)?),
        status: status.parse::<UserStatus>()?,
        photo: row.try_get("photo").map_err(db_err)?,
        created_at: row.try_get("created_at").map_err(db_err)?,
        updated_at: row.try_get("updated_at").map_err(db_err)?,
    })
}

fn role_from_row(row: &PgRow) -> DomainResult<Role> {
    let permissions: serde_json::Value = row.try_get("permissions").map_err(db_err)?;
    Ok(Role {
        id: RoleId::from_uuid(row.try_get("id").map_err(db_err)?),
        name: warden_auth::RoleName::new(row.try_get::<String, _>("name").map_err(db_err)?),
        description: row.try_get("description").map_err(db_err)?,
        permissions: serde_json::from_value(permissions)
            .map_err(|e| DomainError::internal(format!("stored permissions corrupt: {e}")))?,
        created_at: row.try_get("created_at").map_err(db_err)?,
        updated_at: row.try_get("updated_at").map_err(db_err)?,
    })
}

fn audit_from_row(row: &PgRow) -> DomainResult<AuditEntry> {
    Ok(AuditEntry {
        id: AuditEntryId::from_uuid(row.try_get("id").map_err(db_err)?),
        actor: UserId::from_uuid(row.try_get("actor").map_err(db_err)?),
        action: row.try_get("action").map_err(db_err)?,
        details: row.try_get("details").map_err(db_err)?,
        timestamp: row.try_get("timestamp").map_err(db_err)?,
    })
}

/// Postgres user store.
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn list(&self, page: PageParams) -> DomainResult<Page<User>> {
        let total: i64 = sqlx::query("SELECT COUNT(*) AS total FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?
            .try_get("total")
            .map_err(db_err)?;

        let rows = sqlx::query("SELECT * FROM users ORDER BY id LIMIT $1 OFFSET $2")
            .bind(page.limit as i64)
            .bind(page.skip() as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(Page {
            items: rows.iter().map(user_from_row).collect::<DomainResult<_>>()?,
            total: total as u64,
            page: page.page,
            limit: page.limit,
        })
    }

    async fn get(&self, id: UserId) -> DomainResult<User> {
        let row = sqlx::query("SELECT * FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .ok_or(DomainError::NotFound("User"))?;
        user_from_row(&row)
    }

    async fn find_by_email(&self, email: &str) -> DomainResult<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn insert(&self, new: NewUser) -> DomainResult<User> {
        let now = Utc::now();
        let row = sqlx::query(
            "INSERT INTO users (id, name, email, password_hash, role, status, photo, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8) RETURNING *",
        )
        .bind(UserId::new().as_uuid())
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(new.role.as_str())
        .bind(new.status.as_str())
        .bind(&new.photo)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_err(e, "Email already in use"))?;
        user_from_row(&row)
    }

    async fn update(&self, id: UserId, patch: UserPatch) -> DomainResult<User> {
        let row = sqlx::query(
            "UPDATE users SET \
                 name = COALESCE($2, name), \
                 email = COALESCE($3, email), \
                 role = COALESCE($4, role), \
                 status = COALESCE($5, status), \
                 photo = COALESCE($6, photo), \
                 updated_at = $7 \
             WHERE id = $1 RETURNING *",
        )
        .bind(id.as_uuid())
        .bind(&patch.name)
        .bind(&patch.email)
        .bind(patch.role.as_ref().map(|r| r.as_str().to_string()))
        .bind(patch.status.map(|s| s.as_str().to_string()))
        .bind(&patch.photo)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| unique_err(e, "Email already in use"))?
        .ok_or(DomainError::NotFound("User"))?;
        user_from_row(&row)
    }

    async fn delete(&self, id: UserId) -> DomainResult<User> {
        let row = sqlx::query("DELETE FROM users WHERE id = $1 RETURNING *")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .ok_or(DomainError::NotFound("User"))?;
        user_from_row(&row)
    }

    async fn stats(&self, signups_since: DateTime<Utc>) -> DomainResult<UserStats> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS total, \
                    COUNT(*) FILTER (WHERE status = 'Active') AS active, \
                    COUNT(*) FILTER (WHERE status = 'Inactive') AS inactive, \
                    COUNT(*) FILTER (WHERE created_at >= $1) AS new_signups \
             FROM users",
        )
        .bind(signups_since)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(UserStats {
            total: row.try_get::<i64, _>("total").map_err(db_err)? as u64,
            active: row.try_get::<i64, _>("active").map_err(db_err)? as u64,
            inactive: row.try_get::<i64, _>("inactive").map_err(db_err)? as u64,
            new_signups: row.try_get::<i64, _>("new_signups").map_err(db_err)? as u64,
        })
    }
}

/// Postgres role store.
#[derive(Clone)]
pub struct PgRoleStore {
    pool: PgPool,
}

impl PgRoleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleStore for PgRoleStore {
    async fn list(&self) -> DomainResult<Vec<Role>> {
        let rows = sqlx::query("SELECT * FROM roles ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.iter().map(role_from_row).collect()
    }

    async fn get(&self, id: RoleId) -> DomainResult<Role> {
        let row = sqlx::query("SELECT * FROM roles WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .ok_or(DomainError::NotFound("Role"))?;
        role_from_row(&row)
    }

    async fn insert(&self, new: NewRole) -> DomainResult<Role> {
        let permissions = serde_json::to_value(&new.permissions)
            .map_err(|e| DomainError::internal(format!("permissions encode: {e}")))?;
        let row = sqlx::query(
            "INSERT INTO roles (id, name, description, permissions, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $5) RETURNING *",
        )
        .bind(RoleId::new().as_uuid())
        .bind(new.name.as_str())
        .bind(&new.description)
        .bind(permissions)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_err(e, "Role name already in use"))?;
        role_from_row(&row)
    }

    async fn update(&self, id: RoleId, patch: RolePatch) -> DomainResult<Role> {
        // Read-merge-write inside one transaction so the permission merge is
        // not lost under concurrent updates; the unique index still arbitrates
        // rename collisions.
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let row = sqlx::query("SELECT * FROM roles WHERE id = $1 FOR UPDATE")
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?
            .ok_or(DomainError::NotFound("Role"))?;
        let mut role = role_from_row(&row)?;

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

        let permissions = serde_json::to_value(&role.permissions)
            .map_err(|e| DomainError::internal(format!("permissions encode: {e}")))?;
        let row = sqlx::query(
            "UPDATE roles SET name = $2, description = $3, permissions = $4, updated_at = $5 \
             WHERE id = $1 RETURNING *",
        )
        .bind(id.as_uuid())
        .bind(role.name.as_str())
        .bind(&role.description)
        .bind(permissions)
        .bind(role.updated_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| unique_err(e, "Role name already in use"))?;
        let updated = role_from_row(&row)?;

        tx.commit().await.map_err(db_err)?;
        Ok(updated)
    }

    async fn delete(&self, id: RoleId) -> DomainResult<Role> {
        let row = sqlx::query("DELETE FROM roles WHERE id = $1 RETURNING *")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .ok_or(DomainError::NotFound("Role"))?;
        role_from_row(&row)
    }
}

/// Postgres audit log.
#[derive(Clone)]
pub struct PgAuditStore {
    pool: PgPool,
}

impl PgAuditStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditStore for PgAuditStore {
    async fn append(&self, entry: NewAuditEntry) -> DomainResult<AuditEntry> {
        let row = sqlx::query(
            "INSERT INTO audit_log (id, actor, action, details, timestamp) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(AuditEntryId::new().as_uuid())
        .bind(entry.actor.as_uuid())
        .bind(&entry.action)
        .bind(&entry.details)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        audit_from_row(&row)
    }

    async fn list(&self, page: PageParams) -> DomainResult<Page<AuditEntry>> {
        let total: i64 = sqlx::query("SELECT COUNT(*) AS total FROM audit_log")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?
            .try_get("total")
            .map_err(db_err)?;

        let rows = sqlx::query(
            "SELECT * FROM audit_log ORDER BY timestamp DESC, id DESC LIMIT $1 OFFSET $2",
        )
        .bind(page.limit as i64)
        .bind(page.skip() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(Page {
            items: rows
                .iter()
                .map(audit_from_row)
                .collect::<DomainResult<_>>()?,
            total: total as u64,
            page: page.page,
            limit: page.limit,
        })
    }
}
