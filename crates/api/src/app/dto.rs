//! Request DTOs, field validation, and outward JSON mapping.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::json;

use warden_core::{Page, PageParams};
use warden_store::{AuditEntry, Role, User, UserStats, UserStatus};

use crate::app::errors::{self, FieldError};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Body for `POST /users`. Fields are loose on purpose: each is validated
/// explicitly so contract violations come back in the stable `errors` shape.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub status: Option<String>,
    pub photo: Option<String>,
}

/// Body for `PUT /users/:id`.
///
/// There is deliberately no `password` field: a credential value sent through
/// the general update path is stripped before it can reach the store
/// (credential rotation is a separate operation).
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub status: Option<String>,
    pub photo: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateRoleRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    /// Any subset of catalog keys; unlisted ones default to false, unknown
    /// ones are ignored.
    pub permissions: Option<BTreeMap<String, bool>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub permissions: Option<BTreeMap<String, bool>>,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

// -------------------------
// Validation helpers
// -------------------------

/// Loose email shape check (full validation is the mail system's problem).
pub fn looks_like_email(s: &str) -> bool {
    match s.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.'),
        None => false,
    }
}

/// Validate `?page&limit`: absent values fall back to defaults (1/10),
/// present-but-invalid values (non-integer or < 1) are a 400.
pub fn parse_page_query(query: &PageQuery) -> Result<PageParams, axum::response::Response> {
    let mut field_errors = Vec::new();

    let page = match &query.page {
        None => None,
        Some(raw) => match raw.parse::<u64>() {
            Ok(n) if n >= 1 => Some(n),
            _ => {
                field_errors.push(FieldError {
                    field: "page",
                    message: "must be an integer >= 1",
                });
                None
            }
        },
    };
    let limit = match &query.limit {
        None => None,
        Some(raw) => match raw.parse::<u64>() {
            Ok(n) if n >= 1 => Some(n),
            _ => {
                field_errors.push(FieldError {
                    field: "limit",
                    message: "must be an integer >= 1",
                });
                None
            }
        },
    };

    if field_errors.is_empty() {
        Ok(PageParams::new(page, limit))
    } else {
        Err(errors::validation_error(field_errors))
    }
}

/// Parse a `status` string into [`UserStatus`], collecting a field error on
/// anything outside {Active, Inactive}.
pub fn parse_status(
    raw: &str,
    field_errors: &mut Vec<FieldError>,
) -> Option<UserStatus> {
    match raw.parse::<UserStatus>() {
        Ok(s) => Some(s),
        Err(_) => {
            field_errors.push(FieldError {
                field: "status",
                message: "must be 'Active' or 'Inactive'",
            });
            None
        }
    }
}

// -------------------------
// JSON mapping helpers
// -------------------------

/// Outward user shape. The credential hash is omitted by construction —
/// this is the only place a stored user becomes JSON.
pub fn user_to_json(user: &User) -> serde_json::Value {
    json!({
        "id": user.id,
        "name": user.name,
        "email": user.email,
        "role": user.role,
        "status": user.status,
        "photo": user.photo,
        "created_at": user.created_at,
        "updated_at": user.updated_at,
    })
}

pub fn role_to_json(role: &Role) -> serde_json::Value {
    json!({
        "id": role.id,
        "name": role.name,
        "description": role.description,
        "permissions": role.permissions,
        "created_at": role.created_at,
        "updated_at": role.updated_at,
    })
}

pub fn log_to_json(entry: &AuditEntry) -> serde_json::Value {
    json!({
        "id": entry.id,
        "user": entry.actor,
        "action": entry.action,
        "details": entry.details,
        "timestamp": entry.timestamp,
    })
}

pub fn users_page_to_json(page: Page<User>) -> serde_json::Value {
    json!({
        "data": page.items.iter().map(user_to_json).collect::<Vec<_>>(),
        "meta": { "total": page.total, "page": page.page, "limit": page.limit },
    })
}

pub fn logs_page_to_json(page: Page<AuditEntry>) -> serde_json::Value {
    json!({
        "logs": page.items.iter().map(log_to_json).collect::<Vec<_>>(),
        "meta": {
            "total": page.total,
            "page": page.page,
            "limit": page.limit,
            "total_pages": page.total_pages(),
        },
    })
}

pub fn stats_to_json(stats: UserStats) -> serde_json::Value {
    json!({
        "total_users": stats.total,
        "active_users": stats.active,
        "inactive_users": stats.inactive,
        "new_signups": stats.new_signups,
    })
}
