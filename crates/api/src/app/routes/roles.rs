use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use warden_auth::{RoleName, require_role};
use warden_core::RoleId;
use warden_store::RolePatch;

use crate::app::dto;
use crate::app::errors::{self, FieldError};
use crate::app::services::AppServices;
use crate::context::CurrentUser;

fn parse_role_id(raw: &str) -> Result<RoleId, axum::response::Response> {
    raw.parse().map_err(|_| {
        errors::json_error(StatusCode::BAD_REQUEST, "invalid role id")
    })
}

/// GET /roles — any authenticated caller.
pub async fn list_roles(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.list_roles().await {
        Ok(roles) => {
            let roles: Vec<_> = roles.iter().map(dto::role_to_json).collect();
            (StatusCode::OK, Json(roles)).into_response()
        }
        Err(e) => errors::domain_error_to_response(e),
    }
}

/// GET /roles/:id — any authenticated caller.
pub async fn get_role(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_role_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match services.get_role(id).await {
        Ok(role) => (StatusCode::OK, Json(dto::role_to_json(&role))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

/// POST /roles — admin or manager. The grant listing may be any subset of
/// the catalog; it is normalized into a complete mapping.
pub async fn create_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(current): Extension<CurrentUser>,
    body: Result<Json<dto::CreateRoleRequest>, JsonRejection>,
) -> axum::response::Response {
    if require_role(&current.principal(), &["admin", "manager"]).is_err() {
        return errors::forbidden();
    }

    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::bad_json(rejection),
    };

    let name = body.name.as_deref().unwrap_or("").trim();
    if name.is_empty() {
        return errors::validation_error(vec![FieldError {
            field: "name",
            message: "is required",
        }]);
    }

    match services
        .create_role(
            current.id(),
            RoleName::new(name),
            body.description,
            body.permissions.unwrap_or_default(),
        )
        .await
    {
        Ok(role) => (StatusCode::CREATED, Json(dto::role_to_json(&role))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

/// PUT /roles/:id — admin or manager. Provided permission keys are merged
/// into the existing complete mapping; nothing is ever removed.
pub async fn update_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    body: Result<Json<dto::UpdateRoleRequest>, JsonRejection>,
) -> axum::response::Response {
    if require_role(&current.principal(), &["admin", "manager"]).is_err() {
        return errors::forbidden();
    }

    let id = match parse_role_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::bad_json(rejection),
    };

    if let Some(name) = body.name.as_deref() {
        if name.trim().is_empty() {
            return errors::validation_error(vec![FieldError {
                field: "name",
                message: "must not be empty",
            }]);
        }
    }

    let patch = RolePatch {
        name: body.name.map(|n| RoleName::new(n.trim().to_string())),
        description: body.description,
        permissions: body.permissions,
    };

    match services.update_role(current.id(), id, patch).await {
        Ok(role) => (StatusCode::OK, Json(dto::role_to_json(&role))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

/// DELETE /roles/:id — admin only. Users referencing the role keep their
/// (now orphaned) role name.
pub async fn delete_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if require_role(&current.principal(), &["admin"]).is_err() {
        return errors::forbidden();
    }

    let id = match parse_role_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match services.delete_role(current.id(), id).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({ "message": "Role deleted successfully" })),
        )
            .into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
