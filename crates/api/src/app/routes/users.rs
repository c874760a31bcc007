use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path, Query, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use warden_auth::{RoleName, require_role};
use warden_core::UserId;
use warden_store::UserPatch;

use crate::app::dto;
use crate::app::errors::{self, FieldError};
use crate::app::services::{AppServices, CreateUserInput};
use crate::context::CurrentUser;

fn parse_user_id(raw: &str) -> Result<UserId, axum::response::Response> {
    raw.parse().map_err(|_| {
        errors::json_error(StatusCode::BAD_REQUEST, "invalid user id")
    })
}

/// GET /users — any authenticated caller.
pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::PageQuery>,
) -> axum::response::Response {
    let page = match dto::parse_page_query(&query) {
        Ok(p) => p,
        Err(response) => return response,
    };

    match services.list_users(page).await {
        Ok(page) => (StatusCode::OK, Json(dto::users_page_to_json(page))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

/// GET /users/:id — any authenticated caller.
pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_user_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match services.get_user(id).await {
        Ok(user) => (StatusCode::OK, Json(dto::user_to_json(&user))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

/// POST /users — admin or manager.
pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(current): Extension<CurrentUser>,
    body: Result<Json<dto::CreateUserRequest>, JsonRejection>,
) -> axum::response::Response {
    if require_role(&current.principal(), &["admin", "manager"]).is_err() {
        return errors::forbidden();
    }

    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::bad_json(rejection),
    };

    let mut field_errors = Vec::new();
    let name = body.name.as_deref().unwrap_or("").trim();
    if name.is_empty() {
        field_errors.push(FieldError {
            field: "name",
            message: "is required",
        });
    }
    let email = body.email.as_deref().unwrap_or("");
    if !dto::looks_like_email(email) {
        field_errors.push(FieldError {
            field: "email",
            message: "must be a valid email",
        });
    }
    let password = body.password.as_deref().unwrap_or("");
    if password.len() < 6 {
        field_errors.push(FieldError {
            field: "password",
            message: "must be at least 6 characters",
        });
    }
    let role = body.role.as_deref().unwrap_or("").trim();
    if role.is_empty() {
        field_errors.push(FieldError {
            field: "role",
            message: "is required",
        });
    }
    let status = match body.status.as_deref() {
        Some(raw) => dto::parse_status(raw, &mut field_errors),
        None => {
            field_errors.push(FieldError {
                field: "status",
                message: "is required",
            });
            None
        }
    };
    // `status` is Some exactly when no field error was recorded for it.
    let status = match status {
        Some(s) if field_errors.is_empty() => s,
        _ => return errors::validation_error(field_errors),
    };

    let input = CreateUserInput {
        name: name.to_string(),
        email: email.to_string(),
        password: password.to_string(),
        role: RoleName::new(role),
        status,
        photo: body.photo,
    };

    match services.create_user(current.id(), input).await {
        Ok(user) => (
            StatusCode::CREATED,
            Json(json!({
                "message": "User created",
                "user": dto::user_to_json(&user),
            })),
        )
            .into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

/// PUT /users/:id — admin or manager. Any credential field in the body is
/// stripped before the merge (the DTO has no password field to deserialize
/// into).
pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    body: Result<Json<dto::UpdateUserRequest>, JsonRejection>,
) -> axum::response::Response {
    if require_role(&current.principal(), &["admin", "manager"]).is_err() {
        return errors::forbidden();
    }

    let id = match parse_user_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::bad_json(rejection),
    };

    let mut field_errors = Vec::new();
    if let Some(email) = body.email.as_deref() {
        if !dto::looks_like_email(email) {
            field_errors.push(FieldError {
                field: "email",
                message: "must be a valid email",
            });
        }
    }
    let status = match body.status.as_deref() {
        Some(raw) => dto::parse_status(raw, &mut field_errors),
        None => None,
    };
    if !field_errors.is_empty() {
        return errors::validation_error(field_errors);
    }

    let patch = UserPatch {
        name: body.name,
        email: body.email,
        role: body.role.map(RoleName::new),
        status,
        photo: body.photo,
    };

    match services.update_user(current.id(), id, patch).await {
        Ok(user) => (
            StatusCode::OK,
            Json(json!({
                "message": "User updated",
                "user": dto::user_to_json(&user),
            })),
        )
            .into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

/// DELETE /users/:id — admin only.
pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if require_role(&current.principal(), &["admin"]).is_err() {
        return errors::forbidden();
    }

    let id = match parse_user_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match services.delete_user(current.id(), id).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({ "message": "User deleted successfully" })),
        )
            .into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
