use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use crate::app::errors::{self, FieldError};
use crate::app::services::AppServices;
use crate::app::dto;
use crate::context::CurrentUser;

/// POST /auth/login — `{email, password}` → `{token, user}` or 401.
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::LoginRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::bad_json(rejection),
    };

    let mut field_errors = Vec::new();
    let email = body.email.as_deref().unwrap_or("");
    if !dto::looks_like_email(email) {
        field_errors.push(FieldError {
            field: "email",
            message: "must be a valid email",
        });
    }
    let password = body.password.as_deref().unwrap_or("");
    if password.is_empty() {
        field_errors.push(FieldError {
            field: "password",
            message: "is required",
        });
    }
    if !field_errors.is_empty() {
        return errors::validation_error(field_errors);
    }

    match services.login(email, password).await {
        Ok((token, user)) => (
            StatusCode::OK,
            Json(json!({
                "token": token,
                "user": {
                    "id": user.id,
                    "name": user.name,
                    "email": user.email,
                    "role": user.role,
                },
            })),
        )
            .into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

/// GET /auth/me — the authenticated caller, fresh from the store, never the
/// credential hash.
pub async fn me(Extension(current): Extension<CurrentUser>) -> axum::response::Response {
    let user = current.user();
    (
        StatusCode::OK,
        Json(json!({
            "id": user.id,
            "name": user.name,
            "email": user.email,
            "role": user.role,
        })),
    )
        .into_response()
}
