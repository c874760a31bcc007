use std::sync::Arc;

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use crate::app::dto;
use crate::app::errors;
use crate::app::services::AppServices;

/// GET /stats — any authenticated caller: account counts and signups over
/// the last seven days.
pub async fn dashboard(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.user_stats().await {
        Ok(stats) => (StatusCode::OK, Json(dto::stats_to_json(stats))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
