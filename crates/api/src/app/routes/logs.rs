use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
};

use crate::app::dto;
use crate::app::errors;
use crate::app::services::AppServices;

/// GET /logs?page=&limit= — any authenticated caller; newest first.
pub async fn list_logs(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::PageQuery>,
) -> axum::response::Response {
    let page = match dto::parse_page_query(&query) {
        Ok(p) => p,
        Err(response) => return response,
    };

    match services.list_logs(page).await {
        Ok(page) => (StatusCode::OK, Json(dto::logs_page_to_json(page))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
