//! Authentication gate (runs before every protected route).
//!
//! Order is fixed: this middleware authenticates first; role gates only run
//! inside handlers on requests that made it through here. The first failing
//! gate determines the response and nothing downstream runs.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use warden_auth::{TokenError, TokenValidator};
use warden_core::error::DomainError;
use warden_store::UserStore;

use crate::app::errors;
use crate::context::CurrentUser;

#[derive(Clone)]
pub struct AuthState {
    pub tokens: Arc<dyn TokenValidator>,
    pub users: Arc<dyn UserStore>,
}

pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let token = match extract_bearer(req.headers()) {
        Ok(t) => t,
        Err(_) => {
            return errors::json_error(StatusCode::UNAUTHORIZED, "Unauthorized, token missing");
        }
    };

    // Missing/malformed/expired/bad-signature are distinguished here for the
    // logs but collapse to the same 401 outward.
    let claims = match state.tokens.validate(token) {
        Ok(c) => c,
        Err(e) => {
            tracing::debug!(error = %e, "rejected session token");
            return errors::json_error(StatusCode::UNAUTHORIZED, "Unauthorized, token invalid");
        }
    };

    // The user must still exist; the record is re-fetched for /auth/me
    // freshness, but the role used for authorization stays the token's
    // snapshot claim.
    let user = match state.users.get(claims.sub).await {
        Ok(u) => u,
        Err(DomainError::NotFound(_)) => {
            return errors::json_error(StatusCode::UNAUTHORIZED, "Unauthorized, user not found");
        }
        Err(e) => return errors::domain_error_to_response(e),
    };

    req.extensions_mut()
        .insert(CurrentUser::new(user, claims.role));

    next.run(req).await
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, TokenError> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(TokenError::Missing)?;

    let header = header.to_str().map_err(|_| TokenError::Missing)?;

    let header = header.strip_prefix("Bearer ").ok_or(TokenError::Missing)?;

    let token = header.trim();
    if token.is_empty() {
        return Err(TokenError::Missing);
    }

    Ok(token)
}
