use axum::{Router, routing::get};

pub mod auth;
pub mod logs;
pub mod roles;
pub mod stats;
pub mod system;
pub mod users;

/// Router for all session-protected endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/auth/me", get(auth::me))
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/roles", get(roles::list_roles).post(roles::create_role))
        .route(
            "/roles/:id",
            get(roles::get_role)
                .put(roles::update_role)
                .delete(roles::delete_role),
        )
        .route("/logs", get(logs::list_logs))
        .route("/stats", get(stats::dashboard))
}
