//! HTTP API application wiring (Axum router + service wiring).
//!
//! Layout:
//! - `services.rs`: domain orchestration over the stores (+ audit sink)
//! - `routes/`: HTTP routes + handlers (one file per domain area)
//! - `dto.rs`: request/response DTOs, validation, JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{
    Extension, Router,
    routing::{get, post},
};
use tower::ServiceBuilder;

use warden_auth::{Hs256TokenCodec, TokenConfig, TokenValidator};
use warden_store::{
    AuditStore, InMemoryAuditStore, InMemoryRoleStore, InMemoryUserStore, RoleStore, UserStore,
};

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::{AdminSeed, AppServices};

/// Application configuration, normally read from the environment.
pub struct AppConfig {
    pub token: TokenConfig,
    pub admin_seed: Option<AdminSeed>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            "dev-secret".to_string()
        });

        let mut token = TokenConfig::new(secret);
        if let Some(ttl) = std::env::var("TOKEN_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            token.ttl_secs = ttl;
        }

        let admin_seed = match (std::env::var("ADMIN_EMAIL"), std::env::var("ADMIN_PASSWORD")) {
            (Ok(email), Ok(password)) => Some(AdminSeed {
                name: std::env::var("ADMIN_NAME").unwrap_or_else(|_| "Admin".to_string()),
                email,
                password,
            }),
            _ => None,
        };

        Self { token, admin_seed }
    }
}

struct Stores {
    users: Arc<dyn UserStore>,
    roles: Arc<dyn RoleStore>,
    logs: Arc<dyn AuditStore>,
}

fn build_in_memory_stores() -> Stores {
    Stores {
        users: Arc::new(InMemoryUserStore::new()),
        roles: Arc::new(InMemoryRoleStore::new()),
        logs: Arc::new(InMemoryAuditStore::new()),
    }
}

#[cfg(feature = "postgres")]
async fn build_postgres_stores() -> Stores {
    use warden_store::postgres::{PgAuditStore, PgRoleStore, PgUserStore, init_schema};

    let database_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set when USE_PERSISTENT_STORES=true");

    let pool = sqlx::PgPool::connect(&database_url)
        .await
        .expect("failed to connect to Postgres");

    init_schema(&pool).await.expect("failed to initialize schema");

    Stores {
        users: Arc::new(PgUserStore::new(pool.clone())),
        roles: Arc::new(PgRoleStore::new(pool.clone())),
        logs: Arc::new(PgAuditStore::new(pool)),
    }
}

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(config: AppConfig) -> Router {
    let use_persistent = std::env::var("USE_PERSISTENT_STORES")
        .unwrap_or_else(|_| "false".to_string())
        .parse::<bool>()
        .unwrap_or(false);

    let stores = if use_persistent {
        #[cfg(feature = "postgres")]
        {
            build_postgres_stores().await
        }
        #[cfg(not(feature = "postgres"))]
        {
            tracing::warn!(
                "USE_PERSISTENT_STORES=true but postgres feature not enabled, falling back to in-memory"
            );
            build_in_memory_stores()
        }
    } else {
        build_in_memory_stores()
    };

    build_app_with_stores(config, stores.users, stores.roles, stores.logs).await
}

/// Build the router over explicit store implementations (tests use this with
/// fresh in-memory stores).
pub async fn build_app_with_stores(
    config: AppConfig,
    users: Arc<dyn UserStore>,
    roles: Arc<dyn RoleStore>,
    logs: Arc<dyn AuditStore>,
) -> Router {
    let tokens = Arc::new(Hs256TokenCodec::new(config.token));
    let services = Arc::new(AppServices::new(
        users.clone(),
        roles,
        logs,
        tokens.clone(),
    ));

    if let Some(seed) = &config.admin_seed {
        if let Err(e) = services.seed_admin(seed).await {
            tracing::error!(error = %e, "admin seed failed");
        }
    }

    let validator: Arc<dyn TokenValidator> = tokens;
    let auth_state = middleware::AuthState {
        tokens: validator,
        users,
    };

    let public = Router::new()
        .route("/health", get(routes::system::health))
        .route("/auth/login", post(routes::auth::login));

    // Protected routes: authentication gate first, role gates in handlers.
    let protected = routes::router().layer(axum::middleware::from_fn_with_state(
        auth_state,
        middleware::auth_middleware,
    ));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(ServiceBuilder::new().layer(Extension(services)))
}
