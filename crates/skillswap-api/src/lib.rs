//! skillswap-api - Authentication and session-lifecycle server
//!
//! HTTP surface over the session subsystem: token issuance, verification,
//! rotation of access credentials, revocation, and role-gated admin
//! introspection.

pub mod audit;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

use axum::http::HeaderValue;
use axum::{middleware as axum_middleware, routing::get, Router};
use state::AppState;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health_check,
        handlers::health::readiness_check,
        handlers::auth::register_handler,
        handlers::auth::login_handler,
        handlers::auth::refresh_handler,
        handlers::auth::logout_handler,
        handlers::auth::logout_all_handler,
        handlers::auth::change_password_handler,
        handlers::auth::me_handler,
        handlers::admin::session_stats_handler,
    ),
    components(schemas(
        auth::RegisterRequest,
        auth::LoginRequest,
        auth::RefreshRequest,
        auth::LogoutRequest,
        auth::ChangePasswordRequest,
        auth::AuthResponse,
        auth::RefreshResponse,
        auth::TokenPair,
        auth::UserInfo,
        handlers::auth::MessageResponse,
        handlers::auth::MeResponse,
        handlers::admin::SessionStatsResponse,
        error::ErrorBody,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Session lifecycle"),
        (name = "admin", description = "Operational introspection"),
        (name = "health", description = "Liveness and readiness probes"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Build the application router over the given state
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.server.cors_origins);

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .nest("/api/v1", routes::api_routes(state.clone()))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(axum_middleware::from_fn(
            middleware::security_headers_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        // No cross-origin access unless explicitly configured
        return CorsLayer::new();
    }

    let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Test credentials for the seeded operator account
#[cfg(feature = "test-utils")]
pub const TEST_ADMIN_EMAIL: &str = "admin@skillswap.test";
#[cfg(feature = "test-utils")]
pub const TEST_ADMIN_PASSWORD: &str = "Adm1n!Sup3rSecret";

/// Build a self-contained router for integration tests: in-memory directory,
/// light hashing parameters, and a seeded admin account.
#[cfg(feature = "test-utils")]
pub async fn create_router_for_testing() -> Router {
    use skillswap_core::config::{AppConfig, AuthConfig};
    use skillswap_core::{InMemoryUserDirectory, User, UserDirectory, UserRole};

    let config = AppConfig {
        auth: AuthConfig {
            access_secret: "test-access-secret".to_string(),
            refresh_secret: "test-refresh-secret".to_string(),
            argon_memory_kib: 8192,
            argon_iterations: 1,
            argon_parallelism: 1,
            ..Default::default()
        },
        ..Default::default()
    };

    let directory = Arc::new(InMemoryUserDirectory::new());

    let hash = auth::password::hash_password_with_config(
        TEST_ADMIN_PASSWORD,
        &auth::PasswordConfig::from(&config.auth),
    )
    .expect("test admin hash");
    let mut admin = User::new(
        TEST_ADMIN_EMAIL.to_string(),
        hash,
        "Test Admin".to_string(),
        UserRole::Admin,
    );
    admin.verified = true;
    directory.create(admin).await.expect("seed test admin");

    let state = Arc::new(AppState::new(config, directory));
    create_router(state)
}
