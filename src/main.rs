use std::{net::SocketAddr, sync::Arc};

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use orgdir_backend::config::Config;
use orgdir_backend::db::postgres_organization_repository::PostgresOrganizationRepository;
use orgdir_backend::db::postgres_user_repository::PostgresUserRepository;
use orgdir_backend::ratelimit::{rate_limit, FixedWindowLimiter};
use orgdir_backend::routes::health::health_check;
use orgdir_backend::routes::organizations::{
    add_organization_user, create_organization, delete_organization, get_organization,
    list_organization_users, list_organizations, update_organization,
};
use orgdir_backend::services::OrganizationService;
use orgdir_backend::utils::jwt::JwtKeys;
use orgdir_backend::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Arc::new(Config::from_env());
    let jwt = JwtKeys::from_env().expect("JWT secret rejected");

    let pg_pool = establish_connection(&config.database_url).await;
    let orgs = Arc::new(PostgresOrganizationRepository {
        pool: pg_pool.clone(),
    });
    let users = Arc::new(PostgresUserRepository {
        pool: pg_pool.clone(),
    });

    let service = OrganizationService::new(orgs, users);
    let limiter = Arc::new(FixedWindowLimiter::new(
        config.rate_limit_max_requests,
        config.rate_limit_window_secs,
    ));

    let state = AppState {
        service,
        jwt,
        limiter,
        config: config.clone(),
    };

    let cors = CorsLayer::new()
        .allow_origin(
            config
                .frontend_origin
                .parse::<HeaderValue>()
                .expect("FRONTEND_ORIGIN must be a valid origin"),
        )
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true);

    let organization_routes = Router::new()
        .route("/", post(create_organization).get(list_organizations))
        .route(
            "/{id}",
            get(get_organization)
                .put(update_organization)
                .delete(delete_organization),
        )
        .route(
            "/{id}/users",
            get(list_organization_users).post(add_organization_user),
        );

    // The health probe stays outside the rate-limited API surface.
    let api_routes = Router::new()
        .nest("/organizations", organization_routes)
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit));

    let app = Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();

    let listener = TcpListener::bind(addr).await.expect("Failed to bind port");
    info!("Listening on http://{}", addr);
    axum::serve(listener, make_service)
        .await
        .expect("Server error");
}

/// Establish a connection to the database and verify it.
async fn establish_connection(database_url: &str) -> PgPool {
    let pool = PgPool::connect(database_url)
        .await
        .expect("Failed to connect to the database");

    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .expect("Failed to verify database connection");

    info!("Successfully connected to the database");
    pool
}
