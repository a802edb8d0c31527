mod database;
mod error;
mod handlers;
mod middleware;
mod models;
mod notify;
mod stock;
mod utils;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post, put},
    Router,
};
use dotenvy::dotenv;
use std::env;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

use database::{create_database_pool, run_migrations, Database};
use notify::Notifier;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub notifier: Notifier,
}

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Initialize database
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let db = create_database_pool(&database_url)
        .await
        .expect("Failed to connect to database");

    run_migrations(&db).await.expect("Failed to run migrations");

    tracing::info!("database connection successful");

    let state = AppState {
        db,
        notifier: Notifier::new(128),
    };

    // Build the application router
    let app = create_router(state);

    // Get port from environment or use default
    let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("0.0.0.0:{}", port);

    tracing::info!("stockroom server starting on http://{}", addr);

    // Start the server
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app).await.expect("Server error");
}

fn create_router(state: AppState) -> Router {
    Router::new()
        // Public routes (no authentication required)
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        // Authenticated routes
        .route("/api/auth/me", get(handlers::auth::me))
        .route("/api/summary", get(handlers::summary))
        // Team management
        .route("/api/users", get(handlers::users::list_users))
        .route("/api/users/:id", get(handlers::users::get_user))
        .route("/api/users/:id", put(handlers::users::update_user))
        .route("/api/users/:id", delete(handlers::users::delete_user))
        .route("/api/users/:id/lock", post(handlers::users::lock_user))
        .route("/api/users/:id/unlock", post(handlers::users::unlock_user))
        .route("/api/users/:id/roles", post(handlers::users::assign_roles))
        // Roles & permissions
        .route("/api/roles", get(handlers::roles::list_roles))
        .route("/api/roles", post(handlers::roles::create_role))
        .route("/api/roles/:id", put(handlers::roles::update_role))
        .route("/api/roles/:id", delete(handlers::roles::delete_role))
        .route("/api/permissions", get(handlers::roles::list_permissions))
        // Warehouses
        .route("/api/warehouses", get(handlers::warehouses::list_warehouses))
        .route("/api/warehouses", post(handlers::warehouses::create_warehouse))
        .route("/api/warehouses/:id", get(handlers::warehouses::get_warehouse))
        .route("/api/warehouses/:id", put(handlers::warehouses::update_warehouse))
        .route("/api/warehouses/:id", delete(handlers::warehouses::delete_warehouse))
        // Products
        .route("/api/products", get(handlers::products::list_products))
        .route("/api/products", post(handlers::products::create_product))
        .route("/api/products/:id", get(handlers::products::get_product))
        .route("/api/products/:id", put(handlers::products::update_product))
        .route("/api/products/:id", delete(handlers::products::delete_product))
        // Inventory counts
        .route("/api/inventory", get(handlers::inventory::inventory_counts))
        .route("/api/inventory/low-stock", get(handlers::inventory::low_stock))
        // Stock batches & ledger
        .route("/api/batches", get(handlers::batches::list_batches))
        .route("/api/batches", post(handlers::batches::create_batch))
        .route("/api/ledger", get(handlers::batches::list_ledger))
        // Dispatches
        .route("/api/dispatches", get(handlers::dispatches::list_dispatches))
        .route("/api/dispatches", post(handlers::dispatches::create_dispatch))
        .route("/api/dispatches/:id", get(handlers::dispatches::get_dispatch))
        .route("/api/dispatches/:id", delete(handlers::dispatches::delete_dispatch))
        // Damage & recovery
        .route("/api/damage", get(handlers::damage::list_damage))
        .route("/api/damage", post(handlers::damage::create_damage))
        .route("/api/damage/:id/recover", post(handlers::damage::create_recovery))
        // Returns
        .route("/api/returns", get(handlers::returns::list_returns))
        .route("/api/returns", post(handlers::returns::create_return))
        .route("/api/returns/:id", get(handlers::returns::get_return))
        // Transfers
        .route("/api/transfers", get(handlers::transfers::list_transfers))
        .route("/api/transfers", post(handlers::transfers::create_transfer))
        // Orders
        .route("/api/orders", get(handlers::orders::list_orders))
        .route("/api/orders", post(handlers::orders::create_order))
        .route("/api/orders/:id", get(handlers::orders::get_order))
        .route("/api/orders/:id", delete(handlers::orders::delete_order))
        .route("/api/orders/:id/status", patch(handlers::orders::update_order_status))
        // Messaging
        .route("/api/messages", get(handlers::messages::inbox))
        .route("/api/messages", post(handlers::messages::send_message))
        .route("/api/messages/sent", get(handlers::messages::sent))
        .route("/api/messages/:id", get(handlers::messages::get_message))
        .route("/api/messages/:id/read", post(handlers::messages::mark_read))
        // Notifications
        .route("/api/notifications", get(handlers::notifications::list_notifications))
        .route("/api/notifications/stream", get(handlers::notifications::stream))
        .route("/api/notifications/read-all", post(handlers::notifications::mark_all_read))
        .route("/api/notifications/:id/read", post(handlers::notifications::mark_read))
        // Middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(1024 * 1024)), // 1MB
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    // Lazy pool: never connects unless a handler actually queries.
    fn test_state() -> AppState {
        let db = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/stockroom_test")
            .unwrap();
        AppState {
            db,
            notifier: Notifier::new(8),
        }
    }

    #[tokio::test]
    async fn protected_route_without_token_is_unauthorized() {
        let app = create_router(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/dispatches")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let app = create_router(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn single_message_route_is_wired() {
        // Notification links point at /api/messages/:id; an unauthenticated
        // hit must fall through to 401, not 404.
        let app = create_router(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/messages/6fa459ea-ee8a-3ca4-894e-db77e160355e")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn login_requires_json_content_type() {
        let app = create_router(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/auth/login")
                    .body(Body::from("email=a&password=b"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }
}
