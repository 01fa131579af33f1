pub mod audit;
pub mod auth;
pub mod checkout;
pub mod commands;
pub mod config;
pub mod database;
pub mod errors;
pub mod inventory;
pub mod logger;
pub mod models;
pub mod rate_limiter;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_support;

use std::sync::{Arc, Mutex};
use std::time::Instant;

use axum::{
    routing::{get, post, put},
    Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use auth::session::SessionStore;
use commands::{
    activity_cmd, auth_cmd, company_cmd, employee_cmd, order_cmd, product_cmd, stock_cmd,
    system_cmd,
};
use config::AppConfig;
use rate_limiter::RateLimiter;

/// Shared application state, handed to every handler as `Arc<AppState>`.
pub struct AppState {
    pub db: sqlx::SqlitePool,
    pub config: AppConfig,
    pub sessions: Mutex<SessionStore>,
    pub login_limiter: RateLimiter,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(db: sqlx::SqlitePool, config: AppConfig) -> Self {
        let session_ttl = chrono::Duration::minutes(config.security.session_timeout_mins);
        let login_limiter = RateLimiter::new(
            config.security.max_login_attempts,
            config.security.lockout_duration_mins * 60,
        );

        Self {
            db,
            config,
            sessions: Mutex::new(SessionStore::new(session_ttl)),
            login_limiter,
            started_at: Instant::now(),
        }
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Onboarding & auth
        .route("/companies", post(company_cmd::register_company))
        .route("/auth/login", post(auth_cmd::login))
        .route("/auth/logout", post(auth_cmd::logout))
        .route("/auth/session", get(auth_cmd::check_session))
        // Branches & employees
        .route(
            "/branches",
            get(company_cmd::get_branches).post(company_cmd::create_branch),
        )
        .route(
            "/employees",
            get(employee_cmd::get_employees).post(employee_cmd::create_employee),
        )
        .route("/employees/:id", put(employee_cmd::update_employee))
        .route("/employees/:id/toggle", post(employee_cmd::toggle_employee_status))
        .route("/employees/:id/password", post(employee_cmd::reset_employee_password))
        // Catalog
        .route(
            "/categories",
            get(product_cmd::get_categories).post(product_cmd::create_category),
        )
        .route(
            "/products",
            get(product_cmd::get_products).post(product_cmd::create_product),
        )
        .route(
            "/products/:id",
            get(product_cmd::get_product)
                .put(product_cmd::update_product)
                .delete(product_cmd::delete_product),
        )
        .route("/products/:id/variants", post(product_cmd::create_variant))
        .route(
            "/products/:id/variants/:variant_id",
            put(product_cmd::update_variant),
        )
        // Inventory
        .route(
            "/products/:id/variants/:variant_id/restock",
            post(stock_cmd::restock),
        )
        .route(
            "/products/:id/variants/:variant_id/adjust",
            post(stock_cmd::adjust_stock),
        )
        .route("/stock/history", get(stock_cmd::get_stock_history))
        .route("/stock/low", get(stock_cmd::get_low_stock))
        // Orders
        .route(
            "/orders",
            get(order_cmd::get_orders).post(order_cmd::place_order),
        )
        .route("/orders/:order_no", get(order_cmd::get_order))
        // Activity & system
        .route("/activity", get(activity_cmd::get_activity_logs))
        .route("/health", get(system_cmd::get_health_status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = config::init_config().clone();
    logger::init_logging(&config.logging);
    config.validate()?;

    tracing::info!(
        target: "APP",
        version = %config.version,
        environment = config.environment.as_str(),
        "application starting"
    );

    let pool = database::connection::init_db(&config.database).await?;
    let address = config.bind_address();
    let state = Arc::new(AppState::new(pool, config));

    let app = build_router(state.clone());

    let listener = TcpListener::bind(&address).await?;
    tracing::info!(target: "APP", "server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.db.close().await;
    tracing::info!(target: "APP", "server shut down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(target: "APP", error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        tracing::info!(target: "APP", "received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                tracing::info!(target: "APP", "received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!(target: "APP", error = %e, "failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
