//! Plaza Subscription API
//!
//! REST service for subscription lifecycle, plan catalog, and usage queries.
//!
//! ## REST Endpoints
//!
//! - `GET /api/v1/subscriptions/current` - Current subscription + usage map
//! - `GET /api/v1/subscriptions/plans` - Plan catalog
//! - `POST /api/v1/subscriptions/upgrade/{plan}` - Change plan
//! - `PATCH /api/v1/subscriptions/cancel` - Soft-cancel
//! - `POST /api/v1/subscriptions/trial/{plan}` - Start a trial
//! - `GET /api/v1/subscriptions/usage` - Usage map with percentages
//! - `GET /api/v1/subscriptions/access/{feature}` - Capability check
//!
//! ## Health Endpoints
//!
//! - `GET /health` - Liveness probe
//! - `GET /ready` - Readiness probe
//! - `GET /metrics` - Prometheus metrics

mod config;
mod error;
mod handlers;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, patch, post};
use axum::Router;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use plaza_db::pg::Repositories;
use plaza_entitlement_core::{
    EntitlementGuard, PlanCatalog, SubscriptionLifecycleManager, UsageMeter,
};

use crate::config::Config;
use crate::handlers::{health, ready};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("subscription_api=debug".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Plaza Subscription API");

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!(http_port = config.http_port, "Configuration loaded");

    // Initialize metrics
    let metrics_handle = if config.metrics_enabled {
        Some(setup_metrics()?)
    } else {
        None
    };

    // Create database pool
    let pool = plaza_db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    // Create repositories
    let repos = Repositories::new(pool.clone());

    // Wire the entitlement engine
    let catalog = Arc::new(PlanCatalog::builtin());
    let meter = UsageMeter::new(Arc::new(repos.usage.clone()), catalog.clone());
    let lifecycle = SubscriptionLifecycleManager::new(
        Arc::new(repos.subscriptions.clone()),
        meter,
        config.engine.clone(),
    );
    let guard = EntitlementGuard::new(
        lifecycle.clone(),
        Arc::new(repos.add_ons.clone()),
        catalog.clone(),
    );

    // Create application state
    let state = AppState::new(lifecycle, guard, catalog, pool, config.clone());

    // Build HTTP router
    let app = build_router(state, metrics_handle);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    tracing::info!("HTTP server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn build_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let request_timeout = state.request_timeout();

    // API v1 subscription routes
    let api_v1 = Router::new()
        .route("/subscriptions/current", get(handlers::get_current))
        .route("/subscriptions/plans", get(handlers::list_plans))
        .route("/subscriptions/upgrade/{plan}", post(handlers::upgrade))
        .route("/subscriptions/cancel", patch(handlers::cancel))
        .route("/subscriptions/trial/{plan}", post(handlers::start_trial))
        .route("/subscriptions/usage", get(handlers::get_usage))
        .route("/subscriptions/access/{feature}", get(handlers::check_access));

    // Health routes (no timeout - must always respond quickly)
    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready));

    // Metrics route (no timeout)
    let metrics_route = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    // Build middleware stack (order matters - outermost first)
    let middleware = ServiceBuilder::new()
        // Request ID propagation (outermost)
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        // Tracing with request details
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // CORS
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        // Request timeout (innermost - closest to handler)
        .layer(TimeoutLayer::new(request_timeout));

    // Combine all routes
    Router::new()
        .nest("/api/v1", api_v1)
        .layer(middleware)
        .merge(health_routes) // Health routes without timeout
        .merge(metrics_route) // Metrics route without timeout
        .with_state(state)
}

fn setup_metrics() -> anyhow::Result<PrometheusHandle> {
    // Latency buckets for subscription operations; most complete in <100ms
    let latency_buckets = &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.2, 0.5, 1.0, 2.5];

    let builder = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            latency_buckets,
        )?
        .set_buckets_for_metric(
            Matcher::Full("subscription_operation_duration_seconds".to_string()),
            latency_buckets,
        )?;

    let handle = builder.install_recorder()?;

    // Register metrics with descriptions
    metrics::describe_counter!(
        "subscription_upgrades_total",
        "Total plan changes by target plan"
    );
    metrics::describe_counter!(
        "subscription_cancellations_total",
        "Total subscriptions cancelled"
    );
    metrics::describe_counter!(
        "subscription_trials_started_total",
        "Total trials started by plan"
    );
    metrics::describe_counter!(
        "entitlement_denials_total",
        "Total entitlement denials by feature and reason"
    );
    metrics::describe_counter!(
        "entitlement_usage_tracked_total",
        "Total usage events recorded by feature"
    );
    metrics::describe_histogram!(
        "subscription_operation_duration_seconds",
        "Subscription operation latency in seconds by operation type"
    );

    Ok(handle)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
