use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::get, Router};
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod auth_middleware;
mod config;
mod constraints;
mod coordinator;
mod core;
mod events;
mod fees;
mod metrics;
mod models;
mod orders;
mod phase;
mod pipeline;
mod positions;
mod rate_limit;
mod teams;
mod venue;
mod websocket;

use crate::config::AppConfig;
use crate::constraints::ConstraintRegistry;
use crate::coordinator::ResponseCoordinator;
use crate::events::EventBus;
use crate::fees::FeeService;
use crate::orders::OrderBlotter;
use crate::pipeline::messages::OrderRequestMsg;
use crate::positions::PositionService;
use crate::rate_limit::RateLimiter;
use crate::teams::TeamRegistry;
use crate::venue::Venue;

const EVENT_BUS_CAPACITY: usize = 4096;
const PIPELINE_CHANNEL_CAPACITY: usize = 1024;

pub struct AppState {
    pub config: AppConfig,
    pub teams: Arc<TeamRegistry>,
    pub venue: Arc<Venue>,
    pub coordinator: Arc<ResponseCoordinator>,
    pub positions: Arc<PositionService>,
    pub blotter: Arc<OrderBlotter>,
    pub events: Arc<EventBus>,
    pub pipeline_entry: mpsc::Sender<OrderRequestMsg>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| config.rust_log.clone().into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("starting exchange-core v{}", env!("CARGO_PKG_VERSION"));

    let prometheus_handle = metrics::init_metrics();

    let venue = Arc::new(Venue::new(config.batch_pricing_strategy, config.matching_mode));
    let teams = Arc::new(TeamRegistry::new(&config.auth_signing_key));
    let coordinator = ResponseCoordinator::new(
        config.coordinator_default_timeout,
        config.coordinator_max_pending_requests,
        config.coordinator_cleanup_interval,
    );
    let positions = Arc::new(PositionService::new());
    let constraints = Arc::new(ConstraintRegistry::default_for_roles());
    let fees = Arc::new(FeeService::default_schedule());
    let rate_limiter = RateLimiter::new();
    let blotter = Arc::new(OrderBlotter::new());
    let events = Arc::new(EventBus::new(EVENT_BUS_CAPACITY));

    tracing::info!(mode = ?config.matching_mode, strategy = ?config.batch_pricing_strategy, "venue configured");

    let handles = pipeline::spawn_all(
        constraints,
        positions.clone(),
        rate_limiter,
        venue.clone(),
        coordinator.clone(),
        fees,
        teams.clone(),
        blotter.clone(),
        events.clone(),
        PIPELINE_CHANNEL_CAPACITY,
        config.phase_check_interval,
    );
    tracing::info!("pipeline stages spawned: validator, matching, settlement");

    let server_port = config.server_port;
    let state = Arc::new(AppState {
        config,
        teams,
        venue,
        coordinator,
        positions,
        blotter,
        events,
        pipeline_entry: handles.entry,
    });

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(move || render_metrics(prometheus_handle.clone())))
        .nest("/api/v1", api::routes::create_router(state.clone()))
        .nest("/ws", websocket::routes::create_router(state.clone()))
        .layer(axum::middleware::from_fn_with_state(state.clone(), api::middleware::metrics_middleware))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], server_port));
    tracing::info!("server listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}

async fn render_metrics(handle: metrics_exporter_prometheus::PrometheusHandle) -> String {
    handle.render()
}
