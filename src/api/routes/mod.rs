//! Wires the six operations of §6 under `/api/v1`. Registration is public;
//! everything else requires a Bearer api key.

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

use crate::api::handlers;
use crate::auth_middleware::auth_middleware;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let public_routes = Router::new()
        .route("/teams", post(handlers::team::register_team))
        .route("/instruments", post(handlers::team::list_instrument));

    let protected_routes = Router::new()
        .route("/orders", post(handlers::order::submit_order))
        .route("/orders/:order_id", delete(handlers::order::cancel_order))
        .route("/orders/open", get(handlers::account::get_open_orders))
        .route("/positions", get(handlers::account::get_positions))
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new().merge(public_routes).merge(protected_routes)
}
