//! Account query operations (§6 ops 4 and 5): open orders and positions.
//! Both read straight from in-memory services; neither touches the
//! pipeline, since there is no validation or matching to do.

use axum::{extract::State, Extension, Json};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::response::{AppError, Envelope};
use crate::auth_middleware::AuthenticatedTeam;
use crate::models::order::OrderResponse;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct OpenOrdersResponse {
    pub orders: Vec<OrderResponse>,
}

pub async fn get_open_orders(
    State(state): State<Arc<AppState>>,
    Extension(team): Extension<AuthenticatedTeam>,
) -> Result<Json<Envelope<OpenOrdersResponse>>, AppError> {
    let orders = state.blotter.open_orders(team.team_id).into_iter().map(OrderResponse::from).collect();
    Ok(Json(Envelope::ok(Uuid::new_v4().to_string(), None, OpenOrdersResponse { orders })))
}

#[derive(Debug, Serialize)]
pub struct PositionsResponse {
    pub positions: HashMap<String, i64>,
}

pub async fn get_positions(
    State(state): State<Arc<AppState>>,
    Extension(team): Extension<AuthenticatedTeam>,
) -> Result<Json<Envelope<PositionsResponse>>, AppError> {
    let positions = state.positions.snapshot(team.team_id);
    Ok(Json(Envelope::ok(Uuid::new_v4().to_string(), None, PositionsResponse { positions })))
}
