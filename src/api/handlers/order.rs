//! Order submission and cancellation (§6 ops 2 and 3). Handlers only
//! authenticate, validate shape, register a coordinator slot, and enqueue —
//! every business decision happens downstream in the pipeline.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::response::{AppError, Envelope};
use crate::auth_middleware::AuthenticatedTeam;
use crate::models::order::{Order, OrderResponse, OrderStatus, OrderType, SubmitOrderRequest};
use crate::pipeline::messages::{OrderCommand, OrderRequestMsg};
use crate::AppState;

fn validate_submission(req: &SubmitOrderRequest) -> Result<(), AppError> {
    if req.quantity <= 0 {
        return Err(AppError::bad_request("INVALID_QUANTITY", "quantity must be positive"));
    }
    match req.order_type {
        OrderType::Limit => {
            let Some(price) = req.price else {
                return Err(AppError::bad_request("MISSING_PRICE", "limit orders require a price"));
            };
            if price <= rust_decimal::Decimal::ZERO {
                return Err(AppError::bad_request("INVALID_PRICE", "price must be positive"));
            }
        }
        OrderType::Market => {}
    }
    Ok(())
}

pub async fn submit_order(
    State(state): State<Arc<AppState>>,
    Extension(team): Extension<AuthenticatedTeam>,
    Json(req): Json<SubmitOrderRequest>,
) -> Result<Json<Envelope<OrderResponse>>, AppError> {
    validate_submission(&req)?;

    if !state.venue.has_instrument(&req.instrument_id) {
        return Err(AppError::bad_request("INVALID_INSTRUMENT", format!("no such instrument: {}", req.instrument_id)));
    }

    let order = Order {
        order_id: Uuid::new_v4(),
        client_order_id: req.client_order_id,
        instrument_id: req.instrument_id,
        trader_id: team.team_id,
        side: req.side,
        order_type: req.order_type,
        price: req.price,
        quantity: req.quantity,
        remaining_quantity: req.quantity,
        status: OrderStatus::New,
        submission_timestamp: Utc::now(),
    };

    let Some((request_id, receiver)) = state.coordinator.register() else {
        return Err(AppError::service_unavailable("too many in-flight requests"));
    };

    crate::metrics::record_order_submitted(&team.role.to_string(), &order.side.to_string(), &order.order_type.to_string());

    let msg = OrderRequestMsg {
        request_id,
        trader_id: team.team_id,
        role: team.role,
        command: OrderCommand::Submit(order),
    };

    if tokio::time::timeout(state.config.order_queue_timeout, state.pipeline_entry.send(msg)).await.is_err() {
        crate::metrics::record_order_rejected("queue_timeout");
        return Err(AppError::service_unavailable("order queue is full"));
    }

    let response = state.coordinator.wait(request_id, receiver).await?;
    let order_id = response.order_id;
    Ok(Json(Envelope::ok(request_id.to_string(), Some(order_id), response)))
}

pub async fn cancel_order(
    State(state): State<Arc<AppState>>,
    Extension(team): Extension<AuthenticatedTeam>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Envelope<OrderResponse>>, AppError> {
    // Looking up the instrument id here is a read, not a mutation — the
    // cancellation itself still rides the order queue through the matching
    // stage, the only place allowed to touch a book.
    let Some(order) = state.blotter.get(order_id) else {
        return Err(AppError::bad_request("CANCEL_FAILED", "order not found or not cancellable"));
    };
    if order.trader_id != team.team_id {
        return Err(AppError::bad_request("CANCEL_FAILED", "order not found or not cancellable"));
    }
    let instrument_id = order.instrument_id.clone();

    let Some((request_id, receiver)) = state.coordinator.register() else {
        return Err(AppError::service_unavailable("too many in-flight requests"));
    };

    let msg = OrderRequestMsg {
        request_id,
        trader_id: team.team_id,
        role: team.role,
        command: OrderCommand::Cancel { order_id, instrument_id },
    };

    if tokio::time::timeout(state.config.order_queue_timeout, state.pipeline_entry.send(msg)).await.is_err() {
        return Err(AppError::service_unavailable("order queue is full"));
    }

    let response = state.coordinator.wait(request_id, receiver).await?;
    Ok(Json(Envelope::ok(request_id.to_string(), Some(order_id), response)))
}
