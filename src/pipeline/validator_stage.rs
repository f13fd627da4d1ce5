//! First pipeline worker: applies the role's constraint list to an incoming
//! order before it ever reaches a book. Rejections complete the coordinator
//! immediately and never reach the matching stage.

use std::sync::Arc;
use tokio::sync::mpsc;

use crate::api::response::AppError;
use crate::constraints::{ConstraintRegistry, ValidationContext};
use crate::coordinator::ResponseCoordinator;
use crate::positions::PositionService;
use crate::rate_limit::RateLimiter;
use crate::venue::Venue;

use super::messages::{MatchRequestMsg, OrderCommand, OrderRequestMsg};

pub fn spawn(
    mut inbox: mpsc::Receiver<OrderRequestMsg>,
    outbox: mpsc::Sender<MatchRequestMsg>,
    constraints: Arc<ConstraintRegistry>,
    positions: Arc<PositionService>,
    rate_limiter: Arc<RateLimiter>,
    venue: Arc<Venue>,
    coordinator: Arc<ResponseCoordinator>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = inbox.recv().await {
            coordinator.advance(msg.request_id, "validating");
            // Only a new submission runs the constraint registry; a
            // cancellation carries no order to validate against position or
            // rate limits and rides straight through to matching.
            if let OrderCommand::Submit(order) = &msg.command {
                let phase = venue.current_phase();
                let ctx = ValidationContext { order, trader_id: msg.trader_id, phase };
                if let Err(violation) = constraints.validate(msg.role, &ctx, &positions, &rate_limiter) {
                    coordinator.complete_err(
                        msg.request_id,
                        AppError::bad_request(violation.code, violation.message),
                    );
                    continue;
                }
            }
            if outbox
                .send(MatchRequestMsg {
                    request_id: msg.request_id,
                    trader_id: msg.trader_id,
                    role: msg.role,
                    command: msg.command,
                })
                .await
                .is_err()
            {
                tracing::error!("matching stage inbox closed, dropping validated order");
                break;
            }
        }
        tracing::warn!("validator stage stopped: inbox closed");
    })
}
