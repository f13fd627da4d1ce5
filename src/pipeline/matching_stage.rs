//! Second pipeline worker: owns the only path into the matching engine.
//! Serializing every order through one task gives the book its price-time
//! priority without an explicit per-instrument lock at this layer.
//!
//! Phase transitions are checked piggyback on this worker's loop — after
//! every queue read, and on a timeout when the queue is idle — rather than
//! running a separate scheduler task that would need its own coordination
//! with matching.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::api::response::AppError;
use crate::coordinator::ResponseCoordinator;
use crate::events::{EventBus, EventPayload};
use crate::models::order::{OrderResponse, OrderStatus};
use crate::models::phase::Phase;
use crate::orders::OrderBlotter;
use crate::venue::{Venue, VenueError};

use super::messages::{MatchRequestMsg, OrderCommand, SettlementMsg};

/// Resolve the current phase, fire any due transition action, and publish
/// the events the crossing owes subscribers. A crossing into `closed` owes
/// an `order_cancelled` event per order the venue just drained, since the
/// venue itself has no event bus to publish through.
fn check_and_announce(venue: &Venue, blotter: &OrderBlotter, events: &EventBus, last_phase: &mut Phase) {
    let phase = venue.check_phase_transitions();
    if phase == *last_phase {
        return;
    }
    let previous = *last_phase;
    *last_phase = phase;
    crate::metrics::record_phase_transition(&phase.to_string());
    events.publish(EventPayload::PhaseChange { phase });

    if phase == Phase::Closed && previous != Phase::Closed {
        for order in blotter.drain_all() {
            events.publish(EventPayload::OrderCancelled {
                team_id: order.trader_id,
                order_id: order.order_id,
                instrument_id: order.instrument_id,
            });
        }
    }
}

pub fn spawn(
    mut inbox: mpsc::Receiver<MatchRequestMsg>,
    outbox: mpsc::Sender<SettlementMsg>,
    venue: Arc<Venue>,
    coordinator: Arc<ResponseCoordinator>,
    blotter: Arc<OrderBlotter>,
    events: Arc<EventBus>,
    phase_check_interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut last_phase = venue.check_phase_transitions();
        loop {
            let next = tokio::time::timeout(phase_check_interval, inbox.recv()).await;
            let msg = match next {
                Ok(Some(msg)) => msg,
                Ok(None) => break,
                Err(_) => {
                    check_and_announce(&venue, &blotter, &events, &mut last_phase);
                    continue;
                }
            };

            check_and_announce(&venue, &blotter, &events, &mut last_phase);
            coordinator.advance(msg.request_id, "matching");

            match msg.command {
                OrderCommand::Submit(order) => match venue.submit(order.clone()) {
                    Ok(outcome) => {
                        if outbox
                            .send(SettlementMsg {
                                request_id: msg.request_id,
                                order,
                                role: msg.role,
                                outcome: outcome.outcome,
                                phase: outcome.phase,
                            })
                            .await
                            .is_err()
                        {
                            tracing::error!("settlement stage inbox closed, dropping matched order");
                            break;
                        }
                    }
                    Err(VenueError::MarketClosed(phase)) => {
                        coordinator.complete_err(
                            msg.request_id,
                            AppError::bad_request("MARKET_CLOSED", format!("order entry is not permitted during {phase}")),
                        );
                    }
                    Err(VenueError::AuctionInProgress) => {
                        coordinator.complete_err(
                            msg.request_id,
                            AppError::bad_request(
                                "AUCTION_IN_PROGRESS",
                                "order entry is not permitted while the opening auction is running",
                            ),
                        );
                    }
                    Err(VenueError::UnknownInstrument(id)) => {
                        coordinator.complete_err(
                            msg.request_id,
                            AppError::not_found("UNKNOWN_INSTRUMENT", format!("no such instrument: {id}")),
                        );
                    }
                    Err(err) => {
                        coordinator.complete_err(msg.request_id, AppError::internal("MATCHING_ERROR", err.to_string()));
                    }
                },
                OrderCommand::Cancel { order_id, instrument_id } => {
                    match venue.cancel(&instrument_id, order_id, msg.trader_id) {
                        Ok(()) => match blotter.remove(order_id) {
                            Some(mut cancelled) => {
                                cancelled.status = OrderStatus::Cancelled;
                                crate::metrics::record_order_cancelled();
                                events.publish(EventPayload::OrderCancelled {
                                    team_id: msg.trader_id,
                                    order_id,
                                    instrument_id: cancelled.instrument_id.clone(),
                                });
                                let response: OrderResponse = cancelled.into();
                                coordinator.complete_ok(msg.request_id, response);
                            }
                            None => coordinator.complete_err(
                                msg.request_id,
                                AppError::bad_request("CANCEL_FAILED", "order not found or not cancellable"),
                            ),
                        },
                        Err(_) => coordinator.complete_err(
                            msg.request_id,
                            AppError::bad_request("CANCEL_FAILED", "order not found or not cancellable"),
                        ),
                    }
                }
            }
        }
        tracing::warn!("matching stage stopped: inbox closed");
    })
}
