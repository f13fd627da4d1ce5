//! Third pipeline worker: turns a matched order's fills into trade records,
//! position adjustments, fee breakdowns, blotter updates, and the events
//! every affected team is owed — then completes the coordinator for the
//! team that actually submitted this message's order.
//!
//! A single incoming order can match against several resting orders in one
//! pass (continuous) or several counterparties in one auction (batch). Only
//! the submitting side rides back through the coordinator; every
//! counterparty leg is updated here too, since its owner is never going to
//! see a `SettlementMsg` of their own for this fill.

use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::core::Fill;
use crate::coordinator::ResponseCoordinator;
use crate::events::{EventBus, EventPayload};
use crate::fees::FeeService;
use crate::models::order::{Order, OrderResponse, OrderSide};
use crate::models::phase::Phase;
use crate::models::trade::{AggressorSide, Trade};
use crate::orders::OrderBlotter;
use crate::positions::PositionService;
use crate::teams::TeamRegistry;

use super::messages::SettlementMsg;

fn counterparty(fill: &Fill, own_order_id: Uuid) -> (Uuid, Uuid) {
    if fill.maker_order_id == own_order_id {
        (fill.taker_trader_id, fill.taker_order_id)
    } else {
        (fill.maker_trader_id, fill.maker_order_id)
    }
}

pub fn spawn(
    mut inbox: mpsc::Receiver<SettlementMsg>,
    positions: Arc<PositionService>,
    fees: Arc<FeeService>,
    teams: Arc<TeamRegistry>,
    blotter: Arc<OrderBlotter>,
    events: Arc<EventBus>,
    coordinator: Arc<ResponseCoordinator>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = inbox.recv().await {
            coordinator.advance(msg.request_id, "settling");
            let aggressor = if msg.phase == Phase::Continuous {
                match msg.order.side {
                    OrderSide::Buy => AggressorSide::Buy,
                    OrderSide::Sell => AggressorSide::Sell,
                }
            } else {
                AggressorSide::Auction
            };

            let mut own_fees = Vec::with_capacity(msg.outcome.fills.len());

            for fill in &msg.outcome.fills {
                let (counterparty_trader_id, counterparty_order_id) = counterparty(fill, msg.order.order_id);
                let own_is_buyer = msg.order.side == OrderSide::Buy;

                let (buyer_id, seller_id, buy_order_id, sell_order_id) = if own_is_buyer {
                    (msg.order.trader_id, counterparty_trader_id, msg.order.order_id, counterparty_order_id)
                } else {
                    (counterparty_trader_id, msg.order.trader_id, counterparty_order_id, msg.order.order_id)
                };

                let trade = Trade {
                    trade_id: Uuid::new_v4(),
                    instrument_id: msg.order.instrument_id.clone(),
                    buy_order_id,
                    sell_order_id,
                    buyer_id,
                    seller_id,
                    price: fill.price,
                    quantity: fill.quantity,
                    timestamp: fill.timestamp,
                    aggressor_side: aggressor,
                };
                positions.apply_trade(&trade);

                let notional = fill.price * rust_decimal::Decimal::from(fill.quantity);
                own_fees.push(fees.fee_for_side(msg.role, notional, own_is_buyer, aggressor));

                if let Some(updated) = blotter.apply_fill(counterparty_order_id, fill.quantity) {
                    if let Some(summary) = teams.lookup(counterparty_trader_id) {
                        let counterparty_fee = fees.fee_for_side(summary.role, notional, !own_is_buyer, aggressor);
                        let mut response: OrderResponse = updated.into();
                        response.average_price = Some(fill.price);
                        response.fees = vec![counterparty_fee];
                        events.publish(EventPayload::ExecutionReport {
                            team_id: counterparty_trader_id,
                            order: response,
                        });
                    }
                }
            }

            let own_order = Order {
                order_id: msg.order.order_id,
                client_order_id: msg.order.client_order_id.clone(),
                instrument_id: msg.order.instrument_id.clone(),
                trader_id: msg.order.trader_id,
                side: msg.order.side,
                order_type: msg.order.order_type,
                price: msg.order.price,
                quantity: msg.order.quantity,
                remaining_quantity: msg.outcome.remaining_quantity,
                status: msg.outcome.status,
                submission_timestamp: msg.order.submission_timestamp,
            };
            blotter.upsert(own_order.clone());

            let mut response: OrderResponse = own_order.into();
            response.average_price = msg.outcome.average_price;
            response.fees = own_fees;

            let event = if msg.outcome.fills.is_empty() {
                EventPayload::NewOrderAck { team_id: msg.order.trader_id, order: response.clone() }
            } else {
                EventPayload::ExecutionReport { team_id: msg.order.trader_id, order: response.clone() }
            };
            events.publish(event);

            coordinator.complete_ok(msg.request_id, response);
        }
        tracing::warn!("settlement stage stopped: inbox closed");
    })
}
