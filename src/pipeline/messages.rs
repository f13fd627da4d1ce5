//! Messages passed between pipeline workers. Each stage owns the receiving
//! end of one channel and the sending end of the next; a request rides
//! through validator -> matching -> settlement, picking up more context at
//! each stage rather than being re-fetched.
//!
//! `OrderCommand` is the `kind ∈ {new, cancel}` discriminant on the order
//! queue entry message: both a new order and a cancellation enter through
//! the same queue and the same validator/matching stages, since matching
//! is the only thing allowed to touch a book.

use uuid::Uuid;

use crate::core::MatchOutcome;
use crate::models::order::Order;
use crate::models::phase::Phase;
use crate::models::team::Role;

pub enum OrderCommand {
    Submit(Order),
    Cancel { order_id: Uuid, instrument_id: String },
}

pub struct OrderRequestMsg {
    pub request_id: Uuid,
    pub trader_id: Uuid,
    pub role: Role,
    pub command: OrderCommand,
}

pub struct MatchRequestMsg {
    pub request_id: Uuid,
    pub trader_id: Uuid,
    pub role: Role,
    pub command: OrderCommand,
}

pub struct SettlementMsg {
    pub request_id: Uuid,
    pub order: Order,
    pub role: Role,
    pub outcome: MatchOutcome,
    pub phase: Phase,
}
