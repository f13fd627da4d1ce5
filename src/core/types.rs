//! Shared types for the order book and matching engines.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::cmp::Ordering;
use uuid::Uuid;

use crate::models::order::OrderStatus;

/// Fixed-point price representation (8 decimal places) so price levels can
/// be ordered exactly in a `BTreeMap` without floating-point or `Decimal`
/// comparison surprises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PriceLevel(i64);

const SCALE: i64 = 100_000_000;

impl PriceLevel {
    pub fn from_decimal(price: Decimal) -> Self {
        let scaled = price * Decimal::from(SCALE);
        let truncated = scaled.trunc();
        let value = truncated.mantissa() / 10i128.pow(truncated.scale());
        PriceLevel(value as i64)
    }

    pub fn to_decimal(self) -> Decimal {
        Decimal::from(self.0) / Decimal::from(SCALE)
    }

    pub fn raw(self) -> i64 {
        self.0
    }
}

impl Ord for PriceLevel {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl PartialOrd for PriceLevel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// A resting order as held by an order book. The book never looks at
/// anything beyond what it needs to match and report fills; trader
/// ownership, fees, and positions are handled by the services above it.
#[derive(Debug, Clone)]
pub struct OrderEntry {
    pub order_id: Uuid,
    pub trader_id: Uuid,
    pub client_order_id: Option<String>,
    pub side: Side,
    pub price: Decimal,
    pub original_quantity: i64,
    pub remaining_quantity: i64,
    pub submission_timestamp: DateTime<Utc>,
}

/// A single fill produced while matching one incoming order. `maker` is
/// always the resting side; in batch auctions the incoming order is also
/// treated as a maker (see `MatchOutcome::aggressor_side`).
#[derive(Debug, Clone)]
pub struct Fill {
    pub maker_order_id: Uuid,
    pub maker_trader_id: Uuid,
    pub taker_order_id: Uuid,
    pub taker_trader_id: Uuid,
    pub price: Decimal,
    pub quantity: i64,
    pub timestamp: DateTime<Utc>,
}

/// Result of submitting one order to a matching engine.
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    pub order_id: Uuid,
    pub status: OrderStatus,
    pub fills: Vec<Fill>,
    pub remaining_quantity: i64,
    pub average_price: Option<Decimal>,
}

impl MatchOutcome {
    pub fn average_price_of(fills: &[Fill]) -> Option<Decimal> {
        if fills.is_empty() {
            return None;
        }
        let total_qty: i64 = fills.iter().map(|f| f.quantity).sum();
        if total_qty == 0 {
            return None;
        }
        let weighted: Decimal = fills
            .iter()
            .map(|f| f.price * Decimal::from(f.quantity))
            .sum();
        Some(weighted / Decimal::from(total_qty))
    }
}

/// An order buffered in the batch engine's pending queue. Unlike
/// `OrderEntry`, price may be absent (a market order participating in the
/// auction at any clearing price).
#[derive(Debug, Clone)]
pub struct PendingOrder {
    pub order_id: Uuid,
    pub trader_id: Uuid,
    pub client_order_id: Option<String>,
    pub side: Side,
    pub price: Option<Decimal>,
    pub quantity: i64,
    pub submission_timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct OrderbookSnapshot {
    pub instrument_id: String,
    pub bids: Vec<(Decimal, i64)>,
    pub asks: Vec<(Decimal, i64)>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum MatchingError {
    #[error("unknown instrument: {0}")]
    UnknownInstrument(String),

    #[error("order not found: {0}")]
    OrderNotFound(Uuid),

    #[error("order {0} is not owned by the requesting trader")]
    NotOwner(Uuid),

    #[error("market order rejected: insufficient liquidity")]
    InsufficientLiquidity,

    #[error("internal matching error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn price_level_roundtrips() {
        let price = dec!(97500.50);
        let level = PriceLevel::from_decimal(price);
        assert_eq!(level.to_decimal(), price);
    }

    #[test]
    fn price_level_orders_numerically() {
        let p1 = PriceLevel::from_decimal(dec!(100.0));
        let p2 = PriceLevel::from_decimal(dec!(200.0));
        assert!(p1 < p2);
    }

    #[test]
    fn average_price_is_quantity_weighted() {
        let now = Utc::now();
        let fills = vec![
            Fill {
                maker_order_id: Uuid::new_v4(),
                maker_trader_id: Uuid::new_v4(),
                taker_order_id: Uuid::new_v4(),
                taker_trader_id: Uuid::new_v4(),
                price: dec!(100),
                quantity: 1,
                timestamp: now,
            },
            Fill {
                maker_order_id: Uuid::new_v4(),
                maker_trader_id: Uuid::new_v4(),
                taker_order_id: Uuid::new_v4(),
                taker_trader_id: Uuid::new_v4(),
                price: dec!(101),
                quantity: 1,
                timestamp: now,
            },
        ];
        assert_eq!(MatchOutcome::average_price_of(&fills), Some(dec!(100.5)));
    }
}
