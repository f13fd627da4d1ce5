//! Thread-safe team position map: `team_id -> instrument_id -> signed qty`.

use dashmap::DashMap;
use uuid::Uuid;

use crate::models::order::OrderSide;
use crate::models::trade::Trade;

pub struct PositionService {
    positions: DashMap<(Uuid, String), i64>,
}

impl PositionService {
    pub fn new() -> Self {
        Self {
            positions: DashMap::new(),
        }
    }

    pub fn get(&self, team_id: Uuid, instrument_id: &str) -> i64 {
        self.positions
            .get(&(team_id, instrument_id.to_string()))
            .map(|v| *v)
            .unwrap_or(0)
    }

    pub fn snapshot(&self, team_id: Uuid) -> std::collections::HashMap<String, i64> {
        self.positions
            .iter()
            .filter(|entry| entry.key().0 == team_id)
            .map(|entry| (entry.key().1.clone(), *entry.value()))
            .collect()
    }

    pub fn portfolio_abs_total(&self, team_id: Uuid) -> i64 {
        self.positions
            .iter()
            .filter(|entry| entry.key().0 == team_id)
            .map(|entry| entry.value().abs())
            .sum()
    }

    fn adjust(&self, team_id: Uuid, instrument_id: &str, delta: i64) {
        *self
            .positions
            .entry((team_id, instrument_id.to_string()))
            .or_insert(0) += delta;
    }

    /// Apply one trade to both sides of the position map atomically per
    /// side (each side's entry is updated under its own DashMap shard
    /// lock; the two updates are independent and order does not matter
    /// because no invariant spans both entries).
    pub fn apply_trade(&self, trade: &Trade) {
        self.adjust(trade.buyer_id, &trade.instrument_id, trade.quantity);
        self.adjust(trade.seller_id, &trade.instrument_id, -trade.quantity);
    }

    /// Position a hypothetical order would produce for its own team, used
    /// by the constraint validator before the order is accepted.
    pub fn hypothetical(&self, team_id: Uuid, instrument_id: &str, side: OrderSide, quantity: i64) -> i64 {
        let current = self.get(team_id, instrument_id);
        match side {
            OrderSide::Buy => current + quantity,
            OrderSide::Sell => current - quantity,
        }
    }
}

impl Default for PositionService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::models::trade::AggressorSide;

    fn trade(buyer: Uuid, seller: Uuid, qty: i64) -> Trade {
        Trade {
            trade_id: Uuid::new_v4(),
            instrument_id: "X".into(),
            buy_order_id: Uuid::new_v4(),
            sell_order_id: Uuid::new_v4(),
            buyer_id: buyer,
            seller_id: seller,
            price: rust_decimal::Decimal::new(100, 0),
            quantity: qty,
            timestamp: Utc::now(),
            aggressor_side: AggressorSide::Buy,
        }
    }

    #[test]
    fn trade_updates_both_sides_oppositely() {
        let service = PositionService::new();
        let buyer = Uuid::new_v4();
        let seller = Uuid::new_v4();
        service.apply_trade(&trade(buyer, seller, 10));
        assert_eq!(service.get(buyer, "X"), 10);
        assert_eq!(service.get(seller, "X"), -10);
    }

    #[test]
    fn hypothetical_does_not_mutate_state() {
        let service = PositionService::new();
        let team = Uuid::new_v4();
        assert_eq!(service.hypothetical(team, "X", OrderSide::Buy, 5), 5);
        assert_eq!(service.get(team, "X"), 0);
    }
}
