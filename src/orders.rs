//! Order blotter: the durable-for-the-process record of every order that is
//! still open, keyed by order id. Positions track net exposure; this tracks
//! the individual orders a team can still see or cancel. Updated by the
//! settlement stage (on fills) and by the cancel path (on removal) — never
//! read by the matching engine itself.

use dashmap::DashMap;
use uuid::Uuid;

use crate::models::order::{Order, OrderStatus};

fn is_open(status: OrderStatus) -> bool {
    matches!(status, OrderStatus::New | OrderStatus::PendingNew | OrderStatus::PartiallyFilled)
}

pub struct OrderBlotter {
    orders: DashMap<Uuid, Order>,
}

impl OrderBlotter {
    pub fn new() -> Self {
        Self { orders: DashMap::new() }
    }

    /// Insert or refresh an order's tracked state. Orders that have reached
    /// a terminal status are dropped rather than stored.
    pub fn upsert(&self, order: Order) {
        if is_open(order.status) {
            self.orders.insert(order.order_id, order);
        } else {
            self.orders.remove(&order.order_id);
        }
    }

    /// Apply a fill to an order already tracked here (the counterparty leg
    /// of a match the settlement stage did not itself submit). Returns the
    /// order's state immediately after the fill, or `None` if this blotter
    /// never saw the order rest (e.g. it was submitted before this process
    /// started, which cannot happen outside of tests).
    pub fn apply_fill(&self, order_id: Uuid, fill_quantity: i64) -> Option<Order> {
        let updated = {
            let mut entry = self.orders.get_mut(&order_id)?;
            entry.remaining_quantity -= fill_quantity;
            entry.status = if entry.remaining_quantity <= 0 {
                OrderStatus::Filled
            } else {
                OrderStatus::PartiallyFilled
            };
            entry.clone()
        };
        if !is_open(updated.status) {
            self.orders.remove(&order_id);
        }
        Some(updated)
    }

    pub fn remove(&self, order_id: Uuid) -> Option<Order> {
        self.orders.remove(&order_id).map(|(_, o)| o)
    }

    pub fn get(&self, order_id: Uuid) -> Option<Order> {
        self.orders.get(&order_id).map(|e| e.clone())
    }

    pub fn open_orders(&self, trader_id: Uuid) -> Vec<Order> {
        self.orders.iter().filter(|e| e.trader_id == trader_id).map(|e| e.value().clone()).collect()
    }

    /// Empty the blotter entirely, returning whatever was still open. Used
    /// on a market-close transition, where the venue has just drained every
    /// book out from under these orders.
    pub fn drain_all(&self) -> Vec<Order> {
        let ids: Vec<Uuid> = self.orders.iter().map(|e| *e.key()).collect();
        ids.into_iter().filter_map(|id| self.orders.remove(&id)).map(|(_, o)| o).collect()
    }
}

impl Default for OrderBlotter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn order(status: OrderStatus, remaining: i64) -> Order {
        Order {
            order_id: Uuid::new_v4(),
            client_order_id: None,
            instrument_id: "X".into(),
            trader_id: Uuid::new_v4(),
            side: crate::models::order::OrderSide::Buy,
            order_type: crate::models::order::OrderType::Limit,
            price: Some(dec!(100)),
            quantity: 10,
            remaining_quantity: remaining,
            status,
            submission_timestamp: Utc::now(),
        }
    }

    #[test]
    fn terminal_status_is_never_stored() {
        let blotter = OrderBlotter::new();
        let filled = order(OrderStatus::Filled, 0);
        let trader = filled.trader_id;
        blotter.upsert(filled);
        assert!(blotter.open_orders(trader).is_empty());
    }

    #[test]
    fn fill_down_to_zero_removes_the_order() {
        let blotter = OrderBlotter::new();
        let resting = order(OrderStatus::New, 10);
        let id = resting.order_id;
        blotter.upsert(resting);
        let updated = blotter.apply_fill(id, 10).unwrap();
        assert_eq!(updated.status, OrderStatus::Filled);
        assert!(blotter.get(id).is_none());
    }

    #[test]
    fn partial_fill_keeps_the_order_open() {
        let blotter = OrderBlotter::new();
        let resting = order(OrderStatus::New, 10);
        let id = resting.order_id;
        blotter.upsert(resting);
        let updated = blotter.apply_fill(id, 4).unwrap();
        assert_eq!(updated.status, OrderStatus::PartiallyFilled);
        assert_eq!(updated.remaining_quantity, 6);
        assert!(blotter.get(id).is_some());
    }
}
