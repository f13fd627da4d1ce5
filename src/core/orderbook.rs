//! Per-instrument order book: bid/ask ladders with O(1) cancel-by-id and
//! strict price-time priority within a level.

use dashmap::DashMap;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, VecDeque};
use uuid::Uuid;

use super::types::{Fill, MatchingError, OrderEntry, OrderbookSnapshot, PriceLevel, Side};

pub struct Orderbook {
    instrument_id: String,
    bids: RwLock<BTreeMap<PriceLevel, VecDeque<OrderEntry>>>,
    asks: RwLock<BTreeMap<PriceLevel, VecDeque<OrderEntry>>>,
    /// order_id -> (side, price level) for cancel-by-id without a book scan.
    index: DashMap<Uuid, (Side, PriceLevel)>,
}

impl Orderbook {
    pub fn new(instrument_id: impl Into<String>) -> Self {
        Self {
            instrument_id: instrument_id.into(),
            bids: RwLock::new(BTreeMap::new()),
            asks: RwLock::new(BTreeMap::new()),
            index: DashMap::new(),
        }
    }

    pub fn instrument_id(&self) -> &str {
        &self.instrument_id
    }

    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.read().keys().next_back().map(|p| p.to_decimal())
    }

    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.read().keys().next().map(|p| p.to_decimal())
    }

    /// Rest an order directly without matching — used during `pre_open`
    /// where entry is allowed but matching is not yet enabled.
    pub fn rest(&self, entry: OrderEntry) {
        let price_level = PriceLevel::from_decimal(entry.price);
        let side = entry.side;
        let order_id = entry.order_id;
        let book = match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        };
        book.write().entry(price_level).or_default().push_back(entry);
        self.index.insert(order_id, (side, price_level));
    }

    pub fn cancel(&self, order_id: Uuid, trader_id: Uuid) -> Result<OrderEntry, MatchingError> {
        let (side, price_level) = self
            .index
            .get(&order_id)
            .map(|r| *r)
            .ok_or(MatchingError::OrderNotFound(order_id))?;

        let book = match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        };
        let mut guard = book.write();
        let queue = guard
            .get_mut(&price_level)
            .ok_or(MatchingError::OrderNotFound(order_id))?;
        let pos = queue
            .iter()
            .position(|o| o.order_id == order_id)
            .ok_or(MatchingError::OrderNotFound(order_id))?;

        if queue[pos].trader_id != trader_id {
            return Err(MatchingError::NotOwner(order_id));
        }

        let entry = queue.remove(pos).expect("position just located");
        if queue.is_empty() {
            guard.remove(&price_level);
        }
        drop(guard);
        self.index.remove(&order_id);
        Ok(entry)
    }

    /// Remove every resting order from both sides, e.g. on market close.
    pub fn drain_all(&self) -> Vec<OrderEntry> {
        let mut drained = Vec::new();
        {
            let mut bids = self.bids.write();
            for (_, mut queue) in std::mem::take(&mut *bids) {
                drained.append(&mut Vec::from(std::mem::take(&mut queue)));
            }
        }
        {
            let mut asks = self.asks.write();
            for (_, mut queue) in std::mem::take(&mut *asks) {
                drained.append(&mut Vec::from(std::mem::take(&mut queue)));
            }
        }
        self.index.clear();
        drained
    }

    /// Match an incoming order against the resting opposite side, walking
    /// price levels from the best outward. Returns fills and whatever
    /// quantity remains unfilled (callers decide whether to rest it).
    pub fn match_incoming(
        &self,
        taker_order_id: Uuid,
        taker_trader_id: Uuid,
        side: Side,
        mut quantity: i64,
        limit_price: Option<Decimal>,
        now: chrono::DateTime<chrono::Utc>,
    ) -> (Vec<Fill>, i64) {
        let mut fills = Vec::new();
        let opposite = match side.opposite() {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        };

        let mut book = opposite.write();
        let levels: Vec<PriceLevel> = match side {
            Side::Buy => book.keys().copied().collect(),
            Side::Sell => book.keys().rev().copied().collect(),
        };

        for price_level in levels {
            if quantity <= 0 {
                break;
            }
            let level_price = price_level.to_decimal();
            if let Some(limit) = limit_price {
                let crosses = match side {
                    Side::Buy => level_price <= limit,
                    Side::Sell => level_price >= limit,
                };
                if !crosses {
                    break;
                }
            }

            let Some(queue) = book.get_mut(&price_level) else {
                continue;
            };
            while let Some(maker) = queue.front_mut() {
                if quantity <= 0 {
                    break;
                }
                let fill_qty = quantity.min(maker.remaining_quantity);
                let fill = Fill {
                    maker_order_id: maker.order_id,
                    maker_trader_id: maker.trader_id,
                    taker_order_id,
                    taker_trader_id,
                    price: maker.price,
                    quantity: fill_qty,
                    timestamp: now,
                };
                fills.push(fill);
                quantity -= fill_qty;
                maker.remaining_quantity -= fill_qty;

                if maker.remaining_quantity == 0 {
                    let maker_id = maker.order_id;
                    queue.pop_front();
                    self.index.remove(&maker_id);
                }
            }
            if queue.is_empty() {
                book.remove(&price_level);
            }
        }

        (fills, quantity)
    }

    /// Insert residual quantity from an incoming order that has already
    /// been partially matched.
    pub fn rest_residual(&self, mut entry: OrderEntry, remaining: i64) {
        entry.remaining_quantity = remaining;
        self.rest(entry);
    }

    pub fn snapshot(&self, depth: usize) -> OrderbookSnapshot {
        let bids = {
            let guard = self.bids.read();
            guard
                .iter()
                .rev()
                .take(depth)
                .map(|(level, queue)| {
                    let total: i64 = queue.iter().map(|o| o.remaining_quantity).sum();
                    (level.to_decimal(), total)
                })
                .collect()
        };
        let asks = {
            let guard = self.asks.read();
            guard
                .iter()
                .take(depth)
                .map(|(level, queue)| {
                    let total: i64 = queue.iter().map(|o| o.remaining_quantity).sum();
                    (level.to_decimal(), total)
                })
                .collect()
        };
        OrderbookSnapshot {
            instrument_id: self.instrument_id.clone(),
            bids,
            asks,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn has_order(&self, order_id: Uuid) -> bool {
        self.index.contains_key(&order_id)
    }

    /// Drain every resting order on both sides into (side, orders) pairs,
    /// grouped by price ascending/descending as the book stores them —
    /// used by the batch engine to build its pending-buffer view.
    pub fn take_side(&self, side: Side) -> Vec<OrderEntry> {
        let book = match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        };
        let mut guard = book.write();
        let mut out = Vec::new();
        for (_, mut queue) in std::mem::take(&mut *guard) {
            out.append(&mut Vec::from(std::mem::take(&mut queue)));
        }
        for entry in &out {
            self.index.remove(&entry.order_id);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn entry(price: Decimal, qty: i64, side: Side) -> OrderEntry {
        OrderEntry {
            order_id: Uuid::new_v4(),
            trader_id: Uuid::new_v4(),
            client_order_id: None,
            side,
            price,
            original_quantity: qty,
            remaining_quantity: qty,
            submission_timestamp: Utc::now(),
        }
    }

    #[test]
    fn rest_and_cancel_round_trips() {
        let book = Orderbook::new("AAPL-240119-C-150");
        let order = entry(dec!(100), 10, Side::Buy);
        let id = order.order_id;
        let trader = order.trader_id;
        book.rest(order);
        assert!(book.has_order(id));
        let cancelled = book.cancel(id, trader).unwrap();
        assert_eq!(cancelled.order_id, id);
        assert!(!book.has_order(id));
    }

    #[test]
    fn cancel_by_non_owner_is_rejected() {
        let book = Orderbook::new("X");
        let order = entry(dec!(100), 10, Side::Buy);
        let id = order.order_id;
        book.rest(order);
        let err = book.cancel(id, Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, MatchingError::NotOwner(_)));
    }

    #[test]
    fn match_walks_multiple_levels() {
        let book = Orderbook::new("X");
        let ask1 = entry(dec!(100), 10, Side::Sell);
        let ask1_id = ask1.order_id;
        book.rest(ask1);
        let ask2 = entry(dec!(101), 20, Side::Sell);
        let ask2_id = ask2.order_id;
        book.rest(ask2);

        let (fills, remaining) = book.match_incoming(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Side::Buy,
            15,
            Some(dec!(101)),
            Utc::now(),
        );

        assert_eq!(remaining, 0);
        assert_eq!(fills.len(), 2);
        assert_eq!(fills[0].price, dec!(100));
        assert_eq!(fills[0].quantity, 10);
        assert_eq!(fills[1].price, dec!(101));
        assert_eq!(fills[1].quantity, 5);
        assert!(!book.has_order(ask1_id));
        assert!(book.has_order(ask2_id));
    }

    #[test]
    fn drain_all_empties_both_sides() {
        let book = Orderbook::new("X");
        book.rest(entry(dec!(100), 10, Side::Buy));
        book.rest(entry(dec!(101), 5, Side::Sell));
        let drained = book.drain_all();
        assert_eq!(drained.len(), 2);
        assert_eq!(book.snapshot(10).bids.len(), 0);
        assert_eq!(book.snapshot(10).asks.len(), 0);
    }
}
