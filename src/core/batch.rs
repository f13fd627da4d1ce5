//! Uniform-clearing-price batch auction used for the opening rotation.
//!
//! Orders submitted while the auction is pending are buffered per
//! instrument (never touching the book). `execute_batch` computes one
//! clearing price per instrument and fills every eligible order at that
//! price, randomizing tie order within a price level so that, over many
//! auctions, competing orders at the same price have an equal chance of
//! being filled.

use dashmap::DashMap;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{RngCore, SeedableRng};
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::models::order::OrderStatus;

use super::orderbook::Orderbook;
use super::types::{Fill, MatchOutcome, OrderEntry, PendingOrder, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PricingStrategy {
    Equilibrium,
    MaximumVolume,
}

#[derive(Debug, Clone)]
pub struct ClearingResult {
    pub clearing_price: Decimal,
    pub max_volume: i64,
    pub price_range: (Decimal, Decimal),
}

impl PricingStrategy {
    pub fn calculate(&self, buys: &[PendingOrder], sells: &[PendingOrder]) -> Option<ClearingResult> {
        match self {
            PricingStrategy::Equilibrium => calculate_equilibrium(buys, sells),
            PricingStrategy::MaximumVolume => calculate_maximum_volume(buys, sells),
        }
    }
}

fn cumulative_buy_qty_at(buys: &[PendingOrder], price: Decimal) -> i64 {
    buys.iter()
        .filter(|o| o.price.map_or(true, |px| px >= price))
        .map(|o| o.quantity)
        .sum()
}

fn cumulative_sell_qty_at(sells: &[PendingOrder], price: Decimal) -> i64 {
    sells
        .iter()
        .filter(|o| o.price.map_or(true, |px| px <= price))
        .map(|o| o.quantity)
        .sum()
}

fn calculate_equilibrium(buys: &[PendingOrder], sells: &[PendingOrder]) -> Option<ClearingResult> {
    let best_bid = buys.iter().filter_map(|o| o.price).max()?;
    let best_ask = sells.iter().filter_map(|o| o.price).min()?;
    if best_bid < best_ask {
        return None;
    }
    let volume = cumulative_buy_qty_at(buys, best_ask).min(cumulative_sell_qty_at(sells, best_ask));
    if volume <= 0 {
        return None;
    }
    Some(ClearingResult {
        clearing_price: best_ask,
        max_volume: volume,
        price_range: (best_ask, best_ask),
    })
}

fn calculate_maximum_volume(buys: &[PendingOrder], sells: &[PendingOrder]) -> Option<ClearingResult> {
    let mut candidates: BTreeSet<Decimal> = BTreeSet::new();
    for o in buys.iter().chain(sells.iter()) {
        if let Some(p) = o.price {
            candidates.insert(p);
        }
    }
    if candidates.is_empty() {
        return None;
    }

    let mut best_volume = 0i64;
    let mut tied_prices: Vec<Decimal> = Vec::new();
    for &price in &candidates {
        let volume = cumulative_buy_qty_at(buys, price).min(cumulative_sell_qty_at(sells, price));
        if volume > best_volume {
            best_volume = volume;
            tied_prices.clear();
            tied_prices.push(price);
        } else if volume == best_volume && volume > 0 {
            tied_prices.push(price);
        }
    }

    if best_volume <= 0 || tied_prices.is_empty() {
        return None;
    }

    let min_tied = *tied_prices.iter().min().unwrap();
    let max_tied = *tied_prices.iter().max().unwrap();
    let clearing_price = (min_tied + max_tied) / Decimal::from(2);

    Some(ClearingResult {
        clearing_price,
        max_volume: best_volume,
        price_range: (min_tied, max_tied),
    })
}

/// Sort eligible orders into execution priority: best price first, market
/// orders ahead of any limit price, randomized within a tied price level.
fn prioritize(mut orders: Vec<PendingOrder>, side: Side, rng: &mut dyn RngCore) -> Vec<PendingOrder> {
    // Stable sort by price key only; within-key order is randomized after,
    // which is what gives every order at a price an equal shot regardless
    // of submission time.
    orders.shuffle(&mut RngShim(rng));
    orders.sort_by(|a, b| {
        let key = |o: &PendingOrder| -> Option<Decimal> { o.price };
        match (key(a), key(b)) {
            (None, None) => std::cmp::Ordering::Equal,
            (None, Some(_)) => std::cmp::Ordering::Less,
            (Some(_), None) => std::cmp::Ordering::Greater,
            (Some(pa), Some(pb)) => match side {
                Side::Buy => pb.cmp(&pa),
                Side::Sell => pa.cmp(&pb),
            },
        }
    });
    orders
}

/// `SliceRandom::shuffle` wants an `Rng`; this lets us pass a boxed
/// `StdRng` or `thread_rng` through the same prioritization code.
struct RngShim<'a>(&'a mut dyn RngCore);
impl<'a> rand::RngCore for RngShim<'a> {
    fn next_u32(&mut self) -> u32 {
        self.0.next_u32()
    }
    fn next_u64(&mut self) -> u64 {
        self.0.next_u64()
    }
    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.0.fill_bytes(dest)
    }
    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.0.try_fill_bytes(dest)
    }
}

pub struct BatchEngine {
    strategy: PricingStrategy,
    pending: DashMap<String, Vec<PendingOrder>>,
    seed: Option<u64>,
}

impl BatchEngine {
    pub fn new(strategy: PricingStrategy) -> Self {
        Self {
            strategy,
            pending: DashMap::new(),
            seed: None,
        }
    }

    /// Deterministic tie-break order for tests; production auctions always
    /// use `new`, which reseeds the RNG fresh for every auction.
    pub fn with_rng_seed(strategy: PricingStrategy, seed: u64) -> Self {
        Self {
            strategy,
            pending: DashMap::new(),
            seed: Some(seed),
        }
    }

    /// Buffer an order for the next auction. Never touches the book.
    pub fn submit(&self, instrument_id: &str, order: PendingOrder) -> MatchOutcome {
        let order_id = order.order_id;
        let quantity = order.quantity;
        self.pending.entry(instrument_id.to_string()).or_default().push(order);
        MatchOutcome {
            order_id,
            status: OrderStatus::PendingNew,
            fills: Vec::new(),
            remaining_quantity: quantity,
            average_price: None,
        }
    }

    pub fn pending_count(&self, instrument_id: &str) -> usize {
        self.pending.get(instrument_id).map(|v| v.len()).unwrap_or(0)
    }

    /// Run one auction for every instrument with a non-empty pending
    /// buffer, clearing the buffer as it goes.
    pub fn execute_batch(
        &self,
        books: &dashmap::DashMap<String, std::sync::Arc<Orderbook>>,
    ) -> std::collections::HashMap<String, Vec<MatchOutcome>> {
        let mut results = std::collections::HashMap::new();
        let instruments: Vec<String> = self.pending.iter().map(|e| e.key().clone()).collect();

        for instrument_id in instruments {
            let Some((_, orders)) = self.pending.remove(&instrument_id) else {
                continue;
            };
            let Some(book) = books.get(&instrument_id) else {
                continue;
            };
            let outcomes = self.run_auction(&instrument_id, orders, &book);
            results.insert(instrument_id, outcomes);
        }
        results
    }

    fn run_auction(&self, instrument_id: &str, orders: Vec<PendingOrder>, book: &Orderbook) -> Vec<MatchOutcome> {
        let (buys, sells): (Vec<_>, Vec<_>) =
            orders.into_iter().partition(|o| o.side == Side::Buy);

        let mut outcomes: Vec<MatchOutcome> = Vec::new();

        let Some(clearing) = self.strategy.calculate(&buys, &sells) else {
            // No cross this round: everything that is a limit order rests
            // in the book for the continuous session that follows;
            // unfillable market orders are rejected outright.
            for o in buys.into_iter().chain(sells.into_iter()) {
                outcomes.push(self.no_fill_outcome(instrument_id, o, book));
            }
            return outcomes;
        };

        let mut rng: Box<dyn RngCore> = match self.seed {
            Some(seed) => Box::new(StdRng::seed_from_u64(seed)),
            None => Box::new(rand::thread_rng()),
        };

        let eligible_buys: Vec<PendingOrder> = buys
            .iter()
            .filter(|o| o.price.map_or(true, |p| p >= clearing.clearing_price))
            .cloned()
            .collect();
        let ineligible_buys: Vec<PendingOrder> = buys
            .into_iter()
            .filter(|o| !o.price.map_or(true, |p| p >= clearing.clearing_price))
            .collect();

        let eligible_sells: Vec<PendingOrder> = sells
            .iter()
            .filter(|o| o.price.map_or(true, |p| p <= clearing.clearing_price))
            .cloned()
            .collect();
        let ineligible_sells: Vec<PendingOrder> = sells
            .into_iter()
            .filter(|o| !o.price.map_or(true, |p| p <= clearing.clearing_price))
            .collect();

        let mut ordered_buys = prioritize(eligible_buys, Side::Buy, &mut *rng);
        let mut ordered_sells = prioritize(eligible_sells, Side::Sell, &mut *rng);

        let now = chrono::Utc::now();
        let mut fills_by_order: std::collections::HashMap<Uuid, Vec<Fill>> = std::collections::HashMap::new();
        let mut remaining_by_order: std::collections::HashMap<Uuid, i64> = std::collections::HashMap::new();
        for o in ordered_buys.iter().chain(ordered_sells.iter()) {
            remaining_by_order.insert(o.order_id, o.quantity);
        }

        let mut volume_left = clearing.max_volume;
        let mut bi = 0usize;
        let mut si = 0usize;
        while volume_left > 0 && bi < ordered_buys.len() && si < ordered_sells.len() {
            let buy_remaining = *remaining_by_order.get(&ordered_buys[bi].order_id).unwrap();
            let sell_remaining = *remaining_by_order.get(&ordered_sells[si].order_id).unwrap();
            if buy_remaining == 0 {
                bi += 1;
                continue;
            }
            if sell_remaining == 0 {
                si += 1;
                continue;
            }
            let qty = buy_remaining.min(sell_remaining).min(volume_left);
            let buy = &ordered_buys[bi];
            let sell = &ordered_sells[si];
            let fill = Fill {
                maker_order_id: sell.order_id,
                maker_trader_id: sell.trader_id,
                taker_order_id: buy.order_id,
                taker_trader_id: buy.trader_id,
                price: clearing.clearing_price,
                quantity: qty,
                timestamp: now,
            };
            fills_by_order.entry(buy.order_id).or_default().push(fill.clone());
            fills_by_order.entry(sell.order_id).or_default().push(fill);
            *remaining_by_order.get_mut(&buy.order_id).unwrap() -= qty;
            *remaining_by_order.get_mut(&sell.order_id).unwrap() -= qty;
            volume_left -= qty;
        }

        for o in ordered_buys.drain(..).chain(ordered_sells.drain(..)) {
            let remaining = *remaining_by_order.get(&o.order_id).unwrap();
            let fills = fills_by_order.remove(&o.order_id).unwrap_or_default();
            let filled_qty = o.quantity - remaining;
            let status = if filled_qty == o.quantity {
                OrderStatus::Filled
            } else if filled_qty > 0 {
                OrderStatus::PartiallyFilled
            } else if o.price.is_none() {
                OrderStatus::Rejected
            } else {
                OrderStatus::New
            };
            if remaining > 0 && o.price.is_some() {
                book.rest(OrderEntry {
                    order_id: o.order_id,
                    trader_id: o.trader_id,
                    client_order_id: o.client_order_id.clone(),
                    side: o.side,
                    price: o.price.unwrap(),
                    original_quantity: o.quantity,
                    remaining_quantity: remaining,
                    submission_timestamp: o.submission_timestamp,
                });
            }
            let average_price = MatchOutcome::average_price_of(&fills);
            outcomes.push(MatchOutcome {
                order_id: o.order_id,
                status,
                fills,
                remaining_quantity: remaining,
                average_price,
            });
        }

        for o in ineligible_buys.into_iter().chain(ineligible_sells.into_iter()) {
            outcomes.push(self.no_fill_outcome(instrument_id, o, book));
        }

        outcomes
    }

    fn no_fill_outcome(&self, _instrument_id: &str, o: PendingOrder, book: &Orderbook) -> MatchOutcome {
        let status = match o.price {
            Some(price) => {
                book.rest(OrderEntry {
                    order_id: o.order_id,
                    trader_id: o.trader_id,
                    client_order_id: o.client_order_id.clone(),
                    side: o.side,
                    price,
                    original_quantity: o.quantity,
                    remaining_quantity: o.quantity,
                    submission_timestamp: o.submission_timestamp,
                });
                OrderStatus::New
            }
            None => OrderStatus::Rejected,
        };
        MatchOutcome {
            order_id: o.order_id,
            status,
            fills: Vec::new(),
            remaining_quantity: o.quantity,
            average_price: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn pending(side: Side, qty: i64, price: Option<Decimal>) -> PendingOrder {
        PendingOrder {
            order_id: Uuid::new_v4(),
            trader_id: Uuid::new_v4(),
            client_order_id: None,
            side,
            price,
            quantity: qty,
            submission_timestamp: Utc::now(),
        }
    }

    #[test]
    fn maximum_volume_picks_midpoint_of_tied_range() {
        let buys = vec![
            pending(Side::Buy, 10, Some(dec!(102))),
            pending(Side::Buy, 10, Some(dec!(101))),
            pending(Side::Buy, 10, Some(dec!(100))),
        ];
        let sells = vec![
            pending(Side::Sell, 10, Some(dec!(98))),
            pending(Side::Sell, 10, Some(dec!(99))),
            pending(Side::Sell, 10, Some(dec!(100))),
        ];
        let result = calculate_maximum_volume(&buys, &sells).unwrap();
        assert_eq!(result.max_volume, 20);
        assert_eq!(result.clearing_price, dec!(100));
    }

    #[test]
    fn equilibrium_uses_best_ask_price() {
        let buys = vec![pending(Side::Buy, 10, Some(dec!(105)))];
        let sells = vec![pending(Side::Sell, 10, Some(dec!(100)))];
        let result = calculate_equilibrium(&buys, &sells).unwrap();
        assert_eq!(result.clearing_price, dec!(100));
        assert_eq!(result.max_volume, 10);
    }

    #[test]
    fn auction_fills_at_uniform_clearing_price() {
        let engine = BatchEngine::with_rng_seed(PricingStrategy::MaximumVolume, 7);
        let books: dashmap::DashMap<String, std::sync::Arc<Orderbook>> = dashmap::DashMap::new();
        books.insert("X".into(), std::sync::Arc::new(Orderbook::new("X")));

        engine.submit("X", pending(Side::Buy, 10, Some(dec!(101))));
        engine.submit("X", pending(Side::Sell, 10, Some(dec!(99))));

        let results = engine.execute_batch(&books);
        let outcomes = &results["X"];
        assert_eq!(outcomes.len(), 2);
        for outcome in outcomes {
            assert_eq!(outcome.status, OrderStatus::Filled);
            assert_eq!(outcome.fills[0].price, dec!(100));
        }
    }

    #[test]
    fn no_cross_rests_limit_orders() {
        let engine = BatchEngine::with_rng_seed(PricingStrategy::MaximumVolume, 1);
        let books: dashmap::DashMap<String, std::sync::Arc<Orderbook>> = dashmap::DashMap::new();
        let book = std::sync::Arc::new(Orderbook::new("X"));
        books.insert("X".into(), book.clone());

        engine.submit("X", pending(Side::Buy, 10, Some(dec!(90))));
        engine.submit("X", pending(Side::Sell, 10, Some(dec!(95))));

        let results = engine.execute_batch(&books);
        let outcomes = &results["X"];
        for outcome in outcomes {
            assert_eq!(outcome.status, OrderStatus::New);
        }
        assert_eq!(book.best_bid(), Some(dec!(90)));
        assert_eq!(book.best_ask(), Some(dec!(95)));
    }
}
