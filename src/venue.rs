//! The exchange venue façade (§4.5): owns the instrument registry, every
//! instrument's order book, the phase manager/transition handler, and the
//! matching-mode selection. Everything above this layer (pipeline stages,
//! API handlers) talks to the venue, never to a book or engine directly.

use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::MatchingMode;
use crate::core::{BatchEngine, MatchOutcome, MatchingError, Orderbook, PendingOrder, PricingStrategy, Side};
use crate::models::instrument::Instrument;
use crate::models::order::{Order, OrderStatus, OrderType};
use crate::models::phase::{ExecutionStyle, Phase};
use crate::phase::{PhaseAware, PhaseManager, PhaseTransitionHandler};

#[derive(Debug, thiserror::Error)]
pub enum VenueError {
    #[error("instrument {0} is already listed")]
    InstrumentExists(String),
    #[error("unknown instrument: {0}")]
    UnknownInstrument(String),
    #[error("order entry is not permitted during {0}")]
    MarketClosed(Phase),
    #[error("order entry is not permitted while the opening auction is running")]
    AuctionInProgress,
    #[error("cancellation is not permitted during {0}")]
    CancellationNotAllowed(Phase),
    #[error(transparent)]
    Matching(#[from] MatchingError),
}

pub struct Venue {
    instruments: DashMap<String, Instrument>,
    books: DashMap<String, Arc<Orderbook>>,
    batch_engine: BatchEngine,
    phase_manager: PhaseManager,
    transition_handler: PhaseTransitionHandler,
    /// Self-trading is allowed by default; this is the switch a future
    /// matching pass would consult to reject or suppress a fill where
    /// both legs belong to the same trader. No matching code reads it yet.
    prevent_self_trade: bool,
    /// `Batch` runs the phase-driven schedule (opening auction at the
    /// auction window, continuous otherwise). `Continuous` forces continuous
    /// matching whenever order entry is open and skips the auction engine
    /// entirely, regardless of what phase the schedule reports.
    matching_mode: MatchingMode,
}

/// Trades produced when an order is matched, paired with the status each
/// side of the match ended up in — what the settlement stage consumes.
#[derive(Debug)]
pub struct SubmitOutcome {
    pub outcome: MatchOutcome,
    pub phase: Phase,
}

impl Venue {
    pub fn new(pricing_strategy: PricingStrategy, matching_mode: MatchingMode) -> Self {
        Self {
            instruments: DashMap::new(),
            books: DashMap::new(),
            batch_engine: BatchEngine::new(pricing_strategy),
            phase_manager: PhaseManager::default_schedule(),
            transition_handler: PhaseTransitionHandler::new(),
            prevent_self_trade: false,
            matching_mode,
        }
    }

    pub fn with_phase_manager(mut self, phase_manager: PhaseManager) -> Self {
        self.phase_manager = phase_manager;
        self
    }

    pub fn with_self_trade_prevention(mut self, prevent: bool) -> Self {
        self.prevent_self_trade = prevent;
        self
    }

    pub fn prevent_self_trade(&self) -> bool {
        self.prevent_self_trade
    }

    pub fn list_instrument(&self, instrument: Instrument) -> Result<(), VenueError> {
        if self.instruments.contains_key(&instrument.symbol) {
            return Err(VenueError::InstrumentExists(instrument.symbol));
        }
        self.books
            .insert(instrument.symbol.clone(), Arc::new(Orderbook::new(instrument.symbol.clone())));
        self.instruments.insert(instrument.symbol.clone(), instrument);
        Ok(())
    }

    pub fn has_instrument(&self, instrument_id: &str) -> bool {
        self.instruments.contains_key(instrument_id)
    }

    pub fn current_phase(&self) -> Phase {
        self.phase_manager.current_phase()
    }

    pub fn book(&self, instrument_id: &str) -> Option<Arc<Orderbook>> {
        self.books.get(instrument_id).map(|b| b.clone())
    }

    /// Called piggyback on the matching stage's worker loop after every
    /// queue read (or timeout). Idempotent: only fires an action when the
    /// resolved phase differs from the last one observed.
    pub fn check_phase_transitions(&self) -> Phase {
        let phase = self.phase_manager.current_phase();
        self.transition_handler.on_phase(phase, self);
        phase
    }

    pub fn submit(&self, order: Order) -> Result<SubmitOutcome, VenueError> {
        let phase = self.phase_manager.current_phase();
        let capabilities = phase.capabilities();

        let Some(book) = self.books.get(&order.instrument_id).map(|b| b.clone()) else {
            return Err(VenueError::UnknownInstrument(order.instrument_id));
        };

        if !capabilities.order_entry_allowed {
            return Err(if phase == Phase::OpeningAuction {
                VenueError::AuctionInProgress
            } else {
                VenueError::MarketClosed(phase)
            });
        }

        // `Continuous` mode overrides the schedule's own auction window: it
        // never hands an order to the batch engine, only to the book
        // directly. `Batch` mode defers entirely to the phase schedule.
        let execution_style = if self.matching_mode == MatchingMode::Continuous && capabilities.execution_style == ExecutionStyle::Batch {
            ExecutionStyle::Continuous
        } else {
            capabilities.execution_style
        };

        let outcome = match execution_style {
            ExecutionStyle::Continuous => crate::core::continuous::submit(&order, &book),
            ExecutionStyle::Batch => self.batch_engine.submit(
                &order.instrument_id,
                PendingOrder {
                    order_id: order.order_id,
                    trader_id: order.trader_id,
                    client_order_id: order.client_order_id.clone(),
                    side: match order.side {
                        crate::models::order::OrderSide::Buy => Side::Buy,
                        crate::models::order::OrderSide::Sell => Side::Sell,
                    },
                    price: order.price,
                    quantity: order.quantity,
                    submission_timestamp: order.submission_timestamp,
                },
            ),
            ExecutionStyle::None => {
                // pre_open: entry allowed, matching disabled. Limit orders
                // rest directly; a market order cannot be accepted without
                // a matching pass to fill it against.
                if order.order_type == OrderType::Market {
                    return Err(VenueError::MarketClosed(phase));
                }
                let price = order.price.expect("limit order price validated upstream");
                book.rest(crate::core::OrderEntry {
                    order_id: order.order_id,
                    trader_id: order.trader_id,
                    client_order_id: order.client_order_id.clone(),
                    side: match order.side {
                        crate::models::order::OrderSide::Buy => Side::Buy,
                        crate::models::order::OrderSide::Sell => Side::Sell,
                    },
                    price,
                    original_quantity: order.quantity,
                    remaining_quantity: order.quantity,
                    submission_timestamp: order.submission_timestamp,
                });
                MatchOutcome {
                    order_id: order.order_id,
                    status: OrderStatus::New,
                    fills: Vec::new(),
                    remaining_quantity: order.quantity,
                    average_price: None,
                }
            }
        };

        Ok(SubmitOutcome { outcome, phase })
    }

    pub fn cancel(&self, instrument_id: &str, order_id: Uuid, trader_id: Uuid) -> Result<(), VenueError> {
        let phase = self.phase_manager.current_phase();
        if !phase.capabilities().cancellation_allowed {
            return Err(VenueError::CancellationNotAllowed(phase));
        }
        let book = self
            .books
            .get(instrument_id)
            .map(|b| b.clone())
            .ok_or_else(|| VenueError::UnknownInstrument(instrument_id.to_string()))?;
        book.cancel(order_id, trader_id)?;
        Ok(())
    }

    pub fn all_books(&self) -> &DashMap<String, Arc<Orderbook>> {
        &self.books
    }
}

impl PhaseAware for Venue {
    fn execute_opening_auction(&self) {
        let results = self.batch_engine.execute_batch(&self.books);
        let total: usize = results.values().map(|v| v.len()).sum();
        tracing::info!(instruments = results.len(), orders = total, "opening auction executed");
    }

    fn cancel_all_orders(&self) {
        let mut total = 0usize;
        for entry in self.books.iter() {
            total += entry.value().drain_all().len();
        }
        tracing::info!(orders_cancelled = total, "market close drained all books");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::instrument::InstrumentKind;
    use crate::models::order::OrderSide;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn instrument(symbol: &str) -> Instrument {
        Instrument {
            symbol: symbol.to_string(),
            underlying: "SIM".to_string(),
            kind: InstrumentKind::Option,
            strike: None,
            expiry: None,
            option_type: None,
        }
    }

    #[test]
    fn listing_same_symbol_twice_fails() {
        let venue = Venue::new(PricingStrategy::MaximumVolume, MatchingMode::Batch);
        venue.list_instrument(instrument("X")).unwrap();
        let err = venue.list_instrument(instrument("X")).unwrap_err();
        assert!(matches!(err, VenueError::InstrumentExists(_)));
    }

    #[test]
    fn submit_against_unknown_instrument_errors() {
        let venue = Venue::new(PricingStrategy::MaximumVolume, MatchingMode::Batch);
        let order = Order {
            order_id: Uuid::new_v4(),
            client_order_id: None,
            instrument_id: "GHOST".into(),
            trader_id: Uuid::new_v4(),
            side: OrderSide::Buy,
            order_type: OrderType::Limit,
            price: Some(dec!(100)),
            quantity: 10,
            remaining_quantity: 10,
            status: OrderStatus::New,
            submission_timestamp: Utc::now(),
        };
        let err = venue.submit(order).unwrap_err();
        assert!(matches!(err, VenueError::UnknownInstrument(_)));
    }
}
