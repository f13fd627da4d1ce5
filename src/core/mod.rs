//! The matching core: order book, continuous engine, and batch auction
//! engine. Nothing in this module knows about HTTP, queues, or teams —
//! it operates purely on `Order`/`PendingOrder` values and returns
//! `MatchOutcome`s for the caller to translate into trades.

pub mod batch;
pub mod continuous;
pub mod orderbook;
pub mod types;

pub use batch::{BatchEngine, ClearingResult, PricingStrategy};
pub use orderbook::Orderbook;
pub use types::{Fill, MatchOutcome, MatchingError, OrderEntry, OrderbookSnapshot, PendingOrder, Side};
