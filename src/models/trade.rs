use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

/// The side that crossed the spread to create the trade. `Auction` trades
/// have no single aggressor — both legs are billed at the maker rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AggressorSide {
    Buy,
    Sell,
    Auction,
}

#[derive(Debug, Clone, Serialize)]
pub struct Trade {
    pub trade_id: Uuid,
    pub instrument_id: String,
    pub buy_order_id: Uuid,
    pub sell_order_id: Uuid,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub price: Decimal,
    pub quantity: i64,
    pub timestamp: DateTime<Utc>,
    pub aggressor_side: AggressorSide,
}
