use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "buy"),
            OrderSide::Sell => write!(f, "sell"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Limit,
    Market,
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderType::Limit => write!(f, "limit"),
            OrderType::Market => write!(f, "market"),
        }
    }
}

/// `PendingNew` is the status a batch-auction submission holds between the
/// moment it is accepted into the pending buffer and the next auction run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    New,
    PendingNew,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::New => "new",
            OrderStatus::PendingNew => "pending_new",
            OrderStatus::PartiallyFilled => "partially_filled",
            OrderStatus::Filled => "filled",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Rejected => "rejected",
        };
        write!(f, "{s}")
    }
}

/// An order as tracked by the exchange for its full lifetime, independent of
/// which book (if any) currently holds it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub order_id: Uuid,
    pub client_order_id: Option<String>,
    pub instrument_id: String,
    pub trader_id: Uuid,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub price: Option<Decimal>,
    pub quantity: i64,
    pub remaining_quantity: i64,
    pub status: OrderStatus,
    pub submission_timestamp: DateTime<Utc>,
}

impl Order {
    pub fn filled_quantity(&self) -> i64 {
        self.quantity - self.remaining_quantity
    }

    pub fn is_resting(&self) -> bool {
        matches!(self.status, OrderStatus::New | OrderStatus::PartiallyFilled)
    }
}

#[derive(Debug, Deserialize)]
pub struct SubmitOrderRequest {
    pub instrument_id: String,
    pub side: OrderSide,
    pub quantity: i64,
    pub price: Option<Decimal>,
    pub order_type: OrderType,
    pub client_order_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeeBreakdown {
    pub liquidity_type: Option<LiquidityType>,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LiquidityType {
    Maker,
    Taker,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderResponse {
    pub order_id: Uuid,
    pub client_order_id: Option<String>,
    pub instrument_id: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub price: Option<Decimal>,
    pub quantity: i64,
    pub filled_quantity: i64,
    pub remaining_quantity: i64,
    pub status: OrderStatus,
    pub average_price: Option<Decimal>,
    pub fees: Vec<FeeBreakdown>,
    pub submission_timestamp: DateTime<Utc>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            order_id: order.order_id,
            client_order_id: order.client_order_id.clone(),
            instrument_id: order.instrument_id.clone(),
            side: order.side,
            order_type: order.order_type,
            price: order.price,
            quantity: order.quantity,
            filled_quantity: order.filled_quantity(),
            remaining_quantity: order.remaining_quantity,
            status: order.status,
            average_price: None,
            fees: Vec::new(),
            submission_timestamp: order.submission_timestamp,
        }
    }
}
