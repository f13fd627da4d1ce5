//! Continuous price-time priority matching: one order in, matched against
//! the book immediately, any residual rests (limit) or is discarded
//! (market).

use chrono::Utc;
use uuid::Uuid;

use crate::models::order::{Order, OrderStatus, OrderType};

use super::orderbook::Orderbook;
use super::types::{MatchOutcome, OrderEntry, Side};

pub fn side_of(order: &Order) -> Side {
    match order.side {
        crate::models::order::OrderSide::Buy => Side::Buy,
        crate::models::order::OrderSide::Sell => Side::Sell,
    }
}

/// Submit one order against a single instrument's book.
pub fn submit(order: &Order, book: &Orderbook) -> MatchOutcome {
    let side = side_of(order);
    let now = Utc::now();

    let (fills, remaining) = book.match_incoming(
        order.order_id,
        order.trader_id,
        side,
        order.quantity,
        order.price,
        now,
    );

    let filled_quantity = order.quantity - remaining;

    let status = if filled_quantity == order.quantity {
        OrderStatus::Filled
    } else if filled_quantity > 0 {
        OrderStatus::PartiallyFilled
    } else if order.order_type == OrderType::Market {
        OrderStatus::Rejected
    } else {
        OrderStatus::New
    };

    if remaining > 0 && order.order_type == OrderType::Limit {
        let price = order
            .price
            .expect("limit orders always carry a price (validated upstream)");
        book.rest_residual(
            OrderEntry {
                order_id: order.order_id,
                trader_id: order.trader_id,
                client_order_id: order.client_order_id.clone(),
                side,
                price,
                original_quantity: order.quantity,
                remaining_quantity: order.quantity,
                submission_timestamp: order.submission_timestamp,
            },
            remaining,
        );
    }

    let average_price = MatchOutcome::average_price_of(&fills);

    MatchOutcome {
        order_id: order.order_id,
        status,
        fills,
        remaining_quantity: remaining,
        average_price,
    }
}

/// Cancel a resting order. Unlike `submit`, there is no matching involved —
/// this is a thin pass-through kept here so callers have one module for
/// every continuous-phase book operation.
pub fn cancel(book: &Orderbook, order_id: Uuid, trader_id: Uuid) -> Result<(), super::types::MatchingError> {
    book.cancel(order_id, trader_id).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn order(side: crate::models::order::OrderSide, qty: i64, price: Option<rust_decimal::Decimal>, otype: OrderType) -> Order {
        Order {
            order_id: Uuid::new_v4(),
            client_order_id: None,
            instrument_id: "X".into(),
            trader_id: Uuid::new_v4(),
            side,
            order_type: otype,
            price,
            quantity: qty,
            remaining_quantity: qty,
            status: OrderStatus::New,
            submission_timestamp: Utc::now(),
        }
    }

    #[test]
    fn crossing_orders_produce_one_trade() {
        let book = Orderbook::new("X");
        let resting = order(crate::models::order::OrderSide::Buy, 10, Some(dec!(100)), OrderType::Limit);
        let resting_result = submit(&resting, &book);
        assert_eq!(resting_result.status, OrderStatus::New);

        let incoming = order(crate::models::order::OrderSide::Sell, 10, Some(dec!(99)), OrderType::Limit);
        let result = submit(&incoming, &book);
        assert_eq!(result.status, OrderStatus::Filled);
        assert_eq!(result.fills.len(), 1);
        assert_eq!(result.fills[0].price, dec!(100));
    }

    #[test]
    fn market_order_against_empty_book_is_rejected() {
        let book = Orderbook::new("X");
        let incoming = order(crate::models::order::OrderSide::Buy, 10, None, OrderType::Market);
        let result = submit(&incoming, &book);
        assert_eq!(result.status, OrderStatus::Rejected);
        assert_eq!(result.remaining_quantity, 10);
        assert!(result.fills.is_empty());
    }

    #[test]
    fn partial_fill_leaves_residual_resting() {
        let book = Orderbook::new("X");
        let resting = order(crate::models::order::OrderSide::Buy, 5, Some(dec!(100)), OrderType::Limit);
        submit(&resting, &book);

        let incoming = order(crate::models::order::OrderSide::Sell, 10, Some(dec!(100)), OrderType::Limit);
        let result = submit(&incoming, &book);
        assert_eq!(result.status, OrderStatus::PartiallyFilled);
        assert_eq!(result.fills[0].quantity, 5);
        assert_eq!(result.remaining_quantity, 5);
        assert!(book.has_order(incoming.order_id));
    }
}
