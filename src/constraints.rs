//! Role-agnostic constraint rule engine (§4.6). Constraints never mutate
//! state themselves; the one exception — the order-rate counter — is owned
//! and mutated by `RateLimiter`, which the constraint only calls into.

use rust_decimal::Decimal;
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::order::{Order, OrderSide, OrderType};
use crate::models::phase::Phase;
use crate::models::team::Role;
use crate::positions::PositionService;
use crate::rate_limit::RateLimiter;

#[derive(Debug, Clone)]
pub enum Constraint {
    PositionLimit { max: i64, symmetric: bool },
    PortfolioLimit { max_total: i64 },
    OrderSize { min: i64, max: i64 },
    OrderRate { max_per_second: u32 },
    AllowedOrderTypes { types: Vec<OrderType> },
    AllowedInstruments { instruments: Vec<String> },
    TradingWindow { allowed_phases: Vec<Phase> },
    PriceRange { min: Decimal, max: Decimal },
}

#[derive(Debug, Clone)]
pub struct ConstraintViolation {
    pub code: &'static str,
    pub message: String,
}

pub struct ValidationContext<'a> {
    pub order: &'a Order,
    pub trader_id: Uuid,
    pub phase: Phase,
}

pub struct ConstraintRegistry {
    by_role: HashMap<Role, Vec<Constraint>>,
}

impl ConstraintRegistry {
    pub fn new(by_role: HashMap<Role, Vec<Constraint>>) -> Self {
        Self { by_role }
    }

    pub fn default_for_roles() -> Self {
        let mut by_role = HashMap::new();
        by_role.insert(
            Role::MarketMaker,
            vec![
                Constraint::OrderSize { min: 1, max: 10_000 },
                Constraint::OrderRate { max_per_second: 50 },
                Constraint::PositionLimit { max: 5_000, symmetric: true },
                Constraint::PortfolioLimit { max_total: 20_000 },
                Constraint::TradingWindow {
                    allowed_phases: vec![Phase::PreOpen, Phase::Continuous],
                },
            ],
        );
        by_role.insert(
            Role::HedgeFund,
            vec![
                Constraint::OrderSize { min: 1, max: 2_000 },
                Constraint::OrderRate { max_per_second: 10 },
                Constraint::PositionLimit { max: 1_000, symmetric: true },
                Constraint::PortfolioLimit { max_total: 5_000 },
                Constraint::TradingWindow {
                    allowed_phases: vec![Phase::PreOpen, Phase::Continuous],
                },
            ],
        );
        by_role.insert(
            Role::ArbitrageDesk,
            vec![
                Constraint::OrderSize { min: 1, max: 1_000 },
                Constraint::OrderRate { max_per_second: 20 },
                Constraint::PositionLimit { max: 500, symmetric: true },
                Constraint::TradingWindow {
                    allowed_phases: vec![Phase::PreOpen, Phase::Continuous],
                },
            ],
        );
        by_role.insert(
            Role::Retail,
            vec![
                Constraint::OrderSize { min: 1, max: 100 },
                Constraint::OrderRate { max_per_second: 3 },
                Constraint::PositionLimit { max: 200, symmetric: true },
                Constraint::AllowedOrderTypes {
                    types: vec![OrderType::Limit],
                },
                Constraint::TradingWindow {
                    allowed_phases: vec![Phase::PreOpen, Phase::Continuous],
                },
            ],
        );
        Self::new(by_role)
    }

    pub fn validate(
        &self,
        role: Role,
        ctx: &ValidationContext<'_>,
        positions: &PositionService,
        rate_limiter: &RateLimiter,
    ) -> Result<(), ConstraintViolation> {
        let Some(constraints) = self.by_role.get(&role) else {
            return Ok(());
        };
        for constraint in constraints {
            check_one(constraint, ctx, positions, rate_limiter)?;
        }
        Ok(())
    }
}

fn check_one(
    constraint: &Constraint,
    ctx: &ValidationContext<'_>,
    positions: &PositionService,
    rate_limiter: &RateLimiter,
) -> Result<(), ConstraintViolation> {
    match constraint {
        Constraint::PositionLimit { max, symmetric } => {
            let hypothetical =
                positions.hypothetical(ctx.trader_id, &ctx.order.instrument_id, ctx.order.side, ctx.order.quantity);
            let within = if *symmetric {
                hypothetical.abs() <= *max
            } else {
                match ctx.order.side {
                    OrderSide::Buy => (0..=*max).contains(&hypothetical),
                    OrderSide::Sell => (-*max..=0).contains(&hypothetical),
                }
            };
            if !within {
                return Err(ConstraintViolation {
                    code: "POSITION_LIMIT_EXCEEDED",
                    message: format!("resulting position {hypothetical} exceeds limit {max}"),
                });
            }
        }
        Constraint::PortfolioLimit { max_total } => {
            let current_total = positions.portfolio_abs_total(ctx.trader_id);
            let current_instrument = positions.get(ctx.trader_id, &ctx.order.instrument_id).abs();
            let hypothetical_instrument = positions
                .hypothetical(ctx.trader_id, &ctx.order.instrument_id, ctx.order.side, ctx.order.quantity)
                .abs();
            let projected_total = current_total - current_instrument + hypothetical_instrument;
            if projected_total > *max_total {
                return Err(ConstraintViolation {
                    code: "PORTFOLIO_LIMIT_EXCEEDED",
                    message: format!("projected portfolio exposure {projected_total} exceeds limit {max_total}"),
                });
            }
        }
        Constraint::OrderSize { min, max } => {
            if ctx.order.quantity < *min || ctx.order.quantity > *max {
                return Err(ConstraintViolation {
                    code: "INVALID_QUANTITY",
                    message: format!("quantity must be between {min} and {max}"),
                });
            }
        }
        Constraint::OrderRate { max_per_second } => {
            if !rate_limiter.check(ctx.trader_id, *max_per_second, chrono::Utc::now()) {
                return Err(ConstraintViolation {
                    code: "RATE_LIMIT_EXCEEDED",
                    message: format!("more than {max_per_second} orders submitted in the current second"),
                });
            }
        }
        Constraint::AllowedOrderTypes { types } => {
            if !types.contains(&ctx.order.order_type) {
                return Err(ConstraintViolation {
                    code: "ORDER_TYPE_NOT_ALLOWED",
                    message: format!("{:?} orders are not permitted for this role", ctx.order.order_type),
                });
            }
        }
        Constraint::AllowedInstruments { instruments } => {
            if !instruments.is_empty() && !instruments.iter().any(|i| i == &ctx.order.instrument_id) {
                return Err(ConstraintViolation {
                    code: "INSTRUMENT_NOT_ALLOWED",
                    message: format!("{} is not tradable by this role", ctx.order.instrument_id),
                });
            }
        }
        Constraint::TradingWindow { allowed_phases } => {
            if !allowed_phases.contains(&ctx.phase) {
                return Err(ConstraintViolation {
                    code: "TRADING_WINDOW_CLOSED",
                    message: format!("orders are not accepted during {}", ctx.phase),
                });
            }
        }
        Constraint::PriceRange { min, max } => {
            if ctx.order.order_type == OrderType::Limit {
                let Some(price) = ctx.order.price else {
                    return Err(ConstraintViolation {
                        code: "MISSING_PRICE",
                        message: "limit orders require a price".to_string(),
                    });
                };
                if price < *min || price > *max {
                    return Err(ConstraintViolation {
                        code: "INVALID_PRICE",
                        message: format!("price must be between {min} and {max}"),
                    });
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::order::OrderSide;
    use rust_decimal_macros::dec;

    fn request(quantity: i64) -> Order {
        Order {
            order_id: Uuid::new_v4(),
            client_order_id: None,
            instrument_id: "X".into(),
            trader_id: Uuid::new_v4(),
            side: OrderSide::Buy,
            order_type: OrderType::Limit,
            price: Some(dec!(100)),
            quantity,
            remaining_quantity: quantity,
            status: crate::models::order::OrderStatus::New,
            submission_timestamp: chrono::Utc::now(),
        }
    }

    #[test]
    fn position_limit_breach_rejects_order() {
        let positions = PositionService::new();
        let rate_limiter = RateLimiter::default();
        let team = Uuid::new_v4();
        // Simulate an existing position of +45 via a synthetic trade-like
        // adjustment path exposed only for this purpose in tests.
        for _ in 0..45 {
            positions.apply_trade(&crate::models::trade::Trade {
                trade_id: Uuid::new_v4(),
                instrument_id: "X".into(),
                buy_order_id: Uuid::new_v4(),
                sell_order_id: Uuid::new_v4(),
                buyer_id: team,
                seller_id: Uuid::new_v4(),
                price: dec!(100),
                quantity: 1,
                timestamp: chrono::Utc::now(),
                aggressor_side: crate::models::trade::AggressorSide::Buy,
            });
        }

        let constraint = Constraint::PositionLimit { max: 50, symmetric: true };
        let order = request(10);
        let ctx = ValidationContext {
            order: &order,
            trader_id: team,
            phase: Phase::Continuous,
        };
        let result = check_one(&constraint, &ctx, &positions, &rate_limiter);
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().code, "POSITION_LIMIT_EXCEEDED");
    }

    #[test]
    fn fourth_order_same_second_hits_rate_limit() {
        let positions = PositionService::new();
        let rate_limiter = RateLimiter::default();
        let team = Uuid::new_v4();
        let constraint = Constraint::OrderRate { max_per_second: 3 };
        let order = request(1);
        let ctx = ValidationContext {
            order: &order,
            trader_id: team,
            phase: Phase::Continuous,
        };
        assert!(check_one(&constraint, &ctx, &positions, &rate_limiter).is_ok());
        assert!(check_one(&constraint, &ctx, &positions, &rate_limiter).is_ok());
        assert!(check_one(&constraint, &ctx, &positions, &rate_limiter).is_ok());
        assert!(check_one(&constraint, &ctx, &positions, &rate_limiter).is_err());
    }
}
