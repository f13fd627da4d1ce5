//! Maker/taker fee schedule, keyed by role.

use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::models::order::{FeeBreakdown, LiquidityType};
use crate::models::team::Role;
use crate::models::trade::AggressorSide;

#[derive(Debug, Clone, Copy)]
pub struct RoleFeeSchedule {
    /// Credit applied to the maker leg of a trade (positive = credit).
    pub maker_rebate: Decimal,
    /// Debit applied to the taker leg of a trade (positive value, applied
    /// as a debit).
    pub taker_fee: Decimal,
}

pub struct FeeService {
    schedule: HashMap<Role, RoleFeeSchedule>,
}

impl FeeService {
    pub fn new(schedule: HashMap<Role, RoleFeeSchedule>) -> Self {
        Self { schedule }
    }

    pub fn default_schedule() -> Self {
        let mut schedule = HashMap::new();
        schedule.insert(
            Role::MarketMaker,
            RoleFeeSchedule {
                maker_rebate: Decimal::new(2, 4),
                taker_fee: Decimal::new(3, 4),
            },
        );
        schedule.insert(
            Role::HedgeFund,
            RoleFeeSchedule {
                maker_rebate: Decimal::new(1, 4),
                taker_fee: Decimal::new(5, 4),
            },
        );
        schedule.insert(
            Role::ArbitrageDesk,
            RoleFeeSchedule {
                maker_rebate: Decimal::new(1, 4),
                taker_fee: Decimal::new(5, 4),
            },
        );
        schedule.insert(
            Role::Retail,
            RoleFeeSchedule {
                maker_rebate: Decimal::ZERO,
                taker_fee: Decimal::new(7, 4),
            },
        );
        Self::new(schedule)
    }

    fn schedule_for(&self, role: Role) -> RoleFeeSchedule {
        self.schedule.get(&role).copied().unwrap_or(RoleFeeSchedule {
            maker_rebate: Decimal::ZERO,
            taker_fee: Decimal::new(5, 4),
        })
    }

    /// Compute the buyer-side and seller-side fee entries for one trade.
    /// `auction` trades have no aggressor — both legs are billed as maker.
    pub fn fee_for_side(
        &self,
        role: Role,
        notional: Decimal,
        side_is_buyer: bool,
        aggressor: AggressorSide,
    ) -> FeeBreakdown {
        let schedule = self.schedule_for(role);
        let is_taker = match aggressor {
            AggressorSide::Auction => false,
            AggressorSide::Buy => side_is_buyer,
            AggressorSide::Sell => !side_is_buyer,
        };
        if is_taker {
            FeeBreakdown {
                liquidity_type: Some(LiquidityType::Taker),
                amount: -(notional * schedule.taker_fee),
            }
        } else {
            FeeBreakdown {
                liquidity_type: Some(LiquidityType::Maker),
                amount: notional * schedule.maker_rebate,
            }
        }
    }
}

impl Default for FeeService {
    fn default() -> Self {
        Self::default_schedule()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn taker_pays_maker_receives() {
        let fees = FeeService::default_schedule();
        let notional = dec!(1000);
        let buyer_fee = fees.fee_for_side(Role::Retail, notional, true, AggressorSide::Buy);
        let seller_fee = fees.fee_for_side(Role::Retail, notional, false, AggressorSide::Buy);
        assert_eq!(buyer_fee.liquidity_type, Some(LiquidityType::Taker));
        assert!(buyer_fee.amount < Decimal::ZERO);
        assert_eq!(seller_fee.liquidity_type, Some(LiquidityType::Maker));
        assert!(seller_fee.amount >= Decimal::ZERO);
    }

    #[test]
    fn auction_trades_treat_both_sides_as_maker() {
        let fees = FeeService::default_schedule();
        let notional = dec!(1000);
        let buyer_fee = fees.fee_for_side(Role::Retail, notional, true, AggressorSide::Auction);
        let seller_fee = fees.fee_for_side(Role::Retail, notional, false, AggressorSide::Auction);
        assert_eq!(buyer_fee.liquidity_type, Some(LiquidityType::Maker));
        assert_eq!(seller_fee.liquidity_type, Some(LiquidityType::Maker));
    }
}
