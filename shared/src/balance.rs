//! Balance recurrence: opening + inflow - outflow + adjustment

use rust_decimal::Decimal;

use crate::models::StockStatus;
use crate::types::{checked_sum, total, ComponentAmount};

/// Closing balance for a period.
///
/// No clamping and no rounding: negative results are valid and fractional
/// quantities keep their full precision. `None` when any intermediate sum
/// leaves the `Decimal` range.
pub fn compute_closing(
    opening: Decimal,
    inflows: &[Decimal],
    outflows: &[Decimal],
    adjustment: Decimal,
) -> Option<Decimal> {
    closing_from_totals(opening, checked_sum(inflows)?, checked_sum(outflows)?, adjustment)
}

pub(crate) fn closing_from_totals(
    opening: Decimal,
    inflow: Decimal,
    outflow: Decimal,
    adjustment: Decimal,
) -> Option<Decimal> {
    opening
        .checked_add(inflow)?
        .checked_sub(outflow)?
        .checked_add(adjustment)
}

/// The computed figures of one snapshot before it is persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceFigures {
    pub opening_balance: Decimal,
    pub inflows: Vec<ComponentAmount>,
    pub outflows: Vec<ComponentAmount>,
    pub adjustment: Decimal,
    pub closing_balance: Decimal,
}

impl BalanceFigures {
    pub fn compute(
        opening_balance: Decimal,
        inflows: Vec<ComponentAmount>,
        outflows: Vec<ComponentAmount>,
        adjustment: Decimal,
    ) -> Option<Self> {
        let closing_balance =
            closing_from_totals(opening_balance, total(&inflows)?, total(&outflows)?, adjustment)?;
        Some(Self {
            opening_balance,
            inflows,
            outflows,
            adjustment,
            closing_balance,
        })
    }

    pub fn status(&self, minimum_threshold: Decimal) -> StockStatus {
        StockStatus::classify(self.closing_balance, minimum_threshold)
    }
}
