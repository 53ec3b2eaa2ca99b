//! Common types used across the platform

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Inclusive date range for transaction queries
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Whether `date` falls within the range (both ends inclusive)
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// A named, summable quantity on a snapshot (e.g. "purchases" or "wastage")
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComponentAmount {
    pub name: String,
    pub amount: Decimal,
}

impl ComponentAmount {
    pub fn new(name: impl Into<String>, amount: Decimal) -> Self {
        Self {
            name: name.into(),
            amount,
        }
    }
}

/// Sum of decimals, `None` when it leaves the `Decimal` range
pub fn checked_sum<'a>(amounts: impl IntoIterator<Item = &'a Decimal>) -> Option<Decimal> {
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, amount| acc.checked_add(*amount))
}

/// Sum the amounts of a component list
pub fn total(components: &[ComponentAmount]) -> Option<Decimal> {
    checked_sum(components.iter().map(|c| &c.amount))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_of_components() {
        let components = vec![
            ComponentAmount::new("purchases", Decimal::new(125, 1)),
            ComponentAmount::new("returns", Decimal::new(-25, 1)),
        ];
        assert_eq!(total(&components), Some(Decimal::from(10)));
        assert_eq!(total(&[]), Some(Decimal::ZERO));
    }

    #[test]
    fn test_total_out_of_range() {
        let components = vec![
            ComponentAmount::new("purchases", Decimal::MAX),
            ComponentAmount::new("purchases", Decimal::ONE),
        ];
        assert_eq!(total(&components), None);
    }
}
