//! Three-tier stock status

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Derived stock level status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockStatus {
    Normal,
    Low,
    Out,
}

impl StockStatus {
    /// Classify a closing balance against a minimum threshold.
    ///
    /// `out` is checked first, so a zero or negative balance is out of stock
    /// whatever the threshold. A balance equal to the threshold is normal.
    pub fn classify(closing_balance: Decimal, minimum_threshold: Decimal) -> Self {
        if closing_balance <= Decimal::ZERO {
            StockStatus::Out
        } else if closing_balance < minimum_threshold {
            StockStatus::Low
        } else {
            StockStatus::Normal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::Normal => "normal",
            StockStatus::Low => "low",
            StockStatus::Out => "out",
        }
    }
}

impl fmt::Display for StockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StockStatus::Normal => write!(f, "Normal"),
            StockStatus::Low => write!(f, "Low Stock"),
            StockStatus::Out => write!(f, "Out of Stock"),
        }
    }
}

impl FromStr for StockStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(StockStatus::Normal),
            "low" => Ok(StockStatus::Low),
            "out" => Ok(StockStatus::Out),
            other => Err(format!("unknown stock status: {}", other)),
        }
    }
}

/// Per-status row counts for a status report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSummary {
    pub normal: usize,
    pub low: usize,
    pub out: usize,
    pub failed: usize,
}

impl StatusSummary {
    pub fn record(&mut self, status: StockStatus) {
        match status {
            StockStatus::Normal => self.normal += 1,
            StockStatus::Low => self.low += 1,
            StockStatus::Out => self.out += 1,
        }
    }

    pub fn record_failure(&mut self) {
        self.failed += 1;
    }
}
