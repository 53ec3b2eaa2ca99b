//! Transactions read by the aggregator

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::DateRange;

/// Table a transaction is recorded in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionSource {
    /// Raw material purchases from vendors
    StockPurchase,
    /// Staff tasks consuming raw material in a process
    Task,
    /// Finished goods batches
    ProductionBatch,
    /// Units sold through a sales channel
    Sale,
}

/// Which date of a transaction places it in a period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateBasis {
    /// Purchase date, assignment date, batch start or sale date
    Occurred,
    /// Completion date; transactions without one never match
    Completed,
}

/// Which quantity of a transaction is summed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Measure {
    Quantity,
    Wastage,
}

/// A recorded transaction, normalized across its source tables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub source: TransactionSource,
    pub entity_id: Uuid,
    pub occurred_on: NaiveDate,
    pub completed_on: Option<NaiveDate>,
    pub quantity: Decimal,
    pub wastage: Option<Decimal>,
    /// Process name for tasks
    pub process: Option<String>,
    /// Sales channel for sales
    pub channel_id: Option<Uuid>,
}

impl Transaction {
    pub fn date_for(&self, basis: DateBasis) -> Option<NaiveDate> {
        match basis {
            DateBasis::Occurred => Some(self.occurred_on),
            DateBasis::Completed => self.completed_on,
        }
    }

    pub fn measure(&self, measure: Measure) -> Decimal {
        match measure {
            Measure::Quantity => self.quantity,
            Measure::Wastage => self.wastage.unwrap_or(Decimal::ZERO),
        }
    }
}

/// Filter for one transaction store read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionQuery {
    pub source: TransactionSource,
    pub entity_id: Uuid,
    pub basis: DateBasis,
    pub range: DateRange,
    pub process: Option<String>,
}

impl TransactionQuery {
    pub fn matches(&self, transaction: &Transaction) -> bool {
        transaction.source == self.source
            && transaction.entity_id == self.entity_id
            && transaction
                .date_for(self.basis)
                .is_some_and(|d| self.range.contains(d))
            && self
                .process
                .as_deref()
                .map_or(true, |p| transaction.process.as_deref() == Some(p))
    }
}
