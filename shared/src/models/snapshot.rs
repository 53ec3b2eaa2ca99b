//! Period snapshots: one persisted balance row per (entity, period, dimension)

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{LedgerKind, StockStatus};
use crate::balance::{closing_from_totals, BalanceFigures};
use crate::period::PeriodKey;
use crate::types::{total, ComponentAmount};

/// Composite key of a snapshot; unique in storage
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnapshotKey {
    pub ledger: LedgerKind,
    pub entity_id: Uuid,
    pub period: PeriodKey,
    pub dimension: Option<String>,
}

impl SnapshotKey {
    pub fn new(
        ledger: LedgerKind,
        entity_id: Uuid,
        period: PeriodKey,
        dimension: Option<String>,
    ) -> Self {
        Self {
            ledger,
            entity_id,
            period,
            dimension,
        }
    }

    /// Same entity and dimension, one period earlier
    pub fn previous(&self) -> Self {
        Self {
            period: self.period.previous(),
            ..self.clone()
        }
    }
}

/// A snapshot ready to be inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSnapshot {
    pub key: SnapshotKey,
    pub figures: BalanceFigures,
    pub informational: Vec<ComponentAmount>,
    pub status: StockStatus,
}

/// A persisted period snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodSnapshot {
    pub id: Uuid,
    pub ledger: LedgerKind,
    pub entity_id: Uuid,
    pub period: PeriodKey,
    pub dimension: Option<String>,
    pub opening_balance: Decimal,
    pub inflows: Vec<ComponentAmount>,
    pub outflows: Vec<ComponentAmount>,
    pub informational: Vec<ComponentAmount>,
    pub adjustment: Decimal,
    pub closing_balance: Decimal,
    pub status: StockStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PeriodSnapshot {
    /// Materialize a new snapshot with a fresh id
    pub fn from_new(new: NewSnapshot, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            ledger: new.key.ledger,
            entity_id: new.key.entity_id,
            period: new.key.period,
            dimension: new.key.dimension,
            opening_balance: new.figures.opening_balance,
            inflows: new.figures.inflows,
            outflows: new.figures.outflows,
            informational: new.informational,
            adjustment: new.figures.adjustment,
            closing_balance: new.figures.closing_balance,
            status: new.status,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn key(&self) -> SnapshotKey {
        SnapshotKey::new(self.ledger, self.entity_id, self.period, self.dimension.clone())
    }

    pub fn inflow_total(&self) -> Option<Decimal> {
        total(&self.inflows)
    }

    pub fn outflow_total(&self) -> Option<Decimal> {
        total(&self.outflows)
    }

    /// Closing balance implied by the stored opening, flows and `adjustment`,
    /// or `None` if it doesn't fit in a `Decimal`
    pub fn closing_with(&self, adjustment: Decimal) -> Option<Decimal> {
        closing_from_totals(
            self.opening_balance,
            self.inflow_total()?,
            self.outflow_total()?,
            adjustment,
        )
    }

    /// Whether the stored closing balance agrees with its inputs
    pub fn is_balanced(&self) -> bool {
        self.closing_with(self.adjustment) == Some(self.closing_balance)
    }

    pub fn component(&self, name: &str) -> Option<Decimal> {
        self.inflows
            .iter()
            .chain(&self.outflows)
            .chain(&self.informational)
            .find(|c| c.name == name)
            .map(|c| c.amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_new_keeps_figures() {
        let period = PeriodKey::new(2024, 4).unwrap();
        let key = SnapshotKey::new(LedgerKind::Stock, Uuid::new_v4(), period, None);
        let figures = BalanceFigures::compute(
            Decimal::from(15),
            vec![ComponentAmount::new("purchases", Decimal::from(75))],
            vec![ComponentAmount::new("utilized", Decimal::from(60))],
            Decimal::ZERO,
        )
        .unwrap();
        let snapshot = PeriodSnapshot::from_new(
            NewSnapshot {
                key: key.clone(),
                status: figures.status(Decimal::from(30)),
                figures,
                informational: Vec::new(),
            },
            Utc::now(),
        );

        assert_eq!(snapshot.key(), key);
        assert_eq!(snapshot.closing_balance, Decimal::from(30));
        assert_eq!(snapshot.status, StockStatus::Normal);
        assert!(snapshot.is_balanced());
        assert_eq!(snapshot.component("utilized"), Some(Decimal::from(60)));
        assert_eq!(snapshot.closing_with(Decimal::from(-50)), Some(Decimal::from(-20)));
        assert_eq!(snapshot.closing_with(Decimal::MAX), None);
    }

    #[test]
    fn test_previous_key() {
        let period = PeriodKey::new(2024, 1).unwrap();
        let key = SnapshotKey::new(
            LedgerKind::Production,
            Uuid::nil(),
            period,
            Some("Roasting".into()),
        );
        let prev = key.previous();
        assert_eq!(prev.period, PeriodKey::new(2023, 12).unwrap());
        assert_eq!(prev.dimension.as_deref(), Some("Roasting"));
    }
}
