//! Snapshot store gateway: lookup, race-safe creation and adjustment updates

use rust_decimal::Decimal;
use shared::{NewSnapshot, PeriodSnapshot, SnapshotKey, StockStatus};
use uuid::Uuid;

use crate::error::{AppError, AppResult, StoreError};
use crate::store::BalanceStore;

/// Gateway over the snapshot table
pub struct SnapshotGateway<'a> {
    store: &'a dyn BalanceStore,
}

impl<'a> SnapshotGateway<'a> {
    pub fn new(store: &'a dyn BalanceStore) -> Self {
        Self { store }
    }

    /// Existing snapshot for a key, returned verbatim. A found snapshot is
    /// authoritative even if its source transactions changed since.
    pub async fn find(&self, key: &SnapshotKey) -> AppResult<Option<PeriodSnapshot>> {
        Ok(self.store.read_snapshot(key).await?)
    }

    /// Closing balance of the snapshot one period before `key`
    pub async fn previous_closing(&self, key: &SnapshotKey) -> AppResult<Option<Decimal>> {
        Ok(self
            .store
            .read_snapshot(&key.previous())
            .await?
            .map(|s| s.closing_balance))
    }

    /// Insert a freshly computed snapshot.
    ///
    /// When a concurrent request created the same key first, the storage
    /// uniqueness constraint rejects this insert and the stored row wins.
    pub async fn create(&self, snapshot: NewSnapshot) -> AppResult<PeriodSnapshot> {
        match self.store.insert_snapshot(&snapshot).await {
            Ok(created) => {
                tracing::debug!(
                    snapshot_id = %created.id,
                    entity_id = %created.entity_id,
                    period = %created.period,
                    "Snapshot created"
                );
                Ok(created)
            }
            Err(StoreError::UniqueViolation(detail)) => {
                tracing::debug!(
                    entity_id = %snapshot.key.entity_id,
                    period = %snapshot.key.period,
                    "Snapshot created concurrently, reading stored row: {}",
                    detail
                );
                self.store
                    .read_snapshot(&snapshot.key)
                    .await?
                    .ok_or_else(|| AppError::StoreWriteFailure(detail))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Replace the adjustment of a snapshot and rewrite closing balance and
    /// status from its stored opening, inflows and outflows.
    ///
    /// An adjustment that would push the closing balance out of the
    /// `Decimal` range is rejected and the stored row is left untouched.
    pub async fn update_adjustment(
        &self,
        snapshot: &PeriodSnapshot,
        adjustment: Decimal,
        minimum_threshold: Decimal,
    ) -> AppResult<PeriodSnapshot> {
        let closing = snapshot.closing_with(adjustment).ok_or_else(|| {
            AppError::validation(
                "adjustment",
                format!("adjustment {} puts the closing balance out of range", adjustment),
            )
        })?;
        let status = StockStatus::classify(closing, minimum_threshold);

        Ok(self
            .store
            .update_snapshot_balance(snapshot.id, adjustment, closing, status)
            .await?)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<PeriodSnapshot> {
        self.store
            .get_snapshot(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Snapshot {}", id)))
    }
}
