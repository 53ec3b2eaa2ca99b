//! In-memory balance store for tests and local demos

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use shared::{
    Entity, EntitySource, LedgerKind, NewSnapshot, PeriodKey, PeriodSnapshot, SnapshotKey,
    StockStatus, Transaction, TransactionQuery,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{BalanceStore, StoreResult};
use crate::error::StoreError;

#[derive(Default)]
struct State {
    entities: Vec<Entity>,
    transactions: Vec<Transaction>,
    snapshots: HashMap<Uuid, PeriodSnapshot>,
    /// Enforces one snapshot per key, like the SQL unique constraint
    keys: HashMap<SnapshotKey, Uuid>,
    failing_reads: HashSet<Uuid>,
    failing_writes: HashSet<Uuid>,
}

/// Balance store held entirely in memory.
///
/// Failures can be injected per entity to exercise partial batch results.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_entity(&self, entity: Entity) {
        self.state.write().await.entities.push(entity);
    }

    pub async fn record_transaction(&self, transaction: Transaction) {
        self.state.write().await.transactions.push(transaction);
    }

    /// Transaction reads for this entity fail with a read error
    pub async fn fail_reads_for(&self, entity_id: Uuid) {
        self.state.write().await.failing_reads.insert(entity_id);
    }

    /// Snapshot inserts and stock updates for this entity fail
    pub async fn fail_writes_for(&self, entity_id: Uuid) {
        self.state.write().await.failing_writes.insert(entity_id);
    }

    pub async fn clear_failures(&self) {
        let mut state = self.state.write().await;
        state.failing_reads.clear();
        state.failing_writes.clear();
    }

    pub async fn snapshot_count(&self) -> usize {
        self.state.read().await.snapshots.len()
    }

    pub async fn entity(&self, source: EntitySource, id: Uuid) -> Option<Entity> {
        self.state
            .read()
            .await
            .entities
            .iter()
            .find(|e| e.source == source && e.id == id)
            .cloned()
    }
}

#[async_trait]
impl BalanceStore for MemoryStore {
    async fn query_entities(
        &self,
        source: EntitySource,
        ids: Option<&[Uuid]>,
    ) -> StoreResult<Vec<Entity>> {
        let state = self.state.read().await;
        let mut entities: Vec<Entity> = state
            .entities
            .iter()
            .filter(|e| e.source == source)
            .filter(|e| ids.map_or(true, |ids| ids.contains(&e.id)))
            .cloned()
            .collect();
        entities.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entities)
    }

    async fn get_entity(&self, source: EntitySource, id: Uuid) -> StoreResult<Option<Entity>> {
        Ok(self.entity(source, id).await)
    }

    async fn query_transactions(&self, query: &TransactionQuery) -> StoreResult<Vec<Transaction>> {
        let state = self.state.read().await;
        if state.failing_reads.contains(&query.entity_id) {
            return Err(StoreError::Read(format!(
                "transactions unavailable for {}",
                query.entity_id
            )));
        }

        Ok(state
            .transactions
            .iter()
            .filter(|t| query.matches(t))
            .cloned()
            .collect())
    }

    async fn read_snapshot(&self, key: &SnapshotKey) -> StoreResult<Option<PeriodSnapshot>> {
        let state = self.state.read().await;
        Ok(state
            .keys
            .get(key)
            .and_then(|id| state.snapshots.get(id))
            .cloned())
    }

    async fn get_snapshot(&self, id: Uuid) -> StoreResult<Option<PeriodSnapshot>> {
        Ok(self.state.read().await.snapshots.get(&id).cloned())
    }

    async fn list_snapshots(
        &self,
        ledger: LedgerKind,
        period: PeriodKey,
    ) -> StoreResult<Vec<PeriodSnapshot>> {
        let state = self.state.read().await;
        let mut snapshots: Vec<PeriodSnapshot> = state
            .snapshots
            .values()
            .filter(|s| s.ledger == ledger && s.period == period)
            .cloned()
            .collect();
        snapshots.sort_by(|a, b| {
            (a.created_at, a.dimension.as_deref()).cmp(&(b.created_at, b.dimension.as_deref()))
        });
        Ok(snapshots)
    }

    async fn entity_history(
        &self,
        ledger: LedgerKind,
        entity_id: Uuid,
    ) -> StoreResult<Vec<PeriodSnapshot>> {
        let state = self.state.read().await;
        let mut snapshots: Vec<PeriodSnapshot> = state
            .snapshots
            .values()
            .filter(|s| s.ledger == ledger && s.entity_id == entity_id)
            .cloned()
            .collect();
        snapshots.sort_by(|a, b| {
            (a.period, a.dimension.as_deref()).cmp(&(b.period, b.dimension.as_deref()))
        });
        Ok(snapshots)
    }

    async fn insert_snapshot(&self, snapshot: &NewSnapshot) -> StoreResult<PeriodSnapshot> {
        let mut state = self.state.write().await;
        if state.failing_writes.contains(&snapshot.key.entity_id) {
            return Err(StoreError::Write(format!(
                "insert rejected for {}",
                snapshot.key.entity_id
            )));
        }
        if state.keys.contains_key(&snapshot.key) {
            return Err(StoreError::UniqueViolation(format!(
                "snapshot already exists for {} {}",
                snapshot.key.entity_id, snapshot.key.period
            )));
        }

        let row = PeriodSnapshot::from_new(snapshot.clone(), Utc::now());
        state.keys.insert(snapshot.key.clone(), row.id);
        state.snapshots.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_snapshot_balance(
        &self,
        id: Uuid,
        adjustment: Decimal,
        closing_balance: Decimal,
        status: StockStatus,
    ) -> StoreResult<PeriodSnapshot> {
        let mut state = self.state.write().await;
        let failing = state
            .snapshots
            .get(&id)
            .is_some_and(|s| state.failing_writes.contains(&s.entity_id));
        if failing {
            return Err(StoreError::Write(format!("update rejected for snapshot {}", id)));
        }

        let row = state
            .snapshots
            .get_mut(&id)
            .ok_or_else(|| StoreError::Write(format!("snapshot {} not found", id)))?;
        row.adjustment = adjustment;
        row.closing_balance = closing_balance;
        row.status = status;
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn update_entity_stock(
        &self,
        source: EntitySource,
        id: Uuid,
        current_stock: Decimal,
    ) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if state.failing_writes.contains(&id) {
            return Err(StoreError::Write(format!("stock update rejected for {}", id)));
        }

        let entity = state
            .entities
            .iter_mut()
            .find(|e| e.source == source && e.id == id)
            .ok_or_else(|| StoreError::Write(format!("entity {} not found", id)))?;
        entity.current_stock = current_stock;
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
