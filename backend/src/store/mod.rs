//! Storage seam for the period balance engine
//!
//! The engine never talks to a database directly. Everything it reads or
//! writes goes through [`BalanceStore`], so a PostgreSQL store serves the API
//! and an in-memory store serves tests and local demos.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use rust_decimal::Decimal;
use shared::{
    Entity, EntitySource, LedgerKind, NewSnapshot, PeriodKey, PeriodSnapshot, SnapshotKey,
    StockStatus, Transaction, TransactionQuery,
};
use uuid::Uuid;

use crate::error::StoreError;

pub type StoreResult<T> = Result<T, StoreError>;

/// Capabilities the engine needs from master data, transaction and snapshot
/// storage.
#[async_trait]
pub trait BalanceStore: Send + Sync {
    /// Entities of one master table ordered by name, optionally restricted to
    /// the given ids
    async fn query_entities(
        &self,
        source: EntitySource,
        ids: Option<&[Uuid]>,
    ) -> StoreResult<Vec<Entity>>;

    async fn get_entity(&self, source: EntitySource, id: Uuid) -> StoreResult<Option<Entity>>;

    /// Transactions matching a query. Never written by the engine.
    async fn query_transactions(&self, query: &TransactionQuery) -> StoreResult<Vec<Transaction>>;

    async fn read_snapshot(&self, key: &SnapshotKey) -> StoreResult<Option<PeriodSnapshot>>;

    async fn get_snapshot(&self, id: Uuid) -> StoreResult<Option<PeriodSnapshot>>;

    async fn list_snapshots(
        &self,
        ledger: LedgerKind,
        period: PeriodKey,
    ) -> StoreResult<Vec<PeriodSnapshot>>;

    /// All snapshots of one entity in a ledger, oldest period first
    async fn entity_history(
        &self,
        ledger: LedgerKind,
        entity_id: Uuid,
    ) -> StoreResult<Vec<PeriodSnapshot>>;

    /// Single insert. Must fail with [`StoreError::UniqueViolation`] when a
    /// snapshot with the same key already exists.
    async fn insert_snapshot(&self, snapshot: &NewSnapshot) -> StoreResult<PeriodSnapshot>;

    /// Overwrite adjustment, closing balance and status of one snapshot
    async fn update_snapshot_balance(
        &self,
        id: Uuid,
        adjustment: Decimal,
        closing_balance: Decimal,
        status: StockStatus,
    ) -> StoreResult<PeriodSnapshot>;

    /// Write the cached current stock of an entity
    async fn update_entity_stock(
        &self,
        source: EntitySource,
        id: Uuid,
        current_stock: Decimal,
    ) -> StoreResult<()>;

    /// Connectivity check for health endpoints
    async fn ping(&self) -> StoreResult<()>;
}
