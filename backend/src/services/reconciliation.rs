//! Reconciliation driver: builds, labels and adjusts period snapshots for
//! every entity of a ledger

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use rust_decimal::Decimal;
use serde::Serialize;
use shared::{
    BalanceFigures, ComponentAmount, ComponentRole, Entity, LedgerKind, LedgerProfile,
    NewSnapshot, PeriodKey, PeriodSnapshot, ProcessStage, SeedSource, SnapshotKey,
    StatusSummary, StockStatus,
};
use uuid::Uuid;

use super::{SnapshotGateway, TransactionAggregator};
use crate::error::{AppError, AppResult};
use crate::store::BalanceStore;

/// Entity fields shown next to a snapshot
#[derive(Debug, Clone, Serialize)]
pub struct EntitySummary {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub unit: String,
    pub minimum_threshold: Decimal,
}

impl From<&Entity> for EntitySummary {
    fn from(entity: &Entity) -> Self {
        Self {
            id: entity.id,
            name: entity.name.clone(),
            category: entity.category.clone(),
            unit: entity.unit.clone(),
            minimum_threshold: entity.minimum_threshold,
        }
    }
}

/// Why one row of a batch could not be produced
#[derive(Debug, Clone, Serialize)]
pub struct RowError {
    pub code: String,
    pub message: String,
    pub retryable: bool,
}

impl From<&AppError> for RowError {
    fn from(err: &AppError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
            retryable: err.is_retryable(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RowOutcome {
    Ok { snapshot: PeriodSnapshot },
    Failed { error: RowError },
}

/// One row of a status report. Failed rows are reported, never dropped.
#[derive(Debug, Clone, Serialize)]
pub struct RowResult {
    pub snapshot_id: Option<Uuid>,
    /// Absent only when the entity itself could not be resolved
    pub entity: Option<EntitySummary>,
    pub dimension: Option<String>,
    pub process_stage: Option<ProcessStage>,
    #[serde(flatten)]
    pub outcome: RowOutcome,
}

impl RowResult {
    pub fn snapshot(&self) -> Option<&PeriodSnapshot> {
        match &self.outcome {
            RowOutcome::Ok { snapshot } => Some(snapshot),
            RowOutcome::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&RowError> {
        match &self.outcome {
            RowOutcome::Ok { .. } => None,
            RowOutcome::Failed { error } => Some(error),
        }
    }
}

/// Result of a reconciliation or adjustment batch
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub ledger: LedgerKind,
    pub period: Option<PeriodKey>,
    pub rows: Vec<RowResult>,
    pub summary: StatusSummary,
}

impl StatusReport {
    fn new(ledger: LedgerKind, period: Option<PeriodKey>, rows: Vec<RowResult>) -> Self {
        let mut summary = StatusSummary::default();
        for row in &rows {
            match &row.outcome {
                RowOutcome::Ok { snapshot } => summary.record(snapshot.status),
                RowOutcome::Failed { .. } => summary.record_failure(),
            }
        }

        Self {
            ledger,
            period,
            rows,
            summary,
        }
    }
}

/// Drives the balance engine for one ledger profile
pub struct ReconciliationService {
    store: Arc<dyn BalanceStore>,
    profile: LedgerProfile,
    max_concurrency: usize,
}

impl ReconciliationService {
    pub fn new(store: Arc<dyn BalanceStore>, profile: LedgerProfile, max_concurrency: usize) -> Self {
        Self {
            store,
            profile,
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub fn profile(&self) -> &LedgerProfile {
        &self.profile
    }

    /// Build or fetch the snapshot of every entity (and dimension) for the
    /// period containing `status_date`.
    ///
    /// Failures are per row: an entity whose snapshot could not be computed
    /// is reported as failed while the rest of the batch keeps its results.
    #[tracing::instrument(skip(self, entity_ids), fields(ledger = %self.profile.kind))]
    pub async fn reconcile_period(
        &self,
        status_date: NaiveDate,
        entity_ids: Option<&[Uuid]>,
        dimension: Option<&str>,
    ) -> AppResult<StatusReport> {
        let period = PeriodKey::from_date(status_date);
        let dimensions = self
            .profile
            .dimensions(dimension)
            .map_err(|msg| AppError::validation("dimension", msg))?;

        let entities = self
            .store
            .query_entities(self.profile.entity_source, entity_ids)
            .await?;

        tracing::info!(
            period = %period,
            entities = entities.len(),
            dimensions = dimensions.len(),
            "Reconciling period"
        );

        let work: Vec<(Entity, Option<String>)> = entities
            .iter()
            .flat_map(|e| dimensions.iter().map(move |d| (e.clone(), d.clone())))
            .collect();

        let rows: Vec<RowResult> = stream::iter(work)
            .map(move |(entity, dimension)| self.reconcile_row(entity, period, dimension))
            .buffered(self.max_concurrency)
            .collect()
            .await;

        Ok(StatusReport::new(self.profile.kind, Some(period), rows))
    }

    async fn reconcile_row(
        &self,
        entity: Entity,
        period: PeriodKey,
        dimension: Option<String>,
    ) -> RowResult {
        let key = SnapshotKey::new(self.profile.kind, entity.id, period, dimension.clone());
        let process_stage = self.profile.process_stage(dimension.as_deref());

        let outcome = match self.snapshot_for(&entity, &key).await {
            Ok(mut snapshot) => {
                snapshot.status =
                    StockStatus::classify(snapshot.closing_balance, entity.minimum_threshold);
                RowOutcome::Ok { snapshot }
            }
            Err(err) => {
                tracing::warn!(
                    entity_id = %entity.id,
                    period = %period,
                    dimension = ?dimension,
                    "Snapshot could not be reconciled: {}",
                    err
                );
                RowOutcome::Failed {
                    error: RowError::from(&err),
                }
            }
        };

        RowResult {
            snapshot_id: match &outcome {
                RowOutcome::Ok { snapshot } => Some(snapshot.id),
                RowOutcome::Failed { .. } => None,
            },
            entity: Some(EntitySummary::from(&entity)),
            dimension,
            process_stage,
            outcome,
        }
    }

    /// Existing snapshot, or compute every field and insert once
    async fn snapshot_for(&self, entity: &Entity, key: &SnapshotKey) -> AppResult<PeriodSnapshot> {
        let gateway = SnapshotGateway::new(self.store.as_ref());
        if let Some(existing) = gateway.find(key).await? {
            return Ok(existing);
        }

        let (figures, informational) = self.compute_figures(entity, key).await?;
        let status = figures.status(entity.minimum_threshold);

        gateway
            .create(NewSnapshot {
                key: key.clone(),
                figures,
                informational,
                status,
            })
            .await
    }

    async fn compute_figures(
        &self,
        entity: &Entity,
        key: &SnapshotKey,
    ) -> AppResult<(BalanceFigures, Vec<ComponentAmount>)> {
        let gateway = SnapshotGateway::new(self.store.as_ref());
        let aggregator = TransactionAggregator::new(self.store.as_ref());

        let opening = match gateway.previous_closing(key).await? {
            Some(closing) => closing,
            None => match self.profile.seed {
                SeedSource::CurrentStock => entity.current_stock,
                SeedSource::Zero => Decimal::ZERO,
            },
        };

        let range = key.period.date_range();
        let mut inflows = Vec::new();
        let mut outflows = Vec::new();
        let mut informational = Vec::new();

        for component in &self.profile.components {
            let amount = aggregator
                .sum(component, entity.id, range, key.dimension.as_deref())
                .await?;
            match component.role {
                ComponentRole::Inflow => inflows.push(amount),
                ComponentRole::Outflow => outflows.push(amount),
                ComponentRole::Informational => informational.push(amount),
            }
        }

        // New snapshots never inherit an adjustment
        let figures = BalanceFigures::compute(opening, inflows, outflows, Decimal::ZERO)
            .ok_or_else(|| {
                AppError::validation(
                    "closing_balance",
                    format!("closing balance of entity {} is out of range", entity.id),
                )
            })?;
        Ok((figures, informational))
    }

    /// Apply user-edited adjustments to displayed snapshots and write each new
    /// closing balance back onto its entity's current stock.
    #[tracing::instrument(skip(self, adjustments), fields(ledger = %self.profile.kind, count = adjustments.len()))]
    pub async fn apply_adjustments(
        &self,
        adjustments: &HashMap<Uuid, Decimal>,
    ) -> AppResult<StatusReport> {
        let mut ids: Vec<&Uuid> = adjustments.keys().collect();
        ids.sort();

        let mut rows = Vec::with_capacity(ids.len());
        for id in ids {
            rows.push(self.apply_row(*id, adjustments[id]).await);
        }
        self.sort_rows(&mut rows);

        let mut periods = rows.iter().filter_map(|r| r.snapshot().map(|s| s.period));
        let period = periods.next().filter(|first| periods.all(|p| p == *first));

        Ok(StatusReport::new(self.profile.kind, period, rows))
    }

    async fn apply_row(&self, snapshot_id: Uuid, adjustment: Decimal) -> RowResult {
        let mut row = RowResult {
            snapshot_id: Some(snapshot_id),
            entity: None,
            dimension: None,
            process_stage: None,
            outcome: RowOutcome::Failed {
                error: RowError::from(&AppError::NotFound(format!("Snapshot {}", snapshot_id))),
            },
        };

        let gateway = SnapshotGateway::new(self.store.as_ref());
        let result = async {
            let snapshot = gateway.get(snapshot_id).await?;
            row.dimension = snapshot.dimension.clone();
            row.process_stage = self.profile.process_stage(snapshot.dimension.as_deref());

            if snapshot.ledger != self.profile.kind {
                return Err(AppError::validation(
                    "snapshot_id",
                    format!("snapshot {} belongs to the {} ledger", snapshot_id, snapshot.ledger),
                ));
            }

            let entity = self
                .store
                .get_entity(self.profile.entity_source, snapshot.entity_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Entity {}", snapshot.entity_id)))?;
            row.entity = Some(EntitySummary::from(&entity));

            let updated = gateway
                .update_adjustment(&snapshot, adjustment, entity.minimum_threshold)
                .await?;

            if self.profile.writes_back_stock {
                self.store
                    .update_entity_stock(entity.source, entity.id, updated.closing_balance)
                    .await?;
                tracing::info!(
                    entity_id = %entity.id,
                    current_stock = %updated.closing_balance,
                    "Entity stock synced to closing balance"
                );
            }

            Ok::<_, AppError>(updated)
        }
        .await;

        row.outcome = match result {
            Ok(snapshot) => RowOutcome::Ok { snapshot },
            Err(err) => {
                tracing::warn!(snapshot_id = %snapshot_id, "Adjustment not applied: {}", err);
                RowOutcome::Failed {
                    error: RowError::from(&err),
                }
            }
        };
        row
    }

    /// Stored snapshots of a period, labelled with current thresholds. Never
    /// creates snapshots.
    pub async fn period_snapshots(&self, period: PeriodKey) -> AppResult<StatusReport> {
        let snapshots = self.store.list_snapshots(self.profile.kind, period).await?;
        let entities: HashMap<Uuid, Entity> = self
            .store
            .query_entities(self.profile.entity_source, None)
            .await?
            .into_iter()
            .map(|e| (e.id, e))
            .collect();

        let mut rows: Vec<RowResult> = snapshots
            .into_iter()
            .map(|mut snapshot| {
                let entity = entities.get(&snapshot.entity_id);
                if let Some(entity) = entity {
                    snapshot.status =
                        StockStatus::classify(snapshot.closing_balance, entity.minimum_threshold);
                }
                RowResult {
                    snapshot_id: Some(snapshot.id),
                    entity: entity.map(EntitySummary::from),
                    dimension: snapshot.dimension.clone(),
                    process_stage: self.profile.process_stage(snapshot.dimension.as_deref()),
                    outcome: RowOutcome::Ok { snapshot },
                }
            })
            .collect();
        self.sort_rows(&mut rows);

        Ok(StatusReport::new(self.profile.kind, Some(period), rows))
    }

    /// Every stored snapshot of one entity, oldest period first
    pub async fn entity_history(&self, entity_id: Uuid) -> AppResult<Vec<PeriodSnapshot>> {
        let entity = self
            .store
            .get_entity(self.profile.entity_source, entity_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Entity {}", entity_id)))?;

        let mut history = self
            .store
            .entity_history(self.profile.kind, entity_id)
            .await?;
        for snapshot in &mut history {
            snapshot.status =
                StockStatus::classify(snapshot.closing_balance, entity.minimum_threshold);
        }
        Ok(history)
    }

    /// Entity name, then process catalogue order; unresolved entities last
    fn sort_rows(&self, rows: &mut [RowResult]) {
        let process_rank = |dimension: &Option<String>| {
            dimension
                .as_deref()
                .and_then(|d| self.profile.processes.iter().position(|p| p.name == d))
                .unwrap_or(0)
        };
        rows.sort_by(|a, b| {
            let a_key = (a.entity.is_none(), a.entity.as_ref().map(|e| e.name.clone()));
            let b_key = (b.entity.is_none(), b.entity.as_ref().map(|e| e.name.clone()));
            a_key
                .cmp(&b_key)
                .then_with(|| process_rank(&a.dimension).cmp(&process_rank(&b.dimension)))
        });
    }
}
