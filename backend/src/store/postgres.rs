//! PostgreSQL-backed balance store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shared::{
    ComponentAmount, DateBasis, Entity, EntitySource, LedgerKind, NewSnapshot, PeriodKey,
    PeriodSnapshot, SnapshotKey, StockStatus, Transaction, TransactionQuery, TransactionSource,
};
use sqlx::{types::Json, FromRow, PgPool};
use uuid::Uuid;

use super::{BalanceStore, StoreResult};
use crate::error::StoreError;

const SNAPSHOT_COLUMNS: &str = "id, ledger, entity_id, period_month, period_year, dimension, \
     opening_balance, inflows, outflows, informational, adjustment, closing_balance, status, \
     created_at, updated_at";

/// Balance store over the ERP's PostgreSQL schema
#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

/// Column mapping of one transaction table onto [`Transaction`]
struct SourceTable {
    table: &'static str,
    entity_col: &'static str,
    occurred_col: &'static str,
    completed_col: Option<&'static str>,
    quantity_col: &'static str,
    wastage_col: Option<&'static str>,
    process_col: Option<&'static str>,
    channel_col: Option<&'static str>,
}

fn source_table(source: TransactionSource) -> SourceTable {
    match source {
        TransactionSource::StockPurchase => SourceTable {
            table: "stock_purchases",
            entity_col: "raw_material_id",
            occurred_col: "date",
            completed_col: None,
            quantity_col: "quantity",
            wastage_col: None,
            process_col: None,
            channel_col: None,
        },
        TransactionSource::Task => SourceTable {
            table: "tasks",
            entity_col: "raw_material_id",
            occurred_col: "date_assigned",
            completed_col: Some("date_completed"),
            quantity_col: "assigned_qty",
            wastage_col: Some("wastage_qty"),
            process_col: Some("process"),
            channel_col: None,
        },
        TransactionSource::ProductionBatch => SourceTable {
            table: "production_batches",
            entity_col: "product_id",
            occurred_col: "start_date",
            completed_col: Some("completion_date"),
            quantity_col: "quantity",
            wastage_col: Some("wastage"),
            process_col: None,
            channel_col: None,
        },
        TransactionSource::Sale => SourceTable {
            table: "sales",
            entity_col: "product_id",
            occurred_col: "sale_date",
            completed_col: None,
            quantity_col: "quantity",
            wastage_col: None,
            process_col: None,
            channel_col: Some("channel_id"),
        },
    }
}

impl SourceTable {
    /// Normalized SELECT with $1 = entity id, $2..$3 = date range, $4 = process
    fn select_sql(&self, basis: DateBasis) -> String {
        let occurred = match self.completed_col {
            Some(completed) => format!("COALESCE({}, {})", self.occurred_col, completed),
            None => self.occurred_col.to_string(),
        };
        let date_filter = match (basis, self.completed_col) {
            (DateBasis::Occurred, _) => format!("{} BETWEEN $2 AND $3", self.occurred_col),
            (DateBasis::Completed, Some(completed)) => format!("{} BETWEEN $2 AND $3", completed),
            (DateBasis::Completed, None) => "FALSE AND $2::date IS NULL AND $3::date IS NULL".to_string(),
        };
        let process = self.process_col.unwrap_or("NULL::text");

        format!(
            "SELECT id, {entity} AS entity_id, {occurred} AS occurred_on, \
                    {completed} AS completed_on, {quantity} AS quantity, \
                    {wastage} AS wastage, {process} AS process, {channel} AS channel_id \
             FROM {table} \
             WHERE {entity} = $1 AND {date_filter} AND ($4::text IS NULL OR {process} = $4) \
             ORDER BY occurred_on, id",
            entity = self.entity_col,
            occurred = occurred,
            completed = self.completed_col.unwrap_or("NULL::date"),
            quantity = self.quantity_col,
            wastage = self.wastage_col.unwrap_or("NULL::numeric"),
            process = process,
            channel = self.channel_col.unwrap_or("NULL::uuid"),
            table = self.table,
            date_filter = date_filter,
        )
    }
}

fn entity_sql(source: EntitySource) -> &'static str {
    match source {
        EntitySource::RawMaterial => {
            "SELECT id, name, category, unit, min_stock_level AS minimum_threshold, current_stock \
             FROM raw_materials \
             WHERE ($1::uuid[] IS NULL OR id = ANY($1)) \
             ORDER BY name"
        }
        EntitySource::Product => {
            "SELECT id, name, category, 'units' AS unit, min_stock AS minimum_threshold, current_stock \
             FROM products \
             WHERE ($1::uuid[] IS NULL OR id = ANY($1)) \
             ORDER BY name"
        }
    }
}

fn entity_table(source: EntitySource) -> &'static str {
    match source {
        EntitySource::RawMaterial => "raw_materials",
        EntitySource::Product => "products",
    }
}

#[derive(Debug, FromRow)]
struct EntityRow {
    id: Uuid,
    name: String,
    category: String,
    unit: String,
    minimum_threshold: Decimal,
    current_stock: Decimal,
}

impl EntityRow {
    fn into_entity(self, source: EntitySource) -> Entity {
        Entity {
            id: self.id,
            source,
            name: self.name,
            category: self.category,
            unit: self.unit,
            minimum_threshold: self.minimum_threshold,
            current_stock: self.current_stock,
        }
    }
}

#[derive(Debug, FromRow)]
struct TransactionRow {
    id: Uuid,
    entity_id: Uuid,
    occurred_on: chrono::NaiveDate,
    completed_on: Option<chrono::NaiveDate>,
    quantity: Decimal,
    wastage: Option<Decimal>,
    process: Option<String>,
    channel_id: Option<Uuid>,
}

#[derive(Debug, FromRow)]
struct SnapshotRow {
    id: Uuid,
    ledger: String,
    entity_id: Uuid,
    period_month: String,
    period_year: i32,
    dimension: String,
    opening_balance: Decimal,
    inflows: Json<Vec<ComponentAmount>>,
    outflows: Json<Vec<ComponentAmount>>,
    informational: Json<Vec<ComponentAmount>>,
    adjustment: Decimal,
    closing_balance: Decimal,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SnapshotRow> for PeriodSnapshot {
    type Error = StoreError;

    fn try_from(row: SnapshotRow) -> Result<Self, Self::Error> {
        let ledger = row.ledger.parse::<LedgerKind>().map_err(StoreError::Read)?;
        let period =
            PeriodKey::from_label(&row.period_month, row.period_year).map_err(StoreError::read)?;
        let status = row.status.parse::<StockStatus>().map_err(StoreError::Read)?;

        Ok(PeriodSnapshot {
            id: row.id,
            ledger,
            entity_id: row.entity_id,
            period,
            dimension: (!row.dimension.is_empty()).then_some(row.dimension),
            opening_balance: row.opening_balance,
            inflows: row.inflows.0,
            outflows: row.outflows.0,
            informational: row.informational.0,
            adjustment: row.adjustment,
            closing_balance: row.closing_balance,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Absent dimensions are stored as '' so the unique constraint covers them
fn dimension_column(dimension: Option<&str>) -> &str {
    dimension.unwrap_or("")
}

fn map_write_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            StoreError::UniqueViolation(db_err.message().to_string())
        }
        other => StoreError::write(other),
    }
}

#[async_trait]
impl BalanceStore for PgStore {
    async fn query_entities(
        &self,
        source: EntitySource,
        ids: Option<&[Uuid]>,
    ) -> StoreResult<Vec<Entity>> {
        let rows = sqlx::query_as::<_, EntityRow>(entity_sql(source))
            .bind(ids.map(|ids| ids.to_vec()))
            .fetch_all(&self.db)
            .await
            .map_err(StoreError::read)?;

        Ok(rows.into_iter().map(|r| r.into_entity(source)).collect())
    }

    async fn get_entity(&self, source: EntitySource, id: Uuid) -> StoreResult<Option<Entity>> {
        let mut entities = self
            .query_entities(source, Some(std::slice::from_ref(&id)))
            .await?;
        Ok(entities.pop())
    }

    async fn query_transactions(&self, query: &TransactionQuery) -> StoreResult<Vec<Transaction>> {
        let sql = source_table(query.source).select_sql(query.basis);

        let rows = sqlx::query_as::<_, TransactionRow>(&sql)
            .bind(query.entity_id)
            .bind(query.range.start)
            .bind(query.range.end)
            .bind(query.process.as_deref())
            .fetch_all(&self.db)
            .await
            .map_err(StoreError::read)?;

        Ok(rows
            .into_iter()
            .map(|r| Transaction {
                id: r.id,
                source: query.source,
                entity_id: r.entity_id,
                occurred_on: r.occurred_on,
                completed_on: r.completed_on,
                quantity: r.quantity,
                wastage: r.wastage,
                process: r.process,
                channel_id: r.channel_id,
            })
            .collect())
    }

    async fn read_snapshot(&self, key: &SnapshotKey) -> StoreResult<Option<PeriodSnapshot>> {
        let sql = format!(
            "SELECT {} FROM period_snapshots \
             WHERE ledger = $1 AND entity_id = $2 AND period_month = $3 AND period_year = $4 \
               AND dimension = $5",
            SNAPSHOT_COLUMNS
        );

        let row = sqlx::query_as::<_, SnapshotRow>(&sql)
            .bind(key.ledger.as_str())
            .bind(key.entity_id)
            .bind(key.period.month_label())
            .bind(key.period.year())
            .bind(dimension_column(key.dimension.as_deref()))
            .fetch_optional(&self.db)
            .await
            .map_err(StoreError::read)?;

        row.map(PeriodSnapshot::try_from).transpose()
    }

    async fn get_snapshot(&self, id: Uuid) -> StoreResult<Option<PeriodSnapshot>> {
        let sql = format!("SELECT {} FROM period_snapshots WHERE id = $1", SNAPSHOT_COLUMNS);

        let row = sqlx::query_as::<_, SnapshotRow>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .map_err(StoreError::read)?;

        row.map(PeriodSnapshot::try_from).transpose()
    }

    async fn list_snapshots(
        &self,
        ledger: LedgerKind,
        period: PeriodKey,
    ) -> StoreResult<Vec<PeriodSnapshot>> {
        let sql = format!(
            "SELECT {} FROM period_snapshots \
             WHERE ledger = $1 AND period_month = $2 AND period_year = $3 \
             ORDER BY created_at, dimension",
            SNAPSHOT_COLUMNS
        );

        let rows = sqlx::query_as::<_, SnapshotRow>(&sql)
            .bind(ledger.as_str())
            .bind(period.month_label())
            .bind(period.year())
            .fetch_all(&self.db)
            .await
            .map_err(StoreError::read)?;

        rows.into_iter().map(PeriodSnapshot::try_from).collect()
    }

    async fn entity_history(
        &self,
        ledger: LedgerKind,
        entity_id: Uuid,
    ) -> StoreResult<Vec<PeriodSnapshot>> {
        let sql = format!(
            "SELECT {} FROM period_snapshots WHERE ledger = $1 AND entity_id = $2",
            SNAPSHOT_COLUMNS
        );

        let rows = sqlx::query_as::<_, SnapshotRow>(&sql)
            .bind(ledger.as_str())
            .bind(entity_id)
            .fetch_all(&self.db)
            .await
            .map_err(StoreError::read)?;

        // Month labels don't sort chronologically in SQL
        let mut snapshots = rows
            .into_iter()
            .map(PeriodSnapshot::try_from)
            .collect::<StoreResult<Vec<_>>>()?;
        snapshots.sort_by(|a, b| {
            (a.period, a.dimension.as_deref()).cmp(&(b.period, b.dimension.as_deref()))
        });
        Ok(snapshots)
    }

    async fn insert_snapshot(&self, snapshot: &NewSnapshot) -> StoreResult<PeriodSnapshot> {
        let sql = format!(
            r#"
            INSERT INTO period_snapshots (
                ledger, entity_id, period_month, period_year, dimension,
                opening_balance, inflows, outflows, informational,
                adjustment, closing_balance, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {}
            "#,
            SNAPSHOT_COLUMNS
        );

        let key = &snapshot.key;
        let figures = &snapshot.figures;

        let row = sqlx::query_as::<_, SnapshotRow>(&sql)
            .bind(key.ledger.as_str())
            .bind(key.entity_id)
            .bind(key.period.month_label())
            .bind(key.period.year())
            .bind(dimension_column(key.dimension.as_deref()))
            .bind(figures.opening_balance)
            .bind(Json(&figures.inflows))
            .bind(Json(&figures.outflows))
            .bind(Json(&snapshot.informational))
            .bind(figures.adjustment)
            .bind(figures.closing_balance)
            .bind(snapshot.status.as_str())
            .fetch_one(&self.db)
            .await
            .map_err(map_write_error)?;

        PeriodSnapshot::try_from(row)
    }

    async fn update_snapshot_balance(
        &self,
        id: Uuid,
        adjustment: Decimal,
        closing_balance: Decimal,
        status: StockStatus,
    ) -> StoreResult<PeriodSnapshot> {
        let sql = format!(
            r#"
            UPDATE period_snapshots
            SET adjustment = $1, closing_balance = $2, status = $3, updated_at = NOW()
            WHERE id = $4
            RETURNING {}
            "#,
            SNAPSHOT_COLUMNS
        );

        let row = sqlx::query_as::<_, SnapshotRow>(&sql)
            .bind(adjustment)
            .bind(closing_balance)
            .bind(status.as_str())
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .map_err(map_write_error)?
            .ok_or_else(|| StoreError::Write(format!("snapshot {} not found", id)))?;

        PeriodSnapshot::try_from(row)
    }

    async fn update_entity_stock(
        &self,
        source: EntitySource,
        id: Uuid,
        current_stock: Decimal,
    ) -> StoreResult<()> {
        let sql = format!(
            "UPDATE {} SET current_stock = $1, updated_at = NOW() WHERE id = $2",
            entity_table(source)
        );

        let result = sqlx::query(&sql)
            .bind(current_stock)
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(map_write_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Write(format!(
                "{} {} not found",
                entity_table(source),
                id
            )));
        }

        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.db)
            .await
            .map_err(StoreError::read)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_sql_filters_on_basis_column() {
        let table = source_table(TransactionSource::Task);

        let sql = table.select_sql(DateBasis::Completed);
        assert!(sql.contains("date_completed BETWEEN $2 AND $3"));
        assert!(sql.contains("process = $4"));

        let sql = table.select_sql(DateBasis::Occurred);
        assert!(sql.contains("date_assigned BETWEEN $2 AND $3"));
    }

    #[test]
    fn test_completed_basis_without_completion_column_matches_nothing() {
        let sql = source_table(TransactionSource::Sale).select_sql(DateBasis::Completed);
        assert!(sql.contains("FALSE"));
        assert!(sql.contains("NULL::text = $4"));
    }

    #[test]
    fn test_dimension_column() {
        assert_eq!(dimension_column(None), "");
        assert_eq!(dimension_column(Some("Roasting")), "Roasting");
    }
}
