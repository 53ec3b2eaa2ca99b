//! HTTP handlers for stock, production and inventory status

use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    Json,
};
use rust_decimal::Decimal;
use shared::{
    parse_adjustment, AdjustmentRequest, LedgerKind, PeriodKey, PeriodSnapshot, ReconcileRequest,
};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::{ReconciliationService, StatusReport};
use crate::AppState;

fn ledger_service(state: &AppState, ledger: &str) -> AppResult<ReconciliationService> {
    let kind = ledger
        .parse::<LedgerKind>()
        .map_err(|_| AppError::NotFound(format!("Ledger {}", ledger)))?;

    let settings = &state.config.reconciliation;
    Ok(ReconciliationService::new(
        state.store.clone(),
        settings.profile(kind),
        settings.max_concurrency,
    ))
}

/// Reconcile the period containing `status_date`
pub async fn reconcile_period(
    State(state): State<AppState>,
    Path(ledger): Path<String>,
    Json(input): Json<ReconcileRequest>,
) -> AppResult<Json<StatusReport>> {
    input.validate()?;

    let service = ledger_service(&state, &ledger)?;
    let report = service
        .reconcile_period(
            input.status_date,
            input.entity_ids.as_deref(),
            input.dimension.as_deref(),
        )
        .await?;
    Ok(Json(report))
}

/// Apply edited adjustments; non-numeric values count as 0
pub async fn apply_adjustments(
    State(state): State<AppState>,
    Path(ledger): Path<String>,
    Json(input): Json<AdjustmentRequest>,
) -> AppResult<Json<StatusReport>> {
    input.validate()?;

    let adjustments: HashMap<Uuid, Decimal> = input
        .adjustments
        .iter()
        .map(|(id, value)| (*id, parse_adjustment(value)))
        .collect();

    let service = ledger_service(&state, &ledger)?;
    let report = service.apply_adjustments(&adjustments).await?;
    Ok(Json(report))
}

/// List stored snapshots of a period (e.g. `Jan-2024`) without creating any
pub async fn get_period_snapshots(
    State(state): State<AppState>,
    Path((ledger, period)): Path<(String, String)>,
) -> AppResult<Json<StatusReport>> {
    let period = period
        .parse::<PeriodKey>()
        .map_err(|e| AppError::validation("period", e.to_string()))?;

    let service = ledger_service(&state, &ledger)?;
    let report = service.period_snapshots(period).await?;
    Ok(Json(report))
}

/// Snapshot history of one entity, oldest period first
pub async fn get_entity_history(
    State(state): State<AppState>,
    Path((ledger, entity_id)): Path<(String, Uuid)>,
) -> AppResult<Json<Vec<PeriodSnapshot>>> {
    let service = ledger_service(&state, &ledger)?;
    let history = service.entity_history(entity_id).await?;
    Ok(Json(history))
}
