//! Request payloads shared by the API and the browser client

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Reconcile a period for a ledger
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReconcileRequest {
    /// Any date inside the requested period
    pub status_date: NaiveDate,
    /// Restrict to these entities; all entities when absent
    #[validate(length(min = 1, message = "entity_ids cannot be empty when provided"))]
    pub entity_ids: Option<Vec<Uuid>>,
    /// Restrict a dimensioned ledger to one process
    #[validate(length(min = 1, message = "dimension cannot be empty"))]
    pub dimension: Option<String>,
}

/// User-edited adjustments keyed by snapshot id. Values are raw user input
/// and are parsed leniently.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AdjustmentRequest {
    #[validate(length(min = 1, message = "at least one adjustment is required"))]
    pub adjustments: HashMap<Uuid, serde_json::Value>,
}
