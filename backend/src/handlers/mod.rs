//! HTTP handlers

pub mod health;
pub mod status;

pub use health::health_check;
pub use status::{apply_adjustments, get_entity_history, get_period_snapshots, reconcile_period};
