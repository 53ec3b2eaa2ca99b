//! Period balance engine services

pub mod aggregator;
pub mod reconciliation;
pub mod snapshot;

pub use aggregator::TransactionAggregator;
pub use reconciliation::{
    EntitySummary, ReconciliationService, RowError, RowOutcome, RowResult, StatusReport,
};
pub use snapshot::SnapshotGateway;
