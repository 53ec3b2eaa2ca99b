//! Transaction aggregation: sums one component's quantities over a period

use rust_decimal::Decimal;
use shared::{ComponentAmount, ComponentSpec, DateRange, TransactionQuery};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::store::BalanceStore;

/// Sums matching transaction quantities from the transaction store
pub struct TransactionAggregator<'a> {
    store: &'a dyn BalanceStore,
}

impl<'a> TransactionAggregator<'a> {
    pub fn new(store: &'a dyn BalanceStore) -> Self {
        Self { store }
    }

    /// Sum one component for an entity over a date range.
    ///
    /// Returns zero when nothing matches. A store failure is returned as is;
    /// there is no partial sum.
    pub async fn sum(
        &self,
        component: &ComponentSpec,
        entity_id: Uuid,
        range: DateRange,
        dimension: Option<&str>,
    ) -> AppResult<ComponentAmount> {
        let Some(query) = component.query(entity_id, range, dimension) else {
            return Ok(ComponentAmount::new(component.name.clone(), Decimal::ZERO));
        };

        let amount = self.sum_query(&query, component).await?;
        Ok(ComponentAmount::new(component.name.clone(), amount))
    }

    async fn sum_query(&self, query: &TransactionQuery, component: &ComponentSpec) -> AppResult<Decimal> {
        let transactions = self.store.query_transactions(query).await?;

        transactions
            .iter()
            .filter(|t| query.matches(t))
            .try_fold(Decimal::ZERO, |acc, t| acc.checked_add(t.measure(component.measure)))
            .ok_or_else(|| {
                AppError::validation(
                    &component.name,
                    format!("{} for entity {} is out of range", component.name, query.entity_id),
                )
            })
    }
}
