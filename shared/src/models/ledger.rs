//! Ledger profiles: the mapping configuration each status feature hands to
//! the generic balance engine

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{DateBasis, EntitySource, Measure, TransactionQuery, TransactionSource};
use crate::types::DateRange;

/// The three balance-tracking features
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerKind {
    /// Raw material stock status
    Stock,
    /// Per-process production status
    Production,
    /// Finished product inventory status
    Inventory,
}

impl LedgerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerKind::Stock => "stock",
            LedgerKind::Production => "production",
            LedgerKind::Inventory => "inventory",
        }
    }
}

impl fmt::Display for LedgerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LedgerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stock" => Ok(LedgerKind::Stock),
            "production" => Ok(LedgerKind::Production),
            "inventory" => Ok(LedgerKind::Inventory),
            other => Err(format!("unknown ledger: {}", other)),
        }
    }
}

/// How a component participates in the balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentRole {
    Inflow,
    Outflow,
    /// Aggregated and stored, but not part of the recurrence
    Informational,
}

/// Process restriction applied to task-based components
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "name")]
pub enum ProcessFilter {
    Any,
    Fixed(String),
    /// Use the snapshot's dimension as the process name
    Dimension,
}

/// One named inflow/outflow component and how to aggregate it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentSpec {
    pub name: String,
    pub role: ComponentRole,
    pub source: TransactionSource,
    pub basis: DateBasis,
    pub measure: Measure,
    pub process: ProcessFilter,
}

impl ComponentSpec {
    fn new(
        name: &str,
        role: ComponentRole,
        source: TransactionSource,
        basis: DateBasis,
        measure: Measure,
        process: ProcessFilter,
    ) -> Self {
        Self {
            name: name.to_string(),
            role,
            source,
            basis,
            measure,
            process,
        }
    }

    /// Build the store query for this component, or `None` when the
    /// component is scoped to a dimension and none was given.
    pub fn query(
        &self,
        entity_id: Uuid,
        range: DateRange,
        dimension: Option<&str>,
    ) -> Option<TransactionQuery> {
        let process = match &self.process {
            ProcessFilter::Any => None,
            ProcessFilter::Fixed(name) => Some(name.clone()),
            ProcessFilter::Dimension => Some(dimension?.to_string()),
        };

        Some(TransactionQuery {
            source: self.source,
            entity_id,
            basis: self.basis,
            range,
            process,
        })
    }
}

/// Where the opening balance comes from when no prior snapshot exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedSource {
    CurrentStock,
    Zero,
}

/// Stage a production process belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProcessStage {
    PreProduction,
    Production,
}

/// A named process in the production catalogue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessDefinition {
    pub name: String,
    pub stage: ProcessStage,
}

impl ProcessDefinition {
    pub fn new(name: impl Into<String>, stage: ProcessStage) -> Self {
        Self {
            name: name.into(),
            stage,
        }
    }
}

/// Default process catalogue for the production ledger
pub fn default_processes() -> Vec<ProcessDefinition> {
    let pre = ["Cleaning", "C & D", "Seeds C & D", "Roasting", "RFP", "Sample"];
    let prod = ["Grinding", "Packing"];

    pre.iter()
        .map(|name| ProcessDefinition::new(*name, ProcessStage::PreProduction))
        .chain(
            prod.iter()
                .map(|name| ProcessDefinition::new(*name, ProcessStage::Production)),
        )
        .collect()
}

/// Process whose task assignments count as raw material utilization
pub const DEFAULT_UTILIZATION_PROCESS: &str = "Cleaning";

/// Everything the engine needs to know about one ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerProfile {
    pub kind: LedgerKind,
    pub entity_source: EntitySource,
    pub seed: SeedSource,
    pub components: Vec<ComponentSpec>,
    /// Dimension values; empty for ledgers keyed only by (entity, period)
    pub processes: Vec<ProcessDefinition>,
    /// Whether applied adjustments write the closing balance back onto the
    /// entity's current stock
    pub writes_back_stock: bool,
}

impl LedgerProfile {
    /// Raw material stock: purchases in, utilization by one process out
    pub fn stock(utilization_process: &str) -> Self {
        Self {
            kind: LedgerKind::Stock,
            entity_source: EntitySource::RawMaterial,
            seed: SeedSource::CurrentStock,
            components: vec![
                ComponentSpec::new(
                    "purchases",
                    ComponentRole::Inflow,
                    TransactionSource::StockPurchase,
                    DateBasis::Occurred,
                    Measure::Quantity,
                    ProcessFilter::Any,
                ),
                ComponentSpec::new(
                    "utilized",
                    ComponentRole::Outflow,
                    TransactionSource::Task,
                    DateBasis::Occurred,
                    Measure::Quantity,
                    ProcessFilter::Fixed(utilization_process.to_string()),
                ),
            ],
            processes: Vec::new(),
            writes_back_stock: true,
        }
    }

    /// Per-process production: completed work in, wastage out
    pub fn production(processes: Vec<ProcessDefinition>) -> Self {
        Self {
            kind: LedgerKind::Production,
            entity_source: EntitySource::RawMaterial,
            seed: SeedSource::Zero,
            components: vec![
                ComponentSpec::new(
                    "assigned",
                    ComponentRole::Informational,
                    TransactionSource::Task,
                    DateBasis::Occurred,
                    Measure::Quantity,
                    ProcessFilter::Dimension,
                ),
                ComponentSpec::new(
                    "completed",
                    ComponentRole::Inflow,
                    TransactionSource::Task,
                    DateBasis::Completed,
                    Measure::Quantity,
                    ProcessFilter::Dimension,
                ),
                ComponentSpec::new(
                    "wastage",
                    ComponentRole::Outflow,
                    TransactionSource::Task,
                    DateBasis::Completed,
                    Measure::Wastage,
                    ProcessFilter::Dimension,
                ),
            ],
            processes,
            writes_back_stock: false,
        }
    }

    /// Finished products: produced batches in, units sold out
    pub fn inventory() -> Self {
        Self {
            kind: LedgerKind::Inventory,
            entity_source: EntitySource::Product,
            seed: SeedSource::CurrentStock,
            components: vec![
                ComponentSpec::new(
                    "produced",
                    ComponentRole::Inflow,
                    TransactionSource::ProductionBatch,
                    DateBasis::Completed,
                    Measure::Quantity,
                    ProcessFilter::Any,
                ),
                ComponentSpec::new(
                    "sold",
                    ComponentRole::Outflow,
                    TransactionSource::Sale,
                    DateBasis::Occurred,
                    Measure::Quantity,
                    ProcessFilter::Any,
                ),
            ],
            processes: Vec::new(),
            writes_back_stock: true,
        }
    }

    pub fn is_dimensioned(&self) -> bool {
        !self.processes.is_empty()
    }

    /// Dimension values a reconciliation covers. Non-dimensioned ledgers
    /// yield a single `None`.
    pub fn dimensions(&self, only: Option<&str>) -> Result<Vec<Option<String>>, String> {
        match (self.is_dimensioned(), only) {
            (false, None) => Ok(vec![None]),
            (false, Some(d)) => Err(format!("ledger {} has no dimension {}", self.kind, d)),
            (true, None) => Ok(self
                .processes
                .iter()
                .map(|p| Some(p.name.clone()))
                .collect()),
            (true, Some(d)) => self
                .processes
                .iter()
                .find(|p| p.name == d)
                .map(|p| vec![Some(p.name.clone())])
                .ok_or_else(|| format!("unknown process: {}", d)),
        }
    }

    pub fn process_stage(&self, dimension: Option<&str>) -> Option<ProcessStage> {
        let name = dimension?;
        self.processes.iter().find(|p| p.name == name).map(|p| p.stage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn range() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        )
    }

    #[test]
    fn test_stock_profile_restricts_utilization_to_process() {
        let profile = LedgerProfile::stock("Cleaning");
        let utilized = profile
            .components
            .iter()
            .find(|c| c.name == "utilized")
            .unwrap();

        let query = utilized.query(Uuid::nil(), range(), None).unwrap();
        assert_eq!(query.process.as_deref(), Some("Cleaning"));
        assert_eq!(query.source, TransactionSource::Task);
    }

    #[test]
    fn test_dimension_component_requires_dimension() {
        let profile = LedgerProfile::production(default_processes());
        let completed = &profile.components[1];

        assert!(completed.query(Uuid::nil(), range(), None).is_none());
        let query = completed.query(Uuid::nil(), range(), Some("Roasting")).unwrap();
        assert_eq!(query.process.as_deref(), Some("Roasting"));
        assert_eq!(query.basis, DateBasis::Completed);
    }

    #[test]
    fn test_dimensions() {
        let stock = LedgerProfile::stock("Cleaning");
        assert_eq!(stock.dimensions(None).unwrap(), vec![None]);
        assert!(stock.dimensions(Some("Cleaning")).is_err());

        let production = LedgerProfile::production(default_processes());
        assert_eq!(production.dimensions(None).unwrap().len(), 8);
        assert_eq!(
            production.dimensions(Some("Packing")).unwrap(),
            vec![Some("Packing".to_string())]
        );
        assert!(production.dimensions(Some("Smoking")).is_err());
        assert_eq!(
            production.process_stage(Some("Grinding")),
            Some(ProcessStage::Production)
        );
    }

    #[test]
    fn test_ledger_kind_parsing() {
        assert_eq!("inventory".parse::<LedgerKind>(), Ok(LedgerKind::Inventory));
        assert!("sales".parse::<LedgerKind>().is_err());
    }
}
