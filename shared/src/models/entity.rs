//! Master data entities (raw materials and products)

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which master table an entity comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntitySource {
    RawMaterial,
    Product,
}

/// A tracked item whose balance rolls over period to period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: Uuid,
    pub source: EntitySource,
    pub name: String,
    pub category: String,
    pub unit: String,
    pub minimum_threshold: Decimal,
    /// Cache of the latest closing balance
    pub current_stock: Decimal,
}
