//! Configuration management for the Spice ERP backend
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with SPICE_ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;
use shared::{default_processes, LedgerKind, LedgerProfile, ProcessDefinition, ProcessStage};

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Which store backs the engine
    pub storage: StorageConfig,

    /// Period reconciliation settings
    pub reconciliation: ReconciliationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProcessConfig {
    pub name: String,
    pub stage: ProcessStage,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReconciliationConfig {
    /// Entities reconciled concurrently within one period
    pub max_concurrency: usize,

    /// Process whose task assignments count as raw material utilization
    pub utilization_process: String,

    /// Production process catalogue; the built-in catalogue when empty
    #[serde(default)]
    pub production_processes: Vec<ProcessConfig>,
}

impl ReconciliationConfig {
    /// Build the engine profile for a ledger
    pub fn profile(&self, kind: LedgerKind) -> LedgerProfile {
        match kind {
            LedgerKind::Stock => LedgerProfile::stock(&self.utilization_process),
            LedgerKind::Production => {
                let processes = if self.production_processes.is_empty() {
                    default_processes()
                } else {
                    self.production_processes
                        .iter()
                        .map(|p| ProcessDefinition::new(p.name.clone(), p.stage))
                        .collect()
                };
                LedgerProfile::production(processes)
            }
            LedgerKind::Inventory => LedgerProfile::inventory(),
        }
    }
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            utilization_process: shared::DEFAULT_UTILIZATION_PROCESS.to_string(),
            production_processes: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("SPICE_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.url", "postgres://localhost/spice_erp")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("storage.backend", "postgres")?
            .set_default("reconciliation.max_concurrency", 4)?
            .set_default(
                "reconciliation.utilization_process",
                shared::DEFAULT_UTILIZATION_PROCESS,
            )?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (SPICE_ prefix)
            .add_source(
                Environment::with_prefix("SPICE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profiles() {
        let config = ReconciliationConfig::default();

        let stock = config.profile(LedgerKind::Stock);
        assert!(!stock.is_dimensioned());
        assert!(stock.writes_back_stock);

        let production = config.profile(LedgerKind::Production);
        assert_eq!(production.processes, default_processes());
        assert!(!production.writes_back_stock);
    }

    #[test]
    fn test_custom_process_catalogue() {
        let config = ReconciliationConfig {
            production_processes: vec![ProcessConfig {
                name: "Drying".into(),
                stage: ProcessStage::PreProduction,
            }],
            ..Default::default()
        };

        let production = config.profile(LedgerKind::Production);
        assert_eq!(production.processes.len(), 1);
        assert_eq!(production.processes[0].name, "Drying");
    }
}
