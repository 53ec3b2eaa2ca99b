//! Shared types and models for the Spice ERP period balance engine
//!
//! This crate contains the pure parts of the engine (period keys, the balance
//! recurrence, status classification, ledger profiles) and the types shared
//! between the backend and the browser (via WASM).

pub mod balance;
pub mod models;
pub mod period;
pub mod types;
pub mod validation;

pub use balance::*;
pub use models::*;
pub use period::*;
pub use types::*;
pub use validation::*;
