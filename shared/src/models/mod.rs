//! Domain models for the period balance engine

mod entity;
mod ledger;
mod request;
mod snapshot;
mod status;
mod transaction;

pub use entity::*;
pub use ledger::*;
pub use request::*;
pub use snapshot::*;
pub use status::*;
pub use transaction::*;
