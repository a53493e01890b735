//! Derivatives symbol master: normalization, snapshot store and queries

pub mod parser;
pub mod query;
pub mod service;
pub mod table;
pub mod types;

pub use query::{ContractSpec, Expiry, ExpiryType, TokenQuery};
pub use service::{InitOutcome, MasterStore, Snapshot};
pub use table::MasterTable;
pub use types::*;
