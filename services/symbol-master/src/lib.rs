//! BFO symbol master cache and instrument query engine
//!
//! Keeps one validated snapshot of the exchange symbol master per trading
//! day and resolves human-level contract descriptions into expiries,
//! trading symbols, tokens, strike steps and lot sizes.

pub mod clock;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod instruments;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::SymbolMasterConfig;
pub use error::{FetchError, QueryError, StoreError};
pub use fetcher::{HttpFetcher, MasterFetcher};
pub use instruments::{
    ContractSpec, Expiry, ExpiryType, InitOutcome, InstrumentKind, InstrumentRecord, MasterStore,
    MasterTable, OptionType, RefreshState, TokenQuery,
};
