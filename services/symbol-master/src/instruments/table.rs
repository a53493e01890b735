//! Immutable master table snapshot with lookup indices
//!
//! Built once per refresh from normalized records. Construction validates the
//! snapshot and precomputes everything the query engine needs, so queries
//! are pure lookups.

use super::types::{ContractKey, InstrumentKind, InstrumentRecord};
use crate::error::StoreError;
use chrono::NaiveDate;
use common::Px;
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;
use std::collections::hash_map::Entry;
use tracing::debug;

/// `(symbol, instrument)` grouping used for expiries and strike steps
pub type GroupKey = (String, InstrumentKind);

/// Normalized instrument table with lookup indices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterTable {
    /// Rows in file order
    pub(super) records: Vec<InstrumentRecord>,

    /// Trading symbol -> row
    pub(super) by_trading_symbol: FxHashMap<String, usize>,

    /// Token -> row
    pub(super) by_token: FxHashMap<String, usize>,

    /// Contract components -> rows
    pub(super) by_contract: FxHashMap<ContractKey, Vec<usize>>,

    /// Distinct expiries per group, ascending
    pub(super) expiries: FxHashMap<GroupKey, Vec<NaiveDate>>,

    /// Strike step per option group
    pub(super) strike_steps: FxHashMap<GroupKey, Px>,

    /// Lot size per underlying
    pub(super) lot_sizes: FxHashMap<String, u32>,
}

impl MasterTable {
    /// Validate `records` and build the indices.
    ///
    /// Fails with [`StoreError::Validation`] on an empty table, a duplicate
    /// trading symbol or token, a zero lot size, or lot sizes that disagree
    /// within one underlying. `default_strike_step` is used for option groups
    /// with fewer than two distinct strikes.
    pub fn build(
        records: Vec<InstrumentRecord>,
        default_strike_step: Px,
    ) -> Result<Self, StoreError> {
        if records.is_empty() {
            return Err(StoreError::Validation("master table is empty".to_string()));
        }

        let capacity = records.len();
        let mut by_trading_symbol = FxHashMap::with_capacity_and_hasher(capacity, Default::default());
        let mut by_token = FxHashMap::with_capacity_and_hasher(capacity, Default::default());
        let mut by_contract: FxHashMap<ContractKey, Vec<usize>> =
            FxHashMap::with_capacity_and_hasher(capacity, Default::default());
        let mut expiry_sets: FxHashMap<GroupKey, BTreeSet<NaiveDate>> = FxHashMap::default();
        let mut strike_sets: FxHashMap<GroupKey, BTreeSet<Px>> = FxHashMap::default();
        let mut lot_sizes: FxHashMap<String, u32> = FxHashMap::default();

        for (idx, record) in records.iter().enumerate() {
            if let Some(prev) = by_trading_symbol.insert(record.trading_symbol.clone(), idx) {
                return Err(StoreError::Validation(format!(
                    "duplicate trading symbol {} (rows {} and {})",
                    record.trading_symbol, prev, idx
                )));
            }
            if let Some(prev) = by_token.insert(record.token.clone(), idx) {
                return Err(StoreError::Validation(format!(
                    "duplicate token {} ({} and {})",
                    record.token, records[prev].trading_symbol, record.trading_symbol
                )));
            }

            if record.lot_size == 0 {
                return Err(StoreError::Validation(format!(
                    "zero lot size for {}",
                    record.trading_symbol
                )));
            }
            match lot_sizes.entry(record.symbol.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(record.lot_size);
                }
                Entry::Occupied(slot) if *slot.get() != record.lot_size => {
                    return Err(StoreError::Validation(format!(
                        "lot size mismatch for {}: {} vs {} on {}",
                        record.symbol,
                        slot.get(),
                        record.lot_size,
                        record.trading_symbol
                    )));
                }
                Entry::Occupied(_) => {}
            }

            by_contract
                .entry(record.contract_key())
                .or_default()
                .push(idx);

            let group = (record.symbol.clone(), record.instrument);
            expiry_sets
                .entry(group.clone())
                .or_default()
                .insert(record.expiry);
            if let Some(strike) = record.strike_price {
                strike_sets.entry(group).or_default().insert(strike);
            }
        }

        let expiries = expiry_sets
            .into_iter()
            .map(|(group, dates)| (group, dates.into_iter().collect()))
            .collect();

        let strike_steps = strike_sets
            .into_iter()
            .map(|(group, strikes)| {
                let step = min_strike_gap(&strikes).unwrap_or(default_strike_step);
                debug!("Strike step for {} {}: {}", group.0, group.1, step);
                (group, step)
            })
            .collect();

        Ok(Self {
            records,
            by_trading_symbol,
            by_token,
            by_contract,
            expiries,
            strike_steps,
            lot_sizes,
        })
    }

    /// All rows in file order
    #[must_use]
    pub fn records(&self) -> &[InstrumentRecord] {
        &self.records
    }

    /// Number of rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when the table has no rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct underlyings, sorted
    #[must_use]
    pub fn symbols(&self) -> Vec<&str> {
        let mut symbols: Vec<&str> = self.lot_sizes.keys().map(String::as_str).collect();
        symbols.sort_unstable();
        symbols
    }
}

/// Smallest gap between consecutive distinct strikes; `None` below two strikes
fn min_strike_gap(strikes: &BTreeSet<Px>) -> Option<Px> {
    strikes
        .iter()
        .zip(strikes.iter().skip(1))
        .map(|(lo, hi)| hi.abs_diff(*lo))
        .filter(Px::is_positive)
        .min()
}
