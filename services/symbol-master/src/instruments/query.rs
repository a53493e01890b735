//! Query engine over a [`MasterTable`] snapshot
//!
//! Every operation is a pure lookup against indices built at refresh time.
//! Caller strings are uppercased here; the table itself is already
//! normalized.

use super::table::MasterTable;
use super::types::{ContractKey, InstrumentKind, InstrumentRecord, OptionType};
use crate::error::QueryError;
use chrono::NaiveDate;
use common::Px;
use std::fmt;
use std::str::FromStr;

/// Which expiry of a `(symbol, instrument)` group to return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpiryType {
    /// Alias of [`ExpiryType::Near`]
    Current,
    /// Earliest expiry on or after today
    #[default]
    Near,
    /// Second expiry on or after today
    Next,
    /// Latest expiry
    Far,
    /// Every expiry, ascending
    All,
}

impl FromStr for ExpiryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "current" => Ok(Self::Current),
            "near" => Ok(Self::Near),
            "next" => Ok(Self::Next),
            "far" => Ok(Self::Far),
            "all" => Ok(Self::All),
            _ => Err(format!(
                "unknown expiry type '{s}', expected current, near, next, far or all"
            )),
        }
    }
}

impl fmt::Display for ExpiryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Current => "current",
            Self::Near => "near",
            Self::Next => "next",
            Self::Far => "far",
            Self::All => "all",
        })
    }
}

/// Answer to an expiry query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expiry {
    /// `near`/`current`/`next`/`far`
    Single(NaiveDate),
    /// `all`
    All(Vec<NaiveDate>),
}

impl Expiry {
    /// The single date, if this is not an `all` answer
    #[must_use]
    pub const fn single(&self) -> Option<NaiveDate> {
        match self {
            Self::Single(date) => Some(*date),
            Self::All(_) => None,
        }
    }
}

/// Contract described by its components
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractSpec {
    pub symbol: String,
    pub instrument: InstrumentKind,
    pub expiry: NaiveDate,
    pub option_type: Option<OptionType>,
    pub strike: Option<Px>,
}

impl ContractSpec {
    /// A futures contract
    pub fn future(symbol: impl Into<String>, instrument: InstrumentKind, expiry: NaiveDate) -> Self {
        Self {
            symbol: symbol.into(),
            instrument,
            expiry,
            option_type: None,
            strike: None,
        }
    }

    /// An options contract
    pub fn option(
        symbol: impl Into<String>,
        instrument: InstrumentKind,
        expiry: NaiveDate,
        option_type: OptionType,
        strike: Px,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            instrument,
            expiry,
            option_type: Some(option_type),
            strike: Some(strike),
        }
    }

    /// Normalized lookup key; rejects shapes that cannot match any row
    fn key(&self) -> Result<ContractKey, QueryError> {
        let symbol = self.symbol.trim().to_ascii_uppercase();
        if symbol.is_empty() {
            return Err(QueryError::InvalidArgument("symbol is empty".to_string()));
        }

        if self.instrument.is_option() {
            if self.option_type.is_none() || self.strike.is_none() {
                return Err(QueryError::InvalidArgument(format!(
                    "{} requires option type and strike price",
                    self.instrument
                )));
            }
        } else if self.option_type.is_some() || self.strike.is_some() {
            return Err(QueryError::InvalidArgument(format!(
                "{} takes no option type or strike price",
                self.instrument
            )));
        }

        Ok(ContractKey {
            symbol,
            instrument: self.instrument,
            expiry: self.expiry,
            option_type: self.option_type,
            strike: self.strike,
        })
    }
}

/// The two mutually exclusive ways to ask for a token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenQuery {
    /// Direct lookup by exchange trading symbol
    ByTradingSymbol(String),
    /// Resolve the contract first, as for a trading symbol query
    ByComponents(ContractSpec),
}

impl TokenQuery {
    /// Pick the calling convention from optional inputs. A trading symbol
    /// wins over components; supplying neither is an error.
    pub fn from_parts(
        trading_symbol: Option<String>,
        components: Option<ContractSpec>,
    ) -> Result<Self, QueryError> {
        match (trading_symbol, components) {
            (Some(tsym), _) => Ok(Self::ByTradingSymbol(tsym)),
            (None, Some(spec)) => Ok(Self::ByComponents(spec)),
            (None, None) => Err(QueryError::InvalidArgument(
                "supply a trading symbol or contract components".to_string(),
            )),
        }
    }
}

impl MasterTable {
    /// Distinct expiries of a `(symbol, instrument)` group, ascending
    pub fn expiries(&self, symbol: &str, instrument: InstrumentKind) -> Result<&[NaiveDate], QueryError> {
        let symbol = symbol.trim().to_ascii_uppercase();
        self.expiries
            .get(&(symbol.clone(), instrument))
            .map(Vec::as_slice)
            .filter(|dates| !dates.is_empty())
            .ok_or_else(|| QueryError::NoMatch(format!("no {instrument} contracts for {symbol}")))
    }

    /// Expiry lookup relative to `today`
    pub fn expiry(
        &self,
        symbol: &str,
        instrument: InstrumentKind,
        expiry_type: ExpiryType,
        today: NaiveDate,
    ) -> Result<Expiry, QueryError> {
        let all = self.expiries(symbol, instrument)?;
        if expiry_type == ExpiryType::All {
            return Ok(Expiry::All(all.to_vec()));
        }

        // Sorted ascending, so the live expiries are a suffix
        let live = &all[all.partition_point(|date| *date < today)..];
        let position = match expiry_type {
            ExpiryType::Current | ExpiryType::Near => live.first(),
            ExpiryType::Next => live.get(1),
            ExpiryType::Far => live.last(),
            ExpiryType::All => None,
        };

        position.copied().map(Expiry::Single).ok_or_else(|| {
            QueryError::IndexOutOfRange(format!(
                "{expiry_type} expiry requested for {} {instrument} but only {} expiries on or after {}",
                symbol.trim().to_ascii_uppercase(),
                live.len(),
                common::format_master_date(today)
            ))
        })
    }

    /// The unique row for a contract
    pub fn resolve(&self, spec: &ContractSpec) -> Result<&InstrumentRecord, QueryError> {
        let key = spec.key()?;
        match self.by_contract.get(&key).map(Vec::as_slice) {
            None | Some([]) => Err(QueryError::NoMatch(format!("no contract {key}"))),
            Some([idx]) => Ok(&self.records[*idx]),
            Some(rows) => Err(QueryError::AmbiguousMatch {
                count: rows.len(),
                query: key.to_string(),
            }),
        }
    }

    /// Exchange trading symbol for a contract
    pub fn trading_symbol(&self, spec: &ContractSpec) -> Result<&str, QueryError> {
        self.resolve(spec).map(|record| record.trading_symbol.as_str())
    }

    /// Exchange token, by trading symbol or by contract components
    pub fn token(&self, query: &TokenQuery) -> Result<&str, QueryError> {
        match query {
            TokenQuery::ByTradingSymbol(tsym) => {
                let tsym = tsym.trim().to_ascii_uppercase();
                if tsym.is_empty() {
                    return Err(QueryError::InvalidArgument(
                        "trading symbol is empty".to_string(),
                    ));
                }
                self.record_by_trading_symbol(&tsym)
                    .map(|record| record.token.as_str())
                    .ok_or_else(|| QueryError::NoMatch(format!("no trading symbol {tsym}")))
            }
            TokenQuery::ByComponents(spec) => self.resolve(spec).map(|record| record.token.as_str()),
        }
    }

    /// Strike step for the symbol's options; index options win over stock
    /// options when both exist
    pub fn strike_diff(&self, symbol: &str) -> Result<Px, QueryError> {
        let symbol = symbol.trim().to_ascii_uppercase();
        [InstrumentKind::OptIdx, InstrumentKind::OptStk]
            .into_iter()
            .find_map(|kind| self.strike_steps.get(&(symbol.clone(), kind)).copied())
            .ok_or_else(|| QueryError::NoMatch(format!("no option contracts for {symbol}")))
    }

    /// Lot size of the symbol (uniform across its contracts)
    pub fn lot_size(&self, symbol: &str) -> Result<u32, QueryError> {
        let symbol = symbol.trim().to_ascii_uppercase();
        self.lot_sizes
            .get(&symbol)
            .copied()
            .ok_or_else(|| QueryError::NoMatch(format!("no contracts for {symbol}")))
    }

    /// Row with the given trading symbol (case-insensitive)
    #[must_use]
    pub fn record_by_trading_symbol(&self, trading_symbol: &str) -> Option<&InstrumentRecord> {
        self.by_trading_symbol
            .get(&trading_symbol.trim().to_ascii_uppercase())
            .map(|idx| &self.records[*idx])
    }

    /// Row with the given token
    #[must_use]
    pub fn record_by_token(&self, token: &str) -> Option<&InstrumentRecord> {
        self.by_token
            .get(token.trim())
            .map(|idx| &self.records[*idx])
    }
}
