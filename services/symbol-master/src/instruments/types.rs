//! Instrument types for the derivatives symbol master

use chrono::NaiveDate;
use common::Px;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Contract category as coded in the master file
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum InstrumentKind {
    /// Stock option (`OPTSTK`)
    OptStk,
    /// Index option (`OPTIDX`)
    OptIdx,
    /// Stock future (`FUTSTK`)
    FutStk,
    /// Index future (`FUTIDX`)
    FutIdx,
}

impl InstrumentKind {
    /// All modeled kinds
    pub const ALL: [Self; 4] = [Self::OptStk, Self::OptIdx, Self::FutStk, Self::FutIdx];

    /// Exchange code, e.g. `OPTIDX`
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::OptStk => "OPTSTK",
            Self::OptIdx => "OPTIDX",
            Self::FutStk => "FUTSTK",
            Self::FutIdx => "FUTIDX",
        }
    }

    /// Option contract
    #[must_use]
    pub const fn is_option(self) -> bool {
        matches!(self, Self::OptStk | Self::OptIdx)
    }

    /// Index (as opposed to stock) underlying
    #[must_use]
    pub const fn is_index(self) -> bool {
        matches!(self, Self::OptIdx | Self::FutIdx)
    }
}

impl fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for InstrumentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.code() == code)
            .ok_or_else(|| format!("unknown instrument '{s}', expected one of OPTSTK, OPTIDX, FUTSTK, FUTIDX"))
    }
}

/// Option type for derivatives
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OptionType {
    /// Call option (`CE`)
    Call,
    /// Put option (`PE`)
    Put,
}

impl OptionType {
    /// Exchange code, `CE` or `PE`
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Call => "CE",
            Self::Put => "PE",
        }
    }

    /// Parse the master file's option type column; `XX` and empty mean
    /// "no option type" (futures).
    pub fn parse_column(value: &str) -> Result<Option<Self>, String> {
        match value.trim().to_ascii_uppercase().as_str() {
            "" | "XX" => Ok(None),
            other => other.parse().map(Some),
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for OptionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CE" => Ok(Self::Call),
            "PE" => Ok(Self::Put),
            _ => Err(format!("unknown option type '{s}', expected CE or PE")),
        }
    }
}

/// One normalized row of the master table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentRecord {
    /// Exchange segment code (e.g., "BFO")
    pub exchange: String,

    /// Normalized underlying (e.g., "SENSEX50", "BANKEX")
    pub symbol: String,

    /// Raw symbol column as published
    pub exchange_symbol: String,

    /// Contract category
    pub instrument: InstrumentKind,

    /// Settlement date
    pub expiry: NaiveDate,

    /// Call/put, absent for futures
    pub option_type: Option<OptionType>,

    /// Strike (fixed-point), absent for futures
    pub strike_price: Option<Px>,

    /// Exchange trading symbol (e.g., "BANKEX23N06FUT")
    pub trading_symbol: String,

    /// Exchange token
    pub token: String,

    /// Minimum tradable quantity
    pub lot_size: u32,

    /// Price tick (fixed-point)
    pub tick_size: Px,
}

impl InstrumentRecord {
    /// Lookup key identifying the contract by its components
    #[must_use]
    pub fn contract_key(&self) -> ContractKey {
        ContractKey {
            symbol: self.symbol.clone(),
            instrument: self.instrument,
            expiry: self.expiry,
            option_type: self.option_type,
            strike: self.strike_price,
        }
    }
}

/// `(symbol, instrument, expiry, option type, strike)` lookup key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContractKey {
    pub symbol: String,
    pub instrument: InstrumentKind,
    pub expiry: NaiveDate,
    pub option_type: Option<OptionType>,
    pub strike: Option<Px>,
}

impl fmt::Display for ContractKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.symbol,
            self.instrument,
            common::format_master_date(self.expiry)
        )?;
        if let Some(option_type) = self.option_type {
            write!(f, " {option_type}")?;
        }
        if let Some(strike) = self.strike {
            write!(f, " {strike}")?;
        }
        Ok(())
    }
}

/// Freshness bookkeeping persisted next to the table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshState {
    /// Calendar date of the fetch that produced the snapshot
    pub last_refresh_date: NaiveDate,
    /// CRC32 of the decompressed master table
    pub source_checksum: u32,
    /// Size of the decompressed master table in bytes
    pub source_size: u64,
    /// Rows in the snapshot
    pub record_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instrument_kind_codes() {
        for kind in InstrumentKind::ALL {
            assert_eq!(kind.code().parse::<InstrumentKind>(), Ok(kind));
            assert_eq!(kind.to_string(), kind.code());
        }
        assert_eq!("optidx".parse::<InstrumentKind>(), Ok(InstrumentKind::OptIdx));
        assert!("EQ".parse::<InstrumentKind>().is_err());
    }

    #[test]
    fn test_instrument_kind_families() {
        assert!(InstrumentKind::OptIdx.is_option());
        assert!(InstrumentKind::OptIdx.is_index());
        assert!(InstrumentKind::OptStk.is_option());
        assert!(!InstrumentKind::OptStk.is_index());
        assert!(!InstrumentKind::FutIdx.is_option());
        assert!(InstrumentKind::FutIdx.is_index());
    }

    #[test]
    fn test_option_type_column() {
        assert_eq!(OptionType::parse_column("XX"), Ok(None));
        assert_eq!(OptionType::parse_column(""), Ok(None));
        assert_eq!(OptionType::parse_column("ce"), Ok(Some(OptionType::Call)));
        assert_eq!(OptionType::parse_column(" PE "), Ok(Some(OptionType::Put)));
        assert!(OptionType::parse_column("CA").is_err());
    }

    #[test]
    fn test_contract_key_display() {
        let key = ContractKey {
            symbol: "SENSEX".to_string(),
            instrument: InstrumentKind::OptIdx,
            expiry: NaiveDate::from_ymd_opt(2023, 11, 10).unwrap(),
            option_type: Some(OptionType::Call),
            strike: Some(Px::from_units(65000)),
        };
        assert_eq!(key.to_string(), "SENSEX OPTIDX 10-NOV-2023 CE 65000");
    }
}
