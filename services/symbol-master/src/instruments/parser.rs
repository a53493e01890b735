//! Master file decoding: archive extraction and row normalization

use super::types::{InstrumentKind, InstrumentRecord, OptionType};
use crate::error::StoreError;
use common::{Px, parse_master_date};
use std::io::{Cursor, Read};
use tracing::{debug, info, warn};
use zip::ZipArchive;

/// Local file header signature that opens every ZIP archive
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Index underlying whose trading symbols embed digits in the name itself
const SENSEX50: &str = "SENSEX50";

/// Columns the master layout must provide
const REQUIRED_COLUMNS: [&str; 10] = [
    "Exchange",
    "Token",
    "LotSize",
    "Symbol",
    "TradingSymbol",
    "Expiry",
    "Instrument",
    "OptionType",
    "StrikePrice",
    "TickSize",
];

/// Decoded master file plus fingerprint of the source table
#[derive(Debug, Clone)]
pub struct ParsedMaster {
    pub records: Vec<InstrumentRecord>,
    /// CRC32 of the decompressed table
    pub source_checksum: u32,
    /// Size of the decompressed table in bytes
    pub source_size: u64,
}

/// Decompress (when zipped) and normalize a downloaded master payload
pub fn parse_master(payload: &[u8]) -> Result<ParsedMaster, StoreError> {
    let table = extract_table(payload)?;
    let records = parse_table(&table)?;
    Ok(ParsedMaster {
        records,
        source_checksum: storage::frame::checksum(&table),
        source_size: u64::try_from(table.len()).unwrap_or(u64::MAX),
    })
}

/// Return the delimited text table inside `payload`.
///
/// ZIP payloads yield their first entry, which must be a `.txt` or `.csv`
/// file; anything else is taken to be the table itself.
pub fn extract_table(payload: &[u8]) -> Result<Vec<u8>, StoreError> {
    if !payload.starts_with(ZIP_MAGIC) {
        return Ok(payload.to_vec());
    }

    let mut archive = ZipArchive::new(Cursor::new(payload))
        .map_err(|e| StoreError::Parse(format!("Failed to read ZIP: {e}")))?;
    if archive.is_empty() {
        return Err(StoreError::Parse("ZIP archive is empty".to_string()));
    }

    let mut file = archive
        .by_index(0)
        .map_err(|e| StoreError::Parse(format!("Failed to access ZIP entry: {e}")))?;
    let name = file.name().to_string();
    let extension = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    if extension != "txt" && extension != "csv" {
        return Err(StoreError::Parse(format!("Unsupported file type: {name}")));
    }

    let mut table = Vec::new();
    file.read_to_end(&mut table)
        .map_err(|e| StoreError::Parse(format!("Failed to decompress {name}: {e}")))?;
    debug!("Extracted {} ({} bytes)", name, table.len());
    Ok(table)
}

/// Underlying name for a trading symbol: the prefix before the first digit,
/// except `SENSEX50` whose name contains digits. Falls back to the raw
/// symbol column when the trading symbol starts with a digit.
#[must_use]
pub fn underlying_symbol(trading_symbol: &str, raw_symbol: &str) -> String {
    let upper = trading_symbol.to_ascii_uppercase();
    if upper.contains(SENSEX50) {
        return SENSEX50.to_string();
    }
    let prefix = upper
        .find(|c: char| c.is_ascii_digit())
        .map_or(upper.as_str(), |idx| &upper[..idx]);
    if prefix.is_empty() {
        raw_symbol.trim().to_ascii_uppercase()
    } else {
        prefix.to_string()
    }
}

/// Column positions resolved from the header row
struct Columns([usize; REQUIRED_COLUMNS.len()]);

impl Columns {
    fn resolve(headers: &csv::StringRecord) -> Result<Self, StoreError> {
        let mut positions = [0usize; REQUIRED_COLUMNS.len()];
        let mut missing = Vec::new();
        for (slot, name) in positions.iter_mut().zip(REQUIRED_COLUMNS) {
            match headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name)) {
                Some(idx) => *slot = idx,
                None => missing.push(name),
            }
        }
        if missing.is_empty() {
            Ok(Self(positions))
        } else {
            Err(StoreError::Parse(format!(
                "Missing expected columns: {}",
                missing.join(", ")
            )))
        }
    }

    fn get<'r>(&self, record: &'r csv::StringRecord, column: usize) -> &'r str {
        record.get(self.0[column]).unwrap_or("").trim()
    }
}

// Indices into REQUIRED_COLUMNS
const EXCHANGE: usize = 0;
const TOKEN: usize = 1;
const LOT_SIZE: usize = 2;
const SYMBOL: usize = 3;
const TRADING_SYMBOL: usize = 4;
const EXPIRY: usize = 5;
const INSTRUMENT: usize = 6;
const OPTION_TYPE: usize = 7;
const STRIKE_PRICE: usize = 8;
const TICK_SIZE: usize = 9;

/// Normalize the delimited master table into records.
///
/// Rows of unmodeled instrument kinds are skipped; a malformed row of a
/// modeled kind fails the whole table.
pub fn parse_table(table: &[u8]) -> Result<Vec<InstrumentRecord>, StoreError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .from_reader(table);

    let headers = reader
        .headers()
        .map_err(|e| StoreError::Parse(format!("Failed to read header row: {e}")))?
        .clone();
    let columns = Columns::resolve(&headers)?;

    let mut records = Vec::new();
    let mut skipped = 0usize;
    for result in reader.records() {
        let row = result.map_err(|e| StoreError::Parse(format!("Malformed CSV row: {e}")))?;
        let line = row.position().map_or(0, csv::Position::line);

        let instrument_code = columns.get(&row, INSTRUMENT);
        let Ok(instrument) = instrument_code.parse::<InstrumentKind>() else {
            skipped += 1;
            if skipped <= 10 {
                debug!("Skipping line {}: instrument '{}'", line, instrument_code);
            }
            continue;
        };

        let record = parse_row(&columns, &row, instrument)
            .map_err(|reason| StoreError::Parse(format!("line {line}: {reason}")))?;
        records.push(record);
    }

    if skipped > 0 {
        warn!("Skipped {} rows with unmodeled instrument kinds", skipped);
    }
    info!("Parsed {} instruments from master table", records.len());
    Ok(records)
}

fn parse_row(
    columns: &Columns,
    row: &csv::StringRecord,
    instrument: InstrumentKind,
) -> Result<InstrumentRecord, String> {
    let trading_symbol = columns.get(row, TRADING_SYMBOL).to_ascii_uppercase();
    if trading_symbol.is_empty() {
        return Err("empty TradingSymbol".to_string());
    }

    let token = columns.get(row, TOKEN).to_string();
    if token.is_empty() {
        return Err(format!("empty Token for {trading_symbol}"));
    }

    let expiry_raw = columns.get(row, EXPIRY);
    let expiry = parse_master_date(expiry_raw)
        .map_err(|e| format!("bad Expiry '{expiry_raw}' for {trading_symbol}: {e}"))?;

    let lot_raw = columns.get(row, LOT_SIZE);
    let lot_size = lot_raw
        .parse::<u32>()
        .map_err(|e| format!("bad LotSize '{lot_raw}' for {trading_symbol}: {e}"))?;

    let tick_raw = columns.get(row, TICK_SIZE);
    let tick_size = if tick_raw.is_empty() {
        Px::ZERO
    } else {
        tick_raw.parse::<Px>().map_err(|e| e.to_string())?
    };

    let option_type = OptionType::parse_column(columns.get(row, OPTION_TYPE))
        .map_err(|e| format!("{e} for {trading_symbol}"))?;

    let strike_price = if instrument.is_option() {
        if option_type.is_none() {
            return Err(format!("{instrument} {trading_symbol} has no option type"));
        }
        let strike_raw = columns.get(row, STRIKE_PRICE);
        let strike = strike_raw.parse::<Px>().map_err(|e| e.to_string())?;
        if !strike.is_positive() {
            return Err(format!("non-positive strike {strike} for {trading_symbol}"));
        }
        Some(strike)
    } else {
        if let Some(option_type) = option_type {
            return Err(format!(
                "{instrument} {trading_symbol} carries option type {option_type}"
            ));
        }
        None
    };

    let raw_symbol = columns.get(row, SYMBOL);
    Ok(InstrumentRecord {
        exchange: columns.get(row, EXCHANGE).to_ascii_uppercase(),
        symbol: underlying_symbol(&trading_symbol, raw_symbol),
        exchange_symbol: raw_symbol.to_ascii_uppercase(),
        instrument,
        expiry,
        option_type,
        strike_price,
        trading_symbol,
        token,
        lot_size,
        tick_size,
    })
}
