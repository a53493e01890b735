//! Shared fixtures: a small BFO master, scripted collaborators

#![allow(dead_code)]

use chrono::NaiveDate;
use parking_lot::Mutex;
use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use storage::{BlobArtifact, BlobStore, FileBlobStore, StorageError};
use symbol_master::{Clock, FetchError, MasterFetcher, MasterStore, SymbolMasterConfig};

pub const TEST_URL: &str = "http://master.test/BFO_symbols.txt.zip";

pub const HEADER: &str =
    "Exchange,Token,LotSize,Symbol,TradingSymbol,Expiry,Instrument,OptionType,StrikePrice,TickSize,";

/// A trimmed BFO master: index futures/options, stock futures/options and
/// one unmodeled currency future that normalization skips.
pub const MASTER_ROWS: &[&str] = &[
    "BFO,1126614,15,BKXFUT,BANKEX23N06FUT,06-NOV-2023,FUTIDX,XX,0,0.05,",
    "BFO,1126615,15,BKXFUT,BANKEX23DECFUT,04-DEC-2023,FUTIDX,XX,0,0.05,",
    "BFO,845001,15,BKXOPT,BANKEX23N0649000CE,06-NOV-2023,OPTIDX,CE,49000,0.05,",
    "BFO,845002,15,BKXOPT,BANKEX23N0649000PE,06-NOV-2023,OPTIDX,PE,49000,0.05,",
    "BFO,845003,15,BKXOPT,BANKEX23N0649100CE,06-NOV-2023,OPTIDX,CE,49100,0.05,",
    "BFO,900001,25,SX50OPT,SENSEX5023N0919500CE,09-NOV-2023,OPTIDX,CE,19500,0.05,",
    "BFO,900002,25,SX50OPT,SENSEX5023N0919600CE,09-NOV-2023,OPTIDX,CE,19600,0.05,",
    "BFO,900003,25,SX50OPT,SENSEX5023N1619500PE,16-NOV-2023,OPTIDX,PE,19500,0.05,",
    "BFO,900004,25,SX50OPT,SENSEX5023N2319500CE,23-NOV-2023,OPTIDX,CE,19500,0.05,",
    "BFO,800001,10,BSXOPT,SENSEX23N1065000CE,10-NOV-2023,OPTIDX,CE,65000,0.05,",
    "BFO,800002,10,BSXOPT,SENSEX23N1065000PE,10-NOV-2023,OPTIDX,PE,65000,0.05,",
    "BFO,800003,10,BSXOPT,SENSEX23N1065100CE,10-NOV-2023,OPTIDX,CE,65100,0.05,",
    "BFO,800004,10,BSXOPT,SENSEX23N1065300CE,10-NOV-2023,OPTIDX,CE,65300,0.05,",
    "BFO,800010,10,BSXFUT,SENSEX23NOVFUT,24-NOV-2023,FUTIDX,XX,0,0.05,",
    "BFO,700001,250,RELIANCE,RELIANCE23NOV2220CE,30-NOV-2023,OPTSTK,CE,2220,0.05,",
    "BFO,700002,250,RELIANCE,RELIANCE23NOV2240CE,30-NOV-2023,OPTSTK,CE,2240,0.05,",
    "BFO,700003,250,RELIANCE,RELIANCE23NOV2240PE,30-NOV-2023,OPTSTK,PE,2240.00,0.05,",
    "BFO,700004,250,RELIANCE,RELIANCE23NOV2260CE,30-NOV-2023,OPTSTK,CE,2260,0.05,",
    "BFO,700010,250,RELIANCE,RELIANCE23NOVFUT,30-NOV-2023,FUTSTK,XX,0,0.05,",
    "BFO,710010,5500,TATASTEEL,TATASTEEL23NOVFUT,30-NOV-2023,FUTSTK,XX,0,0.05,",
    "BFO,600001,1,USDINR,USDINR23NOVFUT,29-NOV-2023,FUTCUR,XX,0,0.0025,",
];

/// Rows in [`MASTER_ROWS`] that normalization keeps
pub const MODELED_ROWS: usize = 20;

pub fn date(day: u32, month: u32, year: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub fn master_text(rows: &[&str]) -> String {
    let mut text = String::from(HEADER);
    for row in rows {
        text.push('\n');
        text.push_str(row);
    }
    text.push('\n');
    text
}

pub fn zipped(name: &str, contents: &[u8]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file(name, zip::write::SimpleFileOptions::default())
        .expect("start zip entry");
    writer.write_all(contents).expect("write zip entry");
    writer.finish().expect("finish zip").into_inner()
}

/// The fixture master as the exchange publishes it
pub fn master_zip() -> Vec<u8> {
    zipped("BFO_symbols.txt", master_text(MASTER_ROWS).as_bytes())
}

/// Fetcher that serves a scripted response and counts calls
pub struct ScriptedFetcher {
    response: Mutex<Result<Vec<u8>, FetchError>>,
    calls: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn serving(payload: Vec<u8>) -> Arc<Self> {
        Arc::new(Self {
            response: Mutex::new(Ok(payload)),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        let fetcher = Self::serving(Vec::new());
        fetcher.fail();
        fetcher
    }

    pub fn serve(&self, payload: Vec<u8>) {
        *self.response.lock() = Ok(payload);
    }

    pub fn fail(&self) {
        *self.response.lock() = Err(FetchError::Status {
            url: TEST_URL.to_string(),
            status: 503,
        });
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl MasterFetcher for ScriptedFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        assert_eq!(url, TEST_URL);
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response.lock().clone()
    }
}

/// Clock the test can move forward
pub struct SettableClock(Mutex<NaiveDate>);

impl SettableClock {
    pub fn at(today: NaiveDate) -> Arc<Self> {
        Arc::new(Self(Mutex::new(today)))
    }

    pub fn set(&self, today: NaiveDate) {
        *self.0.lock() = today;
    }
}

impl Clock for SettableClock {
    fn today(&self) -> NaiveDate {
        *self.0.lock()
    }
}

pub fn test_config(cache_dir: &Path) -> SymbolMasterConfig {
    SymbolMasterConfig {
        source_url: TEST_URL.to_string(),
        cache_dir: cache_dir.to_path_buf(),
        ..SymbolMasterConfig::default()
    }
}

pub fn store_with(
    cache_dir: &Path,
    fetcher: Arc<ScriptedFetcher>,
    clock: Arc<SettableClock>,
) -> MasterStore {
    let blobs = FileBlobStore::new(cache_dir).expect("blob store");
    MasterStore::new(&test_config(cache_dir), fetcher, Arc::new(blobs), clock)
}

/// File blob store whose saves can be switched to fail
pub struct FlakyBlobStore {
    inner: FileBlobStore,
    fail_saves: AtomicBool,
}

impl FlakyBlobStore {
    pub fn new(cache_dir: &Path) -> Arc<Self> {
        Arc::new(Self {
            inner: FileBlobStore::new(cache_dir).expect("blob store"),
            fail_saves: AtomicBool::new(false),
        })
    }

    pub fn fail_saves(&self) {
        self.fail_saves.store(true, Ordering::SeqCst);
    }
}

impl BlobStore for FlakyBlobStore {
    fn load(&self, key: &str) -> Result<BlobArtifact, StorageError> {
        self.inner.load(key)
    }

    fn save(&self, key: &str, bytes: &[u8], last_modified: NaiveDate) -> Result<(), StorageError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StorageError::Io(std::io::Error::other("disk full")));
        }
        self.inner.save(key, bytes, last_modified)
    }
}

pub fn store_with_blobs(
    cache_dir: &Path,
    fetcher: Arc<ScriptedFetcher>,
    blobs: Arc<dyn BlobStore>,
    clock: Arc<SettableClock>,
) -> MasterStore {
    MasterStore::new(&test_config(cache_dir), fetcher, blobs, clock)
}
