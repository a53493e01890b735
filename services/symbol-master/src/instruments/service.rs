//! Master store: freshness, refresh and persistence of the master table
//!
//! The live snapshot sits behind an [`ArcSwapOption`]; readers grab the
//! current `Arc` without locking and always see one complete snapshot. A
//! refresh builds and persists the replacement off to the side and swaps it
//! in only when every step succeeded, so a failed refresh never touches the
//! table readers are using.

use super::parser;
use super::table::MasterTable;
use super::types::{InstrumentRecord, RefreshState};
use crate::clock::{Clock, SystemClock};
use crate::config::SymbolMasterConfig;
use crate::error::StoreError;
use crate::fetcher::{HttpFetcher, MasterFetcher};
use arc_swap::ArcSwapOption;
use chrono::NaiveDate;
use common::Px;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use storage::{BlobStore, FileBlobStore, StorageError};
use tracing::{debug, info, warn};

/// Blob key of the persisted snapshot
pub const MASTER_ARTIFACT_KEY: &str = "bfo_master";

/// Table plus the refresh that produced it
#[derive(Debug)]
pub struct Snapshot {
    pub table: Arc<MasterTable>,
    pub state: RefreshState,
}

impl Snapshot {
    /// Refreshed today (or, with a skewed clock, later)
    fn is_fresh(&self, today: NaiveDate) -> bool {
        self.state.last_refresh_date >= today
    }
}

/// What [`MasterStore::initialize`] ended up doing
#[derive(Debug)]
pub enum InitOutcome {
    /// Today's snapshot was already available; nothing was fetched
    Cached,
    /// A fresh master was fetched and installed
    Refreshed,
    /// The refresh failed; the previous snapshot is installed and queryable
    Stale(StoreError),
}

/// On-disk layout of the persisted snapshot
#[derive(Deserialize)]
struct PersistedMaster {
    state: RefreshState,
    records: Vec<InstrumentRecord>,
}

/// Borrowed twin of [`PersistedMaster`] for writing without cloning rows
#[derive(Serialize)]
struct PersistedMasterRef<'a> {
    state: &'a RefreshState,
    records: &'a [InstrumentRecord],
}

/// A refresh that failed, remembered for the rest of its calendar day
#[derive(Debug, Clone)]
struct FailedRefresh {
    date: NaiveDate,
    reason: String,
}

/// Owner of the live master table
pub struct MasterStore {
    source_url: String,
    default_strike_step: Px,
    fetcher: Arc<dyn MasterFetcher>,
    blobs: Arc<dyn BlobStore>,
    clock: Arc<dyn Clock>,
    live: ArcSwapOption<Snapshot>,
    /// Serializes refreshes; holds the last failed attempt
    refresh_guard: Mutex<Option<FailedRefresh>>,
}

impl MasterStore {
    /// Create a store with injected collaborators; no I/O happens until
    /// [`initialize`](Self::initialize) or [`refresh`](Self::refresh).
    pub fn new(
        config: &SymbolMasterConfig,
        fetcher: Arc<dyn MasterFetcher>,
        blobs: Arc<dyn BlobStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source_url: config.source_url.clone(),
            default_strike_step: config.strike_step_default(),
            fetcher,
            blobs,
            clock,
            live: ArcSwapOption::empty(),
            refresh_guard: Mutex::new(None),
        }
    }

    /// Build the HTTP fetcher, file blob store and clock from `config`
    /// without loading anything.
    pub fn from_config(
        config: &SymbolMasterConfig,
        clock: Option<Arc<dyn Clock>>,
    ) -> Result<Self, StoreError> {
        let fetcher = HttpFetcher::new(config.request_timeout())?;
        let blobs = FileBlobStore::new(&config.cache_dir)?;
        let clock = clock.unwrap_or_else(|| Arc::new(SystemClock));
        Ok(Self::new(config, Arc::new(fetcher), Arc::new(blobs), clock))
    }

    /// [`from_config`](Self::from_config) followed by
    /// [`initialize`](Self::initialize), honoring `config.hard_refresh`.
    pub fn open(
        config: &SymbolMasterConfig,
        clock: Option<Arc<dyn Clock>>,
    ) -> Result<(Self, InitOutcome), StoreError> {
        let store = Self::from_config(config, clock)?;
        let outcome = store.initialize(config.hard_refresh)?;
        Ok((store, outcome))
    }

    /// Make sure a snapshot for today is live.
    ///
    /// Uses the in-memory or persisted snapshot when it was refreshed today
    /// and `force_refresh` is false; otherwise fetches. A failed fetch with a
    /// previous snapshot available degrades to [`InitOutcome::Stale`]; with
    /// no snapshot at all the error is returned. Without `force_refresh` at
    /// most one fetch is attempted per calendar day: after a failed attempt
    /// later calls that day answer from what is already available.
    pub fn initialize(&self, force_refresh: bool) -> Result<InitOutcome, StoreError> {
        let mut failed = self.refresh_guard.lock();
        let today = self.clock.today();

        let current = self.live.load_full();
        if !force_refresh && current.as_ref().is_some_and(|s| s.is_fresh(today)) {
            debug!("Live symbol master is current for {}", today);
            return Ok(InitOutcome::Cached);
        }

        let previous = current.or_else(|| self.load_persisted());
        if let Some(prev) = previous.as_ref().filter(|s| !force_refresh && s.is_fresh(today)) {
            info!(
                "Using cached symbol master from {} ({} instruments)",
                prev.state.last_refresh_date,
                prev.table.len()
            );
            self.live.store(Some(Arc::clone(prev)));
            return Ok(InitOutcome::Cached);
        }

        let deferred = failed
            .as_ref()
            .filter(|attempt| !force_refresh && attempt.date == today)
            .map(|attempt| StoreError::RefreshDeferred {
                date: attempt.date,
                reason: attempt.reason.clone(),
            });
        let result = match deferred {
            Some(e) => {
                debug!("Refresh already failed today, not fetching again");
                Err(e)
            }
            None => self.refresh_locked(today, &mut failed),
        };

        match result {
            Ok(()) => Ok(InitOutcome::Refreshed),
            Err(e) => match previous {
                Some(prev) => {
                    warn!(
                        "Symbol master refresh failed, using snapshot from {}: {}",
                        prev.state.last_refresh_date, e
                    );
                    self.live.store(Some(prev));
                    Ok(InitOutcome::Stale(e))
                }
                None => Err(e),
            },
        }
    }

    /// Fetch, normalize, persist and install a new snapshot.
    ///
    /// Always fetches. On any failure the live snapshot is left exactly as
    /// it was.
    pub fn refresh(&self) -> Result<(), StoreError> {
        let mut failed = self.refresh_guard.lock();
        self.refresh_locked(self.clock.today(), &mut failed)
    }

    fn refresh_locked(
        &self,
        today: NaiveDate,
        failed: &mut Option<FailedRefresh>,
    ) -> Result<(), StoreError> {
        let result = self.fetch_and_install(today);
        *failed = result.as_ref().err().map(|e| FailedRefresh {
            date: today,
            reason: e.to_string(),
        });
        result
    }

    fn fetch_and_install(&self, today: NaiveDate) -> Result<(), StoreError> {
        let start = Instant::now();
        info!("Fetching symbol master from {}", self.source_url);

        let payload = self.fetcher.fetch(&self.source_url)?;
        let parsed = parser::parse_master(&payload)?;
        let state = RefreshState {
            last_refresh_date: today,
            source_checksum: parsed.source_checksum,
            source_size: parsed.source_size,
            record_count: parsed.records.len(),
        };
        let table = MasterTable::build(parsed.records, self.default_strike_step)?;

        self.persist(&state, &table)?;
        self.live.store(Some(Arc::new(Snapshot {
            table: Arc::new(table),
            state,
        })));

        info!(
            "Symbol master refreshed: {} instruments, checksum {:#010x}, in {:?}",
            state.record_count,
            state.source_checksum,
            start.elapsed()
        );
        Ok(())
    }

    fn persist(&self, state: &RefreshState, table: &MasterTable) -> Result<(), StoreError> {
        let encoded = bincode::serialize(&PersistedMasterRef {
            state,
            records: table.records(),
        })
        .map_err(|e| StoreError::io(format!("Failed to encode symbol master: {e}")))?;

        self.blobs
            .save(MASTER_ARTIFACT_KEY, &encoded, state.last_refresh_date)?;
        debug!("Persisted symbol master ({} bytes)", encoded.len());
        Ok(())
    }

    fn load_persisted(&self) -> Option<Arc<Snapshot>> {
        let artifact = match self.blobs.load(MASTER_ARTIFACT_KEY) {
            Ok(artifact) => artifact,
            Err(StorageError::NotFound(_)) => {
                info!("No cached symbol master found");
                return None;
            }
            Err(e) => {
                warn!("Failed to load cached symbol master: {}", e);
                return None;
            }
        };

        let decoded = bincode::deserialize::<PersistedMaster>(&artifact.bytes)
            .map_err(|e| StoreError::Parse(format!("Failed to decode cached symbol master: {e}")))
            .and_then(|persisted| {
                let table = MasterTable::build(persisted.records, self.default_strike_step)?;
                Ok((persisted.state, table))
            });

        match decoded {
            Ok((mut state, table)) => {
                // The artifact stamp and the embedded state should agree; trust the older one
                state.last_refresh_date = state.last_refresh_date.min(artifact.last_modified);
                Some(Arc::new(Snapshot {
                    table: Arc::new(table),
                    state,
                }))
            }
            Err(e) => {
                warn!("Ignoring unusable cached symbol master: {}", e);
                None
            }
        }
    }

    /// Live table, if any snapshot has been installed. Never performs I/O.
    #[must_use]
    pub fn current_table(&self) -> Option<Arc<MasterTable>> {
        self.live.load_full().map(|snapshot| Arc::clone(&snapshot.table))
    }

    /// Live table or [`StoreError::NotInitialized`]
    pub fn table(&self) -> Result<Arc<MasterTable>, StoreError> {
        self.current_table().ok_or(StoreError::NotInitialized)
    }

    /// Refresh bookkeeping of the live snapshot
    #[must_use]
    pub fn refresh_state(&self) -> Option<RefreshState> {
        self.live.load_full().map(|snapshot| snapshot.state)
    }

    /// Today according to the injected clock
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }
}
