use chrono::NaiveDate;
use jobsy::board::accounts::{Argon2Hasher, CredentialHasher};
use jobsy::board::clock::{Clock, SystemClock};
use jobsy::board::memory::{MemoryBlobStorage, MemoryStore};
use jobsy::board::{BoardDeps, JobBoard};
use jobsy::config::{BoardSettings, StorageSettings};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Board over the in-process store, wired with the given clock and hasher.
pub(crate) fn memory_board(
    board: BoardSettings,
    storage: StorageSettings,
    clock: Arc<dyn Clock>,
    hasher: Arc<dyn CredentialHasher>,
) -> JobBoard<MemoryStore> {
    let blobs = MemoryBlobStorage::new(
        storage.media_base_url.clone(),
        storage.signing_secret.clone(),
    );
    JobBoard::new(
        BoardDeps {
            repository: Arc::new(MemoryStore::new()),
            storage: Arc::new(blobs),
            clock,
            hasher,
        },
        board,
        storage,
    )
}

/// Board used by the HTTP service: wall clock and Argon2 credentials.
pub(crate) fn service_board(
    board: BoardSettings,
    storage: StorageSettings,
) -> JobBoard<MemoryStore> {
    memory_board(
        board,
        storage,
        Arc::new(SystemClock),
        Arc::new(Argon2Hasher),
    )
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("'{raw}' is not a YYYY-MM-DD date ({err})"))
}
