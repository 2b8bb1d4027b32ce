//! Per-patient results store.
//!
//! Records are keyed by a short random [`Uid`] and persisted as a delimited
//! table. Mutations stay in memory until [`ResultsStore::save`] is called.

mod shared;
mod table;
mod uid;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rand::seq::IndexedRandom;
use thiserror::Error;

use crate::features::{FeatureRecord, Status};
use crate::persist;

pub use shared::SharedResultsStore;
pub use table::{NAME_COLUMN, ResultsTable, STATUS_COLUMN, TableRow};
pub use uid::{MAX_UID, MIN_UID, UID_CAPACITY, Uid};

/// Extension appended to results paths that lack it.
pub const RESULTS_EXTENSION: &str = "csv";

#[derive(Debug, Error)]
pub enum ResultsError {
    /// Every uid in the assignable range is taken.
    #[error("Results store is full: all {UID_CAPACITY} patient ids are in use")]
    StoreFull,
    #[error("Failed to write results to {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// What the presentation layer shows for a uid lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusView {
    NoSuchRecord,
    NoPrediction,
    Predicted(Status),
}

/// Keyed collection of feature records backed by a results file.
#[derive(Debug, Clone)]
pub struct ResultsStore {
    path: PathBuf,
    records: BTreeMap<Uid, FeatureRecord>,
}

impl ResultsStore {
    /// Empty store that will save to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: normalize_results_path(path.into()),
            records: BTreeMap::new(),
        }
    }

    /// Load the store from `path`.
    ///
    /// A missing or unparsable file yields an empty store bound to the same
    /// path; the problem is logged, never returned.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let mut store = Self::new(path);
        let text = match std::fs::read_to_string(&store.path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    "Results file {} does not exist; starting with an empty store",
                    store.path.display()
                );
                return store;
            }
            Err(err) => {
                tracing::warn!(
                    "Could not read results file {}: {err}; starting with an empty store",
                    store.path.display()
                );
                return store;
            }
        };
        match table::parse_results(&text) {
            Ok(records) => {
                tracing::info!(
                    "Loaded {} results from {}",
                    records.len(),
                    store.path.display()
                );
                store.records = records;
            }
            Err(err) => tracing::warn!(
                "Could not parse results file {}: {err}; starting with an empty store",
                store.path.display()
            ),
        }
        store
    }

    /// Path used by [`ResultsStore::save`] when no explicit path is given.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, uid: Uid) -> bool {
        self.records.contains_key(&uid)
    }

    /// All uids, ascending.
    pub fn uids(&self) -> impl Iterator<Item = Uid> + '_ {
        self.records.keys().copied()
    }

    /// Store a new record under a random unused uid.
    ///
    /// Feature names outside the vocabulary are dropped and vocabulary names
    /// missing from `features` are stored as null.
    pub fn add<'a, I>(&mut self, features: I, status: Option<Status>) -> Result<Uid, ResultsError>
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let unused: Vec<Uid> = Uid::all().filter(|uid| !self.records.contains_key(uid)).collect();
        let uid = *unused
            .choose(&mut rand::rng())
            .ok_or(ResultsError::StoreFull)?;
        let mut record = FeatureRecord::from_named(features);
        record.status = status;
        self.records.insert(uid, record);
        tracing::debug!("Added results for uid {uid}");
        Ok(uid)
    }

    /// Status code for `uid`: `None` if absent, `Some(-1)` if not yet
    /// predicted, otherwise the stored code.
    pub fn get_status(&self, uid: Uid) -> Option<i32> {
        self.records
            .get(&uid)
            .map(|record| record.status.map_or(Status::Unknown.code(), Status::code))
    }

    /// Three-way lookup used by the presentation layer.
    pub fn status_view(&self, uid: Uid) -> StatusView {
        match self.records.get(&uid) {
            None => StatusView::NoSuchRecord,
            Some(FeatureRecord { status: None, .. }) => StatusView::NoPrediction,
            Some(FeatureRecord {
                status: Some(status),
                ..
            }) => StatusView::Predicted(*status),
        }
    }

    pub fn get_features(&self, uid: Uid) -> Option<&FeatureRecord> {
        self.records.get(&uid)
    }

    /// Update the status of an existing record; unknown uids are ignored.
    pub fn set_status(&mut self, uid: Uid, status: Status) {
        if let Some(record) = self.records.get_mut(&uid) {
            record.status = Some(status);
        }
    }

    /// Delete a record; unknown uids are ignored.
    pub fn remove(&mut self, uid: Uid) {
        if self.records.remove(&uid).is_some() {
            tracing::debug!("Removed results for uid {uid}");
        }
    }

    /// Uids whose status has not been set.
    pub fn list_unpredicted(&self) -> Vec<Uid> {
        self.records
            .iter()
            .filter(|(_, record)| !record.is_predicted())
            .map(|(uid, _)| *uid)
            .collect()
    }

    /// Whole store (rows sorted by uid) or a single ad-hoc record as a one-row table.
    pub fn to_table(&self, subset: Option<&FeatureRecord>) -> ResultsTable {
        match subset {
            None => ResultsTable::from_records(self.records.iter()),
            Some(record) => ResultsTable::single(record),
        }
    }

    /// Write the whole store to `path`, or to the loaded path by default.
    pub fn save(&self, path: Option<&Path>) -> Result<(), ResultsError> {
        let path = path.unwrap_or(&self.path);
        let text = self.to_table(None).to_delimited();
        persist::atomic_write(path, text.as_bytes()).map_err(|source| ResultsError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!("Saved {} results to {}", self.records.len(), path.display());
        Ok(())
    }
}

fn normalize_results_path(path: PathBuf) -> PathBuf {
    let has_extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(RESULTS_EXTENSION));
    if has_extension {
        path
    } else {
        let mut raw = path.into_os_string();
        raw.push(".");
        raw.push(RESULTS_EXTENSION);
        PathBuf::from(raw)
    }
}
