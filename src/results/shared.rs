use std::sync::{Arc, Mutex, MutexGuard};

use super::{ResultsError, ResultsStore};

/// Results store shared between sessions that write the same file.
///
/// Each [`SharedResultsStore::transaction`] holds the lock across the
/// mutation and the save, so two sessions cannot interleave their
/// load-mutate-save cycles and drop each other's updates.
#[derive(Debug, Clone)]
pub struct SharedResultsStore {
    inner: Arc<Mutex<ResultsStore>>,
}

impl SharedResultsStore {
    pub fn new(store: ResultsStore) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    /// Run `mutate` under the lock, then persist before releasing it.
    ///
    /// The store is saved only when `mutate` succeeds.
    pub fn transaction<T, E, F>(&self, mutate: F) -> Result<T, E>
    where
        F: FnOnce(&mut ResultsStore) -> Result<T, E>,
        E: From<ResultsError>,
    {
        let mut guard = self.lock();
        let value = mutate(&mut guard)?;
        guard.save(None)?;
        Ok(value)
    }

    /// Run a read-only query under the lock.
    pub fn read<T>(&self, query: impl FnOnce(&ResultsStore) -> T) -> T {
        query(&self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, ResultsStore> {
        // A panic mid-mutation leaves only in-memory changes behind; the file
        // still holds the last committed state.
        self.inner.lock().unwrap_or_else(|err| err.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::Status;
    use std::thread;
    use tempfile::tempdir;

    #[test]
    fn concurrent_transactions_do_not_lose_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("results.csv");
        let shared = SharedResultsStore::new(ResultsStore::new(&path));

        let handles: Vec<_> = (0..4)
            .map(|worker| {
                let shared = shared.clone();
                thread::spawn(move || {
                    for _ in 0..5 {
                        shared
                            .transaction(|store| {
                                store.add([("HNR", f64::from(worker))], Some(Status::Negative))
                            })
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(shared.read(|store| store.len()), 20);
        assert_eq!(ResultsStore::load(&path).len(), 20);
    }

    #[test]
    fn failed_mutation_is_not_saved() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("results.csv");
        let shared = SharedResultsStore::new(ResultsStore::new(&path));
        let result: Result<(), ResultsError> = shared.transaction(|_| Err(ResultsError::StoreFull));
        assert!(result.is_err());
        assert!(!path.exists());
    }
}
