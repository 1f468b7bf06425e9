use std::{future::Future, path::PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::{
    accounting::records::PersistedState,
    fs::operations::{read_locked, write_atomic},
};

use super::entities::StateEntity;

pub const STATE_FILE_NAME: &str = "state.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to read state from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("State file {path:?} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to write state to {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to encode state: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Durable storage of the accounting state. A save replaces the previous snapshot as a whole.
pub trait StateStore {
    /// Returns `None` when nothing was saved yet.
    fn load(&self) -> impl Future<Output = Result<Option<PersistedState>, StoreError>>;

    fn save(&mut self, state: &PersistedState) -> impl Future<Output = Result<(), StoreError>>;
}

/// The main realization of [StateStore], a single JSON document in the application directory.
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    pub fn new(dir: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            path: dir.join(STATE_FILE_NAME),
        })
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl StateStore for FileStateStore {
    async fn load(&self) -> Result<Option<PersistedState>, StoreError> {
        let Some(bytes) = read_locked(&self.path)
            .await
            .map_err(|source| StoreError::Read {
                path: self.path.clone(),
                source,
            })?
        else {
            debug!("No state saved at {:?}", self.path);
            return Ok(None);
        };

        let entity: StateEntity =
            serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt {
                path: self.path.clone(),
                source,
            })?;
        Ok(Some(entity.into()))
    }

    async fn save(&mut self, state: &PersistedState) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(&StateEntity::from(state))?;
        write_atomic(&self.path, &bytes)
            .await
            .map_err(|source| StoreError::Write {
                path: self.path.clone(),
                source,
            })
    }
}

#[cfg(test)]
pub mod memory {
    use std::sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    };

    use crate::accounting::records::PersistedState;

    use super::{StateStore, StoreError};

    /// In-memory store. Clones share the same contents so a test can keep a handle after moving
    /// the store into an engine.
    #[derive(Clone, Default)]
    pub struct MemoryStateStore {
        state: Arc<Mutex<Option<PersistedState>>>,
        fail_reads: Arc<AtomicBool>,
        fail_writes: Arc<AtomicBool>,
        saves: Arc<AtomicUsize>,
    }

    impl MemoryStateStore {
        pub fn with_state(state: PersistedState) -> Self {
            let store = Self::default();
            *store.state.lock().unwrap() = Some(state);
            store
        }

        pub fn snapshot(&self) -> Option<PersistedState> {
            self.state.lock().unwrap().clone()
        }

        pub fn saves(&self) -> usize {
            self.saves.load(Ordering::SeqCst)
        }

        pub fn fail_reads(&self, fail: bool) {
            self.fail_reads.store(fail, Ordering::SeqCst);
        }

        pub fn fail_writes(&self, fail: bool) {
            self.fail_writes.store(fail, Ordering::SeqCst);
        }
    }

    impl StateStore for MemoryStateStore {
        async fn load(&self) -> Result<Option<PersistedState>, StoreError> {
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(StoreError::Read {
                    path: "memory".into(),
                    source: std::io::Error::other("simulated read failure"),
                });
            }
            Ok(self.snapshot())
        }

        async fn save(&mut self, state: &PersistedState) -> Result<(), StoreError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StoreError::Write {
                    path: "memory".into(),
                    source: std::io::Error::other("simulated write failure"),
                });
            }
            *self.state.lock().unwrap() = Some(state.clone());
            self.saves.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    use crate::accounting::records::{OvertimeRecord, PenaltyRecord, PersistedState};

    use super::{FileStateStore, StateStore, StoreError};

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2018, 7, day).unwrap()
    }

    #[tokio::test]
    async fn test_state_store_empty_dir() -> Result<()> {
        let dir = tempdir()?;
        let store = FileStateStore::new(dir.path().to_owned())?;
        assert!(store.load().await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_state_store_save_and_load() -> Result<()> {
        let dir = tempdir()?;
        let mut store = FileStateStore::new(dir.path().to_owned())?;

        let mut state = PersistedState::fresh(date(4), true);
        state.elapsed.seconds_elapsed = 3725;
        state.overtime = Some(OvertimeRecord {
            overtime_seconds: 95,
            recorded_date: date(4),
            maximum_overtime_seconds: 900,
        });
        state.penalty = Some(PenaltyRecord {
            penalty_seconds: 600,
            recorded_date: date(4),
        });
        state.paused_across_restart = true;

        store.save(&state).await?;

        let reopened = FileStateStore::new(dir.path().to_owned())?;
        assert_eq!(reopened.load().await?, Some(state));
        Ok(())
    }

    #[tokio::test]
    async fn test_state_store_corrupt_file() -> Result<()> {
        let dir = tempdir()?;
        let store = FileStateStore::new(dir.path().to_owned())?;
        std::fs::write(store.path(), b"{\"secondsElapsed\": 4")?;

        let result = store.load().await;
        assert!(matches!(result, Err(StoreError::Corrupt { .. })));
        Ok(())
    }
}
