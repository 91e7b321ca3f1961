//! Durable relay progress.
//!
//! One [`RelayCheckpoint`] is kept per route (source ledger to destination
//! ledger). It is rewritten as a whole on every change, so a crash leaves
//! either the previous or the next state, never a mix.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use zkb_core::base::Field;
use zkb_core::schema::events::EventPosition;

/// Name of the sled tree holding checkpoints.
const CHECKPOINT_TREE: &str = "relay_checkpoints";

/// Attempts to open a database whose file lock is still held.
const OPEN_ATTEMPTS: u32 = 40;
/// Pause between open attempts.
const OPEN_RETRY_DELAY: Duration = Duration::from_millis(25);

/// Errors that can occur when reading or writing checkpoints.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    /// The sled database failed.
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),
    /// A stored checkpoint could not be encoded or decoded.
    #[error("Invalid checkpoint encoding: {0}")]
    Encoding(#[from] serde_json::Error),
    /// A previous holder of the in-memory store panicked.
    #[error("Checkpoint store lock poisoned")]
    Poisoned,
}

/// A deposit that could not be mirrored and needs operator action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrandedDeposit {
    /// Route the deposit was observed on.
    pub route: String,
    /// Position of the deposit event in the source log.
    pub position: EventPosition,
    /// Commitment that was refused.
    pub commitment: Field,
    /// Why the destination refused it.
    pub reason: String,
}

/// Progress of one route.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayCheckpoint {
    /// Last source event fully processed, `None` before the first one.
    pub last_confirmed: Option<EventPosition>,
    /// Commitments sent to the destination but not yet confirmed.
    pub in_flight: BTreeSet<Field>,
    /// Deposits that failed permanently.
    pub stranded: Vec<StrandedDeposit>,
}

/// Storage for route checkpoints.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Checkpoint of `route`, or the initial checkpoint if none was saved.
    async fn load(&self, route: &str) -> Result<RelayCheckpoint, CheckpointError>;

    /// Persist `checkpoint` for `route`. Returns once the write is durable.
    async fn save(&self, route: &str, checkpoint: &RelayCheckpoint) -> Result<(), CheckpointError>;

    /// All saved checkpoints, by route.
    async fn list(&self) -> Result<BTreeMap<String, RelayCheckpoint>, CheckpointError>;
}

/// Checkpoints in a sled database.
#[derive(Debug, Clone)]
pub struct SledCheckpointStore {
    tree: sled::Tree,
}

impl SledCheckpointStore {
    /// Open (or create) the database at `path`.
    ///
    /// A handle dropped just before may still hold the file lock while sled's
    /// background work winds down, so I/O failures are retried for a short
    /// while.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened.
    pub async fn open(path: &Path) -> Result<Self, CheckpointError> {
        let mut attempt = 1_u32;
        let db = loop {
            match sled::open(path) {
                Ok(db) => break db,
                Err(sled::Error::Io(error)) if attempt < OPEN_ATTEMPTS => {
                    debug!(attempt, %error, file = ?path, "Checkpoint database busy, retrying");
                    tokio::time::sleep(OPEN_RETRY_DELAY).await;
                    attempt = attempt.saturating_add(1);
                }
                Err(error) => return Err(error.into()),
            }
        };
        Ok(Self {
            tree: db.open_tree(CHECKPOINT_TREE)?,
        })
    }
}

#[async_trait]
impl CheckpointStore for SledCheckpointStore {
    async fn load(&self, route: &str) -> Result<RelayCheckpoint, CheckpointError> {
        match self.tree.get(route)? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => Ok(RelayCheckpoint::default()),
        }
    }

    async fn save(&self, route: &str, checkpoint: &RelayCheckpoint) -> Result<(), CheckpointError> {
        self.tree.insert(route, serde_json::to_vec(checkpoint)?)?;
        self.tree.flush_async().await?;
        Ok(())
    }

    async fn list(&self) -> Result<BTreeMap<String, RelayCheckpoint>, CheckpointError> {
        let mut checkpoints = BTreeMap::new();
        for entry in self.tree.iter() {
            let (route, bytes) = entry?;
            checkpoints.insert(
                String::from_utf8_lossy(&route).into_owned(),
                serde_json::from_slice(&bytes)?,
            );
        }
        Ok(checkpoints)
    }
}

/// Checkpoints held in memory. Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryCheckpointStore {
    inner: Arc<Mutex<BTreeMap<String, RelayCheckpoint>>>,
}

impl MemoryCheckpointStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn load(&self, route: &str) -> Result<RelayCheckpoint, CheckpointError> {
        let guard = self.inner.lock().map_err(|_| CheckpointError::Poisoned)?;
        Ok(guard.get(route).cloned().unwrap_or_default())
    }

    async fn save(&self, route: &str, checkpoint: &RelayCheckpoint) -> Result<(), CheckpointError> {
        let mut guard = self.inner.lock().map_err(|_| CheckpointError::Poisoned)?;
        guard.insert(route.to_owned(), checkpoint.clone());
        Ok(())
    }

    async fn list(&self) -> Result<BTreeMap<String, RelayCheckpoint>, CheckpointError> {
        let guard = self.inner.lock().map_err(|_| CheckpointError::Poisoned)?;
        Ok(guard.clone())
    }
}
