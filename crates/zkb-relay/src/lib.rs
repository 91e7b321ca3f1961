//! Relay for the ZKB bridge.
//!
//! Watches deposit events on each ledger and inserts their commitments into
//! the other one. Delivery is at least once: progress is checkpointed per
//! direction, and an insert the destination already holds counts as success.

mod checkpoint;
mod error;
mod in_process;
mod retry;
mod settings;
mod source;
mod sync;
mod watch;

pub use checkpoint::{
    CheckpointError, CheckpointStore, MemoryCheckpointStore, RelayCheckpoint, SledCheckpointStore,
    StrandedDeposit,
};
pub use error::RelayError;
pub use in_process::InProcessLedger;
pub use retry::retry_with_backoff;
pub use settings::{ConfigError, ENV_PREFIX, RelayConfig, ValidatedRelayConfig};
pub use source::{CommitmentSink, DepositPage, EventSource, MirrorOutcome, ObservedDeposit};
pub use sync::{LedgerEndpoint, RelayerSync, SyncReport, route_key};
pub use watch::{PassReport, WatchLoop};
