//! Relay subcommands.

use std::path::PathBuf;

use zkb_sdk::common::RelaySyncOptions;

use super::constants::{
    DEFAULT_CHECKPOINT_DB, ZKB_CHECKPOINT_DB, ZKB_ONCE, ZKB_SETTINGS_FILE, ZKB_STATE_A,
    ZKB_STATE_B,
};

/// Arguments for `zkb relay sync`.
#[derive(Debug, clap::Args)]
pub struct SyncArgs {
    /// State file of ledger A.
    #[arg(long, env = ZKB_STATE_A)]
    pub state_a: PathBuf,

    /// State file of ledger B.
    #[arg(long, env = ZKB_STATE_B)]
    pub state_b: PathBuf,

    /// Checkpoint database directory.
    #[arg(long, env = ZKB_CHECKPOINT_DB, default_value = DEFAULT_CHECKPOINT_DB)]
    pub checkpoint_db: PathBuf,

    /// Relay settings file (JSON). `ZKB_RELAY_*` variables override it.
    #[arg(long, env = ZKB_SETTINGS_FILE)]
    pub config: Option<PathBuf>,

    /// Sync once and exit instead of polling until Ctrl-C.
    #[arg(long, env = ZKB_ONCE, default_value_t = false)]
    pub once: bool,
}

impl From<SyncArgs> for RelaySyncOptions {
    fn from(args: SyncArgs) -> Self {
        Self {
            state_a: args.state_a,
            state_b: args.state_b,
            checkpoint_db: args.checkpoint_db,
            config: args.config,
            once: args.once,
        }
    }
}

/// Relay command group.
#[derive(Debug, clap::Subcommand)]
pub enum RelayCommands {
    /// Mirror deposit commitments between two ledgers.
    Sync {
        #[command(flatten)]
        args: SyncArgs,
    },
    /// Print the checkpoint of every route.
    Status {
        /// Checkpoint database directory.
        #[arg(long, env = ZKB_CHECKPOINT_DB, default_value = DEFAULT_CHECKPOINT_DB)]
        checkpoint_db: PathBuf,
    },
    /// Print the JSON schema of the relay settings file.
    ConfigSchema,
}
