//! Command-line interface for the `zkb` CLI application.

pub mod constants;
mod ledger;
mod note;
mod relay;
mod tree;

use clap::Parser;

pub use self::ledger::LedgerCommands;
pub use self::note::NoteCommands;
pub use self::relay::RelayCommands;
pub use self::tree::TreeCommands;

/// Command-line interface definition.
#[derive(Debug, Parser)]
#[command(name = "zkb")]
#[command(about = "Commitment bridge tools")]
pub struct Cli {
    /// CLI top-level command group.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level command groups.
#[derive(Debug, clap::Subcommand)]
pub enum Commands {
    /// Ledger state and operations.
    Ledger {
        /// Ledger subcommands.
        #[command(subcommand)]
        command: LedgerCommands,
    },
    /// Deposit notes and withdrawal proofs.
    Note {
        /// Note subcommands.
        #[command(subcommand)]
        command: NoteCommands,
    },
    /// Commitment relay between two ledgers.
    Relay {
        /// Relay subcommands.
        #[command(subcommand)]
        command: RelayCommands,
    },
    /// Leaf files and root recomputation.
    Tree {
        /// Tree subcommands.
        #[command(subcommand)]
        command: TreeCommands,
    },
}
