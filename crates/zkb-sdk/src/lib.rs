//! Workflow logic behind the `zkb` command line.
//!
//! Ledgers are kept in JSON state files so that each command can load a
//! ledger, apply one operation and save it again.

pub mod commands;
pub mod common;
pub mod state;
