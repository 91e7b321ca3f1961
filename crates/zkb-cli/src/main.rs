//! ZKB CLI Application

mod cli;

use clap::Parser as _;
use cli::{Cli, Commands, LedgerCommands, NoteCommands, RelayCommands, TreeCommands};
use zkb_sdk::commands;
use zkb_sdk::common::RelaySyncOptions;

fn env_filter() -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
}

/// Logs go to stderr; stdout carries command output.
fn init_tracing() -> eyre::Result<()> {
    #[cfg(feature = "tokio-console")]
    {
        use tracing_subscriber::prelude::*;
        tracing_subscriber::registry()
            .with(console_subscriber::spawn())
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_filter(env_filter()),
            )
            .try_init()
            .map_err(|e| eyre::eyre!("Failed to initialize tracing: {e:?}"))?;
    }

    #[cfg(not(feature = "tokio-console"))]
    {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .with_writer(std::io::stderr)
            .with_timer(tracing_subscriber::fmt::time::uptime())
            .with_target(false)
            .try_init()
            .map_err(|e| eyre::eyre!("Failed to initialize tracing: {e:?}"))?;
    }

    Ok(())
}

async fn run_ledger(command: LedgerCommands) -> eyre::Result<()> {
    match command {
        LedgerCommands::Init { args } => {
            let params = args.params();
            commands::ledger_init(&args.state.state, params, args.variant, args.hasher).await
        }
        LedgerCommands::Whitelist {
            state,
            caller,
            asset,
        } => commands::ledger_whitelist(&state.state, caller, asset).await,
        LedgerCommands::Mint {
            state,
            asset,
            account,
            amount,
        } => commands::ledger_mint(&state.state, asset, account, amount).await,
        LedgerCommands::Approve {
            state,
            asset,
            owner,
            spender,
            amount,
        } => commands::ledger_approve(&state.state, asset, owner, spender, amount).await,
        LedgerCommands::Deposit { args } => {
            commands::ledger_deposit(
                &args.state.state,
                &args.commitment_source(),
                args.asset,
                args.amount,
                args.caller,
            )
            .await
        }
        LedgerCommands::AddCommitment {
            state,
            caller,
            commitment,
        } => commands::ledger_add_commitment(&state.state, caller, commitment).await,
        LedgerCommands::Withdraw { args } => {
            commands::ledger_withdraw(
                &args.state.state,
                &args.proof,
                args.asset,
                args.amount,
                args.recipient,
            )
            .await
        }
        LedgerCommands::Status { state } => commands::ledger_status(&state.state).await,
        LedgerCommands::IsSpent { state, nullifier } => {
            commands::ledger_is_spent(&state.state, nullifier).await
        }
        LedgerCommands::Balance {
            state,
            asset,
            account,
        } => commands::ledger_balance(&state.state, asset, account).await,
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> eyre::Result<()> {
    // Load .env file (fails silently if not found)
    let _ = dotenvy::dotenv();

    init_tracing()?;

    let cli = Cli::parse();

    let res = match cli.command {
        Commands::Ledger { command } => run_ledger(command).await,
        Commands::Note { command } => match command {
            NoteCommands::New { out, hasher } => commands::note_new(&out, hasher).await,
            NoteCommands::Prove {
                note,
                state,
                out,
                leaf_index,
            } => commands::note_prove(&note, &state, &out, leaf_index).await,
        },
        Commands::Relay { command } => match command {
            RelayCommands::Sync { args } => {
                commands::relay_sync(&RelaySyncOptions::from(args)).await
            }
            RelayCommands::Status { checkpoint_db } => {
                commands::relay_status(&checkpoint_db).await
            }
            RelayCommands::ConfigSchema => commands::relay_config_schema(),
        },
        Commands::Tree { command } => match command {
            TreeCommands::Export { state, out } => commands::tree_export(&state, &out).await,
            TreeCommands::Root {
                leaves,
                depth,
                hasher,
            } => commands::tree_root(&leaves, depth, hasher).await,
        },
    };

    if let Err(e) = res {
        tracing::error!("Error: {:?}", e);
        std::process::exit(1);
    }

    Ok(())
}
