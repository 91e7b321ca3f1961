//! Shared constants for CLI.

// -------------------------
// Environment variables
// -------------------------

// Common
pub const ZKB_STATE_FILE: &str = "ZKB_STATE_FILE";
pub const ZKB_ASSET: &str = "ZKB_ASSET";
pub const ZKB_AMOUNT: &str = "ZKB_AMOUNT";
pub const ZKB_CALLER: &str = "ZKB_CALLER";
pub const ZKB_HASHER: &str = "ZKB_HASHER";

// Ledger init
pub const ZKB_LEDGER_ID: &str = "ZKB_LEDGER_ID";
pub const ZKB_LEDGER_VARIANT: &str = "ZKB_LEDGER_VARIANT";
pub const ZKB_OWNER: &str = "ZKB_OWNER";
pub const ZKB_CUSTODY: &str = "ZKB_CUSTODY";
pub const ZKB_RELAYER: &str = "ZKB_RELAYER";
pub const ZKB_TREE_DEPTH: &str = "ZKB_TREE_DEPTH";
pub const ZKB_ROOT_HISTORY: &str = "ZKB_ROOT_HISTORY";

// Ledger operations
pub const ZKB_ACCOUNT: &str = "ZKB_ACCOUNT";
pub const ZKB_SPENDER: &str = "ZKB_SPENDER";
pub const ZKB_RECIPIENT: &str = "ZKB_RECIPIENT";
pub const ZKB_COMMITMENT: &str = "ZKB_COMMITMENT";
pub const ZKB_NULLIFIER: &str = "ZKB_NULLIFIER";

// Notes and proofs
pub const ZKB_NOTE_FILE: &str = "ZKB_NOTE_FILE";
pub const ZKB_NOTE_OUT: &str = "ZKB_NOTE_OUT";
pub const ZKB_PROOF_FILE: &str = "ZKB_PROOF_FILE";
pub const ZKB_PROOF_OUT: &str = "ZKB_PROOF_OUT";
pub const ZKB_LEAF_INDEX: &str = "ZKB_LEAF_INDEX";

// Relay
pub const ZKB_STATE_A: &str = "ZKB_STATE_A";
pub const ZKB_STATE_B: &str = "ZKB_STATE_B";
pub const ZKB_CHECKPOINT_DB: &str = "ZKB_CHECKPOINT_DB";
pub const ZKB_SETTINGS_FILE: &str = "ZKB_SETTINGS_FILE";
pub const ZKB_ONCE: &str = "ZKB_ONCE";

// Tree
pub const ZKB_LEAVES_FILE: &str = "ZKB_LEAVES_FILE";
pub const ZKB_LEAVES_OUT: &str = "ZKB_LEAVES_OUT";

// -------------------------
// Default values
// -------------------------

pub const DEFAULT_HASHER: &str = "sha256";
pub const DEFAULT_NOTE_FILE: &str = "note.json";
pub const DEFAULT_PROOF_FILE: &str = "proof.json";
pub const DEFAULT_CHECKPOINT_DB: &str = "relay-checkpoints";
pub const DEFAULT_LEAVES_FILE: &str = "leaves.bin";
