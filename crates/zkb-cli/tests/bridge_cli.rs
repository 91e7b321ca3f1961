//! Drives a full deposit, relay and withdrawal through the `zkb` binary.

#![allow(
    clippy::indexing_slicing,
    reason = "Test code should panic on invalid data"
)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::Value;
use tempfile::tempdir;

const OWNER: &str = "0x0000000000000000000000000000000000000001";
const RELAYER: &str = "0x00000000000000000000000000000000000000ee";
const ASSET: &str = "0x00000000000000000000000000000000000000a0";
const ALICE: &str = "0x00000000000000000000000000000000000000a1";
const BOB: &str = "0x00000000000000000000000000000000000000b0";

fn zkb(args: &[&str]) -> Value {
    let output = cargo_bin_cmd!("zkb")
        .args(args)
        .env("RUST_LOG", "warn")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    if output.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&output).expect("stdout is JSON")
    }
}

fn path(dir: &Path, name: &str) -> String {
    dir.join(name).to_string_lossy().into_owned()
}

fn init(state: &str, id: &str, variant: &str) {
    zkb(&[
        "ledger", "init", "--state", state, "--id", id, "--variant", variant, "--owner", OWNER,
        "--relayer", RELAYER, "--depth", "8",
    ]);
    zkb(&[
        "ledger", "whitelist", "--state", state, "--caller", OWNER, "--asset", ASSET,
    ]);
}

#[test]
fn lock_on_a_and_mint_on_b() {
    let dir = tempdir().expect("Failed to create temp dir");
    let a = path(dir.path(), "a.json");
    let b = path(dir.path(), "b.json");
    let note = path(dir.path(), "note.json");
    let proof = path(dir.path(), "proof.json");
    let db = path(dir.path(), "checkpoints");

    init(&a, "a", "lock-release");
    init(&b, "b", "burn-mint");
    zkb(&[
        "ledger", "mint", "--state", &a, "--asset", ASSET, "--account", ALICE, "--amount", "100",
    ]);
    zkb(&[
        "ledger", "approve", "--state", &a, "--asset", ASSET, "--owner", ALICE, "--amount",
        "100",
    ]);

    let created = zkb(&["note", "new", "--out", &note]);
    let nullifier = created["nullifier"].as_str().expect("nullifier").to_owned();
    zkb(&[
        "ledger", "deposit", "--state", &a, "--asset", ASSET, "--amount", "100", "--caller",
        ALICE, "--note", &note,
    ]);
    assert_eq!(zkb(&["ledger", "status", "--state", &a])["nonce"], 1);

    let report = zkb(&[
        "relay", "sync", "--state-a", &a, "--state-b", &b, "--checkpoint-db", &db, "--once",
    ]);
    assert_eq!(report["a_to_b"]["inserted"], 1);
    let status = zkb(&["ledger", "status", "--state", &b]);
    assert_eq!(status["leaf_count"], 1);

    zkb(&["note", "prove", "--note", &note, "--state", &b, "--out", &proof]);
    zkb(&[
        "ledger", "withdraw", "--state", &b, "--proof", &proof, "--asset", ASSET, "--amount",
        "100", "--recipient", BOB,
    ]);
    let balance = zkb(&[
        "ledger", "balance", "--state", &b, "--asset", ASSET, "--account", BOB,
    ]);
    assert_eq!(balance["balance"], 100);
    let spent = zkb(&["ledger", "is-spent", "--state", &b, "--nullifier", &nullifier]);
    assert_eq!(spent["spent"], true);

    cargo_bin_cmd!("zkb")
        .args([
            "ledger", "withdraw", "--state", &b, "--proof", &proof, "--asset", ASSET, "--amount",
            "100", "--recipient", BOB,
        ])
        .assert()
        .failure();

    let checkpoints = zkb(&["relay", "status", "--checkpoint-db", &db]);
    assert_eq!(checkpoints["a->b"]["last_confirmed"], 0);
}

#[test]
fn exported_leaves_match_ledger_root() {
    let dir = tempdir().expect("Failed to create temp dir");
    let a = path(dir.path(), "a.json");
    let leaves = path(dir.path(), "leaves.bin");
    init(&a, "a", "burn-mint");
    for commitment in [
        "0x0000000000000000000000000000000000000000000000000000000000000001",
        "0x0000000000000000000000000000000000000000000000000000000000000002",
    ] {
        zkb(&[
            "ledger", "add-commitment", "--state", &a, "--caller", RELAYER, "--commitment",
            commitment,
        ]);
    }

    zkb(&["tree", "export", "--state", &a, "--out", &leaves]);
    let root = zkb(&["tree", "root", "--leaves", &leaves, "--depth", "8"]);
    let status = zkb(&["ledger", "status", "--state", &a]);
    assert_eq!(root["leaf_count"], 2);
    assert_eq!(root["root"], status["current_root"]);
}

#[test]
fn relay_config_schema_lists_settings() {
    let schema = zkb(&["relay", "config-schema"]);
    assert!(schema["properties"]["poll_interval_ms"].is_object());
    assert!(schema["properties"]["max_retry_attempts"].is_object());
}

#[test]
fn unauthorized_insert_fails() {
    let dir = tempdir().expect("Failed to create temp dir");
    let a = path(dir.path(), "a.json");
    init(&a, "a", "burn-mint");
    cargo_bin_cmd!("zkb")
        .args([
            "ledger",
            "add-commitment",
            "--state",
            &a,
            "--caller",
            ALICE,
            "--commitment",
            "0x0000000000000000000000000000000000000000000000000000000000000003",
        ])
        .assert()
        .failure();
    assert_eq!(zkb(&["ledger", "status", "--state", &a])["leaf_count"], 0);
}
