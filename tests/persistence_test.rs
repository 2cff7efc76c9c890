#![cfg(feature = "storage-rocksdb")]

use assert_cmd::cargo_bin;
use std::process::Command;
use tempfile::tempdir;

#[test]
fn test_rocksdb_persistence_recovery() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    // 1. First run: seed the store and preview
    let mut cmd1 = Command::new(cargo_bin!("fulfillment-bridge"));
    cmd1.env("WEBHOOK_SECRET", "whsec_test")
        .env("RUST_LOG", "off")
        .arg("--db-path")
        .arg(&db_path)
        .arg("--seed")
        .arg("tests/fixtures/seed.json")
        .arg("preview")
        .arg("ORD-1");

    let output1 = cmd1.output().expect("Failed to execute command");
    assert!(output1.status.success());

    // 2. Second run: no seed, the invoice must come back from disk
    let mut cmd2 = Command::new(cargo_bin!("fulfillment-bridge"));
    cmd2.env("WEBHOOK_SECRET", "whsec_test")
        .env("RUST_LOG", "off")
        .arg("--db-path")
        .arg(&db_path)
        .arg("preview")
        .arg("ORD-1");

    let output2 = cmd2.output().expect("Failed to execute command");
    assert!(output2.status.success());
    let stdout2 = String::from_utf8_lossy(&output2.stdout);
    assert!(stdout2.contains(r#""identifier": "ORD-1""#));
}
