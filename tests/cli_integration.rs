#![allow(deprecated)]

//! End-to-end tests of the disa-store binary
//!
//! Each test runs against its own temporary record store and legacy store.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use std::path::PathBuf;
use tempfile::TempDir;
mod common;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: TempDir::new().expect("failed to create tempdir"),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("disa-store").unwrap();
        cmd.env_remove("DISA_STORE_DB")
            .env_remove("DISA_LEGACY_DB")
            .env("RUST_LOG", "off")
            .env("NO_COLOR", "1")
            .arg("--config")
            .arg(self.path("missing-config.yaml"))
            .arg("--storage-path")
            .arg(self.path("conversations.db"))
            .arg("--legacy-path")
            .arg(self.path("legacy"));
        cmd
    }

    fn write_backup(&self) -> PathBuf {
        let conversation = |id: &str, title: &str| {
            json!({
                "id": id,
                "title": title,
                "createdAt": "2024-01-01T00:00:00Z",
                "updatedAt": "2024-01-01T00:00:00Z",
                "model": "gpt-3.5",
                "messageCount": 1,
                "messages": [{"role": "user", "content": "Hello"}]
            })
        };
        let backup = json!({
            "version": "1.0",
            "timestamp": "2024-01-01T00:00:00Z",
            "conversations": {
                "alpha": conversation("alpha", "Alpha chat"),
                "beta": conversation("beta", "Beta chat")
            },
            "metadata": {}
        });
        let path = self.path("backup.json");
        std::fs::write(&path, backup.to_string()).expect("write backup");
        path
    }
}

#[test]
fn test_status_on_empty_stores() {
    let ws = Workspace::new();
    ws.cmd()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("No migration needed"));
}

#[test]
fn test_migrate_without_legacy_data_succeeds() {
    let ws = Workspace::new();
    ws.cmd()
        .arg("migrate")
        .assert()
        .success()
        .stdout(predicate::str::contains("No legacy data found to migrate"))
        .stdout(predicate::str::contains("Migrated 0 conversation(s)"));
}

#[test]
fn test_backup_without_legacy_data_fails() {
    let ws = Workspace::new();
    ws.cmd()
        .arg("backup")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No legacy data available"));
}

#[test]
fn test_restore_then_list_show_and_export() {
    let ws = Workspace::new();
    let backup = ws.write_backup();

    ws.cmd()
        .arg("restore")
        .arg(&backup)
        .assert()
        .success()
        .stdout(predicate::str::contains("Restored 2 conversation(s)"));

    ws.cmd()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Alpha chat"))
        .stdout(predicate::str::contains("Beta chat"));

    ws.cmd()
        .args(["list", "--search", "beta"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Beta chat"))
        .stdout(predicate::str::contains("Alpha chat").not());

    ws.cmd()
        .args(["show", "alpha", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"messageCount\": 1"));

    let export = ws.path("export.json");
    ws.cmd()
        .arg("export")
        .arg("--output")
        .arg(&export)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 2 conversation(s)"));

    let exported: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&export).unwrap()).unwrap();
    assert_eq!(exported["version"], "2.0");
    assert_eq!(exported["conversations"].as_array().unwrap().len(), 2);
}

#[test]
fn test_mutations_and_clear_confirmation() {
    let ws = Workspace::new();
    let backup = ws.write_backup();
    ws.cmd().arg("restore").arg(&backup).assert().success();

    ws.cmd()
        .args(["rename", "alpha", "Renamed chat"])
        .assert()
        .success();
    ws.cmd()
        .args(["favorite", "alpha"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Marked alpha as favorite"));
    ws.cmd()
        .args(["show", "alpha"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Renamed chat"));

    ws.cmd()
        .args(["show", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Conversation ghost not found"));

    ws.cmd()
        .args(["delete", "beta"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted 1 conversation(s)"));

    ws.cmd()
        .arg("clear")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--yes"));

    ws.cmd().args(["clear", "--yes"]).assert().success();
    ws.cmd()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No conversations found"));
}

#[test]
fn test_stats_usage_and_sync_metadata() {
    let ws = Workspace::new();
    let backup = ws.write_backup();
    ws.cmd().arg("restore").arg(&backup).assert().success();

    ws.cmd()
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("gpt-3.5"));
    ws.cmd()
        .arg("usage")
        .assert()
        .success()
        .stdout(predicate::str::contains("Used:"));
    ws.cmd()
        .arg("sync-metadata")
        .assert()
        .success()
        .stdout(predicate::str::contains("already current: 2"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let (_temp_dir, config_path) =
        common::temp_config_file("migration:\n  batch_size: 0\n");
    let ws = Workspace::new();

    let mut cmd = Command::cargo_bin("disa-store").unwrap();
    cmd.env_remove("DISA_MIGRATION_BATCH_SIZE")
        .arg("--config")
        .arg(config_path)
        .arg("--storage-path")
        .arg(ws.path("conversations.db"))
        .arg("stats");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("must be greater than 0"));
}
