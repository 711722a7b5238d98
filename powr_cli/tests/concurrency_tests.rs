//! Concurrency tests for the powr binary.
//!
//! These tests verify that multiple processes can safely:
//! - Write to the database simultaneously (SQLite busy timeout)
//! - Read history while other processes write

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use std::thread;
use tempfile::TempDir;

fn cli(data_dir: &Path, config: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("powr"));
    cmd.arg("--data-dir").arg(data_dir).arg("--config").arg(config);
    cmd
}

fn setup() -> (TempDir, PathBuf, PathBuf) {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let data_dir = temp_dir.path().join("data");
    let config = temp_dir.path().join("config.toml");
    std::fs::write(&config, "").expect("Failed to write config");

    // First run creates the database and seeds the catalog
    cli(&data_dir, &config)
        .args(["exercise", "list"])
        .assert()
        .success();

    (temp_dir, data_dir, config)
}

#[test]
fn test_concurrent_exercise_creation() {
    let (_temp_dir, data_dir, config) = setup();

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let data_dir = data_dir.clone();
            let config = config.clone();
            thread::spawn(move || {
                cli(&data_dir, &config)
                    .args([
                        "exercise",
                        "add",
                        format!("Custom Lift {}", i).as_str(),
                        "--category",
                        "push",
                        "--equipment",
                        "dumbbell",
                    ])
                    .assert()
                    .success();
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("writer thread panicked");
    }

    let output = cli(&data_dir, &config)
        .args(["exercise", "list", "--query", "custom lift"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let listing = String::from_utf8(output).unwrap();
    assert_eq!(listing.lines().count(), 4, "listing was:\n{}", listing);
}

#[test]
fn test_reads_during_writes() {
    let (_temp_dir, data_dir, config) = setup();

    let writer = {
        let data_dir = data_dir.clone();
        let config = config.clone();
        thread::spawn(move || {
            for i in 0..3 {
                cli(&data_dir, &config)
                    .args([
                        "template",
                        "create",
                        format!("Plan {}", i).as_str(),
                        "--exercise",
                        "local:seed-bench-press:3:5",
                    ])
                    .assert()
                    .success();
            }
        })
    };

    for _ in 0..3 {
        cli(&data_dir, &config)
            .args(["template", "list"])
            .assert()
            .success();
    }
    writer.join().expect("writer thread panicked");

    let output = cli(&data_dir, &config)
        .args(["template", "list"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert_eq!(String::from_utf8(output).unwrap().lines().count(), 3);
}

#[test]
fn test_parallel_add_set_keeps_every_set() {
    let (_temp_dir, data_dir, config) = setup();
    cli(&data_dir, &config)
        .args(["workout", "start", "Leg Day"])
        .assert()
        .success();
    cli(&data_dir, &config)
        .args(["workout", "add-exercise", "Back Squat"])
        .assert()
        .success();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let data_dir = data_dir.clone();
            let config = config.clone();
            thread::spawn(move || {
                for _ in 0..3 {
                    cli(&data_dir, &config)
                        .args(["workout", "add-set", "1", "--weight", "100", "--reps", "5"])
                        .assert()
                        .success();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("writer thread panicked");
    }

    let output = cli(&data_dir, &config)
        .args(["workout", "status", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let status: serde_json::Value = serde_json::from_slice(&output).unwrap();
    let sets = status["workout"]["exercises"][0]["sets"]
        .as_array()
        .expect("no sets in status");
    assert_eq!(sets.len(), 12);
    assert_eq!(status["workout"]["total_volume"], 6000.0);
}
