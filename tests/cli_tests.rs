//! CLI integration tests using assert_cmd.
//!
//! Every test runs the real `nthprime` binary. None needs network access;
//! indices are kept small enough that each invocation finishes quickly.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

#[allow(deprecated)]
fn nthprime() -> Command {
    let mut cmd = Command::cargo_bin("nthprime").unwrap();
    cmd.env_remove("NTHPRIME_CONFIG").env_remove("RUST_LOG");
    cmd
}

fn json_stdout(args: &[&str]) -> serde_json::Value {
    let out = nthprime().args(args).arg("--json").output().unwrap();
    assert!(out.status.success(), "{:?} failed: {}", args, String::from_utf8_lossy(&out.stderr));
    serde_json::from_slice(&out.stdout).unwrap()
}

// --- Help and arg validation ---

#[test]
fn help_shows_all_subcommands() {
    nthprime().arg("--help").assert().success().stdout(
        predicate::str::contains("predict")
            .and(predicate::str::contains("estimate"))
            .and(predicate::str::contains("scan"))
            .and(predicate::str::contains("generate"))
            .and(predicate::str::contains("batch")),
    );
}

#[test]
fn help_scan_shows_args() {
    nthprime()
        .args(["scan", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("--window")
                .and(predicate::str::contains("--step"))
                .and(predicate::str::contains("--wheel"))
                .and(predicate::str::contains("--target"))
                .and(predicate::str::contains("--max-iters"))
                .and(predicate::str::contains("--manual")),
        );
}

#[test]
fn version_flag() {
    nthprime()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn missing_subcommand_fails() {
    nthprime().assert().failure();
}

#[test]
fn predict_requires_index() {
    nthprime()
        .arg("predict")
        .assert()
        .failure()
        .stderr(predicate::str::contains("INDEX"));
}

// --- predict ---

#[test]
fn predict_grid_index_is_exact() {
    nthprime()
        .args(["predict", "1000"])
        .assert()
        .success()
        .stdout(predicate::str::contains("7919").and(predicate::str::contains("exact")));
}

#[test]
fn predict_power_notation() {
    let v = json_stdout(&["predict", "10^9"]);
    assert_eq!(v["prime"], "22801763489");
    assert_eq!(v["source"], "exact");
    assert_eq!(v["error_ppm"], 0.0);
}

#[test]
fn predict_off_grid_is_estimated() {
    let v = json_stdout(&["predict", "123456"]);
    assert_eq!(v["source"], "estimated");
    assert!(v["error_ppm"].as_f64().unwrap() < 5_000.0);
    let p: u64 = v["prime"].as_str().unwrap().parse().unwrap();
    assert!((2..p).take_while(|d| d * d <= p).all(|d| p % d != 0));
}

#[test]
fn predict_rejects_zero_index() {
    nthprime()
        .args(["predict", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("prime index must be >= 1"));
}

#[test]
fn predict_rejects_garbage_index() {
    nthprime()
        .args(["predict", "ten"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid index"));
}

#[test]
fn predict_rejects_unsupported_wheel() {
    nthprime()
        .args(["predict", "12345", "--wheel", "7"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported wheel modulus 7"));
}

#[test]
fn predict_rejects_bad_precision() {
    nthprime()
        .args(["predict", "12345", "--prec", "16"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("precision must be between"));
}

#[test]
fn predict_without_table_refines() {
    let v = json_stdout(&["predict", "1000", "--no-table"]);
    assert_eq!(v["source"], "estimated");
    assert_eq!(v["estimate"], "7848");
}

// --- estimate ---

#[test]
fn estimate_closed_form_value() {
    let v = json_stdout(&["estimate", "1000000"]);
    assert_eq!(v["estimate"], "15485846");
    assert_eq!(v["method"], "closed-form");
    assert_eq!(v["precision_bits"], 2068);
}

#[test]
fn estimate_riemann_converges() {
    let v = json_stdout(&["estimate", "1e6", "--method", "riemann"]);
    assert_eq!(v["method"], "riemann-inverse");
    assert_eq!(v["converged"], true);
}

// --- scan ---

#[test]
fn scan_rejects_wheel_seven() {
    nthprime()
        .args(["scan", "1000", "--wheel", "7"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported wheel modulus 7"));
}

#[test]
fn scan_rejects_zero_step() {
    nthprime()
        .args(["scan", "1000", "--step", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("step must be > 0"));
}

#[test]
fn scan_reports_telemetry() {
    let v = json_stdout(&["scan", "10^6", "--max-iters", "20"]);
    for key in [
        "window",
        "step",
        "ratio",
        "prime_count",
        "iterations",
        "oracle_call_count",
        "elapsed_ms",
        "locked",
        "wheel_residue_label",
        "prime_found",
    ] {
        assert!(v.get(key).is_some(), "missing {}", key);
    }
    if v["locked"] == true {
        assert!(v["prime_found"].is_string());
    }
}

#[test]
fn manual_scan_runs_once() {
    let v = json_stdout(&["scan", "1000", "--manual", "--window", "8", "--step", "1"]);
    assert_eq!(v["iterations"], 1);
    assert_eq!(v["window"], 8);
}

// --- generate ---

#[test]
fn generate_first_primes() {
    nthprime()
        .args(["generate", "--start", "1", "--count", "5"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("  2  ")
                .and(predicate::str::contains("  11  "))
                .and(predicate::str::contains("[Mersenne]")),
        );
}

#[test]
fn generate_json_with_stats() {
    let v = json_stdout(&["generate", "--start", "10^20", "--count", "2"]);
    let primes = v["primes"].as_array().unwrap();
    assert_eq!(primes.len(), 2);
    assert_eq!(primes[0]["value"], "100000000000000000039");
    assert!(v["stats"]["oracle_calls"].as_u64().unwrap() >= 2);
}

// --- batch ---

#[test]
fn batch_predicts_in_order() {
    let v = json_stdout(&["batch", "10", "100", "1000"]);
    let entries = v.as_array().unwrap();
    let primes: Vec<&str> = entries.iter().map(|e| e["prime"].as_str().unwrap()).collect();
    assert_eq!(primes, vec!["29", "541", "7919"]);
}

#[test]
fn batch_reports_failures() {
    nthprime()
        .args(["batch", "10", "0"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("29"))
        .stderr(predicate::str::contains("1 of 2 predictions failed"));
}

// --- config file ---

#[test]
fn config_file_sets_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[predict]\nuse_known_table = false").unwrap();
    let out = nthprime()
        .args(["predict", "100", "--json", "--config"])
        .arg(file.path())
        .output()
        .unwrap();
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["source"], "estimated");
}

#[test]
fn config_file_with_bad_wheel_fails() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[scan]\nwheel = 7").unwrap();
    nthprime()
        .args(["scan", "1000", "--config"])
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("loading config"));
}
