use assert_cmd::Command;
use predicates::prelude::*;

fn cli() -> Command {
    Command::cargo_bin("resource-leak").unwrap()
}

#[test]
fn test_reports_leak() {
    cli()
        .arg("leaky")
        .assert()
        .success()
        .stdout(predicate::str::contains("lock acquired at n3 in 'main'"));
}

#[test]
fn test_leak_is_logged_as_warning() {
    cli()
        .arg("leaky")
        .assert()
        .success()
        .stderr(predicate::str::contains("Leaky demo: 1 possible leak(s)"));
}

#[test]
fn test_clean_scenario_logs_nothing() {
    cli().arg("recursive").assert().success().stderr("");
}

#[test]
fn test_clean_scenario() {
    cli()
        .arg("recursive")
        .assert()
        .success()
        .stdout(predicate::str::contains("main: no leaks"));
}

#[test]
fn test_deny_fails_on_leak() {
    cli()
        .args(["branch", "--deny"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("possible leak"));
}

#[test]
fn test_deny_passes_clean_scenario() {
    cli().args(["recursive", "--deny"]).assert().success();
}

#[test]
fn test_verbose_prints_cache_stats() {
    cli()
        .args(["helper", "--verbose"])
        .assert()
        .success()
        .stdout(predicate::str::contains("summaries: 2 computed, 2 hits, 1 misses"));
}

#[test]
fn test_unknown_scenario_is_rejected() {
    cli().arg("nonsense").assert().failure();
}
