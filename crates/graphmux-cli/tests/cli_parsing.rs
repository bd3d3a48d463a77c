//! CLI tests for the graphmux command
//!
//! Every test runs with HOME and the working directory pointed at a
//! temporary directory so no user configuration leaks in.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const STACK: &str = r#"
[[providers]]
name = "base"
weight = 1

[[providers.graphs]]
name = "urn:example:people"
triples = [
    ["urn:example:alice", "urn:example:knows", "urn:example:bob"],
    ["urn:example:alice", "urn:example:name", "\"Alice\""],
]

[[providers.graphs]]
name = "urn:example:shared"
triples = [["urn:example:s", "urn:example:p", "\"base\""]]

[[providers]]
name = "overlay"
weight = 50
read_only = true

[[providers.graphs]]
name = "urn:example:shared"
kind = "immutable"
triples = [
    ["urn:example:s", "urn:example:p", "\"overlay\""],
    ["urn:example:s", "urn:example:q", "\"extra\""],
]
"#;

/// Get a Command for the graphmux binary rooted in `dir`
#[allow(deprecated)]
fn graphmux(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("graphmux").expect("Failed to find graphmux binary");
    cmd.current_dir(dir)
        .env("HOME", dir.join("home"))
        .env_remove("GRAPHMUX_CONFIG")
        .env_remove("GRAPHMUX_RETAIN_CAPACITY")
        .env_remove("RUST_LOG");
    cmd
}

/// A temp dir with `STACK` as its local config
fn workspace() -> TempDir {
    let temp = TempDir::new().unwrap();
    let config_dir = temp.path().join(".graphmux");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(config_dir.join("config.toml"), STACK).unwrap();
    temp
}

// ============================================================================
// Help and Version Tests
// ============================================================================

#[test]
fn test_help_shows_all_commands() {
    let temp = TempDir::new().unwrap();
    graphmux(temp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("providers"))
        .stdout(predicate::str::contains("graphs"))
        .stdout(predicate::str::contains("resolve"))
        .stdout(predicate::str::contains("triples"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_version_flag() {
    let temp = TempDir::new().unwrap();
    graphmux(temp.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("graphmux"));
}

#[test]
fn test_global_options_in_help() {
    let temp = TempDir::new().unwrap();
    graphmux(temp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--config"))
        .stdout(predicate::str::contains("--verbose"))
        .stdout(predicate::str::contains("--quiet"))
        .stdout(predicate::str::contains("--json"));
}

#[test]
fn test_unknown_command_fails() {
    let temp = TempDir::new().unwrap();
    graphmux(temp.path()).arg("frobnicate").assert().failure();
}

// ============================================================================
// Providers Command Tests
// ============================================================================

#[test]
fn test_providers_in_priority_order() {
    let temp = workspace();
    graphmux(temp.path())
        .arg("providers")
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"(?s)overlay.*base").unwrap());
}

#[test]
fn test_providers_json() {
    let temp = workspace();
    let output = graphmux(temp.path())
        .args(["providers", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let providers: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(providers[0]["name"], "overlay");
    assert_eq!(providers[0]["weight"], 50);
    assert_eq!(providers[1]["name"], "base");
}

#[test]
fn test_providers_without_config() {
    let temp = TempDir::new().unwrap();
    graphmux(temp.path())
        .arg("providers")
        .assert()
        .success()
        .stderr(predicate::str::contains("No providers configured"));
}

// ============================================================================
// Graphs Command Tests
// ============================================================================

#[test]
fn test_graphs_lists_union_with_owner() {
    let temp = workspace();
    graphmux(temp.path())
        .arg("graphs")
        .assert()
        .success()
        .stdout(predicate::str::contains("urn:example:people"))
        .stdout(predicate::str::is_match(r"urn:example:shared\s+overlay\s+immutable").unwrap());
}

#[test]
fn test_graphs_mutable_filter() {
    let temp = workspace();
    let output = graphmux(temp.path())
        .args(["graphs", "--mutable", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let entries: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<&str> = entries
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["name"].as_str().unwrap())
        .collect();
    // base still serves the shared name as mutable
    assert_eq!(names, vec!["urn:example:people", "urn:example:shared"]);
}

#[test]
fn test_graphs_filters_conflict() {
    let temp = workspace();
    graphmux(temp.path())
        .args(["graphs", "--mutable", "--immutable"])
        .assert()
        .failure();
}

// ============================================================================
// Resolve Command Tests
// ============================================================================

#[test]
fn test_resolve_heaviest_provider_wins() {
    let temp = workspace();
    graphmux(temp.path())
        .args(["resolve", "urn:example:shared"])
        .assert()
        .success()
        .stdout(predicate::str::contains("overlay"))
        .stdout(predicate::str::contains("immutable"))
        .stdout(predicate::str::contains("triples: 2"));
}

#[test]
fn test_resolve_mutable_falls_back() {
    let temp = workspace();
    let output = graphmux(temp.path())
        .args(["resolve", "urn:example:shared", "--mutable", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let resolution: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(resolution["kind"], "mutable");
    assert_eq!(resolution["triples"], 1);
}

#[test]
fn test_resolve_missing_graph_fails() {
    let temp = workspace();
    graphmux(temp.path())
        .args(["resolve", "urn:example:nothing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no such graph"));
}

#[test]
fn test_resolve_rejects_relative_name() {
    let temp = workspace();
    graphmux(temp.path())
        .args(["resolve", "not-an-iri"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid graph name"));
}

#[test]
fn test_resolve_requires_name() {
    let temp = workspace();
    graphmux(temp.path()).arg("resolve").assert().failure();
}

// ============================================================================
// Triples Command Tests
// ============================================================================

#[test]
fn test_triples_prints_ntriples() {
    let temp = workspace();
    graphmux(temp.path())
        .args(["triples", "urn:example:people"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "<urn:example:alice> <urn:example:knows> <urn:example:bob> .",
        ))
        .stdout(predicate::str::contains("\"Alice\""));
}

#[test]
fn test_triples_pattern_filter() {
    let temp = workspace();
    graphmux(temp.path())
        .args([
            "triples",
            "urn:example:people",
            "--predicate",
            "urn:example:name",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Alice"))
        .stdout(predicate::str::contains("urn:example:bob").not());
}

#[test]
fn test_triples_limit() {
    let temp = workspace();
    graphmux(temp.path())
        .args(["triples", "urn:example:shared", "--limit", "1"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Showing 1 of 2 triples"));
}

// ============================================================================
// Config Command Tests
// ============================================================================

#[test]
fn test_config_init_then_show() {
    let temp = TempDir::new().unwrap();
    graphmux(temp.path())
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
    assert!(temp.path().join(".graphmux/config.toml").exists());

    graphmux(temp.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("retain_capacity = 256"));
}

#[test]
fn test_config_show_applies_overrides() {
    let temp = workspace();
    let output = graphmux(temp.path())
        .args(["config", "show", "--json", "--retain-capacity", "7"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let config: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(config["cache"]["retain_capacity"], 7);
    assert_eq!(config["providers"].as_array().unwrap().len(), 2);
}

#[test]
fn test_config_path_reports_local() {
    let temp = workspace();
    graphmux(temp.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(".graphmux"))
        .stdout(predicate::str::contains("(exists)"));
}

#[test]
fn test_explicit_config_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("stack.toml");
    std::fs::write(&path, STACK).unwrap();

    graphmux(temp.path())
        .args(["--config", path.to_str().unwrap(), "providers"])
        .assert()
        .success()
        .stdout(predicate::str::contains("overlay"));
}

#[test]
fn test_invalid_config_reported() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("dup.toml");
    std::fs::write(
        &path,
        "[[providers]]\nname = \"a\"\n\n[[providers]]\nname = \"a\"\n",
    )
    .unwrap();

    graphmux(temp.path())
        .args(["--config", path.to_str().unwrap(), "providers"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("duplicate provider"));
}
