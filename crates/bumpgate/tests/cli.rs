//! End-to-end CLI integration tests
//!
//! These tests invoke the compiled binary as a subprocess to verify
//! that the CLI behaves correctly from a user's perspective.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Returns a Command configured to run our binary.
///
/// Note: `cargo_bin` is marked deprecated for edge cases involving custom
/// cargo build directories, but works correctly for standard project layouts.
#[allow(deprecated)]
fn cmd() -> Command {
    Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap()
}

fn git(dir: &Path, args: &[&str]) {
    let status = std::process::Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(
        status.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&status.stderr)
    );
}

/// A committed repository holding the given files.
fn repo_with(files: &[(&str, &str)]) -> TempDir {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    git(dir, &["init", "--initial-branch=main"]);
    git(dir, &["config", "user.email", "test@example.com"]);
    git(dir, &["config", "user.name", "Test"]);
    git(dir, &["config", "commit.gpgsign", "false"]);
    git(dir, &["config", "tag.gpgsign", "false"]);
    for (name, content) in files {
        fs::write(dir.join(name), content).unwrap();
    }
    git(dir, &["add", "-A"]);
    git(dir, &["commit", "-m", "initial commit"]);
    tmp
}

fn in_dir(dir: &Path) -> Command {
    let mut cmd = cmd();
    cmd.args(["-C", dir.to_str().unwrap()]);
    cmd
}

fn stdout_json(output: &assert_cmd::assert::Assert) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    serde_json::from_str(&stdout).expect("stdout should be valid JSON")
}

const CARGO: &str = "[package]\nname = \"demo\"\nversion = \"1.2.3\"\n\n[dependencies]\nserde = { version = \"1.0\" }\n";
const PYPROJECT: &str = "[project]\nname = \"demo\"\nversion = \"1.2.3\"\n";

// =============================================================================
// Help & Version
// =============================================================================

#[test]
fn help_flag_shows_usage() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("Commands:"))
        .stdout(predicate::str::contains("Options:"));
}

#[test]
fn short_help_flag_shows_usage() {
    cmd()
        .arg("-h")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"));
}

#[test]
fn version_flag_shows_version() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn short_version_flag_shows_version() {
    cmd()
        .arg("-V")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

// =============================================================================
// Info Command
// =============================================================================

#[test]
fn info_shows_package_name_and_version() {
    cmd()
        .arg("info")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_NAME")))
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn info_json_outputs_valid_json() {
    let output = cmd()
        .arg("info")
        .arg("--json")
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout)
        .expect("info --json should output valid JSON");

    assert_eq!(json["name"], env!("CARGO_PKG_NAME"));
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

#[test]
fn info_json_contains_expected_fields() {
    cmd()
        .arg("info")
        .arg("--json")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"name\""))
        .stdout(predicate::str::contains("\"version\""));
}

#[test]
fn info_json_lists_version_files() {
    let tmp = repo_with(&[("Cargo.toml", CARGO)]);
    let json = stdout_json(&in_dir(tmp.path()).args(["--json", "info"]).assert().success());

    assert_eq!(json["version"]["current"], "1.2.3");
    assert_eq!(json["version"]["files"][0]["path"], "Cargo.toml");
    assert_eq!(json["version"]["files"][0]["format"], "cargo_manifest");
}

#[test]
fn info_help_shows_command_options() {
    cmd()
        .args(["info", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--json"));
}

// =============================================================================
// Global Flags
// =============================================================================

#[test]
fn quiet_flag_accepted() {
    cmd()
        .args(["--quiet", "info"])
        .assert()
        .success();
}

#[test]
fn short_quiet_flag_accepted() {
    cmd()
        .args(["-q", "info"])
        .assert()
        .success();
}

#[test]
fn verbose_flag_accepted() {
    cmd()
        .args(["--verbose", "info"])
        .assert()
        .success();
}

#[test]
fn short_verbose_flag_accepted() {
    cmd()
        .args(["-v", "info"])
        .assert()
        .success();
}

#[test]
fn multiple_verbose_flags_accepted() {
    cmd()
        .args(["-vv", "info"])
        .assert()
        .success();
}

#[test]
fn color_auto_accepted() {
    cmd()
        .args(["--color", "auto", "info"])
        .assert()
        .success();
}

#[test]
fn color_always_accepted() {
    cmd()
        .args(["--color", "always", "info"])
        .assert()
        .success();
}

#[test]
fn color_never_accepted() {
    cmd()
        .args(["--color", "never", "info"])
        .assert()
        .success();
}

// =============================================================================
// Doctor Command
// =============================================================================

#[test]
fn doctor_json_reports_git() {
    let json = stdout_json(&cmd().args(["--json", "doctor"]).assert().success());
    assert_eq!(json["git"]["available"], true);
    assert!(json["environment"]["env_vars"].is_array());
}

// =============================================================================
// Preflight Command
// =============================================================================

#[test]
fn preflight_passes_on_clean_repo() {
    let tmp = repo_with(&[("Cargo.toml", CARGO)]);
    in_dir(tmp.path())
        .arg("preflight")
        .assert()
        .success()
        .stdout(predicate::str::contains("Ready to bump"));
}

#[test]
fn preflight_json_reports_six_steps() {
    let tmp = repo_with(&[("Cargo.toml", CARGO)]);
    let json = stdout_json(&in_dir(tmp.path()).args(["--json", "preflight"]).assert().success());

    assert_eq!(json["results"].as_array().unwrap().len(), 6);
    assert_eq!(json["can_proceed"], true);
    assert_eq!(json["has_errors"], false);
}

#[test]
fn preflight_fails_on_dirty_tree() {
    let tmp = repo_with(&[("Cargo.toml", CARGO)]);
    fs::write(tmp.path().join("Cargo.toml"), "[package]\nversion = \"9.9.9\"\n").unwrap();

    in_dir(tmp.path())
        .arg("preflight")
        .assert()
        .failure()
        .stdout(predicate::str::contains("uncommitted changes"));
}

#[test]
fn preflight_fails_outside_repository() {
    let tmp = TempDir::new().unwrap();
    in_dir(tmp.path())
        .arg("preflight")
        .assert()
        .failure()
        .stdout(predicate::str::contains("not inside a git repository"));
}

#[test]
fn preflight_strict_fails_on_warnings() {
    // No remote configured is a warning
    let tmp = repo_with(&[("Cargo.toml", CARGO)]);
    in_dir(tmp.path())
        .args(["preflight", "--strict"])
        .assert()
        .failure();
}

// =============================================================================
// Bump Command
// =============================================================================

#[test]
fn bump_patch_updates_cargo_manifest() {
    let tmp = repo_with(&[("Cargo.toml", CARGO)]);
    in_dir(tmp.path())
        .args(["bump", "patch", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1.2.4"));

    let manifest = fs::read_to_string(tmp.path().join("Cargo.toml")).unwrap();
    assert_eq!(manifest, CARGO.replace("version = \"1.2.3\"", "version = \"1.2.4\""));
}

#[test]
fn bump_dry_run_json_changes_nothing() {
    let tmp = repo_with(&[("Cargo.toml", CARGO), ("pyproject.toml", PYPROJECT)]);
    let json = stdout_json(
        &in_dir(tmp.path())
            .args(["--json", "bump", "minor", "--dry-run"])
            .assert()
            .success(),
    );

    assert_eq!(json["previous"], "1.2.3");
    assert_eq!(json["next"], "1.3.0");
    assert_eq!(json["files"].as_array().unwrap().len(), 2);
    assert_eq!(fs::read_to_string(tmp.path().join("Cargo.toml")).unwrap(), CARGO);
}

#[test]
fn bump_explicit_version_with_tag() {
    let tmp = repo_with(&[("Cargo.toml", CARGO)]);
    let json = stdout_json(
        &in_dir(tmp.path())
            .args(["--json", "bump", "--version", "v2.0.0", "--tag"])
            .assert()
            .success(),
    );

    assert_eq!(json["version"], "2.0.0");
    assert_eq!(json["committed"], true);
    assert_eq!(json["tag"], "v2.0.0");

    let tags = std::process::Command::new("git")
        .args(["tag", "--list"])
        .current_dir(tmp.path())
        .output()
        .unwrap();
    assert_eq!(String::from_utf8_lossy(&tags.stdout).trim(), "v2.0.0");
}

#[test]
fn bump_with_tagged_go_module_in_override_list() {
    let tmp = repo_with(&[
        ("go.mod", "module example.com/demo\n\ngo 1.22\n"),
        ("Cargo.toml", CARGO),
        (".bump", "go.mod\nCargo.toml\n"),
    ]);
    git(tmp.path(), &["tag", "v1.2.3"]);

    let json = stdout_json(
        &in_dir(tmp.path())
            .args(["--json", "bump", "minor", "--tag"])
            .assert()
            .success(),
    );

    assert_eq!(json["version"], "1.3.0");
    assert_eq!(json["tag"], "v1.3.0");
    let manifest = fs::read_to_string(tmp.path().join("Cargo.toml")).unwrap();
    assert!(manifest.contains("version = \"1.3.0\""));
}

#[test]
fn bump_rejects_lower_explicit_version() {
    let tmp = repo_with(&[("Cargo.toml", CARGO)]);
    in_dir(tmp.path())
        .args(["bump", "--version", "1.0.0", "--yes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must be greater"));
}

#[test]
fn bump_refuses_dirty_tree() {
    let tmp = repo_with(&[("Cargo.toml", CARGO)]);
    fs::write(tmp.path().join("notes.txt"), "tracked later").unwrap();
    git(tmp.path(), &["add", "notes.txt"]);

    in_dir(tmp.path())
        .args(["bump", "patch", "--yes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not ready"));
    assert_eq!(fs::read_to_string(tmp.path().join("Cargo.toml")).unwrap(), CARGO);
}

#[test]
fn bump_fails_on_out_of_sync_override_list() {
    let tmp = repo_with(&[
        ("Cargo.toml", CARGO),
        ("pyproject.toml", "[project]\nversion = \"1.0.0\"\n"),
        (".bump", "Cargo.toml\npyproject.toml\n"),
    ]);

    in_dir(tmp.path())
        .args(["bump", "patch", "--yes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("detection failed"));
}

#[test]
fn bump_without_level_non_interactive_fails() {
    let tmp = repo_with(&[("Cargo.toml", CARGO)]);
    in_dir(tmp.path())
        .args(["bump", "--skip-validation"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("specify a bump level"));
}

// =============================================================================
// Error Cases
// =============================================================================

#[test]
fn no_subcommand_shows_help() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn invalid_subcommand_shows_error() {
    cmd()
        .arg("not-a-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn invalid_flag_shows_error() {
    cmd()
        .arg("--not-a-flag")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

// =============================================================================
// Chdir Flag
// =============================================================================

#[test]
fn chdir_flag_changes_directory() {
    // The -C flag should be accepted and work without error
    // We use a path that definitely exists
    cmd()
        .args(["-C", "/tmp", "info"])
        .assert()
        .success();
}

#[test]
fn chdir_nonexistent_fails() {
    cmd()
        .args(["-C", "/nonexistent/path/that/does/not/exist", "info"])
        .assert()
        .failure();
}
