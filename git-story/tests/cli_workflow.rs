//! CLI tests for the spawned binary.
//!
//! Exercises the fatal paths (exit code 1 plus a diagnostic on stderr) and
//! the hook installation flow against real scratch repositories.

use std::path::Path;
use std::process::{Command, Output};

use git_story::test_support::TestRepo;

fn run_cli(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_git-story"))
        .args(args)
        .current_dir(dir)
        .output()
        .expect("run git-story")
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).to_string()
}

#[test]
fn sync_outside_repository_fails() {
    let temp = tempfile::tempdir().expect("tempdir");
    let out = run_cli(temp.path(), &["sync"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(
        stderr(&out).contains("not in a git repository"),
        "stderr: {}",
        stderr(&out)
    );
}

#[test]
fn sync_without_provenance_fails() {
    let repo = TestRepo::new().expect("repo");
    let out = run_cli(repo.root(), &["sync"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(
        stderr(&out).contains("no recorded root branch"),
        "stderr: {}",
        stderr(&out)
    );
}

#[test]
fn sync_with_dirty_tree_fails() {
    let repo = TestRepo::new().expect("repo");
    std::fs::write(repo.root().join("README.md"), "# changed\n").expect("edit");
    let out = run_cli(repo.root(), &["sync"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(
        stderr(&out).contains("uncommitted changes"),
        "stderr: {}",
        stderr(&out)
    );
}

#[test]
fn hook_command_is_idempotent_and_respects_force() {
    let repo = TestRepo::new().expect("repo");
    let hook = repo.root().join(".git/hooks/prepare-commit-msg");

    let out = run_cli(repo.root(), &["hook"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(hook.exists());
    let installed = std::fs::read_to_string(&hook).expect("read hook");
    assert!(installed.contains("story-id"));

    // Without --force an existing hook is left untouched.
    std::fs::write(&hook, "#!/bin/sh\nexit 0\n").expect("replace hook");
    let out = run_cli(repo.root(), &["hook"]);
    assert!(out.status.success());
    assert_eq!(
        std::fs::read_to_string(&hook).expect("read hook"),
        "#!/bin/sh\nexit 0\n"
    );

    let out = run_cli(repo.root(), &["hook", "--force"]);
    assert!(out.status.success());
    assert_eq!(std::fs::read_to_string(&hook).expect("read hook"), installed);
}

#[test]
fn push_falls_back_to_origin_remote() {
    let repo = TestRepo::new().expect("repo");
    repo.add_bare_remote("origin").expect("remote");
    let branch = repo.branch().expect("branch");

    let out = run_cli(repo.root(), &["push"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("origin"), "stdout: {stdout}");

    let listing = repo.git(&["ls-remote", "--heads", "origin"]).expect("ls");
    assert!(listing.contains(&format!("refs/heads/{branch}")));
}

#[test]
fn start_without_tracker_settings_fails_with_setup_hint() {
    let repo = TestRepo::new().expect("repo");
    // Make sure an inherited token from the host environment cannot leak in.
    repo.git(&["config", "tracker.api-token", ""]).expect("config");
    let out = run_cli(repo.root(), &["start", "42"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(
        stderr(&out).contains("tracker.api-token"),
        "stderr: {}",
        stderr(&out)
    );
}
