//! Test-only helpers: scratch repositories and scripted collaborators.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, anyhow};
use tempfile::TempDir;

use crate::core::story::{Story, StoryState};
use crate::io::runner::{Capture, CommandRunner};
use crate::io::tracker::Tracker;

/// Scratch git repository with an initial commit.
///
/// The worktree lives in a `repo/` subdirectory so bare remotes can be
/// created as siblings without dirtying the tree.
pub struct TestRepo {
    temp: TempDir,
    root: PathBuf,
}

impl TestRepo {
    pub fn new() -> Result<Self> {
        let temp = TempDir::new().context("create tempdir")?;
        let root = temp.path().join("repo");
        std::fs::create_dir(&root).context("create repo dir")?;
        let repo = Self { temp, root };
        repo.git(&["init", "-q"])?;
        repo.git(&["config", "user.email", "test@example.com"])?;
        repo.git(&["config", "user.name", "Test"])?;
        repo.commit_file("README.md", "# test\n", "initial commit")?;
        Ok(repo)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Run git in the repository, asserting success and returning stdout.
    pub fn git(&self, args: &[&str]) -> Result<String> {
        run_git(&self.root, args)
    }

    /// Name of the currently checked out branch.
    pub fn branch(&self) -> Result<String> {
        self.git(&["rev-parse", "--abbrev-ref", "HEAD"])
    }

    /// Write `contents` to `name` and commit it.
    pub fn commit_file(&self, name: &str, contents: &str, message: &str) -> Result<()> {
        std::fs::write(self.root.join(name), contents).with_context(|| format!("write {name}"))?;
        self.git(&["add", name])?;
        self.git(&["commit", "-q", "-m", message])?;
        Ok(())
    }

    /// Create a bare sibling repository and register it as remote `name`.
    pub fn add_bare_remote(&self, name: &str) -> Result<PathBuf> {
        let path = self.temp.path().join(format!("{name}.git"));
        let path_str = path.to_str().context("remote path is not utf-8")?;
        run_git(self.temp.path(), &["init", "--bare", "-q", path_str])?;
        self.git(&["remote", "add", name, path_str])?;
        Ok(path)
    }
}

fn run_git(dir: &Path, args: &[&str]) -> Result<String> {
    let out = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .with_context(|| format!("run git {args:?}"))?;
    if !out.status.success() {
        return Err(anyhow!(
            "git {args:?} failed: {}",
            String::from_utf8_lossy(&out.stderr).trim()
        ));
    }
    Ok(String::from_utf8_lossy(&out.stdout).trim().to_string())
}

/// Command runner that replays canned captures and records every call.
///
/// Unstubbed commands succeed with empty output, so tests only script the
/// calls whose results matter.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRunner {
    state: Arc<Mutex<ScriptState>>,
}

#[derive(Debug, Default)]
struct ScriptState {
    stubs: Vec<(Vec<String>, Capture)>,
    calls: Vec<String>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `capture` whenever exactly `argv` is run.
    pub fn stub(&self, argv: &[&str], capture: Capture) {
        let mut state = self.state.lock().expect("lock");
        state
            .stubs
            .push((argv.iter().map(ToString::to_string).collect(), capture));
    }

    /// Every command line run so far, space-joined.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().expect("lock").calls.clone()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, argv: &[&str], _workdir: &Path) -> Result<Capture> {
        let mut state = self.state.lock().expect("lock");
        state.calls.push(argv.join(" "));
        let capture = state
            .stubs
            .iter()
            .find(|(stubbed, _)| stubbed.iter().map(String::as_str).eq(argv.iter().copied()))
            .map(|(_, capture)| capture.clone())
            .unwrap_or_else(|| Capture::ok(""));
        Ok(capture)
    }
}

/// Tracker double that serves fixed stories and records updates.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTracker {
    state: Arc<Mutex<TrackerState>>,
}

#[derive(Debug, Default)]
struct TrackerState {
    stories: Vec<Story>,
    updates: Vec<(u64, StoryState, String)>,
}

impl ScriptedTracker {
    pub fn with_stories(stories: Vec<Story>) -> Self {
        Self {
            state: Arc::new(Mutex::new(TrackerState {
                stories,
                updates: Vec::new(),
            })),
        }
    }

    /// Every `(story id, state, owner)` update recorded so far.
    pub fn updates(&self) -> Vec<(u64, StoryState, String)> {
        self.state.lock().expect("lock").updates.clone()
    }
}

impl Tracker for ScriptedTracker {
    fn story(&self, id: u64) -> Result<Story> {
        self.state
            .lock()
            .expect("lock")
            .stories
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| anyhow!("no story {id}"))
    }

    fn candidates(&self, _story_type: Option<&str>) -> Result<Vec<Story>> {
        Ok(self.state.lock().expect("lock").stories.clone())
    }

    fn update_story(&self, id: u64, state: StoryState, owned_by: &str) -> Result<()> {
        self.state
            .lock()
            .expect("lock")
            .updates
            .push((id, state, owned_by.to_string()));
        Ok(())
    }
}

/// Build a deterministic unstarted story.
pub fn story(id: u64, name: &str, estimate: Option<i64>) -> Story {
    Story {
        id,
        name: name.to_string(),
        estimate,
        current_state: StoryState::Unstarted,
        owned_by: None,
    }
}
