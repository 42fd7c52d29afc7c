//! Git adapter for the story workflow.
//!
//! A small, explicit wrapper around `git` subprocess calls: repository
//! discovery, branch lifecycle, scoped configuration, remote sync, hook
//! installation, and working-tree guards. Nothing is cached between calls;
//! every read re-derives state from git itself.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result, anyhow, bail};
use regex::Regex;
use tracing::{debug, info, instrument};

use crate::io::runner::{CommandRunner, run_checked};

/// Branch-scoped key recording the branch a story branch was forked from.
pub const KEY_ROOT_BRANCH: &str = "root-branch";
/// Branch-scoped key recording the remote hosting the root branch.
pub const KEY_ROOT_REMOTE: &str = "root-remote";
/// Branch-scoped key recording the remote the developer pushes to.
pub const KEY_PERSONAL_REMOTE: &str = "personal-remote";
/// Branch-scoped key recording the tracker story a branch was created for.
pub const KEY_STORY_ID: &str = "story-id";

/// Remote used by `push` when a branch has no recorded personal remote.
pub const DEFAULT_REMOTE: &str = "origin";

/// Scope for configuration reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadScope {
    /// `branch.<current-branch>.<key>` in local config.
    Branch,
    /// `<key>` through the normal resolution order (local over global).
    Inherited,
}

/// Scope for configuration writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteScope {
    /// `branch.<current-branch>.<key>` in local config.
    Branch,
    /// Repository-local config, unqualified key.
    Local,
    /// User-global config, unqualified key.
    Global,
}

/// Git operations for a working directory.
#[derive(Debug, Clone)]
pub struct Git<R> {
    runner: R,
    workdir: PathBuf,
}

impl<R: CommandRunner> Git<R> {
    pub fn new(runner: R, workdir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            workdir: workdir.into(),
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Return the repository root: the first ancestor of the working
    /// directory containing a `.git` directory.
    pub fn repository_root(&self) -> Result<PathBuf> {
        let mut dir = self
            .workdir
            .canonicalize()
            .with_context(|| format!("resolve {}", self.workdir.display()))?;
        loop {
            if dir.join(".git").is_dir() {
                return Ok(dir);
            }
            if !dir.pop() {
                return Err(anyhow!("not in a git repository"));
            }
        }
    }

    /// Name of the currently checked out branch.
    ///
    /// Parses the `* ` marker line of `git branch`; errors when no branch is
    /// marked current or HEAD is detached.
    pub fn branch_name(&self) -> Result<String> {
        let listing = run_checked(&self.runner, &["git", "branch"], &self.workdir)?;
        current_branch(&listing)
    }

    /// Create `name` off `base_remote/base_branch` and record its provenance.
    ///
    /// The provenance keys are written only after the new branch is checked
    /// out: branch scope is derived from the current branch at write time.
    #[instrument(skip_all, fields(branch = name))]
    pub fn create_branch(
        &self,
        base_remote: &str,
        base_branch: &str,
        personal_remote: &str,
        name: &str,
    ) -> Result<()> {
        info!(base = %format!("{base_remote}/{base_branch}"), "creating story branch");
        run_checked(&self.runner, &["git", "fetch", base_remote], &self.workdir)?;
        let base = format!("{base_remote}/{base_branch}");
        run_checked(&self.runner, &["git", "checkout", &base], &self.workdir)?;
        run_checked(&self.runner, &["git", "checkout", "-b", name], &self.workdir)?;

        self.set_config(KEY_ROOT_BRANCH, base_branch, WriteScope::Branch)?;
        self.set_config(KEY_ROOT_REMOTE, base_remote, WriteScope::Branch)?;
        self.set_config(KEY_PERSONAL_REMOTE, personal_remote, WriteScope::Branch)?;
        Ok(())
    }

    /// Read a configuration value; unset keys yield the empty string.
    pub fn config(&self, key: &str, scope: ReadScope) -> Result<String> {
        let qualified = match scope {
            ReadScope::Branch => format!("branch.{}.{key}", self.branch_name()?),
            ReadScope::Inherited => key.to_string(),
        };
        // Probe, don't check: a missing key exits non-zero and that is a
        // normal outcome here.
        let capture = self
            .runner
            .run(&["git", "config", &qualified], &self.workdir)?;
        Ok(capture.stdout.trim().to_string())
    }

    /// Write a configuration value at the given scope.
    pub fn set_config(&self, key: &str, value: &str, scope: WriteScope) -> Result<()> {
        let (level, qualified) = match scope {
            WriteScope::Branch => ("--local", format!("branch.{}.{key}", self.branch_name()?)),
            WriteScope::Local => ("--local", key.to_string()),
            WriteScope::Global => ("--global", key.to_string()),
        };
        run_checked(
            &self.runner,
            &["git", "config", level, &qualified, value],
            &self.workdir,
        )?;
        Ok(())
    }

    /// Pull the branch's recorded root remote/branch into the current branch.
    #[instrument(skip_all)]
    pub fn update_from_root(&self) -> Result<()> {
        let branch = self.config(KEY_ROOT_BRANCH, ReadScope::Branch)?;
        let remote = self.config(KEY_ROOT_REMOTE, ReadScope::Branch)?;
        if branch.is_empty() || remote.is_empty() {
            bail!(
                "branch '{}' has no recorded root branch (create it with `git-story start`)",
                self.branch_name()?
            );
        }
        info!(remote = %remote, branch = %branch, "merging root branch");
        run_checked(
            &self.runner,
            &["git", "pull", &remote, &branch],
            &self.workdir,
        )?;
        Ok(())
    }

    /// Push explicit refs to the branch's personal remote, returning the
    /// remote used.
    ///
    /// Falls back to [`DEFAULT_REMOTE`] when the branch has none recorded.
    #[instrument(skip_all)]
    pub fn push(&self, refs: &[&str]) -> Result<String> {
        let recorded = self.config(KEY_PERSONAL_REMOTE, ReadScope::Branch)?;
        let remote = if recorded.is_empty() {
            DEFAULT_REMOTE.to_string()
        } else {
            recorded
        };
        info!(remote = %remote, ?refs, "pushing refs");
        let mut argv = vec!["git", "push", "--quiet", remote.as_str()];
        argv.extend(refs);
        run_checked(&self.runner, &argv, &self.workdir)?;
        Ok(remote)
    }

    /// Install a hook from a template file; see [`Git::add_hook_bytes`].
    pub fn add_hook(&self, name: &str, source: &Path, overwrite: bool) -> Result<bool> {
        let contents = fs::read(source)
            .with_context(|| format!("read hook template {}", source.display()))?;
        self.add_hook_bytes(name, &contents, overwrite)
    }

    /// Install a hook into `.git/hooks/<name>`, marked executable.
    ///
    /// Returns `true` when the hook was written. Installation is idempotent:
    /// an existing hook is left untouched unless `overwrite` is set.
    pub fn add_hook_bytes(&self, name: &str, contents: &[u8], overwrite: bool) -> Result<bool> {
        let hooks_dir = self.repository_root()?.join(".git").join("hooks");
        let hook = hooks_dir.join(name);
        if hook.exists() && !overwrite {
            debug!(hook = name, "hook already installed");
            return Ok(false);
        }
        fs::create_dir_all(&hooks_dir)
            .with_context(|| format!("create {}", hooks_dir.display()))?;
        fs::write(&hook, contents).with_context(|| format!("write {}", hook.display()))?;
        mark_executable(&hook)?;
        info!(hook = name, "installed hook");
        Ok(true)
    }

    /// Refuse to proceed when the working tree or index has uncommitted work.
    pub fn verify_clean_working_tree(&self) -> Result<()> {
        let worktree = self
            .runner
            .run(&["git", "diff", "--exit-code"], &self.workdir)?;
        if !worktree.success() {
            bail!("you have uncommitted changes");
        }
        let staged = self
            .runner
            .run(&["git", "diff", "--staged", "--exit-code"], &self.workdir)?;
        if !staged.success() {
            bail!("you have uncommitted staged changes");
        }
        debug!("working tree is clean");
        Ok(())
    }
}

static CURRENT_BRANCH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\* (.+)$").unwrap());

/// Extract the marked-current entry from `git branch` output.
fn current_branch(listing: &str) -> Result<String> {
    let found = CURRENT_BRANCH_RE
        .captures(listing)
        .map(|caps| caps[1].trim().to_string())
        .ok_or_else(|| anyhow!("no branch is currently checked out"))?;
    // Detached HEAD renders as `* (HEAD detached at <sha>)`.
    if found.starts_with('(') {
        bail!("HEAD is detached ({found})");
    }
    Ok(found)
}

#[cfg(unix)]
fn mark_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = fs::metadata(path)
        .with_context(|| format!("stat {}", path.display()))?
        .permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).with_context(|| format!("chmod {}", path.display()))
}

#[cfg(not(unix))]
fn mark_executable(_path: &Path) -> Result<()> {
    Ok(())
}
