//! Workflow settings stored in git config.
//!
//! The tool keeps its settings in git's own config store, next to the
//! provenance it writes: repository topology under `story.*`, tracker
//! credentials under `tracker.*`. All reads go through the inherited scope,
//! so values may live in local or global config.

use anyhow::{Result, bail};

use crate::io::git::{DEFAULT_REMOTE, Git, ReadScope};
use crate::io::runner::CommandRunner;

pub const KEY_BASE_REMOTE: &str = "story.base-remote";
pub const KEY_BASE_BRANCH: &str = "story.base-branch";
pub const KEY_PERSONAL_REMOTE: &str = "story.personal-remote";
pub const KEY_API_TOKEN: &str = "tracker.api-token";
pub const KEY_PROJECT_ID: &str = "tracker.project-id";
pub const KEY_OWNER_NAME: &str = "tracker.owner-name";

/// Root branch used when `story.base-branch` is unset.
pub const DEFAULT_BASE_BRANCH: &str = "master";

/// Repository topology for new story branches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    pub base_remote: String,
    pub base_branch: String,
    pub personal_remote: String,
}

impl Topology {
    /// Load from git config, falling back to the named defaults.
    pub fn load<R: CommandRunner>(git: &Git<R>) -> Result<Self> {
        let base_remote = or_default(
            git.config(KEY_BASE_REMOTE, ReadScope::Inherited)?,
            DEFAULT_REMOTE,
        );
        let base_branch = or_default(
            git.config(KEY_BASE_BRANCH, ReadScope::Inherited)?,
            DEFAULT_BASE_BRANCH,
        );
        let personal_remote = or_default(
            git.config(KEY_PERSONAL_REMOTE, ReadScope::Inherited)?,
            &base_remote,
        );
        Ok(Self {
            base_remote,
            base_branch,
            personal_remote,
        })
    }
}

/// Tracker credentials and identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerSettings {
    pub api_token: String,
    pub project_id: String,
    pub owner_name: String,
}

impl TrackerSettings {
    /// Load from git config; token and project id are required.
    pub fn load<R: CommandRunner>(git: &Git<R>) -> Result<Self> {
        let api_token = git.config(KEY_API_TOKEN, ReadScope::Inherited)?;
        if api_token.is_empty() {
            bail!("{KEY_API_TOKEN} is not set (set it with `git config --global {KEY_API_TOKEN} <token>`)");
        }
        let project_id = git.config(KEY_PROJECT_ID, ReadScope::Inherited)?;
        if project_id.is_empty() {
            bail!("{KEY_PROJECT_ID} is not set (set it with `git config {KEY_PROJECT_ID} <id>`)");
        }
        let mut owner_name = git.config(KEY_OWNER_NAME, ReadScope::Inherited)?;
        if owner_name.is_empty() {
            owner_name = git.config("user.name", ReadScope::Inherited)?;
        }
        if owner_name.is_empty() {
            bail!("{KEY_OWNER_NAME} is not set and user.name is empty");
        }
        Ok(Self {
            api_token,
            project_id,
            owner_name,
        })
    }
}

fn or_default(value: String, default: &str) -> String {
    if value.is_empty() {
        default.to_string()
    } else {
        value
    }
}
