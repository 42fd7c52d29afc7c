//! Orchestration for publishing a story branch.

use anyhow::Result;

use crate::io::git::Git;
use crate::io::runner::CommandRunner;

/// What `push` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushOutcome {
    /// Remote the refs were pushed to.
    pub remote: String,
    /// Refs that were pushed.
    pub refs: Vec<String>,
}

/// Push `refs` (default: the current branch) to the personal remote.
pub fn push_branch<R: CommandRunner>(git: &Git<R>, refs: &[String]) -> Result<PushOutcome> {
    let refs: Vec<String> = if refs.is_empty() {
        vec![git.branch_name()?]
    } else {
        refs.to_vec()
    };
    let ref_strs: Vec<&str> = refs.iter().map(String::as_str).collect();
    let remote = git.push(&ref_strs)?;
    Ok(PushOutcome { remote, refs })
}
