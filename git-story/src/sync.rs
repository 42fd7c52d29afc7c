//! Orchestration for syncing a story branch with its root.

use anyhow::Result;

use crate::io::git::Git;
use crate::io::runner::CommandRunner;

/// Pull the recorded root remote/branch into the current branch.
///
/// Refuses to run with uncommitted work, which the merge could clobber.
pub fn sync_branch<R: CommandRunner>(git: &Git<R>) -> Result<()> {
    git.verify_clean_working_tree()?;
    git.update_from_root()
}
