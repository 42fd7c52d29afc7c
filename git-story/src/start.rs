//! Orchestration for starting a story.
//!
//! Starting a story: guard the working tree, create the story branch with
//! provenance, record the story id, install the commit-message hook, and mark
//! the story started on the tracker. Each step is a single call into `io`;
//! sequencing lives here, not in the adapters.

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

use crate::core::branch::story_branch_name;
use crate::core::story::{Story, StoryState};
use crate::io::git::{Git, KEY_STORY_ID, WriteScope};
use crate::io::runner::CommandRunner;
use crate::io::settings::Topology;
use crate::io::tracker::Tracker;

/// Name of the hook that stamps commit messages with the story id.
pub const COMMIT_MSG_HOOK: &str = "prepare-commit-msg";

/// Template for the commit-message hook, shipped with the binary.
pub const COMMIT_MSG_HOOK_TEMPLATE: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../hooks/prepare-commit-msg.sh"
));

/// What `start` did.
#[derive(Debug, Clone, PartialEq)]
pub enum StartOutcome {
    /// A story was started on the named branch.
    Started { story: Story, branch: String },
    /// No id was given; candidate stories were listed instead.
    Listed(Vec<Story>),
}

/// Options for the start command.
#[derive(Debug, Clone, Default)]
pub struct StartOptions {
    /// Story id, or a story type used to filter the candidate listing.
    pub story: Option<String>,
    /// Replaces the story-name slug in the branch name.
    pub branch_suffix: Option<String>,
}

/// Start a story, or list startable candidates when no id was given.
pub fn start_story<R: CommandRunner, T: Tracker>(
    git: &Git<R>,
    tracker: &T,
    owner: &str,
    topology: &Topology,
    options: &StartOptions,
) -> Result<StartOutcome> {
    git.verify_clean_working_tree()?;

    let story_id = match parse_story_argument(options.story.as_deref()) {
        StoryArgument::Id(id) => id,
        StoryArgument::TypeFilter(filter) => {
            let candidates = tracker.candidates(filter.as_deref())?;
            return Ok(StartOutcome::Listed(candidates));
        }
    };

    let story = tracker.story(story_id).context("fetch story")?;
    if !story.is_startable() {
        bail!("story #{} is not in a startable state (estimate it first)", story.id);
    }

    let branch = story_branch_name(story.id, &story.name, options.branch_suffix.as_deref())?;
    debug!(branch = %branch, "derived branch name");

    git.create_branch(
        &topology.base_remote,
        &topology.base_branch,
        &topology.personal_remote,
        &branch,
    )?;
    git.set_config(KEY_STORY_ID, &story.id.to_string(), WriteScope::Branch)?;
    git.add_hook_bytes(COMMIT_MSG_HOOK, COMMIT_MSG_HOOK_TEMPLATE.as_bytes(), false)?;

    tracker
        .update_story(story.id, StoryState::Started, owner)
        .context("start story on tracker")?;

    info!(story = story.id, branch = %branch, "story started");
    Ok(StartOutcome::Started { story, branch })
}

enum StoryArgument {
    Id(u64),
    TypeFilter(Option<String>),
}

/// A numeric argument is a story id; anything else filters the listing.
fn parse_story_argument(arg: Option<&str>) -> StoryArgument {
    match arg {
        Some(raw) => match raw.parse::<u64>() {
            Ok(id) => StoryArgument::Id(id),
            Err(_) => StoryArgument::TypeFilter(Some(raw.to_string())),
        },
        None => StoryArgument::TypeFilter(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::runner::Capture;
    use crate::test_support::{ScriptedRunner, ScriptedTracker, TestRepo, story};

    fn topology() -> Topology {
        Topology {
            base_remote: "origin".to_string(),
            base_branch: "main".to_string(),
            personal_remote: "mine".to_string(),
        }
    }

    fn options(story: &str) -> StartOptions {
        StartOptions {
            story: Some(story.to_string()),
            branch_suffix: None,
        }
    }

    #[test]
    fn start_creates_branch_hook_and_marks_started() {
        let repo = TestRepo::new().expect("repo");
        let runner = ScriptedRunner::new();
        runner.stub(&["git", "branch"], Capture::ok("* 42-add-weather-feed\n"));
        let git = Git::new(runner.clone(), repo.root());
        let tracker = ScriptedTracker::with_stories(vec![story(42, "add weather feed", Some(2))]);

        let outcome = start_story(&git, &tracker, "Dev One", &topology(), &options("42"))
            .expect("start");

        match outcome {
            StartOutcome::Started { story, branch } => {
                assert_eq!(story.id, 42);
                assert_eq!(branch, "42-add-weather-feed");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }

        let calls = runner.calls();
        assert!(calls.contains(&"git fetch origin".to_string()));
        assert!(calls.contains(&"git checkout origin/main".to_string()));
        assert!(calls.contains(&"git checkout -b 42-add-weather-feed".to_string()));
        assert!(calls.contains(
            &"git config --local branch.42-add-weather-feed.story-id 42".to_string()
        ));

        let hook = repo.root().join(".git/hooks").join(COMMIT_MSG_HOOK);
        assert_eq!(
            std::fs::read_to_string(hook).expect("read hook"),
            COMMIT_MSG_HOOK_TEMPLATE
        );

        assert_eq!(
            tracker.updates(),
            vec![(42, StoryState::Started, "Dev One".to_string())]
        );
    }

    #[test]
    fn start_without_id_lists_candidates_and_changes_nothing() {
        let repo = TestRepo::new().expect("repo");
        let runner = ScriptedRunner::new();
        let git = Git::new(runner.clone(), repo.root());
        let tracker = ScriptedTracker::with_stories(vec![
            story(1, "first", Some(1)),
            story(2, "second", None),
        ]);

        let outcome = start_story(
            &git,
            &tracker,
            "Dev One",
            &topology(),
            &StartOptions::default(),
        )
        .expect("list");

        match outcome {
            StartOutcome::Listed(stories) => assert_eq!(stories.len(), 2),
            other => panic!("unexpected outcome: {other:?}"),
        }

        // Only the clean-tree probes ran; no branch was created, no story
        // state changed, no hook was installed.
        assert_eq!(
            runner.calls(),
            vec!["git diff --exit-code", "git diff --staged --exit-code"]
        );
        assert!(tracker.updates().is_empty());
        assert!(!repo.root().join(".git/hooks").join(COMMIT_MSG_HOOK).exists());
    }

    #[test]
    fn start_refuses_unestimated_story() {
        let repo = TestRepo::new().expect("repo");
        let runner = ScriptedRunner::new();
        let git = Git::new(runner.clone(), repo.root());
        let tracker = ScriptedTracker::with_stories(vec![story(9, "someday", Some(-1))]);

        let err = start_story(&git, &tracker, "Dev One", &topology(), &options("9")).unwrap_err();
        assert!(err.to_string().contains("not in a startable state"));
        assert!(!runner.calls().contains(&"git fetch origin".to_string()));
        assert!(tracker.updates().is_empty());
    }

    #[test]
    fn start_refuses_dirty_working_tree() {
        let repo = TestRepo::new().expect("repo");
        let runner = ScriptedRunner::new();
        runner.stub(&["git", "diff", "--exit-code"], Capture::exit(1, "diff"));
        let git = Git::new(runner.clone(), repo.root());
        let tracker = ScriptedTracker::with_stories(vec![story(42, "add weather feed", Some(2))]);

        let err = start_story(&git, &tracker, "Dev One", &topology(), &options("42")).unwrap_err();
        assert!(err.to_string().contains("uncommitted changes"));
        assert!(tracker.updates().is_empty());
    }

    #[test]
    fn branch_suffix_overrides_story_name() {
        let repo = TestRepo::new().expect("repo");
        let runner = ScriptedRunner::new();
        runner.stub(&["git", "branch"], Capture::ok("* 42-spike\n"));
        let git = Git::new(runner.clone(), repo.root());
        let tracker = ScriptedTracker::with_stories(vec![story(42, "add weather feed", Some(2))]);

        let outcome = start_story(
            &git,
            &tracker,
            "Dev One",
            &topology(),
            &StartOptions {
                story: Some("42".to_string()),
                branch_suffix: Some("spike".to_string()),
            },
        )
        .expect("start");

        match outcome {
            StartOutcome::Started { branch, .. } => assert_eq!(branch, "42-spike"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
