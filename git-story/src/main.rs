//! `git-story`: start remote-tracker stories as git feature branches.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use git_story::io::git::Git;
use git_story::io::runner::ProcessRunner;
use git_story::io::settings::{Topology, TrackerSettings};
use git_story::io::tracker::HttpTracker;
use git_story::logging;
use git_story::push::push_branch;
use git_story::start::{
    COMMIT_MSG_HOOK, COMMIT_MSG_HOOK_TEMPLATE, StartOptions, StartOutcome, start_story,
};
use git_story::sync::sync_branch;

#[derive(Parser)]
#[command(
    name = "git-story",
    version,
    about = "Start tracker stories as git feature branches"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start a story: create its branch, install the hook, mark it started.
    ///
    /// Without a story id, lists startable candidates and changes nothing.
    Start {
        /// Story id, or a story type (feature, bug, chore) to filter the listing.
        story: Option<String>,
        /// Use this suffix instead of the story name for the branch.
        #[arg(long)]
        branch: Option<String>,
    },
    /// Pull the branch's recorded root remote/branch into the current branch.
    Sync,
    /// Push refs (default: the current branch) to the personal remote.
    Push {
        /// Explicit refs to push.
        refs: Vec<String>,
    },
    /// Install the commit-message hook.
    Hook {
        /// Copy the hook from this file instead of the built-in template.
        #[arg(long)]
        source: Option<PathBuf>,
        /// Overwrite an existing hook.
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    logging::init();
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let workdir = env::current_dir().context("resolve working directory")?;
    let git = Git::new(ProcessRunner, workdir);

    // Every command operates on the enclosing repository; fail fast outside one.
    git.repository_root()?;

    match cli.command {
        Command::Start { story, branch } => cmd_start(&git, story, branch),
        Command::Sync => {
            sync_branch(&git)?;
            println!("Synced with root branch");
            Ok(())
        }
        Command::Push { refs } => {
            let outcome = push_branch(&git, &refs)?;
            println!("Pushed {} to {}", outcome.refs.join(" "), outcome.remote);
            Ok(())
        }
        Command::Hook { source, force } => cmd_hook(&git, source, force),
    }
}

fn cmd_start(
    git: &Git<ProcessRunner>,
    story: Option<String>,
    branch: Option<String>,
) -> Result<()> {
    let settings = TrackerSettings::load(git)?;
    let topology = Topology::load(git)?;
    let tracker = HttpTracker::new(settings.api_token.clone(), settings.project_id.clone());
    let options = StartOptions {
        story,
        branch_suffix: branch,
    };

    match start_story(git, &tracker, &settings.owner_name, &topology, &options)? {
        StartOutcome::Started { story, branch } => {
            println!("{}", story.summary());
            println!("Created branch {branch} and started story #{}", story.id);
        }
        StartOutcome::Listed(stories) => {
            if stories.is_empty() {
                println!("No startable stories found");
            } else {
                println!("Startable stories (re-run with an id):");
                for story in stories {
                    println!("  {}", story.summary());
                }
            }
        }
    }
    Ok(())
}

fn cmd_hook(git: &Git<ProcessRunner>, source: Option<PathBuf>, force: bool) -> Result<()> {
    let installed = match source {
        Some(path) => git.add_hook(COMMIT_MSG_HOOK, &path, force)?,
        None => git.add_hook_bytes(COMMIT_MSG_HOOK, COMMIT_MSG_HOOK_TEMPLATE.as_bytes(), force)?,
    };
    if installed {
        println!("Installed {COMMIT_MSG_HOOK} hook");
    } else {
        println!("{COMMIT_MSG_HOOK} hook already installed");
    }
    Ok(())
}
