//! Side-effecting adapters: process execution, git, the tracker API, settings.

pub mod git;
pub mod runner;
pub mod settings;
pub mod tracker;
