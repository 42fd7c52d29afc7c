//! Story types shared across the workflow.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Sentinel estimate for stories that have not been estimated yet.
const UNESTIMATED: i64 = -1;

/// Lifecycle state of a tracker story.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoryState {
    Unscheduled,
    Unstarted,
    Started,
    Finished,
    Delivered,
    Accepted,
    Rejected,
}

impl fmt::Display for StoryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unscheduled => "unscheduled",
            Self::Unstarted => "unstarted",
            Self::Started => "started",
            Self::Finished => "finished",
            Self::Delivered => "delivered",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        };
        f.write_str(name)
    }
}

/// A story as exchanged with the tracker API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    pub id: u64,
    pub name: String,
    /// Absent for story types that are never estimated (bugs, chores).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimate: Option<i64>,
    pub current_state: StoryState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owned_by: Option<String>,
}

impl Story {
    /// A story can be started unless it still carries the unestimated sentinel.
    pub fn is_startable(&self) -> bool {
        self.estimate != Some(UNESTIMATED)
    }

    /// One-line summary for command output.
    pub fn summary(&self) -> String {
        let estimate = match self.estimate {
            Some(points) if points >= 0 => format!("{points} pts"),
            _ => "unestimated".to_string(),
        };
        format!("#{} [{}] {}", self.id, estimate, self.name)
    }
}
