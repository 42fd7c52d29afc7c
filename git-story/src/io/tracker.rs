//! Tracker service client.
//!
//! The [`Tracker`] trait decouples the workflow from the HTTP service so
//! commands can be tested with scripted trackers that never touch the
//! network. [`HttpTracker`] talks to the tracker's JSON API synchronously,
//! one blocking request at a time.

use anyhow::{Context, Result, anyhow};
use serde_json::json;
use tracing::{debug, info};

use crate::core::story::{Story, StoryState};

/// Default API endpoint for the hosted tracker.
pub const DEFAULT_API_BASE: &str = "https://www.pivotaltracker.com/services/v5";

/// How many candidate stories to list when no id is given.
pub const CANDIDATE_LIMIT: usize = 5;

/// Read/update operations on the story service.
pub trait Tracker {
    /// Fetch a single story by id.
    fn story(&self, id: u64) -> Result<Story>;

    /// List startable candidate stories, optionally filtered by story type.
    fn candidates(&self, story_type: Option<&str>) -> Result<Vec<Story>>;

    /// Move a story to `state` and assign it to `owned_by`.
    fn update_story(&self, id: u64, state: StoryState, owned_by: &str) -> Result<()>;
}

/// Tracker client over the JSON API.
#[derive(Debug, Clone)]
pub struct HttpTracker {
    api_base: String,
    token: String,
    project_id: String,
}

impl HttpTracker {
    pub fn new(token: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            token: token.into(),
            project_id: project_id.into(),
        }
    }

    /// Override the API endpoint (used against test servers).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/projects/{}/{path}", self.api_base, self.project_id)
    }

    fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<serde_json::Value> {
        let url = self.endpoint(path);
        debug!(%url, "tracker GET");
        let mut request = ureq::get(&url).set("X-TrackerToken", &self.token);
        for (name, value) in query {
            request = request.query(name, value);
        }
        let response = request.call().map_err(status_error)?;
        response.into_json().context("parse tracker response")
    }

    fn put(&self, path: &str, body: serde_json::Value) -> Result<serde_json::Value> {
        let url = self.endpoint(path);
        debug!(%url, "tracker PUT");
        let response = ureq::put(&url)
            .set("X-TrackerToken", &self.token)
            .send_json(body)
            .map_err(status_error)?;
        response.into_json().context("parse tracker response")
    }
}

/// Surface HTTP status failures with the response body.
fn status_error(err: ureq::Error) -> anyhow::Error {
    match err {
        ureq::Error::Status(code, response) => {
            let body = response.into_string().unwrap_or_default();
            anyhow!("tracker returned {code}: {}", body.trim())
        }
        other => anyhow!(other),
    }
}

impl Tracker for HttpTracker {
    fn story(&self, id: u64) -> Result<Story> {
        let value = self.get(&format!("stories/{id}"), &[])?;
        serde_json::from_value(value).context("parse story")
    }

    fn candidates(&self, story_type: Option<&str>) -> Result<Vec<Story>> {
        let mut filter = "state:unstarted,unscheduled".to_string();
        if let Some(kind) = story_type {
            filter.push_str(&format!(" type:{kind}"));
        }
        let limit = CANDIDATE_LIMIT.to_string();
        let value = self.get("stories", &[("filter", &filter), ("limit", &limit)])?;
        serde_json::from_value(value).context("parse story list")
    }

    fn update_story(&self, id: u64, state: StoryState, owned_by: &str) -> Result<()> {
        info!(story = id, state = %state, "updating story on tracker");
        self.put(
            &format!("stories/{id}"),
            json!({ "current_state": state, "owned_by": owned_by }),
        )?;
        Ok(())
    }
}
