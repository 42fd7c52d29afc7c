//! Branch naming for story branches.

use anyhow::{Result, anyhow};

/// Derive the development branch name for a story: `<id>-<slug>`.
///
/// The slug comes from the story name, or from `suffix` when the user asked
/// for an explicit name; either way the story id stays the prefix, since the
/// commit-message hook and config namespacing key off it.
pub fn story_branch_name(story_id: u64, title: &str, suffix: Option<&str>) -> Result<String> {
    let slug = slugify(suffix.unwrap_or(title));
    if slug.is_empty() {
        return Err(anyhow!("branch name for story {story_id} would be empty"));
    }
    Ok(format!("{story_id}-{slug}"))
}

/// Replace non-alphanumerics with `-`, collapsing runs.
fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.trim().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}
