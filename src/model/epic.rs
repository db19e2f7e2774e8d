//! Epic model.
//!
//! Epics group issues under a larger initiative. Their story point totals
//! are derived from member issues rather than stored.

use serde::{Deserialize, Serialize};

/// Statuses an epic moves through.
pub const EPIC_STATUSES: [&str; 3] = ["To Do", "In Progress", "Done"];

/// A grouping of related issues.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Epic {
    pub id: String,

    /// Key like "MOB-EPIC-2"
    pub key: String,

    pub project_id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub assignee: Option<String>,

    /// Sum of member issue story points (computed on read)
    #[serde(default)]
    pub story_points: i64,

    /// Story points of member issues in a done status (computed on read)
    #[serde(default)]
    pub completed_story_points: i64,

    #[serde(default)]
    pub issue_ids: Vec<String>,

    pub created_at: i64,
    pub updated_at: i64,
}

impl Epic {
    pub fn new(project_id: String, title: String) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: super::new_id("epic"),
            key: String::new(),
            project_id,
            title,
            description: None,
            status: EPIC_STATUSES[0].to_string(),
            assignee: None,
            story_points: 0,
            completed_story_points: 0,
            issue_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Completion as `round(completed / total * 100)`, 0 when nothing is estimated.
    #[must_use]
    pub fn progress(&self) -> i64 {
        super::percent(self.completed_story_points, self.story_points)
    }
}

/// Match an epic status case-insensitively, returning the canonical name.
#[must_use]
pub fn normalize_epic_status(input: &str) -> Option<&'static str> {
    let wanted = crate::workflow::status_slug(input);
    EPIC_STATUSES
        .into_iter()
        .find(|s| crate::workflow::status_slug(s) == wanted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_rounds() {
        let mut epic = Epic::new("proj_1".into(), "Auth".into());
        epic.story_points = 21;
        epic.completed_story_points = 8;
        assert_eq!(epic.progress(), 38);
    }

    #[test]
    fn test_progress_zero_when_no_points() {
        let epic = Epic::new("proj_1".into(), "Empty".into());
        assert_eq!(epic.progress(), 0);
    }

    #[test]
    fn test_normalize_epic_status() {
        assert_eq!(normalize_epic_status("in_progress"), Some("In Progress"));
        assert_eq!(normalize_epic_status("DONE"), Some("Done"));
        assert_eq!(normalize_epic_status("blocked"), None);
    }
}
