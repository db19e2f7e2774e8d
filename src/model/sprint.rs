//! Sprint model.

use serde::{Deserialize, Serialize};

/// Sprint lifecycle: planned -> active -> completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SprintStatus {
    #[default]
    Planned,
    Active,
    Completed,
}

impl SprintStatus {
    /// Get the string representation for storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }

    /// Parse from string.
    #[must_use]
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "active" => Self::Active,
            "completed" => Self::Completed,
            _ => Self::Planned,
        }
    }
}

/// A time-boxed collection of issues.
///
/// Membership lives on the issue (`issues.sprint_id`); `issue_ids` is
/// filled on read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sprint {
    pub id: String,
    pub project_id: String,
    pub name: String,

    /// Start date (`YYYY-MM-DD`)
    pub start_date: String,

    /// End date (`YYYY-MM-DD`)
    pub end_date: String,

    pub status: SprintStatus,
    pub goal: Option<String>,

    /// Completed story points, recorded when the sprint completes
    pub velocity: Option<i64>,

    /// Planned capacity in story points
    pub capacity: Option<i64>,

    #[serde(default)]
    pub team_members: Vec<String>,

    #[serde(default)]
    pub issue_ids: Vec<String>,

    pub created_at: i64,
    pub updated_at: i64,
    pub started_at: Option<i64>,
    pub completed_at: Option<i64>,
}

impl Sprint {
    /// Create a new planned sprint.
    pub fn new(project_id: String, name: String, start_date: String, end_date: String) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: super::new_id("sprint"),
            project_id,
            name,
            start_date,
            end_date,
            status: SprintStatus::Planned,
            goal: None,
            velocity: None,
            capacity: None,
            team_members: Vec::new(),
            issue_ids: Vec::new(),
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
        }
    }
}

/// Point totals for a sprint's issues.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SprintProgress {
    pub issue_count: usize,
    pub done_count: usize,
    pub committed_points: i64,
    pub completed_points: i64,
}

impl SprintProgress {
    /// Completed share of committed points, as a whole percentage.
    #[must_use]
    pub fn percent(&self) -> i64 {
        super::percent(self.completed_points, self.committed_points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_sprint_is_planned() {
        let sprint = Sprint::new(
            "proj_1".into(),
            "Sprint 1".into(),
            "2025-01-06".into(),
            "2025-01-19".into(),
        );
        assert!(sprint.id.starts_with("sprint_"));
        assert_eq!(sprint.status, SprintStatus::Planned);
        assert!(sprint.velocity.is_none());
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!(SprintStatus::from_str("ACTIVE"), SprintStatus::Active);
        assert_eq!(SprintStatus::from_str("completed"), SprintStatus::Completed);
        assert_eq!(SprintStatus::from_str("whatever"), SprintStatus::Planned);
    }

    #[test]
    fn test_progress_percent() {
        let progress = SprintProgress {
            issue_count: 4,
            done_count: 1,
            committed_points: 13,
            completed_points: 5,
        };
        assert_eq!(progress.percent(), 38);
        assert_eq!(SprintProgress::default().percent(), 0);
    }
}
