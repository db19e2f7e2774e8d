//! Idea board model.
//!
//! Ideas are proposals kept apart from issues. Anyone can upvote or
//! comment; endorsing adds the actor to `promoted_by`, and promoting an
//! idea marks it `promoted` and may spawn a Story issue.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum IdeaCategory {
    #[default]
    Feature,
    Improvement,
    Bug,
    Innovation,
}

impl IdeaCategory {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Feature => "feature",
            Self::Improvement => "improvement",
            Self::Bug => "bug",
            Self::Innovation => "innovation",
        }
    }

    #[must_use]
    pub fn from_str(s: &str) -> Self {
        match s {
            "improvement" => Self::Improvement,
            "bug" => Self::Bug,
            "innovation" => Self::Innovation,
            _ => Self::Feature,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Impact {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    #[must_use]
    pub fn from_str(s: &str) -> Self {
        match s {
            "low" => Self::Low,
            "high" => Self::High,
            "critical" => Self::Critical,
            _ => Self::Medium,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum IdeaStatus {
    #[default]
    Submitted,
    UnderReview,
    Approved,
    Rejected,
    Implemented,
    Promoted,
}

impl IdeaStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::UnderReview => "under-review",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Implemented => "implemented",
            Self::Promoted => "promoted",
        }
    }

    #[must_use]
    pub fn from_str(s: &str) -> Self {
        match s {
            "under-review" => Self::UnderReview,
            "approved" => Self::Approved,
            "rejected" => Self::Rejected,
            "implemented" => Self::Implemented,
            "promoted" => Self::Promoted,
            _ => Self::Submitted,
        }
    }
}

/// A proposal on the idea board.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Idea {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub category: IdeaCategory,
    #[serde(default)]
    pub tags: Vec<String>,
    pub impact: Impact,
    pub status: IdeaStatus,
    pub upvotes: i64,
    pub author: String,
    pub organization_id: Option<String>,
    /// Emails of everyone endorsing promotion
    #[serde(default)]
    pub promoted_by: Vec<String>,
    /// Issue created when the idea was promoted
    pub promoted_issue_id: Option<String>,
    #[serde(default)]
    pub comments: Vec<IdeaComment>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Idea {
    pub fn new(title: String, author: String) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: super::new_id("idea"),
            title,
            description: None,
            category: IdeaCategory::default(),
            tags: Vec::new(),
            impact: Impact::default(),
            status: IdeaStatus::default(),
            upvotes: 0,
            author,
            organization_id: None,
            promoted_by: Vec::new(),
            promoted_issue_id: None,
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdeaComment {
    pub id: String,
    pub idea_id: String,
    pub author: String,
    pub content: String,
    pub created_at: i64,
    pub edited_at: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_idea_defaults() {
        let idea = Idea::new("Dark mode".into(), "alex@example.com".into());
        assert_eq!(idea.category, IdeaCategory::Feature);
        assert_eq!(idea.impact, Impact::Medium);
        assert_eq!(idea.status, IdeaStatus::Submitted);
        assert_eq!(idea.upvotes, 0);
        assert!(idea.tags.is_empty());
        assert!(idea.promoted_by.is_empty());
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(IdeaStatus::UnderReview.as_str(), "under-review");
        assert_eq!(IdeaStatus::from_str("promoted"), IdeaStatus::Promoted);
    }
}
