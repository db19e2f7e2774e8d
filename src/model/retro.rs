//! Retrospective feedback.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FeedbackType {
    WentWell,
    ToImprove,
    ActionItem,
}

impl FeedbackType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::WentWell => "went-well",
            Self::ToImprove => "to-improve",
            Self::ActionItem => "action-item",
        }
    }

    #[must_use]
    pub fn from_str(s: &str) -> Self {
        match s {
            "went-well" => Self::WentWell,
            "action-item" => Self::ActionItem,
            _ => Self::ToImprove,
        }
    }

    /// Section heading used when grouping feedback.
    #[must_use]
    pub const fn heading(&self) -> &'static str {
        match self {
            Self::WentWell => "Went Well",
            Self::ToImprove => "To Improve",
            Self::ActionItem => "Action Items",
        }
    }

    pub const ALL: [Self; 3] = [Self::WentWell, Self::ToImprove, Self::ActionItem];
}

/// One card on a retrospective board.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub id: String,
    pub project_id: String,
    pub sprint_id: Option<String>,
    #[serde(rename = "type")]
    pub feedback_type: FeedbackType,
    pub text: String,
    pub author: String,
    pub resolved: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Feedback {
    pub fn new(project_id: String, feedback_type: FeedbackType, text: String, author: String) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: super::new_id("retro"),
            project_id,
            sprint_id: None,
            feedback_type,
            text,
            author,
            resolved: false,
            created_at: now,
            updated_at: now,
        }
    }
}
