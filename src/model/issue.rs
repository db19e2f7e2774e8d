//! Issue model and the records hanging off an issue.
//!
//! An issue is the unit of tracked work. Comments, time logs, attachments,
//! decision-log entries, links and sub-tasks are stored in their own tables
//! and loaded together for detail views as [`IssueDetails`].

use serde::{Deserialize, Serialize};

/// Issue priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    /// Get the string representation for storage and display.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }

    /// Parse the canonical name (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }

    pub const ALL: [Self; 3] = [Self::High, Self::Medium, Self::Low];
}

/// Issue type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum IssueType {
    Bug,
    Story,
    #[default]
    Task,
}

impl IssueType {
    /// Get the string representation for storage and display.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Bug => "Bug",
            Self::Story => "Story",
            Self::Task => "Task",
        }
    }

    /// Parse the canonical name (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "bug" => Some(Self::Bug),
            "story" => Some(Self::Story),
            "task" => Some(Self::Task),
            _ => None,
        }
    }

    pub const ALL: [Self; 3] = [Self::Bug, Self::Story, Self::Task];
}

/// A tracked work item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    /// Unique identifier (`issue_` + 12 hex chars)
    pub id: String,

    /// Human key, e.g. "MOB-12"
    pub key: String,

    pub project_id: String,

    /// Key of the owning project (joined on read)
    #[serde(default)]
    pub project_key: String,

    pub title: String,
    pub description: Option<String>,

    /// Status name from the project workflow
    pub status: String,

    pub priority: Priority,

    #[serde(rename = "type")]
    pub issue_type: IssueType,

    pub assignee: Option<String>,
    pub reporter: Option<String>,

    /// Due date (`YYYY-MM-DD`)
    pub due_date: Option<String>,

    pub estimated_hours: Option<f64>,

    /// Sum of time log hours
    #[serde(default)]
    pub logged_hours: f64,

    pub story_points: Option<i64>,

    #[serde(default)]
    pub labels: Vec<String>,

    #[serde(default)]
    pub components: Vec<String>,

    pub epic_id: Option<String>,

    /// Key of the linked epic (joined on read)
    #[serde(default)]
    pub epic_key: Option<String>,

    pub sprint_id: Option<String>,

    /// Name of the linked sprint (joined on read)
    #[serde(default)]
    pub sprint_name: Option<String>,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,

    /// Last update timestamp (Unix milliseconds)
    pub updated_at: i64,
}

impl Issue {
    /// Create a new issue in a project with default values.
    ///
    /// The key is assigned by storage from the project counter.
    pub fn new(project_id: String, title: String, status: String) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: new_id("issue"),
            key: String::new(),
            project_id,
            project_key: String::new(),
            title,
            description: None,
            status,
            priority: Priority::default(),
            issue_type: IssueType::default(),
            assignee: None,
            reporter: None,
            due_date: None,
            estimated_hours: None,
            logged_hours: 0.0,
            story_points: None,
            labels: Vec::new(),
            components: Vec::new(),
            epic_id: None,
            epic_key: None,
            sprint_id: None,
            sprint_name: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Story points, treating unestimated as zero.
    #[must_use]
    pub fn points(&self) -> i64 {
        self.story_points.unwrap_or(0)
    }
}

/// Generate a prefixed identifier (`<prefix>_` + 12 hex chars).
#[must_use]
pub fn new_id(prefix: &str) -> String {
    format!("{prefix}_{}", &uuid::Uuid::new_v4().simple().to_string()[..12])
}

/// A comment on an issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub issue_id: String,
    pub author: String,
    pub content: String,
    pub created_at: i64,
    pub edited: bool,
    pub edited_at: Option<i64>,
    pub edited_by: Option<String>,
}

/// Categories for logged work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TimeCategory {
    #[default]
    Development,
    Testing,
    Design,
    Research,
    Meeting,
    Documentation,
    Other,
}

impl TimeCategory {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Testing => "testing",
            Self::Design => "design",
            Self::Research => "research",
            Self::Meeting => "meeting",
            Self::Documentation => "documentation",
            Self::Other => "other",
        }
    }

    #[must_use]
    pub fn from_str(s: &str) -> Self {
        match s {
            "testing" => Self::Testing,
            "design" => Self::Design,
            "research" => Self::Research,
            "meeting" => Self::Meeting,
            "documentation" => Self::Documentation,
            "other" => Self::Other,
            _ => Self::Development,
        }
    }
}

/// A time log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeLog {
    pub id: String,
    pub issue_id: String,
    pub author: String,
    pub hours: f64,
    pub description: Option<String>,
    pub category: TimeCategory,
    /// Day the work happened (`YYYY-MM-DD`)
    pub work_date: String,
    pub created_at: i64,
}

/// File or link attached to an issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    pub issue_id: String,
    pub name: String,
    /// Human-readable size, e.g. "2.3 MB"
    pub size: Option<String>,
    pub size_bytes: Option<i64>,
    pub file_type: Option<String>,
    /// File path or URL
    pub location: String,
    /// SHA-256 of the file contents (local files only)
    pub checksum: Option<String>,
    pub description: Option<String>,
    pub uploaded_by: String,
    pub uploaded_at: i64,
}

/// Entry in an issue's decision log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub id: String,
    pub issue_id: String,
    pub entry: String,
    pub author: String,
    pub created_at: i64,
}

/// Relationship kinds between two issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum LinkType {
    Blocks,
    IsBlockedBy,
    Duplicates,
    IsDuplicatedBy,
    RelatesTo,
    ParentOf,
    ChildOf,
}

impl LinkType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Blocks => "blocks",
            Self::IsBlockedBy => "is-blocked-by",
            Self::Duplicates => "duplicates",
            Self::IsDuplicatedBy => "is-duplicated-by",
            Self::RelatesTo => "relates-to",
            Self::ParentOf => "parent-of",
            Self::ChildOf => "child-of",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "blocks" => Some(Self::Blocks),
            "is-blocked-by" => Some(Self::IsBlockedBy),
            "duplicates" => Some(Self::Duplicates),
            "is-duplicated-by" => Some(Self::IsDuplicatedBy),
            "relates-to" => Some(Self::RelatesTo),
            "parent-of" => Some(Self::ParentOf),
            "child-of" => Some(Self::ChildOf),
            _ => None,
        }
    }

    /// The same relationship seen from the target issue.
    #[must_use]
    pub const fn inverse(&self) -> Self {
        match self {
            Self::Blocks => Self::IsBlockedBy,
            Self::IsBlockedBy => Self::Blocks,
            Self::Duplicates => Self::IsDuplicatedBy,
            Self::IsDuplicatedBy => Self::Duplicates,
            Self::RelatesTo => Self::RelatesTo,
            Self::ParentOf => Self::ChildOf,
            Self::ChildOf => Self::ParentOf,
        }
    }
}

/// Directed link between two issues.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueLink {
    pub id: String,
    pub source_issue_id: String,
    pub target_issue_id: String,
    pub link_type: LinkType,
    pub created_by: String,
    pub created_at: i64,
}

/// A link as seen from one issue, with the other side's key resolved.
#[derive(Debug, Clone, Serialize)]
pub struct LinkView {
    pub id: String,
    pub link_type: LinkType,
    pub other_key: String,
    pub other_title: String,
    /// True when the viewed issue is the link target
    pub incoming: bool,
}

/// Sub-task statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SubTaskStatus {
    #[default]
    #[serde(rename = "To Do")]
    ToDo,
    #[serde(rename = "In Progress")]
    InProgress,
    Done,
}

impl SubTaskStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ToDo => "To Do",
            Self::InProgress => "In Progress",
            Self::Done => "Done",
        }
    }

    #[must_use]
    pub fn from_str(s: &str) -> Self {
        match s {
            "In Progress" => Self::InProgress,
            "Done" => Self::Done,
            _ => Self::ToDo,
        }
    }
}

/// Checklist item under an issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubTask {
    pub id: String,
    pub parent_issue_id: String,
    pub title: String,
    pub status: SubTaskStatus,
    pub completed: bool,
    pub assignee: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// An issue with everything attached to it.
#[derive(Debug, Clone, Serialize)]
pub struct IssueDetails {
    #[serde(flatten)]
    pub issue: Issue,
    pub comments: Vec<Comment>,
    pub time_logs: Vec<TimeLog>,
    pub attachments: Vec<Attachment>,
    pub decision_log: Vec<Decision>,
    pub links: Vec<LinkView>,
    pub subtasks: Vec<SubTask>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_issue_defaults() {
        let issue = Issue::new("proj_1".into(), "Fix login".into(), "To Do".into());
        assert!(issue.id.starts_with("issue_"));
        assert_eq!(issue.priority, Priority::Medium);
        assert_eq!(issue.issue_type, IssueType::Task);
        assert!(issue.labels.is_empty());
        assert!((issue.logged_hours - 0.0).abs() < f64::EPSILON);
        assert_eq!(issue.created_at, issue.updated_at);
    }

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::High > Priority::Medium);
        assert!(Priority::Medium > Priority::Low);
    }

    #[test]
    fn test_link_inverse_round_trips() {
        for link in [
            LinkType::Blocks,
            LinkType::Duplicates,
            LinkType::RelatesTo,
            LinkType::ParentOf,
        ] {
            assert_eq!(link.inverse().inverse(), link);
        }
        assert_eq!(LinkType::Blocks.inverse(), LinkType::IsBlockedBy);
        assert_eq!(LinkType::RelatesTo.inverse(), LinkType::RelatesTo);
    }

    #[test]
    fn test_link_type_parse() {
        assert_eq!(LinkType::parse("is-blocked-by"), Some(LinkType::IsBlockedBy));
        assert_eq!(LinkType::parse("blocked"), None);
    }

    #[test]
    fn test_subtask_status_strings() {
        assert_eq!(SubTaskStatus::from_str("In Progress"), SubTaskStatus::InProgress);
        assert_eq!(SubTaskStatus::from_str("garbage"), SubTaskStatus::ToDo);
        assert_eq!(SubTaskStatus::Done.as_str(), "Done");
    }
}
