//! Data models for PlanUp.
//!
//! This module contains all domain models:
//! - Project
//! - Issue (with comments, time logs, attachments, decisions, links, sub-tasks)
//! - Sprint
//! - Epic
//! - Organization, Member, Invite
//! - Idea
//! - Retrospective feedback
//! - Template, SavedFilter, settings

pub mod epic;
pub mod filter;
pub mod idea;
pub mod issue;
pub mod org;
pub mod project;
pub mod retro;
pub mod settings;
pub mod sprint;
pub mod template;

pub use epic::{Epic, EPIC_STATUSES};
pub use filter::SavedFilter;
pub use idea::{Idea, IdeaCategory, IdeaComment, IdeaStatus, Impact};
pub use issue::{
    new_id, Attachment, Comment, Decision, Issue, IssueDetails, IssueLink, IssueType, LinkType,
    LinkView, Priority, SubTask, SubTaskStatus, TimeCategory, TimeLog,
};
pub use org::{Invite, InviteStatus, Member, MemberRole, Organization};
pub use project::Project;
pub use retro::{Feedback, FeedbackType};
pub use settings::{SettingKey, Theme};
pub use sprint::{Sprint, SprintProgress, SprintStatus};
pub use template::Template;

/// Whole-number percentage `round(part / total * 100)`, 0 when total is 0.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn percent(part: i64, total: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    ((part as f64 / total as f64) * 100.0).round() as i64
}
