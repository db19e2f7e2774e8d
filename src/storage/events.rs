//! Audit event storage and retrieval.
//!
//! Events track all mutations in the database. They double as the
//! activity feed shown by `pu activity`.

use rusqlite::{Connection, Result};
use serde::Serialize;

/// Event types for audit logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    // Project events
    ProjectCreated,
    ProjectUpdated,
    ProjectDeleted,

    // Issue events
    IssueCreated,
    IssueUpdated,
    IssueDeleted,
    StatusChanged,
    IssueTransitioned,
    IssueAssigned,
    CommentAdded,
    CommentEdited,
    CommentDeleted,
    TimeLogged,
    TimeLogDeleted,
    AttachmentAdded,
    AttachmentRemoved,
    DecisionLogged,
    LinkAdded,
    LinkRemoved,
    SubtaskAdded,
    SubtaskUpdated,
    SubtaskDeleted,

    // Sprint events
    SprintCreated,
    SprintUpdated,
    SprintStarted,
    SprintCompleted,
    SprintDeleted,
    SprintIssueAdded,
    SprintIssueRemoved,

    // Epic events
    EpicCreated,
    EpicUpdated,
    EpicDeleted,
    EpicIssueAdded,
    EpicIssueRemoved,

    // Organization events
    OrgCreated,
    MemberJoined,
    MemberLeft,
    InviteSent,
    InviteAccepted,
    InviteDeclined,
    InviteCancelled,

    // Idea events
    IdeaCreated,
    IdeaUpdated,
    IdeaUpvoted,
    IdeaCommented,
    IdeaEndorsed,
    IdeaPromoted,
    IdeaDeleted,

    // Retrospective events
    FeedbackAdded,
    FeedbackUpdated,
    FeedbackResolved,
    FeedbackReopened,
    FeedbackDeleted,

    // Configuration events
    WorkflowCreated,
    WorkflowDeleted,
    WorkflowSelected,
    FilterSaved,
    FilterDeleted,
    TemplateCreated,
    TemplateDeleted,
    SettingChanged,

    // Sync events
    RecordImported,
}

impl EventType {
    /// Every event type, for reverse lookup.
    pub const ALL: [Self; 62] = [
        Self::ProjectCreated,
        Self::ProjectUpdated,
        Self::ProjectDeleted,
        Self::IssueCreated,
        Self::IssueUpdated,
        Self::IssueDeleted,
        Self::StatusChanged,
        Self::IssueTransitioned,
        Self::IssueAssigned,
        Self::CommentAdded,
        Self::CommentEdited,
        Self::CommentDeleted,
        Self::TimeLogged,
        Self::TimeLogDeleted,
        Self::AttachmentAdded,
        Self::AttachmentRemoved,
        Self::DecisionLogged,
        Self::LinkAdded,
        Self::LinkRemoved,
        Self::SubtaskAdded,
        Self::SubtaskUpdated,
        Self::SubtaskDeleted,
        Self::SprintCreated,
        Self::SprintUpdated,
        Self::SprintStarted,
        Self::SprintCompleted,
        Self::SprintDeleted,
        Self::SprintIssueAdded,
        Self::SprintIssueRemoved,
        Self::EpicCreated,
        Self::EpicUpdated,
        Self::EpicDeleted,
        Self::EpicIssueAdded,
        Self::EpicIssueRemoved,
        Self::OrgCreated,
        Self::MemberJoined,
        Self::MemberLeft,
        Self::InviteSent,
        Self::InviteAccepted,
        Self::InviteDeclined,
        Self::InviteCancelled,
        Self::IdeaCreated,
        Self::IdeaUpdated,
        Self::IdeaUpvoted,
        Self::IdeaCommented,
        Self::IdeaEndorsed,
        Self::IdeaPromoted,
        Self::IdeaDeleted,
        Self::FeedbackAdded,
        Self::FeedbackUpdated,
        Self::FeedbackResolved,
        Self::FeedbackReopened,
        Self::FeedbackDeleted,
        Self::WorkflowCreated,
        Self::WorkflowDeleted,
        Self::WorkflowSelected,
        Self::FilterSaved,
        Self::FilterDeleted,
        Self::TemplateCreated,
        Self::TemplateDeleted,
        Self::SettingChanged,
        Self::RecordImported,
    ];

    /// Get the string representation for storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ProjectCreated => "project_created",
            Self::ProjectUpdated => "project_updated",
            Self::ProjectDeleted => "project_deleted",
            Self::IssueCreated => "issue_created",
            Self::IssueUpdated => "issue_updated",
            Self::IssueDeleted => "issue_deleted",
            Self::StatusChanged => "status_changed",
            Self::IssueTransitioned => "issue_transitioned",
            Self::IssueAssigned => "issue_assigned",
            Self::CommentAdded => "comment_added",
            Self::CommentEdited => "comment_edited",
            Self::CommentDeleted => "comment_deleted",
            Self::TimeLogged => "time_logged",
            Self::TimeLogDeleted => "time_log_deleted",
            Self::AttachmentAdded => "attachment_added",
            Self::AttachmentRemoved => "attachment_removed",
            Self::DecisionLogged => "decision_logged",
            Self::LinkAdded => "link_added",
            Self::LinkRemoved => "link_removed",
            Self::SubtaskAdded => "subtask_added",
            Self::SubtaskUpdated => "subtask_updated",
            Self::SubtaskDeleted => "subtask_deleted",
            Self::SprintCreated => "sprint_created",
            Self::SprintUpdated => "sprint_updated",
            Self::SprintStarted => "sprint_started",
            Self::SprintCompleted => "sprint_completed",
            Self::SprintDeleted => "sprint_deleted",
            Self::SprintIssueAdded => "sprint_issue_added",
            Self::SprintIssueRemoved => "sprint_issue_removed",
            Self::EpicCreated => "epic_created",
            Self::EpicUpdated => "epic_updated",
            Self::EpicDeleted => "epic_deleted",
            Self::EpicIssueAdded => "epic_issue_added",
            Self::EpicIssueRemoved => "epic_issue_removed",
            Self::OrgCreated => "org_created",
            Self::MemberJoined => "member_joined",
            Self::MemberLeft => "member_left",
            Self::InviteSent => "invite_sent",
            Self::InviteAccepted => "invite_accepted",
            Self::InviteDeclined => "invite_declined",
            Self::InviteCancelled => "invite_cancelled",
            Self::IdeaCreated => "idea_created",
            Self::IdeaUpdated => "idea_updated",
            Self::IdeaUpvoted => "idea_upvoted",
            Self::IdeaCommented => "idea_commented",
            Self::IdeaEndorsed => "idea_endorsed",
            Self::IdeaPromoted => "idea_promoted",
            Self::IdeaDeleted => "idea_deleted",
            Self::FeedbackAdded => "feedback_added",
            Self::FeedbackUpdated => "feedback_updated",
            Self::FeedbackResolved => "feedback_resolved",
            Self::FeedbackReopened => "feedback_reopened",
            Self::FeedbackDeleted => "feedback_deleted",
            Self::WorkflowCreated => "workflow_created",
            Self::WorkflowDeleted => "workflow_deleted",
            Self::WorkflowSelected => "workflow_selected",
            Self::FilterSaved => "filter_saved",
            Self::FilterDeleted => "filter_deleted",
            Self::TemplateCreated => "template_created",
            Self::TemplateDeleted => "template_deleted",
            Self::SettingChanged => "setting_changed",
            Self::RecordImported => "record_imported",
        }
    }

    /// Parse the storage string. Unknown strings map to `None`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().find(|e| e.as_str() == s).copied()
    }
}

/// An audit event record.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub id: i64,
    pub entity_type: String,
    pub entity_id: String,
    pub event_type: EventType,
    pub actor: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub comment: Option<String>,
    pub created_at: i64,
}

impl Event {
    /// Create a new event (id will be assigned by database).
    #[must_use]
    pub fn new(entity_type: &str, entity_id: &str, event_type: EventType, actor: &str) -> Self {
        Self {
            id: 0,
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            event_type,
            actor: actor.to_string(),
            old_value: None,
            new_value: None,
            comment: None,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Add old/new values for field change tracking.
    #[must_use]
    pub fn with_values(mut self, old: Option<String>, new: Option<String>) -> Self {
        self.old_value = old;
        self.new_value = new;
        self
    }

    /// Add a comment to the event.
    #[must_use]
    pub fn with_comment(mut self, comment: &str) -> Self {
        self.comment = Some(comment.to_string());
        self
    }

    /// One-line human description for the activity feed.
    #[must_use]
    pub fn summary(&self) -> String {
        let subject = self.comment.as_deref().unwrap_or(&self.entity_id);
        let old = self.old_value.as_deref().unwrap_or("-");
        let new = self.new_value.as_deref().unwrap_or("-");

        match self.event_type {
            EventType::ProjectCreated => format!("created project {subject}"),
            EventType::ProjectUpdated => format!("updated project {subject}"),
            EventType::ProjectDeleted => format!("deleted project {subject}"),
            EventType::IssueCreated => format!("created issue {subject}"),
            EventType::IssueUpdated => format!("updated issue {subject}"),
            EventType::IssueDeleted => format!("deleted issue {subject}"),
            EventType::StatusChanged => format!("changed status {old} → {new}"),
            EventType::IssueTransitioned => format!("moved {old} → {new}"),
            EventType::IssueAssigned => match &self.new_value {
                Some(who) => format!("assigned to {who}"),
                None => "unassigned".to_string(),
            },
            EventType::CommentAdded => "commented".to_string(),
            EventType::CommentEdited => "edited a comment".to_string(),
            EventType::CommentDeleted => "deleted a comment".to_string(),
            EventType::TimeLogged => format!("logged {new}h"),
            EventType::TimeLogDeleted => format!("removed {old}h of logged time"),
            EventType::AttachmentAdded => format!("attached {subject}"),
            EventType::AttachmentRemoved => format!("removed attachment {subject}"),
            EventType::DecisionLogged => "logged a decision".to_string(),
            EventType::LinkAdded => format!("linked {subject}"),
            EventType::LinkRemoved => format!("unlinked {subject}"),
            EventType::SubtaskAdded => format!("added sub-task {subject}"),
            EventType::SubtaskUpdated => format!("set sub-task to {new}"),
            EventType::SubtaskDeleted => "deleted a sub-task".to_string(),
            EventType::SprintCreated => format!("created sprint {subject}"),
            EventType::SprintUpdated => format!("updated sprint {subject}"),
            EventType::SprintStarted => format!("started sprint {subject}"),
            EventType::SprintCompleted => format!("completed sprint {subject}"),
            EventType::SprintDeleted => format!("deleted sprint {subject}"),
            EventType::SprintIssueAdded => format!("added {subject} to a sprint"),
            EventType::SprintIssueRemoved => format!("removed {subject} from a sprint"),
            EventType::EpicCreated => format!("created epic {subject}"),
            EventType::EpicUpdated => format!("updated epic {subject}"),
            EventType::EpicDeleted => format!("deleted epic {subject}"),
            EventType::EpicIssueAdded => format!("added {subject} to an epic"),
            EventType::EpicIssueRemoved => format!("removed {subject} from an epic"),
            EventType::OrgCreated => format!("created organization {subject}"),
            EventType::MemberJoined => format!("{new} joined"),
            EventType::MemberLeft => format!("{old} left"),
            EventType::InviteSent => format!("invited {subject}"),
            EventType::InviteAccepted => "accepted an invite".to_string(),
            EventType::InviteDeclined => "declined an invite".to_string(),
            EventType::InviteCancelled => "cancelled an invite".to_string(),
            EventType::IdeaCreated => format!("submitted idea {subject}"),
            EventType::IdeaUpdated => format!("changed idea status {old} → {new}"),
            EventType::IdeaUpvoted => "upvoted an idea".to_string(),
            EventType::IdeaCommented => "commented on an idea".to_string(),
            EventType::IdeaEndorsed => match &self.new_value {
                Some(_) => "endorsed an idea".to_string(),
                None => "withdrew an endorsement".to_string(),
            },
            EventType::IdeaPromoted => format!("promoted idea {subject}"),
            EventType::IdeaDeleted => format!("deleted idea {subject}"),
            EventType::FeedbackAdded => "added retrospective feedback".to_string(),
            EventType::FeedbackUpdated => "edited retrospective feedback".to_string(),
            EventType::FeedbackResolved => "resolved retrospective feedback".to_string(),
            EventType::FeedbackReopened => "reopened retrospective feedback".to_string(),
            EventType::FeedbackDeleted => "deleted retrospective feedback".to_string(),
            EventType::WorkflowCreated => format!("created workflow {subject}"),
            EventType::WorkflowDeleted => format!("deleted workflow {subject}"),
            EventType::WorkflowSelected => format!("switched workflow {old} → {new}"),
            EventType::FilterSaved => format!("saved filter {subject}"),
            EventType::FilterDeleted => format!("deleted filter {subject}"),
            EventType::TemplateCreated => format!("created template {subject}"),
            EventType::TemplateDeleted => format!("deleted template {subject}"),
            EventType::SettingChanged => format!("set {} to {new}", self.entity_id),
            EventType::RecordImported => format!("imported {} {subject}", self.entity_type),
        }
    }
}

/// Insert an event into the database.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub fn insert_event(conn: &Connection, event: &Event) -> Result<i64> {
    conn.execute(
        "INSERT INTO events (entity_type, entity_id, event_type, actor, old_value, new_value, comment, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            event.entity_type,
            event.entity_id,
            event.event_type.as_str(),
            event.actor,
            event.old_value,
            event.new_value,
            event.comment,
            event.created_at,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

const EVENT_COLUMNS: &str =
    "id, entity_type, entity_id, event_type, actor, old_value, new_value, comment, created_at";

fn map_event_row(row: &rusqlite::Row) -> Result<Option<Event>> {
    let kind: String = row.get(3)?;
    let Some(event_type) = EventType::parse(&kind) else {
        return Ok(None);
    };
    Ok(Some(Event {
        id: row.get(0)?,
        entity_type: row.get(1)?,
        entity_id: row.get(2)?,
        event_type,
        actor: row.get(4)?,
        old_value: row.get(5)?,
        new_value: row.get(6)?,
        comment: row.get(7)?,
        created_at: row.get(8)?,
    }))
}

fn collect_events(stmt: &mut rusqlite::Statement, params: impl rusqlite::Params) -> Result<Vec<Event>> {
    let rows = stmt.query_map(params, map_event_row)?;
    let mut events = Vec::new();
    for row in rows {
        if let Some(event) = row? {
            events.push(event);
        }
    }
    Ok(events)
}

/// Get events for an entity, newest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_events(
    conn: &Connection,
    entity_type: &str,
    entity_id: &str,
    limit: Option<u32>,
) -> Result<Vec<Event>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {EVENT_COLUMNS}
         FROM events
         WHERE entity_type = ?1 AND entity_id = ?2
         ORDER BY created_at DESC, id DESC
         LIMIT ?3"
    ))?;
    collect_events(
        &mut stmt,
        rusqlite::params![entity_type, entity_id, limit.unwrap_or(100)],
    )
}

/// Get recent events across the database, newest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn recent_events(
    conn: &Connection,
    entity_type: Option<&str>,
    actor: Option<&str>,
    limit: u32,
) -> Result<Vec<Event>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {EVENT_COLUMNS}
         FROM events
         WHERE (?1 IS NULL OR entity_type = ?1)
           AND (?2 IS NULL OR actor = ?2)
         ORDER BY created_at DESC, id DESC
         LIMIT ?3"
    ))?;
    collect_events(&mut stmt, rusqlite::params![entity_type, actor, limit])
}

/// Get recent events touching a project or anything inside it.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn project_events(conn: &Connection, project_id: &str, limit: u32) -> Result<Vec<Event>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {EVENT_COLUMNS}
         FROM events
         WHERE entity_id = ?1
            OR entity_id IN (SELECT id FROM issues WHERE project_id = ?1)
            OR entity_id IN (SELECT id FROM sprints WHERE project_id = ?1)
            OR entity_id IN (SELECT id FROM epics WHERE project_id = ?1)
            OR entity_id IN (SELECT id FROM retro_feedback WHERE project_id = ?1)
         ORDER BY created_at DESC, id DESC
         LIMIT ?2"
    ))?;
    collect_events(&mut stmt, rusqlite::params![project_id, limit])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::schema::apply_schema;

    #[test]
    fn test_event_insert_and_get() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();

        let event = Event::new("issue", "issue_123", EventType::IssueCreated, "test-actor")
            .with_comment("Created MOB-1");

        let id = insert_event(&conn, &event).unwrap();
        assert!(id > 0);

        let events = get_events(&conn, "issue", "issue_123", Some(10)).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].actor, "test-actor");
        assert_eq!(events[0].event_type, EventType::IssueCreated);
        assert_eq!(events[0].comment, Some("Created MOB-1".to_string()));
    }

    #[test]
    fn test_event_summary() {
        let created = Event::new("issue", "issue_1", EventType::IssueCreated, "alex").with_comment("MOB-1");
        assert_eq!(created.summary(), "created issue MOB-1");

        let moved = Event::new("issue", "issue_1", EventType::IssueTransitioned, "alex")
            .with_values(Some("To Do".into()), Some("In Progress".into()));
        assert_eq!(moved.summary(), "moved To Do → In Progress");

        let unassigned = Event::new("issue", "issue_1", EventType::IssueAssigned, "alex")
            .with_values(Some("sam".into()), None);
        assert_eq!(unassigned.summary(), "unassigned");
    }

    #[test]
    fn test_recent_events_filters() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();

        insert_event(&conn, &Event::new("issue", "i1", EventType::IssueCreated, "alex")).unwrap();
        insert_event(&conn, &Event::new("sprint", "s1", EventType::SprintStarted, "sam")).unwrap();
        insert_event(&conn, &Event::new("issue", "i1", EventType::TimeLogged, "sam")).unwrap();

        assert_eq!(recent_events(&conn, None, None, 10).unwrap().len(), 3);
        assert_eq!(recent_events(&conn, Some("issue"), None, 10).unwrap().len(), 2);
        assert_eq!(recent_events(&conn, None, Some("sam"), 10).unwrap().len(), 2);

        let newest = recent_events(&conn, None, None, 1).unwrap();
        assert_eq!(newest[0].event_type, EventType::TimeLogged);
    }

    #[test]
    fn test_event_type_round_trip() {
        for kind in EventType::ALL {
            assert_eq!(EventType::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(EventType::parse("nonsense"), None);
    }
}
