//! Upserts used by JSONL import.
//!
//! Imported records keep their ids and timestamps. References to
//! organizations that do not exist locally are dropped rather than failing
//! the import, and key counters are bumped past imported keys so that new
//! local issues and epics never collide with them.

use rusqlite::Transaction;

use super::{replace_list, SqliteStorage};
use crate::error::Result;
use crate::model::{Epic, Idea, Issue, Project, Sprint};
use crate::storage::events::EventType;

impl SqliteStorage {
    /// Number of rows in one of the synced tables.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn count_rows(&self, table: &'static str) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Insert or overwrite a project by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails (for example a key taken by a
    /// different local project).
    pub fn upsert_project(&mut self, project: &Project, actor: &str) -> Result<()> {
        self.mutate("upsert_project", actor, |tx, ctx| {
            let org = existing_org(tx, project.organization_id.as_deref())?;
            tx.execute(
                "INSERT INTO projects (id, key, name, description, lead, workflow_id, organization_id,
                                       next_issue_number, next_epic_number, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                 ON CONFLICT(id) DO UPDATE SET
                   key = excluded.key,
                   name = excluded.name,
                   description = excluded.description,
                   lead = excluded.lead,
                   workflow_id = excluded.workflow_id,
                   organization_id = excluded.organization_id,
                   next_issue_number = max(projects.next_issue_number, excluded.next_issue_number),
                   next_epic_number = max(projects.next_epic_number, excluded.next_epic_number),
                   updated_at = excluded.updated_at",
                rusqlite::params![
                    project.id,
                    project.key,
                    project.name,
                    project.description,
                    project.lead,
                    project.workflow_id,
                    org,
                    project.next_issue_number,
                    project.next_epic_number,
                    project.created_at,
                    project.updated_at,
                ],
            )?;
            ctx.record_note("project", &project.id, EventType::RecordImported, &project.key);
            Ok(())
        })
    }

    /// Insert or overwrite an epic by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails or the project is missing.
    pub fn upsert_epic(&mut self, epic: &Epic, actor: &str) -> Result<()> {
        self.mutate("upsert_epic", actor, |tx, ctx| {
            tx.execute(
                "INSERT INTO epics (id, key, project_id, title, description, status, assignee, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(id) DO UPDATE SET
                   key = excluded.key,
                   title = excluded.title,
                   description = excluded.description,
                   status = excluded.status,
                   assignee = excluded.assignee,
                   updated_at = excluded.updated_at",
                rusqlite::params![
                    epic.id,
                    epic.key,
                    epic.project_id,
                    epic.title,
                    epic.description,
                    epic.status,
                    epic.assignee,
                    epic.created_at,
                    epic.updated_at,
                ],
            )?;
            bump_counter(tx, &epic.project_id, "next_epic_number", &epic.key)?;
            ctx.record_note("epic", &epic.id, EventType::RecordImported, &epic.key);
            Ok(())
        })
    }

    /// Insert or overwrite a sprint by id, replacing its team.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails or the project is missing.
    pub fn upsert_sprint(&mut self, sprint: &Sprint, actor: &str) -> Result<()> {
        self.mutate("upsert_sprint", actor, |tx, ctx| {
            tx.execute(
                "INSERT INTO sprints (id, project_id, name, start_date, end_date, status, goal, velocity,
                                      capacity, created_at, updated_at, started_at, completed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                 ON CONFLICT(id) DO UPDATE SET
                   name = excluded.name,
                   start_date = excluded.start_date,
                   end_date = excluded.end_date,
                   status = excluded.status,
                   goal = excluded.goal,
                   velocity = excluded.velocity,
                   capacity = excluded.capacity,
                   updated_at = excluded.updated_at,
                   started_at = excluded.started_at,
                   completed_at = excluded.completed_at",
                rusqlite::params![
                    sprint.id,
                    sprint.project_id,
                    sprint.name,
                    sprint.start_date,
                    sprint.end_date,
                    sprint.status.as_str(),
                    sprint.goal,
                    sprint.velocity,
                    sprint.capacity,
                    sprint.created_at,
                    sprint.updated_at,
                    sprint.started_at,
                    sprint.completed_at,
                ],
            )?;
            replace_list(tx, "sprint_members", "sprint_id", "member", &sprint.id, &sprint.team_members)?;
            ctx.record_note("sprint", &sprint.id, EventType::RecordImported, &sprint.name);
            Ok(())
        })
    }

    /// Insert or overwrite an issue by id, replacing labels and components.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails or a referenced project, epic
    /// or sprint is missing.
    pub fn upsert_issue(&mut self, issue: &Issue, actor: &str) -> Result<()> {
        self.mutate("upsert_issue", actor, |tx, ctx| {
            tx.execute(
                "INSERT INTO issues (id, key, project_id, title, description, status, priority, issue_type,
                                     assignee, reporter, due_date, estimated_hours, logged_hours, story_points,
                                     epic_id, sprint_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
                 ON CONFLICT(id) DO UPDATE SET
                   key = excluded.key,
                   title = excluded.title,
                   description = excluded.description,
                   status = excluded.status,
                   priority = excluded.priority,
                   issue_type = excluded.issue_type,
                   assignee = excluded.assignee,
                   reporter = excluded.reporter,
                   due_date = excluded.due_date,
                   estimated_hours = excluded.estimated_hours,
                   logged_hours = excluded.logged_hours,
                   story_points = excluded.story_points,
                   epic_id = excluded.epic_id,
                   sprint_id = excluded.sprint_id,
                   updated_at = excluded.updated_at",
                rusqlite::params![
                    issue.id,
                    issue.key,
                    issue.project_id,
                    issue.title,
                    issue.description,
                    issue.status,
                    issue.priority.as_str(),
                    issue.issue_type.as_str(),
                    issue.assignee,
                    issue.reporter,
                    issue.due_date,
                    issue.estimated_hours,
                    issue.logged_hours,
                    issue.story_points,
                    issue.epic_id,
                    issue.sprint_id,
                    issue.created_at,
                    issue.updated_at,
                ],
            )?;
            replace_list(tx, "issue_labels", "issue_id", "label", &issue.id, &issue.labels)?;
            replace_list(tx, "issue_components", "issue_id", "component", &issue.id, &issue.components)?;
            bump_counter(tx, &issue.project_id, "next_issue_number", &issue.key)?;
            ctx.record_note("issue", &issue.id, EventType::RecordImported, &issue.key);
            Ok(())
        })
    }

    /// Insert or overwrite an idea by id with its tags, endorsements and
    /// comments.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn upsert_idea(&mut self, idea: &Idea, actor: &str) -> Result<()> {
        self.mutate("upsert_idea", actor, |tx, ctx| {
            let org = existing_org(tx, idea.organization_id.as_deref())?;
            let promoted_issue: Option<String> = match &idea.promoted_issue_id {
                Some(id) if tx.prepare("SELECT 1 FROM issues WHERE id = ?1")?.exists([id])? => {
                    Some(id.clone())
                }
                _ => None,
            };

            tx.execute(
                "INSERT INTO ideas (id, title, description, category, impact, status, upvotes, author,
                                    organization_id, promoted_issue_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                 ON CONFLICT(id) DO UPDATE SET
                   title = excluded.title,
                   description = excluded.description,
                   category = excluded.category,
                   impact = excluded.impact,
                   status = excluded.status,
                   upvotes = excluded.upvotes,
                   organization_id = excluded.organization_id,
                   promoted_issue_id = excluded.promoted_issue_id,
                   updated_at = excluded.updated_at",
                rusqlite::params![
                    idea.id,
                    idea.title,
                    idea.description,
                    idea.category.as_str(),
                    idea.impact.as_str(),
                    idea.status.as_str(),
                    idea.upvotes,
                    idea.author,
                    org,
                    promoted_issue,
                    idea.created_at,
                    idea.updated_at,
                ],
            )?;
            replace_list(tx, "idea_tags", "idea_id", "tag", &idea.id, &idea.tags)?;

            tx.execute("DELETE FROM idea_endorsements WHERE idea_id = ?1", [&idea.id])?;
            for email in &idea.promoted_by {
                tx.execute(
                    "INSERT OR IGNORE INTO idea_endorsements (idea_id, email, created_at) VALUES (?1, ?2, ?3)",
                    rusqlite::params![idea.id, email, idea.updated_at],
                )?;
            }

            for comment in &idea.comments {
                tx.execute(
                    "INSERT INTO idea_comments (id, idea_id, author, content, created_at, edited_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                     ON CONFLICT(id) DO UPDATE SET content = excluded.content, edited_at = excluded.edited_at",
                    rusqlite::params![
                        comment.id,
                        idea.id,
                        comment.author,
                        comment.content,
                        comment.created_at,
                        comment.edited_at,
                    ],
                )?;
            }

            ctx.record_note("idea", &idea.id, EventType::RecordImported, &idea.title);
            Ok(())
        })
    }
}

/// Keep an organization reference only if it exists locally.
fn existing_org(tx: &Transaction, org_id: Option<&str>) -> Result<Option<String>> {
    match org_id {
        Some(id) if tx.prepare("SELECT 1 FROM organizations WHERE id = ?1")?.exists([id])? => {
            Ok(Some(id.to_string()))
        }
        _ => Ok(None),
    }
}

/// Raise a project's key counter past the numeric suffix of `key`.
fn bump_counter(tx: &Transaction, project_id: &str, column: &str, key: &str) -> Result<()> {
    let Some(number) = key.rsplit('-').next().and_then(|n| n.parse::<i64>().ok()) else {
        return Ok(());
    };
    tx.execute(
        &format!("UPDATE projects SET {column} = max({column}, ?1) WHERE id = ?2"),
        rusqlite::params![number + 1, project_id],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{storage_with_project, ACTOR};
    use super::*;

    #[test]
    fn test_upsert_issue_creates_then_updates() {
        let (mut storage, project) = storage_with_project();
        let mut issue = Issue::new(project.id.clone(), "Imported".into(), "To Do".into());
        issue.key = "MOB-41".into();
        issue.labels = vec!["sync".into()];

        storage.upsert_issue(&issue, ACTOR).unwrap();
        let loaded = storage.require_issue("MOB-41").unwrap();
        assert_eq!(loaded.labels, vec!["sync".to_string()]);

        issue.title = "Imported again".into();
        issue.labels.clear();
        storage.upsert_issue(&issue, ACTOR).unwrap();
        let loaded = storage.require_issue("MOB-41").unwrap();
        assert_eq!(loaded.title, "Imported again");
        assert!(loaded.labels.is_empty());
    }

    #[test]
    fn test_upsert_bumps_key_counter() {
        let (mut storage, project) = storage_with_project();
        let mut imported = Issue::new(project.id.clone(), "Imported".into(), "To Do".into());
        imported.key = "MOB-7".into();
        storage.upsert_issue(&imported, ACTOR).unwrap();

        let mut local = Issue::new(project.id.clone(), "Local".into(), "To Do".into());
        storage.create_issue(&mut local, ACTOR).unwrap();
        assert_eq!(local.key, "MOB-8");
    }

    #[test]
    fn test_upsert_project_drops_unknown_org() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let mut project = Project::new("Web".into(), Some("WEB"));
        project.organization_id = Some("org_missing".into());
        storage.upsert_project(&project, ACTOR).unwrap();

        let loaded = storage.require_project("WEB").unwrap();
        assert!(loaded.organization_id.is_none());
    }
}
