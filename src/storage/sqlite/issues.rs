//! Issue operations.
//!
//! Keys are allocated from the project's `next_issue_number` counter inside
//! the creating transaction. Status writes are checked against the project
//! workflow; `transition_issue` additionally enforces the transition table.

use rusqlite::{Connection, OptionalExtension, Transaction};

use super::{insert_list, load_list, now_ms, MutationContext, SqliteStorage};
use crate::error::{Error, Result};
use crate::model::{Issue, IssueType, Priority};
use crate::storage::events::{Event, EventType};
use crate::validate::find_similar_ids;
use crate::workflow::Transition;

const ISSUE_SELECT: &str = "SELECT i.id, i.key, i.project_id, p.key, i.title, i.description, i.status,
            i.priority, i.issue_type, i.assignee, i.reporter, i.due_date, i.estimated_hours,
            i.logged_hours, i.story_points, i.epic_id, e.key, i.sprint_id, s.name,
            i.created_at, i.updated_at
     FROM issues i
     JOIN projects p ON p.id = i.project_id
     LEFT JOIN epics e ON e.id = i.epic_id
     LEFT JOIN sprints s ON s.id = i.sprint_id";

/// Field changes for [`SqliteStorage::update_issue`].
///
/// `None` leaves a field alone. Nullable fields use `Some(None)` to clear.
#[derive(Debug, Clone, Default)]
pub struct IssueUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<Priority>,
    pub issue_type: Option<IssueType>,
    pub assignee: Option<Option<String>>,
    pub due_date: Option<Option<String>>,
    pub estimated_hours: Option<f64>,
    pub story_points: Option<i64>,
    pub epic_id: Option<Option<String>>,
    pub sprint_id: Option<Option<String>>,
    pub add_labels: Vec<String>,
    pub remove_labels: Vec<String>,
    /// Replaces the component list when set
    pub components: Option<Vec<String>>,
}

impl IssueUpdate {
    /// True when the update would change nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.issue_type.is_none()
            && self.assignee.is_none()
            && self.due_date.is_none()
            && self.estimated_hours.is_none()
            && self.story_points.is_none()
            && self.epic_id.is_none()
            && self.sprint_id.is_none()
            && self.add_labels.is_empty()
            && self.remove_labels.is_empty()
            && self.components.is_none()
    }
}

impl SqliteStorage {
    /// Create a new issue, assigning its key.
    ///
    /// The issue's status is resolved against the project workflow; on
    /// return `issue` holds the stored record (key, joined names).
    ///
    /// # Errors
    ///
    /// Returns `InvalidStatus` for a status outside the workflow,
    /// `InvalidArgument` for negative estimates or a cross-project
    /// epic/sprint, or `ProjectNotFound`.
    pub fn create_issue(&mut self, issue: &mut Issue, actor: &str) -> Result<()> {
        let project = self.require_project(&issue.project_id)?;
        let workflow = self.workflow_for_project(&project)?;
        issue.status = workflow.require_status(&issue.status)?;

        check_estimates(issue.estimated_hours, issue.story_points)?;
        if let Some(epic_id) = &issue.epic_id {
            check_same_project(&self.conn, "epics", "Epic", epic_id, &project.id)?;
        }
        if let Some(sprint_id) = &issue.sprint_id {
            check_same_project(&self.conn, "sprints", "Sprint", sprint_id, &project.id)?;
        }

        self.mutate("create_issue", actor, |tx, ctx| insert_issue(tx, ctx, issue))?;

        *issue = self.require_issue(&issue.id)?;
        Ok(())
    }

    /// Get an issue by id or key (keys match case-insensitively).
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_issue(&self, id_or_key: &str) -> Result<Option<Issue>> {
        let issue = self
            .conn
            .query_row(
                &format!("{ISSUE_SELECT} WHERE i.id = ?1 OR i.key = upper(?1)"),
                [id_or_key],
                map_issue_row,
            )
            .optional()?;

        match issue {
            Some(mut issue) => {
                hydrate_issue(&self.conn, &mut issue)?;
                Ok(Some(issue))
            }
            None => Ok(None),
        }
    }

    /// Get an issue or fail with a not-found error suggesting similar keys.
    ///
    /// # Errors
    ///
    /// Returns `IssueNotFound` / `IssueNotFoundSimilar` if nothing matches.
    pub fn require_issue(&self, id_or_key: &str) -> Result<Issue> {
        if let Some(issue) = self.get_issue(id_or_key)? {
            return Ok(issue);
        }

        let similar = find_similar_ids(id_or_key, &self.all_issue_keys()?, 3);
        if similar.is_empty() {
            Err(Error::IssueNotFound {
                id: id_or_key.to_string(),
            })
        } else {
            Err(Error::IssueNotFoundSimilar {
                id: id_or_key.to_string(),
                similar,
            })
        }
    }

    /// List issues, most recently updated first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_issues(&self, project_id: Option<&str>) -> Result<Vec<Issue>> {
        match project_id {
            Some(id) => self.issues_where("i.project_id = ?1", id),
            None => self.issues_where("?1 IS NOT NULL", ""),
        }
    }

    /// Issues assigned to a sprint.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_sprint_issues(&self, sprint_id: &str) -> Result<Vec<Issue>> {
        self.issues_where("i.sprint_id = ?1", sprint_id)
    }

    /// Issues belonging to an epic.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_epic_issues(&self, epic_id: &str) -> Result<Vec<Issue>> {
        self.issues_where("i.epic_id = ?1", epic_id)
    }

    /// Case-insensitive text search over title, description, key and assignee.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn search_issues(&self, project_id: Option<&str>, text: &str, limit: u32) -> Result<Vec<Issue>> {
        let sql = format!(
            "{ISSUE_SELECT}
             WHERE (?1 IS NULL OR i.project_id = ?1)
               AND (instr(lower(i.title), lower(?2)) > 0
                    OR instr(lower(coalesce(i.description, '')), lower(?2)) > 0
                    OR instr(lower(i.key), lower(?2)) > 0
                    OR instr(lower(coalesce(i.assignee, '')), lower(?2)) > 0)
             ORDER BY i.updated_at DESC, i.key
             LIMIT ?3"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut issues = stmt
            .query_map(rusqlite::params![project_id, text, limit], map_issue_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        for issue in &mut issues {
            hydrate_issue(&self.conn, issue)?;
        }
        Ok(issues)
    }

    /// Apply field changes to an issue and return the stored result.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStatus` when the new status is not in the project
    /// workflow, `InvalidArgument` for negative numbers or cross-project
    /// references, or `IssueNotFound`.
    pub fn update_issue(&mut self, id_or_key: &str, update: &IssueUpdate, actor: &str) -> Result<Issue> {
        let issue = self.require_issue(id_or_key)?;
        if update.is_empty() {
            return Ok(issue);
        }

        let status = match &update.status {
            Some(s) => {
                let project = self.require_project(&issue.project_id)?;
                Some(self.workflow_for_project(&project)?.require_status(s)?)
            }
            None => None,
        };
        check_estimates(update.estimated_hours, update.story_points)?;
        if let Some(Some(epic_id)) = &update.epic_id {
            check_same_project(&self.conn, "epics", "Epic", epic_id, &issue.project_id)?;
        }
        if let Some(Some(sprint_id)) = &update.sprint_id {
            check_same_project(&self.conn, "sprints", "Sprint", sprint_id, &issue.project_id)?;
        }

        self.mutate("update_issue", actor, |tx, ctx| {
            let mut set_clauses = vec!["updated_at = ?"];
            let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(now_ms())];
            let mut other_change = false;

            if let Some(t) = &update.title {
                set_clauses.push("title = ?");
                params.push(Box::new(t.clone()));
                other_change = true;
            }
            if let Some(d) = &update.description {
                set_clauses.push("description = ?");
                params.push(Box::new(d.clone()));
                other_change = true;
            }
            if let Some(s) = &status {
                set_clauses.push("status = ?");
                params.push(Box::new(s.clone()));
            }
            if let Some(p) = update.priority {
                set_clauses.push("priority = ?");
                params.push(Box::new(p.as_str()));
                other_change = true;
            }
            if let Some(t) = update.issue_type {
                set_clauses.push("issue_type = ?");
                params.push(Box::new(t.as_str()));
                other_change = true;
            }
            if let Some(a) = &update.assignee {
                set_clauses.push("assignee = ?");
                params.push(Box::new(a.clone()));
            }
            if let Some(d) = &update.due_date {
                set_clauses.push("due_date = ?");
                params.push(Box::new(d.clone()));
                other_change = true;
            }
            if let Some(h) = update.estimated_hours {
                set_clauses.push("estimated_hours = ?");
                params.push(Box::new(h));
                other_change = true;
            }
            if let Some(p) = update.story_points {
                set_clauses.push("story_points = ?");
                params.push(Box::new(p));
                other_change = true;
            }
            if let Some(e) = &update.epic_id {
                set_clauses.push("epic_id = ?");
                params.push(Box::new(e.clone()));
                other_change = true;
            }
            if let Some(s) = &update.sprint_id {
                set_clauses.push("sprint_id = ?");
                params.push(Box::new(s.clone()));
                other_change = true;
            }

            let sql = format!("UPDATE issues SET {} WHERE id = ?", set_clauses.join(", "));
            params.push(Box::new(issue.id.clone()));
            let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(AsRef::as_ref).collect();
            tx.execute(&sql, param_refs.as_slice())?;

            if !update.add_labels.is_empty() {
                insert_list(tx, "issue_labels", "issue_id", "label", &issue.id, &update.add_labels)?;
                other_change = true;
            }
            if !update.remove_labels.is_empty() {
                let mut stmt =
                    tx.prepare_cached("DELETE FROM issue_labels WHERE issue_id = ?1 AND label = ?2")?;
                for label in &update.remove_labels {
                    stmt.execute(rusqlite::params![issue.id, label.trim()])?;
                }
                other_change = true;
            }
            if let Some(components) = &update.components {
                super::replace_list(tx, "issue_components", "issue_id", "component", &issue.id, components)?;
                other_change = true;
            }

            if let Some(s) = &status {
                if *s != issue.status {
                    ctx.record_change(
                        "issue",
                        &issue.id,
                        EventType::StatusChanged,
                        Some(issue.status.clone()),
                        Some(s.clone()),
                    );
                }
            }
            if let Some(a) = &update.assignee {
                if *a != issue.assignee {
                    ctx.record_change(
                        "issue",
                        &issue.id,
                        EventType::IssueAssigned,
                        issue.assignee.clone(),
                        a.clone(),
                    );
                }
            }
            if other_change {
                ctx.record_note("issue", &issue.id, EventType::IssueUpdated, &issue.key);
            }
            Ok(())
        })?;

        self.require_issue(&issue.id)
    }

    /// Move an issue along its workflow.
    ///
    /// `target` may be a destination status or a transition label; only
    /// transitions leaving the current status are considered.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` listing the allowed moves when `target`
    /// is not reachable.
    pub fn transition_issue(&mut self, id_or_key: &str, target: &str, actor: &str) -> Result<(Issue, Transition)> {
        let issue = self.require_issue(id_or_key)?;
        let project = self.require_project(&issue.project_id)?;
        let workflow = self.workflow_for_project(&project)?;
        let transition = workflow.find_transition(&issue.status, target)?.clone();

        self.mutate("transition_issue", actor, |tx, ctx| {
            tx.execute(
                "UPDATE issues SET status = ?1, updated_at = ?2 WHERE id = ?3",
                rusqlite::params![transition.to, now_ms(), issue.id],
            )?;
            ctx.events.push(
                Event::new("issue", &issue.id, EventType::IssueTransitioned, actor)
                    .with_values(Some(issue.status.clone()), Some(transition.to.clone()))
                    .with_comment(&transition.label),
            );
            Ok(())
        })?;

        Ok((self.require_issue(&issue.id)?, transition))
    }

    /// Delete an issue and everything attached to it.
    ///
    /// # Errors
    ///
    /// Returns `IssueNotFound` if the issue doesn't exist.
    pub fn delete_issue(&mut self, id_or_key: &str, actor: &str) -> Result<Issue> {
        let issue = self.require_issue(id_or_key)?;

        self.mutate("delete_issue", actor, |tx, ctx| {
            tx.execute("DELETE FROM issues WHERE id = ?1", [&issue.id])?;
            ctx.record_note("issue", &issue.id, EventType::IssueDeleted, &issue.key);
            Ok(())
        })?;

        Ok(issue)
    }

    /// Every issue key, for typo suggestions.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn all_issue_keys(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT key FROM issues ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(keys)
    }

    fn issues_where(&self, condition: &str, param: &str) -> Result<Vec<Issue>> {
        let sql = format!("{ISSUE_SELECT} WHERE {condition} ORDER BY i.updated_at DESC, i.key");
        let mut stmt = self.conn.prepare(&sql)?;
        let mut issues = stmt
            .query_map([param], map_issue_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        for issue in &mut issues {
            hydrate_issue(&self.conn, issue)?;
        }
        Ok(issues)
    }
}

/// Insert an issue inside an open transaction, allocating its key.
pub(crate) fn insert_issue(tx: &Transaction, ctx: &mut MutationContext, issue: &mut Issue) -> Result<()> {
    let (project_key, number): (String, i64) = tx
        .query_row(
            "SELECT key, next_issue_number FROM projects WHERE id = ?1",
            [&issue.project_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?
        .ok_or_else(|| Error::ProjectNotFound {
            id: issue.project_id.clone(),
        })?;

    tx.execute(
        "UPDATE projects SET next_issue_number = next_issue_number + 1, updated_at = ?1 WHERE id = ?2",
        rusqlite::params![now_ms(), issue.project_id],
    )?;

    issue.key = format!("{project_key}-{number}");
    issue.project_key = project_key;

    tx.execute(
        "INSERT INTO issues (id, key, project_id, title, description, status, priority, issue_type,
                             assignee, reporter, due_date, estimated_hours, logged_hours, story_points,
                             epic_id, sprint_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
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

    insert_list(tx, "issue_labels", "issue_id", "label", &issue.id, &issue.labels)?;
    insert_list(tx, "issue_components", "issue_id", "component", &issue.id, &issue.components)?;

    ctx.record_note("issue", &issue.id, EventType::IssueCreated, &issue.key);
    Ok(())
}

/// Reject negative estimates before they reach the CHECK constraints.
fn check_estimates(hours: Option<f64>, points: Option<i64>) -> Result<()> {
    if hours.is_some_and(|h| h < 0.0 || !h.is_finite()) {
        return Err(Error::InvalidArgument("estimated hours must not be negative".into()));
    }
    if points.is_some_and(|p| p < 0) {
        return Err(Error::InvalidArgument("story points must not be negative".into()));
    }
    Ok(())
}

/// Check that a sprint or epic exists and belongs to `project_id`.
pub(crate) fn check_same_project(
    conn: &Connection,
    table: &str,
    entity: &'static str,
    id: &str,
    project_id: &str,
) -> Result<()> {
    let owner: Option<String> = conn
        .query_row(&format!("SELECT project_id FROM {table} WHERE id = ?1"), [id], |row| {
            row.get(0)
        })
        .optional()?;

    match owner {
        None => Err(Error::not_found(entity, id)),
        Some(owner) if owner != project_id => Err(Error::InvalidArgument(format!(
            "{} {id} belongs to another project",
            entity.to_lowercase()
        ))),
        Some(_) => Ok(()),
    }
}

fn hydrate_issue(conn: &Connection, issue: &mut Issue) -> Result<()> {
    issue.labels = load_list(
        conn,
        "SELECT label FROM issue_labels WHERE issue_id = ?1 ORDER BY label",
        &issue.id,
    )?;
    issue.components = load_list(
        conn,
        "SELECT component FROM issue_components WHERE issue_id = ?1 ORDER BY component",
        &issue.id,
    )?;
    Ok(())
}

fn map_issue_row(row: &rusqlite::Row) -> rusqlite::Result<Issue> {
    let priority: String = row.get(7)?;
    let issue_type: String = row.get(8)?;
    Ok(Issue {
        id: row.get(0)?,
        key: row.get(1)?,
        project_id: row.get(2)?,
        project_key: row.get(3)?,
        title: row.get(4)?,
        description: row.get(5)?,
        status: row.get(6)?,
        priority: Priority::parse(&priority).unwrap_or_default(),
        issue_type: IssueType::parse(&issue_type).unwrap_or_default(),
        assignee: row.get(9)?,
        reporter: row.get(10)?,
        due_date: row.get(11)?,
        estimated_hours: row.get(12)?,
        logged_hours: row.get(13)?,
        story_points: row.get(14)?,
        labels: Vec::new(),
        components: Vec::new(),
        epic_id: row.get(15)?,
        epic_key: row.get(16)?,
        sprint_id: row.get(17)?,
        sprint_name: row.get(18)?,
        created_at: row.get(19)?,
        updated_at: row.get(20)?,
    })
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{storage_with_project, ACTOR};
    use super::*;
    use crate::model::Project;

    fn new_issue(project: &Project, title: &str) -> Issue {
        Issue::new(project.id.clone(), title.to_string(), "To Do".to_string())
    }

    #[test]
    fn test_keys_allocated_sequentially() {
        let (mut storage, project) = storage_with_project();
        let mut first = new_issue(&project, "First");
        let mut second = new_issue(&project, "Second");
        storage.create_issue(&mut first, ACTOR).unwrap();
        storage.create_issue(&mut second, ACTOR).unwrap();

        assert_eq!(first.key, "MOB-1");
        assert_eq!(second.key, "MOB-2");
        assert_eq!(first.project_key, "MOB");

        let project = storage.require_project("MOB").unwrap();
        assert_eq!(project.next_issue_number, 3);
    }

    #[test]
    fn test_status_resolved_against_workflow() {
        let (mut storage, project) = storage_with_project();
        let mut issue = Issue::new(project.id.clone(), "Loose".into(), "in_progress".into());
        storage.create_issue(&mut issue, ACTOR).unwrap();
        assert_eq!(issue.status, "In Progress");

        let mut bad = Issue::new(project.id.clone(), "Bad".into(), "Closed".into());
        let err = storage.create_issue(&mut bad, ACTOR).unwrap_err();
        assert!(matches!(err, Error::InvalidStatus { .. }));
    }

    #[test]
    fn test_labels_and_components_round_trip() {
        let (mut storage, project) = storage_with_project();
        let mut issue = new_issue(&project, "Tagged");
        issue.labels = vec!["ios".into(), "auth".into(), "ios".into()];
        issue.components = vec!["login".into()];
        storage.create_issue(&mut issue, ACTOR).unwrap();

        let loaded = storage.require_issue("mob-1").unwrap();
        assert_eq!(loaded.labels, vec!["auth".to_string(), "ios".to_string()]);
        assert_eq!(loaded.components, vec!["login".to_string()]);
    }

    #[test]
    fn test_update_fields_and_labels() {
        let (mut storage, project) = storage_with_project();
        let mut issue = new_issue(&project, "Crash on launch");
        issue.labels = vec!["ios".into()];
        storage.create_issue(&mut issue, ACTOR).unwrap();

        let update = IssueUpdate {
            status: Some("in progress".into()),
            priority: Some(Priority::High),
            assignee: Some(Some("sam".into())),
            add_labels: vec!["crash".into()],
            remove_labels: vec!["ios".into()],
            story_points: Some(5),
            ..IssueUpdate::default()
        };
        let updated = storage.update_issue("MOB-1", &update, ACTOR).unwrap();

        assert_eq!(updated.status, "In Progress");
        assert_eq!(updated.priority, Priority::High);
        assert_eq!(updated.assignee.as_deref(), Some("sam"));
        assert_eq!(updated.labels, vec!["crash".to_string()]);
        assert_eq!(updated.story_points, Some(5));

        let unassign = IssueUpdate {
            assignee: Some(None),
            ..IssueUpdate::default()
        };
        let updated = storage.update_issue("MOB-1", &unassign, ACTOR).unwrap();
        assert!(updated.assignee.is_none());
    }

    #[test]
    fn test_update_rejects_foreign_status_and_negative_points() {
        let (mut storage, project) = storage_with_project();
        let mut issue = new_issue(&project, "Thing");
        storage.create_issue(&mut issue, ACTOR).unwrap();

        let bad_status = IssueUpdate {
            status: Some("Released".into()),
            ..IssueUpdate::default()
        };
        assert!(matches!(
            storage.update_issue("MOB-1", &bad_status, ACTOR),
            Err(Error::InvalidStatus { .. })
        ));

        let bad_points = IssueUpdate {
            story_points: Some(-1),
            ..IssueUpdate::default()
        };
        assert!(matches!(
            storage.update_issue("MOB-1", &bad_points, ACTOR),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_transition_enforces_table() {
        let (mut storage, project) = storage_with_project();
        let mut issue = new_issue(&project, "Flow");
        storage.create_issue(&mut issue, ACTOR).unwrap();

        // To Do -> Done is not a transition in the agile workflow
        let err = storage.transition_issue("MOB-1", "Done", ACTOR).unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }));

        let (issue, transition) = storage.transition_issue("MOB-1", "Start Work", ACTOR).unwrap();
        assert_eq!(issue.status, "In Progress");
        assert_eq!(transition.label, "Start Work");

        let (issue, _) = storage.transition_issue("MOB-1", "done", ACTOR).unwrap();
        assert_eq!(issue.status, "Done");

        let events = crate::storage::events::get_events(storage.conn(), "issue", &issue.id, None).unwrap();
        assert_eq!(events[0].event_type, EventType::IssueTransitioned);
        assert_eq!(events[0].comment.as_deref(), Some("Complete"));
    }

    #[test]
    fn test_not_found_suggests_similar_keys() {
        let (mut storage, project) = storage_with_project();
        let mut issue = new_issue(&project, "Only");
        storage.create_issue(&mut issue, ACTOR).unwrap();

        match storage.require_issue("MOB-2") {
            Err(Error::IssueNotFoundSimilar { similar, .. }) => {
                assert_eq!(similar, vec!["MOB-1".to_string()]);
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(matches!(
            storage.require_issue("ZZZZZZ-999"),
            Err(Error::IssueNotFound { .. })
        ));
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let (mut storage, project) = storage_with_project();
        let mut issue = new_issue(&project, "Login button misaligned");
        issue.assignee = Some("Sam".into());
        storage.create_issue(&mut issue, ACTOR).unwrap();
        let mut other = new_issue(&project, "Settings page");
        storage.create_issue(&mut other, ACTOR).unwrap();

        assert_eq!(storage.search_issues(None, "LOGIN", 10).unwrap().len(), 1);
        assert_eq!(storage.search_issues(Some(&project.id), "sam", 10).unwrap().len(), 1);
        assert_eq!(storage.search_issues(None, "mob-", 10).unwrap().len(), 2);
    }

    #[test]
    fn test_delete_issue() {
        let (mut storage, project) = storage_with_project();
        let mut issue = new_issue(&project, "Temp");
        storage.create_issue(&mut issue, ACTOR).unwrap();
        storage.delete_issue("MOB-1", ACTOR).unwrap();
        assert!(storage.get_issue("MOB-1").unwrap().is_none());
        assert!(storage.list_issues(Some(&project.id)).unwrap().is_empty());
    }
}
