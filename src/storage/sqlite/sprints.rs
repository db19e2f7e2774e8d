//! Sprint operations.
//!
//! A project has at most one active sprint; `start_sprint` checks this and
//! the `idx_sprints_one_active` index backs it up. Completing a sprint
//! records its velocity (story points of done issues) and moves unfinished
//! issues to another sprint or back to the backlog.

use rusqlite::OptionalExtension;
use serde::Serialize;

use super::{insert_list, load_list, now_ms, replace_list, SqliteStorage};
use crate::error::{Error, Result};
use crate::model::{Sprint, SprintProgress, SprintStatus};
use crate::storage::events::EventType;
use crate::validate::parse_date;

const SPRINT_COLUMNS: &str = "id, project_id, name, start_date, end_date, status, goal, velocity, \
     capacity, created_at, updated_at, started_at, completed_at";

/// Field changes for [`SqliteStorage::update_sprint`].
#[derive(Debug, Clone, Default)]
pub struct SprintUpdate {
    pub name: Option<String>,
    pub goal: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub capacity: Option<i64>,
    /// Replaces the team when set
    pub team_members: Option<Vec<String>>,
}

/// Outcome of [`SqliteStorage::complete_sprint`].
#[derive(Debug, Clone, Serialize)]
pub struct SprintCompletion {
    pub sprint: Sprint,
    pub velocity: i64,
    pub completed_issues: usize,
    pub moved_issues: usize,
    /// Name of the sprint unfinished work moved to; `None` means the backlog
    pub moved_to: Option<String>,
}

impl SqliteStorage {
    /// Create a planned sprint.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for malformed dates, an end before the
    /// start, or a negative capacity.
    pub fn create_sprint(&mut self, sprint: &Sprint, actor: &str) -> Result<()> {
        self.require_project(&sprint.project_id)?;
        check_dates(&sprint.start_date, &sprint.end_date)?;
        if sprint.capacity.is_some_and(|c| c < 0) {
            return Err(Error::InvalidArgument("capacity must not be negative".into()));
        }
        if sprint.name.trim().is_empty() {
            return Err(Error::RequiredField("name"));
        }

        self.mutate("create_sprint", actor, |tx, ctx| {
            tx.execute(
                &format!("INSERT INTO sprints ({SPRINT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"),
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
            insert_list(tx, "sprint_members", "sprint_id", "member", &sprint.id, &sprint.team_members)?;
            ctx.record_note("sprint", &sprint.id, EventType::SprintCreated, &sprint.name);
            Ok(())
        })
    }

    /// Find a sprint by id, or by name within a project.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_sprint(&self, id_or_name: &str, project_id: Option<&str>) -> Result<Option<Sprint>> {
        let sprint = self
            .conn
            .query_row(
                &format!(
                    "SELECT {SPRINT_COLUMNS} FROM sprints
                     WHERE id = ?1 OR (name = ?1 COLLATE NOCASE AND (?2 IS NULL OR project_id = ?2))
                     ORDER BY id = ?1 DESC, start_date DESC
                     LIMIT 1"
                ),
                rusqlite::params![id_or_name, project_id],
                map_sprint_row,
            )
            .optional()?;

        match sprint {
            Some(mut sprint) => {
                self.hydrate_sprint(&mut sprint)?;
                Ok(Some(sprint))
            }
            None => Ok(None),
        }
    }

    /// Get a sprint or fail with `NotFound`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if nothing matches.
    pub fn require_sprint(&self, id_or_name: &str, project_id: Option<&str>) -> Result<Sprint> {
        self.get_sprint(id_or_name, project_id)?
            .ok_or_else(|| Error::not_found("Sprint", id_or_name))
    }

    /// List a project's sprints by start date.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_sprints(&self, project_id: &str, status: Option<SprintStatus>) -> Result<Vec<Sprint>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SPRINT_COLUMNS} FROM sprints
             WHERE project_id = ?1 AND (?2 IS NULL OR status = ?2)
             ORDER BY start_date, name"
        ))?;
        let mut sprints = stmt
            .query_map(rusqlite::params![project_id, status.map(|s| s.as_str())], map_sprint_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        for sprint in &mut sprints {
            self.hydrate_sprint(sprint)?;
        }
        Ok(sprints)
    }

    /// The project's active sprint, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn active_sprint(&self, project_id: &str) -> Result<Option<Sprint>> {
        Ok(self
            .list_sprints(project_id, Some(SprintStatus::Active))?
            .into_iter()
            .next())
    }

    /// Update a sprint's fields.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` when the resulting dates are out of order
    /// or the capacity is negative.
    pub fn update_sprint(&mut self, id: &str, update: &SprintUpdate, actor: &str) -> Result<Sprint> {
        let sprint = self.require_sprint(id, None)?;

        let start = update.start_date.as_deref().unwrap_or(&sprint.start_date);
        let end = update.end_date.as_deref().unwrap_or(&sprint.end_date);
        check_dates(start, end)?;
        if update.capacity.is_some_and(|c| c < 0) {
            return Err(Error::InvalidArgument("capacity must not be negative".into()));
        }

        self.mutate("update_sprint", actor, |tx, ctx| {
            let mut set_clauses = vec!["updated_at = ?"];
            let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(now_ms())];

            if let Some(n) = &update.name {
                set_clauses.push("name = ?");
                params.push(Box::new(n.clone()));
            }
            if let Some(g) = &update.goal {
                set_clauses.push("goal = ?");
                params.push(Box::new(g.clone()));
            }
            if let Some(s) = &update.start_date {
                set_clauses.push("start_date = ?");
                params.push(Box::new(s.clone()));
            }
            if let Some(e) = &update.end_date {
                set_clauses.push("end_date = ?");
                params.push(Box::new(e.clone()));
            }
            if let Some(c) = update.capacity {
                set_clauses.push("capacity = ?");
                params.push(Box::new(c));
            }

            let sql = format!("UPDATE sprints SET {} WHERE id = ?", set_clauses.join(", "));
            params.push(Box::new(sprint.id.clone()));
            let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(AsRef::as_ref).collect();
            tx.execute(&sql, param_refs.as_slice())?;

            if let Some(members) = &update.team_members {
                replace_list(tx, "sprint_members", "sprint_id", "member", &sprint.id, members)?;
            }

            ctx.record_event("sprint", &sprint.id, EventType::SprintUpdated);
            Ok(())
        })?;

        self.require_sprint(&sprint.id, None)
    }

    /// Delete a sprint. Its issues return to the backlog.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the sprint doesn't exist.
    pub fn delete_sprint(&mut self, id: &str, actor: &str) -> Result<Sprint> {
        let sprint = self.require_sprint(id, None)?;

        self.mutate("delete_sprint", actor, |tx, ctx| {
            tx.execute("DELETE FROM sprints WHERE id = ?1", [&sprint.id])?;
            ctx.record_note("sprint", &sprint.id, EventType::SprintDeleted, &sprint.name);
            Ok(())
        })?;

        Ok(sprint)
    }

    /// Put an issue into a sprint.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the issue belongs to another project or
    /// `InvalidState` if the sprint is completed.
    pub fn add_issue_to_sprint(&mut self, sprint_id: &str, issue: &str, actor: &str) -> Result<()> {
        let sprint = self.require_sprint(sprint_id, None)?;
        let issue = self.require_issue(issue)?;

        if issue.project_id != sprint.project_id {
            return Err(Error::InvalidArgument(format!(
                "{} belongs to another project than sprint {}",
                issue.key, sprint.name
            )));
        }
        if sprint.status == SprintStatus::Completed {
            return Err(Error::InvalidState(format!(
                "sprint {} is completed",
                sprint.name
            )));
        }

        self.mutate("add_issue_to_sprint", actor, |tx, ctx| {
            tx.execute(
                "UPDATE issues SET sprint_id = ?1, updated_at = ?2 WHERE id = ?3",
                rusqlite::params![sprint.id, now_ms(), issue.id],
            )?;
            ctx.record_note("sprint", &sprint.id, EventType::SprintIssueAdded, &issue.key);
            Ok(())
        })
    }

    /// Take an issue out of a sprint.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if the issue is not in the sprint.
    pub fn remove_issue_from_sprint(&mut self, sprint_id: &str, issue: &str, actor: &str) -> Result<()> {
        let sprint = self.require_sprint(sprint_id, None)?;
        let issue = self.require_issue(issue)?;

        if issue.sprint_id.as_deref() != Some(sprint.id.as_str()) {
            return Err(Error::InvalidState(format!(
                "{} is not in sprint {}",
                issue.key, sprint.name
            )));
        }

        self.mutate("remove_issue_from_sprint", actor, |tx, ctx| {
            tx.execute(
                "UPDATE issues SET sprint_id = NULL, updated_at = ?1 WHERE id = ?2",
                rusqlite::params![now_ms(), issue.id],
            )?;
            ctx.record_note("sprint", &sprint.id, EventType::SprintIssueRemoved, &issue.key);
            Ok(())
        })
    }

    /// Start a planned sprint.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if the sprint is not planned or the project
    /// already has an active sprint.
    pub fn start_sprint(&mut self, id: &str, actor: &str) -> Result<Sprint> {
        let sprint = self.require_sprint(id, None)?;

        if sprint.status != SprintStatus::Planned {
            return Err(Error::InvalidState(format!(
                "sprint {} is {}, only planned sprints can start",
                sprint.name,
                sprint.status.as_str()
            )));
        }
        if let Some(active) = self.active_sprint(&sprint.project_id)? {
            return Err(Error::InvalidState(format!(
                "sprint {} is already active; complete it first",
                active.name
            )));
        }

        self.mutate("start_sprint", actor, |tx, ctx| {
            let now = now_ms();
            tx.execute(
                "UPDATE sprints SET status = 'active', started_at = ?1, updated_at = ?1 WHERE id = ?2",
                rusqlite::params![now, sprint.id],
            )?;
            ctx.record_change(
                "sprint",
                &sprint.id,
                EventType::SprintStarted,
                Some(SprintStatus::Planned.as_str().to_string()),
                Some(SprintStatus::Active.as_str().to_string()),
            );
            Ok(())
        })?;

        self.require_sprint(&sprint.id, None)
    }

    /// Complete an active sprint.
    ///
    /// Velocity is the sum of story points of issues in a done status.
    /// Unfinished issues move to `move_to` (a planned or active sprint of
    /// the same project) or back to the backlog.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if the sprint is not active or `move_to`
    /// names an unusable sprint.
    pub fn complete_sprint(&mut self, id: &str, move_to: Option<&str>, actor: &str) -> Result<SprintCompletion> {
        let sprint = self.require_sprint(id, None)?;
        if sprint.status != SprintStatus::Active {
            return Err(Error::InvalidState(format!(
                "sprint {} is {}, only active sprints can complete",
                sprint.name,
                sprint.status.as_str()
            )));
        }

        let destination = match move_to {
            Some(target) => {
                let target = self.require_sprint(target, Some(&sprint.project_id))?;
                if target.id == sprint.id
                    || target.project_id != sprint.project_id
                    || target.status == SprintStatus::Completed
                {
                    return Err(Error::InvalidState(format!(
                        "cannot move unfinished work to sprint {}",
                        target.name
                    )));
                }
                Some(target)
            }
            None => None,
        };

        let project = self.require_project(&sprint.project_id)?;
        let workflow = self.workflow_for_project(&project)?;
        let issues = self.list_sprint_issues(&sprint.id)?;
        let (done, unfinished): (Vec<_>, Vec<_>) =
            issues.into_iter().partition(|i| workflow.is_done(&i.status));
        let velocity: i64 = done.iter().map(crate::model::Issue::points).sum();

        self.mutate("complete_sprint", actor, |tx, ctx| {
            let now = now_ms();
            tx.execute(
                "UPDATE sprints SET status = 'completed', velocity = ?1, completed_at = ?2, updated_at = ?2
                 WHERE id = ?3",
                rusqlite::params![velocity, now, sprint.id],
            )?;

            let target_id = destination.as_ref().map(|s| s.id.as_str());
            for issue in &unfinished {
                tx.execute(
                    "UPDATE issues SET sprint_id = ?1, updated_at = ?2 WHERE id = ?3",
                    rusqlite::params![target_id, now, issue.id],
                )?;
            }

            ctx.record_change(
                "sprint",
                &sprint.id,
                EventType::SprintCompleted,
                Some(SprintStatus::Active.as_str().to_string()),
                Some(format!("velocity {velocity}")),
            );
            Ok(())
        })?;

        Ok(SprintCompletion {
            sprint: self.require_sprint(&sprint.id, None)?,
            velocity,
            completed_issues: done.len(),
            moved_issues: unfinished.len(),
            moved_to: destination.map(|s| s.name),
        })
    }

    /// Committed and completed work for a sprint.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn sprint_progress(&self, sprint: &Sprint) -> Result<SprintProgress> {
        let project = self.require_project(&sprint.project_id)?;
        let workflow = self.workflow_for_project(&project)?;
        let issues = self.list_sprint_issues(&sprint.id)?;

        let mut progress = SprintProgress {
            issue_count: issues.len(),
            ..SprintProgress::default()
        };
        for issue in &issues {
            progress.committed_points += issue.points();
            if workflow.is_done(&issue.status) {
                progress.done_count += 1;
                progress.completed_points += issue.points();
            }
        }
        Ok(progress)
    }

    fn hydrate_sprint(&self, sprint: &mut Sprint) -> Result<()> {
        sprint.team_members = load_list(
            &self.conn,
            "SELECT member FROM sprint_members WHERE sprint_id = ?1 ORDER BY member",
            &sprint.id,
        )?;
        sprint.issue_ids = load_list(
            &self.conn,
            "SELECT id FROM issues WHERE sprint_id = ?1 ORDER BY created_at",
            &sprint.id,
        )?;
        Ok(())
    }
}

fn check_dates(start: &str, end: &str) -> Result<()> {
    let start_date = parse_date(start)
        .map_err(|(input, _)| Error::InvalidArgument(format!("invalid start date '{input}'")))?;
    let end_date = parse_date(end)
        .map_err(|(input, _)| Error::InvalidArgument(format!("invalid end date '{input}'")))?;
    if end_date < start_date {
        return Err(Error::InvalidArgument(format!(
            "sprint end date {end} is before start date {start}"
        )));
    }
    Ok(())
}

pub(crate) fn map_sprint_row(row: &rusqlite::Row) -> rusqlite::Result<Sprint> {
    let status: String = row.get(5)?;
    Ok(Sprint {
        id: row.get(0)?,
        project_id: row.get(1)?,
        name: row.get(2)?,
        start_date: row.get(3)?,
        end_date: row.get(4)?,
        status: SprintStatus::from_str(&status),
        goal: row.get(6)?,
        velocity: row.get(7)?,
        capacity: row.get(8)?,
        team_members: Vec::new(),
        issue_ids: Vec::new(),
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
        started_at: row.get(11)?,
        completed_at: row.get(12)?,
    })
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{storage_with_project, ACTOR};
    use super::*;
    use crate::model::{Issue, Project};

    fn sprint(project: &Project, name: &str) -> Sprint {
        Sprint::new(
            project.id.clone(),
            name.to_string(),
            "2025-03-03".to_string(),
            "2025-03-16".to_string(),
        )
    }

    fn issue_with_points(storage: &mut SqliteStorage, project: &Project, status: &str, points: i64) -> Issue {
        let mut issue = Issue::new(project.id.clone(), format!("{status} {points}"), status.to_string());
        issue.story_points = Some(points);
        storage.create_issue(&mut issue, ACTOR).unwrap();
        issue
    }

    #[test]
    fn test_create_rejects_backwards_dates() {
        let (mut storage, project) = storage_with_project();
        let mut bad = sprint(&project, "Backwards");
        bad.end_date = "2025-03-01".into();
        assert!(matches!(
            storage.create_sprint(&bad, ACTOR),
            Err(Error::InvalidArgument(_))
        ));

        let mut bad_format = sprint(&project, "Format");
        bad_format.start_date = "03/03/2025".into();
        assert!(storage.create_sprint(&bad_format, ACTOR).is_err());
    }

    #[test]
    fn test_lookup_by_name() {
        let (mut storage, project) = storage_with_project();
        let mut s = sprint(&project, "Sprint 1");
        s.team_members = vec!["sam".into(), "alex".into()];
        storage.create_sprint(&s, ACTOR).unwrap();

        let found = storage.require_sprint("sprint 1", Some(&project.id)).unwrap();
        assert_eq!(found.id, s.id);
        assert_eq!(found.team_members, vec!["alex".to_string(), "sam".to_string()]);
    }

    #[test]
    fn test_only_one_active_sprint() {
        let (mut storage, project) = storage_with_project();
        let first = sprint(&project, "Sprint 1");
        let second = sprint(&project, "Sprint 2");
        storage.create_sprint(&first, ACTOR).unwrap();
        storage.create_sprint(&second, ACTOR).unwrap();

        let started = storage.start_sprint(&first.id, ACTOR).unwrap();
        assert_eq!(started.status, SprintStatus::Active);
        assert!(started.started_at.is_some());

        let err = storage.start_sprint(&second.id, ACTOR).unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));

        assert_eq!(storage.active_sprint(&project.id).unwrap().unwrap().id, first.id);
    }

    #[test]
    fn test_complete_computes_velocity_and_moves_work() {
        let (mut storage, project) = storage_with_project();
        let current = sprint(&project, "Sprint 1");
        let next = sprint(&project, "Sprint 2");
        storage.create_sprint(&current, ACTOR).unwrap();
        storage.create_sprint(&next, ACTOR).unwrap();

        let done = issue_with_points(&mut storage, &project, "Done", 5);
        let open = issue_with_points(&mut storage, &project, "In Progress", 3);
        storage.add_issue_to_sprint(&current.id, &done.key, ACTOR).unwrap();
        storage.add_issue_to_sprint(&current.id, &open.key, ACTOR).unwrap();

        let progress = storage
            .sprint_progress(&storage.require_sprint(&current.id, None).unwrap())
            .unwrap();
        assert_eq!(progress.committed_points, 8);
        assert_eq!(progress.completed_points, 5);
        assert_eq!(progress.percent(), 63);

        // Completing requires an active sprint
        assert!(storage.complete_sprint(&current.id, None, ACTOR).is_err());
        storage.start_sprint(&current.id, ACTOR).unwrap();

        let result = storage
            .complete_sprint(&current.id, Some("Sprint 2"), ACTOR)
            .unwrap();
        assert_eq!(result.velocity, 5);
        assert_eq!(result.completed_issues, 1);
        assert_eq!(result.moved_issues, 1);
        assert_eq!(result.moved_to.as_deref(), Some("Sprint 2"));
        assert_eq!(result.sprint.status, SprintStatus::Completed);
        assert_eq!(result.sprint.velocity, Some(5));

        let moved = storage.require_issue(&open.key).unwrap();
        assert_eq!(moved.sprint_id.as_deref(), Some(next.id.as_str()));
        let kept = storage.require_issue(&done.key).unwrap();
        assert_eq!(kept.sprint_id.as_deref(), Some(current.id.as_str()));
    }

    #[test]
    fn test_complete_to_backlog() {
        let (mut storage, project) = storage_with_project();
        let current = sprint(&project, "Sprint 1");
        storage.create_sprint(&current, ACTOR).unwrap();
        let open = issue_with_points(&mut storage, &project, "To Do", 2);
        storage.add_issue_to_sprint(&current.id, &open.key, ACTOR).unwrap();
        storage.start_sprint(&current.id, ACTOR).unwrap();

        let result = storage.complete_sprint(&current.id, None, ACTOR).unwrap();
        assert_eq!(result.velocity, 0);
        assert!(result.moved_to.is_none());
        assert!(storage.require_issue(&open.key).unwrap().sprint_id.is_none());
    }

    #[test]
    fn test_issue_membership_rules() {
        let (mut storage, project) = storage_with_project();
        let other = Project::new("Web".to_string(), Some("WEB"));
        storage.create_project(&other, ACTOR).unwrap();

        let s = sprint(&project, "Sprint 1");
        storage.create_sprint(&s, ACTOR).unwrap();
        let foreign = issue_with_points(&mut storage, &other, "To Do", 1);

        assert!(matches!(
            storage.add_issue_to_sprint(&s.id, &foreign.key, ACTOR),
            Err(Error::InvalidArgument(_))
        ));

        let local = issue_with_points(&mut storage, &project, "To Do", 1);
        assert!(storage.remove_issue_from_sprint(&s.id, &local.key, ACTOR).is_err());
        storage.add_issue_to_sprint(&s.id, &local.key, ACTOR).unwrap();
        storage.remove_issue_from_sprint(&s.id, &local.key, ACTOR).unwrap();
    }

    #[test]
    fn test_delete_detaches_issues() {
        let (mut storage, project) = storage_with_project();
        let s = sprint(&project, "Sprint 1");
        storage.create_sprint(&s, ACTOR).unwrap();
        let issue = issue_with_points(&mut storage, &project, "To Do", 1);
        storage.add_issue_to_sprint(&s.id, &issue.key, ACTOR).unwrap();

        storage.delete_sprint(&s.id, ACTOR).unwrap();
        let issue = storage.require_issue(&issue.key).unwrap();
        assert!(issue.sprint_id.is_none());
    }
}
