//! Epic operations.

use rusqlite::OptionalExtension;

use super::{load_list, now_ms, SqliteStorage};
use crate::error::{Error, Result};
use crate::model::epic::normalize_epic_status;
use crate::model::{Epic, EPIC_STATUSES};
use crate::storage::events::EventType;

const EPIC_COLUMNS: &str = "id, key, project_id, title, description, status, assignee, created_at, updated_at";

/// Field changes for [`SqliteStorage::update_epic`].
#[derive(Debug, Clone, Default)]
pub struct EpicUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub assignee: Option<Option<String>>,
}

impl SqliteStorage {
    /// Create an epic, allocating its `KEY-EPIC-N` key.
    ///
    /// # Errors
    ///
    /// Returns `ProjectNotFound` or `InvalidStatus` for an unknown status.
    pub fn create_epic(&mut self, epic: &mut Epic, actor: &str) -> Result<()> {
        let project = self.require_project(&epic.project_id)?;
        epic.project_id.clone_from(&project.id);
        epic.status = canonical_status(&epic.status)?.to_string();
        if epic.title.trim().is_empty() {
            return Err(Error::RequiredField("title"));
        }

        self.mutate("create_epic", actor, |tx, ctx| {
            let (key, next): (String, i64) = tx.query_row(
                "SELECT key, next_epic_number FROM projects WHERE id = ?1",
                [&project.id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            epic.key = format!("{key}-EPIC-{next}");

            tx.execute(
                "UPDATE projects SET next_epic_number = next_epic_number + 1 WHERE id = ?1",
                [&project.id],
            )?;
            tx.execute(
                &format!("INSERT INTO epics ({EPIC_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
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

            ctx.record_note("epic", &epic.id, EventType::EpicCreated, &epic.key);
            Ok(())
        })
    }

    /// Find an epic by id or key, with derived point totals.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_epic(&self, id_or_key: &str) -> Result<Option<Epic>> {
        let epic = self
            .conn
            .query_row(
                &format!("SELECT {EPIC_COLUMNS} FROM epics WHERE id = ?1 OR key = upper(?1)"),
                [id_or_key],
                map_epic_row,
            )
            .optional()?;

        match epic {
            Some(mut epic) => {
                self.derive_epic_points(&mut epic)?;
                Ok(Some(epic))
            }
            None => Ok(None),
        }
    }

    /// Get an epic or fail with `NotFound`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if nothing matches.
    pub fn require_epic(&self, id_or_key: &str) -> Result<Epic> {
        self.get_epic(id_or_key)?
            .ok_or_else(|| Error::not_found("Epic", id_or_key))
    }

    /// List a project's epics, optionally filtered.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_epics(
        &self,
        project_id: &str,
        status: Option<&str>,
        assignee: Option<&str>,
    ) -> Result<Vec<Epic>> {
        let status = status.map(canonical_status).transpose()?;

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {EPIC_COLUMNS} FROM epics
             WHERE project_id = ?1
               AND (?2 IS NULL OR status = ?2)
               AND (?3 IS NULL OR assignee = ?3)
             ORDER BY created_at"
        ))?;
        let mut epics = stmt
            .query_map(rusqlite::params![project_id, status, assignee], map_epic_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        for epic in &mut epics {
            self.derive_epic_points(epic)?;
        }
        Ok(epics)
    }

    /// Update an epic.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `InvalidStatus`.
    pub fn update_epic(&mut self, id_or_key: &str, update: &EpicUpdate, actor: &str) -> Result<Epic> {
        let epic = self.require_epic(id_or_key)?;
        let status = update.status.as_deref().map(canonical_status).transpose()?;

        self.mutate("update_epic", actor, |tx, ctx| {
            let mut set_clauses = vec!["updated_at = ?"];
            let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(now_ms())];

            if let Some(t) = &update.title {
                set_clauses.push("title = ?");
                params.push(Box::new(t.clone()));
            }
            if let Some(d) = &update.description {
                set_clauses.push("description = ?");
                params.push(Box::new(d.clone()));
            }
            if let Some(s) = status {
                set_clauses.push("status = ?");
                params.push(Box::new(s));
            }
            if let Some(a) = &update.assignee {
                set_clauses.push("assignee = ?");
                params.push(Box::new(a.clone()));
            }

            let sql = format!("UPDATE epics SET {} WHERE id = ?", set_clauses.join(", "));
            params.push(Box::new(epic.id.clone()));
            let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(AsRef::as_ref).collect();
            tx.execute(&sql, param_refs.as_slice())?;

            match status {
                Some(s) if s != epic.status => ctx.record_change(
                    "epic",
                    &epic.id,
                    EventType::StatusChanged,
                    Some(epic.status.clone()),
                    Some(s.to_string()),
                ),
                _ => ctx.record_event("epic", &epic.id, EventType::EpicUpdated),
            }
            Ok(())
        })?;

        self.require_epic(&epic.id)
    }

    /// Delete an epic. Member issues are kept and lose their epic.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the epic doesn't exist.
    pub fn delete_epic(&mut self, id_or_key: &str, actor: &str) -> Result<Epic> {
        let epic = self.require_epic(id_or_key)?;

        self.mutate("delete_epic", actor, |tx, ctx| {
            tx.execute("DELETE FROM epics WHERE id = ?1", [&epic.id])?;
            ctx.record_note("epic", &epic.id, EventType::EpicDeleted, &epic.key);
            Ok(())
        })?;

        Ok(epic)
    }

    /// Attach an issue to an epic of the same project.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` across projects.
    pub fn add_issue_to_epic(&mut self, epic: &str, issue: &str, actor: &str) -> Result<()> {
        let epic = self.require_epic(epic)?;
        let issue = self.require_issue(issue)?;

        if issue.project_id != epic.project_id {
            return Err(Error::InvalidArgument(format!(
                "{} belongs to another project than epic {}",
                issue.key, epic.key
            )));
        }

        self.mutate("add_issue_to_epic", actor, |tx, ctx| {
            tx.execute(
                "UPDATE issues SET epic_id = ?1, updated_at = ?2 WHERE id = ?3",
                rusqlite::params![epic.id, now_ms(), issue.id],
            )?;
            ctx.record_note("epic", &epic.id, EventType::EpicIssueAdded, &issue.key);
            Ok(())
        })
    }

    /// Detach an issue from an epic.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if the issue is not in the epic.
    pub fn remove_issue_from_epic(&mut self, epic: &str, issue: &str, actor: &str) -> Result<()> {
        let epic = self.require_epic(epic)?;
        let issue = self.require_issue(issue)?;

        if issue.epic_id.as_deref() != Some(epic.id.as_str()) {
            return Err(Error::InvalidState(format!(
                "{} is not in epic {}",
                issue.key, epic.key
            )));
        }

        self.mutate("remove_issue_from_epic", actor, |tx, ctx| {
            tx.execute(
                "UPDATE issues SET epic_id = NULL, updated_at = ?1 WHERE id = ?2",
                rusqlite::params![now_ms(), issue.id],
            )?;
            ctx.record_note("epic", &epic.id, EventType::EpicIssueRemoved, &issue.key);
            Ok(())
        })
    }

    fn derive_epic_points(&self, epic: &mut Epic) -> Result<()> {
        epic.issue_ids = load_list(
            &self.conn,
            "SELECT id FROM issues WHERE epic_id = ?1 ORDER BY created_at",
            &epic.id,
        )?;

        let project = self.require_project(&epic.project_id)?;
        let workflow = self.workflow_for_project(&project)?;

        let mut stmt = self
            .conn
            .prepare_cached("SELECT status, story_points FROM issues WHERE epic_id = ?1")?;
        let rows = stmt
            .query_map([&epic.id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Option<i64>>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        epic.story_points = 0;
        epic.completed_story_points = 0;
        for (status, points) in rows {
            let points = points.unwrap_or(0);
            epic.story_points += points;
            if workflow.is_done(&status) {
                epic.completed_story_points += points;
            }
        }
        Ok(())
    }
}

fn canonical_status(input: &str) -> Result<&'static str> {
    normalize_epic_status(input).ok_or_else(|| Error::InvalidStatus {
        status: input.to_string(),
        workflow: "epic".to_string(),
        valid: EPIC_STATUSES.iter().map(ToString::to_string).collect(),
    })
}

fn map_epic_row(row: &rusqlite::Row) -> rusqlite::Result<Epic> {
    Ok(Epic {
        id: row.get(0)?,
        key: row.get(1)?,
        project_id: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        status: row.get(5)?,
        assignee: row.get(6)?,
        story_points: 0,
        completed_story_points: 0,
        issue_ids: Vec::new(),
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{storage_with_project, ACTOR};
    use super::*;
    use crate::model::Issue;

    #[test]
    fn test_keys_are_sequential() {
        let (mut storage, project) = storage_with_project();
        let mut first = Epic::new(project.id.clone(), "Auth".into());
        let mut second = Epic::new(project.id.clone(), "Payments".into());
        storage.create_epic(&mut first, ACTOR).unwrap();
        storage.create_epic(&mut second, ACTOR).unwrap();

        assert_eq!(first.key, "MOB-EPIC-1");
        assert_eq!(second.key, "MOB-EPIC-2");
        assert_eq!(storage.require_epic("mob-epic-2").unwrap().title, "Payments");
    }

    #[test]
    fn test_points_derived_from_issues() {
        let (mut storage, project) = storage_with_project();
        let mut epic = Epic::new(project.id.clone(), "Auth".into());
        storage.create_epic(&mut epic, ACTOR).unwrap();

        for (status, points) in [("Done", 8), ("In Progress", 13)] {
            let mut issue = Issue::new(project.id.clone(), format!("{status} work"), status.into());
            issue.story_points = Some(points);
            storage.create_issue(&mut issue, ACTOR).unwrap();
            storage.add_issue_to_epic(&epic.key, &issue.key, ACTOR).unwrap();
        }

        let epic = storage.require_epic(&epic.key).unwrap();
        assert_eq!(epic.story_points, 21);
        assert_eq!(epic.completed_story_points, 8);
        assert_eq!(epic.progress(), 38);
        assert_eq!(epic.issue_ids.len(), 2);
    }

    #[test]
    fn test_update_normalizes_status() {
        let (mut storage, project) = storage_with_project();
        let mut epic = Epic::new(project.id.clone(), "Auth".into());
        storage.create_epic(&mut epic, ACTOR).unwrap();

        let update = EpicUpdate {
            status: Some("in_progress".into()),
            ..EpicUpdate::default()
        };
        let updated = storage.update_epic(&epic.key, &update, ACTOR).unwrap();
        assert_eq!(updated.status, "In Progress");

        let bad = EpicUpdate {
            status: Some("Blocked".into()),
            ..EpicUpdate::default()
        };
        assert!(matches!(
            storage.update_epic(&epic.key, &bad, ACTOR),
            Err(Error::InvalidStatus { .. })
        ));

        let filtered = storage.list_epics(&project.id, Some("in progress"), None).unwrap();
        assert_eq!(filtered.len(), 1);
    }

    #[test]
    fn test_delete_keeps_issues() {
        let (mut storage, project) = storage_with_project();
        let mut epic = Epic::new(project.id.clone(), "Auth".into());
        storage.create_epic(&mut epic, ACTOR).unwrap();
        let mut issue = Issue::new(project.id.clone(), "Login".into(), "To Do".into());
        storage.create_issue(&mut issue, ACTOR).unwrap();
        storage.add_issue_to_epic(&epic.key, &issue.key, ACTOR).unwrap();

        storage.delete_epic(&epic.key, ACTOR).unwrap();
        let issue = storage.require_issue(&issue.key).unwrap();
        assert!(issue.epic_id.is_none());
    }
}
