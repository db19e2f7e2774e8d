//! Project operations.

use rusqlite::OptionalExtension;

use super::{now_ms, MutationContext, SqliteStorage};
use crate::error::{Error, Result};
use crate::model::Project;
use crate::storage::events::EventType;
use crate::workflow::Workflow;

pub(crate) const PROJECT_COLUMNS: &str = "id, key, name, description, lead, workflow_id, organization_id, \
     next_issue_number, next_epic_number, created_at, updated_at";

impl SqliteStorage {
    /// Create a new project.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyExists` if the key is taken, `NotFound` if the
    /// workflow does not exist, or a database error.
    pub fn create_project(&mut self, project: &Project, actor: &str) -> Result<()> {
        if self.get_workflow(&project.workflow_id)?.is_none() {
            return Err(Error::not_found("Workflow", &project.workflow_id));
        }

        self.mutate("create_project", actor, |tx, ctx| {
            let exists: bool = tx
                .prepare("SELECT 1 FROM projects WHERE key = ?1")?
                .exists([&project.key])?;
            if exists {
                return Err(Error::AlreadyExists {
                    entity: "Project",
                    name: project.key.clone(),
                });
            }

            tx.execute(
                &format!("INSERT INTO projects ({PROJECT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"),
                rusqlite::params![
                    project.id,
                    project.key,
                    project.name,
                    project.description,
                    project.lead,
                    project.workflow_id,
                    project.organization_id,
                    project.next_issue_number,
                    project.next_epic_number,
                    project.created_at,
                    project.updated_at,
                ],
            )?;

            ctx.record_note("project", &project.id, EventType::ProjectCreated, &project.key);
            Ok(())
        })
    }

    /// Get a project by id or key (keys match case-insensitively).
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_project(&self, id_or_key: &str) -> Result<Option<Project>> {
        let project = self
            .conn
            .query_row(
                &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?1 OR key = upper(?1)"),
                [id_or_key],
                map_project_row,
            )
            .optional()?;
        Ok(project)
    }

    /// Get a project or fail with `ProjectNotFound`.
    ///
    /// # Errors
    ///
    /// Returns `ProjectNotFound` if nothing matches.
    pub fn require_project(&self, id_or_key: &str) -> Result<Project> {
        self.get_project(id_or_key)?
            .ok_or_else(|| Error::ProjectNotFound {
                id: id_or_key.to_string(),
            })
    }

    /// List all projects ordered by key.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_projects(&self) -> Result<Vec<Project>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {PROJECT_COLUMNS} FROM projects ORDER BY key"))?;

        let projects = stmt
            .query_map([], map_project_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(projects)
    }

    /// Update a project's descriptive fields.
    ///
    /// `lead` and `organization_id` take `Some(None)` to clear the value.
    ///
    /// # Errors
    ///
    /// Returns `ProjectNotFound` if the project doesn't exist.
    pub fn update_project(
        &mut self,
        id: &str,
        name: Option<&str>,
        description: Option<&str>,
        lead: Option<Option<&str>>,
        organization_id: Option<Option<&str>>,
        actor: &str,
    ) -> Result<Project> {
        let project = self.require_project(id)?;

        if let Some(Some(org)) = organization_id {
            self.require_organization(org)?;
        }

        self.mutate("update_project", actor, |tx, ctx| {
            let mut updates = vec!["updated_at = ?"];
            let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(now_ms())];

            if let Some(n) = name {
                updates.push("name = ?");
                params.push(Box::new(n.to_string()));
            }
            if let Some(d) = description {
                updates.push("description = ?");
                params.push(Box::new(d.to_string()));
            }
            if let Some(l) = lead {
                updates.push("lead = ?");
                params.push(Box::new(l.map(ToString::to_string)));
            }
            if let Some(o) = organization_id {
                updates.push("organization_id = ?");
                params.push(Box::new(o.map(ToString::to_string)));
            }

            params.push(Box::new(project.id.clone()));
            let sql = format!("UPDATE projects SET {} WHERE id = ?", updates.join(", "));
            let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(AsRef::as_ref).collect();
            tx.execute(&sql, param_refs.as_slice())?;

            ctx.record_event("project", &project.id, EventType::ProjectUpdated);
            Ok(())
        })?;

        self.require_project(&project.id)
    }

    /// Delete a project and everything it owns.
    ///
    /// # Errors
    ///
    /// Returns `ProjectNotFound` if the project doesn't exist.
    pub fn delete_project(&mut self, id: &str, actor: &str) -> Result<Project> {
        let project = self.require_project(id)?;

        self.mutate("delete_project", actor, |tx, ctx| {
            tx.execute("DELETE FROM projects WHERE id = ?1", [&project.id])?;
            tx.execute(
                "DELETE FROM settings WHERE key = 'current_project' AND value = ?1",
                [&project.key],
            )?;
            ctx.record_note("project", &project.id, EventType::ProjectDeleted, &project.key);
            Ok(())
        })?;

        Ok(project)
    }

    /// Switch a project to another workflow.
    ///
    /// Issues whose status does not exist in the new workflow move to its
    /// initial status. Returns how many issues were remapped.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown workflow or `ProjectNotFound`.
    pub fn set_project_workflow(
        &mut self,
        project_id: &str,
        workflow_id: &str,
        actor: &str,
    ) -> Result<(Project, usize)> {
        let project = self.require_project(project_id)?;
        let workflow = self
            .get_workflow(workflow_id)?
            .ok_or_else(|| Error::not_found("Workflow", workflow_id))?;

        let remapped = self.mutate("set_project_workflow", actor, |tx, ctx| {
            tx.execute(
                "UPDATE projects SET workflow_id = ?1, updated_at = ?2 WHERE id = ?3",
                rusqlite::params![workflow.id, now_ms(), project.id],
            )?;
            ctx.record_change(
                "project",
                &project.id,
                EventType::WorkflowSelected,
                Some(project.workflow_id.clone()),
                Some(workflow.id.clone()),
            );
            remap_statuses(tx, ctx, &project.id, &workflow)
        })?;

        Ok((self.require_project(&project.id)?, remapped))
    }

    /// Known projects as `(key, name)` pairs, for hints.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn project_choices(&self) -> Result<Vec<(String, String)>> {
        Ok(self
            .list_projects()?
            .into_iter()
            .map(|p| (p.key, p.name))
            .collect())
    }
}

/// Move issues whose status is not in `workflow` to its initial status.
pub(crate) fn remap_statuses(
    tx: &rusqlite::Transaction,
    ctx: &mut MutationContext,
    project_id: &str,
    workflow: &Workflow,
) -> Result<usize> {
    let issues: Vec<(String, String)> = tx
        .prepare("SELECT id, status FROM issues WHERE project_id = ?1")?
        .query_map([project_id], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<std::result::Result<_, _>>()?;

    let initial = workflow.initial_status();
    let now = now_ms();
    let mut remapped = 0;

    for (issue_id, status) in issues {
        match workflow.resolve_status(&status) {
            Some(canonical) if canonical == status => {}
            resolved => {
                let target = resolved.unwrap_or(initial);
                tx.execute(
                    "UPDATE issues SET status = ?1, updated_at = ?2 WHERE id = ?3",
                    rusqlite::params![target, now, issue_id],
                )?;
                ctx.record_change(
                    "issue",
                    &issue_id,
                    EventType::StatusChanged,
                    Some(status),
                    Some(target.to_string()),
                );
                remapped += 1;
            }
        }
    }

    Ok(remapped)
}

pub(crate) fn map_project_row(row: &rusqlite::Row) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        key: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        lead: row.get(4)?,
        workflow_id: row.get(5)?,
        organization_id: row.get(6)?,
        next_issue_number: row.get(7)?,
        next_epic_number: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{storage_with_project, ACTOR};
    use super::*;
    use crate::model::Issue;

    #[test]
    fn test_project_crud() {
        let (mut storage, project) = storage_with_project();

        let by_key = storage.get_project("mob").unwrap().unwrap();
        assert_eq!(by_key.id, project.id);

        let updated = storage
            .update_project(&project.id, Some("Mobile App"), None, Some(Some("sam")), None, ACTOR)
            .unwrap();
        assert_eq!(updated.name, "Mobile App");
        assert_eq!(updated.lead.as_deref(), Some("sam"));

        assert_eq!(storage.list_projects().unwrap().len(), 1);

        storage.delete_project("MOB", ACTOR).unwrap();
        assert!(storage.get_project("MOB").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let (mut storage, _) = storage_with_project();
        let dup = Project::new("Mobile Two".to_string(), Some("MOB"));
        let err = storage.create_project(&dup, ACTOR).unwrap_err();
        assert!(matches!(err, Error::AlreadyExists { .. }));
    }

    #[test]
    fn test_unknown_workflow_rejected() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let mut project = Project::new("Web".to_string(), Some("WEB"));
        project.workflow_id = "kanban".to_string();
        assert!(storage.create_project(&project, ACTOR).is_err());
    }

    #[test]
    fn test_switching_workflow_remaps_statuses() {
        let (mut storage, project) = storage_with_project();
        let mut issue = Issue::new(project.id.clone(), "Crash".into(), "In Progress".into());
        storage.create_issue(&mut issue, ACTOR).unwrap();
        let mut done = Issue::new(project.id.clone(), "Old".into(), "Done".into());
        storage.create_issue(&mut done, ACTOR).unwrap();

        let (project, remapped) = storage.set_project_workflow("MOB", "bug", ACTOR).unwrap();
        assert_eq!(project.workflow_id, "bug");
        // "In Progress" exists in the bug workflow; "Done" does not.
        assert_eq!(remapped, 1);

        let done = storage.require_issue(&done.key).unwrap();
        assert_eq!(done.status, "Open");
        let kept = storage.require_issue(&issue.key).unwrap();
        assert_eq!(kept.status, "In Progress");
    }
}
