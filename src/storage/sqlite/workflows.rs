//! Workflow operations.
//!
//! Built-in workflows live in code and are merged in front of the custom
//! ones stored in the `workflows` table.

use rusqlite::OptionalExtension;
use tracing::warn;

use super::projects::remap_statuses;
use super::{json_column, SqliteStorage};
use crate::error::{Error, Result};
use crate::model::Project;
use crate::storage::events::EventType;
use crate::workflow::{builtin_workflow, fallback_workflow, status_slug, Workflow, BUILTIN_WORKFLOWS};

const WORKFLOW_COLUMNS: &str = "id, name, description, color, statuses, transitions, created_at";

impl SqliteStorage {
    /// List built-in workflows followed by custom ones (by name).
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_workflows(&self) -> Result<Vec<Workflow>> {
        let mut workflows: Vec<Workflow> = BUILTIN_WORKFLOWS.clone();

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {WORKFLOW_COLUMNS} FROM workflows ORDER BY name COLLATE NOCASE"
        ))?;
        let custom = stmt
            .query_map([], map_workflow_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        workflows.extend(custom);
        Ok(workflows)
    }

    /// Find a workflow by id or (case-insensitive) name.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_workflow(&self, id_or_name: &str) -> Result<Option<Workflow>> {
        if let Some(builtin) = builtin_workflow(id_or_name) {
            return Ok(Some(builtin.clone()));
        }
        if let Some(builtin) = BUILTIN_WORKFLOWS
            .iter()
            .find(|w| status_slug(&w.name) == status_slug(id_or_name))
        {
            return Ok(Some(builtin.clone()));
        }

        let workflow = self
            .conn
            .query_row(
                &format!(
                    "SELECT {WORKFLOW_COLUMNS} FROM workflows
                     WHERE id = ?1 OR name = ?1 COLLATE NOCASE"
                ),
                [id_or_name],
                map_workflow_row,
            )
            .optional()?;
        Ok(workflow)
    }

    /// The workflow governing a project's issues.
    ///
    /// Falls back to the first built-in if the stored id no longer resolves.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn workflow_for_project(&self, project: &Project) -> Result<Workflow> {
        match self.get_workflow(&project.workflow_id)? {
            Some(workflow) => Ok(workflow),
            None => {
                warn!(
                    project = %project.key,
                    workflow = %project.workflow_id,
                    "Project workflow missing, using fallback"
                );
                Ok(fallback_workflow().clone())
            }
        }
    }

    /// Save a custom workflow.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a malformed workflow, or
    /// `AlreadyExists` when the name is taken.
    pub fn create_workflow(&mut self, workflow: &Workflow, actor: &str) -> Result<()> {
        workflow.validate()?;

        if self.get_workflow(&workflow.name)?.is_some() || builtin_workflow(&workflow.id).is_some() {
            return Err(Error::AlreadyExists {
                entity: "Workflow",
                name: workflow.name.clone(),
            });
        }

        let statuses = serde_json::to_string(&workflow.statuses)?;
        let transitions = serde_json::to_string(&workflow.transitions)?;

        self.mutate("create_workflow", actor, |tx, ctx| {
            tx.execute(
                &format!("INSERT INTO workflows ({WORKFLOW_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
                rusqlite::params![
                    workflow.id,
                    workflow.name,
                    workflow.description,
                    workflow.color,
                    statuses,
                    transitions,
                    workflow.created_at,
                ],
            )?;
            ctx.record_note("workflow", &workflow.id, EventType::WorkflowCreated, &workflow.name);
            Ok(())
        })
    }

    /// Delete a custom workflow.
    ///
    /// Projects using it move to the fallback workflow and their issues are
    /// remapped into its statuses. Returns the number of projects moved.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` for built-ins or `NotFound` for unknown ids.
    pub fn delete_workflow(&mut self, id_or_name: &str, actor: &str) -> Result<usize> {
        let workflow = self
            .get_workflow(id_or_name)?
            .ok_or_else(|| Error::not_found("Workflow", id_or_name))?;

        if workflow.builtin {
            return Err(Error::InvalidState(format!(
                "{} is built in and cannot be deleted",
                workflow.name
            )));
        }

        let fallback = fallback_workflow();

        self.mutate("delete_workflow", actor, |tx, ctx| {
            let projects: Vec<String> = tx
                .prepare("SELECT id FROM projects WHERE workflow_id = ?1")?
                .query_map([&workflow.id], |row| row.get(0))?
                .collect::<std::result::Result<_, _>>()?;

            for project_id in &projects {
                tx.execute(
                    "UPDATE projects SET workflow_id = ?1, updated_at = ?2 WHERE id = ?3",
                    rusqlite::params![fallback.id, super::now_ms(), project_id],
                )?;
                ctx.record_change(
                    "project",
                    project_id,
                    EventType::WorkflowSelected,
                    Some(workflow.id.clone()),
                    Some(fallback.id.clone()),
                );
                remap_statuses(tx, ctx, project_id, fallback)?;
            }

            tx.execute("DELETE FROM workflows WHERE id = ?1", [&workflow.id])?;
            ctx.record_note("workflow", &workflow.id, EventType::WorkflowDeleted, &workflow.name);
            Ok(projects.len())
        })
    }
}

fn map_workflow_row(row: &rusqlite::Row) -> rusqlite::Result<Workflow> {
    Ok(Workflow {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        color: row.get(3)?,
        statuses: json_column(row, 4)?,
        transitions: json_column(row, 5)?,
        builtin: false,
        created_at: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{storage_with_project, ACTOR};
    use super::*;
    use crate::model::Issue;
    use crate::workflow::Transition;

    fn review_workflow() -> Workflow {
        let mut workflow = Workflow::new("Review Flow".to_string());
        workflow.statuses = vec!["Draft".into(), "Review".into(), "Published".into()];
        workflow.transitions = vec![
            Transition::new("Submit", "Draft", "Review"),
            Transition::new("Publish", "Review", "Published"),
        ];
        workflow
    }

    #[test]
    fn test_builtins_listed_first() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        storage.create_workflow(&review_workflow(), ACTOR).unwrap();

        let all = storage.list_workflows().unwrap();
        let ids: Vec<&str> = all.iter().map(|w| w.id.as_str()).collect();
        assert_eq!(&ids[..3], &["agile", "bug", "feature"]);
        assert_eq!(all.len(), 4);
        assert_eq!(all[3].statuses.len(), 3);
    }

    #[test]
    fn test_lookup_by_name() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        storage.create_workflow(&review_workflow(), ACTOR).unwrap();
        assert!(storage.get_workflow("review flow").unwrap().is_some());
        assert_eq!(storage.get_workflow("Bug Workflow").unwrap().unwrap().id, "bug");
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        storage.create_workflow(&review_workflow(), ACTOR).unwrap();
        let err = storage.create_workflow(&review_workflow(), ACTOR).unwrap_err();
        assert!(matches!(err, Error::AlreadyExists { .. }));
    }

    #[test]
    fn test_builtin_cannot_be_deleted() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let err = storage.delete_workflow("agile", ACTOR).unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[test]
    fn test_delete_moves_projects_to_fallback() {
        let (mut storage, project) = storage_with_project();
        let workflow = review_workflow();
        storage.create_workflow(&workflow, ACTOR).unwrap();
        storage
            .set_project_workflow(&project.id, &workflow.id, ACTOR)
            .unwrap();

        let mut issue = Issue::new(project.id.clone(), "Post".into(), "Review".into());
        storage.create_issue(&mut issue, ACTOR).unwrap();

        let moved = storage.delete_workflow("Review Flow", ACTOR).unwrap();
        assert_eq!(moved, 1);

        let project = storage.require_project("MOB").unwrap();
        assert_eq!(project.workflow_id, "agile");
        let issue = storage.require_issue(&issue.key).unwrap();
        assert_eq!(issue.status, "To Do");
    }
}
