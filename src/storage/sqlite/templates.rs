//! Issue templates.

use rusqlite::OptionalExtension;

use super::{json_column, SqliteStorage};
use crate::error::{Error, Result};
use crate::model::{IssueType, Priority, Template};
use crate::storage::events::EventType;

const TEMPLATE_COLUMNS: &str =
    "id, name, description, issue_type, priority, title_prefix, body, labels, created_by, created_at";

impl SqliteStorage {
    /// Save a template.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyExists` when the name is taken.
    pub fn create_template(&mut self, template: &Template, actor: &str) -> Result<()> {
        if template.name.trim().is_empty() {
            return Err(Error::RequiredField("name"));
        }
        if self.get_template(&template.name)?.is_some() {
            return Err(Error::AlreadyExists {
                entity: "Template",
                name: template.name.clone(),
            });
        }

        let labels = serde_json::to_string(&template.labels)?;

        self.mutate("create_template", actor, |tx, ctx| {
            tx.execute(
                &format!("INSERT INTO templates ({TEMPLATE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"),
                rusqlite::params![
                    template.id,
                    template.name,
                    template.description,
                    template.issue_type.map(|t| t.as_str()),
                    template.priority.map(|p| p.as_str()),
                    template.title_prefix,
                    template.body,
                    labels,
                    template.created_by,
                    template.created_at,
                ],
            )?;
            ctx.record_note("template", &template.id, EventType::TemplateCreated, &template.name);
            Ok(())
        })
    }

    /// Find a template by id or (case-insensitive) name.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_template(&self, id_or_name: &str) -> Result<Option<Template>> {
        let template = self
            .conn
            .query_row(
                &format!("SELECT {TEMPLATE_COLUMNS} FROM templates WHERE id = ?1 OR name = ?1 COLLATE NOCASE"),
                [id_or_name],
                map_template_row,
            )
            .optional()?;
        Ok(template)
    }

    /// Get a template or fail with `NotFound`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if nothing matches.
    pub fn require_template(&self, id_or_name: &str) -> Result<Template> {
        self.get_template(id_or_name)?
            .ok_or_else(|| Error::not_found("Template", id_or_name))
    }

    /// All templates by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_templates(&self) -> Result<Vec<Template>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM templates ORDER BY name COLLATE NOCASE"
        ))?;
        let templates = stmt
            .query_map([], map_template_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(templates)
    }

    /// Delete a template.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if nothing matches.
    pub fn delete_template(&mut self, id_or_name: &str, actor: &str) -> Result<Template> {
        let template = self.require_template(id_or_name)?;

        self.mutate("delete_template", actor, |tx, ctx| {
            tx.execute("DELETE FROM templates WHERE id = ?1", [&template.id])?;
            ctx.record_note("template", &template.id, EventType::TemplateDeleted, &template.name);
            Ok(())
        })?;

        Ok(template)
    }
}

fn map_template_row(row: &rusqlite::Row) -> rusqlite::Result<Template> {
    let issue_type: Option<String> = row.get(3)?;
    let priority: Option<String> = row.get(4)?;
    Ok(Template {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        issue_type: issue_type.as_deref().and_then(IssueType::parse),
        priority: priority.as_deref().and_then(Priority::parse),
        title_prefix: row.get(5)?,
        body: row.get(6)?,
        labels: json_column(row, 7)?,
        created_by: row.get(8)?,
        created_at: row.get(9)?,
    })
}

#[cfg(test)]
mod tests {
    use super::super::test_support::ACTOR;
    use super::*;

    #[test]
    fn test_template_round_trip() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let mut template = Template::new("Bug report".into(), ACTOR.into());
        template.issue_type = Some(IssueType::Bug);
        template.priority = Some(Priority::High);
        template.labels = vec!["triage".into()];
        template.title_prefix = Some("[Bug] ".into());
        storage.create_template(&template, ACTOR).unwrap();

        let loaded = storage.require_template("bug report").unwrap();
        assert_eq!(loaded.issue_type, Some(IssueType::Bug));
        assert_eq!(loaded.priority, Some(Priority::High));
        assert_eq!(loaded.labels, vec!["triage".to_string()]);

        let dup = Template::new("BUG REPORT".into(), ACTOR.into());
        assert!(matches!(
            storage.create_template(&dup, ACTOR),
            Err(Error::AlreadyExists { .. })
        ));

        storage.delete_template(&template.id, ACTOR).unwrap();
        assert!(storage.list_templates().unwrap().is_empty());
    }
}
