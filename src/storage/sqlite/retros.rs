//! Retrospective feedback.

use rusqlite::OptionalExtension;

use super::{now_ms, SqliteStorage};
use crate::error::{Error, Result};
use crate::model::{Feedback, FeedbackType};
use crate::storage::events::EventType;

const FEEDBACK_COLUMNS: &str =
    "id, project_id, sprint_id, feedback_type, text, author, resolved, created_at, updated_at";

impl SqliteStorage {
    /// Add a feedback card.
    ///
    /// # Errors
    ///
    /// Returns `RequiredField` for empty text, or `InvalidArgument` when
    /// the sprint belongs to another project.
    pub fn add_feedback(&mut self, feedback: &Feedback, actor: &str) -> Result<()> {
        if feedback.text.trim().is_empty() {
            return Err(Error::RequiredField("text"));
        }
        self.require_project(&feedback.project_id)?;
        if let Some(sprint_id) = &feedback.sprint_id {
            super::issues::check_same_project(&self.conn, "sprints", "Sprint", sprint_id, &feedback.project_id)?;
        }

        self.mutate("add_feedback", actor, |tx, ctx| {
            tx.execute(
                &format!("INSERT INTO retro_feedback ({FEEDBACK_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
                rusqlite::params![
                    feedback.id,
                    feedback.project_id,
                    feedback.sprint_id,
                    feedback.feedback_type.as_str(),
                    feedback.text,
                    feedback.author,
                    feedback.resolved,
                    feedback.created_at,
                    feedback.updated_at,
                ],
            )?;
            ctx.record_note("retro", &feedback.id, EventType::FeedbackAdded, feedback.feedback_type.as_str());
            Ok(())
        })
    }

    /// Get a feedback card.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if it doesn't exist.
    pub fn get_feedback(&self, id: &str) -> Result<Feedback> {
        self.conn
            .query_row(
                &format!("SELECT {FEEDBACK_COLUMNS} FROM retro_feedback WHERE id = ?1"),
                [id],
                map_feedback_row,
            )
            .optional()?
            .ok_or_else(|| Error::not_found("Retro", id))
    }

    /// List a project's feedback in creation order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_feedback(
        &self,
        project_id: &str,
        sprint_id: Option<&str>,
        feedback_type: Option<FeedbackType>,
        unresolved_only: bool,
    ) -> Result<Vec<Feedback>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {FEEDBACK_COLUMNS} FROM retro_feedback
             WHERE project_id = ?1
               AND (?2 IS NULL OR sprint_id = ?2)
               AND (?3 IS NULL OR feedback_type = ?3)
               AND (?4 = 0 OR resolved = 0)
             ORDER BY created_at"
        ))?;
        let feedback = stmt
            .query_map(
                rusqlite::params![
                    project_id,
                    sprint_id,
                    feedback_type.map(|t| t.as_str()),
                    unresolved_only,
                ],
                map_feedback_row,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(feedback)
    }

    /// Replace a card's text.
    ///
    /// # Errors
    ///
    /// Returns `RequiredField` or `NotFound`.
    pub fn edit_feedback(&mut self, id: &str, text: &str, actor: &str) -> Result<Feedback> {
        let feedback = self.get_feedback(id)?;
        if text.trim().is_empty() {
            return Err(Error::RequiredField("text"));
        }

        self.mutate("edit_feedback", actor, |tx, ctx| {
            tx.execute(
                "UPDATE retro_feedback SET text = ?1, updated_at = ?2 WHERE id = ?3",
                rusqlite::params![text, now_ms(), feedback.id],
            )?;
            ctx.record_change(
                "retro",
                &feedback.id,
                EventType::FeedbackUpdated,
                Some(feedback.text.clone()),
                Some(text.to_string()),
            );
            Ok(())
        })?;

        self.get_feedback(&feedback.id)
    }

    /// Mark a card resolved or reopen it.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if it doesn't exist.
    pub fn set_feedback_resolved(&mut self, id: &str, resolved: bool, actor: &str) -> Result<Feedback> {
        let feedback = self.get_feedback(id)?;

        self.mutate("set_feedback_resolved", actor, |tx, ctx| {
            tx.execute(
                "UPDATE retro_feedback SET resolved = ?1, updated_at = ?2 WHERE id = ?3",
                rusqlite::params![resolved, now_ms(), feedback.id],
            )?;
            let event = if resolved {
                EventType::FeedbackResolved
            } else {
                EventType::FeedbackReopened
            };
            ctx.record_event("retro", &feedback.id, event);
            Ok(())
        })?;

        self.get_feedback(&feedback.id)
    }

    /// Delete a card.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if it doesn't exist.
    pub fn delete_feedback(&mut self, id: &str, actor: &str) -> Result<Feedback> {
        let feedback = self.get_feedback(id)?;

        self.mutate("delete_feedback", actor, |tx, ctx| {
            tx.execute("DELETE FROM retro_feedback WHERE id = ?1", [&feedback.id])?;
            ctx.record_event("retro", &feedback.id, EventType::FeedbackDeleted);
            Ok(())
        })?;

        Ok(feedback)
    }
}

fn map_feedback_row(row: &rusqlite::Row) -> rusqlite::Result<Feedback> {
    let feedback_type: String = row.get(3)?;
    Ok(Feedback {
        id: row.get(0)?,
        project_id: row.get(1)?,
        sprint_id: row.get(2)?,
        feedback_type: FeedbackType::from_str(&feedback_type),
        text: row.get(4)?,
        author: row.get(5)?,
        resolved: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{storage_with_project, ACTOR};
    use super::*;
    use crate::model::Sprint;

    #[test]
    fn test_feedback_lifecycle() {
        let (mut storage, project) = storage_with_project();
        let card = Feedback::new(
            project.id.clone(),
            FeedbackType::ActionItem,
            "Automate releases".into(),
            ACTOR.into(),
        );
        storage.add_feedback(&card, ACTOR).unwrap();

        let edited = storage.edit_feedback(&card.id, "Automate the release build", ACTOR).unwrap();
        assert_eq!(edited.text, "Automate the release build");

        let resolved = storage.set_feedback_resolved(&card.id, true, ACTOR).unwrap();
        assert!(resolved.resolved);
        assert!(storage.list_feedback(&project.id, None, None, true).unwrap().is_empty());

        storage.set_feedback_resolved(&card.id, false, ACTOR).unwrap();
        assert_eq!(storage.list_feedback(&project.id, None, None, true).unwrap().len(), 1);

        storage.delete_feedback(&card.id, ACTOR).unwrap();
        assert!(storage.get_feedback(&card.id).is_err());
    }

    #[test]
    fn test_filters_by_sprint_and_type() {
        let (mut storage, project) = storage_with_project();
        let sprint = Sprint::new(
            project.id.clone(),
            "Sprint 1".into(),
            "2025-03-03".into(),
            "2025-03-16".into(),
        );
        storage.create_sprint(&sprint, ACTOR).unwrap();

        let mut in_sprint = Feedback::new(project.id.clone(), FeedbackType::WentWell, "Pairing".into(), ACTOR.into());
        in_sprint.sprint_id = Some(sprint.id.clone());
        storage.add_feedback(&in_sprint, ACTOR).unwrap();
        let loose = Feedback::new(project.id.clone(), FeedbackType::ToImprove, "Flaky CI".into(), ACTOR.into());
        storage.add_feedback(&loose, ACTOR).unwrap();

        let sprint_cards = storage.list_feedback(&project.id, Some(&sprint.id), None, false).unwrap();
        assert_eq!(sprint_cards.len(), 1);
        assert_eq!(sprint_cards[0].feedback_type, FeedbackType::WentWell);

        let improve = storage
            .list_feedback(&project.id, None, Some(FeedbackType::ToImprove), false)
            .unwrap();
        assert_eq!(improve[0].text, "Flaky CI");
    }

    #[test]
    fn test_empty_text_rejected() {
        let (mut storage, project) = storage_with_project();
        let card = Feedback::new(project.id.clone(), FeedbackType::WentWell, "  ".into(), ACTOR.into());
        assert!(matches!(storage.add_feedback(&card, ACTOR), Err(Error::RequiredField(_))));
    }
}
