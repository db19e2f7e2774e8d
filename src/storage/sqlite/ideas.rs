//! Idea board operations.

use rusqlite::OptionalExtension;

use super::issues::insert_issue;
use super::{insert_list, load_list, now_ms, SqliteStorage};
use crate::error::{Error, Result};
use crate::model::{new_id, Idea, IdeaCategory, IdeaComment, IdeaStatus, Impact, Issue, IssueType, Project};
use crate::storage::events::EventType;

const IDEA_COLUMNS: &str = "id, title, description, category, impact, status, upvotes, author, \
     organization_id, promoted_issue_id, created_at, updated_at";

impl SqliteStorage {
    /// Submit an idea.
    ///
    /// # Errors
    ///
    /// Returns `RequiredField` for an empty title.
    pub fn create_idea(&mut self, idea: &Idea, actor: &str) -> Result<()> {
        if idea.title.trim().is_empty() {
            return Err(Error::RequiredField("title"));
        }
        if let Some(org) = &idea.organization_id {
            self.require_organization(org)?;
        }

        self.mutate("create_idea", actor, |tx, ctx| {
            tx.execute(
                &format!("INSERT INTO ideas ({IDEA_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"),
                rusqlite::params![
                    idea.id,
                    idea.title,
                    idea.description,
                    idea.category.as_str(),
                    idea.impact.as_str(),
                    idea.status.as_str(),
                    idea.upvotes,
                    idea.author,
                    idea.organization_id,
                    idea.promoted_issue_id,
                    idea.created_at,
                    idea.updated_at,
                ],
            )?;
            insert_list(tx, "idea_tags", "idea_id", "tag", &idea.id, &idea.tags)?;
            ctx.record_note("idea", &idea.id, EventType::IdeaCreated, &idea.title);
            Ok(())
        })
    }

    /// Get an idea with its tags, endorsements and comments.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_idea(&self, id: &str) -> Result<Option<Idea>> {
        let idea = self
            .conn
            .query_row(
                &format!("SELECT {IDEA_COLUMNS} FROM ideas WHERE id = ?1"),
                [id],
                map_idea_row,
            )
            .optional()?;

        match idea {
            Some(mut idea) => {
                self.hydrate_idea(&mut idea)?;
                Ok(Some(idea))
            }
            None => Ok(None),
        }
    }

    /// Get an idea or fail with `NotFound`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if it doesn't exist.
    pub fn require_idea(&self, id: &str) -> Result<Idea> {
        self.get_idea(id)?.ok_or_else(|| Error::not_found("Idea", id))
    }

    /// List ideas, most upvoted first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_ideas(
        &self,
        status: Option<IdeaStatus>,
        category: Option<IdeaCategory>,
        organization_id: Option<&str>,
    ) -> Result<Vec<Idea>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {IDEA_COLUMNS} FROM ideas
             WHERE (?1 IS NULL OR status = ?1)
               AND (?2 IS NULL OR category = ?2)
               AND (?3 IS NULL OR organization_id = ?3)
             ORDER BY upvotes DESC, created_at"
        ))?;
        let mut ideas = stmt
            .query_map(
                rusqlite::params![
                    status.map(|s| s.as_str()),
                    category.map(|c| c.as_str()),
                    organization_id,
                ],
                map_idea_row,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        for idea in &mut ideas {
            self.hydrate_idea(idea)?;
        }
        Ok(ideas)
    }

    /// Add one upvote.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the idea doesn't exist.
    pub fn upvote_idea(&mut self, id: &str, actor: &str) -> Result<Idea> {
        let idea = self.require_idea(id)?;

        self.mutate("upvote_idea", actor, |tx, ctx| {
            tx.execute(
                "UPDATE ideas SET upvotes = upvotes + 1, updated_at = ?1 WHERE id = ?2",
                rusqlite::params![now_ms(), idea.id],
            )?;
            ctx.record_change(
                "idea",
                &idea.id,
                EventType::IdeaUpvoted,
                Some(idea.upvotes.to_string()),
                Some((idea.upvotes + 1).to_string()),
            );
            Ok(())
        })?;

        self.require_idea(&idea.id)
    }

    /// Comment on an idea.
    ///
    /// # Errors
    ///
    /// Returns `RequiredField` for empty content or `NotFound`.
    pub fn add_idea_comment(&mut self, id: &str, content: &str, actor: &str) -> Result<IdeaComment> {
        let idea = self.require_idea(id)?;
        if content.trim().is_empty() {
            return Err(Error::RequiredField("content"));
        }

        let comment = IdeaComment {
            id: new_id("icmt"),
            idea_id: idea.id.clone(),
            author: actor.to_string(),
            content: content.to_string(),
            created_at: now_ms(),
            edited_at: None,
        };

        self.mutate("add_idea_comment", actor, |tx, ctx| {
            tx.execute(
                "INSERT INTO idea_comments (id, idea_id, author, content, created_at, edited_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, NULL)",
                rusqlite::params![
                    comment.id,
                    comment.idea_id,
                    comment.author,
                    comment.content,
                    comment.created_at,
                ],
            )?;
            ctx.record_note("idea", &idea.id, EventType::IdeaCommented, &comment.id);
            Ok(())
        })?;

        Ok(comment)
    }

    /// Edit an idea comment. Only its author may do so.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` for other authors or `NotFound`.
    pub fn edit_idea_comment(&mut self, comment_id: &str, content: &str, actor: &str) -> Result<IdeaComment> {
        let comment = self.get_idea_comment(comment_id)?;
        if comment.author != actor {
            return Err(Error::PermissionDenied(format!(
                "only {} can edit comment {comment_id}",
                comment.author
            )));
        }
        if content.trim().is_empty() {
            return Err(Error::RequiredField("content"));
        }

        self.mutate("edit_idea_comment", actor, |tx, ctx| {
            tx.execute(
                "UPDATE idea_comments SET content = ?1, edited_at = ?2 WHERE id = ?3",
                rusqlite::params![content, now_ms(), comment.id],
            )?;
            ctx.record_change(
                "idea",
                &comment.idea_id,
                EventType::IdeaUpdated,
                Some(comment.content.clone()),
                Some(content.to_string()),
            );
            Ok(())
        })?;

        self.get_idea_comment(&comment.id)
    }

    /// Set an idea's status.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the idea doesn't exist.
    pub fn set_idea_status(&mut self, id: &str, status: IdeaStatus, actor: &str) -> Result<Idea> {
        let idea = self.require_idea(id)?;

        self.mutate("set_idea_status", actor, |tx, ctx| {
            tx.execute(
                "UPDATE ideas SET status = ?1, updated_at = ?2 WHERE id = ?3",
                rusqlite::params![status.as_str(), now_ms(), idea.id],
            )?;
            ctx.record_change(
                "idea",
                &idea.id,
                EventType::StatusChanged,
                Some(idea.status.as_str().to_string()),
                Some(status.as_str().to_string()),
            );
            Ok(())
        })?;

        self.require_idea(&idea.id)
    }

    /// Toggle the actor's endorsement. Returns true when now endorsed.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the idea doesn't exist.
    pub fn toggle_endorsement(&mut self, id: &str, actor: &str) -> Result<bool> {
        let idea = self.require_idea(id)?;
        let endorsed = idea.promoted_by.iter().any(|e| e == actor);

        self.mutate("toggle_endorsement", actor, |tx, ctx| {
            if endorsed {
                tx.execute(
                    "DELETE FROM idea_endorsements WHERE idea_id = ?1 AND email = ?2",
                    rusqlite::params![idea.id, actor],
                )?;
                ctx.record_change("idea", &idea.id, EventType::IdeaEndorsed, Some(actor.to_string()), None);
            } else {
                tx.execute(
                    "INSERT INTO idea_endorsements (idea_id, email, created_at) VALUES (?1, ?2, ?3)",
                    rusqlite::params![idea.id, actor, now_ms()],
                )?;
                ctx.record_change("idea", &idea.id, EventType::IdeaEndorsed, None, Some(actor.to_string()));
            }
            Ok(!endorsed)
        })
    }

    /// Promote an idea. With a project, a `Story` issue is created from it
    /// in the same transaction and linked back.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if the idea was already promoted.
    pub fn promote_idea(
        &mut self,
        id: &str,
        project: Option<&Project>,
        actor: &str,
    ) -> Result<(Idea, Option<Issue>)> {
        let idea = self.require_idea(id)?;
        if idea.status == IdeaStatus::Promoted || idea.promoted_issue_id.is_some() {
            return Err(Error::InvalidState(format!("idea {} is already promoted", idea.id)));
        }

        let mut issue = match project {
            Some(project) => {
                let workflow = self.workflow_for_project(project)?;
                let mut issue = Issue::new(
                    project.id.clone(),
                    idea.title.clone(),
                    workflow.initial_status().to_string(),
                );
                issue.description.clone_from(&idea.description);
                issue.issue_type = IssueType::Story;
                issue.reporter = Some(actor.to_string());
                issue.labels.clone_from(&idea.tags);
                Some(issue)
            }
            None => None,
        };

        self.mutate("promote_idea", actor, |tx, ctx| {
            if let Some(issue) = issue.as_mut() {
                insert_issue(tx, ctx, issue)?;
            }
            tx.execute(
                "UPDATE ideas SET status = 'promoted', promoted_issue_id = ?1, updated_at = ?2 WHERE id = ?3",
                rusqlite::params![issue.as_ref().map(|i| i.id.as_str()), now_ms(), idea.id],
            )?;
            ctx.record_change(
                "idea",
                &idea.id,
                EventType::IdeaPromoted,
                Some(idea.status.as_str().to_string()),
                issue.as_ref().map(|i| i.key.clone()),
            );
            Ok(())
        })?;

        let issue = match issue {
            Some(issue) => Some(self.require_issue(&issue.id)?),
            None => None,
        };
        Ok((self.require_idea(&idea.id)?, issue))
    }

    /// Delete an idea.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the idea doesn't exist.
    pub fn delete_idea(&mut self, id: &str, actor: &str) -> Result<Idea> {
        let idea = self.require_idea(id)?;

        self.mutate("delete_idea", actor, |tx, ctx| {
            tx.execute("DELETE FROM ideas WHERE id = ?1", [&idea.id])?;
            ctx.record_note("idea", &idea.id, EventType::IdeaDeleted, &idea.title);
            Ok(())
        })?;

        Ok(idea)
    }

    fn get_idea_comment(&self, id: &str) -> Result<IdeaComment> {
        self.conn
            .query_row(
                "SELECT id, idea_id, author, content, created_at, edited_at FROM idea_comments WHERE id = ?1",
                [id],
                map_idea_comment_row,
            )
            .optional()?
            .ok_or_else(|| Error::not_found("Comment", id))
    }

    fn hydrate_idea(&self, idea: &mut Idea) -> Result<()> {
        idea.tags = load_list(
            &self.conn,
            "SELECT tag FROM idea_tags WHERE idea_id = ?1 ORDER BY tag",
            &idea.id,
        )?;
        idea.promoted_by = load_list(
            &self.conn,
            "SELECT email FROM idea_endorsements WHERE idea_id = ?1 ORDER BY created_at, email",
            &idea.id,
        )?;

        let mut stmt = self.conn.prepare_cached(
            "SELECT id, idea_id, author, content, created_at, edited_at FROM idea_comments
             WHERE idea_id = ?1 ORDER BY created_at",
        )?;
        idea.comments = stmt
            .query_map([&idea.id], map_idea_comment_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(())
    }
}

fn map_idea_row(row: &rusqlite::Row) -> rusqlite::Result<Idea> {
    let category: String = row.get(3)?;
    let impact: String = row.get(4)?;
    let status: String = row.get(5)?;
    Ok(Idea {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        category: IdeaCategory::from_str(&category),
        tags: Vec::new(),
        impact: Impact::from_str(&impact),
        status: IdeaStatus::from_str(&status),
        upvotes: row.get(6)?,
        author: row.get(7)?,
        organization_id: row.get(8)?,
        promoted_by: Vec::new(),
        promoted_issue_id: row.get(9)?,
        comments: Vec::new(),
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

fn map_idea_comment_row(row: &rusqlite::Row) -> rusqlite::Result<IdeaComment> {
    Ok(IdeaComment {
        id: row.get(0)?,
        idea_id: row.get(1)?,
        author: row.get(2)?,
        content: row.get(3)?,
        created_at: row.get(4)?,
        edited_at: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{storage_with_project, ACTOR};
    use super::*;

    fn idea(storage: &mut SqliteStorage, title: &str) -> Idea {
        let mut idea = Idea::new(title.to_string(), ACTOR.to_string());
        idea.tags = vec!["ux".into(), "mobile".into()];
        storage.create_idea(&idea, ACTOR).unwrap();
        idea
    }

    #[test]
    fn test_defaults_and_ordering() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let quiet = idea(&mut storage, "Dark mode");
        let loud = idea(&mut storage, "Offline sync");
        storage.upvote_idea(&loud.id, ACTOR).unwrap();
        storage.upvote_idea(&loud.id, ACTOR).unwrap();

        let listed = storage.list_ideas(None, None, None).unwrap();
        assert_eq!(listed[0].id, loud.id);
        assert_eq!(listed[0].upvotes, 2);
        assert_eq!(listed[1].id, quiet.id);
        assert_eq!(listed[1].status, IdeaStatus::Submitted);
        assert_eq!(listed[1].impact, Impact::Medium);
        assert_eq!(listed[1].tags, vec!["mobile".to_string(), "ux".to_string()]);
    }

    #[test]
    fn test_endorsement_toggles() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let idea = idea(&mut storage, "Dark mode");

        assert!(storage.toggle_endorsement(&idea.id, ACTOR).unwrap());
        assert_eq!(storage.require_idea(&idea.id).unwrap().promoted_by, vec![ACTOR.to_string()]);

        assert!(!storage.toggle_endorsement(&idea.id, ACTOR).unwrap());
        assert!(storage.require_idea(&idea.id).unwrap().promoted_by.is_empty());
    }

    #[test]
    fn test_comment_edit_by_author_only() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let idea = idea(&mut storage, "Dark mode");
        let comment = storage.add_idea_comment(&idea.id, "Yes please", ACTOR).unwrap();

        assert!(matches!(
            storage.edit_idea_comment(&comment.id, "Nope", "sam@example.com"),
            Err(Error::PermissionDenied(_))
        ));
        let edited = storage.edit_idea_comment(&comment.id, "Yes, please!", ACTOR).unwrap();
        assert_eq!(edited.content, "Yes, please!");
        assert!(edited.edited_at.is_some());
        assert_eq!(storage.require_idea(&idea.id).unwrap().comments.len(), 1);
    }

    #[test]
    fn test_promote_creates_story() {
        let (mut storage, project) = storage_with_project();
        let idea = idea(&mut storage, "Offline sync");

        let (promoted, issue) = storage.promote_idea(&idea.id, Some(&project), ACTOR).unwrap();
        let issue = issue.unwrap();
        assert_eq!(promoted.status, IdeaStatus::Promoted);
        assert_eq!(promoted.promoted_issue_id.as_deref(), Some(issue.id.as_str()));
        assert_eq!(issue.key, "MOB-1");
        assert_eq!(issue.issue_type, IssueType::Story);
        assert_eq!(issue.status, "To Do");
        assert_eq!(issue.labels.len(), 2);

        assert!(matches!(
            storage.promote_idea(&idea.id, None, ACTOR),
            Err(Error::InvalidState(_))
        ));
    }

    #[test]
    fn test_promote_without_project() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let idea = idea(&mut storage, "Widgets");
        let (promoted, issue) = storage.promote_idea(&idea.id, None, ACTOR).unwrap();
        assert!(issue.is_none());
        assert_eq!(promoted.status, IdeaStatus::Promoted);
    }
}
