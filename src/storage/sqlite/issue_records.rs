//! Records hanging off an issue: comments, time logs, attachments, the
//! decision log, issue links and sub-tasks.

use rusqlite::OptionalExtension;

use super::{now_ms, SqliteStorage};
use crate::error::{Error, Result};
use crate::model::{
    new_id, Attachment, Comment, Decision, IssueDetails, IssueLink, LinkType, LinkView, SubTask,
    SubTaskStatus, TimeCategory, TimeLog,
};
use crate::storage::events::EventType;

impl SqliteStorage {
    // ========
    // Comments
    // ========

    /// Add a comment to an issue.
    ///
    /// # Errors
    ///
    /// Returns `RequiredField` for empty content or `IssueNotFound`.
    pub fn add_comment(&mut self, issue: &str, content: &str, actor: &str) -> Result<Comment> {
        let content = content.trim();
        if content.is_empty() {
            return Err(Error::RequiredField("content"));
        }
        let issue = self.require_issue(issue)?;

        let comment = Comment {
            id: new_id("comment"),
            issue_id: issue.id.clone(),
            author: actor.to_string(),
            content: content.to_string(),
            created_at: now_ms(),
            edited: false,
            edited_at: None,
            edited_by: None,
        };

        self.mutate("add_comment", actor, |tx, ctx| {
            tx.execute(
                "INSERT INTO comments (id, issue_id, author, content, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![comment.id, comment.issue_id, comment.author, comment.content, comment.created_at],
            )?;
            touch_issue(tx, &issue.id)?;
            ctx.record_note("issue", &issue.id, EventType::CommentAdded, &comment.id);
            Ok(())
        })?;

        Ok(comment)
    }

    /// Comments on an issue, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_comments(&self, issue_id: &str) -> Result<Vec<Comment>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, issue_id, author, content, created_at, edited, edited_at, edited_by
             FROM comments WHERE issue_id = ?1 ORDER BY created_at, id",
        )?;
        let comments = stmt
            .query_map([issue_id], map_comment_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(comments)
    }

    fn require_comment(&self, id: &str) -> Result<Comment> {
        self.conn
            .query_row(
                "SELECT id, issue_id, author, content, created_at, edited, edited_at, edited_by
                 FROM comments WHERE id = ?1",
                [id],
                map_comment_row,
            )
            .optional()?
            .ok_or_else(|| Error::not_found("Comment", id))
    }

    /// Edit a comment. Only its author may do so.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` when `actor` is not the author.
    pub fn edit_comment(&mut self, id: &str, content: &str, actor: &str) -> Result<Comment> {
        let content = content.trim();
        if content.is_empty() {
            return Err(Error::RequiredField("content"));
        }
        let comment = self.require_comment(id)?;
        if comment.author != actor {
            return Err(Error::PermissionDenied(format!(
                "only {} can edit this comment",
                comment.author
            )));
        }

        self.mutate("edit_comment", actor, |tx, ctx| {
            tx.execute(
                "UPDATE comments SET content = ?1, edited = 1, edited_at = ?2, edited_by = ?3 WHERE id = ?4",
                rusqlite::params![content, now_ms(), actor, comment.id],
            )?;
            ctx.record_change(
                "issue",
                &comment.issue_id,
                EventType::CommentEdited,
                Some(comment.content.clone()),
                Some(content.to_string()),
            );
            Ok(())
        })?;

        self.require_comment(id)
    }

    /// Delete a comment. Only its author may do so.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` when `actor` is not the author.
    pub fn delete_comment(&mut self, id: &str, actor: &str) -> Result<()> {
        let comment = self.require_comment(id)?;
        if comment.author != actor {
            return Err(Error::PermissionDenied(format!(
                "only {} can delete this comment",
                comment.author
            )));
        }

        self.mutate("delete_comment", actor, |tx, ctx| {
            tx.execute("DELETE FROM comments WHERE id = ?1", [&comment.id])?;
            ctx.record_note("issue", &comment.issue_id, EventType::CommentDeleted, &comment.id);
            Ok(())
        })
    }

    // =========
    // Time Logs
    // =========

    /// Log work against an issue.
    ///
    /// The entry's hours are added to the issue's `logged_hours` in the
    /// same transaction.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` unless `hours > 0`.
    pub fn log_time(
        &mut self,
        issue: &str,
        hours: f64,
        category: TimeCategory,
        description: Option<&str>,
        work_date: &str,
        actor: &str,
    ) -> Result<TimeLog> {
        if !(hours > 0.0 && hours.is_finite()) {
            return Err(Error::InvalidArgument(format!(
                "hours must be greater than 0 (got {hours})"
            )));
        }
        let issue = self.require_issue(issue)?;

        let log = TimeLog {
            id: new_id("log"),
            issue_id: issue.id.clone(),
            author: actor.to_string(),
            hours,
            description: description.map(ToString::to_string),
            category,
            work_date: work_date.to_string(),
            created_at: now_ms(),
        };

        self.mutate("log_time", actor, |tx, ctx| {
            tx.execute(
                "INSERT INTO time_logs (id, issue_id, author, hours, description, category, work_date, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    log.id,
                    log.issue_id,
                    log.author,
                    log.hours,
                    log.description,
                    log.category.as_str(),
                    log.work_date,
                    log.created_at,
                ],
            )?;
            tx.execute(
                "UPDATE issues SET logged_hours = logged_hours + ?1, updated_at = ?2 WHERE id = ?3",
                rusqlite::params![hours, now_ms(), issue.id],
            )?;
            ctx.record_change(
                "issue",
                &issue.id,
                EventType::TimeLogged,
                Some(issue.logged_hours.to_string()),
                Some((issue.logged_hours + hours).to_string()),
            );
            Ok(())
        })?;

        Ok(log)
    }

    /// Time logs for an issue, by work date.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_time_logs(&self, issue_id: &str) -> Result<Vec<TimeLog>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, issue_id, author, hours, description, category, work_date, created_at
             FROM time_logs WHERE issue_id = ?1 ORDER BY work_date, created_at",
        )?;
        let logs = stmt
            .query_map([issue_id], map_time_log_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(logs)
    }

    /// Remove a time log entry, subtracting its hours from the issue.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the entry doesn't exist.
    pub fn delete_time_log(&mut self, id: &str, actor: &str) -> Result<TimeLog> {
        let log = self
            .conn
            .query_row(
                "SELECT id, issue_id, author, hours, description, category, work_date, created_at
                 FROM time_logs WHERE id = ?1",
                [id],
                map_time_log_row,
            )
            .optional()?
            .ok_or_else(|| Error::not_found("Time log", id))?;

        self.mutate("delete_time_log", actor, |tx, ctx| {
            tx.execute("DELETE FROM time_logs WHERE id = ?1", [&log.id])?;
            tx.execute(
                "UPDATE issues SET logged_hours = max(logged_hours - ?1, 0), updated_at = ?2 WHERE id = ?3",
                rusqlite::params![log.hours, now_ms(), log.issue_id],
            )?;
            ctx.record_note("issue", &log.issue_id, EventType::TimeLogDeleted, &log.id);
            Ok(())
        })?;

        Ok(log)
    }

    // ===========
    // Attachments
    // ===========

    /// Record an attachment on an issue.
    ///
    /// # Errors
    ///
    /// Returns `IssueNotFound` if the issue doesn't exist.
    pub fn add_attachment(&mut self, attachment: &Attachment, actor: &str) -> Result<()> {
        let issue = self.require_issue(&attachment.issue_id)?;

        self.mutate("add_attachment", actor, |tx, ctx| {
            tx.execute(
                "INSERT INTO attachments (id, issue_id, name, size, size_bytes, file_type, location,
                                          checksum, description, uploaded_by, uploaded_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                rusqlite::params![
                    attachment.id,
                    issue.id,
                    attachment.name,
                    attachment.size,
                    attachment.size_bytes,
                    attachment.file_type,
                    attachment.location,
                    attachment.checksum,
                    attachment.description,
                    attachment.uploaded_by,
                    attachment.uploaded_at,
                ],
            )?;
            touch_issue(tx, &issue.id)?;
            ctx.record_note("issue", &issue.id, EventType::AttachmentAdded, &attachment.name);
            Ok(())
        })
    }

    /// Attachments on an issue, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_attachments(&self, issue_id: &str) -> Result<Vec<Attachment>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, issue_id, name, size, size_bytes, file_type, location, checksum,
                    description, uploaded_by, uploaded_at
             FROM attachments WHERE issue_id = ?1 ORDER BY uploaded_at, id",
        )?;
        let attachments = stmt
            .query_map([issue_id], |row| {
                Ok(Attachment {
                    id: row.get(0)?,
                    issue_id: row.get(1)?,
                    name: row.get(2)?,
                    size: row.get(3)?,
                    size_bytes: row.get(4)?,
                    file_type: row.get(5)?,
                    location: row.get(6)?,
                    checksum: row.get(7)?,
                    description: row.get(8)?,
                    uploaded_by: row.get(9)?,
                    uploaded_at: row.get(10)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(attachments)
    }

    /// Remove an attachment record.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the attachment doesn't exist.
    pub fn remove_attachment(&mut self, id: &str, actor: &str) -> Result<()> {
        let (issue_id, name): (String, String) = self
            .conn
            .query_row("SELECT issue_id, name FROM attachments WHERE id = ?1", [id], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .optional()?
            .ok_or_else(|| Error::not_found("Attachment", id))?;

        self.mutate("remove_attachment", actor, |tx, ctx| {
            tx.execute("DELETE FROM attachments WHERE id = ?1", [id])?;
            ctx.record_note("issue", &issue_id, EventType::AttachmentRemoved, &name);
            Ok(())
        })
    }

    // ============
    // Decision Log
    // ============

    /// Append an entry to an issue's decision log.
    ///
    /// # Errors
    ///
    /// Returns `RequiredField` for an empty entry or `IssueNotFound`.
    pub fn add_decision(&mut self, issue: &str, entry: &str, actor: &str) -> Result<Decision> {
        let entry = entry.trim();
        if entry.is_empty() {
            return Err(Error::RequiredField("entry"));
        }
        let issue = self.require_issue(issue)?;

        let decision = Decision {
            id: new_id("dec"),
            issue_id: issue.id.clone(),
            entry: entry.to_string(),
            author: actor.to_string(),
            created_at: now_ms(),
        };

        self.mutate("add_decision", actor, |tx, ctx| {
            tx.execute(
                "INSERT INTO decisions (id, issue_id, entry, author, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![decision.id, decision.issue_id, decision.entry, decision.author, decision.created_at],
            )?;
            touch_issue(tx, &issue.id)?;
            ctx.record_note("issue", &issue.id, EventType::DecisionLogged, &decision.entry);
            Ok(())
        })?;

        Ok(decision)
    }

    /// An issue's decision log, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_decisions(&self, issue_id: &str) -> Result<Vec<Decision>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, issue_id, entry, author, created_at
             FROM decisions WHERE issue_id = ?1 ORDER BY created_at, id",
        )?;
        let decisions = stmt
            .query_map([issue_id], |row| {
                Ok(Decision {
                    id: row.get(0)?,
                    issue_id: row.get(1)?,
                    entry: row.get(2)?,
                    author: row.get(3)?,
                    created_at: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(decisions)
    }

    // ===========
    // Issue Links
    // ===========

    /// Link two issues.
    ///
    /// A link and its inverse seen from the other side count as the same
    /// link, so `A blocks B` rejects a later `B is-blocked-by A`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a self link or `AlreadyExists` for a
    /// duplicate.
    pub fn add_link(&mut self, source: &str, target: &str, link_type: LinkType, actor: &str) -> Result<IssueLink> {
        let source = self.require_issue(source)?;
        let target = self.require_issue(target)?;
        if source.id == target.id {
            return Err(Error::InvalidArgument(format!(
                "{} cannot link to itself",
                source.key
            )));
        }

        let duplicate = self
            .conn
            .prepare(
                "SELECT 1 FROM issue_links
                 WHERE (source_issue_id = ?1 AND target_issue_id = ?2 AND link_type = ?3)
                    OR (source_issue_id = ?2 AND target_issue_id = ?1 AND link_type = ?4)",
            )?
            .exists(rusqlite::params![
                source.id,
                target.id,
                link_type.as_str(),
                link_type.inverse().as_str()
            ])?;
        if duplicate {
            return Err(Error::AlreadyExists {
                entity: "Link",
                name: format!("{} {} {}", source.key, link_type.as_str(), target.key),
            });
        }

        let link = IssueLink {
            id: new_id("link"),
            source_issue_id: source.id.clone(),
            target_issue_id: target.id.clone(),
            link_type,
            created_by: actor.to_string(),
            created_at: now_ms(),
        };

        self.mutate("add_link", actor, |tx, ctx| {
            tx.execute(
                "INSERT INTO issue_links (id, source_issue_id, target_issue_id, link_type, created_by, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    link.id,
                    link.source_issue_id,
                    link.target_issue_id,
                    link.link_type.as_str(),
                    link.created_by,
                    link.created_at,
                ],
            )?;
            ctx.record_note(
                "issue",
                &source.id,
                EventType::LinkAdded,
                &format!("{} {}", link_type.as_str(), target.key),
            );
            Ok(())
        })?;

        Ok(link)
    }

    /// Links touching an issue, seen from that issue.
    ///
    /// Incoming links report the inverse type, so a link `A blocks B`
    /// shows as `is-blocked-by A` on B.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_links(&self, issue_id: &str) -> Result<Vec<LinkView>> {
        let mut stmt = self.conn.prepare(
            "SELECT l.id, l.link_type, l.source_issue_id = ?1, o.key, o.title
             FROM issue_links l
             JOIN issues o ON o.id = CASE WHEN l.source_issue_id = ?1
                                          THEN l.target_issue_id ELSE l.source_issue_id END
             WHERE l.source_issue_id = ?1 OR l.target_issue_id = ?1
             ORDER BY l.created_at, l.id",
        )?;
        let rows = stmt.query_map([issue_id], |row| {
            let kind: String = row.get(1)?;
            let outgoing: bool = row.get(2)?;
            Ok((row.get::<_, String>(0)?, kind, outgoing, row.get::<_, String>(3)?, row.get::<_, String>(4)?))
        })?;

        let mut links = Vec::new();
        for row in rows {
            let (id, kind, outgoing, other_key, other_title) = row?;
            let Some(link_type) = LinkType::parse(&kind) else {
                continue;
            };
            links.push(LinkView {
                id,
                link_type: if outgoing { link_type } else { link_type.inverse() },
                other_key,
                other_title,
                incoming: !outgoing,
            });
        }
        Ok(links)
    }

    /// Remove a link by id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the link doesn't exist.
    pub fn remove_link(&mut self, id: &str, actor: &str) -> Result<()> {
        let (source_id, kind): (String, String) = self
            .conn
            .query_row(
                "SELECT source_issue_id, link_type FROM issue_links WHERE id = ?1",
                [id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?
            .ok_or_else(|| Error::not_found("Link", id))?;

        self.mutate("remove_link", actor, |tx, ctx| {
            tx.execute("DELETE FROM issue_links WHERE id = ?1", [id])?;
            ctx.record_note("issue", &source_id, EventType::LinkRemoved, &kind);
            Ok(())
        })
    }

    // =========
    // Sub-tasks
    // =========

    /// Add a sub-task under an issue.
    ///
    /// # Errors
    ///
    /// Returns `RequiredField` for an empty title or `IssueNotFound`.
    pub fn add_subtask(&mut self, parent: &str, title: &str, assignee: Option<&str>, actor: &str) -> Result<SubTask> {
        let title = title.trim();
        if title.is_empty() {
            return Err(Error::RequiredField("title"));
        }
        let parent = self.require_issue(parent)?;
        let now = now_ms();

        let subtask = SubTask {
            id: new_id("sub"),
            parent_issue_id: parent.id.clone(),
            title: title.to_string(),
            status: SubTaskStatus::ToDo,
            completed: false,
            assignee: assignee.map(ToString::to_string),
            created_at: now,
            updated_at: now,
        };

        self.mutate("add_subtask", actor, |tx, ctx| {
            tx.execute(
                "INSERT INTO subtasks (id, parent_issue_id, title, status, completed, assignee, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, 0, ?5, ?6, ?6)",
                rusqlite::params![
                    subtask.id,
                    subtask.parent_issue_id,
                    subtask.title,
                    subtask.status.as_str(),
                    subtask.assignee,
                    now,
                ],
            )?;
            touch_issue(tx, &parent.id)?;
            ctx.record_note("issue", &parent.id, EventType::SubtaskAdded, &subtask.title);
            Ok(())
        })?;

        Ok(subtask)
    }

    /// Sub-tasks of an issue in creation order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_subtasks(&self, parent_id: &str) -> Result<Vec<SubTask>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, parent_issue_id, title, status, completed, assignee, created_at, updated_at
             FROM subtasks WHERE parent_issue_id = ?1 ORDER BY created_at, id",
        )?;
        let subtasks = stmt
            .query_map([parent_id], map_subtask_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(subtasks)
    }

    fn require_subtask(&self, id: &str) -> Result<SubTask> {
        self.conn
            .query_row(
                "SELECT id, parent_issue_id, title, status, completed, assignee, created_at, updated_at
                 FROM subtasks WHERE id = ?1",
                [id],
                map_subtask_row,
            )
            .optional()?
            .ok_or_else(|| Error::not_found("Sub-task", id))
    }

    /// Set a sub-task's status; `Done` also sets the completed flag.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the sub-task doesn't exist.
    pub fn set_subtask_status(&mut self, id: &str, status: SubTaskStatus, actor: &str) -> Result<SubTask> {
        let subtask = self.require_subtask(id)?;

        self.mutate("set_subtask_status", actor, |tx, ctx| {
            tx.execute(
                "UPDATE subtasks SET status = ?1, completed = ?2, updated_at = ?3 WHERE id = ?4",
                rusqlite::params![status.as_str(), status == SubTaskStatus::Done, now_ms(), subtask.id],
            )?;
            ctx.record_change(
                "issue",
                &subtask.parent_issue_id,
                EventType::SubtaskUpdated,
                Some(subtask.status.as_str().to_string()),
                Some(status.as_str().to_string()),
            );
            Ok(())
        })?;

        self.require_subtask(id)
    }

    /// Delete a sub-task.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the sub-task doesn't exist.
    pub fn delete_subtask(&mut self, id: &str, actor: &str) -> Result<()> {
        let subtask = self.require_subtask(id)?;

        self.mutate("delete_subtask", actor, |tx, ctx| {
            tx.execute("DELETE FROM subtasks WHERE id = ?1", [&subtask.id])?;
            ctx.record_note("issue", &subtask.parent_issue_id, EventType::SubtaskDeleted, &subtask.title);
            Ok(())
        })
    }

    /// An issue with all of its attached records.
    ///
    /// # Errors
    ///
    /// Returns `IssueNotFound` if the issue doesn't exist.
    pub fn issue_details(&self, id_or_key: &str) -> Result<IssueDetails> {
        let issue = self.require_issue(id_or_key)?;
        Ok(IssueDetails {
            comments: self.list_comments(&issue.id)?,
            time_logs: self.list_time_logs(&issue.id)?,
            attachments: self.list_attachments(&issue.id)?,
            decision_log: self.list_decisions(&issue.id)?,
            links: self.list_links(&issue.id)?,
            subtasks: self.list_subtasks(&issue.id)?,
            issue,
        })
    }
}

/// Bump an issue's `updated_at`.
fn touch_issue(tx: &rusqlite::Transaction, issue_id: &str) -> Result<()> {
    tx.execute(
        "UPDATE issues SET updated_at = ?1 WHERE id = ?2",
        rusqlite::params![now_ms(), issue_id],
    )?;
    Ok(())
}

fn map_comment_row(row: &rusqlite::Row) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        issue_id: row.get(1)?,
        author: row.get(2)?,
        content: row.get(3)?,
        created_at: row.get(4)?,
        edited: row.get(5)?,
        edited_at: row.get(6)?,
        edited_by: row.get(7)?,
    })
}

fn map_time_log_row(row: &rusqlite::Row) -> rusqlite::Result<TimeLog> {
    let category: String = row.get(5)?;
    Ok(TimeLog {
        id: row.get(0)?,
        issue_id: row.get(1)?,
        author: row.get(2)?,
        hours: row.get(3)?,
        description: row.get(4)?,
        category: TimeCategory::from_str(&category),
        work_date: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn map_subtask_row(row: &rusqlite::Row) -> rusqlite::Result<SubTask> {
    let status: String = row.get(3)?;
    Ok(SubTask {
        id: row.get(0)?,
        parent_issue_id: row.get(1)?,
        title: row.get(2)?,
        status: SubTaskStatus::from_str(&status),
        completed: row.get(4)?,
        assignee: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{storage_with_project, ACTOR};
    use super::*;
    use crate::model::Issue;

    fn storage_with_issues(n: usize) -> SqliteStorage {
        let (mut storage, project) = storage_with_project();
        for i in 0..n {
            let mut issue = Issue::new(project.id.clone(), format!("Issue {i}"), "To Do".into());
            storage.create_issue(&mut issue, ACTOR).unwrap();
        }
        storage
    }

    #[test]
    fn test_comment_author_only_edit() {
        let mut storage = storage_with_issues(1);
        let comment = storage.add_comment("MOB-1", "Looks good", ACTOR).unwrap();

        let err = storage.edit_comment(&comment.id, "Hijack", "sam").unwrap_err();
        assert!(matches!(err, Error::PermissionDenied(_)));

        let edited = storage.edit_comment(&comment.id, "Looks great", ACTOR).unwrap();
        assert!(edited.edited);
        assert_eq!(edited.edited_by.as_deref(), Some(ACTOR));
        assert_eq!(edited.content, "Looks great");

        assert!(storage.delete_comment(&comment.id, "sam").is_err());
        storage.delete_comment(&comment.id, ACTOR).unwrap();
        let issue = storage.require_issue("MOB-1").unwrap();
        assert!(storage.list_comments(&issue.id).unwrap().is_empty());
    }

    #[test]
    fn test_time_log_adjusts_logged_hours() {
        let mut storage = storage_with_issues(1);
        let first = storage
            .log_time("MOB-1", 2.5, TimeCategory::Development, None, "2025-03-03", ACTOR)
            .unwrap();
        storage
            .log_time("MOB-1", 1.0, TimeCategory::Testing, Some("QA"), "2025-03-04", ACTOR)
            .unwrap();

        let issue = storage.require_issue("MOB-1").unwrap();
        assert!((issue.logged_hours - 3.5).abs() < f64::EPSILON);

        storage.delete_time_log(&first.id, ACTOR).unwrap();
        let issue = storage.require_issue("MOB-1").unwrap();
        assert!((issue.logged_hours - 1.0).abs() < f64::EPSILON);
        assert_eq!(storage.list_time_logs(&issue.id).unwrap().len(), 1);
    }

    #[test]
    fn test_time_log_rejects_non_positive_hours() {
        let mut storage = storage_with_issues(1);
        for hours in [0.0, -1.0, f64::NAN] {
            let err = storage
                .log_time("MOB-1", hours, TimeCategory::Other, None, "2025-03-03", ACTOR)
                .unwrap_err();
            assert!(matches!(err, Error::InvalidArgument(_)));
        }
    }

    #[test]
    fn test_links_show_inverse_from_target() {
        let mut storage = storage_with_issues(2);
        storage.add_link("MOB-1", "MOB-2", LinkType::Blocks, ACTOR).unwrap();

        let target = storage.require_issue("MOB-2").unwrap();
        let links = storage.list_links(&target.id).unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].link_type, LinkType::IsBlockedBy);
        assert_eq!(links[0].other_key, "MOB-1");
        assert!(links[0].incoming);

        let source = storage.require_issue("MOB-1").unwrap();
        let links = storage.list_links(&source.id).unwrap();
        assert_eq!(links[0].link_type, LinkType::Blocks);
        assert!(!links[0].incoming);
    }

    #[test]
    fn test_link_rules() {
        let mut storage = storage_with_issues(2);
        assert!(matches!(
            storage.add_link("MOB-1", "MOB-1", LinkType::RelatesTo, ACTOR),
            Err(Error::InvalidArgument(_))
        ));

        let link = storage.add_link("MOB-1", "MOB-2", LinkType::Blocks, ACTOR).unwrap();
        assert!(matches!(
            storage.add_link("MOB-2", "MOB-1", LinkType::IsBlockedBy, ACTOR),
            Err(Error::AlreadyExists { .. })
        ));

        storage.remove_link(&link.id, ACTOR).unwrap();
        storage.add_link("MOB-2", "MOB-1", LinkType::IsBlockedBy, ACTOR).unwrap();
    }

    #[test]
    fn test_subtask_lifecycle() {
        let mut storage = storage_with_issues(1);
        let sub = storage.add_subtask("MOB-1", "Write tests", Some("sam"), ACTOR).unwrap();
        assert_eq!(sub.status, SubTaskStatus::ToDo);

        let done = storage.set_subtask_status(&sub.id, SubTaskStatus::Done, ACTOR).unwrap();
        assert!(done.completed);

        let reopened = storage.set_subtask_status(&sub.id, SubTaskStatus::ToDo, ACTOR).unwrap();
        assert!(!reopened.completed);

        storage.delete_subtask(&sub.id, ACTOR).unwrap();
        assert!(storage.list_subtasks(&sub.parent_issue_id).unwrap().is_empty());
    }

    #[test]
    fn test_details_and_cascade() {
        let mut storage = storage_with_issues(2);
        storage.add_comment("MOB-1", "note", ACTOR).unwrap();
        storage.add_decision("MOB-1", "Use SQLite", ACTOR).unwrap();
        storage.add_subtask("MOB-1", "step", None, ACTOR).unwrap();
        storage.add_link("MOB-1", "MOB-2", LinkType::RelatesTo, ACTOR).unwrap();
        storage
            .log_time("MOB-1", 1.0, TimeCategory::Design, None, "2025-03-03", ACTOR)
            .unwrap();

        let details = storage.issue_details("MOB-1").unwrap();
        assert_eq!(details.comments.len(), 1);
        assert_eq!(details.decision_log.len(), 1);
        assert_eq!(details.subtasks.len(), 1);
        assert_eq!(details.links.len(), 1);
        assert_eq!(details.time_logs.len(), 1);

        let id = details.issue.id.clone();
        storage.delete_issue("MOB-1", ACTOR).unwrap();
        let remaining: i64 = storage
            .conn()
            .query_row(
                "SELECT (SELECT COUNT(*) FROM comments WHERE issue_id = ?1)
                      + (SELECT COUNT(*) FROM decisions WHERE issue_id = ?1)
                      + (SELECT COUNT(*) FROM subtasks WHERE parent_issue_id = ?1)
                      + (SELECT COUNT(*) FROM issue_links)
                      + (SELECT COUNT(*) FROM time_logs WHERE issue_id = ?1)",
                [&id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(remaining, 0);
    }
}
