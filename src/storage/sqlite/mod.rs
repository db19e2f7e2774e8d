//! SQLite storage implementation.
//!
//! This module provides the storage backend for PlanUp using SQLite.
//! It follows the MutationContext pattern for transaction discipline and
//! audit logging: every write goes through [`SqliteStorage::mutate`], which
//! wraps the change and its events in one IMMEDIATE transaction.
//!
//! Operations are grouped by entity in the submodules; each adds an
//! `impl SqliteStorage` block.

use crate::error::Result;
use crate::storage::events::{insert_event, Event, EventType};
use crate::storage::schema::apply_schema;
use rusqlite::{Connection, Transaction};
use std::path::Path;
use std::time::Duration;

mod epics;
mod filters;
mod ideas;
mod issue_records;
mod issues;
mod orgs;
mod projects;
mod retros;
mod settings;
mod sprints;
mod sync;
mod templates;
mod workflows;

pub use epics::EpicUpdate;
pub use issues::IssueUpdate;
pub use sprints::{SprintCompletion, SprintUpdate};

/// SQLite-based storage backend.
#[derive(Debug)]
pub struct SqliteStorage {
    conn: Connection,
}

/// Context for a mutation operation, tracking side effects.
///
/// Passed to mutation closures to record audit events, which are written
/// in the same transaction as the change itself.
pub struct MutationContext {
    /// Name of the operation being performed.
    pub op_name: String,
    /// Actor performing the operation.
    pub actor: String,
    /// Events to write at the end of the transaction.
    pub events: Vec<Event>,
}

impl MutationContext {
    /// Create a new mutation context.
    #[must_use]
    pub fn new(op_name: &str, actor: &str) -> Self {
        Self {
            op_name: op_name.to_string(),
            actor: actor.to_string(),
            events: Vec::new(),
        }
    }

    /// Record an event for this operation.
    pub fn record_event(&mut self, entity_type: &str, entity_id: &str, event_type: EventType) {
        self.events
            .push(Event::new(entity_type, entity_id, event_type, &self.actor));
    }

    /// Record an event with old/new values for field tracking.
    pub fn record_change(
        &mut self,
        entity_type: &str,
        entity_id: &str,
        event_type: EventType,
        old_value: Option<String>,
        new_value: Option<String>,
    ) {
        self.events.push(
            Event::new(entity_type, entity_id, event_type, &self.actor)
                .with_values(old_value, new_value),
        );
    }

    /// Record an event carrying a short human note (a title, a label).
    pub fn record_note(
        &mut self,
        entity_type: &str,
        entity_id: &str,
        event_type: EventType,
        note: &str,
    ) {
        self.events.push(
            Event::new(entity_type, entity_id, event_type, &self.actor).with_comment(note),
        );
    }
}

impl SqliteStorage {
    /// Open a database at the given path.
    ///
    /// Creates the parent directory and applies the schema if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_timeout(path, None)
    }

    /// Open a database with an optional busy timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open_with_timeout(path: &Path, timeout_ms: Option<u64>) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        if let Some(timeout) = timeout_ms {
            conn.busy_timeout(Duration::from_millis(timeout))?;
        } else {
            // Default 5 second timeout
            conn.busy_timeout(Duration::from_secs(5))?;
        }

        apply_schema(&conn)?;
        tracing::debug!(path = %path.display(), "Opened database");
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Get a reference to the underlying connection (for read operations).
    #[must_use]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Execute a mutation with the transaction protocol.
    ///
    /// This method:
    /// 1. Begins an IMMEDIATE transaction (for write locking)
    /// 2. Executes the mutation closure
    /// 3. Writes audit events
    /// 4. Commits (or rolls back on error)
    ///
    /// # Errors
    ///
    /// Returns an error if any step fails. The transaction is rolled back on error.
    pub fn mutate<F, R>(&mut self, op: &str, actor: &str, f: F) -> Result<R>
    where
        F: FnOnce(&Transaction, &mut MutationContext) -> Result<R>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;

        let mut ctx = MutationContext::new(op, actor);

        let result = f(&tx, &mut ctx)?;

        for event in &ctx.events {
            insert_event(&tx, event)?;
        }

        tx.commit()?;
        tracing::debug!(op, actor, events = ctx.events.len(), "Mutation committed");

        Ok(result)
    }
}

/// Current time in Unix milliseconds.
pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Load a one-column list (labels, tags, members) ordered by value.
pub(crate) fn load_list(conn: &Connection, sql: &str, owner_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare_cached(sql)?;
    let values = stmt
        .query_map([owner_id], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(values)
}

/// Insert values into a `(owner, value)` list table, ignoring duplicates.
pub(crate) fn insert_list(
    tx: &Transaction,
    table: &str,
    owner_col: &str,
    value_col: &str,
    owner_id: &str,
    values: &[String],
) -> Result<()> {
    let sql = format!("INSERT OR IGNORE INTO {table} ({owner_col}, {value_col}) VALUES (?1, ?2)");
    let mut stmt = tx.prepare_cached(&sql)?;
    for value in values {
        let value = value.trim();
        if !value.is_empty() {
            stmt.execute(rusqlite::params![owner_id, value])?;
        }
    }
    Ok(())
}

/// Replace the contents of a `(owner, value)` list table.
pub(crate) fn replace_list(
    tx: &Transaction,
    table: &str,
    owner_col: &str,
    value_col: &str,
    owner_id: &str,
    values: &[String],
) -> Result<()> {
    tx.execute(&format!("DELETE FROM {table} WHERE {owner_col} = ?1"), [owner_id])?;
    insert_list(tx, table, owner_col, value_col, owner_id, values)
}

/// Decode a JSON text column inside a row mapper.
pub(crate) fn json_column<T: serde::de::DeserializeOwned>(
    row: &rusqlite::Row,
    idx: usize,
) -> rusqlite::Result<T> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::SqliteStorage;
    use crate::model::Project;

    pub const ACTOR: &str = "alex@example.com";

    /// In-memory storage with one project keyed `MOB` on the agile workflow.
    pub fn storage_with_project() -> (SqliteStorage, Project) {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let project = Project::new("Mobile".to_string(), Some("MOB"));
        storage.create_project(&project, ACTOR).unwrap();
        (storage, project)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_memory() {
        let storage = SqliteStorage::open_memory();
        assert!(storage.is_ok());
    }

    #[test]
    fn test_open_creates_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("planup.db");
        let storage = SqliteStorage::open(&path);
        assert!(storage.is_ok());
        assert!(path.exists());
    }

    #[test]
    fn test_mutate_rolls_back_events_on_error() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let result: Result<()> = storage.mutate("failing", "alex", |_tx, ctx| {
            ctx.record_event("project", "proj_x", EventType::ProjectCreated);
            Err(crate::error::Error::InvalidState("boom".into()))
        });
        assert!(result.is_err());

        let count: i64 = storage
            .conn()
            .query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
