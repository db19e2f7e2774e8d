//! Saved filters.
//!
//! Built-in quick filters are merged in front of stored ones and cannot be
//! shadowed or deleted.

use rusqlite::OptionalExtension;

use super::SqliteStorage;
use crate::error::{Error, Result};
use crate::model::SavedFilter;
use crate::query::{quick_filter, Query, QuickFilter, QUICK_FILTERS};
use crate::storage::events::EventType;

const FILTER_COLUMNS: &str = "id, name, query, project_id, created_by, created_at";

impl SqliteStorage {
    /// Save a named query.
    ///
    /// # Errors
    ///
    /// Returns `RequiredField` for an empty name or query, `InvalidQuery`
    /// when the query does not parse strictly, and `AlreadyExists` when the
    /// name is taken (quick filter names included).
    pub fn save_filter(&mut self, filter: &SavedFilter, actor: &str) -> Result<()> {
        if filter.name.trim().is_empty() {
            return Err(Error::RequiredField("name"));
        }
        if filter.query.trim().is_empty() {
            return Err(Error::RequiredField("query"));
        }
        Query::parse_strict(&filter.query)?;

        if quick_filter(&filter.name).is_some() || self.get_filter(&filter.name)?.is_some() {
            return Err(Error::AlreadyExists {
                entity: "Filter",
                name: filter.name.clone(),
            });
        }
        if let Some(project_id) = &filter.project_id {
            self.require_project(project_id)?;
        }

        self.mutate("save_filter", actor, |tx, ctx| {
            tx.execute(
                &format!("INSERT INTO saved_filters ({FILTER_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
                rusqlite::params![
                    filter.id,
                    filter.name,
                    filter.query,
                    filter.project_id,
                    filter.created_by,
                    filter.created_at,
                ],
            )?;
            ctx.record_note("filter", &filter.id, EventType::FilterSaved, &filter.name);
            Ok(())
        })
    }

    /// Find a quick filter or a stored filter by id or name.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_filter(&self, id_or_name: &str) -> Result<Option<SavedFilter>> {
        if let Some(quick) = quick_filter(id_or_name) {
            return Ok(Some(from_quick(quick)));
        }

        let filter = self
            .conn
            .query_row(
                &format!("SELECT {FILTER_COLUMNS} FROM saved_filters WHERE id = ?1 OR name = ?1 COLLATE NOCASE"),
                [id_or_name],
                map_filter_row,
            )
            .optional()?;
        Ok(filter)
    }

    /// Get a filter or fail with `NotFound`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if nothing matches.
    pub fn require_filter(&self, id_or_name: &str) -> Result<SavedFilter> {
        self.get_filter(id_or_name)?
            .ok_or_else(|| Error::not_found("Filter", id_or_name))
    }

    /// Quick filters followed by stored filters visible in a project.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_filters(&self, project_id: Option<&str>) -> Result<Vec<SavedFilter>> {
        let mut filters: Vec<SavedFilter> = QUICK_FILTERS.iter().map(from_quick).collect();

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {FILTER_COLUMNS} FROM saved_filters
             WHERE project_id IS NULL OR ?1 IS NULL OR project_id = ?1
             ORDER BY name COLLATE NOCASE"
        ))?;
        let stored = stmt
            .query_map([project_id], map_filter_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        filters.extend(stored);
        Ok(filters)
    }

    /// Delete a stored filter.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` for quick filters or `NotFound`.
    pub fn delete_filter(&mut self, id_or_name: &str, actor: &str) -> Result<SavedFilter> {
        let filter = self.require_filter(id_or_name)?;
        if filter.builtin {
            return Err(Error::InvalidState(format!(
                "{} is a built-in quick filter",
                filter.name
            )));
        }

        self.mutate("delete_filter", actor, |tx, ctx| {
            tx.execute("DELETE FROM saved_filters WHERE id = ?1", [&filter.id])?;
            ctx.record_note("filter", &filter.id, EventType::FilterDeleted, &filter.name);
            Ok(())
        })?;

        Ok(filter)
    }
}

fn from_quick(quick: &QuickFilter) -> SavedFilter {
    SavedFilter {
        id: quick.id.to_string(),
        name: quick.name.to_string(),
        query: quick.query.to_string(),
        project_id: None,
        created_by: "system".to_string(),
        created_at: 0,
        builtin: true,
    }
}

fn map_filter_row(row: &rusqlite::Row) -> rusqlite::Result<SavedFilter> {
    Ok(SavedFilter {
        id: row.get(0)?,
        name: row.get(1)?,
        query: row.get(2)?,
        project_id: row.get(3)?,
        created_by: row.get(4)?,
        created_at: row.get(5)?,
        builtin: false,
    })
}

#[cfg(test)]
mod tests {
    use super::super::test_support::ACTOR;
    use super::*;

    #[test]
    fn test_save_and_resolve() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let filter = SavedFilter::new("Blockers".into(), "priority = High AND status != Done".into(), ACTOR.into());
        storage.save_filter(&filter, ACTOR).unwrap();

        let loaded = storage.require_filter("blockers").unwrap();
        assert_eq!(loaded.query, filter.query);
        assert!(!loaded.builtin);

        let all = storage.list_filters(None).unwrap();
        assert_eq!(all.len(), QUICK_FILTERS.len() + 1);
        assert!(all[0].builtin);
    }

    #[test]
    fn test_quick_filter_names_reserved() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let shadow = SavedFilter::new("Bugs".into(), "type = Bug".into(), ACTOR.into());
        assert!(matches!(
            storage.save_filter(&shadow, ACTOR),
            Err(Error::AlreadyExists { .. })
        ));
        assert!(matches!(
            storage.delete_filter("my-issues", ACTOR),
            Err(Error::InvalidState(_))
        ));
    }

    #[test]
    fn test_malformed_query_rejected() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let bad = SavedFilter::new("Broken".into(), "priority".into(), ACTOR.into());
        assert!(storage.save_filter(&bad, ACTOR).is_err());
    }
}
