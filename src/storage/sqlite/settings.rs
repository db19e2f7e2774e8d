//! Key/value settings (theme, current project, current organization).

use rusqlite::OptionalExtension;

use super::{now_ms, MutationContext, SqliteStorage};
use crate::error::Result;
use crate::storage::events::EventType;

impl SqliteStorage {
    /// Read a setting.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM settings WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    /// Write a setting.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn set_setting(&mut self, key: &str, value: &str, actor: &str) -> Result<()> {
        self.mutate("set_setting", actor, |tx, ctx| set_setting_tx(tx, ctx, key, value))
    }

    /// Remove a setting. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn clear_setting(&mut self, key: &str, actor: &str) -> Result<bool> {
        self.mutate("clear_setting", actor, |tx, ctx| {
            let old: Option<String> = tx
                .query_row("SELECT value FROM settings WHERE key = ?1", [key], |row| row.get(0))
                .optional()?;
            let existed = old.is_some();
            if existed {
                tx.execute("DELETE FROM settings WHERE key = ?1", [key])?;
                ctx.record_change("setting", key, EventType::SettingChanged, old, None);
            }
            Ok(existed)
        })
    }

    /// All settings ordered by key.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_settings(&self) -> Result<Vec<(String, String)>> {
        let mut stmt = self.conn.prepare("SELECT key, value FROM settings ORDER BY key")?;
        let settings = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(settings)
    }
}

/// Upsert a setting inside an open mutation.
pub(crate) fn set_setting_tx(
    tx: &rusqlite::Transaction,
    ctx: &mut MutationContext,
    key: &str,
    value: &str,
) -> Result<()> {
    let old: Option<String> = tx
        .query_row("SELECT value FROM settings WHERE key = ?1", [key], |row| row.get(0))
        .optional()?;
    if old.as_deref() == Some(value) {
        return Ok(());
    }

    tx.execute(
        "INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        rusqlite::params![key, value, now_ms()],
    )?;
    ctx.record_change("setting", key, EventType::SettingChanged, old, Some(value.to_string()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::test_support::ACTOR;
    use super::*;
    use crate::storage::events::get_events;

    #[test]
    fn test_set_get_clear() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        assert!(storage.get_setting("theme").unwrap().is_none());

        storage.set_setting("theme", "dark", ACTOR).unwrap();
        storage.set_setting("theme", "light", ACTOR).unwrap();
        assert_eq!(storage.get_setting("theme").unwrap().as_deref(), Some("light"));
        assert_eq!(storage.list_settings().unwrap().len(), 1);

        assert!(storage.clear_setting("theme", ACTOR).unwrap());
        assert!(storage.get_setting("theme").unwrap().is_none());
    }

    #[test]
    fn test_unchanged_value_records_no_event() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        storage.set_setting("theme", "dark", ACTOR).unwrap();
        storage.set_setting("theme", "dark", ACTOR).unwrap();

        let events = get_events(storage.conn(), "setting", "theme", None).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].new_value.as_deref(), Some("dark"));
    }
}
