//! Command implementations.
//!
//! Each submodule handles one top-level command. The helpers here cover
//! what every handler needs: opening the database, resolving the actor and
//! the target project, and the shared output conventions.

pub mod activity;
pub mod completions;
pub mod epic;
pub mod filter;
pub mod idea;
pub mod init;
pub mod issue;
pub mod org;
pub mod project;
pub mod report;
pub mod retro;
pub mod settings;
pub mod sprint;
pub mod sync;
pub mod template;
pub mod version;
pub mod workflow;

use std::path::PathBuf;

use serde::Serialize;

pub(crate) use crate::cli::Globals;

use crate::config::{default_actor, resolve_db_path, resolve_project_key};
use crate::error::{Error, Result};
use crate::model::{Project, SettingKey};
use crate::storage::SqliteStorage;
use crate::validate;

/// Resolve the database path and require that it exists.
pub(crate) fn existing_db_path(db_path: Option<&PathBuf>) -> Result<PathBuf> {
    let db_path = resolve_db_path(db_path.map(PathBuf::as_path)).ok_or(Error::NotInitialized)?;

    if !db_path.exists() {
        return Err(Error::NotInitialized);
    }
    Ok(db_path)
}

/// Open the database, failing with `NotInitialized` when it is missing.
pub(crate) fn open_storage(db_path: Option<&PathBuf>) -> Result<SqliteStorage> {
    SqliteStorage::open(&existing_db_path(db_path)?)
}

/// The actor recorded on mutations.
pub(crate) fn resolve_actor(actor: Option<&str>) -> String {
    actor.map(ToString::to_string).unwrap_or_else(default_actor)
}

/// The project a command targets.
///
/// `--project`, then `PU_PROJECT`, then the `current_project` setting.
pub(crate) fn resolve_project(storage: &SqliteStorage, explicit: Option<&str>) -> Result<Project> {
    if let Some(key) = resolve_project_key(explicit) {
        return storage.require_project(&key);
    }

    if let Some(current) = storage.get_setting(SettingKey::CurrentProject.as_str())? {
        if let Some(project) = storage.get_project(&current)? {
            return Ok(project);
        }
    }

    Err(Error::NoProjectSelected {
        available: storage.project_choices()?,
    })
}

/// Print a dry-run preview. Returns true when dry-run mode is active and
/// the caller should stop.
pub(crate) fn dry_run(json: bool, action: &str, target: &str, human: &str) -> bool {
    if !crate::is_dry_run() {
        return false;
    }
    if json {
        let output = serde_json::json!({
            "dry_run": true,
            "action": action,
            "target": target,
        });
        println!("{output}");
    } else {
        println!("Would {human}");
    }
    true
}

/// Print a value as a single JSON line.
pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

pub(crate) fn format_timestamp(ts: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ts)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| ts.to_string())
}

/// `YYYY-MM-DD HH:MM` for human output.
pub(crate) fn format_short(ts: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ts)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}

/// Shorten text to `max` characters, adding an ellipsis.
pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}

/// Map a rejected priority/type onto `InvalidArgument`, keeping the suggestion.
pub(crate) fn invalid(what: &str, (input, suggestion): (String, Option<String>)) -> Error {
    Error::InvalidArgument(match suggestion {
        Some(s) => format!("unknown {what} '{input}' (did you mean '{s}'?)"),
        None => format!("unknown {what} '{input}'"),
    })
}

/// Validate a `YYYY-MM-DD` date and return it normalized.
pub(crate) fn parse_day(input: &str) -> Result<String> {
    validate::parse_date(input)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .map_err(|(input, _)| {
            Error::InvalidArgument(format!("invalid date '{input}', expected YYYY-MM-DD"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::sqlite::test_support::{storage_with_project, ACTOR};

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a longer title", 6), "a lon…");
    }

    #[test]
    fn test_resolve_project_uses_current_setting() {
        let (mut storage, project) = storage_with_project();
        storage
            .set_setting(SettingKey::CurrentProject.as_str(), &project.key, ACTOR)
            .unwrap();

        let resolved = resolve_project(&storage, None).unwrap();
        assert_eq!(resolved.id, project.id);
    }

    #[test]
    fn test_resolve_project_explicit_wins() {
        let (storage, _project) = storage_with_project();
        assert!(matches!(
            resolve_project(&storage, Some("NOPE")),
            Err(Error::ProjectNotFound { .. })
        ));
    }

    #[test]
    fn test_invalid_keeps_hint() {
        let err = invalid("priority", ("hihg".into(), Some("High".into())));
        assert!(err.to_string().contains("did you mean 'High'"));
        assert!(err.hint().unwrap().contains("Valid priorities"));
    }

    #[test]
    fn test_parse_day() {
        assert_eq!(parse_day(" 2025-03-31 ").unwrap(), "2025-03-31");
        assert!(matches!(parse_day("31/03/2025"), Err(Error::InvalidArgument(_))));
    }
}
