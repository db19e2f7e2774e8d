//! Settings commands.
//!
//! Values are validated per key: `theme` must be a known theme,
//! `current_project` stores a project key and `current_org` an
//! organization id.

use super::{dry_run, open_storage, print_json, resolve_actor, Globals};
use crate::cli::SettingsCommands;
use crate::error::{Error, Result};
use crate::model::{SettingKey, Theme};
use crate::storage::SqliteStorage;

/// Execute a settings command.
///
/// # Errors
///
/// Returns an error if the database is missing or the value is invalid.
pub fn execute(command: &SettingsCommands, globals: Globals<'_>) -> Result<()> {
    let mut storage = open_storage(globals.db)?;
    let actor = resolve_actor(globals.actor);
    let json = globals.json;

    match command {
        SettingsCommands::Get { key } => {
            let value = effective_value(&storage, *key)?;
            if json {
                print_json(&serde_json::json!({ "key": key.as_str(), "value": value }))?;
            } else {
                println!("{}", value.as_deref().unwrap_or(""));
            }
            Ok(())
        }
        SettingsCommands::Set { key, value } => {
            let stored = normalize(&storage, *key, value)?;
            if dry_run(json, "set_setting", key.as_str(), &format!("set {} = {stored}", key.as_str())) {
                return Ok(());
            }
            storage.set_setting(key.as_str(), &stored, &actor)?;
            if json {
                print_json(&serde_json::json!({ "key": key.as_str(), "value": stored }))?;
            } else if !crate::is_silent() {
                println!("{} = {stored}", key.as_str());
            }
            Ok(())
        }
        SettingsCommands::Unset { key } => {
            if dry_run(json, "clear_setting", key.as_str(), &format!("clear {}", key.as_str())) {
                return Ok(());
            }
            let removed = storage.clear_setting(key.as_str(), &actor)?;
            if json {
                print_json(&serde_json::json!({ "key": key.as_str(), "removed": removed }))?;
            } else if !crate::is_silent() {
                if removed {
                    println!("Cleared {}", key.as_str());
                } else {
                    println!("{} was not set", key.as_str());
                }
            }
            Ok(())
        }
        SettingsCommands::List => {
            let mut values = Vec::with_capacity(SettingKey::ALL.len());
            for key in SettingKey::ALL {
                values.push((key.as_str(), effective_value(&storage, key)?));
            }
            if json {
                let map: serde_json::Map<String, serde_json::Value> = values
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v.map_or(serde_json::Value::Null, serde_json::Value::String)))
                    .collect();
                print_json(&map)?;
            } else {
                for (key, value) in values {
                    println!("{key:<16} {}", value.as_deref().unwrap_or("-"));
                }
            }
            Ok(())
        }
    }
}

/// The stored value, with the theme defaulting to `system`.
fn effective_value(storage: &SqliteStorage, key: SettingKey) -> Result<Option<String>> {
    let value = storage.get_setting(key.as_str())?;
    Ok(match key {
        SettingKey::Theme => Some(value.unwrap_or_else(|| Theme::default().as_str().to_string())),
        _ => value,
    })
}

/// Validate a value for `key` and return what gets stored.
fn normalize(storage: &SqliteStorage, key: SettingKey, value: &str) -> Result<String> {
    match key {
        SettingKey::Theme => Theme::parse(value)
            .map(|t| t.as_str().to_string())
            .ok_or_else(|| Error::InvalidArgument(format!("unknown theme '{value}' (light, dark, system)"))),
        SettingKey::CurrentProject => Ok(storage.require_project(value)?.key),
        SettingKey::CurrentOrg => Ok(storage.require_organization(value)?.id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::sqlite::test_support::storage_with_project;

    #[test]
    fn test_theme_defaults_to_system() {
        let (storage, _project) = storage_with_project();
        assert_eq!(effective_value(&storage, SettingKey::Theme).unwrap().as_deref(), Some("system"));
        assert_eq!(effective_value(&storage, SettingKey::CurrentOrg).unwrap(), None);
    }

    #[test]
    fn test_normalize_values() {
        let (storage, project) = storage_with_project();
        assert_eq!(normalize(&storage, SettingKey::Theme, "DARK").unwrap(), "dark");
        assert!(matches!(
            normalize(&storage, SettingKey::Theme, "sepia"),
            Err(Error::InvalidArgument(_))
        ));
        assert_eq!(normalize(&storage, SettingKey::CurrentProject, &project.id).unwrap(), "MOB");
        assert!(normalize(&storage, SettingKey::CurrentProject, "NOPE").is_err());
    }
}
