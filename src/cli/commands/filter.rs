//! Saved and quick filter commands.

use super::{dry_run, open_storage, print_json, resolve_actor, resolve_project, truncate, Globals};
use crate::cli::FilterCommands;
use crate::error::{Error, Result};
use crate::model::SavedFilter;
use crate::query::{EvalContext, Query};
use crate::storage::SqliteStorage;
use colored::Colorize;

/// The query behind a quick or saved filter.
pub(crate) fn resolve_filter_query(storage: &SqliteStorage, name: &str) -> Result<String> {
    Ok(storage.require_filter(name)?.query)
}

/// Execute a filter command.
///
/// # Errors
///
/// Returns an error if the database is missing or the operation fails.
pub fn execute(command: &FilterCommands, globals: Globals<'_>) -> Result<()> {
    let mut storage = open_storage(globals.db)?;
    let actor = resolve_actor(globals.actor);
    let json = globals.json;

    match command {
        FilterCommands::List => {
            let project_id = match resolve_project(&storage, globals.project) {
                Ok(p) => Some(p.id),
                Err(Error::NoProjectSelected { .. }) => None,
                Err(e) => return Err(e),
            };
            let filters = storage.list_filters(project_id.as_deref())?;
            if json {
                return print_json(&serde_json::json!({ "filters": filters, "count": filters.len() }));
            }
            for f in &filters {
                let kind = if f.builtin { "quick" } else { "saved" };
                println!("{:<22} {:<6} {}", f.name.bold(), kind.dimmed(), truncate(&f.query, 60));
            }
            Ok(())
        }
        FilterCommands::Show { name } => {
            let filter = storage.require_filter(name)?;
            if json {
                return print_json(&filter);
            }
            println!("{} ({})", filter.name.bold(), filter.id);
            println!("  Query: {}", filter.query);
            if let Some(ref project_id) = filter.project_id {
                let key = storage.get_project(project_id)?.map_or_else(|| project_id.clone(), |p| p.key);
                println!("  Project: {key}");
            }
            Ok(())
        }
        FilterCommands::Save { name, query, scoped } => {
            let mut filter = SavedFilter::new(name.trim().to_string(), query.trim().to_string(), actor.clone());
            if *scoped {
                filter.project_id = Some(resolve_project(&storage, globals.project)?.id);
            }
            if dry_run(json, "save_filter", &filter.name, &format!("save filter {}", filter.name)) {
                return Ok(());
            }
            storage.save_filter(&filter, &actor)?;
            if crate::is_silent() {
                println!("{}", filter.id);
            } else if json {
                print_json(&filter)?;
            } else {
                println!("Saved filter: {}", filter.name.bold());
            }
            Ok(())
        }
        FilterCommands::Delete { name } => {
            if dry_run(json, "delete_filter", name, &format!("delete filter {name}")) {
                return Ok(());
            }
            let filter = storage.delete_filter(name, &actor)?;
            if json {
                print_json(&serde_json::json!({ "deleted": true, "id": filter.id, "name": filter.name }))?;
            } else if !crate::is_silent() {
                println!("Deleted filter: {}", filter.name);
            }
            Ok(())
        }
        FilterCommands::Run { name, limit } => {
            let filter = storage.require_filter(name)?;
            let project = match filter.project_id {
                Some(ref id) if globals.project.is_none() => storage.require_project(id)?,
                _ => resolve_project(&storage, globals.project)?,
            };
            let issues = storage.list_issues(Some(&project.id))?;
            let query = Query::parse(&filter.query);
            let mut matched = query.filter(&issues, &EvalContext::new(&actor));
            if let Some(limit) = limit {
                matched.truncate(*limit);
            }

            if crate::is_silent() {
                for issue in &matched {
                    println!("{}", issue.key);
                }
            } else if json {
                print_json(&serde_json::json!({
                    "filter": filter.name,
                    "query": filter.query,
                    "issues": matched,
                    "count": matched.len(),
                }))?;
            } else if matched.is_empty() {
                println!("No issues match '{}'.", filter.name);
            } else {
                println!("{} ({}):\n", filter.name.bold(), matched.len());
                for issue in &matched {
                    println!(
                        "  {:<10} {:<44} {:<14} {}",
                        issue.key.bold(),
                        truncate(&issue.title, 44),
                        issue.status,
                        issue.assignee.as_deref().unwrap_or("-")
                    );
                }
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::sqlite::test_support::{storage_with_project, ACTOR};

    #[test]
    fn test_resolve_quick_filter() {
        let (storage, _project) = storage_with_project();
        assert_eq!(resolve_filter_query(&storage, "bugs").unwrap(), "type = Bug");
        assert_eq!(resolve_filter_query(&storage, "High Priority").unwrap(), "priority = High");
    }

    #[test]
    fn test_resolve_saved_filter() {
        let (mut storage, _project) = storage_with_project();
        let filter = SavedFilter::new("mine open".into(), "assignee = currentUser() AND status != Done".into(), ACTOR.into());
        storage.save_filter(&filter, ACTOR).unwrap();

        assert_eq!(
            resolve_filter_query(&storage, "Mine Open").unwrap(),
            "assignee = currentUser() AND status != Done"
        );
        assert!(matches!(
            resolve_filter_query(&storage, "nope"),
            Err(Error::NotFound { .. })
        ));
    }
}
