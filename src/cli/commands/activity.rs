//! Activity feed from the audit event log.
//!
//! Sources, most specific first: one issue (`--issue`), an explicit
//! project (`--project` / `PU_PROJECT`), else the whole database.

use super::{format_short, open_storage, print_json, Globals};
use crate::cli::ActivityArgs;
use crate::config::resolve_project_key;
use crate::error::Result;
use crate::storage::events::{get_events, project_events, recent_events, Event};
use crate::storage::SqliteStorage;
use colored::Colorize;
use serde::Serialize;

#[derive(Serialize)]
struct ActivityEntry<'a> {
    #[serde(flatten)]
    event: &'a Event,
    summary: String,
}

/// Execute the activity command.
///
/// # Errors
///
/// Returns an error if the database is missing or the query fails.
pub fn execute(args: &ActivityArgs, globals: Globals<'_>) -> Result<()> {
    let storage = open_storage(globals.db)?;
    let events = collect(&storage, args, globals.project)?;

    if globals.json {
        let entries: Vec<ActivityEntry<'_>> = events
            .iter()
            .map(|event| ActivityEntry {
                event,
                summary: event.summary(),
            })
            .collect();
        return print_json(&serde_json::json!({ "events": entries, "count": entries.len() }));
    }

    if crate::is_csv() {
        println!("time,actor,entity,event,summary");
        for e in &events {
            println!(
                "{},{},{},{},{}",
                format_short(e.created_at),
                crate::csv_escape(&e.actor),
                e.entity_type,
                e.event_type.as_str(),
                crate::csv_escape(&e.summary())
            );
        }
        return Ok(());
    }

    if events.is_empty() {
        println!("No activity.");
        return Ok(());
    }
    for e in &events {
        println!(
            "{} {:<24} {}",
            format_short(e.created_at).dimmed(),
            e.actor.bold(),
            e.summary()
        );
    }
    Ok(())
}

fn collect(storage: &SqliteStorage, args: &ActivityArgs, project: Option<&str>) -> Result<Vec<Event>> {
    let mut events = if let Some(ref issue) = args.issue {
        let issue = storage.require_issue(issue)?;
        get_events(storage.conn(), "issue", &issue.id, Some(args.limit))?
    } else if let Some(key) = resolve_project_key(project) {
        let project = storage.require_project(&key)?;
        project_events(storage.conn(), &project.id, args.limit)?
    } else {
        return Ok(recent_events(
            storage.conn(),
            args.entity.as_deref(),
            args.by.as_deref(),
            args.limit,
        )?);
    };

    events.retain(|e| {
        args.entity.as_deref().is_none_or(|t| e.entity_type == t)
            && args.by.as_deref().is_none_or(|a| e.actor == a)
    });
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Issue;
    use crate::storage::sqlite::test_support::{storage_with_project, ACTOR};

    fn args() -> ActivityArgs {
        ActivityArgs {
            issue: None,
            entity: None,
            by: None,
            limit: 20,
        }
    }

    #[test]
    fn test_issue_activity() {
        let (mut storage, project) = storage_with_project();
        let mut issue = Issue::new(project.id.clone(), "Login crash".into(), "To Do".into());
        storage.create_issue(&mut issue, ACTOR).unwrap();
        storage.transition_issue(&issue.id, "In Progress", ACTOR).unwrap();

        let mut a = args();
        a.issue = Some(issue.key.clone());
        let events = collect(&storage, &a, None).unwrap();
        assert!(events.len() >= 2);
        assert!(events.iter().all(|e| e.entity_id == issue.id));
    }

    #[test]
    fn test_filter_by_actor() {
        let (mut storage, project) = storage_with_project();
        let mut issue = Issue::new(project.id.clone(), "Login crash".into(), "To Do".into());
        storage.create_issue(&mut issue, ACTOR).unwrap();

        let mut a = args();
        a.issue = Some(issue.key.clone());
        a.by = Some("someone-else".into());
        assert!(collect(&storage, &a, None).unwrap().is_empty());
    }

    #[test]
    fn test_whole_database_activity() {
        let (mut storage, project) = storage_with_project();
        let mut issue = Issue::new(project.id.clone(), "Login crash".into(), "To Do".into());
        storage.create_issue(&mut issue, ACTOR).unwrap();

        let events = collect(&storage, &args(), None).unwrap();
        assert!(events.iter().any(|e| e.entity_type == "project"));
        assert!(events.iter().any(|e| e.entity_id == issue.id));

        let mut a = args();
        a.entity = Some("issue".into());
        let events = collect(&storage, &a, None).unwrap();
        assert!(!events.is_empty());
        assert!(events.iter().all(|e| e.entity_type == "issue"));
    }
}
