//! Epic commands.

use super::{dry_run, open_storage, print_json, resolve_actor, resolve_project, truncate, Globals};
use crate::cli::EpicCommands;
use crate::error::{Error, Result};
use crate::model::Epic;
use crate::storage::{EpicUpdate, SqliteStorage};
use colored::Colorize;
use serde::Serialize;

#[derive(Serialize)]
struct EpicView<'a> {
    #[serde(flatten)]
    epic: &'a Epic,
    progress: i64,
}

/// Execute an epic command.
///
/// # Errors
///
/// Returns an error if the database is missing or the operation fails.
pub fn execute(command: &EpicCommands, globals: Globals<'_>) -> Result<()> {
    let mut storage = open_storage(globals.db)?;
    let actor = resolve_actor(globals.actor);
    let json = globals.json;

    match command {
        EpicCommands::Create {
            title,
            description,
            status,
            assignee,
        } => {
            if title.trim().is_empty() {
                return Err(Error::RequiredField("title"));
            }
            let project = resolve_project(&storage, globals.project)?;
            let mut epic = Epic::new(project.id.clone(), title.trim().to_string());
            epic.description.clone_from(description);
            epic.assignee.clone_from(assignee);
            if let Some(status) = status {
                epic.status.clone_from(status);
            }

            if dry_run(json, "create_epic", &epic.title, &format!("create epic '{}' in {}", epic.title, project.key)) {
                return Ok(());
            }
            storage.create_epic(&mut epic, &actor)?;

            if crate::is_silent() {
                println!("{}", epic.key);
            } else if json {
                print_json(&epic)?;
            } else {
                println!("Created epic: {} {}", epic.key.bold(), epic.title);
                println!("  Status: {}", epic.status);
            }
            Ok(())
        }
        EpicCommands::List { status, assignee } => {
            let project = resolve_project(&storage, globals.project)?;
            let epics = storage.list_epics(&project.id, status.as_deref(), assignee.as_deref())?;
            print_list(&epics, &project.key, json)
        }
        EpicCommands::Show { id } => show(&storage, id, json),
        EpicCommands::Update {
            id,
            title,
            description,
            status,
            assignee,
            unassign,
        } => {
            let update = EpicUpdate {
                title: title.clone(),
                description: description.clone(),
                status: status.clone(),
                assignee: if *unassign { Some(None) } else { assignee.clone().map(Some) },
            };
            let epic = storage.require_epic(id)?;
            if dry_run(json, "update_epic", &epic.key, &format!("update epic {}", epic.key)) {
                return Ok(());
            }
            let updated = storage.update_epic(&epic.id, &update, &actor)?;
            if crate::is_silent() {
                println!("{}", updated.key);
            } else if json {
                print_json(&updated)?;
            } else {
                println!("Updated epic: {} {}", updated.key.bold(), updated.title);
                println!("  Status: {}", updated.status);
            }
            Ok(())
        }
        EpicCommands::Delete { id } => {
            let epic = storage.require_epic(id)?;
            if dry_run(json, "delete_epic", &epic.key, &format!("delete epic {}", epic.key)) {
                return Ok(());
            }
            let deleted = storage.delete_epic(&epic.id, &actor)?;
            if crate::is_silent() {
                println!("{}", deleted.key);
            } else if json {
                print_json(&serde_json::json!({
                    "deleted": true,
                    "key": deleted.key,
                    "issues_detached": deleted.issue_ids.len(),
                }))?;
            } else {
                println!("Deleted epic: {} {}", deleted.key, deleted.title);
            }
            Ok(())
        }
        EpicCommands::AddIssue { epic, issues } => {
            membership(&mut storage, epic, issues, true, json, &actor)
        }
        EpicCommands::RemoveIssue { epic, issues } => {
            membership(&mut storage, epic, issues, false, json, &actor)
        }
    }
}

fn print_list(epics: &[Epic], project_key: &str, json: bool) -> Result<()> {
    if crate::is_csv() {
        println!("key,title,status,assignee,points,completed_points,progress");
        for e in epics {
            println!(
                "{},{},{},{},{},{},{}",
                e.key,
                crate::csv_escape(&e.title),
                crate::csv_escape(&e.status),
                crate::csv_escape(e.assignee.as_deref().unwrap_or("")),
                e.story_points,
                e.completed_story_points,
                e.progress()
            );
        }
    } else if json {
        let views: Vec<EpicView<'_>> = epics
            .iter()
            .map(|epic| EpicView {
                epic,
                progress: epic.progress(),
            })
            .collect();
        print_json(&serde_json::json!({ "epics": views, "count": views.len() }))?;
    } else if epics.is_empty() {
        println!("No epics in {project_key}.");
    } else {
        println!("Epics in {project_key} ({}):\n", epics.len());
        for e in epics {
            println!(
                "  {:<14} {:<40} {:<12} {:>3}% ({}/{} pts)",
                e.key.bold(),
                truncate(&e.title, 40),
                e.status,
                e.progress(),
                e.completed_story_points,
                e.story_points
            );
        }
    }
    Ok(())
}

fn show(storage: &SqliteStorage, id: &str, json: bool) -> Result<()> {
    let epic = storage.require_epic(id)?;
    let issues = storage.list_epic_issues(&epic.id)?;

    if json {
        return print_json(&serde_json::json!({
            "epic": EpicView { epic: &epic, progress: epic.progress() },
            "issues": issues,
        }));
    }

    println!("{} {}", epic.key.bold(), epic.title);
    println!("  Status:   {}", epic.status);
    println!("  Assignee: {}", epic.assignee.as_deref().unwrap_or("-"));
    println!(
        "  Progress: {}% ({}/{} points)",
        epic.progress(),
        epic.completed_story_points,
        epic.story_points
    );
    if let Some(ref desc) = epic.description {
        println!();
        println!("{desc}");
    }
    if !issues.is_empty() {
        println!();
        println!("Issues ({}):", issues.len());
        for issue in &issues {
            println!("  {:<10} {:<44} {}", issue.key, truncate(&issue.title, 44), issue.status);
        }
    }
    Ok(())
}

fn membership(
    storage: &mut SqliteStorage,
    epic: &str,
    issues: &[String],
    add: bool,
    json: bool,
    actor: &str,
) -> Result<()> {
    let epic = storage.require_epic(epic)?;
    let (action, human) = if add {
        ("add_to_epic", format!("add {} to {}", issues.join(", "), epic.key))
    } else {
        ("remove_from_epic", format!("remove {} from {}", issues.join(", "), epic.key))
    };
    if dry_run(json, action, &epic.key, &human) {
        return Ok(());
    }

    for issue in issues {
        if add {
            storage.add_issue_to_epic(&epic.id, issue, actor)?;
        } else {
            storage.remove_issue_from_epic(&epic.id, issue, actor)?;
        }
    }

    if crate::is_silent() {
        println!("{}", epic.key);
    } else if json {
        print_json(&serde_json::json!({ "epic": epic.key, "issues": issues, "added": add }))?;
    } else if add {
        println!("Added {} to {}", issues.join(", "), epic.key.bold());
    } else {
        println!("Removed {} from {}", issues.join(", "), epic.key.bold());
    }
    Ok(())
}
