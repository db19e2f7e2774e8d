//! Sprint commands.
//!
//! Sprints are looked up by name within the resolved project, or by id
//! anywhere.

use super::{dry_run, open_storage, parse_day, print_json, resolve_actor, resolve_project, truncate, Globals};
use crate::cli::{SprintCommands, SprintCreateArgs, SprintUpdateArgs};
use crate::error::{Error, Result};
use crate::model::{Sprint, SprintProgress, SprintStatus};
use crate::storage::{SprintUpdate, SqliteStorage};
use colored::Colorize;
use serde::Serialize;

#[derive(Serialize)]
struct SprintView<'a> {
    #[serde(flatten)]
    sprint: &'a Sprint,
    progress: SprintProgress,
    percent_complete: i64,
}

/// Execute a sprint command.
///
/// # Errors
///
/// Returns an error if the database is missing or the operation fails.
pub fn execute(command: &SprintCommands, globals: Globals<'_>) -> Result<()> {
    let mut storage = open_storage(globals.db)?;
    let actor = resolve_actor(globals.actor);
    let json = globals.json;
    let project = globals.project;

    match command {
        SprintCommands::Create(args) => create(&mut storage, args, project, json, &actor),
        SprintCommands::List { status } => list(&storage, *status, project, json),
        SprintCommands::Show { sprint } => {
            let sprint = lookup(&storage, sprint, project)?;
            show(&storage, &sprint, json)
        }
        SprintCommands::Update(args) => update(&mut storage, args, project, json, &actor),
        SprintCommands::Delete { sprint } => {
            let sprint = lookup(&storage, sprint, project)?;
            if dry_run(json, "delete_sprint", &sprint.name, &format!("delete sprint {}", sprint.name)) {
                return Ok(());
            }
            let deleted = storage.delete_sprint(&sprint.id, &actor)?;
            if crate::is_silent() {
                println!("{}", deleted.id);
            } else if json {
                print_json(&serde_json::json!({
                    "deleted": true,
                    "id": deleted.id,
                    "name": deleted.name,
                    "issues_returned": deleted.issue_ids.len(),
                }))?;
            } else {
                println!("Deleted sprint: {}", deleted.name);
                if !deleted.issue_ids.is_empty() {
                    println!("  {} issues returned to the backlog", deleted.issue_ids.len());
                }
            }
            Ok(())
        }
        SprintCommands::AddIssue { sprint, issues } => {
            let sprint = lookup(&storage, sprint, project)?;
            move_issues(&mut storage, &sprint, issues, true, json, &actor)
        }
        SprintCommands::RemoveIssue { sprint, issues } => {
            let sprint = lookup(&storage, sprint, project)?;
            move_issues(&mut storage, &sprint, issues, false, json, &actor)
        }
        SprintCommands::Start { sprint } => {
            let sprint = lookup(&storage, sprint, project)?;
            if dry_run(json, "start_sprint", &sprint.name, &format!("start sprint {}", sprint.name)) {
                return Ok(());
            }
            let started = storage.start_sprint(&sprint.id, &actor)?;
            if crate::is_silent() {
                println!("{}", started.id);
            } else if json {
                print_json(&started)?;
            } else {
                println!("Started sprint: {}", started.name.bold());
                println!("  {} → {}", started.start_date, started.end_date);
                println!("  Issues: {}", started.issue_ids.len());
            }
            Ok(())
        }
        SprintCommands::Complete { sprint, move_to } => {
            let sprint = lookup(&storage, sprint, project)?;
            if dry_run(json, "complete_sprint", &sprint.name, &format!("complete sprint {}", sprint.name)) {
                return Ok(());
            }
            let done = storage.complete_sprint(&sprint.id, move_to.as_deref(), &actor)?;
            if crate::is_silent() {
                println!("{}", done.sprint.id);
            } else if json {
                print_json(&done)?;
            } else {
                println!("Completed sprint: {}", done.sprint.name.bold());
                println!("  Velocity:  {} points", done.velocity);
                println!("  Completed: {} issues", done.completed_issues);
                if done.moved_issues > 0 {
                    let target = done.moved_to.as_deref().unwrap_or("the backlog");
                    println!("  Moved:     {} unfinished issues to {target}", done.moved_issues);
                }
            }
            Ok(())
        }
        SprintCommands::Active => {
            let project = resolve_project(&storage, project)?;
            match storage.active_sprint(&project.id)? {
                Some(sprint) => show(&storage, &sprint, json),
                None if json => print_json(&serde_json::Value::Null),
                None => {
                    println!("No active sprint in {}.", project.key);
                    Ok(())
                }
            }
        }
    }
}

/// Find a sprint, scoped to the resolved project when there is one.
fn lookup(storage: &SqliteStorage, sprint: &str, project: Option<&str>) -> Result<Sprint> {
    let scope = match resolve_project(storage, project) {
        Ok(p) => Some(p.id),
        Err(Error::NoProjectSelected { .. }) => None,
        Err(e) => return Err(e),
    };
    storage.require_sprint(sprint, scope.as_deref())
}

fn create(
    storage: &mut SqliteStorage,
    args: &SprintCreateArgs,
    project: Option<&str>,
    json: bool,
    actor: &str,
) -> Result<()> {
    if args.name.trim().is_empty() {
        return Err(Error::RequiredField("name"));
    }
    let project = resolve_project(storage, project)?;

    let mut sprint = Sprint::new(
        project.id.clone(),
        args.name.trim().to_string(),
        parse_day(&args.start)?,
        parse_day(&args.end)?,
    );
    sprint.goal.clone_from(&args.goal);
    sprint.capacity = args.capacity;
    sprint.team_members.clone_from(&args.members);

    if dry_run(json, "create_sprint", &sprint.name, &format!("create sprint {} in {}", sprint.name, project.key)) {
        return Ok(());
    }

    storage.create_sprint(&sprint, actor)?;

    if crate::is_silent() {
        println!("{}", sprint.id);
    } else if json {
        print_json(&sprint)?;
    } else {
        println!("Created sprint: {}", sprint.name.bold());
        println!("  Project: {}", project.key);
        println!("  Dates:   {} → {}", sprint.start_date, sprint.end_date);
        if let Some(ref goal) = sprint.goal {
            println!("  Goal:    {goal}");
        }
    }
    Ok(())
}

fn list(storage: &SqliteStorage, status: Option<SprintStatus>, project: Option<&str>, json: bool) -> Result<()> {
    let project = resolve_project(storage, project)?;
    let sprints = storage.list_sprints(&project.id, status)?;

    if crate::is_csv() {
        println!("id,name,status,start,end,issues,velocity");
        for s in &sprints {
            println!(
                "{},{},{},{},{},{},{}",
                s.id,
                crate::csv_escape(&s.name),
                s.status.as_str(),
                s.start_date,
                s.end_date,
                s.issue_ids.len(),
                s.velocity.map_or(String::new(), |v| v.to_string())
            );
        }
    } else if json {
        print_json(&serde_json::json!({ "sprints": sprints, "count": sprints.len() }))?;
    } else if sprints.is_empty() {
        println!("No sprints in {}.", project.key);
    } else {
        println!("Sprints in {} ({}):\n", project.key, sprints.len());
        for s in &sprints {
            let status = match s.status {
                SprintStatus::Active => s.status.as_str().green().to_string(),
                SprintStatus::Completed => s.status.as_str().dimmed().to_string(),
                SprintStatus::Planned => s.status.as_str().to_string(),
            };
            println!(
                "  {:<24} {:<10} {} → {}  {} issues",
                truncate(&s.name, 24).bold(),
                status,
                s.start_date,
                s.end_date,
                s.issue_ids.len()
            );
        }
    }
    Ok(())
}

fn show(storage: &SqliteStorage, sprint: &Sprint, json: bool) -> Result<()> {
    let progress = storage.sprint_progress(sprint)?;

    if json {
        return print_json(&SprintView {
            sprint,
            progress,
            percent_complete: progress.percent(),
        });
    }

    println!("Sprint: {} [{}]", sprint.name.bold(), sprint.status.as_str());
    println!("  ID:       {}", sprint.id);
    println!("  Dates:    {} → {}", sprint.start_date, sprint.end_date);
    if let Some(ref goal) = sprint.goal {
        println!("  Goal:     {goal}");
    }
    if let Some(capacity) = sprint.capacity {
        println!("  Capacity: {capacity} points");
    }
    if !sprint.team_members.is_empty() {
        println!("  Team:     {}", sprint.team_members.join(", "));
    }
    if let Some(velocity) = sprint.velocity {
        println!("  Velocity: {velocity} points");
    }
    println!();
    println!(
        "Progress: {}/{} issues done, {}/{} points ({}%)",
        progress.done_count,
        progress.issue_count,
        progress.completed_points,
        progress.committed_points,
        progress.percent()
    );

    let issues = storage.list_sprint_issues(&sprint.id)?;
    if !issues.is_empty() {
        println!();
        for issue in &issues {
            println!("  {:<10} {:<44} {}", issue.key, truncate(&issue.title, 44), issue.status);
        }
    }
    Ok(())
}

fn update(
    storage: &mut SqliteStorage,
    args: &SprintUpdateArgs,
    project: Option<&str>,
    json: bool,
    actor: &str,
) -> Result<()> {
    let sprint = lookup(storage, &args.sprint, project)?;

    let update = SprintUpdate {
        name: args.name.clone(),
        goal: args.goal.clone(),
        start_date: args.start.as_deref().map(parse_day).transpose()?,
        end_date: args.end.as_deref().map(parse_day).transpose()?,
        capacity: args.capacity,
        team_members: args.members.clone(),
    };

    if dry_run(json, "update_sprint", &sprint.name, &format!("update sprint {}", sprint.name)) {
        return Ok(());
    }

    let updated = storage.update_sprint(&sprint.id, &update, actor)?;

    if crate::is_silent() {
        println!("{}", updated.id);
    } else if json {
        print_json(&updated)?;
    } else {
        println!("Updated sprint: {}", updated.name.bold());
        println!("  Dates: {} → {}", updated.start_date, updated.end_date);
    }
    Ok(())
}

fn move_issues(
    storage: &mut SqliteStorage,
    sprint: &Sprint,
    issues: &[String],
    add: bool,
    json: bool,
    actor: &str,
) -> Result<()> {
    let (action, verb) = if add {
        ("add_to_sprint", "add")
    } else {
        ("remove_from_sprint", "remove")
    };
    let human = format!("{verb} {} issue(s) {} sprint {}", issues.len(), if add { "to" } else { "from" }, sprint.name);
    if dry_run(json, action, &sprint.name, &human) {
        return Ok(());
    }

    for issue in issues {
        if add {
            storage.add_issue_to_sprint(&sprint.id, issue, actor)?;
        } else {
            storage.remove_issue_from_sprint(&sprint.id, issue, actor)?;
        }
    }

    if crate::is_silent() {
        for issue in issues {
            println!("{issue}");
        }
    } else if json {
        print_json(&serde_json::json!({
            "sprint": sprint.name,
            "issues": issues,
            "added": add,
        }))?;
    } else if add {
        println!("Added {} to {}", issues.join(", "), sprint.name.bold());
    } else {
        println!("Removed {} from {}", issues.join(", "), sprint.name.bold());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::sqlite::test_support::{storage_with_project, ACTOR};

    #[test]
    fn test_lookup_by_name_in_current_project() {
        let (mut storage, project) = storage_with_project();
        storage
            .set_setting(crate::model::SettingKey::CurrentProject.as_str(), &project.key, ACTOR)
            .unwrap();
        let sprint = Sprint::new(project.id.clone(), "Sprint 1".into(), "2025-01-06".into(), "2025-01-19".into());
        storage.create_sprint(&sprint, ACTOR).unwrap();

        let found = lookup(&storage, "sprint 1", None).unwrap();
        assert_eq!(found.id, sprint.id);
    }

    #[test]
    fn test_lookup_by_id_without_project() {
        let (mut storage, project) = storage_with_project();
        let sprint = Sprint::new(project.id.clone(), "Sprint 1".into(), "2025-01-06".into(), "2025-01-19".into());
        storage.create_sprint(&sprint, ACTOR).unwrap();

        let found = lookup(&storage, &sprint.id, None).unwrap();
        assert_eq!(found.name, "Sprint 1");
    }
}
