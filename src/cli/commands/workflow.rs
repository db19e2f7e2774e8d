//! Workflow commands.

use super::{dry_run, open_storage, print_json, resolve_actor, resolve_project, Globals};
use crate::cli::{WorkflowCommands, WorkflowCreateArgs};
use crate::error::{Error, Result};
use crate::storage::SqliteStorage;
use crate::workflow::{Transition, Workflow};
use colored::Colorize;

/// Execute a workflow command.
///
/// # Errors
///
/// Returns an error if the database is missing or the operation fails.
pub fn execute(command: &WorkflowCommands, globals: Globals<'_>) -> Result<()> {
    let mut storage = open_storage(globals.db)?;
    let actor = resolve_actor(globals.actor);
    let json = globals.json;

    match command {
        WorkflowCommands::List => {
            let workflows = storage.list_workflows()?;
            if json {
                return print_json(&serde_json::json!({ "workflows": workflows, "count": workflows.len() }));
            }
            for w in &workflows {
                let kind = if w.builtin { "built-in" } else { "custom" };
                println!("{:<12} {:<22} {:<9} {}", w.id.bold(), w.name, kind.dimmed(), w.statuses.join(" → "));
            }
            Ok(())
        }
        WorkflowCommands::Show { id } => {
            let workflow = match id {
                Some(id) => storage
                    .get_workflow(id)?
                    .ok_or_else(|| Error::not_found("Workflow", id))?,
                None => {
                    let project = resolve_project(&storage, globals.project)?;
                    storage.workflow_for_project(&project)?
                }
            };
            if json {
                return print_json(&workflow);
            }
            print_workflow(&workflow);
            Ok(())
        }
        WorkflowCommands::Create(args) => create(&mut storage, args, json, &actor),
        WorkflowCommands::Delete { id } => {
            if dry_run(json, "delete_workflow", id, &format!("delete workflow {id}")) {
                return Ok(());
            }
            let moved = storage.delete_workflow(id, &actor)?;
            if json {
                print_json(&serde_json::json!({ "deleted": true, "id": id, "projects_moved": moved }))?;
            } else if !crate::is_silent() {
                println!("Deleted workflow {id}");
                if moved > 0 {
                    println!("  {moved} project(s) moved to the default workflow");
                }
            }
            Ok(())
        }
        WorkflowCommands::Use { id } => {
            let project = resolve_project(&storage, globals.project)?;
            if dry_run(json, "set_project_workflow", &project.key, &format!("switch {} to workflow {id}", project.key)) {
                return Ok(());
            }
            let (project, remapped) = storage.set_project_workflow(&project.id, id, &actor)?;
            if crate::is_silent() {
                println!("{}", project.workflow_id);
            } else if json {
                print_json(&serde_json::json!({
                    "project": project.key,
                    "workflow": project.workflow_id,
                    "issues_remapped": remapped,
                }))?;
            } else {
                println!("{} now uses workflow {}", project.key.bold(), project.workflow_id);
                if remapped > 0 {
                    println!("  {remapped} issue(s) moved to the initial status");
                }
            }
            Ok(())
        }
    }
}

/// Forward transitions through `statuses` in order.
fn sequential_transitions(statuses: &[String]) -> Vec<Transition> {
    statuses
        .windows(2)
        .map(|pair| Transition::new(&format!("Move to {}", pair[1]), &pair[0], &pair[1]))
        .collect()
}

fn create(storage: &mut SqliteStorage, args: &WorkflowCreateArgs, json: bool, actor: &str) -> Result<()> {
    let mut workflow = Workflow::new(args.name.trim().to_string());
    workflow.statuses = args
        .statuses
        .iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    workflow.transitions = if args.transitions.is_empty() {
        sequential_transitions(&workflow.statuses)
    } else {
        args.transitions
            .iter()
            .map(|spec| Transition::parse_spec(spec))
            .collect::<Result<_>>()?
    };
    workflow.description.clone_from(&args.description);
    if let Some(ref color) = args.color {
        workflow.color.clone_from(color);
    }
    workflow.validate()?;

    if dry_run(json, "create_workflow", &workflow.name, &format!("create workflow {}", workflow.name)) {
        return Ok(());
    }
    storage.create_workflow(&workflow, actor)?;

    if crate::is_silent() {
        println!("{}", workflow.id);
    } else if json {
        print_json(&workflow)?;
    } else {
        println!("Created workflow: {} ({})", workflow.name.bold(), workflow.id);
        print_workflow(&workflow);
    }
    Ok(())
}

fn print_workflow(workflow: &Workflow) {
    println!("{} [{}]", workflow.name.bold(), workflow.id);
    if let Some(ref desc) = workflow.description {
        println!("  {desc}");
    }
    println!("  Statuses: {}", workflow.statuses.join(" → "));
    println!("  Transitions:");
    for t in &workflow.transitions {
        println!("    {:<20} {} → {}", t.label, t.from, t.to);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_transitions() {
        let statuses = vec!["Idea".to_string(), "Doing".to_string(), "Shipped".to_string()];
        let transitions = sequential_transitions(&statuses);
        assert_eq!(transitions.len(), 2);
        assert_eq!(transitions[0], Transition::new("Move to Doing", "Idea", "Doing"));
        assert_eq!(transitions[1].to, "Shipped");
    }
}
