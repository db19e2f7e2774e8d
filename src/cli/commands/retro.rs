//! Retrospective board commands.
//!
//! Feedback without `--sprint` attaches to the project's active sprint,
//! or to the project alone when no sprint is running.

use super::{dry_run, open_storage, print_json, resolve_actor, resolve_project, Globals};
use crate::cli::RetroCommands;
use crate::error::Result;
use crate::model::{Feedback, FeedbackType};
use colored::Colorize;

/// Execute a retro command.
///
/// # Errors
///
/// Returns an error if the database is missing or the operation fails.
pub fn execute(command: &RetroCommands, globals: Globals<'_>) -> Result<()> {
    let mut storage = open_storage(globals.db)?;
    let actor = resolve_actor(globals.actor);
    let json = globals.json;

    match command {
        RetroCommands::Add {
            feedback_type,
            text,
            sprint,
        } => {
            let project = resolve_project(&storage, globals.project)?;
            let sprint_id = match sprint {
                Some(s) => Some(storage.require_sprint(s, Some(&project.id))?.id),
                None => storage.active_sprint(&project.id)?.map(|s| s.id),
            };

            let mut feedback = Feedback::new(project.id.clone(), *feedback_type, text.trim().to_string(), actor.clone());
            feedback.sprint_id = sprint_id;

            if dry_run(json, "add_feedback", feedback_type.as_str(), &format!("add {} feedback", feedback_type.as_str())) {
                return Ok(());
            }
            storage.add_feedback(&feedback, &actor)?;

            if crate::is_silent() {
                println!("{}", feedback.id);
            } else if json {
                print_json(&feedback)?;
            } else {
                println!("Added to {}: {}", feedback_type.heading().bold(), feedback.text);
            }
            Ok(())
        }
        RetroCommands::List {
            sprint,
            feedback_type,
            unresolved,
        } => {
            let project = resolve_project(&storage, globals.project)?;
            let sprint_id = match sprint {
                Some(s) => Some(storage.require_sprint(s, Some(&project.id))?.id),
                None => None,
            };
            let cards = storage.list_feedback(&project.id, sprint_id.as_deref(), *feedback_type, *unresolved)?;

            if crate::is_csv() {
                println!("id,type,text,author,resolved");
                for c in &cards {
                    println!(
                        "{},{},{},{},{}",
                        c.id,
                        c.feedback_type.as_str(),
                        crate::csv_escape(&c.text),
                        crate::csv_escape(&c.author),
                        c.resolved
                    );
                }
            } else if json {
                print_json(&serde_json::json!({ "feedback": cards, "count": cards.len() }))?;
            } else if cards.is_empty() {
                println!("No retrospective feedback.");
            } else {
                print_board(&cards);
            }
            Ok(())
        }
        RetroCommands::Edit { id, text } => {
            if dry_run(json, "edit_feedback", id, &format!("edit feedback {id}")) {
                return Ok(());
            }
            let card = storage.edit_feedback(id, text, &actor)?;
            if json {
                print_json(&card)?;
            } else if !crate::is_silent() {
                println!("Updated feedback {}", card.id);
            }
            Ok(())
        }
        RetroCommands::Resolve { id } | RetroCommands::Unresolve { id } => {
            let resolved = matches!(command, RetroCommands::Resolve { .. });
            let verb = if resolved { "resolve" } else { "reopen" };
            if dry_run(json, "set_feedback_resolved", id, &format!("{verb} feedback {id}")) {
                return Ok(());
            }
            let card = storage.set_feedback_resolved(id, resolved, &actor)?;
            if json {
                print_json(&card)?;
            } else if !crate::is_silent() {
                let state = if card.resolved { "resolved" } else { "open" };
                println!("Feedback {} is {state}", card.id);
            }
            Ok(())
        }
        RetroCommands::Delete { id } => {
            if dry_run(json, "delete_feedback", id, &format!("delete feedback {id}")) {
                return Ok(());
            }
            let card = storage.delete_feedback(id, &actor)?;
            if json {
                print_json(&serde_json::json!({ "deleted": true, "id": card.id }))?;
            } else if !crate::is_silent() {
                println!("Deleted feedback {}", card.id);
            }
            Ok(())
        }
    }
}

/// Print cards grouped under their type headings.
fn print_board(cards: &[Feedback]) {
    for kind in FeedbackType::ALL {
        let group: Vec<&Feedback> = cards.iter().filter(|c| c.feedback_type == kind).collect();
        if group.is_empty() {
            continue;
        }
        println!("{} ({})", kind.heading().bold(), group.len());
        for c in group {
            let mark = if c.resolved { "[x]" } else { "[ ]" };
            println!("  {mark} {} {}", c.text, format!("({}, {})", c.author, c.id).dimmed());
        }
        println!();
    }
}
