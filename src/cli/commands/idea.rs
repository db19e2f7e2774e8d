//! Idea board commands.

use super::{dry_run, format_short, open_storage, print_json, resolve_actor, truncate, Globals};
use crate::cli::{IdeaCommands, IdeaCommentCommands};
use crate::config::resolve_project_key;
use crate::error::{Error, Result};
use crate::model::{Idea, IdeaStatus};
use crate::storage::SqliteStorage;
use colored::Colorize;

/// Execute an idea command.
///
/// # Errors
///
/// Returns an error if the database is missing or the operation fails.
pub fn execute(command: &IdeaCommands, globals: Globals<'_>) -> Result<()> {
    let mut storage = open_storage(globals.db)?;
    let actor = resolve_actor(globals.actor);
    let json = globals.json;

    match command {
        IdeaCommands::Create {
            title,
            description,
            category,
            impact,
            tags,
        } => {
            if title.trim().is_empty() {
                return Err(Error::RequiredField("title"));
            }
            let mut idea = Idea::new(title.trim().to_string(), actor.clone());
            idea.description.clone_from(description);
            idea.category = *category;
            idea.impact = *impact;
            idea.tags.clone_from(tags);
            idea.organization_id = storage.current_organization(&actor)?.map(|o| o.id);

            if dry_run(json, "create_idea", &idea.title, &format!("submit idea '{}'", idea.title)) {
                return Ok(());
            }
            storage.create_idea(&idea, &actor)?;

            if crate::is_silent() {
                println!("{}", idea.id);
            } else if json {
                print_json(&idea)?;
            } else {
                println!("Submitted idea: {}", idea.title.bold());
                println!("  ID:       {}", idea.id);
                println!("  Category: {}", idea.category.as_str());
                println!("  Impact:   {}", idea.impact.as_str());
            }
            Ok(())
        }
        IdeaCommands::List { status, category } => {
            let ideas = storage.list_ideas(*status, *category, None)?;
            print_list(&ideas, json)
        }
        IdeaCommands::Show { id } => {
            let idea = storage.require_idea(id)?;
            if json {
                return print_json(&idea);
            }
            print_idea(&storage, &idea)
        }
        IdeaCommands::Upvote { id } => {
            if dry_run(json, "upvote_idea", id, &format!("upvote idea {id}")) {
                return Ok(());
            }
            let idea = storage.upvote_idea(id, &actor)?;
            if crate::is_silent() {
                println!("{}", idea.upvotes);
            } else if json {
                print_json(&serde_json::json!({ "id": idea.id, "upvotes": idea.upvotes }))?;
            } else {
                println!("Upvoted '{}' ({} votes)", idea.title, idea.upvotes);
            }
            Ok(())
        }
        IdeaCommands::Comment { command } => comment(&mut storage, command, json, &actor),
        IdeaCommands::Status { id, status } => {
            if *status == IdeaStatus::Promoted {
                return Err(Error::InvalidArgument(
                    "use `pu idea promote` to promote an idea".to_string(),
                ));
            }
            if dry_run(json, "set_idea_status", id, &format!("mark idea {id} {}", status.as_str())) {
                return Ok(());
            }
            let idea = storage.set_idea_status(id, *status, &actor)?;
            if crate::is_silent() {
                println!("{}", idea.id);
            } else if json {
                print_json(&idea)?;
            } else {
                println!("'{}' is now {}", idea.title, idea.status.as_str());
            }
            Ok(())
        }
        IdeaCommands::Endorse { id } => {
            if dry_run(json, "endorse_idea", id, &format!("toggle endorsement of idea {id}")) {
                return Ok(());
            }
            let endorsed = storage.toggle_endorsement(id, &actor)?;
            if json {
                print_json(&serde_json::json!({ "id": id, "endorsed": endorsed }))?;
            } else if !crate::is_silent() {
                if endorsed {
                    println!("Endorsed idea {id}");
                } else {
                    println!("Withdrew endorsement of idea {id}");
                }
            }
            Ok(())
        }
        IdeaCommands::Promote { id } => {
            let project = match resolve_project_key(globals.project) {
                Some(key) => Some(storage.require_project(&key)?),
                None => None,
            };
            let human = match &project {
                Some(p) => format!("promote idea {id} into a {} story", p.key),
                None => format!("promote idea {id}"),
            };
            if dry_run(json, "promote_idea", id, &human) {
                return Ok(());
            }
            let (idea, issue) = storage.promote_idea(id, project.as_ref(), &actor)?;
            if crate::is_silent() {
                println!("{}", issue.as_ref().map_or(idea.id.as_str(), |i| i.key.as_str()));
            } else if json {
                print_json(&serde_json::json!({ "idea": idea, "issue": issue }))?;
            } else {
                println!("Promoted idea: {}", idea.title.bold());
                if let Some(issue) = issue {
                    println!("  Created {} in {}", issue.key.bold(), issue.project_key);
                }
            }
            Ok(())
        }
        IdeaCommands::Delete { id } => {
            if dry_run(json, "delete_idea", id, &format!("delete idea {id}")) {
                return Ok(());
            }
            let idea = storage.delete_idea(id, &actor)?;
            if json {
                print_json(&serde_json::json!({ "deleted": true, "id": idea.id }))?;
            } else if !crate::is_silent() {
                println!("Deleted idea: {}", idea.title);
            }
            Ok(())
        }
    }
}

fn comment(storage: &mut SqliteStorage, command: &IdeaCommentCommands, json: bool, actor: &str) -> Result<()> {
    let (comment, verb) = match command {
        IdeaCommentCommands::Add { id, content } => {
            if content.trim().is_empty() {
                return Err(Error::RequiredField("content"));
            }
            if dry_run(json, "add_idea_comment", id, &format!("comment on idea {id}")) {
                return Ok(());
            }
            (storage.add_idea_comment(id, content.trim(), actor)?, "Added")
        }
        IdeaCommentCommands::Edit { comment_id, content } => {
            if dry_run(json, "edit_idea_comment", comment_id, &format!("edit comment {comment_id}")) {
                return Ok(());
            }
            (storage.edit_idea_comment(comment_id, content.trim(), actor)?, "Edited")
        }
    };

    if crate::is_silent() {
        println!("{}", comment.id);
    } else if json {
        print_json(&comment)?;
    } else {
        println!("{verb} comment {}", comment.id);
    }
    Ok(())
}

fn print_list(ideas: &[Idea], json: bool) -> Result<()> {
    if crate::is_csv() {
        println!("id,title,category,impact,status,upvotes,author");
        for i in ideas {
            println!(
                "{},{},{},{},{},{},{}",
                i.id,
                crate::csv_escape(&i.title),
                i.category.as_str(),
                i.impact.as_str(),
                i.status.as_str(),
                i.upvotes,
                crate::csv_escape(&i.author)
            );
        }
    } else if json {
        print_json(&serde_json::json!({ "ideas": ideas, "count": ideas.len() }))?;
    } else if ideas.is_empty() {
        println!("No ideas yet.");
    } else {
        for i in ideas {
            println!(
                "{:>4} ▲  {:<44} {:<12} {:<8} {}",
                i.upvotes,
                truncate(&i.title, 44).bold(),
                i.status.as_str(),
                i.impact.as_str(),
                i.id.dimmed()
            );
        }
    }
    Ok(())
}

fn print_idea(storage: &SqliteStorage, idea: &Idea) -> Result<()> {
    println!("{}", idea.title.bold());
    println!("  ID:       {}", idea.id);
    println!("  Status:   {}", idea.status.as_str());
    println!("  Category: {}", idea.category.as_str());
    println!("  Impact:   {}", idea.impact.as_str());
    println!("  Upvotes:  {}", idea.upvotes);
    println!("  Author:   {}", idea.author);
    if !idea.tags.is_empty() {
        println!("  Tags:     {}", idea.tags.join(", "));
    }
    if !idea.promoted_by.is_empty() {
        println!("  Endorsed: {}", idea.promoted_by.join(", "));
    }
    if let Some(ref issue_id) = idea.promoted_issue_id {
        let key = storage.get_issue(issue_id)?.map_or_else(|| issue_id.clone(), |i| i.key);
        println!("  Issue:    {key}");
    }
    if let Some(ref desc) = idea.description {
        println!();
        println!("{desc}");
    }
    if !idea.comments.is_empty() {
        println!();
        println!("Comments ({}):", idea.comments.len());
        for c in &idea.comments {
            let edited = if c.edited_at.is_some() { " (edited)" } else { "" };
            println!("  {} {}{edited}", c.author.bold(), format_short(c.created_at).dimmed());
            println!("    {}", c.content);
        }
    }
    Ok(())
}
