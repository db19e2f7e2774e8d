//! Issue template commands.

use super::{dry_run, invalid, open_storage, print_json, resolve_actor, Globals};
use crate::cli::{TemplateCommands, TemplateCreateArgs};
use crate::error::Result;
use crate::model::Template;
use crate::storage::SqliteStorage;
use crate::validate::{normalize_priority, normalize_type};
use colored::Colorize;

/// Execute a template command.
///
/// # Errors
///
/// Returns an error if the database is missing or the operation fails.
pub fn execute(command: &TemplateCommands, globals: Globals<'_>) -> Result<()> {
    let mut storage = open_storage(globals.db)?;
    let actor = resolve_actor(globals.actor);
    let json = globals.json;

    match command {
        TemplateCommands::Create(args) => create(&mut storage, args, json, &actor),
        TemplateCommands::List => {
            let templates = storage.list_templates()?;
            if json {
                return print_json(&serde_json::json!({ "templates": templates, "count": templates.len() }));
            }
            if templates.is_empty() {
                println!("No templates.");
                return Ok(());
            }
            for t in &templates {
                println!(
                    "{:<20} {:<6} {:<7} {}",
                    t.name.bold(),
                    t.issue_type.map_or("-", |k| k.as_str()),
                    t.priority.map_or("-", |p| p.as_str()),
                    t.description.as_deref().unwrap_or("")
                );
            }
            Ok(())
        }
        TemplateCommands::Show { name } => {
            let t = storage.require_template(name)?;
            if json {
                return print_json(&t);
            }
            println!("{} ({})", t.name.bold(), t.id);
            if let Some(ref desc) = t.description {
                println!("  {desc}");
            }
            println!("  Type:     {}", t.issue_type.map_or("-", |k| k.as_str()));
            println!("  Priority: {}", t.priority.map_or("-", |p| p.as_str()));
            if let Some(ref prefix) = t.title_prefix {
                println!("  Prefix:   {prefix:?}");
            }
            if !t.labels.is_empty() {
                println!("  Labels:   {}", t.labels.join(", "));
            }
            if let Some(ref body) = t.body {
                println!();
                println!("{body}");
            }
            Ok(())
        }
        TemplateCommands::Delete { name } => {
            if dry_run(json, "delete_template", name, &format!("delete template {name}")) {
                return Ok(());
            }
            let t = storage.delete_template(name, &actor)?;
            if json {
                print_json(&serde_json::json!({ "deleted": true, "id": t.id, "name": t.name }))?;
            } else if !crate::is_silent() {
                println!("Deleted template: {}", t.name);
            }
            Ok(())
        }
    }
}

fn create(storage: &mut SqliteStorage, args: &TemplateCreateArgs, json: bool, actor: &str) -> Result<()> {
    let mut template = Template::new(args.name.trim().to_string(), actor.to_string());
    template.description.clone_from(&args.description);
    template.issue_type = args
        .issue_type
        .as_deref()
        .map(|t| normalize_type(t).map_err(|e| invalid("type", e)))
        .transpose()?;
    template.priority = args
        .priority
        .as_deref()
        .map(|p| normalize_priority(p).map_err(|e| invalid("priority", e)))
        .transpose()?;
    template.title_prefix.clone_from(&args.title_prefix);
    template.body.clone_from(&args.body);
    template.labels.clone_from(&args.labels);

    if dry_run(json, "create_template", &template.name, &format!("create template {}", template.name)) {
        return Ok(());
    }
    storage.create_template(&template, actor)?;

    if crate::is_silent() {
        println!("{}", template.id);
    } else if json {
        print_json(&template)?;
    } else {
        println!("Created template: {}", template.name.bold());
        println!("\nUse it with: pu issue create \"Title\" --template \"{}\"", template.name);
    }
    Ok(())
}
