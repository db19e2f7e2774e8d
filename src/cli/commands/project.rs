//! Project management commands.
//!
//! Commands for managing PlanUp projects:
//! - `pu project create <name>` - Create a new project
//! - `pu project list` - List all projects
//! - `pu project show <key>` - Show project details
//! - `pu project update <key>` - Update project settings
//! - `pu project delete <key>` - Delete a project
//! - `pu project use <key>` - Make a project current

use super::{dry_run, format_timestamp, open_storage, print_json, resolve_actor, Globals};
use crate::cli::{ProjectCommands, ProjectCreateArgs, ProjectUpdateArgs};
use crate::error::{Error, Result};
use crate::model::project::is_valid_key;
use crate::model::{Project, SettingKey};
use crate::storage::SqliteStorage;
use colored::Colorize;
use serde::Serialize;

#[derive(Serialize)]
struct ProjectOutput {
    id: String,
    key: String,
    name: String,
    description: Option<String>,
    lead: Option<String>,
    workflow_id: String,
    organization_id: Option<String>,
    next_issue_number: i64,
    current: bool,
    created_at: String,
    updated_at: String,
}

impl ProjectOutput {
    fn new(p: Project, current: Option<&str>) -> Self {
        Self {
            current: current == Some(p.key.as_str()),
            id: p.id,
            key: p.key,
            name: p.name,
            description: p.description,
            lead: p.lead,
            workflow_id: p.workflow_id,
            organization_id: p.organization_id,
            next_issue_number: p.next_issue_number,
            created_at: format_timestamp(p.created_at),
            updated_at: format_timestamp(p.updated_at),
        }
    }
}

#[derive(Serialize)]
struct ProjectListOutput {
    projects: Vec<ProjectOutput>,
    count: usize,
}

#[derive(Serialize)]
struct ProjectWithCounts {
    #[serde(flatten)]
    project: ProjectOutput,
    issue_count: usize,
    sprint_count: usize,
    epic_count: usize,
}

/// Execute a project command.
///
/// # Errors
///
/// Returns an error if the database is missing or the operation fails.
pub fn execute(command: &ProjectCommands, globals: Globals<'_>) -> Result<()> {
    let mut storage = open_storage(globals.db)?;
    let actor = resolve_actor(globals.actor);
    let json = globals.json;

    match command {
        ProjectCommands::Create(args) => execute_create(&mut storage, args, json, &actor),
        ProjectCommands::List => execute_list(&storage, json),
        ProjectCommands::Show { key } => execute_show(&storage, key, json),
        ProjectCommands::Update(args) => execute_update(&mut storage, args, json, &actor),
        ProjectCommands::Delete { key, force } => execute_delete(&mut storage, key, *force, json, &actor),
        ProjectCommands::Use { key } => execute_use(&mut storage, key, json, &actor),
    }
}

fn current_key(storage: &SqliteStorage) -> Result<Option<String>> {
    storage.get_setting(SettingKey::CurrentProject.as_str())
}

fn execute_create(
    storage: &mut SqliteStorage,
    args: &ProjectCreateArgs,
    json: bool,
    actor: &str,
) -> Result<()> {
    if args.name.trim().is_empty() {
        return Err(Error::RequiredField("name"));
    }

    let mut project = Project::new(args.name.trim().to_string(), args.key.as_deref());
    if !is_valid_key(&project.key) {
        return Err(Error::InvalidArgument(format!(
            "project key '{}' must be 2-10 uppercase letters or digits, starting with a letter",
            project.key
        )));
    }

    project.description.clone_from(&args.description);
    project.lead.clone_from(&args.lead);

    if let Some(ref workflow) = args.workflow {
        let workflow = storage
            .get_workflow(workflow)?
            .ok_or_else(|| Error::not_found("Workflow", workflow))?;
        project.workflow_id = workflow.id;
    }

    if let Some(ref org) = args.org {
        project.organization_id = Some(storage.require_organization(org)?.id);
    }

    if dry_run(json, "create_project", &project.key, &format!("create project {} [{}]", project.name, project.key)) {
        return Ok(());
    }

    storage.create_project(&project, actor)?;

    // The first project becomes current.
    let current = match current_key(storage)? {
        Some(key) => Some(key),
        None => {
            storage.set_setting(SettingKey::CurrentProject.as_str(), &project.key, actor)?;
            Some(project.key.clone())
        }
    };

    if crate::is_silent() {
        println!("{}", project.key);
        return Ok(());
    }

    if json {
        print_json(&ProjectOutput::new(project, current.as_deref()))?;
    } else {
        println!("Created project: {}", project.name);
        println!("  Key:      {}", project.key);
        println!("  ID:       {}", project.id);
        println!("  Workflow: {}", project.workflow_id);
        if current.as_deref() == Some(project.key.as_str()) {
            println!("  (now the current project)");
        }
    }

    Ok(())
}

fn execute_list(storage: &SqliteStorage, json: bool) -> Result<()> {
    let projects = storage.list_projects()?;
    let current = current_key(storage)?;

    if crate::is_csv() {
        println!("key,name,workflow,lead,current");
        for p in &projects {
            let is_current = current.as_deref() == Some(p.key.as_str());
            println!(
                "{},{},{},{},{}",
                p.key,
                crate::csv_escape(&p.name),
                p.workflow_id,
                crate::csv_escape(p.lead.as_deref().unwrap_or("")),
                is_current
            );
        }
    } else if json {
        let output = ProjectListOutput {
            count: projects.len(),
            projects: projects
                .into_iter()
                .map(|p| ProjectOutput::new(p, current.as_deref()))
                .collect(),
        };
        print_json(&output)?;
    } else if projects.is_empty() {
        println!("No projects found.");
        println!("\nCreate one with: pu project create \"My Project\" --key MYP");
    } else {
        println!("Projects ({}):\n", projects.len());
        for project in &projects {
            let marker = if current.as_deref() == Some(project.key.as_str()) {
                "*".green().to_string()
            } else {
                " ".to_string()
            };
            println!("{marker} {} {}", project.key.bold(), project.name);
            println!("    Workflow: {}", project.workflow_id);
            if let Some(lead) = &project.lead {
                println!("    Lead:     {lead}");
            }
            if let Some(desc) = &project.description {
                println!("    Desc:     {desc}");
            }
        }
    }

    Ok(())
}

fn execute_show(storage: &SqliteStorage, key: &str, json: bool) -> Result<()> {
    let project = storage.require_project(key)?;
    let current = current_key(storage)?;

    let issue_count = storage.list_issues(Some(&project.id))?.len();
    let sprint_count = storage.list_sprints(&project.id, None)?.len();
    let epic_count = storage.list_epics(&project.id, None, None)?.len();

    if json {
        let output = ProjectWithCounts {
            project: ProjectOutput::new(project, current.as_deref()),
            issue_count,
            sprint_count,
            epic_count,
        };
        print_json(&output)?;
    } else {
        println!("Project: {} [{}]", project.name, project.key);
        println!("  ID:           {}", project.id);
        println!("  Description:  {}", project.description.as_deref().unwrap_or("-"));
        println!("  Lead:         {}", project.lead.as_deref().unwrap_or("-"));
        println!("  Workflow:     {}", project.workflow_id);
        println!("  Organization: {}", project.organization_id.as_deref().unwrap_or("-"));
        println!();
        println!("Statistics:");
        println!("  Issues:  {issue_count}");
        println!("  Sprints: {sprint_count}");
        println!("  Epics:   {epic_count}");
        println!();
        println!("Created: {}", format_timestamp(project.created_at));
        println!("Updated: {}", format_timestamp(project.updated_at));
    }

    Ok(())
}

fn execute_update(
    storage: &mut SqliteStorage,
    args: &ProjectUpdateArgs,
    json: bool,
    actor: &str,
) -> Result<()> {
    let project = storage.require_project(&args.key)?;

    let lead = if args.no_lead {
        Some(None)
    } else {
        args.lead.as_deref().map(Some)
    };

    let org_id = match (&args.org, args.no_org) {
        (_, true) => Some(None),
        (Some(org), false) => Some(Some(storage.require_organization(org)?.id)),
        (None, false) => None,
    };

    if dry_run(json, "update_project", &project.key, &format!("update project {}", project.key)) {
        return Ok(());
    }

    let updated = storage.update_project(
        &project.id,
        args.name.as_deref(),
        args.description.as_deref(),
        lead,
        org_id.as_ref().map(Option::as_deref),
        actor,
    )?;

    if crate::is_silent() {
        println!("{}", updated.key);
    } else if json {
        let current = current_key(storage)?;
        print_json(&ProjectOutput::new(updated, current.as_deref()))?;
    } else {
        println!("Updated project: {}", updated.name);
        if args.name.is_some() {
            println!("  Name: {}", updated.name);
        }
        if args.description.is_some() {
            println!("  Description: {}", updated.description.as_deref().unwrap_or("-"));
        }
        if args.lead.is_some() || args.no_lead {
            println!("  Lead: {}", updated.lead.as_deref().unwrap_or("-"));
        }
        if args.org.is_some() || args.no_org {
            println!("  Organization: {}", updated.organization_id.as_deref().unwrap_or("-"));
        }
    }

    Ok(())
}

fn execute_delete(
    storage: &mut SqliteStorage,
    key: &str,
    force: bool,
    json: bool,
    actor: &str,
) -> Result<()> {
    let project = storage.require_project(key)?;
    let issue_count = storage.list_issues(Some(&project.id))?.len();
    let sprint_count = storage.list_sprints(&project.id, None)?.len();

    if !force && issue_count + sprint_count > 0 && !json {
        println!("Warning: This will delete:");
        println!("  {issue_count} issues");
        println!("  {sprint_count} sprints");
        println!();
        println!("Use --force to confirm deletion.");
        return Ok(());
    }

    if dry_run(json, "delete_project", &project.key, &format!("delete project {}", project.key)) {
        return Ok(());
    }

    storage.delete_project(&project.id, actor)?;

    if crate::is_silent() {
        println!("{}", project.key);
    } else if json {
        let output = serde_json::json!({
            "deleted": true,
            "id": project.id,
            "key": project.key,
            "issues_deleted": issue_count,
        });
        print_json(&output)?;
    } else {
        println!("Deleted project: {} [{}]", project.name, project.key);
        if issue_count > 0 {
            println!("  Deleted {issue_count} issues");
        }
    }

    Ok(())
}

fn execute_use(storage: &mut SqliteStorage, key: &str, json: bool, actor: &str) -> Result<()> {
    let project = storage.require_project(key)?;

    if dry_run(json, "use_project", &project.key, &format!("switch to project {}", project.key)) {
        return Ok(());
    }

    storage.set_setting(SettingKey::CurrentProject.as_str(), &project.key, actor)?;

    if crate::is_silent() {
        println!("{}", project.key);
    } else if json {
        print_json(&ProjectOutput::new(project.clone(), Some(project.key.as_str())))?;
    } else {
        println!("Now using project {} ({})", project.key.bold(), project.name);
    }

    Ok(())
}
