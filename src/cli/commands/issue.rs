//! Issue command implementations.
//!
//! Issues are created in the resolved project (see
//! [`resolve_project`](super::resolve_project)) and addressed by key
//! (`MOB-12`) or id everywhere else.

use super::filter::resolve_filter_query;
use super::{
    dry_run, format_short, invalid, open_storage, parse_day, print_json, resolve_actor,
    resolve_project, truncate, Globals,
};
use crate::cli::{
    AttachmentCommands, DecisionCommands, IssueAttachArgs, IssueCommands, IssueCommentCommands,
    IssueCreateArgs, IssueListArgs, IssueLogArgs, IssueUpdateArgs, LinkCommands, SubtaskCommands,
    TimelogCommands,
};
use crate::error::{Error, Result};
use crate::model::{new_id, Attachment, Issue, IssueDetails, SubTaskStatus};
use crate::query::{EvalContext, Operator, Query, QueryBuilder};
use crate::storage::{IssueUpdate, SqliteStorage};
use crate::validate::{human_size, normalize_priority, normalize_type};
use colored::Colorize;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::Path;

#[derive(Serialize)]
struct IssueListOutput<'a> {
    issues: Vec<&'a Issue>,
    count: usize,
}

#[derive(Serialize)]
struct TransitionOutput<'a> {
    issue: &'a Issue,
    transition: &'a str,
    from: &'a str,
    to: &'a str,
}

/// Execute an issue command.
///
/// # Errors
///
/// Returns an error if the database is missing or the operation fails.
pub fn execute(command: &IssueCommands, globals: Globals<'_>) -> Result<()> {
    let mut storage = open_storage(globals.db)?;
    let actor = resolve_actor(globals.actor);
    let json = globals.json;

    match command {
        IssueCommands::Create(args) => create(&mut storage, args, globals.project, json, &actor),
        IssueCommands::List(args) => list(&storage, args, globals.project, json, &actor),
        IssueCommands::Show { id } => show(&storage, id, json),
        IssueCommands::Update(args) => update(&mut storage, args, json, &actor),
        IssueCommands::Delete { ids } => delete(&mut storage, ids, json, &actor),
        IssueCommands::Search { text, all, limit } => {
            search(&storage, text, *all, *limit, globals.project, json)
        }
        IssueCommands::Query { query, strict, limit } => {
            run_query(&storage, query, *strict, *limit, globals.project, json, &actor)
        }
        IssueCommands::Transition { id, target } => transition(&mut storage, id, target, json, &actor),
        IssueCommands::Transitions { id } => transitions(&storage, id, json),
        IssueCommands::Comment { command } => comment(&mut storage, command, json, &actor),
        IssueCommands::Log(args) => log_time(&mut storage, args, json, &actor),
        IssueCommands::Timelog { command } => timelog(&mut storage, command, json, &actor),
        IssueCommands::Attach(args) => attach(&mut storage, args, json, &actor),
        IssueCommands::Attachment { command } => attachment(&mut storage, command, json, &actor),
        IssueCommands::Decision { command } => decision(&mut storage, command, json, &actor),
        IssueCommands::Link { command } => link(&mut storage, command, json, &actor),
        IssueCommands::Subtask { command } => subtask(&mut storage, command, json, &actor),
    }
}

// ============================================================================
// Create / list / show
// ============================================================================

fn create(
    storage: &mut SqliteStorage,
    args: &IssueCreateArgs,
    project: Option<&str>,
    json: bool,
    actor: &str,
) -> Result<()> {
    if args.title.trim().is_empty() {
        return Err(Error::RequiredField("title"));
    }

    let project = resolve_project(storage, project)?;
    let workflow = storage.workflow_for_project(&project)?;
    let template = args
        .template
        .as_deref()
        .map(|name| storage.require_template(name))
        .transpose()?;

    let title = match &template {
        Some(t) => t.title_for(args.title.trim()),
        None => args.title.trim().to_string(),
    };
    let status = args
        .status
        .clone()
        .unwrap_or_else(|| workflow.initial_status().to_string());

    let mut issue = Issue::new(project.id.clone(), title, status);
    issue.reporter = Some(actor.to_string());

    // Template values first; explicit flags override them.
    if let Some(t) = &template {
        issue.description.clone_from(&t.body);
        issue.labels.clone_from(&t.labels);
        if let Some(kind) = t.issue_type {
            issue.issue_type = kind;
        }
        if let Some(priority) = t.priority {
            issue.priority = priority;
        }
    }

    if let Some(ref t) = args.issue_type {
        issue.issue_type = normalize_type(t).map_err(|e| invalid("type", e))?;
    }
    if let Some(ref p) = args.priority {
        issue.priority = normalize_priority(p).map_err(|e| invalid("priority", e))?;
    }
    if args.description.is_some() {
        issue.description.clone_from(&args.description);
    }
    if !args.labels.is_empty() {
        issue.labels = dedup(&args.labels);
    }
    issue.components = dedup(&args.components);
    issue.assignee.clone_from(&args.assignee);
    issue.due_date = args.due.as_deref().map(parse_day).transpose()?;
    issue.estimated_hours = args.estimate;
    issue.story_points = args.points;
    issue.epic_id = args
        .epic
        .as_deref()
        .map(|e| storage.require_epic(e).map(|epic| epic.id))
        .transpose()?;
    issue.sprint_id = args
        .sprint
        .as_deref()
        .map(|s| storage.require_sprint(s, Some(&project.id)).map(|sprint| sprint.id))
        .transpose()?;

    if crate::is_dry_run() {
        if json {
            let output = serde_json::json!({
                "dry_run": true,
                "action": "create_issue",
                "project": project.key,
                "title": issue.title,
                "issue_type": issue.issue_type.as_str(),
                "priority": issue.priority.as_str(),
                "status": issue.status,
                "labels": issue.labels,
            });
            println!("{output}");
        } else {
            println!("Would create issue in {}:", project.key);
            println!("  Title:    {}", issue.title);
            println!("  Type:     {}", issue.issue_type.as_str());
            println!("  Priority: {}", issue.priority.as_str());
            println!("  Status:   {}", issue.status);
            if !issue.labels.is_empty() {
                println!("  Labels:   {}", issue.labels.join(", "));
            }
        }
        return Ok(());
    }

    storage.create_issue(&mut issue, actor)?;

    if crate::is_silent() {
        println!("{}", issue.key);
        return Ok(());
    }

    if json {
        print_json(&issue)?;
    } else {
        println!("Created issue: {} {}", issue.key.bold(), issue.title);
        println!("  Status:   {}", issue.status);
        println!("  Type:     {}", issue.issue_type.as_str());
        println!("  Priority: {}", issue.priority.as_str());
        if let Some(ref assignee) = issue.assignee {
            println!("  Assignee: {assignee}");
        }
        if !issue.labels.is_empty() {
            println!("  Labels:   {}", issue.labels.join(", "));
        }
    }

    Ok(())
}

fn dedup(values: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for v in values.iter().map(|v| v.trim()).filter(|v| !v.is_empty()) {
        if !out.iter().any(|o| o == v) {
            out.push(v.to_string());
        }
    }
    out
}

/// Turn `issue list` flags into one query. Flag values are matched
/// verbatim; `--filter` and `--query` text is parsed.
fn list_query(
    storage: &SqliteStorage,
    args: &IssueListArgs,
    workflow: Option<&crate::workflow::Workflow>,
) -> Result<Query> {
    let status = args
        .status
        .as_deref()
        .map(|s| workflow.and_then(|w| w.resolve_status(s)).unwrap_or(s).to_string());
    let priority = args
        .priority
        .as_deref()
        .map(|p| normalize_priority(p).map_err(|e| invalid("priority", e)))
        .transpose()?;
    let issue_type = args
        .issue_type
        .as_deref()
        .map(|t| normalize_type(t).map_err(|e| invalid("type", e)))
        .transpose()?;
    let saved = args
        .filter
        .as_deref()
        .map(|name| resolve_filter_query(storage, name))
        .transpose()?;

    Ok(QueryBuilder::new()
        .condition_opt("status", Operator::Eq, status.as_deref())
        .condition_opt("priority", Operator::Eq, priority.map(|p| p.as_str()))
        .condition_opt("type", Operator::Eq, issue_type.map(|t| t.as_str()))
        .condition_opt("assignee", Operator::Eq, args.assignee.as_deref())
        .condition_opt("labels", Operator::Eq, args.label.as_deref())
        .condition_opt("sprint", Operator::Eq, args.sprint.as_deref())
        .condition_opt("epic", Operator::Eq, args.epic.as_deref().map(str::to_uppercase).as_deref())
        .raw(saved.as_deref().unwrap_or(""))
        .raw(args.query.as_deref().unwrap_or(""))
        .build())
}

fn list(
    storage: &SqliteStorage,
    args: &IssueListArgs,
    project: Option<&str>,
    json: bool,
    actor: &str,
) -> Result<()> {
    let (issues, workflow) = if args.all {
        (storage.list_issues(None)?, None)
    } else {
        let project = resolve_project(storage, project)?;
        let workflow = storage.workflow_for_project(&project)?;
        (storage.list_issues(Some(&project.id))?, Some(workflow))
    };

    let query = list_query(storage, args, workflow.as_ref())?;
    let ctx = EvalContext::new(actor);
    let mut matched = query.filter(&issues, &ctx);
    if let Some(limit) = args.limit {
        matched.truncate(limit);
    }

    print_issue_list(&matched, json)
}

fn print_issue_list(issues: &[&Issue], json: bool) -> Result<()> {
    if crate::is_csv() {
        println!("key,title,status,priority,type,assignee,points");
        for issue in issues {
            println!(
                "{},{},{},{},{},{},{}",
                issue.key,
                crate::csv_escape(&issue.title),
                crate::csv_escape(&issue.status),
                issue.priority.as_str(),
                issue.issue_type.as_str(),
                crate::csv_escape(issue.assignee.as_deref().unwrap_or("")),
                issue.story_points.map_or(String::new(), |p| p.to_string()),
            );
        }
    } else if crate::is_silent() {
        for issue in issues {
            println!("{}", issue.key);
        }
    } else if json {
        let output = IssueListOutput {
            count: issues.len(),
            issues: issues.to_vec(),
        };
        print_json(&output)?;
    } else if issues.is_empty() {
        println!("No issues found.");
    } else {
        println!("Issues ({}):\n", issues.len());
        for issue in issues {
            let priority = match issue.priority.as_str() {
                "High" => "High".red().to_string(),
                "Low" => "Low".dimmed().to_string(),
                other => other.to_string(),
            };
            println!(
                "  {:<10} {:<44} {:<14} {:<7} {}",
                issue.key.bold(),
                truncate(&issue.title, 44),
                issue.status,
                priority,
                issue.assignee.as_deref().unwrap_or("-")
            );
        }
    }
    Ok(())
}

fn show(storage: &SqliteStorage, id: &str, json: bool) -> Result<()> {
    let details = storage.issue_details(id)?;

    if json {
        return print_json(&details);
    }

    print_details(&details);
    Ok(())
}

fn print_details(details: &IssueDetails) {
    let issue = &details.issue;
    println!("{} {}", issue.key.bold(), issue.title);
    println!("  Status:    {}", issue.status);
    println!("  Type:      {}", issue.issue_type.as_str());
    println!("  Priority:  {}", issue.priority.as_str());
    println!("  Assignee:  {}", issue.assignee.as_deref().unwrap_or("-"));
    println!("  Reporter:  {}", issue.reporter.as_deref().unwrap_or("-"));
    if let Some(ref due) = issue.due_date {
        println!("  Due:       {due}");
    }
    if let Some(points) = issue.story_points {
        println!("  Points:    {points}");
    }
    let estimate = issue.estimated_hours.map_or_else(|| "-".to_string(), |h| format!("{h}h"));
    println!("  Hours:     {}h logged / {estimate} estimated", issue.logged_hours);
    if let Some(ref epic) = issue.epic_key {
        println!("  Epic:      {epic}");
    }
    if let Some(ref sprint) = issue.sprint_name {
        println!("  Sprint:    {sprint}");
    }
    if !issue.labels.is_empty() {
        println!("  Labels:    {}", issue.labels.join(", "));
    }
    if !issue.components.is_empty() {
        println!("  Components: {}", issue.components.join(", "));
    }
    println!("  Updated:   {}", format_short(issue.updated_at));

    if let Some(ref desc) = issue.description {
        println!();
        println!("{desc}");
    }

    if !details.subtasks.is_empty() {
        let done = details.subtasks.iter().filter(|s| s.completed).count();
        println!();
        println!("Sub-tasks ({done}/{}):", details.subtasks.len());
        for st in &details.subtasks {
            let mark = if st.completed { "[x]" } else { "[ ]" };
            println!("  {mark} {} ({})", st.title, st.id.dimmed());
        }
    }

    if !details.links.is_empty() {
        println!();
        println!("Links:");
        for link in &details.links {
            println!("  {} {} {}", link.link_type.as_str(), link.other_key.bold(), link.other_title);
        }
    }

    if !details.comments.is_empty() {
        println!();
        println!("Comments ({}):", details.comments.len());
        for c in &details.comments {
            let edited = if c.edited { " (edited)" } else { "" };
            println!("  {} {}{edited}", c.author.bold(), format_short(c.created_at).dimmed());
            println!("    {}", c.content);
        }
    }

    if !details.time_logs.is_empty() {
        println!();
        println!("Time logs:");
        for log in &details.time_logs {
            println!(
                "  {} {}h {} {}",
                log.work_date,
                log.hours,
                log.category.as_str(),
                log.description.as_deref().unwrap_or("")
            );
        }
    }

    if !details.attachments.is_empty() {
        println!();
        println!("Attachments:");
        for a in &details.attachments {
            println!("  {} ({}) {}", a.name, a.size.as_deref().unwrap_or("?"), a.location.dimmed());
        }
    }

    if !details.decision_log.is_empty() {
        println!();
        println!("Decisions:");
        for d in &details.decision_log {
            println!("  {} {}: {}", format_short(d.created_at).dimmed(), d.author, d.entry);
        }
    }
}

// ============================================================================
// Update / delete / search / query
// ============================================================================

fn update(storage: &mut SqliteStorage, args: &IssueUpdateArgs, json: bool, actor: &str) -> Result<()> {
    let issue = storage.require_issue(&args.id)?;

    let update = IssueUpdate {
        title: args.title.clone(),
        description: args.description.clone(),
        status: args.status.clone(),
        priority: args
            .priority
            .as_deref()
            .map(|p| normalize_priority(p).map_err(|e| invalid("priority", e)))
            .transpose()?,
        issue_type: args
            .issue_type
            .as_deref()
            .map(|t| normalize_type(t).map_err(|e| invalid("type", e)))
            .transpose()?,
        assignee: if args.unassign {
            Some(None)
        } else {
            args.assignee.clone().map(Some)
        },
        due_date: if args.no_due {
            Some(None)
        } else {
            args.due.as_deref().map(parse_day).transpose()?.map(Some)
        },
        estimated_hours: args.estimate,
        story_points: args.points,
        epic_id: if args.no_epic {
            Some(None)
        } else {
            args.epic
                .as_deref()
                .map(|e| storage.require_epic(e).map(|epic| Some(epic.id)))
                .transpose()?
        },
        sprint_id: if args.no_sprint {
            Some(None)
        } else {
            args.sprint
                .as_deref()
                .map(|s| {
                    storage
                        .require_sprint(s, Some(&issue.project_id))
                        .map(|sprint| Some(sprint.id))
                })
                .transpose()?
        },
        add_labels: args.add_label.clone(),
        remove_labels: args.remove_label.clone(),
        components: args.components.clone(),
    };

    if update.is_empty() {
        return Err(Error::InvalidArgument("nothing to update".to_string()));
    }

    if dry_run(json, "update_issue", &issue.key, &format!("update issue {}", issue.key)) {
        return Ok(());
    }

    let updated = storage.update_issue(&issue.id, &update, actor)?;

    if crate::is_silent() {
        println!("{}", updated.key);
    } else if json {
        print_json(&updated)?;
    } else {
        println!("Updated issue: {} {}", updated.key.bold(), updated.title);
        if updated.status != issue.status {
            println!("  Status:   {} → {}", issue.status, updated.status);
        }
        if updated.assignee != issue.assignee {
            println!("  Assignee: {}", updated.assignee.as_deref().unwrap_or("-"));
        }
        if updated.labels != issue.labels {
            println!("  Labels:   {}", updated.labels.join(", "));
        }
    }

    Ok(())
}

fn delete(storage: &mut SqliteStorage, ids: &[String], json: bool, actor: &str) -> Result<()> {
    if ids.is_empty() {
        return Err(Error::RequiredField("id"));
    }

    if crate::is_dry_run() {
        for id in ids {
            println!("Would delete issue: {id}");
        }
        return Ok(());
    }

    let mut deleted = Vec::with_capacity(ids.len());
    for id in ids {
        deleted.push(storage.delete_issue(id, actor)?.key);
    }

    if crate::is_silent() {
        for key in &deleted {
            println!("{key}");
        }
    } else if json {
        let output = serde_json::json!({
            "deleted": deleted,
            "count": deleted.len(),
        });
        println!("{output}");
    } else {
        for key in &deleted {
            println!("Deleted issue: {key}");
        }
    }

    Ok(())
}

fn search(
    storage: &SqliteStorage,
    text: &str,
    all: bool,
    limit: u32,
    project: Option<&str>,
    json: bool,
) -> Result<()> {
    let project_id = if all {
        None
    } else {
        Some(resolve_project(storage, project)?.id)
    };
    let issues = storage.search_issues(project_id.as_deref(), text, limit)?;
    let refs: Vec<&Issue> = issues.iter().collect();
    print_issue_list(&refs, json)
}

fn run_query(
    storage: &SqliteStorage,
    query: &str,
    strict: bool,
    limit: Option<usize>,
    project: Option<&str>,
    json: bool,
    actor: &str,
) -> Result<()> {
    let parsed = if strict {
        Query::parse_strict(query)?
    } else {
        Query::parse(query)
    };

    let project = resolve_project(storage, project)?;
    let issues = storage.list_issues(Some(&project.id))?;
    let mut matched = parsed.filter(&issues, &EvalContext::new(actor));
    if let Some(limit) = limit {
        matched.truncate(limit);
    }

    print_issue_list(&matched, json)
}

// ============================================================================
// Workflow transitions
// ============================================================================

fn transition(storage: &mut SqliteStorage, id: &str, target: &str, json: bool, actor: &str) -> Result<()> {
    if crate::is_dry_run() {
        let issue = storage.require_issue(id)?;
        let project = storage.require_project(&issue.project_id)?;
        let workflow = storage.workflow_for_project(&project)?;
        let step = workflow.find_transition(&issue.status, target)?;
        if json {
            let output = serde_json::json!({
                "dry_run": true,
                "action": "transition_issue",
                "target": issue.key,
                "from": step.from,
                "to": step.to,
            });
            println!("{output}");
        } else {
            println!("Would move {} {} → {} ({})", issue.key, step.from, step.to, step.label);
        }
        return Ok(());
    }

    let before = storage.require_issue(id)?;
    let (issue, step) = storage.transition_issue(&before.id, target, actor)?;

    if crate::is_silent() {
        println!("{}", issue.key);
    } else if json {
        let output = TransitionOutput {
            issue: &issue,
            transition: &step.label,
            from: &before.status,
            to: &step.to,
        };
        print_json(&output)?;
    } else {
        println!(
            "{} {}: {} → {}",
            issue.key.bold(),
            step.label,
            before.status,
            step.to.green()
        );
    }

    Ok(())
}

fn transitions(storage: &SqliteStorage, id: &str, json: bool) -> Result<()> {
    let issue = storage.require_issue(id)?;
    let project = storage.require_project(&issue.project_id)?;
    let workflow = storage.workflow_for_project(&project)?;
    let available = workflow.transitions_from(&issue.status);

    if json {
        let output = serde_json::json!({
            "issue": issue.key,
            "status": issue.status,
            "workflow": workflow.id,
            "transitions": available,
        });
        print_json(&output)?;
    } else if available.is_empty() {
        println!("{} is in '{}'; no transitions leave this status.", issue.key, issue.status);
    } else {
        println!("{} is in '{}' ({}):", issue.key, issue.status, workflow.name);
        for t in available {
            println!("  {:<20} → {}", t.label, t.to);
        }
    }

    Ok(())
}

// ============================================================================
// Comments, time logs, attachments, decisions, links, sub-tasks
// ============================================================================

fn comment(storage: &mut SqliteStorage, command: &IssueCommentCommands, json: bool, actor: &str) -> Result<()> {
    match command {
        IssueCommentCommands::Add { id, content } => {
            if content.trim().is_empty() {
                return Err(Error::RequiredField("content"));
            }
            if dry_run(json, "add_comment", id, &format!("comment on {id}")) {
                return Ok(());
            }
            let comment = storage.add_comment(id, content.trim(), actor)?;
            if crate::is_silent() {
                println!("{}", comment.id);
            } else if json {
                print_json(&comment)?;
            } else {
                println!("Added comment {} to {id}", comment.id);
            }
        }
        IssueCommentCommands::List { id } => {
            let issue = storage.require_issue(id)?;
            let comments = storage.list_comments(&issue.id)?;
            if json {
                print_json(&serde_json::json!({ "comments": comments, "count": comments.len() }))?;
            } else if comments.is_empty() {
                println!("No comments on {}.", issue.key);
            } else {
                for c in &comments {
                    let edited = if c.edited { " (edited)" } else { "" };
                    println!("{} {} {}{edited}", c.id.dimmed(), c.author.bold(), format_short(c.created_at));
                    println!("  {}", c.content);
                }
            }
        }
        IssueCommentCommands::Edit { comment_id, content } => {
            if dry_run(json, "edit_comment", comment_id, &format!("edit comment {comment_id}")) {
                return Ok(());
            }
            let comment = storage.edit_comment(comment_id, content.trim(), actor)?;
            if json {
                print_json(&comment)?;
            } else if !crate::is_silent() {
                println!("Edited comment {}", comment.id);
            }
        }
        IssueCommentCommands::Delete { comment_id } => {
            if dry_run(json, "delete_comment", comment_id, &format!("delete comment {comment_id}")) {
                return Ok(());
            }
            storage.delete_comment(comment_id, actor)?;
            if json {
                print_json(&serde_json::json!({ "deleted": true, "id": comment_id }))?;
            } else if !crate::is_silent() {
                println!("Deleted comment {comment_id}");
            }
        }
    }
    Ok(())
}

fn log_time(storage: &mut SqliteStorage, args: &IssueLogArgs, json: bool, actor: &str) -> Result<()> {
    let work_date = match args.date.as_deref() {
        Some(d) => parse_day(d)?,
        None => chrono::Local::now().date_naive().format("%Y-%m-%d").to_string(),
    };

    if dry_run(json, "log_time", &args.id, &format!("log {}h on {}", args.hours, args.id)) {
        return Ok(());
    }

    let log = storage.log_time(
        &args.id,
        args.hours,
        args.category,
        args.description.as_deref(),
        &work_date,
        actor,
    )?;
    let issue = storage.require_issue(&log.issue_id)?;

    if crate::is_silent() {
        println!("{}", log.id);
    } else if json {
        print_json(&serde_json::json!({ "time_log": log, "logged_hours": issue.logged_hours }))?;
    } else {
        println!(
            "Logged {}h ({}) on {}; {}h total",
            log.hours,
            log.category.as_str(),
            issue.key,
            issue.logged_hours
        );
    }
    Ok(())
}

fn timelog(storage: &mut SqliteStorage, command: &TimelogCommands, json: bool, actor: &str) -> Result<()> {
    match command {
        TimelogCommands::List { id } => {
            let issue = storage.require_issue(id)?;
            let logs = storage.list_time_logs(&issue.id)?;
            if crate::is_csv() {
                println!("id,date,hours,category,author,description");
                for log in &logs {
                    println!(
                        "{},{},{},{},{},{}",
                        log.id,
                        log.work_date,
                        log.hours,
                        log.category.as_str(),
                        crate::csv_escape(&log.author),
                        crate::csv_escape(log.description.as_deref().unwrap_or(""))
                    );
                }
            } else if json {
                print_json(&serde_json::json!({
                    "time_logs": logs,
                    "logged_hours": issue.logged_hours,
                    "estimated_hours": issue.estimated_hours,
                }))?;
            } else if logs.is_empty() {
                println!("No time logged on {}.", issue.key);
            } else {
                for log in &logs {
                    println!(
                        "{} {} {:>5}h {:<13} {} {}",
                        log.id.dimmed(),
                        log.work_date,
                        log.hours,
                        log.category.as_str(),
                        log.author,
                        log.description.as_deref().unwrap_or("")
                    );
                }
                println!("\nTotal: {}h", issue.logged_hours);
            }
        }
        TimelogCommands::Delete { log_id } => {
            if dry_run(json, "delete_time_log", log_id, &format!("delete time log {log_id}")) {
                return Ok(());
            }
            let log = storage.delete_time_log(log_id, actor)?;
            if json {
                print_json(&serde_json::json!({ "deleted": true, "id": log.id, "hours": log.hours }))?;
            } else if !crate::is_silent() {
                println!("Deleted time log {} ({}h)", log.id, log.hours);
            }
        }
    }
    Ok(())
}

/// MIME type guessed from a file extension.
fn mime_for(path: &str) -> &'static str {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        "json" => "application/json",
        "zip" => "application/zip",
        "txt" | "log" => "text/plain",
        "md" => "text/markdown",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        _ => "application/octet-stream",
    }
}

fn is_url(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Build attachment metadata for a local file or URL.
fn describe_attachment(args: &IssueAttachArgs, issue_id: &str, actor: &str) -> Result<Attachment> {
    let default_name = args
        .location
        .rsplit(['/', '\\'])
        .find(|s| !s.is_empty())
        .unwrap_or(&args.location)
        .to_string();

    let mut attachment = Attachment {
        id: new_id("att"),
        issue_id: issue_id.to_string(),
        name: args.name.clone().unwrap_or(default_name),
        size: None,
        size_bytes: None,
        file_type: Some(mime_for(&args.location).to_string()),
        location: args.location.clone(),
        checksum: None,
        description: args.description.clone(),
        uploaded_by: actor.to_string(),
        uploaded_at: chrono::Utc::now().timestamp_millis(),
    };

    if is_url(&args.location) {
        return Ok(attachment);
    }

    let path = Path::new(&args.location);
    if !path.is_file() {
        return Err(Error::InvalidArgument(format!(
            "attachment '{}' is neither a file nor an http(s) URL",
            args.location
        )));
    }
    let bytes = std::fs::read(path)?;
    let len = bytes.len() as u64;
    attachment.size = Some(human_size(len));
    attachment.size_bytes = i64::try_from(len).ok();
    attachment.checksum = Some(format!("{:x}", Sha256::digest(&bytes)));
    attachment.location = path
        .canonicalize()
        .map_or_else(|_| args.location.clone(), |p| p.to_string_lossy().to_string());
    Ok(attachment)
}

fn attach(storage: &mut SqliteStorage, args: &IssueAttachArgs, json: bool, actor: &str) -> Result<()> {
    let issue = storage.require_issue(&args.id)?;
    let attachment = describe_attachment(args, &issue.id, actor)?;

    if dry_run(json, "add_attachment", &issue.key, &format!("attach {} to {}", attachment.name, issue.key)) {
        return Ok(());
    }

    storage.add_attachment(&attachment, actor)?;

    if crate::is_silent() {
        println!("{}", attachment.id);
    } else if json {
        print_json(&attachment)?;
    } else {
        println!(
            "Attached {} ({}) to {}",
            attachment.name,
            attachment.size.as_deref().unwrap_or("link"),
            issue.key
        );
    }
    Ok(())
}

fn attachment(storage: &mut SqliteStorage, command: &AttachmentCommands, json: bool, actor: &str) -> Result<()> {
    match command {
        AttachmentCommands::List { id } => {
            let issue = storage.require_issue(id)?;
            let attachments = storage.list_attachments(&issue.id)?;
            if json {
                print_json(&serde_json::json!({ "attachments": attachments, "count": attachments.len() }))?;
            } else if attachments.is_empty() {
                println!("No attachments on {}.", issue.key);
            } else {
                for a in &attachments {
                    println!(
                        "{} {} {} {} {}",
                        a.id.dimmed(),
                        a.name,
                        a.size.as_deref().unwrap_or("-"),
                        a.file_type.as_deref().unwrap_or("-"),
                        a.location
                    );
                }
            }
        }
        AttachmentCommands::Remove { attachment_id } => {
            if dry_run(json, "remove_attachment", attachment_id, &format!("remove attachment {attachment_id}")) {
                return Ok(());
            }
            storage.remove_attachment(attachment_id, actor)?;
            if json {
                print_json(&serde_json::json!({ "removed": true, "id": attachment_id }))?;
            } else if !crate::is_silent() {
                println!("Removed attachment {attachment_id}");
            }
        }
    }
    Ok(())
}

fn decision(storage: &mut SqliteStorage, command: &DecisionCommands, json: bool, actor: &str) -> Result<()> {
    match command {
        DecisionCommands::Add { id, entry } => {
            if entry.trim().is_empty() {
                return Err(Error::RequiredField("entry"));
            }
            if dry_run(json, "add_decision", id, &format!("log a decision on {id}")) {
                return Ok(());
            }
            let decision = storage.add_decision(id, entry.trim(), actor)?;
            if crate::is_silent() {
                println!("{}", decision.id);
            } else if json {
                print_json(&decision)?;
            } else {
                println!("Logged decision on {id}");
            }
        }
        DecisionCommands::List { id } => {
            let issue = storage.require_issue(id)?;
            let decisions = storage.list_decisions(&issue.id)?;
            if json {
                print_json(&serde_json::json!({ "decisions": decisions, "count": decisions.len() }))?;
            } else if decisions.is_empty() {
                println!("No decisions logged on {}.", issue.key);
            } else {
                for d in &decisions {
                    println!("{} {}: {}", format_short(d.created_at).dimmed(), d.author.bold(), d.entry);
                }
            }
        }
    }
    Ok(())
}

fn link(storage: &mut SqliteStorage, command: &LinkCommands, json: bool, actor: &str) -> Result<()> {
    match command {
        LinkCommands::Add { source, target, link_type } => {
            let human = format!("link {source} {} {target}", link_type.as_str());
            if dry_run(json, "add_link", source, &human) {
                return Ok(());
            }
            let link = storage.add_link(source, target, *link_type, actor)?;
            if crate::is_silent() {
                println!("{}", link.id);
            } else if json {
                print_json(&link)?;
            } else {
                println!("Linked: {source} {} {target}", link_type.as_str());
            }
        }
        LinkCommands::List { id } => {
            let issue = storage.require_issue(id)?;
            let links = storage.list_links(&issue.id)?;
            if json {
                print_json(&serde_json::json!({ "links": links, "count": links.len() }))?;
            } else if links.is_empty() {
                println!("No links on {}.", issue.key);
            } else {
                for l in &links {
                    println!(
                        "{} {} {} {}",
                        l.id.dimmed(),
                        l.link_type.as_str(),
                        l.other_key.bold(),
                        l.other_title
                    );
                }
            }
        }
        LinkCommands::Remove { link_id } => {
            if dry_run(json, "remove_link", link_id, &format!("remove link {link_id}")) {
                return Ok(());
            }
            storage.remove_link(link_id, actor)?;
            if json {
                print_json(&serde_json::json!({ "removed": true, "id": link_id }))?;
            } else if !crate::is_silent() {
                println!("Removed link {link_id}");
            }
        }
    }
    Ok(())
}

fn subtask(storage: &mut SqliteStorage, command: &SubtaskCommands, json: bool, actor: &str) -> Result<()> {
    let (subtask_id, status) = match command {
        SubtaskCommands::Add { id, title, assignee } => {
            if title.trim().is_empty() {
                return Err(Error::RequiredField("title"));
            }
            if dry_run(json, "add_subtask", id, &format!("add sub-task to {id}")) {
                return Ok(());
            }
            let st = storage.add_subtask(id, title.trim(), assignee.as_deref(), actor)?;
            if crate::is_silent() {
                println!("{}", st.id);
            } else if json {
                print_json(&st)?;
            } else {
                println!("Added sub-task {} to {id}", st.id);
            }
            return Ok(());
        }
        SubtaskCommands::List { id } => {
            let issue = storage.require_issue(id)?;
            let subtasks = storage.list_subtasks(&issue.id)?;
            if json {
                print_json(&serde_json::json!({ "subtasks": subtasks, "count": subtasks.len() }))?;
            } else if subtasks.is_empty() {
                println!("No sub-tasks on {}.", issue.key);
            } else {
                for st in &subtasks {
                    println!(
                        "{} {:<12} {} {}",
                        st.id.dimmed(),
                        st.status.as_str(),
                        st.title,
                        st.assignee.as_deref().unwrap_or("")
                    );
                }
            }
            return Ok(());
        }
        SubtaskCommands::Delete { subtask_id } => {
            if dry_run(json, "delete_subtask", subtask_id, &format!("delete sub-task {subtask_id}")) {
                return Ok(());
            }
            storage.delete_subtask(subtask_id, actor)?;
            if json {
                print_json(&serde_json::json!({ "deleted": true, "id": subtask_id }))?;
            } else if !crate::is_silent() {
                println!("Deleted sub-task {subtask_id}");
            }
            return Ok(());
        }
        SubtaskCommands::Start { subtask_id } => (subtask_id, SubTaskStatus::InProgress),
        SubtaskCommands::Done { subtask_id } => (subtask_id, SubTaskStatus::Done),
        SubtaskCommands::Reopen { subtask_id } => (subtask_id, SubTaskStatus::ToDo),
    };

    let human = format!("set sub-task {subtask_id} to {}", status.as_str());
    if dry_run(json, "set_subtask_status", subtask_id, &human) {
        return Ok(());
    }
    let st = storage.set_subtask_status(subtask_id, status, actor)?;
    if crate::is_silent() {
        println!("{}", st.id);
    } else if json {
        print_json(&st)?;
    } else {
        println!("Sub-task {} is now {}", st.title, st.status.as_str());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_mime_for() {
        assert_eq!(mime_for("crash.PNG"), "image/png");
        assert_eq!(mime_for("notes.md"), "text/markdown");
        assert_eq!(mime_for("blob"), "application/octet-stream");
    }

    #[test]
    fn test_dedup_keeps_order() {
        let labels = vec!["ui".to_string(), " auth ".to_string(), "ui".to_string(), String::new()];
        assert_eq!(dedup(&labels), vec!["ui", "auth"]);
    }

    #[test]
    fn test_describe_file_attachment() {
        let mut file = tempfile::NamedTempFile::with_suffix(".txt").unwrap();
        file.write_all(b"hello").unwrap();

        let args = IssueAttachArgs {
            id: "MOB-1".into(),
            location: file.path().to_string_lossy().to_string(),
            name: None,
            description: None,
        };
        let attachment = describe_attachment(&args, "issue_1", "alex").unwrap();

        assert_eq!(attachment.size.as_deref(), Some("5 B"));
        assert_eq!(attachment.size_bytes, Some(5));
        assert_eq!(attachment.file_type.as_deref(), Some("text/plain"));
        assert_eq!(
            attachment.checksum.as_deref(),
            Some("2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824")
        );
    }

    #[test]
    fn test_describe_url_attachment() {
        let args = IssueAttachArgs {
            id: "MOB-1".into(),
            location: "https://example.com/specs/login.pdf".into(),
            name: None,
            description: None,
        };
        let attachment = describe_attachment(&args, "issue_1", "alex").unwrap();
        assert_eq!(attachment.name, "login.pdf");
        assert_eq!(attachment.file_type.as_deref(), Some("application/pdf"));
        assert!(attachment.checksum.is_none());
    }

    #[test]
    fn test_list_query_from_flags() {
        let (storage, project) = crate::storage::sqlite::test_support::storage_with_project();
        let workflow = storage.workflow_for_project(&project).unwrap();
        let args = IssueListArgs {
            status: Some("in_progress".into()),
            priority: Some("urgent".into()),
            ..IssueListArgs::default()
        };
        let query = list_query(&storage, &args, Some(&workflow)).unwrap();
        assert_eq!(query.to_string(), "status = \"In Progress\" AND priority = \"High\"");
    }

    #[test]
    fn test_list_flags_keep_apostrophes() {
        let (mut storage, project) = crate::storage::sqlite::test_support::storage_with_project();
        let workflow = storage.workflow_for_project(&project).unwrap();
        let mut crash = Issue::new(project.id.clone(), "Crash".into(), "To Do".into());
        crash.assignee = Some("O'Brien".into());
        storage.create_issue(&mut crash, "alex").unwrap();
        let mut other = Issue::new(project.id.clone(), "Other".into(), "To Do".into());
        other.assignee = Some("OBrien".into());
        storage.create_issue(&mut other, "alex").unwrap();

        let args = IssueListArgs {
            assignee: Some("O'Brien".into()),
            query: Some("status = 'To Do'".into()),
            ..IssueListArgs::default()
        };
        let query = list_query(&storage, &args, Some(&workflow)).unwrap();
        let issues = storage.list_issues(Some(&project.id)).unwrap();
        let matched = query.filter(&issues, &EvalContext::new("alex"));
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].key, crash.key);
    }
}
