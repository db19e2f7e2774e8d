//! Project reports.

use super::{open_storage, print_json, resolve_project, Globals};
use crate::cli::ReportCommands;
use crate::error::Result;
use crate::model::{percent, IssueType, Priority, Project, SprintProgress};
use crate::storage::SqliteStorage;
use chrono::NaiveDate;
use colored::Colorize;
use serde::Serialize;

/// Counts and progress for one project.
#[derive(Debug, Serialize)]
pub struct ProjectSummary {
    pub project: String,
    pub workflow: String,
    pub total: usize,
    pub done: usize,
    pub open: usize,
    /// In workflow order
    pub by_status: Vec<(String, usize)>,
    pub by_priority: Vec<(&'static str, usize)>,
    pub by_type: Vec<(&'static str, usize)>,
    pub overdue: usize,
    pub unassigned: usize,
    pub estimated_hours: f64,
    pub logged_hours: f64,
    pub active_sprint: Option<ActiveSprintSummary>,
    pub epics: Vec<EpicSummary>,
}

#[derive(Debug, Serialize)]
pub struct ActiveSprintSummary {
    pub name: String,
    pub end_date: String,
    #[serde(flatten)]
    pub progress: SprintProgress,
    pub percent_complete: i64,
}

#[derive(Debug, Serialize)]
pub struct EpicSummary {
    pub key: String,
    pub title: String,
    pub status: String,
    pub progress: i64,
}

/// Execute a report command.
///
/// # Errors
///
/// Returns an error if the database is missing or the project can't be resolved.
pub fn execute(command: &ReportCommands, globals: Globals<'_>) -> Result<()> {
    let storage = open_storage(globals.db)?;

    match command {
        ReportCommands::Summary => {
            let project = resolve_project(&storage, globals.project)?;
            let today = chrono::Local::now().date_naive();
            let summary = build_summary(&storage, &project, today)?;
            if globals.json {
                print_json(&summary)
            } else {
                print_summary(&summary);
                Ok(())
            }
        }
    }
}

/// Gather the summary for `project` as of `today`.
pub(crate) fn build_summary(storage: &SqliteStorage, project: &Project, today: NaiveDate) -> Result<ProjectSummary> {
    let workflow = storage.workflow_for_project(project)?;
    let issues = storage.list_issues(Some(&project.id))?;
    let today = today.format("%Y-%m-%d").to_string();

    let by_status = workflow
        .statuses
        .iter()
        .map(|s| (s.clone(), issues.iter().filter(|i| &i.status == s).count()))
        .collect();
    let by_priority = Priority::ALL
        .iter()
        .map(|p| (p.as_str(), issues.iter().filter(|i| i.priority == *p).count()))
        .collect();
    let by_type = IssueType::ALL
        .iter()
        .map(|t| (t.as_str(), issues.iter().filter(|i| i.issue_type == *t).count()))
        .collect();

    let done = issues.iter().filter(|i| workflow.is_done(&i.status)).count();
    let overdue = issues
        .iter()
        .filter(|i| !workflow.is_done(&i.status))
        .filter(|i| i.due_date.as_deref().is_some_and(|d| d < today.as_str()))
        .count();

    let active_sprint = match storage.active_sprint(&project.id)? {
        Some(sprint) => {
            let progress = storage.sprint_progress(&sprint)?;
            Some(ActiveSprintSummary {
                percent_complete: progress.percent(),
                name: sprint.name,
                end_date: sprint.end_date,
                progress,
            })
        }
        None => None,
    };

    let epics = storage
        .list_epics(&project.id, None, None)?
        .into_iter()
        .map(|e| EpicSummary {
            progress: e.progress(),
            key: e.key,
            title: e.title,
            status: e.status,
        })
        .collect();

    Ok(ProjectSummary {
        project: project.key.clone(),
        workflow: workflow.name.clone(),
        total: issues.len(),
        done,
        open: issues.len() - done,
        by_status,
        by_priority,
        by_type,
        overdue,
        unassigned: issues.iter().filter(|i| i.assignee.is_none()).count(),
        estimated_hours: issues.iter().filter_map(|i| i.estimated_hours).sum(),
        logged_hours: issues.iter().map(|i| i.logged_hours).sum(),
        active_sprint,
        epics,
    })
}

#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn print_summary(s: &ProjectSummary) {
    println!("{} ({})", s.project.bold(), s.workflow);
    println!(
        "  Issues: {} total, {} done, {} open ({}% done)",
        s.total,
        s.done,
        s.open,
        percent(s.done as i64, s.total as i64)
    );
    if s.overdue > 0 {
        println!("  Overdue: {}", s.overdue.to_string().red());
    }
    println!("  Unassigned: {}", s.unassigned);
    println!("  Hours: {} logged / {} estimated", s.logged_hours, s.estimated_hours);

    println!();
    println!("By status:");
    for (status, n) in &s.by_status {
        println!("  {status:<20} {n}");
    }
    println!("By priority:");
    for (priority, n) in &s.by_priority {
        println!("  {priority:<20} {n}");
    }
    println!("By type:");
    for (kind, n) in &s.by_type {
        println!("  {kind:<20} {n}");
    }

    if let Some(ref sprint) = s.active_sprint {
        println!();
        println!(
            "Active sprint: {} (ends {})",
            sprint.name.bold(),
            sprint.end_date
        );
        println!(
            "  {}/{} issues, {}/{} points ({}%)",
            sprint.progress.done_count,
            sprint.progress.issue_count,
            sprint.progress.completed_points,
            sprint.progress.committed_points,
            sprint.percent_complete
        );
    }

    if !s.epics.is_empty() {
        println!();
        println!("Epics:");
        for e in &s.epics {
            println!("  {:<14} {:>3}%  {}", e.key, e.progress, e.title);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Issue;
    use crate::storage::sqlite::test_support::{storage_with_project, ACTOR};

    #[test]
    fn test_summary_counts() {
        let (mut storage, project) = storage_with_project();

        let mut late = Issue::new(project.id.clone(), "Late".into(), "To Do".into());
        late.due_date = Some("2025-03-01".into());
        late.priority = Priority::High;
        late.estimated_hours = Some(4.0);
        storage.create_issue(&mut late, ACTOR).unwrap();

        let mut finished = Issue::new(project.id.clone(), "Finished".into(), "Done".into());
        finished.due_date = Some("2025-03-01".into());
        finished.issue_type = IssueType::Bug;
        finished.assignee = Some(ACTOR.into());
        storage.create_issue(&mut finished, ACTOR).unwrap();

        let today = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let summary = build_summary(&storage, &project, today).unwrap();

        assert_eq!(summary.total, 2);
        assert_eq!(summary.done, 1);
        assert_eq!(summary.overdue, 1);
        assert_eq!(summary.unassigned, 1);
        assert!((summary.estimated_hours - 4.0).abs() < f64::EPSILON);
        assert!(summary.by_status.contains(&("Done".to_string(), 1)));
        assert!(summary.by_priority.contains(&("High", 1)));
        assert!(summary.by_type.contains(&("Bug", 1)));
        assert!(summary.active_sprint.is_none());
    }
}
