//! Workflows: ordered statuses plus labelled transitions.
//!
//! Three workflows ship built in (`agile`, `bug`, `feature`); projects may
//! also use custom workflows saved in the database. A workflow is pure data
//! here. Storage decides which workflow a project uses, and
//! [`Workflow::find_transition`] is what `issue transition` enforces.

use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Status names that count as done in any workflow.
const DONE_NAMES: [&str; 4] = ["done", "closed", "resolved", "released"];

/// A labelled move between two statuses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub label: String,
    pub from: String,
    pub to: String,
}

impl Transition {
    pub fn new(label: &str, from: &str, to: &str) -> Self {
        Self {
            label: label.to_string(),
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Parse `LABEL:FROM->TO` (or `FROM->TO`, labelled "Move to TO").
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` when the arrow or either endpoint is missing.
    pub fn parse_spec(spec: &str) -> Result<Self> {
        let (label, route) = match spec.split_once(':') {
            Some((label, route)) => (Some(label.trim()), route),
            None => (None, spec),
        };

        let (from, to) = route.split_once("->").ok_or_else(|| {
            Error::InvalidArgument(format!("transition '{spec}' must look like LABEL:FROM->TO"))
        })?;
        let (from, to) = (from.trim(), to.trim());
        if from.is_empty() || to.is_empty() {
            return Err(Error::InvalidArgument(format!(
                "transition '{spec}' is missing a status"
            )));
        }

        let label = match label {
            Some(l) if !l.is_empty() => l.to_string(),
            _ => format!("Move to {to}"),
        };
        Ok(Self::new(&label, from, to))
    }
}

/// An ordered list of statuses and the transitions allowed between them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub color: String,
    /// Ordered statuses; the first is where new issues start
    pub statuses: Vec<String>,
    pub transitions: Vec<Transition>,
    #[serde(default)]
    pub builtin: bool,
    #[serde(default)]
    pub created_at: i64,
}

fn builtin(
    id: &str,
    name: &str,
    description: &str,
    color: &str,
    statuses: &[&str],
    transitions: &[(&str, &str, &str)],
) -> Workflow {
    Workflow {
        id: id.to_string(),
        name: name.to_string(),
        description: Some(description.to_string()),
        color: color.to_string(),
        statuses: statuses.iter().map(ToString::to_string).collect(),
        transitions: transitions
            .iter()
            .map(|(label, from, to)| Transition::new(label, from, to))
            .collect(),
        builtin: true,
        created_at: 0,
    }
}

/// The workflows every database starts with, in display order.
pub static BUILTIN_WORKFLOWS: LazyLock<Vec<Workflow>> = LazyLock::new(|| {
    vec![
        builtin(
            "agile",
            "Agile Workflow",
            "Standard agile workflow with To Do → In Progress → Done",
            "#4CAF50",
            &["To Do", "In Progress", "Done"],
            &[
                ("Start Work", "To Do", "In Progress"),
                ("Complete", "In Progress", "Done"),
                ("Reopen", "In Progress", "To Do"),
                ("Reopen", "Done", "In Progress"),
            ],
        ),
        builtin(
            "bug",
            "Bug Workflow",
            "Bug tracking workflow with additional statuses",
            "#FF6B6B",
            &["Open", "In Progress", "In Review", "Resolved", "Closed"],
            &[
                ("Start Fix", "Open", "In Progress"),
                ("Ready for Review", "In Progress", "In Review"),
                ("Approve Fix", "In Review", "Resolved"),
                ("Needs Changes", "In Review", "In Progress"),
                ("Close Bug", "Resolved", "Closed"),
                ("Reopen", "Resolved", "In Progress"),
            ],
        ),
        builtin(
            "feature",
            "Feature Workflow",
            "Feature development workflow with planning stages",
            "#2196F3",
            &[
                "Backlog",
                "Planning",
                "In Development",
                "Testing",
                "Ready for Release",
                "Released",
            ],
            &[
                ("Start Planning", "Backlog", "Planning"),
                ("Start Development", "Planning", "In Development"),
                ("Ready for Testing", "In Development", "Testing"),
                ("Testing Complete", "Testing", "Ready for Release"),
                ("Needs Changes", "Testing", "In Development"),
                ("Release", "Ready for Release", "Released"),
            ],
        ),
    ]
});

/// Look up a built-in workflow by id.
#[must_use]
pub fn builtin_workflow(id: &str) -> Option<&'static Workflow> {
    BUILTIN_WORKFLOWS.iter().find(|w| w.id == id)
}

/// The workflow projects fall back to.
#[must_use]
pub fn fallback_workflow() -> &'static Workflow {
    &BUILTIN_WORKFLOWS[0]
}

/// Normalize a status name for comparison: lowercase, `_`/`-` as spaces,
/// whitespace collapsed.
#[must_use]
pub fn status_slug(s: &str) -> String {
    s.to_lowercase()
        .replace(['_', '-'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

impl Workflow {
    /// Create an empty custom workflow.
    pub fn new(name: String) -> Self {
        Self {
            id: crate::model::new_id("wf"),
            name,
            description: None,
            color: "#9E9E9E".to_string(),
            statuses: Vec::new(),
            transitions: Vec::new(),
            builtin: false,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Check the workflow is usable.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for an empty name, fewer than two statuses,
    /// duplicate statuses, or a transition naming an unknown status.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidArgument("workflow name must not be empty".into()));
        }
        if self.statuses.len() < 2 {
            return Err(Error::InvalidArgument(
                "a workflow needs at least 2 statuses".into(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for status in &self.statuses {
            if status.trim().is_empty() {
                return Err(Error::InvalidArgument("status names must not be empty".into()));
            }
            if !seen.insert(status_slug(status)) {
                return Err(Error::InvalidArgument(format!(
                    "duplicate status '{status}' in workflow"
                )));
            }
        }

        for t in &self.transitions {
            if t.label.trim().is_empty() {
                return Err(Error::InvalidArgument("transition labels must not be empty".into()));
            }
            for end in [&t.from, &t.to] {
                if self.resolve_status(end).is_none() {
                    return Err(Error::InvalidArgument(format!(
                        "transition '{}' refers to unknown status '{end}'",
                        t.label
                    )));
                }
            }
        }
        Ok(())
    }

    /// The status new issues start in.
    #[must_use]
    pub fn initial_status(&self) -> &str {
        self.statuses.first().map_or("", String::as_str)
    }

    /// Match a status name loosely, returning the workflow's spelling.
    #[must_use]
    pub fn resolve_status(&self, input: &str) -> Option<&str> {
        let wanted = status_slug(input);
        self.statuses
            .iter()
            .find(|s| status_slug(s) == wanted)
            .map(String::as_str)
    }

    /// Resolve a status or fail with the list of valid ones.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStatus` if `input` is not one of the workflow's statuses.
    pub fn require_status(&self, input: &str) -> Result<String> {
        self.resolve_status(input)
            .map(ToString::to_string)
            .ok_or_else(|| Error::InvalidStatus {
                status: input.to_string(),
                workflow: self.name.clone(),
                valid: self.statuses.clone(),
            })
    }

    /// Whether a status counts as completed work.
    #[must_use]
    pub fn is_done(&self, status: &str) -> bool {
        let slug = status_slug(status);
        self.statuses
            .last()
            .is_some_and(|last| status_slug(last) == slug)
            || DONE_NAMES.contains(&slug.as_str())
    }

    /// Transitions leaving `status`.
    #[must_use]
    pub fn transitions_from(&self, status: &str) -> Vec<&Transition> {
        let slug = status_slug(status);
        self.transitions
            .iter()
            .filter(|t| status_slug(&t.from) == slug)
            .collect()
    }

    /// Find the transition from `from` that matches `target`, which may be
    /// either a transition label or a destination status.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` listing the allowed moves when none match.
    pub fn find_transition(&self, from: &str, target: &str) -> Result<&Transition> {
        let candidates = self.transitions_from(from);
        let wanted = status_slug(target);

        candidates
            .iter()
            .find(|t| status_slug(&t.to) == wanted)
            .or_else(|| candidates.iter().find(|t| status_slug(&t.label) == wanted))
            .copied()
            .ok_or_else(|| Error::InvalidTransition {
                from: from.to_string(),
                to: target.to_string(),
                allowed: candidates
                    .iter()
                    .map(|t| format!("{} → {}", t.label, t.to))
                    .collect(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_are_valid() {
        assert_eq!(BUILTIN_WORKFLOWS.len(), 3);
        for wf in BUILTIN_WORKFLOWS.iter() {
            wf.validate().unwrap();
            assert!(wf.builtin);
        }
        assert_eq!(fallback_workflow().id, "agile");
    }

    #[test]
    fn test_builtin_tables() {
        let bug = builtin_workflow("bug").unwrap();
        assert_eq!(bug.color, "#FF6B6B");
        assert_eq!(
            bug.description.as_deref(),
            Some("Bug tracking workflow with additional statuses")
        );
        assert_eq!(bug.initial_status(), "Open");
        assert_eq!(bug.transitions.len(), 6);

        let feature = builtin_workflow("feature").unwrap();
        assert_eq!(feature.statuses.len(), 6);
        assert_eq!(feature.statuses.last().unwrap(), "Released");
    }

    #[test]
    fn test_resolve_status_loosely() {
        let agile = builtin_workflow("agile").unwrap();
        assert_eq!(agile.resolve_status("in_progress"), Some("In Progress"));
        assert_eq!(agile.resolve_status("to-do"), Some("To Do"));
        assert_eq!(agile.resolve_status("  DONE "), Some("Done"));
        assert_eq!(agile.resolve_status("Closed"), None);
    }

    #[test]
    fn test_require_status_lists_valid() {
        let agile = builtin_workflow("agile").unwrap();
        match agile.require_status("Shipped") {
            Err(Error::InvalidStatus { valid, .. }) => assert_eq!(valid.len(), 3),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_find_transition_by_status_and_label() {
        let agile = builtin_workflow("agile").unwrap();
        let t = agile.find_transition("To Do", "In Progress").unwrap();
        assert_eq!(t.label, "Start Work");

        let t = agile.find_transition("In Progress", "complete").unwrap();
        assert_eq!(t.to, "Done");

        let t = agile.find_transition("Done", "Reopen").unwrap();
        assert_eq!(t.to, "In Progress");
    }

    #[test]
    fn test_find_transition_rejects_skips() {
        let agile = builtin_workflow("agile").unwrap();
        match agile.find_transition("To Do", "Done") {
            Err(Error::InvalidTransition { allowed, .. }) => {
                assert_eq!(allowed, vec!["Start Work → In Progress".to_string()]);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_needs_changes_in_bug_flow() {
        let bug = builtin_workflow("bug").unwrap();
        let moves: Vec<_> = bug
            .transitions_from("In Review")
            .iter()
            .map(|t| t.to.as_str())
            .collect();
        assert_eq!(moves, vec!["Resolved", "In Progress"]);
    }

    #[test]
    fn test_is_done() {
        let bug = builtin_workflow("bug").unwrap();
        assert!(bug.is_done("Closed"));
        assert!(bug.is_done("Resolved"));
        assert!(!bug.is_done("In Review"));

        let agile = builtin_workflow("agile").unwrap();
        assert!(agile.is_done("done"));
        assert!(!agile.is_done("To Do"));
    }

    #[test]
    fn test_validate_custom() {
        let mut wf = Workflow::new("Kanban".into());
        wf.statuses = vec!["Queued".into()];
        assert!(wf.validate().is_err());

        wf.statuses.push("Shipped".into());
        wf.validate().unwrap();

        wf.transitions.push(Transition::new("Ship", "Queued", "Gone"));
        assert!(wf.validate().is_err());

        wf.transitions[0].to = "Shipped".into();
        wf.validate().unwrap();

        wf.statuses.push("queued".into());
        assert!(wf.validate().is_err());
    }

    #[test]
    fn test_validate_requires_name() {
        let mut wf = Workflow::new("  ".into());
        wf.statuses = vec!["A".into(), "B".into()];
        assert!(wf.validate().is_err());
    }

    #[test]
    fn test_parse_transition_spec() {
        let t = Transition::parse_spec("Ship It:Queued->Shipped").unwrap();
        assert_eq!(t, Transition::new("Ship It", "Queued", "Shipped"));

        let t = Transition::parse_spec("Queued -> Shipped").unwrap();
        assert_eq!(t.label, "Move to Shipped");

        assert!(Transition::parse_spec("Queued").is_err());
        assert!(Transition::parse_spec("Go:->Shipped").is_err());
    }
}
