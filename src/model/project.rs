//! Project model for PlanUp.
//!
//! Projects own issues, sprints and epics. Each project carries a short
//! key (e.g. "MOB") that prefixes its issue keys (MOB-1, MOB-2) and epic
//! keys (MOB-EPIC-1), plus the workflow its issues follow.

use serde::{Deserialize, Serialize};

/// The workflow a project uses when none is chosen.
pub const DEFAULT_WORKFLOW_ID: &str = "agile";

/// A project in PlanUp.
///
/// Projects provide:
/// - Issue and epic key prefixes (e.g., "MOB" -> MOB-1, MOB-EPIC-1)
/// - The workflow that governs issue statuses
/// - Optional ownership by an organization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Unique identifier (`proj_` + 12 hex chars)
    pub id: String,

    /// Uppercase key used as the issue prefix
    pub key: String,

    /// Display name for the project
    pub name: String,

    /// Optional description
    pub description: Option<String>,

    /// Project lead
    pub lead: Option<String>,

    /// Workflow id (built-in or custom)
    #[serde(default = "default_workflow")]
    pub workflow_id: String,

    /// Owning organization, if any
    pub organization_id: Option<String>,

    /// Next issue number to assign
    #[serde(default = "default_one")]
    pub next_issue_number: i64,

    /// Next epic number to assign
    #[serde(default = "default_one")]
    pub next_epic_number: i64,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,

    /// Last update timestamp (Unix milliseconds)
    pub updated_at: i64,
}

fn default_one() -> i64 {
    1
}

fn default_workflow() -> String {
    DEFAULT_WORKFLOW_ID.to_string()
}

impl Project {
    /// Create a new project with default values.
    ///
    /// When no key is supplied one is derived from the first four
    /// alphanumeric characters of the name.
    pub fn new(name: String, key: Option<&str>) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        let id = format!("proj_{}", &uuid::Uuid::new_v4().simple().to_string()[..12]);

        let key = key.map_or_else(|| derive_key(&name), str::to_uppercase);

        Self {
            id,
            key,
            name,
            description: None,
            lead: None,
            workflow_id: default_workflow(),
            organization_id: None,
            next_issue_number: 1,
            next_epic_number: 1,
            created_at: now,
            updated_at: now,
        }
    }

    /// Generate the next issue key.
    #[must_use]
    pub fn next_issue_key(&self) -> String {
        format!("{}-{}", self.key, self.next_issue_number)
    }

    /// Generate the next epic key.
    #[must_use]
    pub fn next_epic_key(&self) -> String {
        format!("{}-EPIC-{}", self.key, self.next_epic_number)
    }
}

/// Derive a project key from its name.
#[must_use]
pub fn derive_key(name: &str) -> String {
    let key: String = name
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(4)
        .collect::<String>()
        .to_uppercase();
    if key.is_empty() { "PU".to_string() } else { key }
}

/// Check that a key is 2-10 ASCII uppercase letters or digits, starting with a letter.
#[must_use]
pub fn is_valid_key(key: &str) -> bool {
    (2..=10).contains(&key.len())
        && key.starts_with(|c: char| c.is_ascii_uppercase())
        && key
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_project() {
        let project = Project::new("Mobile App".to_string(), None);

        assert!(project.id.starts_with("proj_"));
        assert_eq!(project.id.len(), "proj_".len() + 12);
        assert_eq!(project.name, "Mobile App");
        assert_eq!(project.key, "MOBI");
        assert_eq!(project.workflow_id, "agile");
        assert_eq!(project.next_issue_number, 1);
    }

    #[test]
    fn test_explicit_key_is_uppercased() {
        let project = Project::new("Website Redesign".to_string(), Some("wrd"));
        assert_eq!(project.key, "WRD");
    }

    #[test]
    fn test_next_keys() {
        let mut project = Project::new("Test".to_string(), Some("MAD"));
        project.next_issue_number = 42;
        project.next_epic_number = 3;

        assert_eq!(project.next_issue_key(), "MAD-42");
        assert_eq!(project.next_epic_key(), "MAD-EPIC-3");
    }

    #[test]
    fn test_key_validation() {
        assert!(is_valid_key("MOB"));
        assert!(is_valid_key("WEB2"));
        assert!(!is_valid_key("M"));
        assert!(!is_valid_key("2WEB"));
        assert!(!is_valid_key("mob"));
        assert!(!is_valid_key("MO-B"));
    }

    #[test]
    fn test_derive_key_from_symbols_only() {
        assert_eq!(derive_key("!!!"), "PU");
    }
}
