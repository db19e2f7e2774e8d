//! Issue templates.

use serde::{Deserialize, Serialize};

use super::{IssueType, Priority};

/// Preset values applied when creating an issue from a template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub issue_type: Option<IssueType>,
    pub priority: Option<Priority>,
    /// Prepended to the issue title, e.g. "[Spike] "
    pub title_prefix: Option<String>,
    /// Default issue description
    pub body: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    pub created_by: String,
    pub created_at: i64,
}

impl Template {
    pub fn new(name: String, created_by: String) -> Self {
        Self {
            id: super::new_id("tmpl"),
            name,
            description: None,
            issue_type: None,
            priority: None,
            title_prefix: None,
            body: None,
            labels: Vec::new(),
            created_by,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Apply the title prefix, skipping it when already present.
    #[must_use]
    pub fn title_for(&self, title: &str) -> String {
        match self.title_prefix.as_deref() {
            Some(prefix) if !title.starts_with(prefix) => format!("{prefix}{title}"),
            _ => title.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_prefix_applied_once() {
        let mut template = Template::new("spike".into(), "alex".into());
        template.title_prefix = Some("[Spike] ".into());
        assert_eq!(template.title_for("Try SQLite FTS"), "[Spike] Try SQLite FTS");
        assert_eq!(template.title_for("[Spike] Again"), "[Spike] Again");
    }
}
