//! Saved query filters.

use serde::{Deserialize, Serialize};

/// A named query stored for reuse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedFilter {
    pub id: String,
    pub name: String,
    pub query: String,
    /// Restrict the filter to one project
    pub project_id: Option<String>,
    pub created_by: String,
    pub created_at: i64,
    /// Built-in quick filters are not stored in the database
    #[serde(default)]
    pub builtin: bool,
}

impl SavedFilter {
    pub fn new(name: String, query: String, created_by: String) -> Self {
        Self {
            id: super::new_id("filter"),
            name,
            query,
            project_id: None,
            created_by,
            created_at: chrono::Utc::now().timestamp_millis(),
            builtin: false,
        }
    }
}
