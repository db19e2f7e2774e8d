//! Error types for PlanUp CLI.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (2=db, 3=not_found, 4=validation, 5=state, etc.)
//! - Retryability flags for scripted callers
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for PlanUp operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
///
/// Each code maps to a SCREAMING_SNAKE string and a category-based
/// exit code. Scripts match on the string or on the exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Database (exit 2)
    NotInitialized,
    AlreadyInitialized,
    DatabaseError,

    // Not Found (exit 3)
    IssueNotFound,
    ProjectNotFound,
    NoProjectSelected,
    EntityNotFound,

    // Validation (exit 4)
    InvalidStatus,
    InvalidArgument,
    InvalidQuery,
    RequiredField,

    // State (exit 5)
    InvalidTransition,
    InvalidState,
    PermissionDenied,
    AlreadyExists,

    // Sync (exit 6)
    SyncError,

    // Config (exit 7)
    ConfigError,

    // I/O (exit 8)
    IoError,
    JsonError,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::AlreadyInitialized => "ALREADY_INITIALIZED",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::IssueNotFound => "ISSUE_NOT_FOUND",
            Self::ProjectNotFound => "PROJECT_NOT_FOUND",
            Self::NoProjectSelected => "NO_PROJECT_SELECTED",
            Self::EntityNotFound => "NOT_FOUND",
            Self::InvalidStatus => "INVALID_STATUS",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::InvalidQuery => "INVALID_QUERY",
            Self::RequiredField => "REQUIRED_FIELD",
            Self::InvalidTransition => "INVALID_TRANSITION",
            Self::InvalidState => "INVALID_STATE",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::AlreadyExists => "ALREADY_EXISTS",
            Self::SyncError => "SYNC_ERROR",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code (1-8).
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::NotInitialized | Self::AlreadyInitialized | Self::DatabaseError => 2,
            Self::IssueNotFound
            | Self::ProjectNotFound
            | Self::NoProjectSelected
            | Self::EntityNotFound => 3,
            Self::InvalidStatus
            | Self::InvalidArgument
            | Self::InvalidQuery
            | Self::RequiredField => 4,
            Self::InvalidTransition
            | Self::InvalidState
            | Self::PermissionDenied
            | Self::AlreadyExists => 5,
            Self::SyncError => 6,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError => 8,
        }
    }

    /// Whether a caller should retry with corrected input.
    ///
    /// True for validation errors and for transitions that a different
    /// target would satisfy. False for not-found, I/O, or internal errors.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::InvalidStatus
                | Self::InvalidArgument
                | Self::InvalidQuery
                | Self::RequiredField
                | Self::InvalidTransition
                | Self::DatabaseError
        )
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in PlanUp CLI operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Not initialized: run `pu init` first")]
    NotInitialized,

    #[error("Already initialized at {path}")]
    AlreadyInitialized { path: PathBuf },

    #[error("Issue not found: {id}")]
    IssueNotFound { id: String },

    #[error("Issue not found: {id} (did you mean: {}?)", similar.join(", "))]
    IssueNotFoundSimilar { id: String, similar: Vec<String> },

    #[error("Project not found: {id}")]
    ProjectNotFound { id: String },

    #[error("No project selected")]
    NoProjectSelected {
        /// (key, name) of known projects for hint display.
        available: Vec<(String, String)>,
    },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Invalid status '{status}' for workflow {workflow}")]
    InvalidStatus {
        status: String,
        workflow: String,
        valid: Vec<String>,
    },

    #[error("Cannot move from '{from}' to '{to}'")]
    InvalidTransition {
        from: String,
        to: String,
        /// Labels and targets reachable from `from`.
        allowed: Vec<String>,
    },

    #[error("Invalid query clause '{clause}': {reason}")]
    InvalidQuery { clause: String, reason: String },

    #[error("{0}")]
    InvalidState(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("{entity} already exists: {name}")]
    AlreadyExists { entity: &'static str, name: String },

    #[error("Missing required field: {0}")]
    RequiredField(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Sync error: {0}")]
    Sync(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotInitialized => ErrorCode::NotInitialized,
            Self::AlreadyInitialized { .. } => ErrorCode::AlreadyInitialized,
            Self::Database(_) => ErrorCode::DatabaseError,
            Self::IssueNotFound { .. } | Self::IssueNotFoundSimilar { .. } => {
                ErrorCode::IssueNotFound
            }
            Self::ProjectNotFound { .. } => ErrorCode::ProjectNotFound,
            Self::NoProjectSelected { .. } => ErrorCode::NoProjectSelected,
            Self::NotFound { .. } => ErrorCode::EntityNotFound,
            Self::InvalidStatus { .. } => ErrorCode::InvalidStatus,
            Self::InvalidTransition { .. } => ErrorCode::InvalidTransition,
            Self::InvalidQuery { .. } => ErrorCode::InvalidQuery,
            Self::InvalidState(_) => ErrorCode::InvalidState,
            Self::PermissionDenied(_) => ErrorCode::PermissionDenied,
            Self::AlreadyExists { .. } => ErrorCode::AlreadyExists,
            Self::RequiredField(_) => ErrorCode::RequiredField,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Sync(_) => ErrorCode::SyncError,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Shorthand for a generic not-found error.
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Context-aware recovery hint.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::NotInitialized => Some("Run `pu init` to initialize the database".to_string()),

            Self::AlreadyInitialized { path } => Some(format!(
                "Database already exists at {}. Use `--force` to reinitialize.",
                path.display()
            )),

            Self::IssueNotFound { id } => Some(format!(
                "No issue with key '{id}'. Use `pu issue list` to see available issues."
            )),
            Self::IssueNotFoundSimilar { similar, .. } => {
                Some(format!("Did you mean: {}?", similar.join(", ")))
            }

            Self::ProjectNotFound { id } => Some(format!(
                "No project with key '{id}'. Use `pu project list` to see available projects."
            )),

            Self::NoProjectSelected { available } => {
                let mut hint = String::from("Pass --project, set PU_PROJECT, or run `pu project use <key>`.\n");
                if available.is_empty() {
                    hint.push_str("  No projects exist yet.\n");
                    hint.push_str("  Create one: pu project create \"My Project\"");
                } else {
                    hint.push_str("  Known projects:\n");
                    for (key, name) in available.iter().take(5) {
                        hint.push_str(&format!("    {key}  \"{name}\"\n"));
                    }
                    if available.len() > 5 {
                        hint.push_str(&format!("    ... and {} more", available.len() - 5));
                    }
                }
                Some(hint)
            }

            Self::NotFound { entity, .. } => Some(format!(
                "Use `pu {} list` to see what exists.",
                entity.to_lowercase()
            )),

            Self::InvalidStatus { workflow, valid, .. } => Some(format!(
                "Statuses in {workflow}: {}",
                valid.join(", ")
            )),

            Self::InvalidTransition { allowed, .. } => {
                if allowed.is_empty() {
                    Some("No transitions leave this status.".to_string())
                } else {
                    Some(format!("Allowed: {}", allowed.join(", ")))
                }
            }

            Self::InvalidQuery { .. } => Some(
                "Clauses look like `field op value` joined by AND. \
                 Operators: = != ~ !~ > < >= <="
                    .to_string(),
            ),

            Self::InvalidArgument(msg) => {
                if msg.contains("priority") {
                    Some(
                        "Valid priorities: High, Medium, Low. \
                         Synonyms: critical/urgent→High, normal→Medium, minor→Low"
                            .to_string(),
                    )
                } else if msg.contains("type") {
                    Some(
                        "Valid types: Bug, Story, Task. \
                         Synonyms: defect→Bug, feature→Story, chore→Task"
                            .to_string(),
                    )
                } else if msg.contains("date") {
                    Some("Dates use the YYYY-MM-DD format.".to_string())
                } else {
                    None
                }
            }

            Self::AlreadyExists { entity, name } => Some(format!(
                "Pick a different name or remove the existing {} '{name}'.",
                entity.to_lowercase()
            )),

            Self::Sync(msg) if msg.contains("would lose") => Some(
                "Run `pu sync import` first, or use `--force` to overwrite.".to_string(),
            ),

            Self::InvalidState(_)
            | Self::PermissionDenied(_)
            | Self::RequiredField(_)
            | Self::Database(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::Sync(_)
            | Self::Config(_)
            | Self::Other(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    ///
    /// Includes error code, message, retryability, exit code, and
    /// optional recovery hint.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_by_category() {
        assert_eq!(Error::NotInitialized.exit_code(), 2);
        assert_eq!(Error::not_found("Sprint", "sprint_1").exit_code(), 3);
        assert_eq!(Error::InvalidArgument("bad".into()).exit_code(), 4);
        assert_eq!(
            Error::InvalidTransition {
                from: "To Do".into(),
                to: "Done".into(),
                allowed: vec![],
            }
            .exit_code(),
            5
        );
        assert_eq!(Error::Other("boom".into()).exit_code(), 1);
    }

    #[test]
    fn test_structured_json_includes_hint() {
        let err = Error::IssueNotFoundSimilar {
            id: "MOB-12".into(),
            similar: vec!["MOB-1".into(), "MOB-2".into()],
        };
        let json = err.to_structured_json();
        assert_eq!(json["error"]["code"], "ISSUE_NOT_FOUND");
        assert_eq!(json["error"]["exit_code"], 3);
        assert!(json["error"]["hint"].as_str().unwrap().contains("MOB-1"));
    }

    #[test]
    fn test_priority_hint() {
        let err = Error::InvalidArgument("unknown priority 'p9'".into());
        assert!(err.hint().unwrap().contains("High"));
    }
}
