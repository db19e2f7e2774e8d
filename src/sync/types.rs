//! Sync types for JSONL export/import.
//!
//! Each exported line wraps a data model with sync metadata.

use serde::{Deserialize, Serialize};

use crate::model::{Epic, Idea, Issue, Project, Sprint};

/// Tagged union for JSONL records.
///
/// Lines look like `{"kind":"issue","id":"issue_1a2b",...}`. The tag is
/// `kind` because issues already carry a `type` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SyncRecord {
    Project(Synced<Project>),
    Epic(Synced<Epic>),
    Sprint(Synced<Sprint>),
    Issue(Synced<Issue>),
    Idea(Synced<Idea>),
}

impl SyncRecord {
    /// Id of the wrapped record.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Project(rec) => &rec.data.id,
            Self::Epic(rec) => &rec.data.id,
            Self::Sprint(rec) => &rec.data.id,
            Self::Issue(rec) => &rec.data.id,
            Self::Idea(rec) => &rec.data.id,
        }
    }
}

/// A record with its sync metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Synced<T> {
    /// The record data.
    #[serde(flatten)]
    pub data: T,
    /// SHA256 hash of the serialized data (for change detection).
    pub content_hash: String,
    /// RFC 3339 timestamp when this record was exported.
    pub exported_at: String,
}

/// Entity kinds with one JSONL file each, in import order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Project,
    Epic,
    Sprint,
    Issue,
    Idea,
}

impl EntityKind {
    /// Parents before children so foreign keys resolve on import.
    pub const ALL: [Self; 5] = [Self::Project, Self::Epic, Self::Sprint, Self::Issue, Self::Idea];

    /// JSONL file name for this kind.
    #[must_use]
    pub const fn file_name(&self) -> &'static str {
        match self {
            Self::Project => "projects.jsonl",
            Self::Epic => "epics.jsonl",
            Self::Sprint => "sprints.jsonl",
            Self::Issue => "issues.jsonl",
            Self::Idea => "ideas.jsonl",
        }
    }

    /// Table holding this kind.
    #[must_use]
    pub const fn table(&self) -> &'static str {
        match self {
            Self::Project => "projects",
            Self::Epic => "epics",
            Self::Sprint => "sprints",
            Self::Issue => "issues",
            Self::Idea => "ideas",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Project => write!(f, "projects"),
            Self::Epic => write!(f, "epics"),
            Self::Sprint => write!(f, "sprints"),
            Self::Issue => write!(f, "issues"),
            Self::Idea => write!(f, "ideas"),
        }
    }
}

/// Conflict resolution strategy for imports.
///
/// When importing a record that already exists locally, this determines
/// which version wins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum MergeStrategy {
    /// Use the record with the newer `updated_at` timestamp.
    #[default]
    PreferNewer,
    /// Always keep the local version.
    KeepLocal,
    /// Always take the external (imported) version.
    PreferExternal,
}

/// Statistics for an export operation.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ExportStats {
    pub projects: usize,
    pub epics: usize,
    pub sprints: usize,
    pub issues: usize,
    pub ideas: usize,
}

impl ExportStats {
    /// Total number of records exported.
    #[must_use]
    pub fn total(&self) -> usize {
        self.projects + self.epics + self.sprints + self.issues + self.ideas
    }

    /// Returns true if nothing was exported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub(crate) fn set(&mut self, kind: EntityKind, count: usize) {
        match kind {
            EntityKind::Project => self.projects = count,
            EntityKind::Epic => self.epics = count,
            EntityKind::Sprint => self.sprints = count,
            EntityKind::Issue => self.issues = count,
            EntityKind::Idea => self.ideas = count,
        }
    }
}

/// Statistics for an import operation.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ImportStats {
    pub projects: EntityStats,
    pub epics: EntityStats,
    pub sprints: EntityStats,
    pub issues: EntityStats,
    pub ideas: EntityStats,
}

impl ImportStats {
    fn all(&self) -> [&EntityStats; 5] {
        [&self.projects, &self.epics, &self.sprints, &self.issues, &self.ideas]
    }

    /// Total number of records processed.
    #[must_use]
    pub fn total_processed(&self) -> usize {
        self.all().iter().map(|s| s.total()).sum()
    }

    /// Total number of records created.
    #[must_use]
    pub fn total_created(&self) -> usize {
        self.all().iter().map(|s| s.created).sum()
    }

    /// Total number of records updated.
    #[must_use]
    pub fn total_updated(&self) -> usize {
        self.all().iter().map(|s| s.updated).sum()
    }
}

/// Per-entity statistics for import operations.
#[derive(Debug, Default, Clone, Serialize)]
pub struct EntityStats {
    /// Number of new records created.
    pub created: usize,
    /// Number of existing records updated.
    pub updated: usize,
    /// Number of records skipped (no change or merge strategy chose local).
    pub skipped: usize,
}

impl EntityStats {
    /// Total records processed.
    #[must_use]
    pub fn total(&self) -> usize {
        self.created + self.updated + self.skipped
    }
}

/// Sync status information.
#[derive(Debug, Clone, Serialize)]
pub struct SyncStatus {
    /// Directory the JSONL files live in.
    pub directory: String,
    /// Per-kind record counts in the database and on disk.
    pub entities: Vec<EntityStatus>,
}

impl SyncStatus {
    #[must_use]
    pub fn has_export_files(&self) -> bool {
        self.entities.iter().any(|e| e.file.is_some())
    }
}

/// Database and file counts for one entity kind.
#[derive(Debug, Clone, Serialize)]
pub struct EntityStatus {
    pub kind: EntityKind,
    pub in_database: usize,
    pub file: Option<ExportFileInfo>,
}

/// Information about an export file.
#[derive(Debug, Clone, Serialize)]
pub struct ExportFileInfo {
    /// File name (e.g., "issues.jsonl").
    pub name: String,
    /// File size in bytes.
    pub size: u64,
    /// Number of lines (records) in the file.
    pub line_count: usize,
}

/// Sync-specific errors.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// The database holds nothing to export.
    #[error("Nothing to export: the database has no projects or ideas")]
    NothingToExport,

    /// Overwriting a file would drop records the database does not have.
    #[error(
        "Export would lose {count} {kind} record(s) that exist in JSONL but not in the database: {preview}"
    )]
    WouldLoseRecords {
        kind: EntityKind,
        count: usize,
        preview: String,
    },

    /// JSONL file not found.
    #[error("JSONL file not found: {0}")]
    FileNotFound(String),

    /// Invalid record format.
    #[error("Invalid record at line {line}: {message}")]
    InvalidRecord {
        /// Line number (1-indexed).
        line: usize,
        /// Error message.
        message: String,
    },
}

impl From<rusqlite::Error> for SyncError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<crate::error::Error> for SyncError {
    fn from(err: crate::error::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<SyncError> for crate::error::Error {
    fn from(err: SyncError) -> Self {
        Self::Sync(err.to_string())
    }
}

/// Result type for sync operations.
pub type SyncResult<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_stats() {
        let mut stats = ExportStats::default();
        assert!(stats.is_empty());

        stats.set(EntityKind::Project, 1);
        stats.set(EntityKind::Issue, 3);
        assert_eq!(stats.total(), 4);
        assert!(!stats.is_empty());
    }

    #[test]
    fn test_import_totals() {
        let mut stats = ImportStats::default();
        stats.issues.created = 2;
        stats.issues.skipped = 1;
        stats.projects.updated = 1;
        assert_eq!(stats.total_processed(), 4);
        assert_eq!(stats.total_created(), 2);
        assert_eq!(stats.total_updated(), 1);
    }

    #[test]
    fn test_issue_record_keeps_type_field() {
        let issue = Issue::new("proj_1".into(), "Crash".into(), "To Do".into());
        let record = SyncRecord::Issue(Synced {
            data: issue,
            content_hash: "abc".into(),
            exported_at: "2025-01-20T00:00:00Z".into(),
        });

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kind"], "issue");
        assert_eq!(json["type"], "Task");

        let back: SyncRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back.id(), record.id());
    }

    #[test]
    fn test_merge_strategy_default() {
        assert_eq!(MergeStrategy::default(), MergeStrategy::PreferNewer);
    }
}
