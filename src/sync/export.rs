//! JSONL export.
//!
//! # Snapshot Mode
//!
//! Each file holds the current state of every record of its kind, not a
//! log of changes. Git tracks the history.
//!
//! # Safety Checks
//!
//! Before overwriting a file the exporter checks for records that would be
//! lost (present in the JSONL file but not in the database). Use `--force`
//! to override.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use tracing::debug;

use crate::storage::sqlite::SqliteStorage;
use crate::sync::file::{ensure_gitignore, read_jsonl, write_jsonl};
use crate::sync::hash::content_hash;
use crate::sync::types::{EntityKind, ExportStats, SyncError, SyncRecord, SyncResult, Synced};

/// Exporter for JSONL sync files.
pub struct Exporter<'a> {
    storage: &'a SqliteStorage,
    output_dir: PathBuf,
}

impl<'a> Exporter<'a> {
    #[must_use]
    pub fn new(storage: &'a SqliteStorage, output_dir: PathBuf) -> Self {
        Self { storage, output_dir }
    }

    /// Get the output directory.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Export every record to JSONL files, overwriting existing files.
    ///
    /// Kinds with no records leave their file untouched.
    ///
    /// # Errors
    ///
    /// Returns `NothingToExport` for an empty database, `WouldLoseRecords`
    /// when the safety check fails and `force` is false, or an IO/database
    /// error.
    pub fn export(&self, force: bool) -> SyncResult<ExportStats> {
        let projects = self.storage.list_projects()?;
        let ideas = self.storage.list_ideas(None, None, None)?;
        if projects.is_empty() && ideas.is_empty() {
            return Err(SyncError::NothingToExport);
        }

        let mut epics = Vec::new();
        let mut sprints = Vec::new();
        for project in &projects {
            epics.extend(self.storage.list_epics(&project.id, None, None)?);
            sprints.extend(self.storage.list_sprints(&project.id, None)?);
        }
        let issues = self.storage.list_issues(None)?;

        fs::create_dir_all(&self.output_dir)?;
        ensure_gitignore(&self.output_dir)?;

        let now = Utc::now().to_rfc3339();
        let mut stats = ExportStats::default();

        let batches = [
            self.snapshot(EntityKind::Project, projects, SyncRecord::Project, &now, force)?,
            self.snapshot(EntityKind::Epic, epics, SyncRecord::Epic, &now, force)?,
            self.snapshot(EntityKind::Sprint, sprints, SyncRecord::Sprint, &now, force)?,
            self.snapshot(EntityKind::Issue, issues, SyncRecord::Issue, &now, force)?,
            self.snapshot(EntityKind::Idea, ideas, SyncRecord::Idea, &now, force)?,
        ];

        // Every safety check passes before any file is replaced.
        for (kind, records) in batches {
            if records.is_empty() {
                continue;
            }
            let path = self.output_dir.join(kind.file_name());
            write_jsonl(&path, &records)?;
            debug!(kind = %kind, count = records.len(), path = %path.display(), "Exported");
            stats.set(kind, records.len());
        }

        Ok(stats)
    }

    /// Wrap records with sync metadata after checking the existing file.
    fn snapshot<T: Serialize>(
        &self,
        kind: EntityKind,
        items: Vec<T>,
        wrap: fn(Synced<T>) -> SyncRecord,
        now: &str,
        force: bool,
    ) -> SyncResult<(EntityKind, Vec<SyncRecord>)> {
        let records = items
            .into_iter()
            .map(|data| {
                Ok(wrap(Synced {
                    content_hash: content_hash(&data)?,
                    data,
                    exported_at: now.to_string(),
                }))
            })
            .collect::<SyncResult<Vec<_>>>()?;

        if !force && !records.is_empty() {
            let ids: HashSet<&str> = records.iter().map(SyncRecord::id).collect();
            self.check_for_lost_records(kind, &ids)?;
        }

        Ok((kind, records))
    }

    fn check_for_lost_records(&self, kind: EntityKind, db_ids: &HashSet<&str>) -> SyncResult<()> {
        let path = self.output_dir.join(kind.file_name());
        if !path.exists() {
            return Ok(());
        }

        let existing = read_jsonl(&path)?;
        let mut missing: Vec<&str> = existing
            .iter()
            .map(SyncRecord::id)
            .filter(|id| !db_ids.contains(id))
            .collect();
        if missing.is_empty() {
            return Ok(());
        }

        missing.sort_unstable();
        let mut preview = missing.iter().take(5).copied().collect::<Vec<_>>().join(", ");
        if missing.len() > 5 {
            preview.push_str(&format!(" ... and {} more", missing.len() - 5));
        }

        Err(SyncError::WouldLoseRecords {
            kind,
            count: missing.len(),
            preview,
        })
    }
}

/// Default sync directory: `sync/` next to the database file.
#[must_use]
pub fn default_export_dir(db_path: &Path) -> PathBuf {
    db_path
        .parent()
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
        .join("sync")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Idea, Issue};
    use crate::storage::sqlite::test_support::{storage_with_project, ACTOR};
    use crate::sync::file::count_lines;
    use tempfile::TempDir;

    #[test]
    fn test_export_writes_one_file_per_kind() {
        let (mut storage, project) = storage_with_project();
        let mut issue = Issue::new(project.id.clone(), "Login crash".into(), "To Do".into());
        storage.create_issue(&mut issue, ACTOR).unwrap();
        storage
            .create_idea(&Idea::new("Dark mode".into(), ACTOR.into()), ACTOR)
            .unwrap();

        let temp_dir = TempDir::new().unwrap();
        let stats = Exporter::new(&storage, temp_dir.path().to_path_buf())
            .export(false)
            .unwrap();

        assert_eq!(stats.projects, 1);
        assert_eq!(stats.issues, 1);
        assert_eq!(stats.ideas, 1);
        assert_eq!(stats.sprints, 0);
        assert_eq!(count_lines(&temp_dir.path().join("issues.jsonl")).unwrap(), 1);
        assert!(!temp_dir.path().join("sprints.jsonl").exists());
        assert!(temp_dir.path().join(".gitignore").exists());
    }

    #[test]
    fn test_export_empty_database() {
        let storage = SqliteStorage::open_memory().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let result = Exporter::new(&storage, temp_dir.path().to_path_buf()).export(false);
        assert!(matches!(result, Err(SyncError::NothingToExport)));
    }

    #[test]
    fn test_export_refuses_to_lose_records() {
        let (mut storage, project) = storage_with_project();
        let mut first = Issue::new(project.id.clone(), "First".into(), "To Do".into());
        let mut second = Issue::new(project.id.clone(), "Second".into(), "To Do".into());
        storage.create_issue(&mut first, ACTOR).unwrap();
        storage.create_issue(&mut second, ACTOR).unwrap();

        let temp_dir = TempDir::new().unwrap();
        Exporter::new(&storage, temp_dir.path().to_path_buf())
            .export(false)
            .unwrap();

        storage.delete_issue(&second.id, ACTOR).unwrap();
        let exporter = Exporter::new(&storage, temp_dir.path().to_path_buf());
        assert!(matches!(
            exporter.export(false),
            Err(SyncError::WouldLoseRecords { kind: EntityKind::Issue, count: 1, .. })
        ));

        let stats = exporter.export(true).unwrap();
        assert_eq!(stats.issues, 1);
    }

    #[test]
    fn test_default_export_dir() {
        let dir = default_export_dir(Path::new("/home/alex/.planup/data/planup.db"));
        assert_eq!(dir, PathBuf::from("/home/alex/.planup/data/sync"));
    }
}
