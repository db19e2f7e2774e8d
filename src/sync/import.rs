//! JSONL import.
//!
//! Records are merged into the local database one by one. An unchanged
//! record (same content hash as the local copy) is skipped; otherwise the
//! merge strategy decides whether the external version wins.

use std::path::Path;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::Result;
use crate::storage::sqlite::SqliteStorage;
use crate::sync::file::read_jsonl;
use crate::sync::hash::{content_hash, has_changed};
use crate::sync::types::{
    EntityKind, EntityStats, ImportStats, MergeStrategy, SyncRecord, SyncResult, Synced,
};

type Upsert<T> = fn(&mut SqliteStorage, &T, &str) -> Result<()>;

/// Importer for JSONL sync files.
pub struct Importer<'a> {
    storage: &'a mut SqliteStorage,
    strategy: MergeStrategy,
    actor: String,
}

impl<'a> Importer<'a> {
    #[must_use]
    pub fn new(storage: &'a mut SqliteStorage, strategy: MergeStrategy, actor: &str) -> Self {
        Self {
            storage,
            strategy,
            actor: actor.to_string(),
        }
    }

    /// Import records from a single JSONL file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, a record is invalid or
    /// an upsert fails.
    pub fn import(&mut self, path: &Path) -> SyncResult<ImportStats> {
        let mut stats = ImportStats::default();

        for record in read_jsonl(path)? {
            match record {
                SyncRecord::Project(rec) => {
                    let local = self.storage.get_project(&rec.data.id)?;
                    self.merge(rec, local, |p| p.updated_at, SqliteStorage::upsert_project, &mut stats.projects)?;
                }
                SyncRecord::Epic(rec) => {
                    let local = self.storage.get_epic(&rec.data.id)?;
                    self.merge(rec, local, |e| e.updated_at, SqliteStorage::upsert_epic, &mut stats.epics)?;
                }
                SyncRecord::Sprint(rec) => {
                    let local = self.storage.get_sprint(&rec.data.id, None)?;
                    self.merge(rec, local, |s| s.updated_at, SqliteStorage::upsert_sprint, &mut stats.sprints)?;
                }
                SyncRecord::Issue(rec) => {
                    let local = self.storage.get_issue(&rec.data.id)?;
                    self.merge(rec, local, |i| i.updated_at, SqliteStorage::upsert_issue, &mut stats.issues)?;
                }
                SyncRecord::Idea(rec) => {
                    let local = self.storage.get_idea(&rec.data.id)?;
                    self.merge(rec, local, |i| i.updated_at, SqliteStorage::upsert_idea, &mut stats.ideas)?;
                }
            }
        }

        Ok(stats)
    }

    /// Import every JSONL file in a directory.
    ///
    /// Files are read parents first (projects, epics, sprints, issues,
    /// ideas) so references resolve. Missing files are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if any file cannot be imported.
    pub fn import_all(&mut self, dir: &Path) -> SyncResult<ImportStats> {
        let mut total = ImportStats::default();

        for kind in EntityKind::ALL {
            let path = dir.join(kind.file_name());
            if !path.exists() {
                debug!(path = %path.display(), "No sync file");
                continue;
            }
            let stats = self.import(&path)?;
            merge_stats(&mut total, &stats);
        }

        info!(
            processed = total.total_processed(),
            created = total.total_created(),
            updated = total.total_updated(),
            "Import finished"
        );
        Ok(total)
    }

    fn merge<T: Serialize>(
        &mut self,
        rec: Synced<T>,
        local: Option<T>,
        updated_at: fn(&T) -> i64,
        upsert: Upsert<T>,
        stats: &mut EntityStats,
    ) -> SyncResult<()> {
        let Some(local) = local else {
            upsert(&mut *self.storage, &rec.data, &self.actor)?;
            stats.created += 1;
            return Ok(());
        };

        if !has_changed(&content_hash(&local)?, Some(&rec.content_hash)) {
            stats.skipped += 1;
            return Ok(());
        }

        let take_external = match self.strategy {
            MergeStrategy::PreferNewer => updated_at(&rec.data) > updated_at(&local),
            MergeStrategy::KeepLocal => false,
            MergeStrategy::PreferExternal => true,
        };

        if take_external {
            upsert(&mut *self.storage, &rec.data, &self.actor)?;
            stats.updated += 1;
        } else {
            stats.skipped += 1;
        }
        Ok(())
    }
}

fn merge_stats(total: &mut ImportStats, add: &ImportStats) {
    for (into, from) in [
        (&mut total.projects, &add.projects),
        (&mut total.epics, &add.epics),
        (&mut total.sprints, &add.sprints),
        (&mut total.issues, &add.issues),
        (&mut total.ideas, &add.ideas),
    ] {
        into.created += from.created;
        into.updated += from.updated;
        into.skipped += from.skipped;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Idea, Issue, Project};
    use crate::storage::sqlite::test_support::{storage_with_project, ACTOR};
    use crate::storage::IssueUpdate;
    use crate::sync::export::Exporter;
    use crate::sync::file::write_jsonl;
    use tempfile::TempDir;

    fn exported() -> (SqliteStorage, Project, Issue, TempDir) {
        let (mut storage, project) = storage_with_project();
        let mut issue = Issue::new(project.id.clone(), "Login crash".into(), "To Do".into());
        issue.labels = vec!["auth".into()];
        storage.create_issue(&mut issue, ACTOR).unwrap();
        storage
            .create_idea(&Idea::new("Dark mode".into(), ACTOR.into()), ACTOR)
            .unwrap();

        let dir = TempDir::new().unwrap();
        Exporter::new(&storage, dir.path().to_path_buf())
            .export(false)
            .unwrap();
        (storage, project, issue, dir)
    }

    #[test]
    fn test_import_into_empty_database() {
        let (_source, _project, issue, dir) = exported();

        let mut target = SqliteStorage::open_memory().unwrap();
        let stats = Importer::new(&mut target, MergeStrategy::default(), ACTOR)
            .import_all(dir.path())
            .unwrap();

        assert_eq!(stats.projects.created, 1);
        assert_eq!(stats.issues.created, 1);
        assert_eq!(stats.ideas.created, 1);

        let imported = target.require_issue("MOB-1").unwrap();
        assert_eq!(imported.id, issue.id);
        assert_eq!(imported.labels, vec!["auth".to_string()]);
    }

    #[test]
    fn test_reimport_is_skipped() {
        let (mut source, _project, _issue, dir) = exported();

        let stats = Importer::new(&mut source, MergeStrategy::PreferExternal, ACTOR)
            .import_all(dir.path())
            .unwrap();

        assert_eq!(stats.total_created(), 0);
        assert_eq!(stats.total_updated(), 0);
        assert_eq!(stats.issues.skipped, 1);
    }

    fn external_edit(dir: &TempDir, issue: &Issue, title: &str, updated_at: i64) {
        let mut data = issue.clone();
        data.title = title.to_string();
        data.updated_at = updated_at;
        let record = SyncRecord::Issue(Synced {
            content_hash: content_hash(&data).unwrap(),
            data,
            exported_at: "2025-01-20T00:00:00Z".into(),
        });
        write_jsonl(&dir.path().join("issues.jsonl"), &[record]).unwrap();
    }

    #[test]
    fn test_prefer_newer() {
        let (mut storage, _project, issue, dir) = exported();
        let local = storage.require_issue(&issue.id).unwrap();

        external_edit(&dir, &local, "Older title", local.updated_at - 1);
        let stats = Importer::new(&mut storage, MergeStrategy::PreferNewer, ACTOR)
            .import(&dir.path().join("issues.jsonl"))
            .unwrap();
        assert_eq!(stats.issues.skipped, 1);
        assert_eq!(storage.require_issue(&issue.id).unwrap().title, "Login crash");

        external_edit(&dir, &local, "Newer title", local.updated_at + 1);
        let stats = Importer::new(&mut storage, MergeStrategy::PreferNewer, ACTOR)
            .import(&dir.path().join("issues.jsonl"))
            .unwrap();
        assert_eq!(stats.issues.updated, 1);
        assert_eq!(storage.require_issue(&issue.id).unwrap().title, "Newer title");
    }

    #[test]
    fn test_keep_local() {
        let (mut storage, _project, issue, dir) = exported();
        let update = IssueUpdate {
            title: Some("Local title".into()),
            ..IssueUpdate::default()
        };
        let local = storage.update_issue(&issue.id, &update, ACTOR).unwrap();

        external_edit(&dir, &local, "External title", local.updated_at + 10_000);
        let stats = Importer::new(&mut storage, MergeStrategy::KeepLocal, ACTOR)
            .import_all(dir.path())
            .unwrap();

        assert_eq!(stats.issues.skipped, 1);
        assert_eq!(storage.require_issue(&issue.id).unwrap().title, "Local title");
    }
}
