//! Sync status display.
//!
//! Compares record counts in the database with the JSONL files on disk.

use std::path::Path;

use colored::Colorize;

use crate::storage::sqlite::SqliteStorage;
use crate::sync::file::{count_lines, file_size};
use crate::sync::types::{EntityKind, EntityStatus, ExportFileInfo, SyncResult, SyncStatus};

/// Get the current sync status for a directory.
///
/// # Errors
///
/// Returns an error if database queries fail.
pub fn get_sync_status(storage: &SqliteStorage, export_dir: &Path) -> SyncResult<SyncStatus> {
    let mut entities = Vec::with_capacity(EntityKind::ALL.len());

    for kind in EntityKind::ALL {
        let path = export_dir.join(kind.file_name());
        let file = if path.exists() {
            Some(ExportFileInfo {
                name: kind.file_name().to_string(),
                size: file_size(&path),
                line_count: count_lines(&path)?,
            })
        } else {
            None
        };

        entities.push(EntityStatus {
            kind,
            in_database: storage.count_rows(kind.table())?,
            file,
        });
    }

    Ok(SyncStatus {
        directory: export_dir.display().to_string(),
        entities,
    })
}

/// Print sync status to stdout in a human-readable format.
pub fn print_status(status: &SyncStatus) {
    println!("{}", "Sync Status".bold().underline());
    println!("  Directory: {}", status.directory.dimmed());
    println!();

    println!("{}", "Records:".blue().bold());
    for entity in &status.entities {
        let label = format!("{}:", capitalize(&entity.kind.to_string()));
        match &entity.file {
            Some(file) => {
                let counts = format!(
                    "{} in database, {} in file ({})",
                    entity.in_database,
                    file.line_count,
                    format_size(file.size)
                );
                if file.line_count == entity.in_database {
                    println!("  {label:<10} {}", counts.green());
                } else {
                    println!("  {label:<10} {}", counts.yellow());
                }
            }
            None => {
                println!("  {label:<10} {} in database, {}", entity.in_database, "no file".dimmed());
            }
        }
    }

    println!();
    if !status.has_export_files() {
        println!("{}", "No export files found. Run 'pu sync export' to create them.".dimmed());
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars
        .next()
        .map(|first| first.to_uppercase().chain(chars).collect())
        .unwrap_or_default()
}

/// Format a byte size as a human-readable string.
#[allow(clippy::cast_precision_loss)]
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Issue;
    use crate::storage::sqlite::test_support::{storage_with_project, ACTOR};
    use crate::sync::export::Exporter;
    use tempfile::TempDir;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn test_status_without_files() {
        let (storage, _project) = storage_with_project();
        let temp_dir = TempDir::new().unwrap();

        let status = get_sync_status(&storage, temp_dir.path()).unwrap();
        assert!(!status.has_export_files());
        assert_eq!(status.entities[0].kind, EntityKind::Project);
        assert_eq!(status.entities[0].in_database, 1);
    }

    #[test]
    fn test_status_after_export() {
        let (mut storage, project) = storage_with_project();
        let mut issue = Issue::new(project.id.clone(), "Crash".into(), "To Do".into());
        storage.create_issue(&mut issue, ACTOR).unwrap();

        let temp_dir = TempDir::new().unwrap();
        Exporter::new(&storage, temp_dir.path().to_path_buf())
            .export(false)
            .unwrap();

        let status = get_sync_status(&storage, temp_dir.path()).unwrap();
        let issues = status
            .entities
            .iter()
            .find(|e| e.kind == EntityKind::Issue)
            .unwrap();
        assert_eq!(issues.in_database, 1);
        assert_eq!(issues.file.as_ref().unwrap().line_count, 1);
    }
}
