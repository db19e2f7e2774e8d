//! Atomic file operations for sync.
//!
//! Writes go to a temp file which is synced to disk and then renamed over
//! the target, so a crash never leaves a half-written JSONL file behind.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::sync::types::{SyncError, SyncRecord, SyncResult};

/// Write content to a file atomically.
///
/// If any step fails, the original file (if any) remains untouched.
///
/// # Errors
///
/// Returns an error if any file operation fails.
pub fn atomic_write(path: &Path, content: &str) -> SyncResult<()> {
    let temp_path = path.with_extension("jsonl.tmp");

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    {
        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(content.as_bytes())?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
    }

    fs::rename(&temp_path, path)?;

    Ok(())
}

/// Write sync records to a JSONL file atomically, one record per line.
///
/// # Errors
///
/// Returns an error if a record cannot be serialized or the file cannot be
/// written.
pub fn write_jsonl(path: &Path, records: &[SyncRecord]) -> SyncResult<()> {
    let mut content = String::new();
    for record in records {
        content.push_str(&serde_json::to_string(record)?);
        content.push('\n');
    }
    atomic_write(path, &content)
}

/// Read all sync records from a JSONL file.
///
/// Blank lines are skipped. A line that does not parse fails the whole read
/// with its 1-based line number.
///
/// # Errors
///
/// Returns `FileNotFound` for a missing file and `InvalidRecord` for a bad
/// line.
pub fn read_jsonl(path: &Path) -> SyncResult<Vec<SyncRecord>> {
    if !path.exists() {
        return Err(SyncError::FileNotFound(path.display().to_string()));
    }

    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let record: SyncRecord =
            serde_json::from_str(&line).map_err(|e| SyncError::InvalidRecord {
                line: line_num + 1,
                message: e.to_string(),
            })?;
        records.push(record);
    }

    Ok(records)
}

/// Count the non-empty lines in a JSONL file (0 if it does not exist).
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn count_lines(path: &Path) -> SyncResult<usize> {
    if !path.exists() {
        return Ok(0);
    }

    let reader = BufReader::new(File::open(path)?);
    let mut count = 0;
    for line in reader.lines() {
        if !line?.trim().is_empty() {
            count += 1;
        }
    }
    Ok(count)
}

/// Size of a file in bytes, 0 if it doesn't exist.
pub fn file_size(path: &Path) -> u64 {
    fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

/// Contents of the `.gitignore` written into the sync directory.
///
/// Everything is ignored except the JSONL files and the ignore file itself,
/// so the database never ends up in a commit.
#[must_use]
pub fn gitignore_content() -> &'static str {
    r"# PlanUp sync directory
# Only the JSONL exports are tracked

*
!.gitignore
!*.jsonl
"
}

/// Create `.gitignore` in the export directory unless one already exists.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn ensure_gitignore(export_dir: &Path) -> SyncResult<()> {
    let gitignore_path = export_dir.join(".gitignore");
    if gitignore_path.exists() {
        return Ok(());
    }

    fs::create_dir_all(export_dir)?;
    let mut file = File::create(&gitignore_path)?;
    file.write_all(gitignore_content().as_bytes())?;
    file.sync_all()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Project;
    use crate::sync::types::Synced;
    use tempfile::TempDir;

    fn project_record(key: &str) -> SyncRecord {
        SyncRecord::Project(Synced {
            data: Project::new(format!("Project {key}"), Some(key)),
            content_hash: "abc123".to_string(),
            exported_at: "2025-01-20T00:00:00Z".to_string(),
        })
    }

    #[test]
    fn test_atomic_write() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("test.jsonl");

        atomic_write(&path, "line 1\nline 2\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "line 1\nline 2\n");
        assert!(!path.with_extension("jsonl.tmp").exists());
    }

    #[test]
    fn test_write_then_read_jsonl() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("projects.jsonl");

        write_jsonl(&path, &[project_record("MOB"), project_record("WEB")]).unwrap();

        let records = read_jsonl(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(count_lines(&path).unwrap(), 2);
    }

    #[test]
    fn test_invalid_line_reports_line_number() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("projects.jsonl");
        fs::write(&path, "\n{\"kind\":\"nope\"}\n").unwrap();

        match read_jsonl(&path) {
            Err(SyncError::InvalidRecord { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected InvalidRecord, got {other:?}"),
        }
    }

    #[test]
    fn test_count_lines() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("test.jsonl");

        assert_eq!(count_lines(&path).unwrap(), 0);

        fs::write(&path, "line1\nline2\n\nline3\n").unwrap();
        assert_eq!(count_lines(&path).unwrap(), 3);
    }

    #[test]
    fn test_file_not_found() {
        let result = read_jsonl(Path::new("/nonexistent/file.jsonl"));
        assert!(matches!(result, Err(SyncError::FileNotFound(_))));
    }

    #[test]
    fn test_ensure_gitignore_does_not_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        let gitignore_path = temp_dir.path().join(".gitignore");

        ensure_gitignore(temp_dir.path()).unwrap();
        assert!(fs::read_to_string(&gitignore_path).unwrap().contains("!*.jsonl"));

        fs::write(&gitignore_path, "# Custom content\n").unwrap();
        ensure_gitignore(temp_dir.path()).unwrap();
        assert!(fs::read_to_string(&gitignore_path).unwrap().contains("Custom content"));
    }
}
