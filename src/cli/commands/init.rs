//! Initialize the PlanUp database.
//!
//! PlanUp keeps one database per machine at `~/.planup/data/planup.db`
//! (or `~/.planup/test/planup.db` in test mode). `--db` / `PU_DB` points
//! somewhere else. The schema is applied when the file is first opened.

use crate::config::{global_planup_dir, resolve_db_path};
use crate::error::{Error, Result};
use crate::storage::SqliteStorage;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Serialize)]
struct InitOutput {
    database: PathBuf,
    reinitialized: bool,
}

/// Execute the init command.
///
/// # Errors
///
/// Returns `AlreadyInitialized` when the database exists and `force` is
/// false, or an error if the directory or database cannot be created.
pub fn execute(db_path: Option<&PathBuf>, force: bool, json: bool) -> Result<()> {
    let db_path = resolve_db_path(db_path.map(PathBuf::as_path)).ok_or_else(|| {
        Error::Config("Could not determine the PlanUp data directory".to_string())
    })?;

    let existed = db_path.exists();
    if existed && !force {
        return Err(Error::AlreadyInitialized { path: db_path });
    }

    if crate::is_dry_run() {
        if json {
            let output = serde_json::json!({
                "dry_run": true,
                "action": "init",
                "database": db_path,
            });
            println!("{output}");
        } else {
            println!("Would initialize database at {}", db_path.display());
        }
        return Ok(());
    }

    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)?;
    }

    if existed {
        remove_database(&db_path)?;
    }

    // Opening applies the schema and migrations.
    drop(SqliteStorage::open(&db_path)?);
    info!(path = %db_path.display(), "Initialized database");

    // Everything in the global directory is local-only.
    if let Some(base_dir) = global_planup_dir() {
        if db_path.starts_with(&base_dir) {
            let gitignore_path = base_dir.join(".gitignore");
            if !gitignore_path.exists() {
                fs::write(&gitignore_path, "# Everything in global PlanUp is local-only\n*\n")?;
            }
        }
    }

    if crate::is_silent() {
        println!("{}", db_path.display());
    } else if json {
        let output = InitOutput {
            database: db_path,
            reinitialized: existed,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        if existed {
            println!("Reinitialized PlanUp database");
        } else {
            println!("Initialized PlanUp database");
        }
        println!("  Database: {}", db_path.display());
        println!();
        println!("Next: pu project create \"My Project\" --key MYP");
    }

    Ok(())
}

/// Delete a database file along with its WAL side files.
fn remove_database(db_path: &Path) -> Result<()> {
    fs::remove_file(db_path)?;
    for suffix in ["-wal", "-shm"] {
        let mut side = db_path.as_os_str().to_owned();
        side.push(suffix);
        let side = PathBuf::from(side);
        if side.exists() {
            fs::remove_file(side)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_creates_database() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("nested").join("planup.db");

        execute(Some(&db_path), false, true).unwrap();
        assert!(db_path.exists());

        let storage = SqliteStorage::open(&db_path).unwrap();
        assert!(storage.list_projects().unwrap().is_empty());
    }

    #[test]
    fn test_init_refuses_existing_without_force() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("planup.db");

        execute(Some(&db_path), false, true).unwrap();
        assert!(matches!(
            execute(Some(&db_path), false, true),
            Err(Error::AlreadyInitialized { .. })
        ));
        execute(Some(&db_path), true, true).unwrap();
    }
}
