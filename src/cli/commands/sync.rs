//! Sync command implementations (JSONL export/import).
//!
//! JSONL files default to `sync/` next to the database so the directory
//! can be committed to git or copied between machines.

use super::{existing_db_path, resolve_actor, Globals};
use crate::cli::SyncCommands;
use crate::error::{Error, Result};
use crate::storage::SqliteStorage;
use crate::sync::{default_export_dir, EntityStats, Exporter, Importer, MergeStrategy, SyncError};
use std::path::{Path, PathBuf};
use tracing::info;

/// Execute sync commands.
///
/// # Errors
///
/// Returns an error if the database is missing or a sync step fails.
pub fn execute(command: &SyncCommands, globals: Globals<'_>) -> Result<()> {
    let db_path = existing_db_path(globals.db)?;
    let dir_or_default = |dir: Option<&PathBuf>| dir.cloned().unwrap_or_else(|| default_export_dir(&db_path));

    match command {
        SyncCommands::Export { output, force } => {
            export(&db_path, &dir_or_default(output.as_ref()), *force, globals.json)
        }
        SyncCommands::Import { input, strategy } => {
            let actor = resolve_actor(globals.actor);
            import(&db_path, &dir_or_default(input.as_ref()), *strategy, &actor, globals.json)
        }
        SyncCommands::Status { dir } => status(&db_path, &dir_or_default(dir.as_ref()), globals.json),
    }
}

fn sync_error(e: SyncError) -> Error {
    Error::Sync(e.to_string())
}

fn export(db_path: &Path, dir: &Path, force: bool, json: bool) -> Result<()> {
    if crate::is_dry_run() {
        if json {
            let output = serde_json::json!({
                "dry_run": true,
                "action": "sync_export",
                "output_dir": dir.display().to_string(),
            });
            println!("{output}");
        } else {
            println!("Would export to {}", dir.display());
        }
        return Ok(());
    }

    let storage = SqliteStorage::open(db_path)?;
    let exporter = Exporter::new(&storage, dir.to_path_buf());

    match exporter.export(force) {
        Ok(stats) => {
            info!(dir = %dir.display(), records = stats.total(), "Exported");
            if json {
                let output = serde_json::json!({
                    "success": true,
                    "output_dir": dir.display().to_string(),
                    "stats": stats,
                });
                println!("{}", serde_json::to_string(&output)?);
            } else if !crate::is_silent() {
                println!("Export complete");
                println!();
                for (label, count) in [
                    ("Projects", stats.projects),
                    ("Epics", stats.epics),
                    ("Sprints", stats.sprints),
                    ("Issues", stats.issues),
                    ("Ideas", stats.ideas),
                ] {
                    if count > 0 {
                        println!("  {label:<9} {count}");
                    }
                }
                println!();
                println!("  Total: {} records", stats.total());
                println!("  Location: {}", dir.display());
            }
            Ok(())
        }
        Err(SyncError::NothingToExport) => {
            if json {
                let output = serde_json::json!({
                    "error": "nothing_to_export",
                    "message": "The database has no projects or ideas to export.",
                });
                println!("{output}");
            } else {
                println!("Nothing to export: the database has no projects or ideas.");
            }
            Ok(())
        }
        Err(e) => Err(sync_error(e)),
    }
}

fn import(db_path: &Path, dir: &Path, strategy: MergeStrategy, actor: &str, json: bool) -> Result<()> {
    if crate::is_dry_run() {
        if json {
            let output = serde_json::json!({
                "dry_run": true,
                "action": "sync_import",
                "input_dir": dir.display().to_string(),
            });
            println!("{output}");
        } else {
            println!("Would import from {}", dir.display());
        }
        return Ok(());
    }

    let mut storage = SqliteStorage::open(db_path)?;
    let mut importer = Importer::new(&mut storage, strategy, actor);

    match importer.import_all(dir) {
        Ok(stats) => {
            let total = stats.total_processed();
            if json {
                let output = serde_json::json!({
                    "success": true,
                    "input_dir": dir.display().to_string(),
                    "stats": stats,
                });
                println!("{}", serde_json::to_string(&output)?);
            } else if crate::is_silent() {
                println!("{total}");
            } else if total == 0 {
                println!("No records to import in {}", dir.display());
            } else {
                println!("Import complete");
                println!();
                print_entity_stats("Projects", &stats.projects);
                print_entity_stats("Epics", &stats.epics);
                print_entity_stats("Sprints", &stats.sprints);
                print_entity_stats("Issues", &stats.issues);
                print_entity_stats("Ideas", &stats.ideas);
                println!();
                println!(
                    "Total: {} created, {} updated, {} skipped",
                    stats.total_created(),
                    stats.total_updated(),
                    total - stats.total_created() - stats.total_updated()
                );
            }
            Ok(())
        }
        Err(SyncError::FileNotFound(path)) => {
            if json {
                let output = serde_json::json!({
                    "error": "file_not_found",
                    "path": path,
                });
                println!("{output}");
            } else {
                println!("Import file not found: {path}");
                println!("Run 'pu sync export' first to create JSONL files.");
            }
            Ok(())
        }
        Err(e) => Err(sync_error(e)),
    }
}

fn print_entity_stats(name: &str, stats: &EntityStats) {
    if stats.total() > 0 {
        println!(
            "  {name:<9} {} created, {} updated, {} skipped",
            stats.created, stats.updated, stats.skipped
        );
    }
}

fn status(db_path: &Path, dir: &Path, json: bool) -> Result<()> {
    let storage = SqliteStorage::open(db_path)?;
    let sync_status = crate::sync::get_sync_status(&storage, dir).map_err(sync_error)?;

    if json {
        println!("{}", serde_json::to_string(&sync_status)?);
    } else {
        crate::sync::print_status(&sync_status);
    }
    Ok(())
}
