//! JSONL sync.
//!
//! Git-friendly export and import of the database:
//!
//! - **Export**: snapshot of every project, epic, sprint, issue and idea
//!   into one JSONL file per kind
//! - **Import**: JSONL files into SQLite with a merge strategy
//! - **Hashing**: SHA256 content hashes for change detection
//! - **Status**: record counts in the database and on disk
//!
//! # File Format
//!
//! One record per line, tagged with its `kind`:
//! ```json
//! {"kind":"sprint","id":"sprint_1a2b3c4d5e6f","name":"Sprint 1",...,"content_hash":"abc","exported_at":"2025-01-20T10:00:00Z"}
//! ```

mod export;
mod file;
mod hash;
mod import;
mod status;
mod types;

pub use export::{default_export_dir, Exporter};
pub use file::{atomic_write, count_lines, read_jsonl, write_jsonl};
pub use hash::content_hash;
pub use import::Importer;
pub use status::{get_sync_status, print_status};
pub use types::{
    EntityKind, EntityStats, EntityStatus, ExportFileInfo, ExportStats, ImportStats,
    MergeStrategy, SyncError, SyncRecord, SyncResult, SyncStatus, Synced,
};
