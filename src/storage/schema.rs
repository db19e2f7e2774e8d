//! Database schema definitions.
//!
//! This module contains the complete SQLite schema for PlanUp.

use rusqlite::{Connection, Result};

/// Current schema version for migration tracking.
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// The complete SQL schema for the PlanUp database.
///
/// Note: Timestamps are stored as INTEGER (Unix milliseconds). Calendar
/// dates (due dates, sprint bounds, work dates) are TEXT `YYYY-MM-DD`, so
/// they sort chronologically as strings.
pub const SCHEMA_SQL: &str = r"
-- ====================
-- Schema Version Tracking
-- ====================

CREATE TABLE IF NOT EXISTS schema_migrations (
    version TEXT PRIMARY KEY,
    applied_at INTEGER NOT NULL
);

-- ====================
-- Organizations
-- ====================

CREATE TABLE IF NOT EXISTS organizations (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    created_by TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS org_members (
    org_id TEXT NOT NULL,
    email TEXT NOT NULL,
    role TEXT NOT NULL DEFAULT 'member',
    joined_at INTEGER NOT NULL,
    PRIMARY KEY (org_id, email),
    FOREIGN KEY (org_id) REFERENCES organizations(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_org_members_email ON org_members(email);

CREATE TABLE IF NOT EXISTS invites (
    id TEXT PRIMARY KEY,
    org_id TEXT NOT NULL,
    email TEXT NOT NULL,
    invited_by TEXT NOT NULL,
    role TEXT NOT NULL DEFAULT 'member',
    status TEXT NOT NULL DEFAULT 'pending',
    invited_at INTEGER NOT NULL,
    responded_at INTEGER,
    FOREIGN KEY (org_id) REFERENCES organizations(id) ON DELETE CASCADE,
    CHECK (status IN ('pending', 'accepted', 'declined', 'cancelled'))
);

CREATE INDEX IF NOT EXISTS idx_invites_email ON invites(email);
CREATE UNIQUE INDEX IF NOT EXISTS idx_invites_one_pending
    ON invites(org_id, email) WHERE status = 'pending';

-- ====================
-- Projects & Workflows
-- ====================

-- Custom workflows (built-ins live in code)
CREATE TABLE IF NOT EXISTS workflows (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    description TEXT,
    color TEXT NOT NULL DEFAULT '#9E9E9E',
    statuses TEXT NOT NULL,
    transitions TEXT NOT NULL DEFAULT '[]',
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS projects (
    id TEXT PRIMARY KEY,
    key TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    description TEXT,
    lead TEXT,
    workflow_id TEXT NOT NULL DEFAULT 'agile',
    organization_id TEXT,
    next_issue_number INTEGER NOT NULL DEFAULT 1,
    next_epic_number INTEGER NOT NULL DEFAULT 1,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    FOREIGN KEY (organization_id) REFERENCES organizations(id) ON DELETE SET NULL
);

-- ====================
-- Planning
-- ====================

CREATE TABLE IF NOT EXISTS sprints (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL,
    name TEXT NOT NULL,
    start_date TEXT NOT NULL,
    end_date TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'planned',
    goal TEXT,
    velocity INTEGER,
    capacity INTEGER,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    started_at INTEGER,
    completed_at INTEGER,
    FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE,
    CHECK (status IN ('planned', 'active', 'completed')),
    CHECK (end_date >= start_date),
    CHECK (capacity IS NULL OR capacity >= 0)
);

CREATE INDEX IF NOT EXISTS idx_sprints_project ON sprints(project_id, status);

CREATE TABLE IF NOT EXISTS sprint_members (
    sprint_id TEXT NOT NULL,
    member TEXT NOT NULL,
    PRIMARY KEY (sprint_id, member),
    FOREIGN KEY (sprint_id) REFERENCES sprints(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS epics (
    id TEXT PRIMARY KEY,
    key TEXT NOT NULL,
    project_id TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT,
    status TEXT NOT NULL DEFAULT 'To Do',
    assignee TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE,
    UNIQUE (project_id, key)
);

-- ====================
-- Issues
-- ====================

CREATE TABLE IF NOT EXISTS issues (
    id TEXT PRIMARY KEY,
    key TEXT NOT NULL,
    project_id TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT,
    status TEXT NOT NULL,
    priority TEXT NOT NULL DEFAULT 'Medium',
    issue_type TEXT NOT NULL DEFAULT 'Task',
    assignee TEXT,
    reporter TEXT,
    due_date TEXT,
    estimated_hours REAL,
    logged_hours REAL NOT NULL DEFAULT 0,
    story_points INTEGER,
    epic_id TEXT,
    sprint_id TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE,
    FOREIGN KEY (epic_id) REFERENCES epics(id) ON DELETE SET NULL,
    FOREIGN KEY (sprint_id) REFERENCES sprints(id) ON DELETE SET NULL,
    UNIQUE (project_id, key),
    CHECK (priority IN ('High', 'Medium', 'Low')),
    CHECK (issue_type IN ('Bug', 'Story', 'Task')),
    CHECK (estimated_hours IS NULL OR estimated_hours >= 0),
    CHECK (logged_hours >= 0),
    CHECK (story_points IS NULL OR story_points >= 0)
);

CREATE INDEX IF NOT EXISTS idx_issues_project ON issues(project_id);
CREATE INDEX IF NOT EXISTS idx_issues_key ON issues(key);
CREATE INDEX IF NOT EXISTS idx_issues_status ON issues(status);
CREATE INDEX IF NOT EXISTS idx_issues_assignee ON issues(assignee);
CREATE INDEX IF NOT EXISTS idx_issues_sprint ON issues(sprint_id);
CREATE INDEX IF NOT EXISTS idx_issues_epic ON issues(epic_id);

CREATE TABLE IF NOT EXISTS issue_labels (
    issue_id TEXT NOT NULL,
    label TEXT NOT NULL,
    PRIMARY KEY (issue_id, label),
    FOREIGN KEY (issue_id) REFERENCES issues(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_issue_labels_label ON issue_labels(label);

CREATE TABLE IF NOT EXISTS issue_components (
    issue_id TEXT NOT NULL,
    component TEXT NOT NULL,
    PRIMARY KEY (issue_id, component),
    FOREIGN KEY (issue_id) REFERENCES issues(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS comments (
    id TEXT PRIMARY KEY,
    issue_id TEXT NOT NULL,
    author TEXT NOT NULL,
    content TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    edited INTEGER NOT NULL DEFAULT 0,
    edited_at INTEGER,
    edited_by TEXT,
    FOREIGN KEY (issue_id) REFERENCES issues(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_comments_issue ON comments(issue_id, created_at);

CREATE TABLE IF NOT EXISTS time_logs (
    id TEXT PRIMARY KEY,
    issue_id TEXT NOT NULL,
    author TEXT NOT NULL,
    hours REAL NOT NULL,
    description TEXT,
    category TEXT NOT NULL DEFAULT 'development',
    work_date TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    FOREIGN KEY (issue_id) REFERENCES issues(id) ON DELETE CASCADE,
    CHECK (hours > 0)
);

CREATE INDEX IF NOT EXISTS idx_time_logs_issue ON time_logs(issue_id);

CREATE TABLE IF NOT EXISTS attachments (
    id TEXT PRIMARY KEY,
    issue_id TEXT NOT NULL,
    name TEXT NOT NULL,
    size TEXT,
    size_bytes INTEGER,
    file_type TEXT,
    location TEXT NOT NULL,
    checksum TEXT,
    description TEXT,
    uploaded_by TEXT NOT NULL,
    uploaded_at INTEGER NOT NULL,
    FOREIGN KEY (issue_id) REFERENCES issues(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_attachments_issue ON attachments(issue_id);

CREATE TABLE IF NOT EXISTS decisions (
    id TEXT PRIMARY KEY,
    issue_id TEXT NOT NULL,
    entry TEXT NOT NULL,
    author TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    FOREIGN KEY (issue_id) REFERENCES issues(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS issue_links (
    id TEXT PRIMARY KEY,
    source_issue_id TEXT NOT NULL,
    target_issue_id TEXT NOT NULL,
    link_type TEXT NOT NULL,
    created_by TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    FOREIGN KEY (source_issue_id) REFERENCES issues(id) ON DELETE CASCADE,
    FOREIGN KEY (target_issue_id) REFERENCES issues(id) ON DELETE CASCADE,
    UNIQUE (source_issue_id, target_issue_id, link_type),
    CHECK (source_issue_id != target_issue_id)
);

CREATE INDEX IF NOT EXISTS idx_issue_links_target ON issue_links(target_issue_id);

CREATE TABLE IF NOT EXISTS subtasks (
    id TEXT PRIMARY KEY,
    parent_issue_id TEXT NOT NULL,
    title TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'To Do',
    completed INTEGER NOT NULL DEFAULT 0,
    assignee TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    FOREIGN KEY (parent_issue_id) REFERENCES issues(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_subtasks_parent ON subtasks(parent_issue_id);

-- ====================
-- Ideas
-- ====================

CREATE TABLE IF NOT EXISTS ideas (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT,
    category TEXT NOT NULL DEFAULT 'feature',
    impact TEXT NOT NULL DEFAULT 'medium',
    status TEXT NOT NULL DEFAULT 'submitted',
    upvotes INTEGER NOT NULL DEFAULT 0,
    author TEXT NOT NULL,
    organization_id TEXT,
    promoted_issue_id TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    FOREIGN KEY (organization_id) REFERENCES organizations(id) ON DELETE SET NULL,
    FOREIGN KEY (promoted_issue_id) REFERENCES issues(id) ON DELETE SET NULL,
    CHECK (upvotes >= 0)
);

CREATE INDEX IF NOT EXISTS idx_ideas_status ON ideas(status);

CREATE TABLE IF NOT EXISTS idea_tags (
    idea_id TEXT NOT NULL,
    tag TEXT NOT NULL,
    PRIMARY KEY (idea_id, tag),
    FOREIGN KEY (idea_id) REFERENCES ideas(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS idea_endorsements (
    idea_id TEXT NOT NULL,
    email TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    PRIMARY KEY (idea_id, email),
    FOREIGN KEY (idea_id) REFERENCES ideas(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS idea_comments (
    id TEXT PRIMARY KEY,
    idea_id TEXT NOT NULL,
    author TEXT NOT NULL,
    content TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    edited_at INTEGER,
    FOREIGN KEY (idea_id) REFERENCES ideas(id) ON DELETE CASCADE
);

-- ====================
-- Retrospectives, Templates, Filters, Settings
-- ====================

CREATE TABLE IF NOT EXISTS retro_feedback (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL,
    sprint_id TEXT,
    feedback_type TEXT NOT NULL,
    text TEXT NOT NULL,
    author TEXT NOT NULL,
    resolved INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE,
    FOREIGN KEY (sprint_id) REFERENCES sprints(id) ON DELETE SET NULL,
    CHECK (feedback_type IN ('went-well', 'to-improve', 'action-item'))
);

CREATE INDEX IF NOT EXISTS idx_retro_project ON retro_feedback(project_id, sprint_id);

CREATE TABLE IF NOT EXISTS templates (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    description TEXT,
    issue_type TEXT,
    priority TEXT,
    title_prefix TEXT,
    body TEXT,
    labels TEXT NOT NULL DEFAULT '[]',
    created_by TEXT NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS saved_filters (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    query TEXT NOT NULL,
    project_id TEXT,
    created_by TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at INTEGER NOT NULL
);

-- ====================
-- Audit Events
-- ====================

CREATE TABLE IF NOT EXISTS events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    entity_type TEXT NOT NULL,
    entity_id TEXT NOT NULL,
    event_type TEXT NOT NULL,
    actor TEXT NOT NULL,
    old_value TEXT,
    new_value TEXT,
    comment TEXT,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_type, entity_id);
CREATE INDEX IF NOT EXISTS idx_events_type ON events(event_type);
CREATE INDEX IF NOT EXISTS idx_events_created ON events(created_at DESC);
CREATE INDEX IF NOT EXISTS idx_events_actor ON events(actor);

-- ====================
-- Views
-- ====================

-- Open work per project, for reports
CREATE VIEW IF NOT EXISTS issue_counts AS
SELECT
    p.id AS project_id,
    p.key AS project_key,
    i.status,
    COUNT(i.id) AS issue_count,
    COALESCE(SUM(i.story_points), 0) AS story_points
FROM projects p
LEFT JOIN issues i ON i.project_id = p.id
GROUP BY p.id, i.status;
";

/// Apply the schema to the database.
///
/// This uses `execute_batch` to run the entire DDL script.
/// It is idempotent because all statements use `IF NOT EXISTS`.
///
/// # Errors
///
/// Returns an error if the SQL execution fails or pragmas cannot be set.
pub fn apply_schema(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "temp_store", "MEMORY")?;

    conn.execute_batch(SCHEMA_SQL)?;

    super::migrations::run_migrations(conn)?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
        rusqlite::params![
            format!("v{CURRENT_SCHEMA_VERSION}"),
            chrono::Utc::now().timestamp_millis()
        ],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).expect("Failed to apply schema");
        conn.execute(
            "INSERT INTO projects (id, key, name, created_at, updated_at)
             VALUES ('proj_1', 'MOB', 'Mobile', 0, 0)",
            [],
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_apply_schema() {
        let conn = setup();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        for table in [
            "projects",
            "issues",
            "sprints",
            "epics",
            "organizations",
            "invites",
            "ideas",
            "retro_feedback",
            "workflows",
            "saved_filters",
            "templates",
            "settings",
            "events",
        ] {
            assert!(tables.contains(&table.to_string()), "missing {table}");
        }
    }

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).expect("First apply failed");
        apply_schema(&conn).expect("Second apply failed");
    }

    #[test]
    fn test_foreign_keys_enabled() {
        let conn = setup();
        let fk_enabled: i32 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk_enabled, 1);
    }

    #[test]
    fn test_priority_constraint() {
        let conn = setup();

        let ok = conn.execute(
            "INSERT INTO issues (id, key, project_id, title, status, priority, created_at, updated_at)
             VALUES ('i1', 'MOB-1', 'proj_1', 'Test', 'To Do', 'High', 0, 0)",
            [],
        );
        assert!(ok.is_ok());

        let bad = conn.execute(
            "INSERT INTO issues (id, key, project_id, title, status, priority, created_at, updated_at)
             VALUES ('i2', 'MOB-2', 'proj_1', 'Test', 'To Do', 'Urgent', 0, 0)",
            [],
        );
        assert!(bad.is_err());
    }

    #[test]
    fn test_time_log_hours_must_be_positive() {
        let conn = setup();
        conn.execute(
            "INSERT INTO issues (id, key, project_id, title, status, created_at, updated_at)
             VALUES ('i1', 'MOB-1', 'proj_1', 'Test', 'To Do', 0, 0)",
            [],
        )
        .unwrap();

        let bad = conn.execute(
            "INSERT INTO time_logs (id, issue_id, author, hours, work_date, created_at)
             VALUES ('t1', 'i1', 'alex', 0, '2025-01-01', 0)",
            [],
        );
        assert!(bad.is_err());
    }

    #[test]
    fn test_one_active_sprint_per_project() {
        let conn = setup();
        let insert = |id: &str| {
            conn.execute(
                "INSERT INTO sprints (id, project_id, name, start_date, end_date, status, created_at, updated_at)
                 VALUES (?1, 'proj_1', ?1, '2025-01-01', '2025-01-14', 'active', 0, 0)",
                [id],
            )
        };
        assert!(insert("s1").is_ok());
        assert!(insert("s2").is_err());
    }

    #[test]
    fn test_sprint_dates_ordered() {
        let conn = setup();
        let bad = conn.execute(
            "INSERT INTO sprints (id, project_id, name, start_date, end_date, created_at, updated_at)
             VALUES ('s1', 'proj_1', 'Backwards', '2025-02-01', '2025-01-01', 0, 0)",
            [],
        );
        assert!(bad.is_err());
    }
}
