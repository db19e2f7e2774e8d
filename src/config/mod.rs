//! Configuration management.
//!
//! This module resolves where the PlanUp database lives, who the acting
//! user is, and which project a command targets when none is given.
//!
//! # Architecture
//!
//! PlanUp keeps a **single global database** at `~/.planup/data/planup.db`.
//! Every project, organization and idea board lives in that file; the
//! per-command `--db` flag (or `PU_DB`) points elsewhere for scratch work
//! and tests.

use std::path::{Path, PathBuf};

/// Get the global PlanUp directory location (`~/.planup/`).
#[must_use]
pub fn global_planup_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".planup"))
}

/// Check if test mode is enabled.
///
/// Test mode is enabled by setting `PU_TEST_DB=1` (or any non-empty value).
/// This redirects all database operations to an isolated test database.
#[must_use]
pub fn is_test_mode() -> bool {
    std::env::var("PU_TEST_DB").is_ok_and(|v| is_truthy(&v))
}

fn is_truthy(value: &str) -> bool {
    !value.is_empty() && value != "0" && !value.eq_ignore_ascii_case("false")
}

/// Get the test database path (`~/.planup/test/planup.db`).
#[must_use]
pub fn test_db_path() -> Option<PathBuf> {
    global_planup_dir().map(|dir| dir.join("test").join("planup.db"))
}

/// Resolve the database path.
///
/// Priority:
/// 1. If `explicit_path` is provided (`--db` / `PU_DB`), use it directly
/// 2. `PU_TEST_DB` environment variable → uses test database
/// 3. `PLANUP_DB` environment variable
/// 4. Global location: `~/.planup/data/planup.db`
///
/// # Returns
///
/// Returns the path to the database file, or `None` if no home directory
/// can be determined.
#[must_use]
pub fn resolve_db_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return Some(path.to_path_buf());
    }

    if is_test_mode() {
        return test_db_path();
    }

    if let Ok(db_path) = std::env::var("PLANUP_DB") {
        if !db_path.trim().is_empty() {
            return Some(PathBuf::from(db_path));
        }
    }

    global_planup_dir().map(|dir| dir.join("data").join("planup.db"))
}

/// Resolve the project key a command should target.
///
/// Priority:
/// 1. Explicit `--project` flag
/// 2. `PU_PROJECT` environment variable
///
/// The stored `current_project` setting is the final fallback and is
/// consulted by the command layer, which holds the storage handle.
#[must_use]
pub fn resolve_project_key(explicit: Option<&str>) -> Option<String> {
    if let Some(key) = explicit {
        if !key.trim().is_empty() {
            return Some(key.trim().to_string());
        }
    }

    std::env::var("PU_PROJECT")
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Get the default actor name.
///
/// Priority:
/// 1. `PU_ACTOR` environment variable
/// 2. Git user name
/// 3. System username
/// 4. "unknown"
#[must_use]
pub fn default_actor() -> String {
    if let Ok(actor) = std::env::var("PU_ACTOR") {
        if !actor.is_empty() {
            return actor;
        }
    }

    if let Ok(output) = std::process::Command::new("git")
        .args(["config", "user.name"])
        .output()
    {
        if output.status.success() {
            let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if !name.is_empty() {
                return name;
            }
        }
    }

    if let Ok(user) = std::env::var("USER") {
        return user;
    }

    "unknown".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_actor() {
        let actor = default_actor();
        assert!(!actor.is_empty());
    }

    #[test]
    fn test_resolve_db_path_with_explicit() {
        let explicit = PathBuf::from("/custom/path/db.sqlite");
        let result = resolve_db_path(Some(&explicit));
        assert_eq!(result, Some(explicit));
    }

    #[test]
    fn test_resolve_db_path_defaults_to_global() {
        let result = resolve_db_path(None);
        assert!(result.is_some());
        assert!(result.unwrap().ends_with("planup.db"));
    }

    #[test]
    fn test_test_db_path_is_separate() {
        let global = global_planup_dir().unwrap();
        let test = test_db_path().unwrap();

        assert!(test.to_string_lossy().contains("test"));
        assert!(test.ends_with("planup.db"));
        assert_ne!(global.join("data").join("planup.db"), test);
    }

    #[test]
    fn test_truthy_parsing() {
        assert!(!is_truthy(""));
        assert!(!is_truthy("0"));
        assert!(!is_truthy("false"));
        assert!(!is_truthy("FALSE"));
        assert!(is_truthy("1"));
        assert!(is_truthy("true"));
        assert!(is_truthy("yes"));
    }

    #[test]
    fn test_resolve_project_key_prefers_explicit() {
        assert_eq!(resolve_project_key(Some(" MOB ")), Some("MOB".to_string()));
    }
}
