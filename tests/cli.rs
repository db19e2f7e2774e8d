//! End-to-end tests for the `pu` binary.
//!
//! Every test works against its own database in a temp directory.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

struct Workspace {
    _dir: TempDir,
    db: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("planup.db");
        Self { _dir: dir, db }
    }

    /// A `pu` command bound to this workspace's database.
    fn pu(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("pu");
        cmd.arg("--db")
            .arg(&self.db)
            .env("PU_ACTOR", "tester")
            .env_remove("PU_PROJECT")
            .env_remove("PU_TEST_DB");
        cmd
    }

    /// Run with `--silent` and return the trimmed stdout.
    fn silent(&self, args: &[&str]) -> String {
        let output = self.pu().arg("--silent").args(args).output().unwrap();
        assert!(output.status.success(), "pu {args:?} failed: {}", String::from_utf8_lossy(&output.stderr));
        String::from_utf8(output.stdout).unwrap().trim().to_string()
    }

    fn with_project() -> Self {
        let ws = Self::new();
        ws.pu().arg("init").assert().success();
        ws.pu()
            .args(["project", "create", "Mobile App", "--key", "MOB"])
            .assert()
            .success();
        ws
    }
}

mod basics {
    use super::*;

    #[test]
    fn test_help() {
        cargo_bin_cmd!("pu").arg("--help").assert().success();
    }

    #[test]
    fn test_version_json() {
        cargo_bin_cmd!("pu")
            .args(["version", "--json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"version\""));
    }

    #[test]
    fn test_init_creates_database() {
        let ws = Workspace::new();
        ws.pu().arg("init").assert().success();
        assert!(ws.db.exists());
    }

    #[test]
    fn test_init_twice_requires_force() {
        let ws = Workspace::new();
        ws.pu().arg("init").assert().success();
        ws.pu().arg("init").assert().failure().code(2);
        ws.pu().args(["init", "--force"]).assert().success();
    }

    #[test]
    fn test_commands_require_init() {
        let ws = Workspace::new();
        ws.pu()
            .args(["project", "list"])
            .assert()
            .failure()
            .code(2)
            .stderr(predicate::str::contains("NOT_INITIALIZED"));
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let ws = Workspace::with_project();
        ws.pu()
            .args(["--dry-run", "issue", "create", "Never stored"])
            .assert()
            .success()
            .stdout(predicate::str::contains("dry_run"));
        ws.pu()
            .args(["issue", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Never stored").not());
    }
}

mod issues {
    use super::*;

    #[test]
    fn test_create_allocates_sequential_keys() {
        let ws = Workspace::with_project();
        assert_eq!(ws.silent(&["issue", "create", "Login crash"]), "MOB-1");
        assert_eq!(ws.silent(&["issue", "create", "Dark mode", "-t", "story"]), "MOB-2");
    }

    #[test]
    fn test_invalid_priority_is_rejected() {
        let ws = Workspace::with_project();
        ws.pu()
            .args(["issue", "create", "Login crash", "--priority", "sideways"])
            .assert()
            .failure()
            .code(4);
    }

    #[test]
    fn test_transition_follows_workflow() {
        let ws = Workspace::with_project();
        let key = ws.silent(&["issue", "create", "Login crash"]);

        // To Do cannot jump straight to Done in the default workflow
        ws.pu()
            .args(["issue", "transition", &key, "Done"])
            .assert()
            .failure()
            .code(5);

        ws.pu().args(["issue", "transition", &key, "In Progress"]).assert().success();
        ws.pu().args(["issue", "transition", &key, "complete"]).assert().success();
        ws.pu()
            .args(["issue", "show", &key, "--json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"status\":\"Done\""));
    }

    #[test]
    fn test_query_filters_by_status() {
        let ws = Workspace::with_project();
        let started = ws.silent(&["issue", "create", "Started work"]);
        ws.silent(&["issue", "create", "Untouched"]);
        ws.pu().args(["issue", "transition", &started, "In Progress"]).assert().success();

        ws.pu()
            .args(["issue", "query", "status = \"In Progress\"", "--json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Started work"))
            .stdout(predicate::str::contains("Untouched").not());
    }

    #[test]
    fn test_list_assignee_with_apostrophe() {
        let ws = Workspace::with_project();
        let key = ws.silent(&["issue", "create", "Crash", "--assignee", "O'Brien"]);
        assert_eq!(ws.silent(&["issue", "list", "--assignee", "O'Brien"]), key);
    }

    #[test]
    fn test_unknown_issue_exit_code() {
        let ws = Workspace::with_project();
        ws.pu().args(["issue", "show", "MOB-99"]).assert().failure().code(3);
    }
}

mod sprints {
    use super::*;

    #[test]
    fn test_sprint_lifecycle() {
        let ws = Workspace::with_project();
        let key = ws.silent(&["issue", "create", "Login crash"]);
        ws.pu()
            .args(["sprint", "create", "Sprint 1", "--start", "2025-03-01", "--end", "2025-03-14"])
            .assert()
            .success();
        ws.pu().args(["sprint", "add-issue", "Sprint 1", &key]).assert().success();
        ws.pu().args(["sprint", "start", "Sprint 1"]).assert().success();
        ws.pu()
            .args(["sprint", "active", "--json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"status\":\"active\""));
    }
}

mod sync {
    use super::*;

    #[test]
    fn test_export_then_import_into_fresh_database() {
        let source = Workspace::with_project();
        source.silent(&["issue", "create", "Login crash"]);
        let dir = TempDir::new().unwrap();
        let out = dir.path().to_str().unwrap();

        source.pu().args(["sync", "export", "--output", out]).assert().success();
        assert!(dir.path().join("issues.jsonl").exists());

        let target = Workspace::new();
        target.pu().arg("init").assert().success();
        target.pu().args(["sync", "import", "--input", out]).assert().success();
        target
            .pu()
            .args(["issue", "list", "--project", "MOB", "--json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Login crash"));
    }
}

mod settings {
    use super::*;

    #[test]
    fn test_theme_round_trip() {
        let ws = Workspace::with_project();
        ws.pu()
            .args(["settings", "get", "theme", "--json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("system"));
        ws.pu().args(["settings", "set", "theme", "dark"]).assert().success();
        ws.pu()
            .args(["settings", "get", "theme", "--json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("dark"));
    }
}
