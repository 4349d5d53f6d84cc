//! Integration tests for the taskboard binary.
//!
//! These run the real CLI. Nothing here needs network access: commands that
//! reach the platform are pointed at a closed local port.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const CONFIG_VARS: [&str; 5] = [
    "SUPABASE_URL",
    "SUPABASE_ANON_KEY",
    "VITE_SUPABASE_URL",
    "VITE_SUPABASE_ANON_KEY",
    "TASKBOARD_SESSION_FILE",
];

/// Helper to create a taskboard Command with no platform configuration
fn taskboard(dir: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("taskboard");
    cmd.current_dir(dir.path());
    for var in CONFIG_VARS {
        cmd.env_remove(var);
    }
    cmd
}

/// Write an env file pointing at a local port nothing listens on
fn write_unreachable_env(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("taskboard.env");
    let session = dir.path().join("session.json");
    fs::write(
        &path,
        format!(
            "SUPABASE_URL=http://127.0.0.1:9\nSUPABASE_ANON_KEY=anon\nTASKBOARD_SESSION_FILE={}\n",
            session.display()
        ),
    )
    .unwrap();
    path
}

// =============================================================================
// Basic CLI Tests
// =============================================================================

mod cli_basics {
    use super::*;

    #[test]
    fn test_taskboard_help() {
        let dir = TempDir::new().unwrap();
        taskboard(&dir)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("demo"));
    }

    #[test]
    fn test_taskboard_version() {
        let dir = TempDir::new().unwrap();
        taskboard(&dir).arg("--version").assert().success();
    }

    #[test]
    fn test_board_requires_uuid() {
        let dir = TempDir::new().unwrap();
        taskboard(&dir)
            .args(["board", "not-a-uuid"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("invalid value"));
    }
}

// =============================================================================
// Demo
// =============================================================================

mod demo {
    use super::*;

    #[test]
    fn test_demo_renders_sample_board_without_config() {
        let dir = TempDir::new().unwrap();
        taskboard(&dir)
            .arg("demo")
            .assert()
            .success()
            .stdout(predicate::str::contains("Product Development"))
            .stdout(predicate::str::contains("To Do"))
            .stdout(predicate::str::contains("Research competitors"))
            .stdout(predicate::str::contains("Dropped"));
    }

    #[test]
    fn test_demo_drop_appends_to_done() {
        let dir = TempDir::new().unwrap();
        taskboard(&dir)
            .arg("demo")
            .assert()
            .success()
            .stdout(predicate::str::contains("onto Done at position 3"));
    }
}

// =============================================================================
// Configuration
// =============================================================================

mod configuration {
    use super::*;

    #[test]
    fn test_missing_config_fails_fast() {
        let dir = TempDir::new().unwrap();
        taskboard(&dir)
            .arg("boards")
            .assert()
            .failure()
            .stderr(predicate::str::contains("SUPABASE_URL"));
    }

    #[test]
    fn test_missing_anon_key_is_named() {
        let dir = TempDir::new().unwrap();
        taskboard(&dir)
            .env("SUPABASE_URL", "https://abc.supabase.co")
            .arg("boards")
            .assert()
            .failure()
            .stderr(predicate::str::contains("SUPABASE_ANON_KEY"));
    }

    #[test]
    fn test_invalid_url_in_env_file() {
        let dir = TempDir::new().unwrap();
        let env = dir.path().join("bad.env");
        fs::write(&env, "SUPABASE_URL=ftp://abc\nSUPABASE_ANON_KEY=anon\n").unwrap();

        taskboard(&dir)
            .arg("--env-file")
            .arg(&env)
            .arg("boards")
            .assert()
            .failure()
            .stderr(predicate::str::contains("unsupported scheme"));
    }

    #[test]
    fn test_dotenv_in_working_directory_is_read() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".env"), "SUPABASE_URL=not a url\nSUPABASE_ANON_KEY=anon\n")
            .unwrap();

        taskboard(&dir)
            .arg("boards")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid value for SUPABASE_URL"));
    }
}

// =============================================================================
// Remote failures
// =============================================================================

mod remote_failures {
    use super::*;

    #[test]
    fn test_unreachable_platform_reports_error() {
        let dir = TempDir::new().unwrap();
        let env = write_unreachable_env(&dir);

        taskboard(&dir)
            .arg("--env-file")
            .arg(&env)
            .arg("boards")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Request to data API failed"));
    }

    #[test]
    fn test_sign_out_without_session_succeeds() {
        let dir = TempDir::new().unwrap();
        let env = write_unreachable_env(&dir);

        taskboard(&dir)
            .arg("--env-file")
            .arg(&env)
            .args(["auth", "sign-out"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Signed out."));
    }

    #[test]
    fn test_status_without_session() {
        let dir = TempDir::new().unwrap();
        let env = write_unreachable_env(&dir);

        taskboard(&dir)
            .arg("--env-file")
            .arg(&env)
            .args(["auth", "status"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Not signed in"));
    }
}
