//! CLI integration tests for opslog admin commands.
//!
//! Each test uses an isolated temp directory for the database, ensuring tests
//! can run in parallel safely.

#![allow(deprecated)] // Command::cargo_bin deprecation only affects custom build dirs

use std::path::Path;
use std::sync::Arc;

use assert_cmd::Command;
use assert_fs::TempDir;
use opslog::access::{AccessScope, resolve_business_unit};
use opslog::auth::Identity;
use opslog::store::SqliteStore;
use predicates::prelude::*;
use serde_json::Value;

struct TestContext {
    temp_dir: TempDir,
}

impl TestContext {
    fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    fn data_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    fn data_dir_str(&self) -> String {
        self.data_dir().to_string_lossy().to_string()
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("opslog").expect("failed to find binary");
        cmd.env("NO_COLOR", "1");
        cmd
    }

    fn init(&self) -> assert_cmd::assert::Assert {
        self.cmd()
            .args(["admin", "init", "--data-dir", &self.data_dir_str()])
            .assert()
    }

    fn add_user(&self, email: &str, unit: Option<&str>) -> assert_cmd::assert::Assert {
        let data_dir = self.data_dir_str();
        let mut args = vec![
            "admin",
            "user",
            "add",
            "--data-dir",
            &data_dir,
            "--email",
            email,
            "--password",
            "correct-horse-battery",
            "--non-interactive",
        ];
        if let Some(unit) = unit {
            args.extend(["--business-unit", unit]);
        }
        self.cmd().args(args).assert()
    }

    fn list_users_json(&self) -> Vec<Value> {
        let output = self
            .cmd()
            .args([
                "admin",
                "user",
                "list",
                "--data-dir",
                &self.data_dir_str(),
                "--json",
            ])
            .output()
            .expect("failed to run command");

        let users: Value = serde_json::from_slice(&output.stdout).expect("failed to parse JSON");
        users.as_array().expect("users not an array").clone()
    }

    fn open_store(&self) -> Arc<SqliteStore> {
        let db_path = self.data_dir().join("opslog.db");
        Arc::new(SqliteStore::new(&db_path).expect("open store"))
    }
}

fn find_user<'a>(users: &'a [Value], email: &str) -> &'a Value {
    users
        .iter()
        .find(|u| u["email"] == email)
        .expect("user not found")
}

// ============================================================================
// Init Command Tests
// ============================================================================

#[test]
fn init_creates_database_and_storage_directory() {
    let ctx = TestContext::new();

    ctx.init().success();

    assert!(ctx.data_dir().join("opslog.db").exists());
    assert!(ctx.data_dir().join("storage").is_dir());
}

#[test]
fn init_rejects_second_initialization() {
    let ctx = TestContext::new();

    ctx.init().success();
    ctx.init()
        .failure()
        .stderr(predicate::str::contains("Already initialized"));
}

#[test]
fn commands_require_initialized_data_dir() {
    let ctx = TestContext::new();

    ctx.add_user("guard@example.com", Some("shipyard"))
        .failure()
        .stderr(predicate::str::contains("opslog admin init"));
}

// ============================================================================
// User Command Tests
// ============================================================================

#[test]
fn user_add_creates_account_with_business_unit() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.add_user("Guard@Example.com", Some("shipyard"))
        .success()
        .stdout(predicate::str::contains("business unit \"shipyard\""));

    let users = ctx.list_users_json();
    assert_eq!(users.len(), 1);
    let user = find_user(&users, "guard@example.com");
    assert_eq!(user["business_unit"], "shipyard");
    assert!(user.get("password_hash").is_none());
}

#[test]
fn user_add_rejects_duplicate_email() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.add_user("guard@example.com", None).success();
    ctx.add_user("GUARD@example.com", None)
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn user_add_rejects_short_password() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.cmd()
        .args([
            "admin",
            "user",
            "add",
            "--data-dir",
            &ctx.data_dir_str(),
            "--email",
            "guard@example.com",
            "--password",
            "short",
            "--non-interactive",
        ])
        .assert()
        .failure();

    assert!(ctx.list_users_json().is_empty());
}

#[test]
fn user_add_non_interactive_requires_email() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.cmd()
        .args([
            "admin",
            "user",
            "add",
            "--data-dir",
            &ctx.data_dir_str(),
            "--non-interactive",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--email is required"));
}

#[test]
fn user_without_unit_cannot_be_scoped_until_set() {
    let ctx = TestContext::new();
    ctx.init().success();
    ctx.add_user("guard@example.com", None)
        .success()
        .stdout(predicate::str::contains("without a business unit"));

    let store = ctx.open_store();
    let identity = Identity::new(store.clone());
    let session = identity
        .sign_in("guard@example.com", "correct-horse-battery")
        .expect("sign in")
        .session;
    let state = resolve_business_unit(store.as_ref(), Some(&session));
    assert_eq!(state.scope(), AccessScope::Unresolved);

    ctx.cmd()
        .args([
            "admin",
            "user",
            "set-unit",
            "--data-dir",
            &ctx.data_dir_str(),
            "--email",
            "guard@example.com",
            "--business-unit",
            "Master",
            "--non-interactive",
        ])
        .assert()
        .success();

    let state = resolve_business_unit(store.as_ref(), Some(&session));
    assert_eq!(state.scope(), AccessScope::All);
}

#[test]
fn user_set_unit_clear_removes_unit() {
    let ctx = TestContext::new();
    ctx.init().success();
    ctx.add_user("guard@example.com", Some("tst")).success();

    ctx.cmd()
        .args([
            "admin",
            "user",
            "set-unit",
            "--data-dir",
            &ctx.data_dir_str(),
            "--email",
            "guard@example.com",
            "--clear",
            "--non-interactive",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("cleared"));

    let users = ctx.list_users_json();
    assert!(find_user(&users, "guard@example.com")["business_unit"].is_null());
}

#[test]
fn user_set_unit_unknown_email_fails() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.cmd()
        .args([
            "admin",
            "user",
            "set-unit",
            "--data-dir",
            &ctx.data_dir_str(),
            "--email",
            "nobody@example.com",
            "--business-unit",
            "tst",
            "--non-interactive",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No user with email"));
}

#[test]
fn user_list_without_users_prints_placeholder() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.cmd()
        .args(["admin", "user", "list", "--data-dir", &ctx.data_dir_str()])
        .assert()
        .success()
        .stdout(predicate::str::contains("No users."));
}
