// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

//! Binary-level checks. Every run gets an empty working directory and home so
//! no local configuration leaks in.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const NEW_FILE_DIFF: &str = "\
diff --git a/src/cache.rs b/src/cache.rs
new file mode 100644
index 0000000..3b18e51
--- /dev/null
+++ b/src/cache.rs
@@ -0,0 +1,3 @@
+pub struct Cache;
+
+impl Cache {}
";

fn isolated(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("commitsplit").unwrap();
    cmd.current_dir(dir)
        .env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir.join(".config"))
        .env("NO_COLOR", "1")
        .env_remove("COMMITSPLIT_PROVIDER")
        .env_remove("COMMITSPLIT_MODEL")
        .env_remove("COMMITSPLIT_OLLAMA_HOST")
        .env_remove("OPENAI_API_KEY")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_lists_the_main_flags() {
    let dir = TempDir::new().unwrap();
    isolated(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--max-commit-size"))
        .stdout(predicate::str::contains("--dry-run"))
        .stdout(predicate::str::contains("--diff-file"));
}

#[test]
fn completions_are_generated() {
    let dir = TempDir::new().unwrap();
    isolated(dir.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("commitsplit"));
}

#[test]
fn config_shows_project_overrides() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join(".commitsplit.toml"), "max_commit_size = 120\n").unwrap();

    isolated(dir.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("Provider: ollama"))
        .stdout(predicate::str::contains("Max commit size: 120 lines"))
        .stdout(predicate::str::contains("Max subject length: 50"));
}

#[test]
fn range_and_diff_file_conflict() {
    let dir = TempDir::new().unwrap();
    isolated(dir.path())
        .args(["--range", "main..HEAD", "--diff-file", "changes.diff"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn malformed_diff_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let diff = dir.path().join("broken.diff");
    std::fs::write(&diff, "this is not a diff\n").unwrap();

    isolated(dir.path())
        .arg("--diff-file")
        .arg(&diff)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Malformed diff at line 1"));
}

#[test]
fn blank_diff_from_stdin_is_a_no_op() {
    let dir = TempDir::new().unwrap();
    isolated(dir.path())
        .args(["--diff-file", "-"])
        .write_stdin("\n")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn invalid_project_config_fails_early() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join(".commitsplit.toml"),
        "max_commit_size = 10\nmin_partition_size = 50\n",
    )
    .unwrap();

    isolated(dir.path())
        .args(["--diff-file", "-"])
        .write_stdin(NEW_FILE_DIFF)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("min_partition_size"));
}

#[tokio::test(flavor = "multi_thread")]
async fn diff_file_preview_prints_generated_message() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "models": [{ "name": "qwen3:4b" }]
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "response": "{\"type\": \"feat\", \"scope\": \"cache\", \"subject\": \"add cache type\"}"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let host = server.uri();
    let assert = tokio::task::spawn_blocking(move || {
        let dir = TempDir::new().unwrap();
        isolated(dir.path())
            .env("COMMITSPLIT_OLLAMA_HOST", host)
            .args(["--diff-file", "-"])
            .write_stdin(NEW_FILE_DIFF)
            .assert()
    })
    .await
    .unwrap();

    assert
        .success()
        .stdout(predicate::str::contains("feat(cache): add cache type"));
}

#[tokio::test(flavor = "multi_thread")]
async fn preview_with_no_usable_message_fails() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "models": [{ "name": "qwen3:4b" }]
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "response": "I changed some files."
        })))
        .mount(&server)
        .await;

    let host = server.uri();
    let assert = tokio::task::spawn_blocking(move || {
        let dir = TempDir::new().unwrap();
        isolated(dir.path())
            .env("COMMITSPLIT_OLLAMA_HOST", host)
            .args(["--diff-file", "-"])
            .write_stdin(NEW_FILE_DIFF)
            .assert()
    })
    .await
    .unwrap();

    assert
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("No commits created"));
}
