// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

//! Runs against a throwaway repository built with the `git` binary.

use std::path::{Path, PathBuf};
use std::process::Command;

use commitsplit::error::Error;
use commitsplit::services::approval::CommitCreator;
use commitsplit::services::diff::DiffParser;
use commitsplit::services::git::GitService;
use tempfile::TempDir;

fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// A repository with one committed file, `a.txt`, containing "one".
fn repo() -> TempDir {
    let dir = TempDir::new().unwrap();
    let path = dir.path();
    git(path, &["init", "-q"]);
    git(path, &["config", "user.name", "Test"]);
    git(path, &["config", "user.email", "test@example.com"]);
    git(path, &["config", "commit.gpgsign", "false"]);
    std::fs::write(path.join("a.txt"), "one\n").unwrap();
    git(path, &["add", "a.txt"]);
    git(path, &["commit", "-q", "-m", "initial"]);
    dir
}

#[tokio::test]
async fn commit_refuses_files_with_unstaged_edits() {
    let dir = repo();
    let path = dir.path();
    std::fs::write(path.join("a.txt"), "one\nstaged\n").unwrap();
    git(path, &["add", "a.txt"]);
    std::fs::write(path.join("a.txt"), "one\nstaged\nnot for this commit\n").unwrap();
    let head = git(path, &["rev-parse", "HEAD"]);

    let service = GitService::discover_at(path).unwrap();
    let paths = vec![PathBuf::from("a.txt")];
    assert_eq!(service.unstaged_overlap(&paths).await.unwrap(), paths);

    let committer: Box<dyn CommitCreator> = Box::new(service);
    let result = committer.create_commit("feat: add line", &paths).await;
    match result {
        Err(Error::CommitCreation { message }) => assert!(message.contains("a.txt")),
        other => panic!("expected commit failure, got {other:?}"),
    }

    assert_eq!(git(path, &["rev-parse", "HEAD"]), head);
    assert_eq!(git(path, &["show", "HEAD:a.txt"]), "one\n");
}

#[tokio::test]
async fn commit_records_only_the_given_paths() {
    let dir = repo();
    let path = dir.path();
    std::fs::write(path.join("a.txt"), "one\ntwo\n").unwrap();
    std::fs::write(path.join("b.txt"), "bee\n").unwrap();
    git(path, &["add", "a.txt", "b.txt"]);

    let service = GitService::discover_at(path).unwrap();
    let id = service
        .create_commit("docs: extend a", &[PathBuf::from("a.txt")])
        .await
        .unwrap();
    assert!(!id.is_empty());

    assert_eq!(git(path, &["show", "HEAD:a.txt"]), "one\ntwo\n");
    let files = git(path, &["show", "--name-only", "--format=", "HEAD"]);
    assert_eq!(files.trim(), "a.txt");
    // b.txt stays staged for the next commit.
    assert_eq!(git(path, &["diff", "--cached", "--name-only"]).trim(), "b.txt");
}

#[tokio::test]
async fn staged_diff_ignores_prefix_settings() {
    for (key, value) in [("diff.mnemonicPrefix", "true"), ("diff.noprefix", "true")] {
        let dir = repo();
        let path = dir.path();
        git(path, &["config", key, value]);
        std::fs::write(path.join("a.txt"), "one\ntwo\n").unwrap();
        git(path, &["add", "a.txt"]);

        let service = GitService::discover_at(path).unwrap();
        let units = DiffParser::parse(&service.staged_diff().await.unwrap()).unwrap();
        assert_eq!(units.len(), 1, "{key}");
        assert_eq!(units[0].path, PathBuf::from("a.txt"), "{key}");
    }
}

#[tokio::test]
async fn nothing_staged_is_reported() {
    let dir = repo();
    let service = GitService::discover_at(dir.path()).unwrap();
    assert!(matches!(
        service.staged_diff().await,
        Err(Error::NoStagedChanges)
    ));
}

#[test]
fn outside_a_repository_is_rejected() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(
        GitService::discover_at(dir.path()),
        Err(Error::NotAGitRepo)
    ));
}
