// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Error, Result};
use crate::services::approval::CommitCreator;

pub struct GitService {
    work_dir: PathBuf,
}

impl GitService {
    pub fn discover() -> Result<Self> {
        Self::discover_at(Path::new("."))
    }

    pub fn discover_at(path: &Path) -> Result<Self> {
        let repo = gix::discover(path).map_err(|_| Error::NotAGitRepo)?;

        let work_dir = repo
            .workdir()
            .ok_or_else(|| Error::Git("Bare repository not supported".into()))?
            .to_path_buf();

        Ok(Self { work_dir })
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn check_state(&self) -> Result<()> {
        let repo = gix::open(&self.work_dir).map_err(|e| Error::Git(e.to_string()))?;
        if matches!(repo.state(), Some(gix::state::InProgress::Merge)) {
            return Err(Error::MergeInProgress);
        }
        Ok(())
    }

    async fn git(&self, args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .args(["-c", "core.quotepath=off"])
            .args(args)
            .current_dir(&self.work_dir)
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Git(stderr.trim().to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Unified diff of everything staged for the next commit.
    pub async fn staged_diff(&self) -> Result<String> {
        self.check_state()?;

        let diff = self.git(&diff_args(&["--cached"])).await?;

        if diff.trim().is_empty() {
            return Err(Error::NoStagedChanges);
        }

        debug!(bytes = diff.len(), "staged diff");
        Ok(diff)
    }

    /// Unified diff for a revision range such as `main..feature`.
    pub async fn range_diff(&self, range: &str) -> Result<String> {
        if range.starts_with('-') || range.trim().is_empty() {
            return Err(Error::Git(format!("invalid revision range '{range}'")));
        }

        self.git(&diff_args(&[range, "--"])).await
    }

    /// Staged paths that also carry unstaged edits in the working tree.
    pub async fn unstaged_overlap(&self, paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let output = self
            .git(&["diff", "--name-only", "--no-ext-diff", "--no-relative"])
            .await?;
        let dirty: HashSet<&str> = output.lines().map(str::trim).collect();

        Ok(paths
            .iter()
            .filter(|p| p.to_str().is_some_and(|s| dirty.contains(s)))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CommitCreator for GitService {
    async fn create_commit(&self, message: &str, paths: &[PathBuf]) -> Result<String> {
        // `--only` records working-tree content, which must equal the staged content.
        let dirty = self
            .unstaged_overlap(paths)
            .await
            .map_err(|e| Error::CommitCreation {
                message: e.to_string(),
            })?;
        if !dirty.is_empty() {
            let files: Vec<String> = dirty.iter().map(|p| p.display().to_string()).collect();
            return Err(Error::CommitCreation {
                message: format!(
                    "unstaged changes in {}; stage or stash them first",
                    files.join(", ")
                ),
            });
        }

        let mut command = Command::new("git");
        command
            .args(["commit", "--only", "-m", message, "--"])
            .args(paths)
            .current_dir(&self.work_dir)
            .kill_on_drop(true);

        let output = command.output().await.map_err(|e| Error::CommitCreation {
            message: e.to_string(),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let detail = if stderr.trim().is_empty() {
                stdout.trim().to_string()
            } else {
                stderr.trim().to_string()
            };
            return Err(Error::CommitCreation { message: detail });
        }

        let id = self
            .git(&["rev-parse", "--short", "HEAD"])
            .await
            .map_err(|e| Error::CommitCreation {
                message: e.to_string(),
            })?;

        Ok(id.trim().to_string())
    }
}

/// `git diff` arguments that do not depend on the user's diff configuration.
fn diff_args<'a>(extra: &[&'a str]) -> Vec<&'a str> {
    let mut args = vec![
        "diff",
        "--no-ext-diff",
        "--no-color",
        "--no-relative",
        "--src-prefix=a/",
        "--dst-prefix=b/",
        "--unified=3",
        "-M",
    ];
    args.extend_from_slice(extra);
    args
}
