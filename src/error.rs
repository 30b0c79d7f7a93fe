// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

// miette's Diagnostic derive generates code that triggers this false positive
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    #[error("Malformed diff at line {line}: {reason}")]
    #[diagnostic(
        code(commitsplit::diff::malformed),
        help("Feed the output of `git diff` unchanged; partial or hand-edited diffs are rejected")
    )]
    MalformedDiff { line: usize, reason: String },

    #[error("No staged changes found")]
    #[diagnostic(
        code(commitsplit::git::no_staged),
        help("Stage files with: git add <files>")
    )]
    NoStagedChanges,

    #[error("Not a git repository")]
    #[diagnostic(
        code(commitsplit::git::not_repo),
        help("Run this command inside a git repository")
    )]
    NotAGitRepo,

    #[error("Merge in progress")]
    #[diagnostic(
        code(commitsplit::git::merge),
        help("Complete or abort the merge: git merge --abort")
    )]
    MergeInProgress,

    #[error("Commit aborted: files with both staged and unstaged changes")]
    #[diagnostic(
        code(commitsplit::split::aborted),
        help("Stage or stash the unstaged changes first")
    )]
    SplitAborted,

    #[error("Operation cancelled by user")]
    Cancelled,

    #[error("No commits created: all {groups} group(s) were skipped or failed")]
    #[diagnostic(
        code(commitsplit::run::nothing_committed),
        help("Run with --verbose to see why generation or commit creation failed")
    )]
    NothingCommitted { groups: usize },

    #[error("Text generation unavailable after {attempts} calls to {provider}: {message}")]
    #[diagnostic(
        code(commitsplit::generation::unavailable),
        help("Check that the provider is reachable, then retry this partition or skip it")
    )]
    GenerationUnavailable {
        provider: String,
        attempts: u32,
        message: String,
    },

    #[error(
        "No valid commit message after {attempts} attempts for {}: {}",
        files.join(", "),
        violations.join("; ")
    )]
    #[diagnostic(
        code(commitsplit::generation::exhausted),
        help("Edit the last candidate by hand or regenerate")
    )]
    GenerationExhausted {
        attempts: u32,
        files: Vec<String>,
        last_candidate: String,
        violations: Vec<String>,
    },

    #[error("Commit creation failed: {message}")]
    #[diagnostic(
        code(commitsplit::commit::failed),
        help("Earlier commits are kept; inspect `git status` before retrying")
    )]
    CommitCreation { message: String },

    #[error("Cannot connect to Ollama at {host}")]
    #[diagnostic(
        code(commitsplit::ollama::not_running),
        help("Start Ollama with: ollama serve")
    )]
    OllamaNotRunning { host: String },

    #[error("Model '{model}' not found. Available: {}", available.join(", "))]
    #[diagnostic(
        code(commitsplit::ollama::model_not_found),
        help("Pull the model with: ollama pull {model}")
    )]
    ModelNotFound {
        model: String,
        available: Vec<String>,
    },

    #[error("Provider '{provider}' error: {message}")]
    #[diagnostic(code(commitsplit::provider::error))]
    Provider { provider: String, message: String },

    #[error("Configuration error: {0}")]
    #[diagnostic(code(commitsplit::config::error))]
    Config(String),

    #[error("Git error: {0}")]
    #[diagnostic(code(commitsplit::git::error))]
    Git(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("Dialog error: {0}")]
    Dialog(String),

    #[cfg(feature = "secure-storage")]
    #[error("Keyring error: {0}")]
    #[diagnostic(
        code(commitsplit::keyring::error),
        help("Check your system keychain configuration")
    )]
    Keyring(String),
}

impl Error {
    /// Failures that belong to one partition and leave the rest of the run usable.
    pub fn is_partition_local(&self) -> bool {
        matches!(
            self,
            Self::GenerationUnavailable { .. }
                | Self::GenerationExhausted { .. }
                | Self::CommitCreation { .. }
        )
    }
}

impl From<dialoguer::Error> for Error {
    fn from(e: dialoguer::Error) -> Self {
        Error::Dialog(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
