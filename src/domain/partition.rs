// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

use std::path::{Path, PathBuf};

use super::{Category, ClassifiedUnit, CommitMessage, CommitType};

/// A non-empty set of changed files destined to become exactly one commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub units: Vec<ClassifiedUnit>,
    pub additions: usize,
    pub deletions: usize,
    pub dominant: Category,
    pub commit_type: CommitType,
    pub scope: Option<String>,
}

impl Partition {
    pub fn changed_lines(&self) -> usize {
        self.additions + self.deletions
    }

    pub fn paths(&self) -> Vec<&Path> {
        self.units.iter().map(|u| u.path()).collect()
    }

    /// Paths to hand to the commit step, including rename sources.
    pub fn commit_paths(&self) -> Vec<PathBuf> {
        self.units
            .iter()
            .flat_map(|u| u.unit.touched_paths())
            .map(Path::to_path_buf)
            .collect()
    }

    /// Short human-readable reason this group stands on its own.
    pub fn rationale(&self) -> &'static str {
        match self.dominant {
            Category::Test => "Test changes committed separately to keep them easy to identify.",
            Category::Docs => "Documentation changes kept in their own commit for a clear history.",
            Category::Config => "Configuration changes may need separate review and rollback.",
            Category::Build | Category::Ci => {
                "Build and CI changes isolated to ease debugging of pipeline issues."
            }
            Category::Source | Category::Other => "Related changes grouped within the size limit.",
        }
    }

    /// Plain message from the suggested type and scope, offered when no
    /// generated candidate is available.
    pub fn fallback_message(&self) -> CommitMessage {
        let subject = match self.dominant {
            Category::Source => "update source code",
            Category::Test => "update tests",
            Category::Docs => "update documentation",
            Category::Config => "update configuration",
            Category::Build => "update build configuration",
            Category::Ci => "update ci configuration",
            Category::Other => "update files",
        };
        let mut message = CommitMessage::new(self.commit_type, subject);
        message.scope = self.scope.clone();
        message
    }

    /// Set when the group is over `max_commit_size`: a single file too large
    /// to divide, or tests without a matching source, which stay together.
    pub fn oversize_note(&self, max_commit_size: usize) -> Option<String> {
        if self.changed_lines() <= max_commit_size {
            return None;
        }
        let (subject, reason) = match self.units.as_slice() {
            [unit] => (
                format!("{} changes", unit.path().display()),
                "a file is never split",
            ),
            units => (
                format!("{} files change", units.len()),
                "tests without a matching source stay in one group",
            ),
        };
        Some(format!(
            "{subject} {} lines, over the {max_commit_size}-line limit; {reason}",
            self.changed_lines()
        ))
    }
}
