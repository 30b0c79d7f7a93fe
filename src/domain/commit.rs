// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommitType {
    Feat,
    Fix,
    Docs,
    Style,
    Refactor,
    Test,
    Chore,
    Perf,
    Ci,
    Build,
    Revert,
}

impl CommitType {
    pub const ALL: &'static [&'static str] = &[
        "feat", "fix", "docs", "style", "refactor", "test", "chore", "perf", "ci", "build",
        "revert",
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Feat => "feat",
            Self::Fix => "fix",
            Self::Docs => "docs",
            Self::Style => "style",
            Self::Refactor => "refactor",
            Self::Test => "test",
            Self::Chore => "chore",
            Self::Perf => "perf",
            Self::Ci => "ci",
            Self::Build => "build",
            Self::Revert => "revert",
        }
    }

    /// Exact, case-sensitive match against the conventional type names.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "feat" => Some(Self::Feat),
            "fix" => Some(Self::Fix),
            "docs" => Some(Self::Docs),
            "style" => Some(Self::Style),
            "refactor" => Some(Self::Refactor),
            "test" => Some(Self::Test),
            "chore" => Some(Self::Chore),
            "perf" => Some(Self::Perf),
            "ci" => Some(Self::Ci),
            "build" => Some(Self::Build),
            "revert" => Some(Self::Revert),
            _ => None,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Feat => "A new feature",
            Self::Fix => "A bug fix",
            Self::Docs => "Documentation only changes",
            Self::Style => "Changes that do not affect the meaning of the code",
            Self::Refactor => "A code change that neither fixes a bug nor adds a feature",
            Self::Test => "Adding missing tests or correcting existing tests",
            Self::Chore => "Other changes that don't modify src or test files",
            Self::Perf => "A code change that improves performance",
            Self::Ci => "Changes to CI configuration files and scripts",
            Self::Build => "Changes that affect the build system or external dependencies",
            Self::Revert => "Reverts a previous commit",
        }
    }
}

impl fmt::Display for CommitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured conventional commit message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitMessage {
    pub commit_type: CommitType,
    pub scope: Option<String>,
    pub subject: String,
    pub body: Option<String>,
    pub breaking: bool,
    pub breaking_description: Option<String>,
}

impl CommitMessage {
    pub fn new(commit_type: CommitType, subject: impl Into<String>) -> Self {
        Self {
            commit_type,
            scope: None,
            subject: subject.into(),
            body: None,
            breaking: false,
            breaking_description: None,
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_breaking(mut self, description: Option<String>) -> Self {
        self.breaking = true;
        self.breaking_description = description;
        self
    }

    /// `type(scope)!: subject` without body or footers.
    pub fn header(&self) -> String {
        let mut header = self.commit_type.as_str().to_string();
        if let Some(scope) = &self.scope {
            header.push('(');
            header.push_str(scope);
            header.push(')');
        }
        if self.breaking {
            header.push('!');
        }
        header.push_str(": ");
        header.push_str(&self.subject);
        header
    }
}
