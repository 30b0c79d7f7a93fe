// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
    Renamed,
}

impl ChangeKind {
    pub fn marker(&self) -> &'static str {
        match self {
            Self::Added => "[+]",
            Self::Modified => "[M]",
            Self::Deleted => "[-]",
            Self::Renamed => "[R]",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Added => "added",
            Self::Modified => "modified",
            Self::Deleted => "deleted",
            Self::Renamed => "renamed",
        };
        f.write_str(s)
    }
}

/// A contiguous block of changed lines within one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    pub old_start: usize,
    pub old_lines: usize,
    pub new_start: usize,
    pub new_lines: usize,
    pub added: usize,
    pub removed: usize,
    /// Body lines with their `+`/`-`/` ` prefix, line endings stripped.
    pub lines: Vec<String>,
}

impl Hunk {
    pub fn changed_lines(&self) -> usize {
        self.added + self.removed
    }

    /// Added and removed lines with their prefix removed.
    pub fn changes(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().filter_map(|l| {
            l.strip_prefix('+').or_else(|| l.strip_prefix('-'))
        })
    }
}

/// One file's change in a diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffUnit {
    pub path: PathBuf,
    pub kind: ChangeKind,
    pub old_path: Option<PathBuf>,
    pub hunks: Vec<Hunk>,
    pub additions: usize,
    pub deletions: usize,
    pub is_binary: bool,
}

impl DiffUnit {
    pub fn changed_lines(&self) -> usize {
        self.additions + self.deletions
    }

    /// Every path the version-control system must see to record this change.
    pub fn touched_paths(&self) -> Vec<&Path> {
        let mut paths = vec![self.path.as_path()];
        if let Some(old) = &self.old_path {
            if old != &self.path {
                paths.push(old.as_path());
            }
        }
        paths
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Source,
    Test,
    Docs,
    Config,
    Build,
    Ci,
    Other,
}

impl Category {
    /// Commit order for category groups: things others depend on go first.
    pub const ORDER: [Category; 7] = [
        Self::Build,
        Self::Ci,
        Self::Config,
        Self::Source,
        Self::Test,
        Self::Docs,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Test => "test",
            Self::Docs => "docs",
            Self::Config => "config",
            Self::Build => "build",
            Self::Ci => "ci",
            Self::Other => "other",
        }
    }

    pub fn priority(&self) -> usize {
        Self::ORDER
            .iter()
            .position(|c| c == self)
            .unwrap_or(Self::ORDER.len())
    }

    /// Pick the category with the greater line-count contribution.
    ///
    /// Ties go to `Source`, then to whichever comes first in commit order.
    pub fn dominant<I>(weights: I) -> Option<Category>
    where
        I: IntoIterator<Item = (Category, usize)>,
    {
        let mut totals: Vec<(Category, usize)> = Vec::new();
        for (category, lines) in weights {
            match totals.iter_mut().find(|(c, _)| *c == category) {
                Some((_, total)) => *total += lines,
                None => totals.push((category, lines)),
            }
        }

        totals
            .into_iter()
            .max_by(|(a, a_lines), (b, b_lines)| {
                a_lines
                    .cmp(b_lines)
                    .then_with(|| (*a == Self::Source).cmp(&(*b == Self::Source)))
                    .then_with(|| b.priority().cmp(&a.priority()))
            })
            .map(|(category, _)| category)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    High,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub category: Category,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedUnit {
    pub unit: DiffUnit,
    pub classification: Classification,
}

impl ClassifiedUnit {
    pub fn category(&self) -> Category {
        self.classification.category
    }

    pub fn path(&self) -> &Path {
        &self.unit.path
    }

    pub fn changed_lines(&self) -> usize {
        self.unit.changed_lines()
    }
}
