// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

use std::collections::HashMap;
use std::path::Path;

use tracing::debug;

use crate::config::Config;
use crate::domain::{Category, ChangeKind, ClassifiedUnit, CommitType, DiffUnit, Partition};
use crate::services::classifier::Classifier;
use crate::services::formatter::is_valid_scope;

/// Size thresholds for splitting, in added+removed lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitConfig {
    pub max_commit_size: usize,
    pub min_partition_size: usize,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            max_commit_size: 200,
            min_partition_size: 20,
        }
    }
}

impl SplitConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_commit_size: config.max_commit_size,
            min_partition_size: config.min_partition_size,
        }
    }

    /// Never split: everything lands in a single partition.
    pub fn unbounded() -> Self {
        Self {
            max_commit_size: usize::MAX,
            min_partition_size: 0,
        }
    }
}

/// Stems too generic to pair a test with a source file.
const GENERIC_STEMS: &[&str] = &["mod", "lib", "main", "index", "__init__", ""];

/// Directories too broad to be a meaningful scope.
const GENERIC_DIRS: &[&str] = &["src", "lib", "pkg", "app", "internal", "cmd", ".", ""];

pub struct CommitSplitter;

impl CommitSplitter {
    pub fn classify(units: Vec<DiffUnit>, classifier: &Classifier) -> Vec<ClassifiedUnit> {
        units
            .into_iter()
            .map(|unit| {
                let classification = classifier.classify(&unit);
                ClassifiedUnit {
                    unit,
                    classification,
                }
            })
            .collect()
    }

    /// Partition classified units into commit-sized groups.
    ///
    /// Total over any input: every unit ends up in exactly one partition and
    /// empty input yields no partitions.
    pub fn split(units: Vec<ClassifiedUnit>, config: &SplitConfig) -> Vec<Partition> {
        if units.is_empty() {
            return Vec::new();
        }

        let total: usize = units.iter().map(|u| u.changed_lines()).sum();
        if total <= config.max_commit_size {
            debug!(total, "changes fit in a single commit");
            return vec![Self::build_partition(units)];
        }

        let mut by_category: HashMap<Category, Vec<ClassifiedUnit>> = HashMap::new();
        for unit in units {
            by_category.entry(unit.category()).or_default().push(unit);
        }
        for group in by_category.values_mut() {
            group.sort_by(|a, b| a.path().cmp(b.path()));
        }

        // Tests whose stem matches a source file travel with it.
        let sources = by_category.remove(&Category::Source).unwrap_or_default();
        let tests = by_category.remove(&Category::Test).unwrap_or_default();

        let mut stem_index: HashMap<String, usize> = HashMap::new();
        for (i, unit) in sources.iter().enumerate() {
            let stem = file_stem(unit.path());
            if !GENERIC_STEMS.contains(&stem.as_str()) {
                stem_index.entry(stem).or_insert(i);
            }
        }

        let mut bundles: Vec<Vec<ClassifiedUnit>> = sources.into_iter().map(|u| vec![u]).collect();
        let mut orphan_tests = Vec::new();
        for test in tests {
            match stem_index.get(&test_stem(test.path())) {
                Some(&i) => bundles[i].push(test),
                None => orphan_tests.push(test),
            }
        }

        let mut groups: Vec<Vec<ClassifiedUnit>> = Vec::new();
        for category in Category::ORDER {
            match category {
                Category::Source => {
                    groups.extend(pack(std::mem::take(&mut bundles), config.max_commit_size));
                }
                Category::Test => {
                    if !orphan_tests.is_empty() {
                        groups.push(std::mem::take(&mut orphan_tests));
                    }
                }
                other => {
                    if let Some(units) = by_category.remove(&other) {
                        let singles = units.into_iter().map(|u| vec![u]);
                        groups.extend(pack(singles, config.max_commit_size));
                    }
                }
            }
        }

        let partitions: Vec<Partition> = groups.into_iter().map(Self::build_partition).collect();
        let partitions = merge_small(partitions, config);

        debug!(
            total,
            partitions = partitions.len(),
            max = config.max_commit_size,
            "changes split"
        );
        partitions
    }

    pub fn build_partition(units: Vec<ClassifiedUnit>) -> Partition {
        let additions = units.iter().map(|u| u.unit.additions).sum();
        let deletions = units.iter().map(|u| u.unit.deletions).sum();
        let dominant = Category::dominant(units.iter().map(|u| (u.category(), u.changed_lines())))
            .unwrap_or(Category::Source);
        let commit_type = infer_commit_type(dominant, &units, additions, deletions);
        let scope = infer_scope(&units);

        Partition {
            units,
            additions,
            deletions,
            dominant,
            commit_type,
            scope,
        }
    }
}

/// Next-fit packing in input order, bounded by `max` lines per group.
///
/// A bundle that cannot fit even in an empty group is broken into its units;
/// a single unit over the limit gets a group of its own.
fn pack<I>(bundles: I, max: usize) -> Vec<Vec<ClassifiedUnit>>
where
    I: IntoIterator<Item = Vec<ClassifiedUnit>>,
{
    let mut packer = Packer {
        max,
        done: Vec::new(),
        current: Vec::new(),
        size: 0,
    };

    for bundle in bundles {
        let size: usize = bundle.iter().map(|u| u.changed_lines()).sum();
        if size > max && bundle.len() > 1 {
            for unit in bundle {
                packer.place(vec![unit]);
            }
        } else {
            packer.place(bundle);
        }
    }

    packer.finish()
}

struct Packer {
    max: usize,
    done: Vec<Vec<ClassifiedUnit>>,
    current: Vec<ClassifiedUnit>,
    size: usize,
}

impl Packer {
    fn place(&mut self, items: Vec<ClassifiedUnit>) {
        let size: usize = items.iter().map(|u| u.changed_lines()).sum();
        if !self.current.is_empty() && self.size + size > self.max {
            self.done.push(std::mem::take(&mut self.current));
            self.size = 0;
        }
        self.current.extend(items);
        self.size += size;
    }

    fn finish(mut self) -> Vec<Vec<ClassifiedUnit>> {
        if !self.current.is_empty() {
            self.done.push(self.current);
        }
        self.done
    }
}

/// Fold partitions below the minimum into the nearest one with the same
/// dominant category, as long as the result stays within the size limit.
fn merge_small(mut partitions: Vec<Partition>, config: &SplitConfig) -> Vec<Partition> {
    let mut i = 0;
    while i < partitions.len() {
        if partitions.len() <= 1 {
            break;
        }

        let small = &partitions[i];
        if small.changed_lines() >= config.min_partition_size {
            i += 1;
            continue;
        }

        let target = (0..partitions.len())
            .filter(|&j| j != i)
            .filter(|&j| partitions[j].dominant == small.dominant)
            .filter(|&j| {
                partitions[j]
                    .changed_lines()
                    .saturating_add(small.changed_lines())
                    <= config.max_commit_size
            })
            .min_by_key(|&j| (j.abs_diff(i), j));

        let Some(j) = target else {
            i += 1;
            continue;
        };

        let absorbed = partitions.remove(i);
        let j = if j > i { j - 1 } else { j };
        let mut units = std::mem::take(&mut partitions[j].units);
        units.extend(absorbed.units);
        partitions[j] = CommitSplitter::build_partition(units);
        debug!(into = j, "merged undersized partition");
        i = 0;
    }
    partitions
}

fn infer_commit_type(
    dominant: Category,
    units: &[ClassifiedUnit],
    additions: usize,
    deletions: usize,
) -> CommitType {
    match dominant {
        Category::Test => CommitType::Test,
        Category::Docs => CommitType::Docs,
        Category::Ci => CommitType::Ci,
        Category::Build => CommitType::Build,
        Category::Config | Category::Other => CommitType::Chore,
        Category::Source => {
            let added = units
                .iter()
                .filter(|u| u.unit.kind == ChangeKind::Added)
                .count();

            if added > units.len() / 2 {
                CommitType::Feat
            } else if deletions > additions * 2 {
                CommitType::Refactor
            } else if additions < 20 && deletions < 20 {
                CommitType::Fix
            } else {
                CommitType::Feat
            }
        }
    }
}

/// Most common module name among source files, if at least half agree.
fn infer_scope(units: &[ClassifiedUnit]) -> Option<String> {
    let sources: Vec<&ClassifiedUnit> = units
        .iter()
        .filter(|u| u.category() == Category::Source)
        .collect();
    let considered: Vec<&ClassifiedUnit> = if sources.is_empty() {
        units.iter().collect()
    } else {
        sources
    };

    let mut counts: HashMap<String, usize> = HashMap::new();
    for unit in &considered {
        if let Some(scope) = scope_from_path(unit.path()) {
            *counts.entry(scope).or_default() += 1;
        }
    }

    let (scope, count) = counts
        .into_iter()
        .max_by(|(a, a_count), (b, b_count)| a_count.cmp(b_count).then_with(|| b.cmp(a)))?;

    (count * 2 >= considered.len()).then_some(scope)
}

fn scope_from_path(path: &Path) -> Option<String> {
    let components: Vec<&str> = path
        .components()
        .filter_map(|c| c.as_os_str().to_str())
        .collect();
    let dirs = components.split_last().map(|(_, dirs)| dirs).unwrap_or(&[]);

    let mut candidate = None;
    for (i, component) in dirs.iter().enumerate() {
        match *component {
            "src" | "lib" | "pkg" => {
                candidate = dirs.get(i + 1).copied();
                break;
            }
            "packages" | "crates" | "apps" => {
                candidate = dirs.get(i + 1).copied();
                break;
            }
            _ => {}
        }
    }

    let candidate = candidate
        .or_else(|| dirs.last().copied())
        .filter(|name| !GENERIC_DIRS.contains(name))?;

    let scope = candidate.to_lowercase();
    is_valid_scope(&scope).then_some(scope)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// Stem of a test file with the usual test markers removed.
fn test_stem(path: &Path) -> String {
    const SUFFIXES: &[&str] = &[".test", ".spec", "_test", "_tests", "_spec", "tests", "test"];

    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
    let lowered = stem.to_lowercase();
    let mut out = lowered.strip_prefix("test_").unwrap_or(&lowered);
    for suffix in SUFFIXES {
        if let Some(stripped) = out.strip_suffix(suffix) {
            if !stripped.is_empty() {
                out = stripped;
                break;
            }
        }
    }
    out.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stem_strips_markers() {
        assert_eq!(test_stem(Path::new("tests/test_parser.py")), "parser");
        assert_eq!(test_stem(Path::new("src/parser.test.ts")), "parser");
        assert_eq!(test_stem(Path::new("pkg/parser_test.go")), "parser");
        assert_eq!(test_stem(Path::new("src/ParserTest.java")), "parser");
        assert_eq!(test_stem(Path::new("tests/splitter.rs")), "splitter");
        assert_eq!(test_stem(Path::new("tests/test.rs")), "test");
    }

    #[test]
    fn scope_prefers_directory_after_src() {
        assert_eq!(
            scope_from_path(Path::new("src/services/llm/ollama.rs")).as_deref(),
            Some("services")
        );
        assert_eq!(
            scope_from_path(Path::new("crates/core/src/lib.rs")).as_deref(),
            Some("core")
        );
        assert_eq!(scope_from_path(Path::new("src/main.rs")), None);
        assert_eq!(scope_from_path(Path::new("README.md")), None);
    }

    #[test]
    fn scope_rejects_invalid_tokens() {
        assert_eq!(scope_from_path(Path::new("src/My Module/x.rs")), None);
    }
}
