// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

use std::fmt::Write as _;

use crate::config::Tone;
use crate::domain::{ChangeKind, ClassifiedUnit, CommitType, Partition, PromptContext};
use crate::services::generator::GenerationSettings;

const SYSTEM_PROMPT_RESERVE: usize = 2_000;
const MIN_EXCERPT_BUDGET: usize = 1_000;

/// Lock files to skip content for (just show that they changed)
const SKIP_CONTENT_FILES: &[&str] = &[
    "Cargo.lock",
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "bun.lockb",
    "go.sum",
    "Gemfile.lock",
    "poetry.lock",
    "composer.lock",
];

pub struct ContextBuilder;

impl ContextBuilder {
    pub fn build(partition: &Partition, settings: &GenerationSettings) -> PromptContext {
        let change_summary = Self::summarize_changes(partition);
        let file_breakdown = Self::format_files(partition);
        let guidelines = Self::guidelines(settings);

        let used = SYSTEM_PROMPT_RESERVE
            + change_summary.len()
            + file_breakdown.len()
            + guidelines.len();
        let budget = settings
            .max_context_chars
            .saturating_sub(used)
            .max(MIN_EXCERPT_BUDGET);

        let excerpts = Self::excerpts(partition, settings.max_hunk_lines, budget);

        PromptContext {
            change_summary,
            file_breakdown,
            category: partition.dominant,
            suggested_type: partition.commit_type,
            suggested_scope: partition.scope.clone().filter(|_| settings.include_scope),
            guidelines,
            excerpts,
        }
    }

    fn summarize_changes(partition: &Partition) -> String {
        let count = |kind: ChangeKind| {
            partition
                .units
                .iter()
                .filter(|u| u.unit.kind == kind)
                .count()
        };

        let mut parts = Vec::new();
        for (kind, label) in [
            (ChangeKind::Added, "added"),
            (ChangeKind::Modified, "modified"),
            (ChangeKind::Deleted, "deleted"),
            (ChangeKind::Renamed, "renamed"),
        ] {
            let n = count(kind);
            if n > 0 {
                parts.push(format!("{n} {label}"));
            }
        }

        format!(
            "{} file{} changed ({}), +{} -{} lines",
            partition.units.len(),
            if partition.units.len() == 1 { "" } else { "s" },
            parts.join(", "),
            partition.additions,
            partition.deletions
        )
    }

    fn format_files(partition: &Partition) -> String {
        let mut out = String::new();
        for unit in &partition.units {
            let _ = writeln!(out, "{}", Self::describe_unit(unit));
        }
        out
    }

    fn describe_unit(unit: &ClassifiedUnit) -> String {
        let path = match &unit.unit.old_path {
            Some(old) if unit.unit.kind == ChangeKind::Renamed => {
                format!("{} -> {}", old.display(), unit.path().display())
            }
            _ => unit.path().display().to_string(),
        };

        let delta = if unit.unit.is_binary {
            "binary".to_string()
        } else {
            format!("+{} -{}", unit.unit.additions, unit.unit.deletions)
        };

        format!(
            "{} {} ({}) [{}]",
            unit.unit.kind.marker(),
            path,
            delta,
            unit.category()
        )
    }

    fn guidelines(settings: &GenerationSettings) -> String {
        let mut rules = vec![
            format!("- type: one of {}", CommitType::ALL.join(", ")),
            format!(
                "- subject: imperative mood, at most {} characters, no trailing period",
                settings.max_subject_len
            ),
        ];

        if settings.lowercase_subject {
            rules.push("- subject: start with a lowercase letter".to_string());
        }

        if settings.include_scope {
            rules.push(
                "- scope: a short lowercase token (letters, digits, . _ / -) or null".to_string(),
            );
        } else {
            rules.push("- scope: null".to_string());
        }

        match (settings.include_body, settings.tone) {
            (false, _) => rules.push("- body: null".to_string()),
            (true, Tone::Concise) => rules.push(
                "- body: null unless the change needs explanation; then one short paragraph"
                    .to_string(),
            ),
            (true, Tone::Detailed) => rules.push(
                "- body: explain what changed and why, wrapped at 72 columns".to_string(),
            ),
        }

        rules.push(
            "- breaking: true only when the change breaks existing users; describe the break in breaking_description"
                .to_string(),
        );

        if !settings.locale.eq_ignore_ascii_case("en") {
            rules.push(format!(
                "- write subject and body in the '{}' locale; keep type and scope in English",
                settings.locale
            ));
        }

        rules.join("\n")
    }

    /// Hunk excerpts within `budget` characters, each hunk capped at `max_hunk_lines`.
    fn excerpts(partition: &Partition, max_hunk_lines: usize, budget: usize) -> String {
        let mut out = String::new();
        let mut omitted = 0usize;

        for unit in &partition.units {
            let name = unit
                .path()
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("");
            if unit.unit.is_binary || SKIP_CONTENT_FILES.contains(&name) {
                continue;
            }

            let mut section = format!("--- {} ---\n", unit.path().display());
            for hunk in &unit.unit.hunks {
                let _ = writeln!(
                    section,
                    "@@ -{},{} +{},{} @@",
                    hunk.old_start, hunk.old_lines, hunk.new_start, hunk.new_lines
                );
                for line in hunk.lines.iter().take(max_hunk_lines) {
                    section.push_str(line);
                    section.push('\n');
                }
                if hunk.lines.len() > max_hunk_lines {
                    let _ = writeln!(
                        section,
                        "... ({} more lines)",
                        hunk.lines.len() - max_hunk_lines
                    );
                }
            }

            if out.len() + section.len() > budget {
                omitted += 1;
                continue;
            }
            out.push_str(&section);
        }

        if omitted > 0 {
            let _ = writeln!(out, "... ({omitted} file(s) omitted to fit the context budget)");
        }

        out
    }
}
