// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

use super::{Category, CommitType};

#[derive(Debug)]
pub struct PromptContext {
    pub change_summary: String,
    pub file_breakdown: String,
    pub category: Category,
    pub suggested_type: CommitType,
    pub suggested_scope: Option<String>,
    pub guidelines: String,
    pub excerpts: String,
}

impl PromptContext {
    pub fn to_prompt(&self) -> String {
        format!(
            r#"Generate a conventional commit message for the following changes.

SUMMARY: {summary}
CATEGORY: {category}
FILES:
{files}
SUGGESTED TYPE: {commit_type}{scope}

RULES:
{guidelines}

DIFF EXCERPTS:
{excerpts}

Output format:
{{"type": "{commit_type}", "scope": {scope_json}, "subject": "<imperative description>", "body": null, "breaking": false, "breaking_description": null}}"#,
            summary = self.change_summary,
            category = self.category,
            files = self.file_breakdown.trim_end(),
            commit_type = self.suggested_type.as_str(),
            scope = self
                .suggested_scope
                .as_ref()
                .map(|s| format!("\nSUGGESTED SCOPE: {s}"))
                .unwrap_or_default(),
            guidelines = self.guidelines.trim_end(),
            excerpts = self.excerpts.trim_end(),
            scope_json = self
                .suggested_scope
                .as_ref()
                .map(|s| format!("\"{s}\""))
                .unwrap_or_else(|| "null".to_string()),
        )
    }
}
