// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Structured commit message from the provider (preferred format)
#[derive(Debug, Deserialize, Serialize)]
pub struct StructuredCommit {
    #[serde(rename = "type")]
    pub commit_type: String,
    #[serde(default)]
    pub scope: Option<String>,
    pub subject: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub breaking: bool,
    #[serde(default)]
    pub breaking_description: Option<String>,
}

impl StructuredCommit {
    /// Lay the fields out as commit text. Values are only trimmed; the
    /// formatter decides whether the result is valid.
    pub fn to_text(&self) -> String {
        let mut header = self.commit_type.trim().to_string();
        if let Some(scope) = non_empty(&self.scope) {
            header.push('(');
            header.push_str(scope);
            header.push(')');
        }
        if self.breaking {
            header.push('!');
        }
        header.push_str(": ");
        header.push_str(self.subject.trim());

        let mut text = header;
        if let Some(body) = non_empty(&self.body) {
            text.push_str("\n\n");
            text.push_str(body);
        }
        if self.breaking
            && let Some(description) = non_empty(&self.breaking_description)
        {
            text.push_str("\n\nBREAKING CHANGE: ");
            text.push_str(description);
        }
        text
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

static CODE_FENCE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```[A-Za-z]*\r?\n?([\s\S]*?)```").unwrap());

static PREAMBLE_PATTERNS: &[&str] = &[
    "here's the commit message",
    "here is the commit message",
    "here's a commit message",
    "here is a commit message",
    "commit message:",
    "suggested commit:",
];

pub struct CommitSanitizer;

impl CommitSanitizer {
    /// Strip wrapping noise from raw provider output and return the candidate
    /// commit text. Never repairs the message itself.
    pub fn extract(raw: &str) -> String {
        if let Some(structured) = Self::try_parse_json(raw) {
            return structured.to_text();
        }

        Self::clean_text(raw)
    }

    fn try_parse_json(raw: &str) -> Option<StructuredCommit> {
        let trimmed = raw.trim();

        if trimmed.starts_with('{') {
            return serde_json::from_str(trimmed).ok();
        }

        // JSON inside a code fence
        if let Some(caps) = CODE_FENCE_REGEX.captures(trimmed) {
            let content = caps[1].trim();
            if content.starts_with('{') {
                return serde_json::from_str(content).ok();
            }
        }

        // JSON object after a chatty preamble
        let start = trimmed.find('{')?;
        let end = trimmed.rfind('}')?;
        if end > start {
            return serde_json::from_str(&trimmed[start..=end]).ok();
        }

        None
    }

    fn clean_text(raw: &str) -> String {
        let mut cleaned = match CODE_FENCE_REGEX.captures(raw) {
            Some(caps) => caps[1].trim().to_string(),
            None => raw.trim().to_string(),
        };

        let lower = cleaned.to_lowercase();
        for pattern in PREAMBLE_PATTERNS {
            if let Some(pos) = lower.find(pattern) {
                // Only strip when the preamble precedes the message on its own.
                if lower[..pos].trim().is_empty()
                    && let Some(after) = cleaned.get(pos + pattern.len()..)
                {
                    cleaned = after.trim_start_matches(':').trim().to_string();
                    break;
                }
            }
        }

        for quote in ['"', '\'', '`'] {
            if cleaned.len() >= 2 && cleaned.starts_with(quote) && cleaned.ends_with(quote) {
                cleaned = cleaned[1..cleaned.len() - 1].trim().to_string();
            }
        }

        cleaned
    }
}
