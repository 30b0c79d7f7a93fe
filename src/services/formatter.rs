// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

use std::sync::LazyLock;

use regex::Regex;

use crate::domain::{CommitMessage, CommitType};

static HEADER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<type>[A-Za-z]+)(?:\((?P<scope>[^()]*)\))?(?P<bang>!)?:(?P<rest>.*)$")
        .unwrap()
});

static SCOPE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9._/-]*$").unwrap());

static TRAILER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9-]*(?:: | #)\S").unwrap());

const MAX_SCOPE_LEN: usize = 32;

/// Body lines longer than this are re-flowed.
pub const BODY_WRAP_WIDTH: usize = 72;

const BREAKING_TOKENS: &[&str] = &["BREAKING CHANGE:", "BREAKING-CHANGE:"];

/// A single reason a commit message is not a valid conventional commit.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Violation {
    #[error("missing header, expected `type(scope): subject`")]
    MissingHeader,

    #[error("unknown commit type '{}', expected one of: {}", .0, CommitType::ALL.join(", "))]
    UnknownType(String),

    #[error("subject is empty")]
    EmptySubject,

    #[error("subject must not end with a period")]
    SubjectEndsWithPeriod,

    #[error("subject is {len} characters, maximum is {max}")]
    SubjectTooLong { len: usize, max: usize },

    #[error("subject must start with a lowercase letter")]
    SubjectNotLowercase,

    #[error("subject must be a single line without surrounding whitespace")]
    MalformedSubject,

    #[error("invalid scope '{0}', use a short lowercase token like `api` or `core/db`")]
    InvalidScope(String),

    #[error("body must be separated from the header by a blank line")]
    BodyNotSeparated,

    #[error("body must not be blank or end with a BREAKING CHANGE footer")]
    MalformedBody,

    #[error("BREAKING CHANGE footer has no description")]
    EmptyBreakingDescription,

    #[error("breaking description given but the message is not marked breaking")]
    BreakingDescriptionWithoutFlag,
}

pub fn is_valid_scope(scope: &str) -> bool {
    scope.len() <= MAX_SCOPE_LEN && SCOPE_REGEX.is_match(scope)
}

/// Conventional commit grammar: rendering and validation share these rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Formatter {
    max_subject_len: usize,
    lowercase_subject: bool,
}

impl Default for Formatter {
    fn default() -> Self {
        Self::new(50, true)
    }
}

impl Formatter {
    pub fn new(max_subject_len: usize, lowercase_subject: bool) -> Self {
        Self {
            max_subject_len,
            lowercase_subject,
        }
    }

    pub fn max_subject_len(&self) -> usize {
        self.max_subject_len
    }

    /// Render `type(scope)!: subject`, the body and a breaking footer.
    pub fn render(message: &CommitMessage) -> String {
        let mut out = message.header();

        if let Some(body) = &message.body {
            out.push_str("\n\n");
            out.push_str(body);
        }

        if message.breaking
            && let Some(description) = &message.breaking_description
        {
            out.push_str("\n\nBREAKING CHANGE: ");
            out.push_str(description);
        }

        out
    }

    /// Re-flow long prose lines to [`BODY_WRAP_WIDTH`] columns. Fenced code,
    /// indented lines, list items and trailers are kept as written.
    pub fn wrap_body(body: &str) -> String {
        let mut out: Vec<String> = Vec::new();
        let mut in_fence = false;

        for line in body.lines() {
            let fence = line.trim_start().starts_with("```");
            let keep = fence
                || in_fence
                || line.starts_with("  ")
                || line.starts_with('\t')
                || line.starts_with("- ")
                || line.starts_with("* ")
                || is_trailer_line(line)
                || line.chars().count() <= BODY_WRAP_WIDTH;
            if fence {
                in_fence = !in_fence;
            }

            if keep {
                out.push(line.to_string());
                continue;
            }

            let mut current = String::new();
            for word in line.split_whitespace() {
                if !current.is_empty()
                    && current.chars().count() + 1 + word.chars().count() > BODY_WRAP_WIDTH
                {
                    out.push(std::mem::take(&mut current));
                }
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(word);
            }
            if !current.is_empty() {
                out.push(current);
            }
        }

        out.join("\n")
    }

    pub fn render_parts(
        commit_type: CommitType,
        scope: Option<&str>,
        subject: &str,
        body: Option<&str>,
        breaking: bool,
    ) -> String {
        let mut message = CommitMessage::new(commit_type, subject);
        message.scope = scope.map(str::to_string);
        message.body = body.map(str::to_string);
        message.breaking = breaking;
        Self::render(&message)
    }

    /// Every rule the structured message breaks; empty means valid.
    pub fn check(&self, message: &CommitMessage) -> Vec<Violation> {
        let mut violations = Vec::new();
        let subject = &message.subject;

        if subject.is_empty() {
            violations.push(Violation::EmptySubject);
        } else {
            if subject.trim() != subject || subject.contains(['\n', '\r']) {
                violations.push(Violation::MalformedSubject);
            }
            if subject.ends_with('.') {
                violations.push(Violation::SubjectEndsWithPeriod);
            }
            if self.lowercase_subject && subject.chars().next().is_some_and(char::is_uppercase) {
                violations.push(Violation::SubjectNotLowercase);
            }
            let len = subject.chars().count();
            if len > self.max_subject_len {
                violations.push(Violation::SubjectTooLong {
                    len,
                    max: self.max_subject_len,
                });
            }
        }

        if let Some(scope) = &message.scope
            && !is_valid_scope(scope)
        {
            violations.push(Violation::InvalidScope(scope.clone()));
        }

        if let Some(body) = &message.body
            && (body.trim() != body
                || body.is_empty()
                || body.contains('\r')
                || footer_block_is_breaking(body))
        {
            violations.push(Violation::MalformedBody);
        }

        match &message.breaking_description {
            Some(_) if !message.breaking => {
                violations.push(Violation::BreakingDescriptionWithoutFlag);
            }
            Some(description)
                if description.trim().is_empty()
                    || description.trim() != description
                    || description.contains("\n\n")
                    || description.contains('\r') =>
            {
                violations.push(Violation::EmptyBreakingDescription);
            }
            _ => {}
        }

        violations
    }

    /// Parse commit text into a structured message, or report every violation.
    pub fn validate(&self, text: &str) -> Result<CommitMessage, Vec<Violation>> {
        let text = text.trim();
        let mut lines = text.lines();
        let header = lines.next().unwrap_or("");

        let Some(caps) = HEADER_REGEX.captures(header) else {
            return Err(vec![Violation::MissingHeader]);
        };

        let mut violations = Vec::new();

        let type_str = &caps["type"];
        let commit_type = CommitType::parse(type_str).unwrap_or_else(|| {
            violations.push(Violation::UnknownType(type_str.to_string()));
            CommitType::Chore
        });

        let rest = &caps["rest"];
        let subject = if rest.is_empty() {
            ""
        } else if let Some(subject) = rest.strip_prefix(' ') {
            subject
        } else {
            return Err(vec![Violation::MissingHeader]);
        };

        let remaining: Vec<&str> = lines.collect();
        if remaining.first().is_some_and(|line| !line.trim().is_empty()) {
            violations.push(Violation::BodyNotSeparated);
        }

        let (body, footer) = split_breaking_footer(&remaining);

        let mut message = CommitMessage::new(commit_type, subject);
        message.scope = caps.name("scope").map(|m| m.as_str().to_string());
        message.body = body;
        message.breaking = caps.name("bang").is_some() || footer.is_some();

        if let Some(description) = footer {
            if description.is_empty() {
                violations.push(Violation::EmptyBreakingDescription);
            } else {
                message.breaking_description = Some(description);
            }
        }

        violations.extend(self.check(&message));

        if violations.is_empty() {
            Ok(message)
        } else {
            Err(violations)
        }
    }
}

fn strip_breaking(text: &str) -> Option<&str> {
    BREAKING_TOKENS.iter().find_map(|t| text.strip_prefix(t))
}

fn is_trailer_line(line: &str) -> bool {
    strip_breaking(line).is_some() || TRAILER_REGEX.is_match(line)
}

/// A paragraph made only of `Token: value` or `Token #value` lines, or one
/// that opens with a breaking token.
fn is_footer_paragraph(paragraph: &str) -> bool {
    strip_breaking(paragraph).is_some() || paragraph.lines().all(is_trailer_line)
}

fn split_paragraphs(text: &str) -> Vec<&str> {
    text.split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

/// Index of the first paragraph of the trailing footer block.
fn footer_start(paragraphs: &[&str]) -> usize {
    paragraphs
        .iter()
        .rposition(|p| !is_footer_paragraph(p))
        .map_or(0, |idx| idx + 1)
}

fn footer_block_is_breaking(body: &str) -> bool {
    let paragraphs = split_paragraphs(body);
    paragraphs[footer_start(&paragraphs)..]
        .iter()
        .any(|p| p.lines().any(|line| strip_breaking(line).is_some()))
}

/// Split the lines after the header into the body and the description of the
/// first `BREAKING CHANGE:` footer in the trailing footer block. Other footers
/// stay in the body.
fn split_breaking_footer(lines: &[&str]) -> (Option<String>, Option<String>) {
    let joined = lines.join("\n");
    let mut paragraphs: Vec<String> = split_paragraphs(&joined)
        .into_iter()
        .map(str::to_string)
        .collect();
    if paragraphs.is_empty() {
        return (None, None);
    }

    let start = {
        let borrowed: Vec<&str> = paragraphs.iter().map(String::as_str).collect();
        footer_start(&borrowed)
    };

    let mut description = None;
    for paragraph in &mut paragraphs[start..] {
        if paragraph.lines().all(is_trailer_line) {
            let mut rest: Vec<String> = Vec::new();
            for line in paragraph.lines() {
                match strip_breaking(line) {
                    Some(text) if description.is_none() => {
                        description = Some(text.trim().to_string());
                    }
                    _ => rest.push(line.to_string()),
                }
            }
            if description.is_some() {
                *paragraph = rest.join("\n");
                break;
            }
        } else if let Some(text) = strip_breaking(paragraph) {
            description = Some(text.trim().to_string());
            paragraph.clear();
            break;
        }
    }

    paragraphs.retain(|p| !p.is_empty());
    let body = (!paragraphs.is_empty()).then(|| paragraphs.join("\n\n"));
    (body, description)
}
