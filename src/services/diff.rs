// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

//! Unified diff parsing.
//!
//! Hunk bodies are consumed by the counts announced in their `@@` header, so a
//! removed line that happens to read `-- a/foo` is never mistaken for a file
//! header. Text before the first file header (commit metadata from
//! `git show` or `git log -p`) is skipped.

use std::path::PathBuf;

use tracing::trace;

use crate::domain::{ChangeKind, DiffUnit, Hunk};
use crate::error::{Error, Result};

const DEV_NULL: &str = "/dev/null";

pub struct DiffParser;

#[derive(Debug, Default)]
struct PendingUnit {
    start_line: usize,
    header_old: Option<String>,
    header_new: Option<String>,
    minus_path: Option<String>,
    plus_path: Option<String>,
    rename_from: Option<String>,
    rename_to: Option<String>,
    new_file: bool,
    deleted_file: bool,
    is_binary: bool,
    in_binary_patch: bool,
    hunks: Vec<Hunk>,
}

#[derive(Debug)]
struct OpenHunk {
    hunk: Hunk,
    header_line: usize,
    old_remaining: usize,
    new_remaining: usize,
}

impl OpenHunk {
    fn is_complete(&self) -> bool {
        self.old_remaining == 0 && self.new_remaining == 0
    }
}

fn malformed(line: usize, reason: impl Into<String>) -> Error {
    Error::MalformedDiff {
        line,
        reason: reason.into(),
    }
}

impl DiffParser {
    /// Parse raw unified diff text into one unit per changed file, in input order.
    ///
    /// Blank input yields no units. Non-blank input without any file header,
    /// or with hunks that disagree with their headers, is rejected.
    pub fn parse(raw: &str) -> Result<Vec<DiffUnit>> {
        let mut units = Vec::new();
        let mut current: Option<PendingUnit> = None;
        let mut open: Option<OpenHunk> = None;
        let mut saw_header = false;

        for (idx, raw_line) in raw.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw_line.strip_suffix('\r').unwrap_or(raw_line);

            if let Some(hunk) = open.as_mut() {
                if !hunk.is_complete() {
                    Self::consume_hunk_line(hunk, line, line_no)?;
                    continue;
                }
                if is_stray_hunk_line(line) {
                    return Err(malformed(
                        line_no,
                        format!(
                            "more lines than the hunk header at line {} announces",
                            hunk.header_line
                        ),
                    ));
                }
                // Complete: close it and treat this line as a header line.
                if let Some(done) = open.take() {
                    Self::close_hunk(&mut current, done)?;
                }
            }

            if line.starts_with('\\') {
                // "\ No newline at end of file"
                continue;
            }

            if let Some(rest) = line.strip_prefix("diff --git ") {
                Self::flush(&mut units, current.take())?;
                let (old, new) = split_header_paths(rest);
                current = Some(PendingUnit {
                    start_line: line_no,
                    header_old: old,
                    header_new: new,
                    ..PendingUnit::default()
                });
                saw_header = true;
                continue;
            }

            if current.as_ref().is_some_and(|u| u.in_binary_patch) {
                continue;
            }

            if let Some(rest) = line.strip_prefix("--- ") {
                let starts_new = match current.as_ref() {
                    Some(unit) => unit.minus_path.is_some() || !unit.hunks.is_empty(),
                    None => true,
                };
                if starts_new {
                    Self::flush(&mut units, current.take())?;
                    current = Some(PendingUnit {
                        start_line: line_no,
                        ..PendingUnit::default()
                    });
                }
                if let Some(unit) = current.as_mut() {
                    unit.minus_path = Some(header_file_path(rest, "a/"));
                }
                saw_header = true;
                continue;
            }

            if let Some(rest) = line.strip_prefix("+++ ") {
                match current.as_mut() {
                    Some(unit) if unit.minus_path.is_some() && unit.plus_path.is_none() => {
                        unit.plus_path = Some(header_file_path(rest, "b/"));
                    }
                    _ => return Err(malformed(line_no, "'+++' header without a preceding '---'")),
                }
                continue;
            }

            if line.starts_with("@@") {
                let Some(unit) = current.as_ref() else {
                    return Err(malformed(line_no, "hunk header outside of a file diff"));
                };
                if unit.minus_path.is_none() || unit.plus_path.is_none() {
                    return Err(malformed(
                        line_no,
                        "hunk header before the '---'/'+++' file headers",
                    ));
                }
                let (old_start, old_lines, new_start, new_lines) = parse_hunk_header(line)
                    .ok_or_else(|| malformed(line_no, format!("invalid hunk header '{line}'")))?;
                open = Some(OpenHunk {
                    hunk: Hunk {
                        old_start,
                        old_lines,
                        new_start,
                        new_lines,
                        added: 0,
                        removed: 0,
                        lines: Vec::new(),
                    },
                    header_line: line_no,
                    old_remaining: old_lines,
                    new_remaining: new_lines,
                });
                continue;
            }

            match current.as_mut() {
                Some(unit) if unit.hunks.is_empty() => Self::extended_header(unit, line),
                Some(_) => trace!(line = line_no, "ignoring trailing line after hunks"),
                None => trace!(line = line_no, "skipping preamble line"),
            }
        }

        if let Some(hunk) = open.take() {
            if !hunk.is_complete() {
                return Err(malformed(
                    hunk.header_line,
                    format!(
                        "input ended inside hunk ({} old and {} new lines missing)",
                        hunk.old_remaining, hunk.new_remaining
                    ),
                ));
            }
            Self::close_hunk(&mut current, hunk)?;
        }
        Self::flush(&mut units, current.take())?;

        if !saw_header && !raw.trim().is_empty() {
            return Err(malformed(1, "no file headers found"));
        }

        Ok(units)
    }

    fn consume_hunk_line(hunk: &mut OpenHunk, line: &str, line_no: usize) -> Result<()> {
        let header_line = hunk.header_line;
        let short = |what: &str| {
            malformed(
                line_no,
                format!("{what} line exceeds the counts in hunk header at line {header_line}"),
            )
        };

        match line.chars().next() {
            Some('+') => {
                if hunk.new_remaining == 0 {
                    return Err(short("added"));
                }
                hunk.new_remaining -= 1;
                hunk.hunk.added += 1;
            }
            Some('-') => {
                if hunk.old_remaining == 0 {
                    return Err(short("removed"));
                }
                hunk.old_remaining -= 1;
                hunk.hunk.removed += 1;
            }
            // Some tools strip the single space from empty context lines.
            Some(' ') | None => {
                if hunk.old_remaining == 0 || hunk.new_remaining == 0 {
                    return Err(short("context"));
                }
                hunk.old_remaining -= 1;
                hunk.new_remaining -= 1;
            }
            Some('\\') => return Ok(()),
            Some(_) => {
                return Err(malformed(
                    line_no,
                    format!(
                        "hunk from line {header_line} ended early ({} old and {} new lines missing)",
                        hunk.old_remaining, hunk.new_remaining
                    ),
                ));
            }
        }

        let text = if line.is_empty() { " " } else { line };
        hunk.hunk.lines.push(text.to_string());
        Ok(())
    }

    fn close_hunk(current: &mut Option<PendingUnit>, open: OpenHunk) -> Result<()> {
        if open.hunk.changed_lines() == 0 {
            return Err(malformed(open.header_line, "hunk contains no added or removed lines"));
        }
        if let Some(unit) = current.as_mut() {
            unit.hunks.push(open.hunk);
        }
        Ok(())
    }

    fn extended_header(unit: &mut PendingUnit, line: &str) {
        if line.starts_with("new file mode") {
            unit.new_file = true;
        } else if line.starts_with("deleted file mode") {
            unit.deleted_file = true;
        } else if let Some(path) = line.strip_prefix("rename from ") {
            unit.rename_from = Some(unquote(path));
        } else if let Some(path) = line.strip_prefix("rename to ") {
            unit.rename_to = Some(unquote(path));
        } else if let Some(path) = line.strip_prefix("copy to ") {
            unit.new_file = true;
            unit.header_new = Some(unquote(path));
        } else if line.starts_with("Binary files ") {
            unit.is_binary = true;
        } else if line.starts_with("GIT binary patch") {
            unit.is_binary = true;
            unit.in_binary_patch = true;
        }
        // index, similarity, old/new mode lines carry nothing we model
    }

    fn flush(units: &mut Vec<DiffUnit>, pending: Option<PendingUnit>) -> Result<()> {
        let Some(p) = pending else {
            return Ok(());
        };

        if p.minus_path.is_some() && p.plus_path.is_none() {
            return Err(malformed(p.start_line, "'---' header without a following '+++'"));
        }

        let old = p
            .rename_from
            .clone()
            .or_else(|| p.minus_path.clone())
            .or_else(|| p.header_old.clone());
        let new = p
            .rename_to
            .clone()
            .or_else(|| p.plus_path.clone())
            .or_else(|| p.header_new.clone());

        let old = old.filter(|path| path != DEV_NULL);
        let new = new.filter(|path| path != DEV_NULL);

        let plus_is_null = p.plus_path.as_deref() == Some(DEV_NULL);
        let minus_is_null = p.minus_path.as_deref() == Some(DEV_NULL);

        let kind = if p.deleted_file || plus_is_null {
            ChangeKind::Deleted
        } else if p.new_file || minus_is_null {
            ChangeKind::Added
        } else if p.rename_from.is_some() || p.rename_to.is_some() {
            ChangeKind::Renamed
        } else {
            ChangeKind::Modified
        };

        let path = match kind {
            ChangeKind::Deleted => old.clone().or_else(|| new.clone()),
            _ => new.clone().or_else(|| old.clone()),
        }
        .ok_or_else(|| malformed(p.start_line, "file diff without a path"))?;

        let old_path = match kind {
            ChangeKind::Renamed => old.filter(|o| *o != path).map(PathBuf::from),
            _ => None,
        };

        let additions = p.hunks.iter().map(|h| h.added).sum();
        let deletions = p.hunks.iter().map(|h| h.removed).sum();

        units.push(DiffUnit {
            path: PathBuf::from(path),
            kind,
            old_path,
            hunks: p.hunks,
            additions,
            deletions,
            is_binary: p.is_binary,
        });
        Ok(())
    }
}

/// A body line right after a hunk whose counts are already used up.
///
/// `--- ` opens the next file of a plain diff and `-- ` is the signature
/// separator of `git format-patch`; neither counts.
fn is_stray_hunk_line(line: &str) -> bool {
    match line.chars().next() {
        Some('+') | Some(' ') => true,
        Some('-') => !line.starts_with("--- ") && line != "-- ",
        _ => false,
    }
}

/// `@@ -10,5 +10,8 @@ fn foo()` -> `(10, 5, 10, 8)`; a missing count means 1.
fn parse_hunk_header(line: &str) -> Option<(usize, usize, usize, usize)> {
    let rest = line.strip_prefix("@@ ")?;
    let end = rest.find(" @@")?;
    let mut parts = rest[..end].split_whitespace();
    let (old_start, old_lines) = parse_range(parts.next()?.strip_prefix('-')?)?;
    let (new_start, new_lines) = parse_range(parts.next()?.strip_prefix('+')?)?;
    if parts.next().is_some() {
        return None;
    }
    Some((old_start, old_lines, new_start, new_lines))
}

fn parse_range(spec: &str) -> Option<(usize, usize)> {
    match spec.split_once(',') {
        Some((start, count)) => Some((start.parse().ok()?, count.parse().ok()?)),
        None => Some((spec.parse().ok()?, 1)),
    }
}

/// Path from a `---`/`+++` line, without timestamp suffix or `a/`/`b/` prefix.
fn header_file_path(rest: &str, prefix: &str) -> String {
    let path = rest.split('\t').next().unwrap_or(rest).trim_end();
    let path = unquote(path);
    if path == DEV_NULL {
        return path;
    }
    match path.strip_prefix(prefix) {
        Some(stripped) => stripped.to_string(),
        None => path,
    }
}

/// Split the `a/<old> b/<new>` tail of a `diff --git` line.
fn split_header_paths(rest: &str) -> (Option<String>, Option<String>) {
    let rest = rest.trim_end();

    if rest.starts_with('"') {
        let mut parts = quoted_parts(rest).into_iter();
        let old = parts.next().map(|p| strip_any(&p, "a/"));
        let new = parts.next().map(|p| strip_any(&p, "b/"));
        return (old, new);
    }

    // Identical old/new paths are the common case: prefer the split at the midpoint.
    let candidates: Vec<usize> = rest.match_indices(" b/").map(|(i, _)| i).collect();
    let split = candidates
        .iter()
        .copied()
        .find(|&i| rest[..i].strip_prefix("a/") == Some(&rest[i + 3..]))
        .or_else(|| candidates.first().copied());

    match split {
        Some(i) => (
            Some(strip_any(&rest[..i], "a/")),
            Some(rest[i + 3..].to_string()),
        ),
        None => match rest.split_once(' ') {
            Some((old, new)) => (Some(old.to_string()), Some(new.to_string())),
            None => (None, None),
        },
    }
}

fn strip_any(path: &str, prefix: &str) -> String {
    path.strip_prefix(prefix).unwrap_or(path).to_string()
}

fn unquote(path: &str) -> String {
    if path.len() >= 2 && path.starts_with('"') && path.ends_with('"') {
        quoted_parts(path).into_iter().next().unwrap_or_default()
    } else {
        path.to_string()
    }
}

/// Minimal C-style unquoting for git's quoted path form.
fn quoted_parts(s: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '"' {
            continue;
        }
        let mut part = String::new();
        while let Some(c) = chars.next() {
            match c {
                '"' => break,
                '\\' => match chars.next() {
                    Some('t') => part.push('\t'),
                    Some('n') => part.push('\n'),
                    Some(other) => part.push(other),
                    None => {}
                },
                other => part.push(other),
            }
        }
        parts.push(part);
        while chars.peek() == Some(&' ') {
            chars.next();
        }
    }

    parts
}
