// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use commitsplit::domain::{
    ChangeKind, Classification, ClassifiedUnit, CommitMessage, DiffUnit, Hunk, Partition,
};
use commitsplit::error::{Error, Result};
use commitsplit::services::approval::{Approver, CommitCreator, Decision, Recovery};
use commitsplit::services::classifier::Classifier;
use commitsplit::services::formatter::Violation;
use commitsplit::services::generator::GenerationSettings;
use commitsplit::services::llm::{GenerationRequest, LlmProvider};
use commitsplit::services::splitter::CommitSplitter;

/// A modified file whose single hunk adds `additions` and removes `deletions` lines.
#[allow(dead_code)]
pub fn make_unit(path: &str, kind: ChangeKind, additions: usize, deletions: usize) -> DiffUnit {
    let mut lines = Vec::new();
    lines.extend((0..deletions).map(|i| format!("-old line {i}")));
    lines.extend((0..additions).map(|i| format!("+new line {i}")));

    let hunks = if additions + deletions == 0 {
        Vec::new()
    } else {
        vec![Hunk {
            old_start: 1,
            old_lines: deletions,
            new_start: 1,
            new_lines: additions,
            added: additions,
            removed: deletions,
            lines,
        }]
    };

    DiffUnit {
        path: PathBuf::from(path),
        kind,
        old_path: None,
        hunks,
        additions,
        deletions,
        is_binary: false,
    }
}

/// Classify with the built-in rules.
#[allow(dead_code)]
pub fn classified(unit: DiffUnit) -> ClassifiedUnit {
    let classification: Classification = Classifier::default().classify(&unit);
    ClassifiedUnit {
        unit,
        classification,
    }
}

#[allow(dead_code)]
pub fn make_partition(units: Vec<DiffUnit>) -> Partition {
    CommitSplitter::build_partition(units.into_iter().map(classified).collect())
}

/// Settings with millisecond timings so retry paths run fast.
#[allow(dead_code)]
pub fn fast_settings() -> GenerationSettings {
    GenerationSettings {
        timeout: Duration::from_millis(200),
        backoff_initial: Duration::from_millis(1),
        ..GenerationSettings::default()
    }
}

/// One scripted reply from [`MockProvider`].
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Fail(String),
    Hang,
}

/// Provider that replays scripted replies and records every prompt it sees.
#[allow(dead_code)]
pub struct MockProvider {
    replies: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    pub calls: Arc<AtomicU32>,
    pub prompts: Arc<Mutex<Vec<String>>>,
}

#[allow(dead_code)]
impl MockProvider {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            fallback: Reply::Fail("no scripted reply left".into()),
            calls: Arc::new(AtomicU32::new(0)),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Answer every call with the same reply.
    pub fn always(reply: Reply) -> Self {
        Self {
            fallback: reply,
            ..Self::new(Vec::new())
        }
    }

    pub fn texts(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Reply::Text(t.to_string())).collect())
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .unwrap()
            .push(request.prompt.clone());

        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        match reply {
            Reply::Text(text) => Ok(text),
            Reply::Fail(message) => Err(Error::Provider {
                provider: "mock".into(),
                message,
            }),
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(String::new())
            }
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Records commits in memory; optionally fails the first `fail_first` calls.
#[allow(dead_code)]
#[derive(Default)]
pub struct MockCommitter {
    pub commits: Mutex<Vec<(String, Vec<PathBuf>)>>,
    pub fail_first: AtomicU32,
}

#[async_trait]
impl CommitCreator for MockCommitter {
    async fn create_commit(&self, message: &str, paths: &[PathBuf]) -> Result<String> {
        if self
            .fail_first
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(Error::CommitCreation {
                message: "index.lock exists".into(),
            });
        }

        let mut commits = self.commits.lock().unwrap();
        commits.push((message.to_string(), paths.to_vec()));
        Ok(format!("c{}", commits.len()))
    }
}

/// Replays decisions and recoveries in order; approves or skips when the script runs out.
#[allow(dead_code)]
#[derive(Default)]
pub struct ScriptedApprover {
    pub decisions: VecDeque<Decision>,
    pub recoveries: VecDeque<Recovery>,
    pub reviewed: Vec<CommitMessage>,
    pub errors: Vec<String>,
    pub invalid_edits: Vec<Vec<Violation>>,
}

#[allow(dead_code)]
impl ScriptedApprover {
    pub fn new(decisions: Vec<Decision>, recoveries: Vec<Recovery>) -> Self {
        Self {
            decisions: decisions.into(),
            recoveries: recoveries.into(),
            ..Self::default()
        }
    }
}

impl Approver for ScriptedApprover {
    fn review(
        &mut self,
        _partition: &Partition,
        _index: usize,
        _total: usize,
        message: &CommitMessage,
    ) -> Result<Decision> {
        self.reviewed.push(message.clone());
        Ok(self.decisions.pop_front().unwrap_or(Decision::Approve))
    }

    fn recover(&mut self, _partition: &Partition, error: &Error) -> Result<Recovery> {
        self.errors.push(error.to_string());
        Ok(self.recoveries.pop_front().unwrap_or(Recovery::Skip))
    }

    fn invalid_edit(&mut self, violations: &[Violation]) {
        self.invalid_edits.push(violations.to_vec());
    }
}
