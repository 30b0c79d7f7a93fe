// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

mod helpers;

use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use commitsplit::domain::{ChangeKind, Partition};
use commitsplit::error::Result;
use commitsplit::services::approval::{
    ApprovalWorkflow, AutoApprover, CommitCreator, Decision, DryRunCommitter, PartitionOutcome,
    Recovery, RunReport, RunStatus,
};
use commitsplit::services::generator::MessageGenerator;
use helpers::{
    MockCommitter, MockProvider, Reply, ScriptedApprover, fast_settings, make_partition,
    make_unit,
};

const CACHE: &str = r#"{"type": "feat", "scope": "cache", "subject": "add lru eviction"}"#;
const DOCS: &str = r#"{"type": "docs", "subject": "describe cache sizing"}"#;
const BUILD: &str = r#"{"type": "build", "subject": "add lru dependency"}"#;

fn partitions() -> Vec<Partition> {
    vec![
        make_partition(vec![make_unit("src/cache/lru.rs", ChangeKind::Added, 120, 0)]),
        make_partition(vec![make_unit("docs/cache.md", ChangeKind::Modified, 30, 4)]),
        make_partition(vec![make_unit("Cargo.toml", ChangeKind::Modified, 2, 0)]),
    ]
}

async fn run(
    provider: MockProvider,
    committer: &dyn CommitCreator,
    approver: &mut ScriptedApprover,
    partitions: &[Partition],
    cancel: CancellationToken,
) -> RunReport {
    let generator = MessageGenerator::new(Box::new(provider), fast_settings());
    ApprovalWorkflow::new(
        &generator,
        committer,
        approver,
        Duration::from_secs(5),
        cancel,
    )
    .run(partitions)
    .await
    .unwrap()
}

/// Cancels the run as soon as the first commit is recorded.
struct CancellingCommitter {
    inner: MockCommitter,
    cancel: CancellationToken,
}

#[async_trait]
impl CommitCreator for CancellingCommitter {
    async fn create_commit(&self, message: &str, paths: &[PathBuf]) -> Result<String> {
        let id = self.inner.create_commit(message, paths).await?;
        self.cancel.cancel();
        Ok(id)
    }
}

// ─── Happy path ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn approves_and_commits_in_order() {
    let committer = MockCommitter::default();
    let mut approver = ScriptedApprover::default();
    let report = run(
        MockProvider::texts(&[CACHE, DOCS, BUILD]),
        &committer,
        &mut approver,
        &partitions(),
        CancellationToken::new(),
    )
    .await;

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.committed(), 3);

    let commits = committer.commits.lock().unwrap();
    let messages: Vec<&str> = commits.iter().map(|(m, _)| m.as_str()).collect();
    assert_eq!(
        messages,
        vec![
            "feat(cache): add lru eviction",
            "docs: describe cache sizing",
            "build: add lru dependency"
        ]
    );
    assert_eq!(commits[0].1, vec![PathBuf::from("src/cache/lru.rs")]);
    assert_eq!(commits[2].1, vec![PathBuf::from("Cargo.toml")]);
    assert_eq!(
        report.outcomes[0],
        PartitionOutcome::Committed {
            id: "c1".into(),
            message: "feat(cache): add lru eviction".into()
        }
    );
}

#[tokio::test]
async fn dry_run_commits_nothing() {
    let committer = DryRunCommitter::default();
    let generator = MessageGenerator::new(
        Box::new(MockProvider::texts(&[CACHE, DOCS, BUILD])),
        fast_settings(),
    );
    let mut approver = AutoApprover;
    let report = ApprovalWorkflow::new(
        &generator,
        &committer,
        &mut approver,
        Duration::from_secs(5),
        CancellationToken::new(),
    )
    .run(&partitions())
    .await
    .unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    assert!(matches!(
        &report.outcomes[2],
        PartitionOutcome::Committed { id, .. } if id == "dry-run-3"
    ));
}

// ─── Review decisions ────────────────────────────────────────────────────────

#[tokio::test]
async fn edited_message_is_committed() {
    let committer = MockCommitter::default();
    let mut approver = ScriptedApprover::new(
        vec![Decision::Edit("feat(cache): add bounded lru cache".into())],
        Vec::new(),
    );
    let parts = partitions();
    let report = run(
        MockProvider::texts(&[CACHE]),
        &committer,
        &mut approver,
        &parts[..1],
        CancellationToken::new(),
    )
    .await;

    assert_eq!(
        report.outcomes[0],
        PartitionOutcome::EditedAndCommitted {
            id: "c1".into(),
            message: "feat(cache): add bounded lru cache".into()
        }
    );
}

#[tokio::test]
async fn invalid_edit_keeps_the_prior_message() {
    let committer = MockCommitter::default();
    let mut approver = ScriptedApprover::new(
        vec![Decision::Edit("Added stuff.".into()), Decision::Approve],
        Vec::new(),
    );
    let parts = partitions();
    let report = run(
        MockProvider::texts(&[CACHE]),
        &committer,
        &mut approver,
        &parts[..1],
        CancellationToken::new(),
    )
    .await;

    assert_eq!(approver.invalid_edits.len(), 1);
    assert_eq!(approver.reviewed.len(), 2);
    assert_eq!(approver.reviewed[0], approver.reviewed[1]);
    assert!(matches!(
        &report.outcomes[0],
        PartitionOutcome::Committed { message, .. } if message == "feat(cache): add lru eviction"
    ));
}

#[tokio::test]
async fn regenerate_sends_feedback() {
    let provider = MockProvider::texts(&[
        CACHE,
        r#"{"type": "feat", "scope": "cache", "subject": "add lru eviction policy"}"#,
    ]);
    let prompts = provider.prompts.clone();
    let committer = MockCommitter::default();
    let mut approver = ScriptedApprover::new(
        vec![
            Decision::Regenerate {
                feedback: Some("say policy".into()),
            },
            Decision::Approve,
        ],
        Vec::new(),
    );
    let parts = partitions();
    let report = run(
        provider,
        &committer,
        &mut approver,
        &parts[..1],
        CancellationToken::new(),
    )
    .await;

    assert_eq!(approver.reviewed.len(), 2);
    assert!(prompts.lock().unwrap()[1].contains("say policy"));
    assert!(matches!(
        &report.outcomes[0],
        PartitionOutcome::Committed { message, .. } if message == "feat(cache): add lru eviction policy"
    ));
}

#[tokio::test]
async fn retry_after_failed_regeneration_keeps_feedback() {
    let provider = MockProvider::texts(&[
        CACHE,
        "nope",
        "still nope",
        "never",
        r#"{"type": "feat", "scope": "cache", "subject": "add lru eviction policy"}"#,
    ]);
    let prompts = provider.prompts.clone();
    let committer = MockCommitter::default();
    let mut approver = ScriptedApprover::new(
        vec![
            Decision::Regenerate {
                feedback: Some("say policy".into()),
            },
            Decision::Approve,
        ],
        vec![Recovery::Retry],
    );
    let parts = partitions();
    let report = run(
        provider,
        &committer,
        &mut approver,
        &parts[..1],
        CancellationToken::new(),
    )
    .await;

    let prompts = prompts.lock().unwrap();
    assert_eq!(prompts.len(), 5);
    assert!(!prompts[0].contains("say policy"));
    assert!(prompts[4].contains("say policy"));
    assert_eq!(approver.errors.len(), 1);
    assert_eq!(report.status, RunStatus::Completed);
}

// ─── Cancellation ────────────────────────────────────────────────────────────

#[tokio::test]
async fn cancel_after_first_commit_keeps_it() {
    let provider = MockProvider::texts(&[CACHE, DOCS, BUILD]);
    let calls = provider.calls.clone();
    let cancel = CancellationToken::new();
    let committer = CancellingCommitter {
        inner: MockCommitter::default(),
        cancel: cancel.clone(),
    };
    let mut approver = ScriptedApprover::default();
    let report = run(provider, &committer, &mut approver, &partitions(), cancel).await;

    assert_eq!(report.status, RunStatus::PartialSuccess);
    assert_eq!(report.committed(), 1);
    assert_eq!(committer.inner.commits.lock().unwrap().len(), 1);
    assert_eq!(report.outcomes[1], PartitionOutcome::NotReached);
    assert_eq!(report.outcomes[2], PartitionOutcome::NotReached);
    // Partitions 2 and 3 were never sent to the provider.
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn reviewer_cancel_stops_the_run() {
    let provider = MockProvider::texts(&[CACHE, DOCS, BUILD]);
    let calls = provider.calls.clone();
    let committer = MockCommitter::default();
    let mut approver = ScriptedApprover::new(vec![Decision::Approve, Decision::Cancel], Vec::new());
    let report = run(
        provider,
        &committer,
        &mut approver,
        &partitions(),
        CancellationToken::new(),
    )
    .await;

    assert_eq!(report.status, RunStatus::PartialSuccess);
    assert_eq!(committer.commits.lock().unwrap().len(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(report.outcomes[2], PartitionOutcome::NotReached);
}

#[tokio::test]
async fn cancel_before_anything_reports_cancelled() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let committer = MockCommitter::default();
    let mut approver = ScriptedApprover::default();
    let report = run(
        MockProvider::texts(&[CACHE]),
        &committer,
        &mut approver,
        &partitions(),
        cancel,
    )
    .await;

    assert_eq!(report.status, RunStatus::Cancelled);
    assert!(
        report
            .outcomes
            .iter()
            .all(|o| *o == PartitionOutcome::NotReached)
    );
}

// ─── Partition-local failures ────────────────────────────────────────────────

#[tokio::test]
async fn exhausted_partition_is_skipped_and_run_continues() {
    let provider = MockProvider::texts(&["nope", "still nope", "never", DOCS]);
    let committer = MockCommitter::default();
    let mut approver = ScriptedApprover::default();
    let parts = partitions();
    let report = run(
        provider,
        &committer,
        &mut approver,
        &parts[..2],
        CancellationToken::new(),
    )
    .await;

    assert_eq!(report.outcomes[0], PartitionOutcome::Skipped);
    assert!(report.outcomes[1].is_committed());
    assert_eq!(report.status, RunStatus::PartialSuccess);
    assert_eq!(approver.errors.len(), 1);
    assert!(approver.errors[0].contains("src/cache/lru.rs"));
}

#[tokio::test]
async fn all_groups_skipped_is_not_a_cancellation() {
    let provider = MockProvider::always(Reply::Text("not json at all".into()));
    let committer = MockCommitter::default();
    let mut approver = ScriptedApprover::default();
    let report = run(
        provider,
        &committer,
        &mut approver,
        &partitions(),
        CancellationToken::new(),
    )
    .await;

    assert!(report.outcomes.iter().all(|o| *o == PartitionOutcome::Skipped));
    assert_eq!(report.status, RunStatus::NothingCommitted);
    assert_eq!(report.committed(), 0);
    assert!(committer.commits.lock().unwrap().is_empty());
}

#[tokio::test]
async fn exhausted_partition_can_be_written_by_hand() {
    let provider = MockProvider::texts(&["nope", "still nope", "never"]);
    let committer = MockCommitter::default();
    let mut approver = ScriptedApprover::new(
        Vec::new(),
        vec![
            Recovery::Edit("Not valid either".into()),
            Recovery::Edit("feat(cache): add lru cache".into()),
        ],
    );
    let parts = partitions();
    let report = run(
        provider,
        &committer,
        &mut approver,
        &parts[..1],
        CancellationToken::new(),
    )
    .await;

    assert_eq!(approver.invalid_edits.len(), 1);
    assert_eq!(
        report.outcomes[0],
        PartitionOutcome::EditedAndCommitted {
            id: "c1".into(),
            message: "feat(cache): add lru cache".into()
        }
    );
}

#[tokio::test]
async fn failed_commit_can_be_retried() {
    let committer = MockCommitter::default();
    committer.fail_first.store(1, Ordering::SeqCst);
    let mut approver = ScriptedApprover::new(Vec::new(), vec![Recovery::Retry]);
    let parts = partitions();
    let report = run(
        MockProvider::texts(&[CACHE]),
        &committer,
        &mut approver,
        &parts[..1],
        CancellationToken::new(),
    )
    .await;

    assert_eq!(report.status, RunStatus::Completed);
    assert!(approver.errors[0].contains("index.lock exists"));
    assert_eq!(committer.commits.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn skipped_commit_failure_is_reported() {
    let committer = MockCommitter::default();
    committer.fail_first.store(1, Ordering::SeqCst);
    let mut approver = ScriptedApprover::new(Vec::new(), vec![Recovery::Skip]);
    let parts = partitions();
    let report = run(
        MockProvider::texts(&[CACHE, DOCS]),
        &committer,
        &mut approver,
        &parts[..2],
        CancellationToken::new(),
    )
    .await;

    assert!(matches!(
        &report.outcomes[0],
        PartitionOutcome::Failed { reason } if reason.contains("index.lock exists")
    ));
    assert!(report.outcomes[1].is_committed());
    assert_eq!(report.status, RunStatus::PartialSuccess);
}
