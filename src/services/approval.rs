// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::{CommitMessage, Partition};
use crate::error::{Error, Result};
use crate::services::formatter::{Formatter, Violation};
use crate::services::generator::MessageGenerator;

/// Where one partition's message stands in the review loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalState {
    Pending(CommitMessage),
    Approved(CommitMessage),
    Edited(CommitMessage),
    Regenerating { feedback: Option<String> },
    Cancelled,
}

/// What the reviewer chose for a pending message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Edit(String),
    Regenerate { feedback: Option<String> },
    Cancel,
}

/// What the reviewer chose after a partition-local failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recovery {
    Retry,
    Edit(String),
    Skip,
    Cancel,
}

impl ApprovalState {
    /// Apply a decision to a pending message. Edits are validated; an invalid
    /// edit keeps the prior message pending and returns its violations.
    pub fn apply(self, decision: Decision, formatter: &Formatter) -> (Self, Option<Vec<Violation>>) {
        let Self::Pending(current) = self else {
            return (self, None);
        };

        match decision {
            Decision::Approve => (Self::Approved(current), None),
            Decision::Edit(text) => match formatter.validate(&text) {
                Ok(edited) => (Self::Edited(edited), None),
                Err(violations) => (Self::Pending(current), Some(violations)),
            },
            Decision::Regenerate { feedback } => (Self::Regenerating { feedback }, None),
            Decision::Cancel => (Self::Cancelled, None),
        }
    }

    /// A fresh message for a regenerating partition puts it back to pending.
    pub fn regenerated(self, message: CommitMessage) -> Self {
        match self {
            Self::Regenerating { .. } => Self::Pending(message),
            other => other,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved(_) | Self::Edited(_) | Self::Cancelled)
    }
}

/// Source of decisions: a terminal prompt, an auto-approver, or a script in tests.
pub trait Approver {
    fn review(
        &mut self,
        partition: &Partition,
        index: usize,
        total: usize,
        message: &CommitMessage,
    ) -> Result<Decision>;

    fn recover(&mut self, partition: &Partition, error: &Error) -> Result<Recovery>;

    fn invalid_edit(&mut self, _violations: &[Violation]) {}
}

/// Approves every message; gives up on a partition when something fails.
#[derive(Debug, Default)]
pub struct AutoApprover;

impl Approver for AutoApprover {
    fn review(&mut self, _: &Partition, _: usize, _: usize, _: &CommitMessage) -> Result<Decision> {
        Ok(Decision::Approve)
    }

    fn recover(&mut self, _: &Partition, error: &Error) -> Result<Recovery> {
        warn!(error = %error, "skipping partition");
        Ok(Recovery::Skip)
    }
}

#[async_trait]
pub trait CommitCreator: Send + Sync {
    /// Record `paths` as one commit with `message`; returns the commit id.
    async fn create_commit(&self, message: &str, paths: &[PathBuf]) -> Result<String>;
}

/// Records nothing; hands out placeholder ids so a run can be previewed.
#[derive(Debug, Default)]
pub struct DryRunCommitter {
    created: AtomicUsize,
}

#[async_trait]
impl CommitCreator for DryRunCommitter {
    async fn create_commit(&self, _message: &str, paths: &[PathBuf]) -> Result<String> {
        let n = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(files = paths.len(), "dry run, no commit created");
        Ok(format!("dry-run-{n}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartitionOutcome {
    Committed { id: String, message: String },
    EditedAndCommitted { id: String, message: String },
    Skipped,
    Failed { reason: String },
    NotReached,
}

impl PartitionOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(
            self,
            Self::Committed { .. } | Self::EditedAndCommitted { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    PartialSuccess,
    /// The reviewer cancelled before any commit was created.
    Cancelled,
    /// Every partition was skipped or failed.
    NothingCommitted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub outcomes: Vec<PartitionOutcome>,
    pub status: RunStatus,
}

impl RunReport {
    fn new(outcomes: Vec<PartitionOutcome>, cancelled: bool) -> Self {
        let committed = outcomes.iter().filter(|o| o.is_committed()).count();
        let status = if committed == outcomes.len() {
            RunStatus::Completed
        } else if committed > 0 {
            RunStatus::PartialSuccess
        } else if cancelled {
            RunStatus::Cancelled
        } else {
            RunStatus::NothingCommitted
        };
        Self { outcomes, status }
    }

    pub fn committed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_committed()).count()
    }
}

enum Step {
    /// Holds a `Regenerating` state; the first generation has no feedback.
    Generate(ApprovalState),
    /// Holds a `Pending` state.
    Review(ApprovalState),
    Commit { message: CommitMessage, edited: bool },
}

enum Flow {
    Continue(Step),
    Finish(Option<PartitionOutcome>),
}

/// Drives partitions one at a time through generate, review and commit.
pub struct ApprovalWorkflow<'a> {
    generator: &'a MessageGenerator,
    committer: &'a dyn CommitCreator,
    approver: &'a mut dyn Approver,
    formatter: Formatter,
    commit_timeout: Duration,
    cancel: CancellationToken,
}

impl<'a> ApprovalWorkflow<'a> {
    pub fn new(
        generator: &'a MessageGenerator,
        committer: &'a dyn CommitCreator,
        approver: &'a mut dyn Approver,
        commit_timeout: Duration,
        cancel: CancellationToken,
    ) -> Self {
        let formatter = generator.settings().formatter();
        Self {
            generator,
            committer,
            approver,
            formatter,
            commit_timeout,
            cancel,
        }
    }

    /// Process every partition in order. Cancellation stops forward progress
    /// and is reported, not returned as an error; commits already created stay.
    pub async fn run(&mut self, partitions: &[Partition]) -> Result<RunReport> {
        let total = partitions.len();
        let mut outcomes = vec![PartitionOutcome::NotReached; total];
        let mut cancelled = false;

        for (index, partition) in partitions.iter().enumerate() {
            if self.cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            debug!(partition = index + 1, total, "processing partition");
            match self.process(partition, index, total).await? {
                Some(outcome) => outcomes[index] = outcome,
                None => {
                    info!(partition = index + 1, "run cancelled");
                    cancelled = true;
                    break;
                }
            }
        }

        Ok(RunReport::new(outcomes, cancelled))
    }

    /// `None` means the whole run was cancelled while on this partition.
    async fn process(
        &mut self,
        partition: &Partition,
        index: usize,
        total: usize,
    ) -> Result<Option<PartitionOutcome>> {
        let mut step = Step::Generate(ApprovalState::Regenerating { feedback: None });

        loop {
            if self.cancel.is_cancelled() {
                return Ok(None);
            }

            step = match step {
                Step::Generate(state) => {
                    let feedback = match &state {
                        ApprovalState::Regenerating { feedback } => feedback.as_deref(),
                        _ => None,
                    };
                    let generated = self
                        .generator
                        .generate(partition, feedback, &self.cancel)
                        .await;
                    match generated {
                        Ok(generated) => Step::Review(state.regenerated(generated.message)),
                        Err(Error::Cancelled) => return Ok(None),
                        Err(e) if e.is_partition_local() => {
                            match self.recover(
                                partition,
                                &e,
                                Step::Generate(state),
                                PartitionOutcome::Skipped,
                            )? {
                                Flow::Continue(next) => next,
                                Flow::Finish(outcome) => return Ok(outcome),
                            }
                        }
                        Err(e) => return Err(e),
                    }
                }

                Step::Review(mut state) => {
                    while let ApprovalState::Pending(current) = &state {
                        let decision = self.approver.review(partition, index, total, current)?;
                        let (next, rejected) = state.apply(decision, &self.formatter);
                        if let Some(violations) = rejected {
                            self.approver.invalid_edit(&violations);
                        }
                        state = next;
                    }

                    match state {
                        ApprovalState::Approved(message) => Step::Commit {
                            message,
                            edited: false,
                        },
                        ApprovalState::Edited(message) => Step::Commit {
                            message,
                            edited: true,
                        },
                        regenerating @ ApprovalState::Regenerating { .. } => {
                            Step::Generate(regenerating)
                        }
                        ApprovalState::Cancelled | ApprovalState::Pending(_) => return Ok(None),
                    }
                }

                Step::Commit { message, edited } => {
                    let text = Formatter::render(&message);
                    match self.create(&text, partition).await {
                        Ok(id) => {
                            info!(id = %id, "commit created");
                            let outcome = if edited {
                                PartitionOutcome::EditedAndCommitted { id, message: text }
                            } else {
                                PartitionOutcome::Committed { id, message: text }
                            };
                            return Ok(Some(outcome));
                        }
                        Err(e) => {
                            let reason = e.to_string();
                            match self.recover(
                                partition,
                                &e,
                                Step::Commit { message, edited },
                                PartitionOutcome::Failed { reason },
                            )? {
                                Flow::Continue(next) => next,
                                Flow::Finish(outcome) => return Ok(outcome),
                            }
                        }
                    }
                }
            };
        }
    }

    fn recover(
        &mut self,
        partition: &Partition,
        error: &Error,
        retry: Step,
        skipped: PartitionOutcome,
    ) -> Result<Flow> {
        warn!(error = %error, "partition failed");
        loop {
            match self.approver.recover(partition, error)? {
                Recovery::Retry => return Ok(Flow::Continue(retry)),
                Recovery::Skip => return Ok(Flow::Finish(Some(skipped))),
                Recovery::Cancel => return Ok(Flow::Finish(None)),
                Recovery::Edit(text) => match self.formatter.validate(&text) {
                    Ok(message) => {
                        return Ok(Flow::Continue(Step::Commit {
                            message,
                            edited: true,
                        }));
                    }
                    Err(violations) => self.approver.invalid_edit(&violations),
                },
            }
        }
    }

    async fn create(&self, text: &str, partition: &Partition) -> Result<String> {
        let paths = partition.commit_paths();
        let result =
            tokio::time::timeout(self.commit_timeout, self.committer.create_commit(text, &paths))
                .await;

        match result {
            Ok(Ok(id)) => Ok(id),
            Ok(Err(e @ Error::CommitCreation { .. })) => Err(e),
            Ok(Err(e)) => Err(Error::CommitCreation {
                message: e.to_string(),
            }),
            Err(_) => Err(Error::CommitCreation {
                message: format!(
                    "no response within {}s",
                    self.commit_timeout.as_secs_f32()
                ),
            }),
        }
    }
}
