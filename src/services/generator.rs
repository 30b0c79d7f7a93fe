// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

use std::fmt::Write as _;
use std::time::Duration;

use backoff::ExponentialBackoff;
use backoff::backoff::Backoff;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::{Config, Tone};
use crate::domain::{AttemptOutcome, CommitMessage, GenerationAttempt, Partition};
use crate::error::{Error, Result};
use crate::services::context::ContextBuilder;
use crate::services::formatter::{Formatter, Violation};
use crate::services::llm::{GenerationRequest, LlmProvider, SYSTEM_PROMPT};
use crate::services::sanitizer::CommitSanitizer;

const MAX_BACKOFF_INTERVAL: Duration = Duration::from_secs(30);

/// Everything that shapes how a partition's message is requested and checked.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub max_attempts: u32,
    pub transport_retries: u32,
    pub timeout: Duration,
    pub backoff_initial: Duration,
    pub temperature: f32,
    pub max_tokens: u32,
    pub max_context_chars: usize,
    pub max_hunk_lines: usize,
    pub max_subject_len: usize,
    pub lowercase_subject: bool,
    pub include_body: bool,
    pub include_scope: bool,
    pub tone: Tone,
    pub locale: String,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl GenerationSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.max_attempts,
            transport_retries: config.transport_retries,
            timeout: Duration::from_secs(config.timeout_secs),
            backoff_initial: Duration::from_millis(config.backoff_initial_ms),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_context_chars: config.max_context_chars,
            max_hunk_lines: config.max_hunk_lines,
            max_subject_len: config.max_subject_len,
            lowercase_subject: config.format.lowercase_subject,
            include_body: config.format.include_body,
            include_scope: config.format.include_scope,
            tone: config.tone,
            locale: config.locale.clone(),
        }
    }

    pub fn formatter(&self) -> Formatter {
        Formatter::new(self.max_subject_len, self.lowercase_subject)
    }
}

/// A validated message and the round trips it took.
#[derive(Debug)]
pub struct Generated {
    pub message: CommitMessage,
    pub attempts: Vec<GenerationAttempt>,
}

pub struct MessageGenerator {
    provider: Box<dyn LlmProvider>,
    settings: GenerationSettings,
}

impl MessageGenerator {
    pub fn new(provider: Box<dyn LlmProvider>, settings: GenerationSettings) -> Self {
        Self { provider, settings }
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// The first prompt that would be sent for `partition`.
    pub fn preview_prompt(&self, partition: &Partition) -> String {
        ContextBuilder::build(partition, &self.settings).to_prompt()
    }

    /// Ask for a message until one validates, re-prompting with the
    /// violations of the previous candidate.
    pub async fn generate(
        &self,
        partition: &Partition,
        feedback: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Generated> {
        let formatter = self.settings.formatter();
        let base_prompt = self.preview_prompt(partition);
        let mut attempts = Vec::new();
        let mut rejected: Option<(String, Vec<Violation>)> = None;

        for number in 1..=self.settings.max_attempts {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let prompt = compose_prompt(&base_prompt, rejected.as_ref(), feedback);
            let raw = self
                .call_with_retry(&prompt, number, &mut attempts, cancel)
                .await?;
            let candidate = CommitSanitizer::extract(&raw);

            match formatter.validate(&candidate) {
                Ok(message) => {
                    debug!(attempt = number, "valid commit message");
                    attempts.push(GenerationAttempt {
                        number,
                        prompt,
                        raw_response: Some(raw),
                        outcome: AttemptOutcome::Valid,
                    });
                    return Ok(Generated {
                        message: self.apply_style(message),
                        attempts,
                    });
                }
                Err(violations) => {
                    warn!(
                        attempt = number,
                        violations = violations.len(),
                        "generated message rejected"
                    );
                    attempts.push(GenerationAttempt {
                        number,
                        prompt,
                        raw_response: Some(raw),
                        outcome: AttemptOutcome::Malformed(violations.clone()),
                    });
                    rejected = Some((candidate, violations));
                }
            }
        }

        let (last_candidate, violations) = rejected.unwrap_or_default();
        Err(Error::GenerationExhausted {
            attempts: self.settings.max_attempts,
            files: partition
                .paths()
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
            last_candidate,
            violations: violations.iter().map(ToString::to_string).collect(),
        })
    }

    fn apply_style(&self, mut message: CommitMessage) -> CommitMessage {
        if !self.settings.include_scope {
            message.scope = None;
        }
        if self.settings.include_body {
            message.body = message.body.map(|body| Formatter::wrap_body(&body));
        } else {
            message.body = None;
        }
        message
    }

    /// One provider round trip, retried with exponential backoff on
    /// transport failures and timeouts.
    async fn call_with_retry(
        &self,
        prompt: &str,
        number: u32,
        attempts: &mut Vec<GenerationAttempt>,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let request = GenerationRequest {
            system: SYSTEM_PROMPT.to_string(),
            prompt: prompt.to_string(),
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };

        let mut backoff = ExponentialBackoff {
            current_interval: self.settings.backoff_initial,
            initial_interval: self.settings.backoff_initial,
            max_interval: MAX_BACKOFF_INTERVAL,
            max_elapsed_time: None,
            ..Default::default()
        };

        let max_calls = self.settings.transport_retries + 1;
        let mut calls = 0;

        loop {
            calls += 1;

            let outcome = tokio::select! {
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                result = tokio::time::timeout(self.settings.timeout, self.provider.generate(&request)) => result,
            };

            let message = match outcome {
                Ok(Ok(raw)) => return Ok(raw),
                Ok(Err(Error::Cancelled)) => return Err(Error::Cancelled),
                Ok(Err(e)) => e.to_string(),
                Err(_) => format!(
                    "no response within {}s",
                    self.settings.timeout.as_secs_f32()
                ),
            };

            warn!(
                provider = self.provider.name(),
                call = calls,
                error = %message,
                "provider call failed"
            );
            attempts.push(GenerationAttempt {
                number,
                prompt: prompt.to_string(),
                raw_response: None,
                outcome: AttemptOutcome::TransportFailure(message.clone()),
            });

            if calls >= max_calls {
                return Err(Error::GenerationUnavailable {
                    provider: self.provider.name().to_string(),
                    attempts: calls,
                    message,
                });
            }

            if let Some(wait) = backoff.next_backoff() {
                tokio::select! {
                    _ = cancel.cancelled() => return Err(Error::Cancelled),
                    _ = tokio::time::sleep(wait) => {}
                }
            }
        }
    }
}

fn compose_prompt(
    base: &str,
    rejected: Option<&(String, Vec<Violation>)>,
    feedback: Option<&str>,
) -> String {
    let mut prompt = base.to_string();

    if let Some((candidate, violations)) = rejected {
        let _ = write!(
            prompt,
            "\n\nYOUR PREVIOUS ANSWER WAS REJECTED:\n{candidate}\nProblems:\n"
        );
        for violation in violations {
            let _ = writeln!(prompt, "- {violation}");
        }
        prompt.push_str("Fix every problem and answer with the JSON object only.");
    }

    if let Some(feedback) = feedback.map(str::trim).filter(|f| !f.is_empty()) {
        let _ = write!(
            prompt,
            "\n\nUSER FEEDBACK ON THE PREVIOUS MESSAGE:\n{feedback}"
        );
    }

    prompt
}
