// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

use std::io::{IsTerminal, Read};
use std::path::Path;
use std::time::Duration;

use console::style;
use dialoguer::{Confirm, Editor, Input, Select};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::cli::{Cli, Commands};
use crate::config::Config;
use crate::domain::{CommitMessage, DiffUnit, Partition};
use crate::error::{Error, Result};
use crate::services::{
    approval::{
        ApprovalWorkflow, Approver, AutoApprover, CommitCreator, Decision, DryRunCommitter,
        PartitionOutcome, Recovery, RunReport, RunStatus,
    },
    classifier::Classifier,
    diff::DiffParser,
    formatter::{Formatter, Violation},
    generator::{GenerationSettings, MessageGenerator},
    git::GitService,
    llm,
    splitter::{CommitSplitter, SplitConfig},
};

pub struct App {
    cli: Cli,
    config: Config,
    cancel_token: CancellationToken,
}

impl App {
    pub fn new(cli: Cli) -> Result<Self> {
        // Writing a config file or completions must work before any config is valid.
        let config = match cli.command {
            Some(Commands::Init) | Some(Commands::Completions { .. }) => Config::default(),
            _ => Config::load(&cli)?,
        };
        let cancel_token = CancellationToken::new();
        Ok(Self {
            cli,
            config,
            cancel_token,
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        // Setup Ctrl+C handler with CancellationToken
        let cancel = self.cancel_token.clone();
        tokio::spawn(async move {
            signal::ctrl_c().await.ok();
            cancel.cancel();
        });

        if let Some(ref cmd) = self.cli.command {
            return self.handle_command(cmd).await;
        }

        self.generate_commits().await
    }

    async fn generate_commits(&mut self) -> Result<()> {
        // Step 1: Read the diff
        let (raw, git) = self.read_diff().await?;
        let units = DiffParser::parse(&raw)?;

        if units.is_empty() {
            if git.is_some() {
                return Err(Error::NoStagedChanges);
            }
            self.print_info("Diff contains no changes");
            return Ok(());
        }

        let additions: usize = units.iter().map(|u| u.additions).sum();
        let deletions: usize = units.iter().map(|u| u.deletions).sum();
        self.print_info(&format!(
            "{} files with changes detected (+{} -{})",
            units.len(),
            additions,
            deletions
        ));

        if self.cancel_token.is_cancelled() {
            return Err(Error::Cancelled);
        }

        // Step 2: Classify and split
        let classifier = Classifier::new(&self.config.classifier_rules)?;
        let split_config = if self.cli.no_split {
            SplitConfig::unbounded()
        } else {
            SplitConfig::from_config(&self.config)
        };
        let partitions = self.plan(&units, &classifier, &split_config)?;

        let interactive = std::io::stdout().is_terminal() && std::io::stdin().is_terminal();
        let preview = self.cli.is_preview() || git.is_none();

        // Step 3: Refuse when `git commit --only` would pick up unstaged edits
        if !preview && let Some(ref git) = git {
            let paths: Vec<_> = partitions.iter().flat_map(|p| p.commit_paths()).collect();
            let overlap = git.unstaged_overlap(&paths).await?;
            if !overlap.is_empty() {
                self.print_warning("Cannot commit: some staged files also have unstaged changes:");
                for path in &overlap {
                    eprintln!("  {}", path.display());
                }
                return Err(Error::SplitAborted);
            }
        }

        let auto_approve = self.cli.yes || preview;
        if !auto_approve && !interactive {
            self.print_warning("Not a terminal. Use --yes to auto-confirm in scripts/hooks.");
            return Err(Error::Dialog("interactive terminal required".into()));
        }

        // Step 4: Provider
        self.print_status(&format!(
            "Contacting {} ({})...",
            self.config.provider, self.config.model
        ));
        let provider = llm::create_provider(&self.config)?;
        debug!(provider = provider.name(), "verifying provider");
        provider.verify().await?;

        let generator =
            MessageGenerator::new(provider, GenerationSettings::from_config(&self.config));

        if self.cli.show_prompt {
            for (i, partition) in partitions.iter().enumerate() {
                eprintln!(
                    "{}",
                    style(format!("--- PROMPT ({}/{}) ---", i + 1, partitions.len())).dim()
                );
                eprintln!("{}", generator.preview_prompt(partition));
                eprintln!("{}", style("--- END PROMPT ---").dim());
            }
        }

        // Step 5: Generate, review and commit, one partition at a time
        let committer: Box<dyn CommitCreator> = match git {
            Some(git) if !preview => Box::new(git),
            _ => Box::new(DryRunCommitter::default()),
        };

        let mut approver: Box<dyn Approver> = if auto_approve {
            Box::new(AutoApprover)
        } else {
            Box::new(InteractiveApprover)
        };

        let report = ApprovalWorkflow::new(
            &generator,
            committer.as_ref(),
            approver.as_mut(),
            Duration::from_secs(self.config.commit_timeout_secs),
            self.cancel_token.clone(),
        )
        .run(&partitions)
        .await?;

        self.print_report(&report, &partitions, preview);

        match report.status {
            RunStatus::Cancelled => Err(Error::Cancelled),
            RunStatus::NothingCommitted => Err(Error::NothingCommitted {
                groups: report.outcomes.len(),
            }),
            RunStatus::Completed | RunStatus::PartialSuccess => Ok(()),
        }
    }

    async fn read_diff(&self) -> Result<(String, Option<GitService>)> {
        if let Some(ref path) = self.cli.diff_file {
            let raw = if path == Path::new("-") {
                let mut buf = String::new();
                std::io::stdin().read_to_string(&mut buf)?;
                buf
            } else {
                std::fs::read_to_string(path)?
            };
            return Ok((raw, None));
        }

        self.print_status("Analyzing changes...");
        let git = GitService::discover()?;

        if let Some(ref range) = self.cli.range {
            let raw = git.range_diff(range).await?;
            return Ok((raw, None));
        }

        let raw = git.staged_diff().await?;
        Ok((raw, Some(git)))
    }

    /// Split, show the proposal and let the user fall back to a single commit.
    fn plan(
        &self,
        units: &[DiffUnit],
        classifier: &Classifier,
        split_config: &SplitConfig,
    ) -> Result<Vec<Partition>> {
        let classified = CommitSplitter::classify(units.to_vec(), classifier);
        let partitions = CommitSplitter::split(classified, split_config);

        if partitions.len() <= 1 {
            return Ok(partitions);
        }

        Self::display_split_suggestion(&partitions, split_config.max_commit_size);

        let interactive = std::io::stdout().is_terminal() && std::io::stdin().is_terminal();
        if !interactive || self.cli.yes || self.cli.is_preview() {
            return Ok(partitions);
        }

        let split_confirm = Confirm::new()
            .with_prompt(format!("Split into {} commits?", partitions.len()))
            .default(true)
            .interact()?;

        if split_confirm {
            return Ok(partitions);
        }

        self.print_info("Proceeding with single commit");
        let classified = CommitSplitter::classify(units.to_vec(), classifier);
        Ok(CommitSplitter::split(classified, &SplitConfig::unbounded()))
    }

    async fn handle_command(&self, cmd: &Commands) -> Result<()> {
        match cmd {
            Commands::Init => {
                let path = Config::create_default()?;
                println!("Created config: {}", path.display());
                Ok(())
            }
            Commands::Config => {
                let c = &self.config;
                println!("Provider: {}", c.provider);
                println!("Model: {}", c.model);
                println!("Ollama host: {}", c.ollama_host);
                if let Some(ref base) = c.openai_base_url {
                    println!("OpenAI base URL: {base}");
                }
                println!(
                    "API key: {}",
                    if c.api_key.is_some() { "configured" } else { "not set" }
                );
                println!("Max commit size: {} lines", c.max_commit_size);
                println!("Min partition size: {} lines", c.min_partition_size);
                println!("Max context chars: {}", c.max_context_chars);
                println!("Max hunk lines: {}", c.max_hunk_lines);
                println!("Timeout: {}s", c.timeout_secs);
                println!("Commit timeout: {}s", c.commit_timeout_secs);
                println!("Temperature: {}", c.temperature);
                println!("Max tokens: {}", c.max_tokens);
                println!("Max attempts: {}", c.max_attempts);
                println!("Transport retries: {}", c.transport_retries);
                println!("Max subject length: {}", c.max_subject_len);
                println!("Tone: {:?}", c.tone);
                println!("Locale: {}", c.locale);
                println!();
                println!("[format]");
                println!("  include_body: {}", c.format.include_body);
                println!("  include_scope: {}", c.format.include_scope);
                println!("  lowercase_subject: {}", c.format.lowercase_subject);
                for rule in &c.classifier_rules {
                    println!();
                    println!("[[classifier_rules]]");
                    println!("  category: {}", rule.category);
                    println!("  globs: {}", rule.globs.join(", "));
                }
                Ok(())
            }
            Commands::Doctor => self.run_doctor().await,
            Commands::Completions { shell } => {
                let mut cmd = <Cli as clap::CommandFactory>::command();
                clap_complete::generate(*shell, &mut cmd, "commitsplit", &mut std::io::stdout());
                Ok(())
            }
            #[cfg(feature = "secure-storage")]
            Commands::SetKey { provider } => self.set_api_key(provider),
        }
    }

    async fn run_doctor(&self) -> Result<()> {
        eprintln!("{} Running diagnostics...\n", style("→").cyan());

        eprintln!("{}", style("Configuration").bold().underlined());
        eprintln!("  Provider:        {}", self.config.provider);
        eprintln!("  Model:           {}", self.config.model);
        eprintln!("  Max commit size: {}", self.config.max_commit_size);
        eprintln!("  Timeout:         {}s", self.config.timeout_secs);
        if let Some(ref path) = Config::config_path() {
            let status = if path.exists() { "found" } else { "not found" };
            eprintln!("  Config file:     {} ({})", path.display(), status);
        }
        eprintln!();

        eprintln!("{}", style("Provider Check").bold().underlined());
        let provider = llm::create_provider(&self.config)?;
        match provider.verify().await {
            Ok(()) => eprintln!("  {}: {}", self.config.provider, style("OK").green().bold()),
            Err(Error::OllamaNotRunning { ref host }) => {
                eprintln!("  Ollama ({host}): {}", style("NOT RUNNING").red().bold());
                eprintln!("  Start with: {}", style("ollama serve").yellow());
            }
            Err(Error::ModelNotFound {
                ref model,
                ref available,
            }) => {
                eprintln!("  Model '{model}': {}", style("NOT FOUND").red().bold());
                eprintln!(
                    "  Pull with: {}",
                    style(format!("ollama pull {model}")).yellow()
                );
                if !available.is_empty() {
                    eprintln!("  Available: {}", available.join(", "));
                }
            }
            Err(e) => eprintln!("  {}: {}", style("ERROR").red().bold(), e),
        }
        eprintln!();

        eprintln!("{}", style("Git Repository").bold().underlined());
        match GitService::discover() {
            Ok(git) => match git.check_state() {
                Ok(()) => eprintln!("  Repository: {}", style("found").green()),
                Err(e) => eprintln!("  Repository: {}", style(e).yellow()),
            },
            Err(_) => eprintln!("  Repository: {}", style("NOT FOUND").red().bold()),
        }

        eprintln!();
        eprintln!("{} Diagnostics complete.", style("✓").green().bold());
        Ok(())
    }

    #[cfg(feature = "secure-storage")]
    fn set_api_key(&self, provider: &str) -> Result<()> {
        let provider: crate::config::Provider = provider.parse()?;
        if provider == crate::config::Provider::Ollama {
            return Err(Error::Config(
                "Keyring storage is only for cloud providers (openai)".into(),
            ));
        }

        eprintln!(
            "Enter API key for {} (input will be hidden):",
            style(provider).bold()
        );

        let key = dialoguer::Password::new().with_prompt("API key").interact()?;

        if key.trim().is_empty() {
            return Err(Error::Config("API key cannot be empty".into()));
        }

        let entry = keyring::Entry::new("commitsplit", &provider.to_string())
            .map_err(|e| Error::Keyring(e.to_string()))?;
        entry
            .set_password(&key)
            .map_err(|e| Error::Keyring(e.to_string()))?;

        eprintln!("{} API key stored for {}", style("✓").green().bold(), provider);
        Ok(())
    }

    // ─── Split Display ───

    fn display_split_suggestion(partitions: &[Partition], max_commit_size: usize) {
        eprintln!();
        eprintln!(
            "{} Commit split suggested: {} groups",
            style("⚡").yellow(),
            partitions.len(),
        );
        eprintln!();

        for (i, partition) in partitions.iter().enumerate() {
            let scope_str = partition
                .scope
                .as_ref()
                .map(|s| format!("({s})"))
                .unwrap_or_default();
            let file_count = partition.units.len();
            let files_label = if file_count == 1 { "file" } else { "files" };

            eprintln!(
                "  Group {}: {}{}  [{} {}, +{} -{}]",
                i + 1,
                partition.commit_type.as_str(),
                scope_str,
                file_count,
                files_label,
                partition.additions,
                partition.deletions,
            );
            eprintln!("    {}", style(partition.rationale()).dim());
            if let Some(note) = partition.oversize_note(max_commit_size) {
                eprintln!("    {} {}", style("note:").yellow(), note);
            }

            for unit in &partition.units {
                eprintln!(
                    "    {} {} (+{} -{})",
                    unit.unit.kind.marker(),
                    unit.path().display(),
                    unit.unit.additions,
                    unit.unit.deletions,
                );
            }
            eprintln!();
        }
    }

    fn print_report(&self, report: &RunReport, partitions: &[Partition], preview: bool) {
        let total = report.outcomes.len();

        for (i, (outcome, partition)) in report.outcomes.iter().zip(partitions).enumerate() {
            match outcome {
                PartitionOutcome::Committed { id, message }
                | PartitionOutcome::EditedAndCommitted { id, message } => {
                    if preview {
                        if i > 0 {
                            println!();
                        }
                        println!("{message}");
                    } else {
                        eprintln!(
                            "{} Commit {}/{} {}: {}",
                            style("✓").green().bold(),
                            i + 1,
                            total,
                            style(id).dim(),
                            message.lines().next().unwrap_or(""),
                        );
                    }
                }
                PartitionOutcome::Skipped => {
                    eprintln!("{} Group {}/{} skipped", style("-").yellow(), i + 1, total);
                }
                PartitionOutcome::Failed { reason } => {
                    eprintln!(
                        "{} Group {}/{} failed: {}",
                        style("✗").red().bold(),
                        i + 1,
                        total,
                        reason
                    );
                }
                PartitionOutcome::NotReached => {
                    let files: Vec<String> = partition
                        .paths()
                        .iter()
                        .map(|p| p.display().to_string())
                        .collect();
                    eprintln!(
                        "{} Group {}/{} not committed: {}",
                        style("·").dim(),
                        i + 1,
                        total,
                        files.join(", ")
                    );
                }
            }
        }

        if preview {
            return;
        }

        match report.status {
            RunStatus::Completed => eprintln!(
                "\n{} {} commit{} created!",
                style("✓").green().bold(),
                report.committed(),
                if report.committed() == 1 { "" } else { "s" }
            ),
            RunStatus::PartialSuccess => eprintln!(
                "\n{} {} of {} commits created; earlier commits were kept",
                style("warning:").yellow().bold(),
                report.committed(),
                total
            ),
            RunStatus::Cancelled | RunStatus::NothingCommitted => {
                eprintln!("\n{} No commits created", style("info:").cyan());
            }
        }
    }

    // ─── Output Helpers ───

    fn print_status(&self, msg: &str) {
        eprintln!("{} {}", style("→").cyan(), msg);
    }

    fn print_info(&self, msg: &str) {
        eprintln!("{} {}", style("info:").cyan(), msg);
    }

    fn print_warning(&self, msg: &str) {
        eprintln!("{} {}", style("warning:").yellow().bold(), msg);
    }
}

/// Terminal prompts for each generated message.
struct InteractiveApprover;

impl Approver for InteractiveApprover {
    fn review(
        &mut self,
        partition: &Partition,
        index: usize,
        total: usize,
        message: &CommitMessage,
    ) -> Result<Decision> {
        let rendered = Formatter::render(message);

        loop {
            eprintln!(
                "\n{} ({}/{}, {} files, +{} -{})",
                style("Generated commit message").bold(),
                index + 1,
                total,
                partition.units.len(),
                partition.additions,
                partition.deletions
            );
            eprintln!("{}", style(&rendered).green());
            eprintln!();

            let choice = Select::new()
                .with_prompt("What next?")
                .items(&["Commit", "Edit", "Regenerate", "Cancel"])
                .default(0)
                .interact()?;

            match choice {
                0 => return Ok(Decision::Approve),
                1 => match Editor::new().edit(&rendered)? {
                    Some(text) => return Ok(Decision::Edit(text)),
                    None => eprintln!("{} Edit aborted", style("info:").cyan()),
                },
                2 => {
                    let feedback: String = Input::new()
                        .with_prompt("Feedback for the next attempt (optional)")
                        .allow_empty(true)
                        .interact_text()?;
                    let feedback = feedback.trim();
                    return Ok(Decision::Regenerate {
                        feedback: (!feedback.is_empty()).then(|| feedback.to_string()),
                    });
                }
                _ => return Ok(Decision::Cancel),
            }
        }
    }

    fn recover(&mut self, partition: &Partition, error: &Error) -> Result<Recovery> {
        eprintln!("\n{} {}", style("error:").red().bold(), error);
        for path in partition.paths() {
            eprintln!("  {}", path.display());
        }

        let candidate = match error {
            Error::GenerationExhausted { last_candidate, .. } => {
                eprintln!("\n{}", style("Last candidate:").bold());
                eprintln!("{}", style(last_candidate).yellow());
                last_candidate.clone()
            }
            _ => Formatter::render(&partition.fallback_message()),
        };

        loop {
            let choice = Select::new()
                .with_prompt("How do you want to continue?")
                .items(&["Retry", "Write the message myself", "Skip this group", "Cancel"])
                .default(0)
                .interact()?;

            match choice {
                0 => return Ok(Recovery::Retry),
                1 => match Editor::new().edit(&candidate)? {
                    Some(text) => return Ok(Recovery::Edit(text)),
                    None => eprintln!("{} Edit aborted", style("info:").cyan()),
                },
                2 => return Ok(Recovery::Skip),
                _ => return Ok(Recovery::Cancel),
            }
        }
    }

    fn invalid_edit(&mut self, violations: &[Violation]) {
        eprintln!(
            "{} Edited message is not a valid conventional commit:",
            style("warning:").yellow().bold()
        );
        for violation in violations {
            eprintln!("  - {violation}");
        }
    }
}
