// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Default)]
#[command(name = "commitsplit")]
#[command(version)]
#[command(
    about = "Split staged changes into conventional commits with generated messages",
    long_about = None
)]
pub struct Cli {
    /// Text generation provider (ollama, openai)
    #[arg(short, long, env = "COMMITSPLIT_PROVIDER")]
    pub provider: Option<String>,

    /// Model name
    #[arg(short, long, env = "COMMITSPLIT_MODEL")]
    pub model: Option<String>,

    /// Split when staged changes exceed this many added+removed lines
    #[arg(long, value_name = "LINES")]
    pub max_commit_size: Option<usize>,

    /// Always produce a single commit
    #[arg(long)]
    pub no_split: bool,

    /// Approve every generated message without prompting
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Print messages only, don't commit
    #[arg(long)]
    pub dry_run: bool,

    /// Describe a revision range (e.g. main..feature) instead of staged changes; implies --dry-run
    #[arg(long, value_name = "RANGE", conflicts_with = "diff_file")]
    pub range: Option<String>,

    /// Read a unified diff from a file ('-' for stdin); implies --dry-run
    #[arg(long, value_name = "PATH")]
    pub diff_file: Option<PathBuf>,

    /// Show the prompt sent to the provider
    #[arg(long)]
    pub show_prompt: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Inputs that cannot be committed are always previewed.
    pub fn is_preview(&self) -> bool {
        self.dry_run || self.range.is_some() || self.diff_file.is_some()
    }
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Initialize config file
    Init,
    /// Show current configuration
    Config,
    /// Check provider connectivity and repository state
    Doctor,
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Store an API key in the system keychain
    #[cfg(feature = "secure-storage")]
    SetKey {
        /// Provider name (openai)
        provider: String,
    },
}
