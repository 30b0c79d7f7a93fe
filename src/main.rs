// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

use clap::Parser;
use tracing_subscriber::EnvFilter;

use commitsplit::{App, Cli, Error};

/// Conventional exit status for a run interrupted before anything was committed.
const EXIT_CANCELLED: i32 = 130;

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("commitsplit=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("commitsplit=warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(std::env::var("NO_COLOR").is_err())
        .without_time()
        .init();
}

fn exit_with(error: Error) -> ! {
    if matches!(error, Error::Cancelled) {
        eprintln!("Cancelled. Nothing was committed.");
        std::process::exit(EXIT_CANCELLED);
    }
    eprintln!("{:?}", miette::Report::new(error));
    std::process::exit(1);
}

#[tokio::main]
async fn main() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .context_lines(2)
                .build(),
        )
    }))
    .ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match App::new(cli) {
        Ok(mut app) => app.run().await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        exit_with(e);
    }
}
