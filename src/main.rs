mod browser;
mod cli;
mod error;
mod explorer;
mod filter;
mod fmt;
mod loader;
mod models;
mod reports;
mod settings;
mod tui;

use std::io::IsTerminal;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use cli::explore::ExploreArgs;
use cli::{Cli, Commands, RangeArgs, Session};

/// Diagnostics go to stderr.
/// `HOURGLASS_LOG` takes the usual filter syntax, e.g. `hourglass=debug`.
fn init_logging() {
    let filter = EnvFilter::try_from_env("HOURGLASS_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Init {
            path,
            row_limit,
            range,
            trend_categories,
        }) => cli::init::run(&path, row_limit, range, trend_categories),
        Some(Commands::Completions { shell }) => {
            clap_complete::generate(shell, &mut Cli::command(), "hourglass", &mut std::io::stdout());
            Ok(())
        }
        Some(command) => {
            let session = Session::open(cli.dataset.as_deref());
            match command {
                Commands::Summary { range } => cli::summary::run(&session, &range),
                Commands::Report { command } => cli::report::dispatch(&session, command),
                Commands::Explore {
                    range,
                    category,
                    service,
                    sort,
                    limit,
                    output,
                } => cli::explore::run(
                    &session,
                    ExploreArgs {
                        range,
                        category,
                        service,
                        sort,
                        limit,
                        output,
                    },
                ),
                Commands::Dashboard { range } => cli::dashboard::run(&session, &range),
                Commands::Init { .. } | Commands::Completions { .. } => Ok(()),
            }
        }
        None => {
            // Bare invocation: dashboard on a terminal, summary otherwise
            let session = Session::open(cli.dataset.as_deref());
            let range = RangeArgs::default();
            if std::io::stdout().is_terminal() {
                cli::dashboard::run(&session, &range)
            } else {
                cli::summary::run(&session, &range)
            }
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
