//! `migration-miner`: find commits that swap third-party libraries and count
//! which libraries get adopted and abandoned.
//!
//! # Flow
//! 1. Parse CLI arguments ([`cli`]) and load config ([`config::load_config`]).
//! 2. `walk`: acquire each repository ([`acquire`]), classify every commit
//!    message ([`classifier`]), and record positives with their manifest
//!    snapshots in the corpus ([`walker`], [`corpus`]).
//! 3. `aggregate`: parse every recorded snapshot pair ([`manifest`]), diff it
//!    ([`diff`]), and fold the deltas into one table ([`aggregate`]).
//! 4. `frequency`: divide each repository's migration count by its commit
//!    count ([`frequency`]).
//!
//! Failures of single commits, events or repositories are logged and skipped;
//! the run always completes its pass.

mod acquire;
mod aggregate;
mod classifier;
mod cli;
mod config;
mod corpus;
mod diff;
mod error;
mod frequency;
mod manifest;
mod models;
mod vcs;
mod walker;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use tracing::{error, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use acquire::{acquire, RepoSource};
use aggregate::Aggregator;
use classifier::chat::ChatCompletionClassifier;
use classifier::MigrationDetector;
use cli::{Cli, Command};
use config::{load_config, Config, LogConfig};
use corpus::CorpusStore;
use manifest::ManifestFormat;
use walker::{HistoryWalker, WalkSummary};

#[tokio::main]
async fn main() -> Result<()> {
    // Usage errors go to stdout with exit code 1; --help and --version exit 0.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.use_stderr() => {
            println!("{}", e.render());
            std::process::exit(1);
        }
        Err(e) => e.exit(),
    };

    let cwd = std::env::current_dir()?;
    let config = load_config(&cwd, cli.config.as_deref())?;

    std::fs::create_dir_all(&cli.corpus)
        .with_context(|| format!("failed to create corpus root {}", cli.corpus.display()))?;
    init_tracing(&cli.corpus, &config.log, cli.quiet)?;

    let store = CorpusStore::new(&cli.corpus, cli.command.ecosystem());

    match &cli.command {
        Command::Walk { repos, .. } => run_walk(&store, &config, repos, cli.quiet).await,
        Command::Aggregate { .. } => run_aggregate(&store, &config, cli.quiet),
        Command::Frequency {
            repos, repos_dir, ..
        } => run_frequency(&store, repos, repos_dir, cli.quiet),
    }
}

/// Stderr gets `RUST_LOG` (default: info, warn with `--quiet`); the run log
/// file always gets info and above.
fn init_tracing(corpus: &Path, log: &LogConfig, quiet: bool) -> Result<()> {
    let default_filter = if quiet {
        "migration_miner=warn"
    } else {
        "migration_miner=info"
    };
    let stderr_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let file_layer = if log.file.is_empty() {
        None
    } else {
        let appender = RollingFileAppender::builder()
            .rotation(Rotation::NEVER)
            .filename_prefix(&log.file)
            .build(corpus)
            .with_context(|| format!("failed to open log file {}", log.file))?;
        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(appender)
                .with_ansi(false)
                .with_filter(EnvFilter::new("migration_miner=info")),
        )
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(stderr_filter),
        )
        .with(file_layer)
        .init();

    Ok(())
}

async fn run_walk(store: &CorpusStore, config: &Config, repos: &[String], quiet: bool) -> Result<()> {
    let api_key = config.classifier.api_key()?;
    let classifier = ChatCompletionClassifier::new(&config.classifier, api_key)?;
    let detector = MigrationDetector::new(Box::new(classifier));
    let walker = HistoryWalker::new(&detector, store).with_progress(!quiet);

    let mut total = WalkSummary::default();
    let mut skipped = 0;

    for spec in repos {
        let source = RepoSource::parse(spec);
        let repo = match acquire(&source) {
            Ok(repo) => repo,
            Err(e) => {
                error!(repo = %spec, error = %e, "skipping repository");
                skipped += 1;
                continue;
            }
        };

        match walker.walk(&repo.name, &repo.git).await {
            Ok(summary) => {
                if !quiet {
                    eprintln!(
                        "  {} {} {} migrations in {} commits",
                        "→".cyan(),
                        repo.name,
                        summary.recorded,
                        summary.commits
                    );
                }
                total.commits += summary.commits;
                total.classified += summary.classified;
                total.recorded += summary.recorded;
                total.failed += summary.failed;

                if let Err(e) = store.record_source(&repo.name, &source.to_spec()) {
                    warn!(repo = %repo.name, error = %e, "failed to record repository source");
                }
            }
            Err(e) => {
                error!(repo = %repo.name, error = %e, "skipping repository");
                skipped += 1;
            }
        }
    }

    println!(
        "Repositories: {}  Commits: {}  Migrations: {}  Failed commits: {}  Skipped repositories: {}",
        repos.len() - skipped,
        total.commits,
        total.recorded.to_string().green(),
        total.failed.to_string().yellow(),
        skipped.to_string().red(),
    );
    Ok(())
}

fn run_aggregate(store: &CorpusStore, config: &Config, quiet: bool) -> Result<()> {
    let format = ManifestFormat::for_ecosystem(
        store.ecosystem(),
        config.manifest.requirements_syntax,
    );
    let (table, summary) = Aggregator::new(store, format).run()?;

    let path = store.aggregate_path();
    table.write(&path)?;

    if table.is_empty() {
        warn!("no dependency changes found in the corpus");
    }
    if !quiet {
        eprintln!("  {} {}", "→".cyan(), path.display());
    }
    println!(
        "Events: {}  Folded: {}  Skipped: {}  Dependencies: {}",
        summary.events,
        summary.folded.to_string().green(),
        summary.skipped.to_string().yellow(),
        table.len(),
    );
    Ok(())
}

fn run_frequency(
    store: &CorpusStore,
    repos: &[String],
    repos_dir: &Path,
    quiet: bool,
) -> Result<()> {
    let sources: Vec<RepoSource> = repos.iter().map(|spec| RepoSource::parse(spec)).collect();
    let report = frequency::report(store, repos_dir, &sources)?;

    let path = store.frequency_path();
    report.write(&path)?;

    if !quiet {
        print!("{}", report.render());
        eprintln!("  {} {}", "→".cyan(), path.display());
    }
    println!(
        "Repositories: {}  Skipped: {}",
        report.rates.len(),
        report.skipped.len().to_string().yellow(),
    );
    Ok(())
}
