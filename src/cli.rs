use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::models::Ecosystem;

#[derive(Parser, Debug)]
#[command(
    name = "migration-miner",
    about = "Mine git histories for third-party library migrations",
    version
)]
pub struct Cli {
    /// Config file [default: ./.migration-miner/config.toml, fallback ~/.config/migration-miner/config.toml]
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Corpus root holding the `<ecosystem>_migrations` folders and output files
    #[arg(long, global = true, default_value = ".", value_name = "DIR")]
    pub corpus: PathBuf,

    /// Only print the final summary line
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Classify every commit of the given repositories and record migrations
    Walk {
        #[arg(value_enum, ignore_case = true)]
        ecosystem: EcosystemArg,

        /// Local repository paths or clone URLs
        #[arg(required = true, value_name = "REPO")]
        repos: Vec<String>,
    },

    /// Fold all recorded migrations into `<ecosystem>_migrations_info.json`
    Aggregate {
        #[arg(value_enum, ignore_case = true)]
        ecosystem: EcosystemArg,
    },

    /// Write per-repository migration rates to `<ecosystem>_migration_freq_info.txt`
    Frequency {
        #[arg(value_enum, ignore_case = true)]
        ecosystem: EcosystemArg,

        /// Local repository paths or clone URLs; others are looked up in
        /// --repos-dir, then at the source recorded by `walk`
        #[arg(value_name = "REPO")]
        repos: Vec<String>,

        /// Directory holding one checkout per repository in the corpus
        #[arg(long, default_value = ".", value_name = "DIR")]
        repos_dir: PathBuf,
    },
}

impl Command {
    pub fn ecosystem(&self) -> Ecosystem {
        match self {
            Command::Walk { ecosystem, .. }
            | Command::Aggregate { ecosystem }
            | Command::Frequency { ecosystem, .. } => ecosystem.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum EcosystemArg {
    Maven,
    Npm,
    Pypi,
}

impl From<&EcosystemArg> for Ecosystem {
    fn from(arg: &EcosystemArg) -> Self {
        match arg {
            EcosystemArg::Maven => Ecosystem::Maven,
            EcosystemArg::Npm => Ecosystem::Npm,
            EcosystemArg::Pypi => Ecosystem::Pypi,
        }
    }
}
