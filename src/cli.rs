//! Command-line interface.

use crate::config::{Config, Verbosity};
use crate::constants::DEFAULT_JOBS;
use crate::workspace::Batch;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(
    name = "sync-git",
    version,
    about = "Synchronize local git repositories with their upstream branches",
    long_about = "Finds every git repository directly under DIRECTORY (or the ones listed in \
                  --repo-list), fetches its upstream, then pulls when behind or pushes when \
                  ahead. Diverged repositories are reported and left untouched."
)]
pub struct Args {
    /// Directory containing the repositories to synchronize
    #[arg(value_name = "DIRECTORY")]
    pub directory: PathBuf,

    /// File listing repositories to synchronize, one per line, relative to DIRECTORY
    #[arg(short = 'f', long, value_name = "FILE")]
    pub repo_list: Option<PathBuf>,

    /// Write the report to FILE instead of the console
    #[arg(short = 'l', long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Number of repositories synchronized at the same time
    #[arg(
        short = 'j',
        long,
        value_name = "N",
        default_value_t = DEFAULT_JOBS,
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
    )]
    pub jobs: usize,

    /// Give up on git commands that have not finished after SECS seconds in total
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Only print the final count and problems
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Echo every git command and run repositories one at a time
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    #[must_use]
    pub fn config(&self) -> Config {
        let verbosity = if self.quiet {
            Verbosity::Quiet
        } else if self.verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        };
        let config = Config {
            verbosity,
            jobs: self.jobs,
            ..Config::default()
        };
        match self.timeout {
            Some(secs) => config.with_time_budget(Duration::from_secs(secs)),
            None => config,
        }
    }

    #[must_use]
    pub fn batch(&self) -> Batch {
        Batch {
            parent: self.directory.clone(),
            repo_list: self.repo_list.clone(),
            log_file: self.log_file.clone(),
        }
    }
}
