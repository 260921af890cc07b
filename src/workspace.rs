//! Runs one pipeline per repository on a bounded worker pool.

use crate::config::Config;
use crate::error::SyncError;
use crate::git::GitRunner;
use crate::report::LogSink;
use crate::repo::{self, SyncCallbacks, SyncResult};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Inputs of one invocation, before anything has been opened.
#[derive(Debug, Clone)]
pub struct Batch {
    /// Directory holding the repositories.
    pub parent: PathBuf,
    /// Optional file listing repositories, one per line.
    pub repo_list: Option<PathBuf>,
    /// Optional log file; the console is used without one.
    pub log_file: Option<PathBuf>,
}

impl Batch {
    /// Resolves the repository set and opens the log destination.
    ///
    /// Any error here is fatal for the whole batch: nothing has started yet.
    pub fn prepare(&self) -> Result<(Vec<PathBuf>, LogSink), SyncError> {
        let parent = std::path::absolute(&self.parent).map_err(|source| SyncError::Io {
            path: self.parent.clone(),
            source,
        })?;
        let repos = repo::resolve_repos(&parent, self.repo_list.as_deref())?;
        let sink = match &self.log_file {
            Some(path) => LogSink::create(path, &parent)?,
            None => LogSink::console(),
        };
        Ok((repos, sink))
    }
}

/// Synchronizes every repository in `repos` and returns their results in
/// input order.
///
/// Each finished repository is written to `sink` as soon as it completes;
/// the write happens inside [`SyncCallbacks::present_report`]. All
/// pipelines have finished when this returns, so the caller may close the
/// sink afterwards.
pub fn sync_workspace<C, F>(
    repos: &[PathBuf],
    git: &dyn GitRunner,
    sink: &LogSink,
    make_callbacks: F,
    config: &Config,
) -> Vec<SyncResult>
where
    F: Fn(&Path) -> C + Sync,
    C: SyncCallbacks,
{
    let run_one = |path: &PathBuf| {
        let callbacks = make_callbacks(path.as_path());
        let result = repo::sync(path, git, &callbacks);
        callbacks.present_report(&mut || {
            if let Err(err) = sink.write_block(&result) {
                warn!(repo = %result.path.display(), error = %err, "failed to write report block");
            }
        });
        callbacks.on_complete(&result);
        result
    };

    let jobs = config.effective_jobs();
    debug!(repos = repos.len(), jobs, "starting workspace synchronization");

    match rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .thread_name(|i| format!("sync-git-{i}"))
        .build()
    {
        Ok(pool) => pool.install(|| repos.par_iter().map(run_one).collect()),
        Err(err) => {
            warn!(error = %err, "could not build worker pool; using the global pool");
            repos.par_iter().map(run_one).collect()
        }
    }
}
