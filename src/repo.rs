// Repository discovery, the per-repository pipeline, result types

use crate::constants::{DEFAULT_REPO_NAME, GIT_DIR_SUFFIX};
use crate::error::SyncError;
use crate::git::GitRunner;
use crate::remote;
use crate::sync::{self, SyncOutcome};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Pipeline stage, reported to callbacks and recorded on failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStep {
    Started,
    DetectingBranch,
    ResolvingUpstream,
    Fetching,
    Comparing,
    Pulling,
    Pushing,
    Completed,
}

impl fmt::Display for SyncStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SyncStep::Started => "starting",
            SyncStep::DetectingBranch => "detecting current branch",
            SyncStep::ResolvingUpstream => "resolving upstream",
            SyncStep::Fetching => "fetching",
            SyncStep::Comparing => "comparing with upstream",
            SyncStep::Pulling => "pulling",
            SyncStep::Pushing => "pushing",
            SyncStep::Completed => "completed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone)]
pub struct SyncResult {
    pub path: PathBuf,
    pub outcome: SyncOutcome,
    pub duration: Duration,
}

/// Progress hooks for one repository's pipeline.
///
/// Implementations must be cheap: they run on the worker threads.
pub trait SyncCallbacks {
    fn on_sync_start(&self, _repo_name: &str) {}

    fn on_step(&self, step: &SyncStep);

    fn on_complete(&self, result: &SyncResult);

    /// Wraps the moment a finished repository's report is written, so a
    /// live display can step aside. The default just runs `report`.
    fn present_report(&self, report: &mut dyn FnMut()) {
        report()
    }
}

#[derive(Debug)]
struct StepError {
    source: SyncError,
    step: SyncStep,
}

fn at_step<T>(step: SyncStep, result: Result<T, SyncError>) -> Result<T, StepError> {
    result.map_err(|source| StepError { source, step })
}

/// True when `path` contains an entry whose name ends in `.git`.
///
/// That covers the usual `.git` directory, `.git` files of worktrees and
/// submodules, and bare-style `name.git` directories.
pub fn is_git_repo(path: &Path) -> bool {
    std::fs::read_dir(path)
        .into_iter()
        .flatten()
        .filter_map(|e| e.ok())
        .any(|e| e.file_name().to_string_lossy().ends_with(GIT_DIR_SUFFIX))
}

/// Immediate subdirectories of `parent` that are git repositories,
/// in directory-listing order.
pub fn find_git_repos(parent: &Path) -> Result<Vec<PathBuf>, SyncError> {
    let entries = std::fs::read_dir(parent).map_err(|source| SyncError::Io {
        path: parent.to_path_buf(),
        source,
    })?;

    Ok(entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|path| path.is_dir() && is_git_repo(path))
        .collect())
}

/// Reads a repository list: one path or name per line, blank lines ignored.
pub fn read_repo_list(list: &Path) -> Result<Vec<String>, SyncError> {
    let content = std::fs::read_to_string(list).map_err(|source| SyncError::Io {
        path: list.to_path_buf(),
        source,
    })?;
    Ok(parse_repo_list(&content))
}

fn parse_repo_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Repositories to synchronize under `parent`.
///
/// Without a list, `parent` is scanned. With one, each entry is taken
/// relative to `parent` (absolute entries stay as they are) and is not
/// checked for existence here; a bad entry fails later in its own pipeline.
pub fn resolve_repos(parent: &Path, list: Option<&Path>) -> Result<Vec<PathBuf>, SyncError> {
    let parent = std::path::absolute(parent).map_err(|source| SyncError::Io {
        path: parent.to_path_buf(),
        source,
    })?;

    match list {
        None => find_git_repos(&parent),
        Some(list) => Ok(read_repo_list(list)?
            .iter()
            .map(|entry| parent.join(entry))
            .collect()),
    }
}

/// Last path component, used as the display name of a repository.
pub fn repo_name(path: &Path) -> &str {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(DEFAULT_REPO_NAME)
}

/// Synchronizes one repository. Never fails: errors become
/// [`SyncOutcome::Failed`] tagged with the step that produced them.
pub fn sync<C>(path: &Path, git: &dyn GitRunner, callbacks: &C) -> SyncResult
where
    C: SyncCallbacks + ?Sized,
{
    let start = Instant::now();
    callbacks.on_sync_start(repo_name(path));

    let outcome = match do_sync(path, git, callbacks) {
        Ok(outcome) => outcome,
        Err(StepError { source, step }) => SyncOutcome::Failed {
            step,
            reason: source.to_string(),
        },
    };

    let result = SyncResult {
        path: path.to_path_buf(),
        outcome,
        duration: start.elapsed(),
    };
    match &result.outcome {
        SyncOutcome::Failed { step, reason } => {
            tracing::warn!(repo = %path.display(), %step, %reason, "synchronization failed");
        }
        outcome => {
            tracing::info!(repo = %path.display(), ?outcome, "synchronization finished");
        }
    }
    result
}

fn do_sync<C>(path: &Path, git: &dyn GitRunner, callbacks: &C) -> Result<SyncOutcome, StepError>
where
    C: SyncCallbacks + ?Sized,
{
    callbacks.on_step(&SyncStep::Started);

    let state = remote::inspect(git, path, &mut |step| callbacks.on_step(&step))
        .map_err(|(step, source)| StepError { source, step })?;
    let counts = state.counts;

    let step = match sync::decide(counts) {
        sync::Decision::Run(sync::Action::Pull) => SyncStep::Pulling,
        sync::Decision::Run(sync::Action::Push) => SyncStep::Pushing,
        sync::Decision::UpToDate | sync::Decision::Diverged => SyncStep::Completed,
    };
    if step != SyncStep::Completed {
        callbacks.on_step(&step);
    }
    let outcome = at_step(step, sync::execute(git, path, &state))?;

    callbacks.on_step(&SyncStep::Completed);
    Ok(outcome)
}
