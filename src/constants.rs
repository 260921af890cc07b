//! Application-wide constants.
//!
//! Centralized configuration values to avoid magic numbers throughout the codebase.

use std::time::Duration;

/// Default timeout for individual git operations (in seconds).
/// Generous because `fetch`, `pull` and `push` go over the network.
const DEFAULT_GIT_TIMEOUT_SECS: u64 = 120;

/// Environment variable overriding the per-command timeout.
pub const GIT_TIMEOUT_ENV: &str = "SYNC_GIT_TIMEOUT";

/// Returns the git command timeout.
///
/// Can be customized via the SYNC_GIT_TIMEOUT environment variable (in seconds).
/// Falls back to 120 seconds if not set or invalid.
///
/// Example: `SYNC_GIT_TIMEOUT=300 sync-git ~/src`
pub fn git_timeout() -> Duration {
    parse_timeout(std::env::var(GIT_TIMEOUT_ENV).ok().as_deref())
}

fn parse_timeout(value: Option<&str>) -> Duration {
    value
        .and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(DEFAULT_GIT_TIMEOUT_SECS))
}

/// Default size of the worker pool running repository pipelines.
/// Higher than CPU count because git operations are I/O-bound (network, disk),
/// but bounded so a large workspace does not spawn hundreds of git processes at once.
pub const DEFAULT_JOBS: usize = 16;

/// Progress bar tick interval in milliseconds.
pub const PROGRESS_TICK_MS: u64 = 80;

/// Maximum number of completed repositories to show in the workspace progress display.
pub const MAX_VISIBLE_COMPLETIONS: usize = 5;

/// Suffix of the directory entry that marks a git working copy.
pub const GIT_DIR_SUFFIX: &str = ".git";

/// Default name used when a repository name cannot be determined from its path.
pub const DEFAULT_REPO_NAME: &str = "repository";

/// Body written to the report for a repository that needed no action.
pub const UP_TO_DATE_MESSAGE: &str = "Repository up to date";

/// Separator between a repository path and its report body.
pub const BLOCK_HEADER_SUFFIX: &str = " :";
