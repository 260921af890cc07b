//! Configuration types for CLI verbosity and options.

use crate::constants::{self, DEFAULT_JOBS};
use crate::git::{self, GitLogger};
use std::time::{Duration, Instant};

/// Runtime configuration derived from CLI arguments.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Controls the verbosity level of CLI output.
    pub verbosity: Verbosity,
    /// Size of the worker pool running repository pipelines.
    pub jobs: usize,
    /// Upper bound for a single git invocation.
    pub command_timeout: Duration,
    /// Point in time after which no further git invocation may run.
    pub deadline: Option<Instant>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            verbosity: Verbosity::default(),
            jobs: DEFAULT_JOBS,
            command_timeout: constants::git_timeout(),
            deadline: None,
        }
    }
}

impl Config {
    #[must_use]
    pub fn is_quiet(&self) -> bool {
        self.verbosity == Verbosity::Quiet
    }

    #[must_use]
    pub fn is_verbose(&self) -> bool {
        self.verbosity == Verbosity::Verbose
    }

    /// Sets the overall deadline `budget` from now.
    #[must_use]
    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.deadline = Some(Instant::now() + budget);
        self
    }

    /// Number of workers to use; verbose mode runs one repository at a time
    /// so echoed commands from different repositories do not interleave.
    #[must_use]
    pub fn effective_jobs(&self) -> usize {
        if self.is_verbose() { 1 } else { self.jobs.max(1) }
    }

    /// Time allowed for the next git invocation, as of `now`.
    ///
    /// This is the per-command timeout, shortened to whatever is left of the
    /// overall deadline. `Duration::ZERO` means the deadline has passed.
    #[must_use]
    pub fn command_budget_at(&self, now: Instant) -> Duration {
        match self.deadline {
            Some(deadline) => self
                .command_timeout
                .min(deadline.saturating_duration_since(now)),
            None => self.command_timeout,
        }
    }

    /// Returns the appropriate git logger based on verbosity settings.
    ///
    /// This is a presentation-layer concern: config controls which logger
    /// function to use, but doesn't implement logging itself. The actual
    /// logging is implemented as callbacks in the git module.
    #[must_use]
    pub fn git_logger(&self) -> GitLogger {
        if self.is_verbose() {
            git::verbose_logger
        } else {
            git::no_op_logger
        }
    }

    /// Default `tracing` filter directive when `RUST_LOG` is not set.
    #[must_use]
    pub fn log_filter(&self) -> &'static str {
        match self.verbosity {
            Verbosity::Quiet => "off",
            Verbosity::Normal => "warn",
            Verbosity::Verbose => "debug",
        }
    }
}

/// Verbosity level for CLI output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
}
