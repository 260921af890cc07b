//! Git command wrappers.
//!
//! This module runs git as a subprocess with an explicit working directory,
//! capturing stdout and stderr merged into one stream. A non-zero exit is
//! not an error at this level; callers decide what a failure means.

use crate::config::Config;
use crate::error::SyncError;
use colored::Colorize;
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};
use tracing::debug;

/// Callback invoked with every git command line before it runs.
pub type GitLogger = fn(&Path, &[&str]);

/// Echoes the command to stderr (verbose mode).
pub fn verbose_logger(repo: &Path, args: &[&str]) {
    eprintln!(
        "  {} {}",
        "$".dimmed(),
        format!("git {}  ({})", args.join(" "), repo.display()).dimmed()
    );
}

pub fn no_op_logger(_repo: &Path, _args: &[&str]) {}

/// Exit status and merged stdout/stderr of a finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub output: String,
}

impl CommandOutput {
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Returns the trimmed output, or a [`SyncError::Subprocess`] on a non-zero exit.
    pub fn into_success(self, command: &str) -> Result<String, SyncError> {
        if self.success() {
            Ok(self.output.trim().to_string())
        } else {
            Err(SyncError::Subprocess {
                command: command.to_string(),
                exit_code: self.exit_code,
                output: self.output.trim().to_string(),
            })
        }
    }
}

/// Renders a command the way it is shown in logs and errors.
pub fn command_line(command: &Command) -> String {
    std::iter::once(command.get_program())
        .chain(command.get_args())
        .map(|part| part.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Runs `command`, waiting at most `timeout` for it to finish.
///
/// Stdout and stderr share a single pipe so the captured text keeps the
/// order in which the child wrote it. On timeout the child is killed.
pub fn run_command(mut command: Command, timeout: Duration) -> Result<CommandOutput, SyncError> {
    let rendered = command_line(&command);
    let dir = command
        .get_current_dir()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let spawn_error = |source: std::io::Error| SyncError::Spawn {
        command: rendered.clone(),
        dir: dir.clone(),
        source,
    };

    let (mut reader, writer) = std::io::pipe().map_err(spawn_error)?;
    let stdout = writer.try_clone().map_err(spawn_error)?;
    command
        .stdin(Stdio::null())
        .stdout(stdout)
        .stderr(writer);
    // Own process group, so a timeout also reaches helpers git spawned.
    #[cfg(unix)]
    std::os::unix::process::CommandExt::process_group(&mut command, 0);

    let spawned = command.spawn();
    // The command still holds the write ends; drop them so the reader sees EOF.
    drop(command);
    let mut child = spawned.map_err(spawn_error)?;

    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        let result = reader.read_to_end(&mut buf).map(|_| buf);
        let _ = tx.send(result);
    });

    let captured = match rx.recv_timeout(timeout) {
        Ok(result) => result.map_err(spawn_error)?,
        Err(RecvTimeoutError::Timeout) => {
            kill_tree(&mut child);
            let _ = child.wait();
            return Err(SyncError::TimedOut {
                command: rendered.clone(),
                after: timeout,
            });
        }
        Err(RecvTimeoutError::Disconnected) => {
            return Err(spawn_error(std::io::Error::other(
                "output reader exited without a result",
            )));
        }
    };

    let status = child.wait().map_err(spawn_error)?;
    Ok(CommandOutput {
        exit_code: status.code(),
        output: String::from_utf8_lossy(&captured).into_owned(),
    })
}

/// Kills `child` and everything in its process group.
#[cfg(unix)]
fn kill_tree(child: &mut Child) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let group = Pid::from_raw(child.id() as i32);
    if let Err(errno) = killpg(group, Signal::SIGKILL) {
        debug!(pid = child.id(), %errno, "killpg failed; killing the child only");
        let _ = child.kill();
    }
}

#[cfg(not(unix))]
fn kill_tree(child: &mut Child) {
    let _ = child.kill();
}

/// Seam between the sync logic and the git executable.
///
/// Every call names the repository explicitly; implementations must never
/// depend on the process working directory.
pub trait GitRunner: Send + Sync {
    fn run(&self, repo: &Path, args: &[&str]) -> Result<CommandOutput, SyncError>;

    /// Runs `args` and requires a zero exit, returning the trimmed output.
    fn run_checked(&self, repo: &Path, args: &[&str]) -> Result<String, SyncError> {
        self.run(repo, args)?
            .into_success(&format!("git {}", args.join(" ")))
    }
}

/// Runs the `git` executable found on `PATH`.
#[derive(Debug, Clone, Copy)]
pub struct Git {
    config: Config,
    logger: GitLogger,
}

impl Git {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            config: *config,
            logger: config.git_logger(),
        }
    }

    fn command(repo: &Path, args: &[&str]) -> Command {
        let mut command = Command::new("git");
        command
            .current_dir(repo)
            .args(args)
            // Parallel workers must never block on a credential prompt.
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("LC_ALL", "C");
        command
    }
}

impl GitRunner for Git {
    fn run(&self, repo: &Path, args: &[&str]) -> Result<CommandOutput, SyncError> {
        let budget = self.config.command_budget_at(Instant::now());
        if budget.is_zero() {
            return Err(SyncError::DeadlineExceeded {
                command: format!("git {}", args.join(" ")),
            });
        }

        (self.logger)(repo, args);
        debug!(repo = %repo.display(), command = %args.join(" "), "running git");
        let started = Instant::now();
        let result = run_command(Self::command(repo, args), budget)?;
        debug!(
            repo = %repo.display(),
            command = %args.join(" "),
            exit_code = ?result.exit_code,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "git finished"
        );
        Ok(result)
    }
}

/// Runs a git command with default settings, requiring success.
pub fn run_git(repo: &Path, args: &[&str]) -> Result<String, SyncError> {
    Git::new(&Config::default()).run_checked(repo, args)
}
