//! Error taxonomy for repository synchronization.
//!
//! Per-repository errors are recovered at the pipeline boundary and turned
//! into a failed outcome; only [`SyncError::Io`] on the list or log file
//! aborts a whole batch.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("repository has no commits: {output}")]
    NoCommits { output: String },

    #[error("not a git repository: {output}")]
    NotARepository { output: String },

    #[error("HEAD is detached; there is no branch to synchronize")]
    DetachedHead,

    #[error("branch '{branch}' has no upstream configured")]
    NoUpstream { branch: String },

    #[error("`{command}` exited with {}: {output}", exit_code_label(.exit_code))]
    Subprocess {
        command: String,
        exit_code: Option<i32>,
        output: String,
    },

    #[error("failed to spawn `{command}` in {}: {source}", .dir.display())]
    Spawn {
        command: String,
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` timed out after {:.1}s", .after.as_secs_f32())]
    TimedOut { command: String, after: Duration },

    #[error("`{command}` not started: batch deadline exceeded")]
    DeadlineExceeded { command: String },

    #[error("unexpected output from `{command}`: {output:?}")]
    UnexpectedOutput { command: String, output: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn exit_code_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code (killed by signal)".to_string(),
    }
}
