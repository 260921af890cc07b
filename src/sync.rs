//! Decides between pull, push and nothing, then does it.

use crate::error::SyncError;
use crate::git::{CommandOutput, GitRunner};
use crate::remote::{AheadBehind, RemoteState, validate_ref_name};
use crate::repo::SyncStep;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Pull,
    Push,
}

impl Action {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Pull => "pull",
            Action::Push => "push",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the ahead/behind counts call for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    UpToDate,
    Run(Action),
    /// Both sides have commits the other lacks; needs a human.
    Diverged,
}

#[must_use]
pub fn decide(counts: AheadBehind) -> Decision {
    match (counts.behind, counts.ahead) {
        (0, 0) => Decision::UpToDate,
        (_, 0) => Decision::Run(Action::Pull),
        (0, _) => Decision::Run(Action::Push),
        (_, _) => Decision::Diverged,
    }
}

/// Final result of synchronizing one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    UpToDate,
    Pulled(String),
    Pushed(String),
    Diverged { behind: u32, ahead: u32 },
    Failed { step: SyncStep, reason: String },
}

impl SyncOutcome {
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, SyncOutcome::Failed { .. })
    }

    /// True when the repository is now level with its upstream.
    #[must_use]
    pub fn is_synchronized(&self) -> bool {
        matches!(
            self,
            SyncOutcome::UpToDate | SyncOutcome::Pulled(_) | SyncOutcome::Pushed(_)
        )
    }
}

/// Runs `git <action>` for one branch, or `--all` when no branch is given.
///
/// Branch and remote go together: supplying only one of them is a caller bug.
pub fn push_pull(
    git: &dyn GitRunner,
    action: Action,
    repo: &Path,
    branch: Option<&str>,
    remote: Option<&str>,
) -> Result<CommandOutput, SyncError> {
    match (branch, remote) {
        (None, None) => git.run(repo, &[action.as_str(), "--all"]),
        (Some(branch), Some(remote)) => {
            validate_ref_name("branch", branch)?;
            validate_ref_name("remote", remote)?;
            git.run(repo, &[action.as_str(), remote, branch])
        }
        (Some(branch), None) => Err(SyncError::InvalidArgument(format!(
            "{action} of branch '{branch}' requires a remote"
        ))),
        (None, Some(remote)) => Err(SyncError::InvalidArgument(format!(
            "{action} from remote '{remote}' requires a branch"
        ))),
    }
}

/// Applies the decision for `state`, issuing at most one pull or push.
pub fn execute(
    git: &dyn GitRunner,
    repo: &Path,
    state: &RemoteState,
) -> Result<SyncOutcome, SyncError> {
    let action = match decide(state.counts) {
        Decision::UpToDate => return Ok(SyncOutcome::UpToDate),
        Decision::Diverged => {
            return Ok(SyncOutcome::Diverged {
                behind: state.counts.behind,
                ahead: state.counts.ahead,
            });
        }
        Decision::Run(action) => action,
    };

    let result = push_pull(
        git,
        action,
        repo,
        Some(&state.branch),
        Some(&state.remote_name),
    )?;
    let command = format!("git {action} {} {}", state.remote_name, state.branch);
    let output = result.into_success(&command)?;

    Ok(match action {
        Action::Pull => SyncOutcome::Pulled(output),
        Action::Push => SyncOutcome::Pushed(output),
    })
}
