//! Remote state inspection for a single repository.
//!
//! Answers three questions about a working copy: which branch is checked
//! out, which remote-tracking reference it follows, and how far the two
//! have drifted apart after a fetch.

use crate::error::SyncError;
use crate::git::GitRunner;
use crate::repo::SyncStep;
use std::path::Path;

/// Commit counts between HEAD and its upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AheadBehind {
    /// Commits the upstream has that HEAD lacks.
    pub behind: u32,
    /// Commits HEAD has that the upstream lacks.
    pub ahead: u32,
}

impl AheadBehind {
    #[must_use]
    pub fn new(behind: u32, ahead: u32) -> Self {
        Self { behind, ahead }
    }
}

/// Where a repository stands relative to its upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteState {
    pub branch: String,
    /// Remote-tracking reference, `<remote>/<branch>`.
    pub upstream: String,
    pub remote_name: String,
    pub counts: AheadBehind,
}

impl RemoteState {
    #[must_use]
    pub fn new(branch: &str, upstream: &str, counts: AheadBehind) -> Self {
        Self {
            branch: branch.to_string(),
            upstream: upstream.to_string(),
            remote_name: remote_of(upstream).to_string(),
            counts,
        }
    }
}

/// First path segment of an upstream reference (`origin/main` -> `origin`).
#[must_use]
pub fn remote_of(upstream: &str) -> &str {
    upstream
        .split_once('/')
        .map_or(upstream, |(remote, _)| remote)
}

/// Rejects names git would misread as options or that cannot be a ref.
pub fn validate_ref_name(kind: &str, name: &str) -> Result<(), SyncError> {
    if name.is_empty() || name.starts_with('-') || name.contains(['\0', '\n', ' ']) {
        return Err(SyncError::InvalidArgument(format!(
            "invalid {kind} name: {name:?}"
        )));
    }
    Ok(())
}

pub fn current_branch(git: &dyn GitRunner, repo: &Path) -> Result<String, SyncError> {
    let result = git.run(repo, &["rev-parse", "--abbrev-ref", "HEAD"])?;
    let output = result.output.trim().to_string();

    if !result.success() {
        return Err(if output.contains("not a git repository") {
            SyncError::NotARepository { output }
        } else {
            SyncError::NoCommits { output }
        });
    }
    if output == "HEAD" {
        return Err(SyncError::DetachedHead);
    }
    Ok(output)
}

pub fn upstream_of(git: &dyn GitRunner, repo: &Path, branch: &str) -> Result<String, SyncError> {
    validate_ref_name("branch", branch)?;
    let spec = format!("{branch}@{{upstream}}");
    let result = git.run(repo, &["rev-parse", "--abbrev-ref", &spec])?;
    let upstream = result.output.trim();

    if !result.success() || upstream.is_empty() {
        return Err(SyncError::NoUpstream {
            branch: branch.to_string(),
        });
    }
    Ok(upstream.to_string())
}

/// Updates the remote-tracking refs of `remote`.
pub fn fetch(git: &dyn GitRunner, repo: &Path, remote: &str) -> Result<(), SyncError> {
    validate_ref_name("remote", remote)?;
    git.run_checked(repo, &["fetch", remote])?;
    Ok(())
}

pub fn ahead_behind(
    git: &dyn GitRunner,
    repo: &Path,
    upstream: &str,
) -> Result<AheadBehind, SyncError> {
    validate_ref_name("upstream", upstream)?;
    let range = format!("{upstream}...HEAD");
    let args = ["rev-list", "--count", "--left-right", range.as_str()];
    let output = git.run_checked(repo, &args)?;

    parse_counts(&output).ok_or_else(|| SyncError::UnexpectedOutput {
        command: format!("git {}", args.join(" ")),
        output,
    })
}

/// Parses `rev-list --left-right --count` output: `<behind>\t<ahead>`.
fn parse_counts(output: &str) -> Option<AheadBehind> {
    let mut fields = output.split_whitespace();
    let behind = fields.next()?.parse().ok()?;
    let ahead = fields.next()?.parse().ok()?;
    if fields.next().is_some() {
        return None;
    }
    Some(AheadBehind::new(behind, ahead))
}

/// Branch, upstream, fetch and comparison in one go.
///
/// `on_step` hears each step before it runs. A failure carries the step
/// that produced it.
pub fn inspect(
    git: &dyn GitRunner,
    repo: &Path,
    on_step: &mut dyn FnMut(SyncStep),
) -> Result<RemoteState, (SyncStep, SyncError)> {
    let tagged = |step: SyncStep| move |err: SyncError| (step, err);

    on_step(SyncStep::DetectingBranch);
    let branch = current_branch(git, repo).map_err(tagged(SyncStep::DetectingBranch))?;

    on_step(SyncStep::ResolvingUpstream);
    let upstream =
        upstream_of(git, repo, &branch).map_err(tagged(SyncStep::ResolvingUpstream))?;

    on_step(SyncStep::Fetching);
    fetch(git, repo, remote_of(&upstream)).map_err(tagged(SyncStep::Fetching))?;

    on_step(SyncStep::Comparing);
    let counts = ahead_behind(git, repo, &upstream).map_err(tagged(SyncStep::Comparing))?;

    Ok(RemoteState::new(&branch, &upstream, counts))
}
