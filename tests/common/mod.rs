//! Test infrastructure for sync-git integration tests.
#![allow(dead_code)]

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use sync_git::config::Config;
use sync_git::git::run_git;
use sync_git::repo::{SyncCallbacks, SyncResult, SyncStep};
use tempfile::TempDir;

pub fn test_config() -> Config {
    Config {
        jobs: 4,
        ..Config::default()
    }
}

fn configure_identity(path: &Path) -> Result<()> {
    run_git(path, &["config", "user.email", "test@example.com"])?;
    run_git(path, &["config", "user.name", "Test User"])?;
    run_git(path, &["config", "pull.rebase", "false"])?;
    Ok(())
}

/// Initializes a repository at `path` with one commit on `branch`.
pub fn init_repo(path: &Path, branch: &str) -> Result<()> {
    std::fs::create_dir_all(path)?;
    run_git(path, &["init", "-b", branch])?;
    configure_identity(path)?;
    std::fs::write(path.join("README.md"), "# Test Repo\n")?;
    run_git(path, &["add", "README.md"])?;
    run_git(path, &["commit", "-m", "Initial commit"])?;
    Ok(())
}

/// Adds a commit touching `file` and returns nothing; the content is unique per call.
pub fn commit_file(repo: &Path, file: &str, message: &str) -> Result<()> {
    let path = repo.join(file);
    let mut content = std::fs::read_to_string(&path).unwrap_or_default();
    content.push_str(message);
    content.push('\n');
    std::fs::write(&path, content)?;
    run_git(repo, &["add", file])?;
    run_git(repo, &["commit", "-m", message])?;
    Ok(())
}

pub fn head_commit(repo: &Path) -> Result<String> {
    Ok(run_git(repo, &["rev-parse", "HEAD"])?)
}

/// A bare repository acting as `origin`, seeded with one commit on `master`.
/// Automatically cleaned up when dropped.
pub struct TestRemote {
    dir: TempDir,
}

impl TestRemote {
    pub fn new() -> Result<Self> {
        let dir = TempDir::new()?;
        run_git(dir.path(), &["init", "--bare", "-b", "master"])?;

        let seed = TempDir::new()?;
        init_repo(seed.path(), "master")?;
        run_git(seed.path(), &["remote", "add", "origin", &path_str(dir.path())])?;
        run_git(seed.path(), &["push", "-u", "origin", "master"])?;

        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Clones this remote to `dest`; the clone tracks `origin/master`.
    pub fn clone_into(&self, dest: &Path) -> Result<()> {
        let parent = dest.parent().unwrap_or(Path::new("/"));
        std::fs::create_dir_all(parent)?;
        run_git(parent, &["clone", &path_str(self.path()), &path_str(dest)])?;
        configure_identity(dest)?;
        Ok(())
    }

    /// Pushes `count` new commits to `master` from a throwaway clone.
    pub fn advance(&self, count: usize) -> Result<()> {
        let scratch = TempDir::new()?;
        let writer = scratch.path().join("writer");
        self.clone_into(&writer)?;
        for i in 0..count {
            commit_file(&writer, "upstream.txt", &format!("Upstream commit {i}"))?;
        }
        run_git(&writer, &["push", "origin", "master"])?;
        Ok(())
    }

    pub fn head(&self) -> Result<String> {
        Ok(run_git(self.path(), &["rev-parse", "master"])?)
    }
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// One cloned repository of a test workspace, with its own remote.
pub struct WorkspaceRepo {
    pub path: PathBuf,
    pub remote: TestRemote,
}

/// Clones a fresh remote into `workspace/<name>` for each name.
pub fn setup_workspace_with_repos(workspace: &TempDir, names: &[&str]) -> Result<Vec<WorkspaceRepo>> {
    names
        .iter()
        .map(|name| {
            let remote = TestRemote::new()?;
            let path = workspace.path().join(name);
            remote.clone_into(&path)?;
            Ok(WorkspaceRepo { path, remote })
        })
        .collect()
}

/// Callbacks counting steps and completions across threads.
#[derive(Clone)]
pub struct CountingCallbacks {
    steps: Arc<AtomicUsize>,
    completed: Arc<AtomicUsize>,
}

impl CountingCallbacks {
    pub fn new() -> (Self, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let steps = Arc::new(AtomicUsize::new(0));
        let completed = Arc::new(AtomicUsize::new(0));
        (
            Self {
                steps: Arc::clone(&steps),
                completed: Arc::clone(&completed),
            },
            steps,
            completed,
        )
    }
}

impl SyncCallbacks for CountingCallbacks {
    fn on_step(&self, _step: &SyncStep) {
        self.steps.fetch_add(1, Ordering::SeqCst);
    }

    fn on_complete(&self, _result: &SyncResult) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }
}
