//! Progress bars, colored output, and summary formatting.
//!
//! This module provides visual feedback during a workspace synchronization:
//! a progress bar with the most recent completions, and a colored summary.

use crate::config::Config;
use crate::constants::{MAX_VISIBLE_COMPLETIONS, PROGRESS_TICK_MS};
use crate::repo::{SyncCallbacks, SyncResult, SyncStep};
use crate::sync::SyncOutcome;
use colored::{ColoredString, Colorize};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// No-op callbacks for when progress tracking is not needed.
/// This is the null object pattern for SyncCallbacks - use it when
/// you don't need any output or progress tracking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoOpCallbacks;

impl SyncCallbacks for NoOpCallbacks {
    fn on_step(&self, _step: &SyncStep) {}
    fn on_complete(&self, _result: &SyncResult) {}
}

/// Prints a repository header in verbose mode.
pub fn print_repo_header(config: &Config, repo_name: &str) {
    if !config.is_verbose() {
        return;
    }
    eprintln!("\n{}", format!("[{}]", repo_name).white().bold());
}

/// Prints a step progress message in verbose mode.
pub fn print_step(config: &Config, step: &SyncStep) {
    if !config.is_verbose() || matches!(step, SyncStep::Started | SyncStep::Completed) {
        return;
    }
    eprintln!("  {}", format_step_message(step).dimmed());
}

fn outcome_symbol(outcome: &SyncOutcome) -> ColoredString {
    match outcome {
        SyncOutcome::UpToDate => "✓".green(),
        SyncOutcome::Pulled(_) => "↓".cyan(),
        SyncOutcome::Pushed(_) => "↑".cyan(),
        SyncOutcome::Diverged { .. } => "⇅".yellow(),
        SyncOutcome::Failed { .. } => "✗".red(),
    }
}

/// Consolidated state for workspace progress tracking.
/// Combining these fields reduces lock contention by acquiring a single lock
/// instead of multiple separate locks for related data.
struct CompletionState {
    /// Recently completed repos for display (bounded by MAX_VISIBLE_COMPLETIONS)
    repos: VecDeque<(String, ColoredString)>,
    /// Repos needing attention (failed or diverged), for the status message
    attention_count: usize,
    /// Total completed for determining ellipsis display
    total_completed: usize,
}

/// Thread-safe progress tracker for workspace mode.
/// Shows a progress bar with the completion count and recent results.
#[derive(Clone)]
pub struct WorkspaceProgress {
    multi: Arc<MultiProgress>,
    main_bar: ProgressBar,
    completion_slots: Vec<ProgressBar>,
    state: Arc<Mutex<CompletionState>>,
}

impl WorkspaceProgress {
    pub fn create_repo_tracker(&self, repo_name: &str, config: Config) -> RepoProgressTracker {
        RepoProgressTracker {
            repo_name: repo_name.to_string(),
            workspace: self.clone(),
            config,
        }
    }

    pub fn mark_completed(&self, repo_name: &str, outcome: &SyncOutcome) {
        self.main_bar.inc(1);

        let mut state = self
            .state
            .lock()
            .expect("WorkspaceProgress state mutex poisoned");

        if matches!(
            outcome,
            SyncOutcome::Failed { .. } | SyncOutcome::Diverged { .. }
        ) {
            state.attention_count += 1;
            self.main_bar.set_message(
                format!("│ {} need attention", state.attention_count)
                    .red()
                    .to_string(),
            );
        }

        state.total_completed += 1;
        state
            .repos
            .push_back((repo_name.to_string(), outcome_symbol(outcome)));

        while state.repos.len() > MAX_VISIBLE_COMPLETIONS {
            state.repos.pop_front();
        }

        self.redraw_completions(&state);
    }

    /// Hides the bars while `f` writes to the terminal.
    pub fn suspend<F: FnOnce() -> R, R>(&self, f: F) -> R {
        self.multi.suspend(f)
    }

    pub fn finish(&self) {
        self.main_bar.finish_and_clear();
        for slot in &self.completion_slots {
            slot.finish_and_clear();
        }
    }

    fn redraw_completions(&self, state: &CompletionState) {
        let show_ellipsis = state.total_completed > MAX_VISIBLE_COMPLETIONS;

        for (i, slot) in self.completion_slots.iter().enumerate() {
            if i == 0 && show_ellipsis {
                slot.set_message("...".dimmed().to_string());
            } else {
                let idx = if show_ellipsis { i - 1 } else { i };
                if idx < state.repos.len() {
                    let (name, symbol) = &state.repos[idx];
                    slot.set_message(format!("{} {}", symbol, name));
                } else {
                    slot.set_message("");
                }
            }
        }
    }
}

/// Per-repository progress tracker for workspace mode.
/// Implements `SyncCallbacks` to receive completion notifications.
#[derive(Clone)]
pub struct RepoProgressTracker {
    repo_name: String,
    workspace: WorkspaceProgress,
    config: Config,
}

impl SyncCallbacks for RepoProgressTracker {
    fn on_sync_start(&self, repo_name: &str) {
        print_repo_header(&self.config, repo_name);
    }

    fn on_step(&self, step: &SyncStep) {
        print_step(&self.config, step);
    }

    fn on_complete(&self, result: &SyncResult) {
        self.workspace.mark_completed(&self.repo_name, &result.outcome);
    }

    fn present_report(&self, report: &mut dyn FnMut()) {
        self.workspace.suspend(report);
    }
}

/// Creates a progress bar for workspace synchronization showing completion count.
/// Returns hidden progress bars in quiet or verbose mode.
#[must_use]
pub fn create_workspace_progress(total: usize, config: &Config) -> WorkspaceProgress {
    let multi = Arc::new(MultiProgress::new());
    let hide_progress = config.is_quiet() || config.is_verbose();

    let main_bar = if hide_progress {
        ProgressBar::hidden()
    } else {
        let bar = multi.add(ProgressBar::new(total as u64));
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{bar:40.cyan/blue} {pos}/{len} synchronized {spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█░"),
        );
        bar.enable_steady_tick(Duration::from_millis(PROGRESS_TICK_MS));
        bar
    };

    let completion_slots: Vec<ProgressBar> = if hide_progress {
        vec![]
    } else {
        (0..MAX_VISIBLE_COMPLETIONS)
            .map(|_| {
                let slot = multi.add(ProgressBar::new_spinner());
                slot.set_style(
                    ProgressStyle::default_spinner()
                        .template("  {msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                );
                slot
            })
            .collect()
    };

    WorkspaceProgress {
        multi,
        main_bar,
        completion_slots,
        state: Arc::new(Mutex::new(CompletionState {
            repos: VecDeque::new(),
            attention_count: 0,
            total_completed: 0,
        })),
    }
}

pub fn print_working_dir(path: &Path, config: &Config) {
    if config.is_quiet() {
        return;
    }
    println!(
        "{} {}",
        "Synchronizing:".cyan(),
        path.display().to_string().white().bold()
    )
}

pub fn print_workspace_start(count: usize, config: &Config) {
    if config.is_quiet() {
        return;
    }
    if count == 0 {
        print_no_repos()
    } else {
        println!(
            "{}",
            format!(
                "Synchronizing {} repositories with {} workers",
                count,
                config.effective_jobs()
            )
            .dimmed()
        )
    }
}

/// Per-kind totals of a finished batch.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Tally {
    pub up_to_date: usize,
    pub pulled: usize,
    pub pushed: usize,
    pub diverged: usize,
    pub failed: usize,
}

impl Tally {
    #[must_use]
    pub fn of(results: &[SyncResult]) -> Self {
        results.iter().fold(Self::default(), |mut tally, r| {
            match r.outcome {
                SyncOutcome::UpToDate => tally.up_to_date += 1,
                SyncOutcome::Pulled(_) => tally.pulled += 1,
                SyncOutcome::Pushed(_) => tally.pushed += 1,
                SyncOutcome::Diverged { .. } => tally.diverged += 1,
                SyncOutcome::Failed { .. } => tally.failed += 1,
            }
            tally
        })
    }

    #[must_use]
    pub fn synchronized(&self) -> usize {
        self.up_to_date + self.pulled + self.pushed
    }
}

pub fn print_summary(
    results: &[SyncResult],
    duration: Duration,
    config: &Config,
    log_file: Option<&Path>,
) {
    if config.is_quiet() {
        print_quiet_summary(results);
    } else {
        print_normal_summary(results, duration, log_file);
    }
}

fn print_quiet_summary(results: &[SyncResult]) {
    let tally = Tally::of(results);

    // Always print count to stdout
    println!(
        "{}/{} repositories synchronized",
        tally.synchronized(),
        results.len()
    );

    // Print problems to stderr
    for result in results {
        match &result.outcome {
            SyncOutcome::Failed { reason, .. } => {
                eprintln!("error: {}: {}", result.path.display(), reason);
            }
            SyncOutcome::Diverged { behind, ahead } => {
                eprintln!(
                    "warning: {}: diverged ({} ahead, {} behind)",
                    result.path.display(),
                    ahead,
                    behind
                );
            }
            _ => {}
        }
    }
}

fn print_normal_summary(results: &[SyncResult], duration: Duration, log_file: Option<&Path>) {
    print_section("Summary");
    let tally = Tally::of(results);

    print_counts(&tally);
    print_attention(results);

    println!(
        "{}: {}/{} repos synchronized in {}",
        "Total".white().bold(),
        tally.synchronized(),
        results.len(),
        format_duration(duration)
    );
    if let Some(log_file) = log_file {
        println!("{} {}", "Report written to".dimmed(), log_file.display());
    }
}

fn print_no_repos() {
    println!("{}", "No git repositories found".yellow().bold())
}

fn format_duration(duration: Duration) -> String {
    format!("{:.2}s", duration.as_secs_f32())
}

fn print_section(title: &str) {
    let line = "=".repeat(50).cyan().dimmed();
    let padding = (50 - title.len()) / 2;
    let centered = format!("{:>width$}", title, width = padding + title.len());
    println!("\n{}\n{}\n{}\n", line, centered.cyan().bold(), line);
}

fn print_counts(tally: &Tally) {
    let rows = [
        ("Up to date", tally.up_to_date, "✓".green()),
        ("Pulled", tally.pulled, "↓".cyan()),
        ("Pushed", tally.pushed, "↑".cyan()),
        ("Diverged", tally.diverged, "⇅".yellow()),
        ("Failed", tally.failed, "✗".red()),
    ];
    for (label, count, symbol) in rows {
        if count > 0 {
            println!("  {} {:<11} {}", symbol, label, count);
        }
    }
    println!();
}

fn print_attention(results: &[SyncResult]) {
    let needing: Vec<&SyncResult> = results
        .iter()
        .filter(|r| !r.outcome.is_synchronized())
        .collect();
    if needing.is_empty() {
        return;
    }

    println!(
        "{}",
        format!("Needs attention ({}):", needing.len()).red().bold()
    );
    for result in needing {
        let detail = match &result.outcome {
            SyncOutcome::Failed { step, reason } => {
                format!("while {}: {}", step, first_line(reason)).red()
            }
            SyncOutcome::Diverged { behind, ahead } => {
                format!("diverged: {} ahead, {} behind", ahead, behind).yellow()
            }
            _ => continue,
        };
        println!(
            "  {} {} {} in {}",
            outcome_symbol(&result.outcome),
            result.path.display().to_string().white(),
            detail,
            format_duration(result.duration).dimmed(),
        );
    }
    println!();
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default()
}

fn format_step_message(step: &SyncStep) -> &'static str {
    match step {
        SyncStep::Started => "Starting synchronization...",
        SyncStep::DetectingBranch => "Detecting current branch...",
        SyncStep::ResolvingUpstream => "Resolving upstream branch...",
        SyncStep::Fetching => "Fetching from remote...",
        SyncStep::Comparing => "Comparing with upstream...",
        SyncStep::Pulling => "Pulling changes from upstream...",
        SyncStep::Pushing => "Pushing changes to upstream...",
        SyncStep::Completed => "Completed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn result(path: &str, outcome: SyncOutcome) -> SyncResult {
        SyncResult {
            path: PathBuf::from(path),
            outcome,
            duration: Duration::from_millis(250),
        }
    }

    fn mixed_results() -> Vec<SyncResult> {
        vec![
            result("/w/a", SyncOutcome::UpToDate),
            result("/w/b", SyncOutcome::Pulled("Fast-forward".to_string())),
            result("/w/c", SyncOutcome::Pushed(String::new())),
            result("/w/d", SyncOutcome::Diverged { behind: 1, ahead: 1 }),
            result(
                "/w/e",
                SyncOutcome::Failed {
                    step: SyncStep::Fetching,
                    reason: "fatal: unable to access\nsecond line".to_string(),
                },
            ),
            result("/w/f", SyncOutcome::UpToDate),
        ]
    }

    #[test]
    fn test_format_duration_rounds_to_two_decimals() {
        assert_eq!(format_duration(Duration::from_millis(1234)), "1.23s");
        assert_eq!(format_duration(Duration::from_millis(5678)), "5.68s");
        assert_eq!(format_duration(Duration::from_secs(42)), "42.00s");
    }

    #[test]
    fn test_tally_counts_each_outcome_kind() {
        let tally = Tally::of(&mixed_results());
        assert_eq!(
            tally,
            Tally {
                up_to_date: 2,
                pulled: 1,
                pushed: 1,
                diverged: 1,
                failed: 1,
            }
        );
        assert_eq!(tally.synchronized(), 4);
    }

    #[test]
    fn test_first_line_of_multiline_reason() {
        assert_eq!(first_line("one\ntwo"), "one");
        assert_eq!(first_line(""), "");
    }

    #[test]
    fn test_format_step_message_covers_pipeline_steps() {
        assert_eq!(
            format_step_message(&SyncStep::DetectingBranch),
            "Detecting current branch..."
        );
        assert_eq!(
            format_step_message(&SyncStep::Fetching),
            "Fetching from remote..."
        );
        assert_eq!(
            format_step_message(&SyncStep::Pulling),
            "Pulling changes from upstream..."
        );
        assert_eq!(format_step_message(&SyncStep::Completed), "Completed");
    }

    #[test]
    fn test_no_op_callbacks_implements_all_required_methods() {
        let callbacks = NoOpCallbacks;
        let result = result("/test/repo", SyncOutcome::UpToDate);

        // These should not panic
        callbacks.on_sync_start("test");
        callbacks.on_step(&SyncStep::Started);
        callbacks.on_complete(&result);
        let mut ran = false;
        callbacks.present_report(&mut || ran = true);
        assert!(ran);
    }

    #[test]
    fn test_hidden_progress_tracks_completions() {
        let config = Config {
            verbosity: crate::config::Verbosity::Quiet,
            ..Config::default()
        };
        let progress = create_workspace_progress(8, &config);
        for r in mixed_results() {
            let tracker = progress.create_repo_tracker(crate::repo::repo_name(&r.path), config);
            tracker.on_complete(&r);
        }

        let state = progress.state.lock().unwrap();
        assert_eq!(state.total_completed, 6);
        assert_eq!(state.attention_count, 2);
        assert_eq!(state.repos.len(), MAX_VISIBLE_COMPLETIONS);
        drop(state);
        progress.finish();
    }

    #[test]
    fn test_summaries_do_not_panic() {
        // This is more of a smoke test - we can't easily capture stdout
        // but we can ensure it doesn't panic with various inputs
        let results = mixed_results();
        print_quiet_summary(&results);
        print_quiet_summary(&[]);
        print_normal_summary(&results, Duration::from_secs(3), Some(Path::new("/tmp/sync.log")));
        print_normal_summary(&[], Duration::ZERO, None);
    }
}
