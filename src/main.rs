use anyhow::Context;
use clap::Parser;
use std::time::Instant;
use sync_git::cli::Args;
use sync_git::git::Git;
use sync_git::{logging, output, repo, workspace};

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = args.config();
    logging::init(&config);

    let batch = args.batch();
    output::print_working_dir(&batch.parent, &config);

    let (repos, sink) = batch
        .prepare()
        .context("Failed to prepare synchronization")?;
    output::print_workspace_start(repos.len(), &config);

    let progress = output::create_workspace_progress(repos.len(), &config);
    let git = Git::new(&config);
    let start = Instant::now();

    let results = workspace::sync_workspace(
        &repos,
        &git,
        &sink,
        |path| progress.create_repo_tracker(repo::repo_name(path), config),
        &config,
    );
    progress.finish();

    let finished = sink.finish();
    output::print_summary(&results, start.elapsed(), &config, batch.log_file.as_deref());
    finished.context("Failed to write the report")?;

    Ok(())
}
