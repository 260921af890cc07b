//! Git repository synchronizer library.
//!
//! This crate keeps a directory of git working copies level with their
//! upstream branches by:
//! - Discovering the repositories under a parent directory (or reading a list)
//! - Detecting each one's current branch and upstream
//! - Fetching and counting commits ahead of and behind the upstream
//! - Pulling when behind, pushing when ahead, reporting divergence
//! - Writing one report block per repository to the console or a log file

pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod git;
pub mod logging;
pub mod output;
pub mod remote;
pub mod report;
pub mod repo;
pub mod sync;
pub mod workspace;
