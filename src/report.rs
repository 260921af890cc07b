//! The aggregate report: where finished repositories are written, and in what shape.
//!
//! A report is a header followed by one block per repository:
//!
//! ```text
//! Log for /home/me/src
//! 2026-10-19 08:30:00 UTC
//!
//! /home/me/src/alpha :
//! Repository up to date
//!
//! /home/me/src/beta :
//! Updating 1a2b3c..4d5e6f
//! Fast-forward
//!
//! ```

use crate::constants::{BLOCK_HEADER_SUFFIX, UP_TO_DATE_MESSAGE};
use crate::error::SyncError;
use crate::repo::SyncResult;
use crate::sync::SyncOutcome;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use time::OffsetDateTime;

/// Destination for finished repository blocks.
///
/// Every block is written under a single lock acquisition, so blocks from
/// concurrent workers never interleave. Blocks that fail to write are
/// counted, and [`LogSink::finish`] reports them.
pub struct LogSink {
    destination: Destination,
    lost_blocks: AtomicUsize,
}

enum Destination {
    /// Print each block to stdout as it completes.
    Console,
    /// Append every block to one shared writer (normally the log file).
    Writer(Mutex<Box<dyn Write + Send>>),
}

impl LogSink {
    #[must_use]
    pub fn console() -> Self {
        Self::with_destination(Destination::Console)
    }

    fn with_destination(destination: Destination) -> Self {
        Self {
            destination,
            lost_blocks: AtomicUsize::new(0),
        }
    }

    /// Creates (truncating) the log file at `path` and writes the header.
    pub fn create(path: &Path, parent: &Path) -> Result<Self, SyncError> {
        let io_error = |source| SyncError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = File::create(path).map_err(io_error)?;
        Self::from_writer(BufWriter::new(file), parent).map_err(io_error)
    }

    /// Wraps an already-open writer, writing the header first.
    pub fn from_writer<W>(mut writer: W, parent: &Path) -> io::Result<Self>
    where
        W: Write + Send + 'static,
    {
        writer.write_all(render_header(parent, &timestamp_now()).as_bytes())?;
        writer.flush()?;
        Ok(Self::with_destination(Destination::Writer(Mutex::new(
            Box::new(writer),
        ))))
    }

    #[must_use]
    pub fn is_console(&self) -> bool {
        matches!(self.destination, Destination::Console)
    }

    /// Number of blocks that could not be written so far.
    #[must_use]
    pub fn lost_blocks(&self) -> usize {
        self.lost_blocks.load(Ordering::SeqCst)
    }

    /// Writes one repository's block atomically and flushes it.
    pub fn write_block(&self, result: &SyncResult) -> io::Result<()> {
        let block = render_block(&result.path, &result.outcome);
        let written = match &self.destination {
            Destination::Console => {
                let mut out = io::stdout().lock();
                out.write_all(block.as_bytes()).and_then(|()| out.flush())
            }
            Destination::Writer(writer) => {
                let mut writer = writer.lock().expect("log sink mutex poisoned");
                writer.write_all(block.as_bytes()).and_then(|()| writer.flush())
            }
        };
        if written.is_err() {
            self.lost_blocks.fetch_add(1, Ordering::SeqCst);
        }
        written
    }

    /// Flushes and closes the destination. Call once every pipeline has finished.
    ///
    /// Fails if the final flush fails or if any block was lost along the way.
    pub fn finish(self) -> io::Result<()> {
        let lost = self.lost_blocks();
        match self.destination {
            Destination::Console => io::stdout().flush()?,
            Destination::Writer(writer) => {
                let mut writer = writer
                    .into_inner()
                    .map_err(|_| io::Error::other("log sink mutex poisoned"))?;
                writer.flush()?;
            }
        }
        if lost > 0 {
            return Err(io::Error::other(format!(
                "{lost} repository block(s) could not be written; the report is incomplete"
            )));
        }
        Ok(())
    }
}

pub fn render_header(parent: &Path, timestamp: &str) -> String {
    format!("Log for {}\n{}\n\n", parent.display(), timestamp)
}

pub fn render_block(path: &Path, outcome: &SyncOutcome) -> String {
    format!(
        "{}{}\n{}\n\n",
        path.display(),
        BLOCK_HEADER_SUFFIX,
        unambiguous_body(&render_body(outcome))
    )
}

/// Drops blank lines that sit right before a body line ending in ` :`,
/// which [`parse_report`] would otherwise read as the start of a new block.
fn unambiguous_body(body: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    for line in body.lines() {
        if line.ends_with(BLOCK_HEADER_SUFFIX) {
            while lines.last().is_some_and(|l| l.trim().is_empty()) {
                lines.pop();
            }
        }
        lines.push(line);
    }
    lines.join("\n")
}

/// Text written under a repository's header line.
pub fn render_body(outcome: &SyncOutcome) -> String {
    match outcome {
        SyncOutcome::UpToDate => UP_TO_DATE_MESSAGE.to_string(),
        SyncOutcome::Pulled(output) => non_empty(output, "Pulled from upstream"),
        SyncOutcome::Pushed(output) => non_empty(output, "Pushed to upstream"),
        SyncOutcome::Diverged { behind, ahead } => format!(
            "Diverged from upstream ({ahead} ahead, {behind} behind); resolve manually"
        ),
        SyncOutcome::Failed { step, reason } => format!("Failed while {step}: {reason}"),
    }
}

fn non_empty(output: &str, fallback: &str) -> String {
    let trimmed = output.trim_end();
    if trimmed.trim().is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Header timestamp, UTC.
pub fn timestamp_now() -> String {
    format_timestamp(OffsetDateTime::now_utc())
}

fn format_timestamp(timestamp: OffsetDateTime) -> String {
    time::format_description::parse("[year]-[month]-[day] [hour]:[minute]:[second] UTC")
        .ok()
        .and_then(|format| timestamp.format(&format).ok())
        .unwrap_or_else(|| timestamp.unix_timestamp().to_string())
}

/// One repository's block read back from a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSection {
    pub path: String,
    pub body: String,
}

/// Splits a report into its per-repository sections, in file order.
///
/// A section starts at a line ending in ` :` that follows a blank line
/// (or the header); the header itself is skipped. Blocks written by
/// [`render_block`] never contain such a line in their body, so every block
/// reads back as exactly one section.
pub fn parse_report(text: &str) -> Vec<ReportSection> {
    let mut sections: Vec<ReportSection> = Vec::new();
    let mut body: Vec<&str> = Vec::new();
    let mut previous_blank = true;

    for line in text.lines().skip_while(|line| !line.is_empty()) {
        let header = previous_blank
            .then(|| line.strip_suffix(BLOCK_HEADER_SUFFIX))
            .flatten()
            .filter(|path| !path.is_empty());

        if let Some(path) = header {
            close_section(&mut sections, &mut body);
            sections.push(ReportSection {
                path: path.to_string(),
                body: String::new(),
            });
        } else if !sections.is_empty() {
            body.push(line);
        }
        previous_blank = line.trim().is_empty();
    }
    close_section(&mut sections, &mut body);
    sections
}

fn close_section(sections: &mut [ReportSection], body: &mut Vec<&str>) {
    if let Some(section) = sections.last_mut() {
        while body.last().is_some_and(|line| line.trim().is_empty()) {
            body.pop();
        }
        section.body = body.join("\n");
    }
    body.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::SyncStep;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn result(path: &str, outcome: SyncOutcome) -> SyncResult {
        SyncResult {
            path: PathBuf::from(path),
            outcome,
            duration: Duration::from_millis(10),
        }
    }

    #[test]
    fn test_header_names_parent_and_timestamp() {
        let header = render_header(Path::new("/work"), "2026-01-02 03:04:05 UTC");
        assert_eq!(header, "Log for /work\n2026-01-02 03:04:05 UTC\n\n");
    }

    #[test]
    fn test_format_timestamp_is_utc_date_time() {
        let ts = OffsetDateTime::from_unix_timestamp(0).unwrap();
        assert_eq!(format_timestamp(ts), "1970-01-01 00:00:00 UTC");
    }

    #[test]
    fn test_render_block_for_each_outcome() {
        let path = Path::new("/work/alpha");
        assert_eq!(
            render_block(path, &SyncOutcome::UpToDate),
            "/work/alpha :\nRepository up to date\n\n"
        );
        assert_eq!(
            render_block(path, &SyncOutcome::Pulled("Fast-forward\n".to_string())),
            "/work/alpha :\nFast-forward\n\n"
        );
        assert_eq!(
            render_body(&SyncOutcome::Pushed(String::new())),
            "Pushed to upstream"
        );
        assert!(
            render_body(&SyncOutcome::Diverged { behind: 1, ahead: 2 })
                .contains("2 ahead, 1 behind")
        );
        assert_eq!(
            render_body(&SyncOutcome::Failed {
                step: SyncStep::Fetching,
                reason: "boom".to_string()
            }),
            "Failed while fetching: boom"
        );
    }

    #[test]
    fn test_writer_sink_writes_header_then_blocks() {
        let buffer = SharedBuffer::default();
        let sink = LogSink::from_writer(buffer.clone(), Path::new("/work")).unwrap();
        assert!(!sink.is_console());

        sink.write_block(&result("/work/alpha", SyncOutcome::UpToDate))
            .unwrap();
        sink.finish().unwrap();

        let text = buffer.contents();
        assert!(text.starts_with("Log for /work\n"));
        assert!(text.ends_with("/work/alpha :\nRepository up to date\n\n"));
    }

    #[test]
    fn test_parse_report_round_trips_blocks_in_any_order() {
        let buffer = SharedBuffer::default();
        let sink = LogSink::from_writer(buffer.clone(), Path::new("/work")).unwrap();
        let results = [
            result("/work/gamma", SyncOutcome::Pushed("To origin\n\n  main -> main\n".to_string())),
            result("/work/alpha", SyncOutcome::UpToDate),
            result(
                "/work/beta",
                SyncOutcome::Failed {
                    step: SyncStep::DetectingBranch,
                    reason: "no such directory".to_string(),
                },
            ),
        ];
        for r in &results {
            sink.write_block(r).unwrap();
        }
        sink.finish().unwrap();

        let sections = parse_report(&buffer.contents());

        assert_eq!(sections.len(), 3);
        let paths: Vec<&str> = sections.iter().map(|s| s.path.as_str()).collect();
        assert_eq!(paths, vec!["/work/gamma", "/work/alpha", "/work/beta"]);
        assert_eq!(sections[0].body, "To origin\n\n  main -> main");
        assert_eq!(sections[1].body, UP_TO_DATE_MESSAGE);
        assert!(sections[2].body.starts_with("Failed while detecting current branch"));
    }

    #[test]
    fn test_parse_report_ignores_colon_lines_inside_body() {
        let text = "Log for /w\nts\n\n/w/a :\nremote: counting :\nok\n\n";
        let sections = parse_report(text);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].body, "remote: counting :\nok");
    }

    #[test]
    fn test_body_line_that_looks_like_a_header_stays_in_its_block() {
        let buffer = SharedBuffer::default();
        let sink = LogSink::from_writer(buffer.clone(), Path::new("/work")).unwrap();
        sink.write_block(&result(
            "/work/alpha",
            SyncOutcome::Pulled("Updating 1..2\n\nsrc/lib.rs :\n 1 file changed\n".to_string()),
        ))
        .unwrap();
        sink.write_block(&result("/work/beta", SyncOutcome::UpToDate))
            .unwrap();
        sink.finish().unwrap();

        let sections = parse_report(&buffer.contents());

        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].path, "/work/alpha");
        assert_eq!(sections[0].body, "Updating 1..2\nsrc/lib.rs :\n 1 file changed");
        assert_eq!(sections[1].path, "/work/beta");
    }

    /// Accepts the header, then fails every later write.
    struct FailsAfterHeader {
        header_written: bool,
    }

    impl Write for FailsAfterHeader {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.header_written {
                return Err(io::Error::other("disk full"));
            }
            self.header_written = true;
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_finish_reports_blocks_that_failed_to_write() {
        let sink = LogSink::from_writer(
            FailsAfterHeader {
                header_written: false,
            },
            Path::new("/work"),
        )
        .unwrap();

        for name in ["/work/a", "/work/b", "/work/c"] {
            assert!(sink.write_block(&result(name, SyncOutcome::UpToDate)).is_err());
        }
        assert_eq!(sink.lost_blocks(), 3);

        let err = sink.finish().unwrap_err();
        assert!(err.to_string().contains("3 repository block(s)"), "{err}");
    }

    #[test]
    fn test_create_fails_for_unwritable_path() {
        let result = LogSink::create(Path::new("/no/such/dir/sync.log"), Path::new("/work"));
        assert!(matches!(result, Err(SyncError::Io { .. })));
    }
}
