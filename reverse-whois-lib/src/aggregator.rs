//! Single consumer of lookup outcomes.
//!
//! The aggregator is the only writer to the console and file sinks. Each
//! outcome's lines are written as one contiguous block, so lines from
//! different lookups never interleave. File records are deduplicated for the
//! whole run; console lines are not.

use crate::types::{DisplayLine, LookupOutcome};
use std::collections::HashSet;
use std::io::{self, Write};
use tokio::sync::mpsc;
use tracing::debug;

/// Turns a display line into console text.
pub trait LineRenderer: Send + Sync {
    fn render(&self, line: &DisplayLine) -> String;
}

/// Renders `[term] [mode] [scope] [key: value]` with no styling.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainRenderer;

impl LineRenderer for PlainRenderer {
    fn render(&self, line: &DisplayLine) -> String {
        line.to_string()
    }
}

/// Overall outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every lookup succeeded
    Clean,
    /// At least one lookup failed
    HadFailures,
}

impl RunStatus {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunStatus::Clean => 0,
            RunStatus::HadFailures => 1,
        }
    }
}

/// Running totals kept by the aggregator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateStats {
    pub received: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub console_lines: usize,
    pub records_written: usize,
    pub duplicates_skipped: usize,
}

pub struct Aggregator<C: Write, F: Write> {
    console: C,
    file: Option<F>,
    renderer: Box<dyn LineRenderer>,
    show_failures: bool,
    seen: HashSet<String>,
    stats: AggregateStats,
}

impl<C: Write, F: Write> Aggregator<C, F> {
    /// Create an aggregator writing to `console` and, if given, a file sink.
    ///
    /// Defaults to the plain renderer with failure lines shown.
    pub fn new(console: C, file: Option<F>) -> Self {
        Self {
            console,
            file,
            renderer: Box::new(PlainRenderer),
            show_failures: true,
            seen: HashSet::new(),
            stats: AggregateStats::default(),
        }
    }

    pub fn with_renderer<R: LineRenderer + 'static>(mut self, renderer: R) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    /// Whether failure lines reach the console. Failures are counted either way.
    pub fn show_failures(mut self, show: bool) -> Self {
        self.show_failures = show;
        self
    }

    /// Apply one outcome to the sinks and counters.
    pub fn consume(&mut self, outcome: LookupOutcome) -> io::Result<()> {
        self.stats.received += 1;

        match outcome {
            LookupOutcome::Failure { line, .. } => {
                self.stats.failed += 1;
                if self.show_failures {
                    self.write_console(std::slice::from_ref(&line))?;
                }
            }
            LookupOutcome::Success { lines, records, .. } => {
                self.stats.succeeded += 1;
                self.write_console(&lines)?;
                self.write_records(records)?;
            }
        }

        Ok(())
    }

    /// Consume outcomes until the channel closes.
    ///
    /// Stops at the first sink error and returns it.
    pub async fn drain(&mut self, results: &mut mpsc::Receiver<LookupOutcome>) -> io::Result<()> {
        while let Some(outcome) = results.recv().await {
            self.consume(outcome)?;
        }
        debug!(
            received = self.stats.received,
            failed = self.stats.failed,
            records = self.stats.records_written,
            "result stream closed"
        );
        Ok(())
    }

    pub fn stats(&self) -> AggregateStats {
        self.stats
    }

    pub fn status(&self) -> RunStatus {
        if self.stats.failed > 0 {
            RunStatus::HadFailures
        } else {
            RunStatus::Clean
        }
    }

    /// Flush both sinks and hand them back.
    pub fn finish(mut self) -> io::Result<(C, Option<F>)> {
        self.console.flush()?;
        if let Some(file) = self.file.as_mut() {
            file.flush()?;
        }
        Ok((self.console, self.file))
    }

    fn write_console(&mut self, lines: &[DisplayLine]) -> io::Result<()> {
        if lines.is_empty() {
            return Ok(());
        }

        let mut block = String::new();
        for line in lines {
            block.push_str(&self.renderer.render(line));
            block.push('\n');
        }
        self.console.write_all(block.as_bytes())?;
        self.stats.console_lines += lines.len();
        Ok(())
    }

    fn write_records(&mut self, records: Vec<String>) -> io::Result<()> {
        let Some(file) = self.file.as_mut() else {
            return Ok(());
        };

        let mut block = String::new();
        let mut fresh = 0;
        for record in records {
            if record.is_empty() {
                continue;
            }
            if self.seen.contains(&record) {
                self.stats.duplicates_skipped += 1;
                continue;
            }
            block.push_str(&record);
            self.seen.insert(record);
            block.push('\n');
            fresh += 1;
        }

        if fresh > 0 {
            file.write_all(block.as_bytes())?;
            self.stats.records_written += fresh;
        }
        Ok(())
    }
}
