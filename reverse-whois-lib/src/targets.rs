//! Target collection and deduplication.
//!
//! Targets come from three places and are merged in a fixed order: piped
//! standard input first, then target list files, then values given directly.
//! The first occurrence of a term wins and fixes its dispatch position.

use crate::error::ReverseWhoisError;
use crate::utils::{read_lines, read_lines_from, split_csv};
use std::collections::HashSet;
use std::io::{BufRead, IsTerminal};
use tracing::debug;

/// Raw target inputs as supplied by the caller.
#[derive(Debug, Clone, Default)]
pub struct TargetSources {
    /// Direct values; each may itself be a comma-separated list
    pub values: Vec<String>,

    /// Target list files; each entry may hold several comma-separated paths
    pub list_files: Vec<String>,

    /// Whether piped standard input should be consulted
    pub read_stdin: bool,
}

/// Ordered, deduplicated set of targets.
#[derive(Debug, Default)]
pub struct TargetSet {
    seen: HashSet<String>,
    ordered: Vec<String>,
}

impl TargetSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one raw value. Returns `true` if it was new.
    pub fn add(&mut self, raw: &str) -> bool {
        let value = raw.trim();
        if value.is_empty() || self.seen.contains(value) {
            return false;
        }
        self.seen.insert(value.to_string());
        self.ordered.push(value.to_string());
        true
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// Freeze the set into its dispatch order.
    pub fn into_targets(self) -> Vec<String> {
        self.ordered
    }

    /// Merge every source into a new set using the given stdin reader.
    ///
    /// `stdin` is only read when `sources.read_stdin` is set and a reader is supplied.
    ///
    /// # Errors
    ///
    /// - `ReadError` if stdin or a list file cannot be read
    /// - `InputError` if nothing usable remains after merging
    pub fn collect_with<R: BufRead>(
        sources: &TargetSources,
        stdin: Option<R>,
    ) -> Result<Self, ReverseWhoisError> {
        let mut set = TargetSet::new();

        if sources.read_stdin {
            if let Some(reader) = stdin {
                let lines = read_lines_from(reader)
                    .map_err(|e| ReverseWhoisError::read("stdin", e.to_string()))?;
                for line in &lines {
                    set.add(line);
                }
                debug!("collected {} target(s) from stdin", set.len());
            }
        }

        for entry in &sources.list_files {
            for path in split_csv(entry) {
                let before = set.len();
                for line in read_lines(&path)? {
                    set.add(&line);
                }
                debug!("collected {} new target(s) from {}", set.len() - before, path);
            }
        }

        for value in &sources.values {
            for part in split_csv(value) {
                set.add(&part);
            }
        }

        if set.is_empty() {
            return Err(ReverseWhoisError::input(
                "No targets provided. Use --target/-t, --target-list/-l, or stdin.",
            ));
        }

        debug!("resolved {} unique target(s)", set.len());
        Ok(set)
    }

    /// Merge every source, reading the process stdin only when input is piped.
    pub fn collect(sources: &TargetSources) -> Result<Self, ReverseWhoisError> {
        let stdin = std::io::stdin();
        let piped = sources.read_stdin && stdin_has_data(&stdin);
        let reader = if piped { Some(stdin.lock()) } else { None };
        Self::collect_with(sources, reader)
    }
}

/// Whether standard input is a pipe or file rather than an interactive terminal.
pub fn stdin_has_data(stdin: &std::io::Stdin) -> bool {
    !stdin.is_terminal()
}
