//! Core data types for reverse WHOIS runs.
//!
//! This module defines the query parameters shared by every lookup in a run,
//! the per-job outcome handed from workers to the aggregator, and the run
//! configuration with its builder-style setters.

use crate::error::ReverseWhoisError;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::time::Duration;

/// Hard ceiling imposed by the API on requests per second.
pub const MAX_RATE_LIMIT: u32 = 30;

/// Maximum number of exclusion terms accepted by the API.
pub const MAX_EXCLUDE_TERMS: usize = 4;

/// Default API endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://reverse-whois.whoisxmlapi.com/api/v2";

/// Whether a lookup searches current or historic WHOIS records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchScope {
    #[default]
    Current,
    Historic,
}

/// Whether a lookup only counts matches or returns the full list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    Preview,
    #[default]
    Purchase,
}

impl SearchScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchScope::Current => "current",
            SearchScope::Historic => "historic",
        }
    }
}

impl QueryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryMode::Preview => "preview",
            QueryMode::Purchase => "purchase",
        }
    }
}

impl fmt::Display for SearchScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for QueryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Query parameters fixed for the whole run, shared by every job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pub scope: SearchScope,
    pub mode: QueryMode,
    /// Terms the API must exclude from matches (0 to 4)
    pub exclude: Vec<String>,
}

impl QueryParams {
    /// Reject parameter sets the API would refuse.
    pub fn validate(&self) -> Result<(), ReverseWhoisError> {
        if self.exclude.len() > MAX_EXCLUDE_TERMS {
            return Err(ReverseWhoisError::config(format!(
                "Exclude terms limit exceeded: maximum {} items allowed.",
                MAX_EXCLUDE_TERMS
            )));
        }
        Ok(())
    }
}

/// What the executor reports for one successful search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LookupResponse {
    #[serde(rename = "domainsCount", default)]
    pub match_count: u64,

    #[serde(rename = "domainsList", default, deserialize_with = "null_as_empty")]
    pub match_list: Vec<String>,
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Kind of console line, so renderers can color failures differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Value,
    Failure,
}

/// One console line: `[term] [mode] [scope] [key: value]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayLine {
    pub term: String,
    pub mode: QueryMode,
    pub scope: SearchScope,
    pub key: String,
    pub value: String,
    pub kind: LineKind,
}

impl DisplayLine {
    pub fn value<K: Into<String>, V: Into<String>>(
        term: &str,
        params: &QueryParams,
        key: K,
        value: V,
    ) -> Self {
        Self {
            term: term.to_string(),
            mode: params.mode,
            scope: params.scope,
            key: key.into(),
            value: value.into(),
            kind: LineKind::Value,
        }
    }

    pub fn failure(term: &str, params: &QueryParams, error: &ReverseWhoisError) -> Self {
        Self {
            term: term.to_string(),
            mode: params.mode,
            scope: params.scope,
            key: error.category().to_string(),
            value: error.human_message(),
            kind: LineKind::Failure,
        }
    }
}

impl fmt::Display for DisplayLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] [{}] [{}] [{}: {}]",
            self.term, self.mode, self.scope, self.key, self.value
        )
    }
}

/// A job: exactly one target, submitted once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub target: String,
}

/// Result of executing one job.
#[derive(Debug, Clone)]
pub enum LookupOutcome {
    /// Display lines for the console and clean records for the file sink
    Success {
        target: String,
        lines: Vec<DisplayLine>,
        records: Vec<String>,
    },

    /// The lookup failed; no records are produced
    Failure {
        target: String,
        line: DisplayLine,
        error: ReverseWhoisError,
    },
}

impl LookupOutcome {
    pub fn target(&self) -> &str {
        match self {
            LookupOutcome::Success { target, .. } | LookupOutcome::Failure { target, .. } => {
                target
            }
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, LookupOutcome::Failure { .. })
    }
}

/// Configuration for a bulk lookup run.
#[derive(Debug, Clone)]
pub struct LookupConfig {
    /// Number of concurrent workers
    /// Default: 1
    pub threads: usize,

    /// Global requests per second across all workers
    /// Default: 30, Range: 1-30
    pub rate_limit: u32,

    /// Parameters sent with every lookup
    pub query: QueryParams,

    /// Per-request HTTP timeout
    /// Default: 30 seconds
    pub timeout: Duration,

    /// API endpoint
    pub endpoint: String,

    /// Proxy URL (http://, https://, socks5://)
    pub proxy: Option<String>,

    /// Ignore proxies entirely, including environment variables
    pub no_proxy: bool,

    /// Skip TLS certificate verification
    pub insecure: bool,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            threads: 1,
            rate_limit: MAX_RATE_LIMIT,
            query: QueryParams::default(),
            timeout: Duration::from_secs(30),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            proxy: None,
            no_proxy: false,
            insecure: false,
        }
    }
}

impl LookupConfig {
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_rate_limit(mut self, rate_limit: u32) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    pub fn with_scope(mut self, scope: SearchScope) -> Self {
        self.query.scope = scope;
        self
    }

    pub fn with_mode(mut self, mode: QueryMode) -> Self {
        self.query.mode = mode;
        self
    }

    pub fn with_exclude(mut self, exclude: Vec<String>) -> Self {
        self.query.exclude = exclude;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Check the settings that must hold before any dispatch starts.
    pub fn validate(&self) -> Result<(), ReverseWhoisError> {
        if self.threads < 1 {
            return Err(ReverseWhoisError::config("--threads must be >= 1."));
        }
        if self.rate_limit < 1 {
            return Err(ReverseWhoisError::config("--rate-limit must be >= 1."));
        }
        if self.rate_limit > MAX_RATE_LIMIT {
            return Err(ReverseWhoisError::config(format!(
                "--rate-limit exceeds API maximum ({} rps).",
                MAX_RATE_LIMIT
            )));
        }
        self.query.validate()
    }
}
