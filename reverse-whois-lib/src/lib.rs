//! # Reverse WHOIS Library
//!
//! Bulk reverse WHOIS lookups: many search terms in, deduplicated matching
//! domains out.
//!
//! A run pushes every unique target through a fixed pool of workers. All
//! workers share one rate limiter, so the aggregate request rate stays under
//! the provider's cap however many workers there are. API keys are rotated
//! round-robin, and a single aggregator writes console lines and a
//! deduplicated output file.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use reverse_whois_lib::{
//!     Aggregator, KeyRotator, LookupConfig, LookupRunner, ReverseWhoisClient,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = LookupConfig::default().with_threads(4).with_rate_limit(10);
//!     let client = ReverseWhoisClient::new()?;
//!     let mut runner = LookupRunner::new(&config, KeyRotator::fixed("API_KEY"), Arc::new(client))?;
//!
//!     let mut aggregator = Aggregator::new(std::io::stdout(), None::<std::fs::File>);
//!     let summary = runner.run(vec!["acme corp".to_string()], &mut aggregator).await?;
//!     std::process::exit(summary.exit_code());
//! }
//! ```

pub use aggregator::{AggregateStats, Aggregator, LineRenderer, PlainRenderer, RunStatus};
pub use concurrent::{outcome_for, PoolHandle, PoolStats, WorkerPool};
pub use config::{
    load_env_config, load_env_config_from, parse_timeout_string, select_keys, ConfigLocation,
    ConfigManager, DefaultsConfig, EnvConfig, FileConfig, CONFIG_FILE_NAME,
};
pub use error::{human_http_error, ReverseWhoisError};
pub use keys::KeyRotator;
pub use protocols::{ClientOptions, LookupExecutor, LookupRequest, ReverseWhoisClient};
pub use ratelimit::RateLimiter;
pub use runner::{LookupRunner, RunState, RunSummary};
pub use targets::{TargetSet, TargetSources};
pub use types::{
    DisplayLine, Job, LineKind, LookupConfig, LookupOutcome, LookupResponse, QueryMode,
    QueryParams, SearchScope, DEFAULT_ENDPOINT, MAX_EXCLUDE_TERMS, MAX_RATE_LIMIT,
};
pub use utils::split_csv;

mod aggregator;
mod concurrent;
mod config;
mod error;
mod keys;
mod protocols;
mod ratelimit;
mod runner;
mod targets;
mod types;
mod utils;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, ReverseWhoisError>;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Release codename shown in the banner.
pub const CODENAME: &str = "stable";
