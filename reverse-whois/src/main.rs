//! Reverse WHOIS CLI Application
//!
//! Bulk reverse WHOIS lookups from the command line: collects search terms,
//! runs them through the rate-limited worker pool in reverse-whois-lib and
//! prints `[term] [mode] [scope] [key: value]` lines.
//!
//! Exit codes: 0 when every lookup succeeded, 1 when at least one failed,
//! 2 for usage, configuration or input errors.

mod ui;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::Parser;
use reverse_whois_lib::{
    load_env_config, parse_timeout_string, select_keys, split_csv, Aggregator, ClientOptions,
    ConfigManager, EnvConfig, FileConfig, LookupConfig, LookupRunner, QueryMode,
    ReverseWhoisClient, ReverseWhoisError, SearchScope, TargetSet, TargetSources,
    MAX_EXCLUDE_TERMS, MAX_RATE_LIMIT,
};
use std::fs::File;
use std::io::{self, BufWriter};
use std::process;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::EnvFilter;

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// CLI arguments for reverse-whois
#[derive(Parser, Debug)]
#[command(name = "reverse-whois")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "haltman.io")]
#[command(about = "Reverse WHOIS OSINT CLI (purchase/preview)")]
#[command(
    long_about = "Find every domain whose WHOIS records mention a search term.\n\nTargets can be given with -t, read from list files with -l, or piped on stdin. Requests from all workers share one global rate limit, and API keys from .reverse-whois.toml are rotated round-robin."
)]
#[command(styles = STYLES)]
pub struct Args {
    /// Search term (repeatable; supports comma-separated values)
    #[arg(short = 't', long = "target", value_name = "TARGET", action = clap::ArgAction::Append, help_heading = "Targets")]
    pub targets: Vec<String>,

    /// File containing targets, one per line (repeatable; supports comma-separated paths)
    #[arg(short = 'l', long = "target-list", visible_alias = "tl", value_name = "FILE", action = clap::ArgAction::Append, help_heading = "Targets")]
    pub target_lists: Vec<String>,

    /// API key (takes priority over RW_API_KEY and .reverse-whois.toml)
    #[arg(long = "api-key", value_name = "API_KEY", help_heading = "API Key")]
    pub api_key: Option<String>,

    /// Search historic records (default: current)
    #[arg(long = "history", visible_alias = "historic", help_heading = "Query Options")]
    pub history: bool,

    /// Only fetch match counts (default: purchase full domain lists)
    #[arg(long = "preview", visible_alias = "check", help_heading = "Query Options")]
    pub preview: bool,

    /// Exclude term (repeatable; comma-separated; max 4)
    #[arg(short = 'e', long = "exclude", value_name = "TERM", action = clap::ArgAction::Append, help_heading = "Query Options")]
    pub exclude: Vec<String>,

    /// Proxy URL (http://, https://, socks5://)
    #[arg(long = "proxy", value_name = "URL", help_heading = "Networking / TLS")]
    pub proxy: Option<String>,

    /// Disable proxy usage even if environment variables are set
    #[arg(long = "no-proxy", help_heading = "Networking / TLS")]
    pub no_proxy: bool,

    /// Skip TLS certificate verification (unsafe)
    #[arg(short = 'k', long = "insecure", help_heading = "Networking / TLS")]
    pub insecure: bool,

    /// Request timeout, e.g. "30s" or "2m" (default: 30s)
    #[arg(long = "timeout", value_name = "DURATION", help_heading = "Networking / TLS")]
    pub timeout: Option<String>,

    /// Worker count (default: 1)
    #[arg(long = "threads", value_name = "N", help_heading = "Concurrency / Rate Limit")]
    pub threads: Option<usize>,

    /// Global max requests per second (default and max: 30)
    #[arg(long = "rate-limit", visible_alias = "rl", value_name = "RPS", help_heading = "Concurrency / Rate Limit")]
    pub rate_limit: Option<u32>,

    /// Write deduplicated results to a file (overwritten)
    #[arg(short = 'o', long = "output", visible_alias = "out", value_name = "PATH", help_heading = "Output")]
    pub output: Option<String>,

    /// Results only (no banner, logs or failure lines)
    #[arg(short = 's', long = "silent", help_heading = "Output")]
    pub silent: bool,

    /// Results only (same as --silent)
    #[arg(short = 'q', long = "quiet", help_heading = "Output")]
    pub quiet: bool,

    /// Enable debug logs for reverse-whois (stderr)
    #[arg(short = 'v', long = "verbose", help_heading = "Output")]
    pub verbose: bool,

    /// Enable debug logs for every component, including HTTP (stderr)
    #[arg(long = "debug", help_heading = "Output")]
    pub debug: bool,

    /// Disable ANSI colors
    #[arg(long = "no-color", visible_alias = "nc", help_heading = "Output")]
    pub no_color: bool,

    /// Use a specific config file instead of .reverse-whois.toml next to the executable
    #[arg(long = "config", value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<String>,
}

impl Args {
    /// Only result lines reach stdout.
    fn results_only(&self) -> bool {
        self.silent || self.quiet
    }

    fn exclude_terms(&self) -> Vec<String> {
        self.exclude.iter().flat_map(|e| split_csv(e)).collect()
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = validate_args(&args) {
        eprintln!("Error: {}", e);
        process::exit(2);
    }

    init_logging(&args);

    match run_lookups(args).await {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(if e.is_fatal() { 2 } else { 1 });
        }
    }
}

/// Validate command line arguments
fn validate_args(args: &Args) -> Result<(), String> {
    if args.threads == Some(0) {
        return Err("--threads must be >= 1.".to_string());
    }

    match args.rate_limit {
        Some(0) => return Err("--rate-limit must be >= 1.".to_string()),
        Some(rate) if rate > MAX_RATE_LIMIT => {
            return Err(format!(
                "--rate-limit exceeds API maximum ({} rps).",
                MAX_RATE_LIMIT
            ))
        }
        _ => {}
    }

    if args.exclude_terms().len() > MAX_EXCLUDE_TERMS {
        return Err(format!(
            "--exclude accepts at most {} terms.",
            MAX_EXCLUDE_TERMS
        ));
    }

    if let Some(timeout) = &args.timeout {
        if parse_timeout_string(timeout).is_none() {
            return Err(format!(
                "Invalid --timeout '{}'. Use format like '5s', '30s', '2m'",
                timeout
            ));
        }
    }

    Ok(())
}

/// Logs go to stderr. `RUST_LOG` overrides the level picked from flags.
fn init_logging(args: &Args) {
    let default_filter = if args.results_only() {
        "off"
    } else if args.debug {
        "debug"
    } else if args.verbose {
        "warn,reverse_whois=debug,reverse_whois_lib=debug"
    } else {
        "warn"
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_ansi(!args.no_color)
        .try_init();
}

/// Main lookup logic. Returns the process exit code for a completed run.
async fn run_lookups(args: Args) -> Result<i32, ReverseWhoisError> {
    let colors = !args.no_color && console::colors_enabled();
    console::set_colors_enabled(colors);

    let manager = ConfigManager::new();
    let location = manager.resolve_path(args.config.as_deref())?;
    let file_config = manager.load_or_create(&location)?;
    let env_config = load_env_config();

    let config = build_config(&args, &file_config, &env_config)?;
    let direct_key = args.api_key.as_deref().or(env_config.api_key.as_deref());
    let keys = select_keys(direct_key, &file_config)?;

    let sources = TargetSources {
        values: args.targets.clone(),
        list_files: args.target_lists.clone(),
        read_stdin: true,
    };
    let targets = TargetSet::collect(&sources)?.into_targets();

    let client = ReverseWhoisClient::with_options(ClientOptions::from(&config))?;
    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let mut runner =
        LookupRunner::new(&config, keys, Arc::new(client))?.with_cancellation(cancel);

    let output = open_output(args.output.as_deref())?;

    if !args.results_only() {
        ui::print_banner();
    }

    let mut aggregator = Aggregator::new(io::stdout(), output)
        .with_renderer(ui::ColorRenderer::new(colors))
        .show_failures(!args.results_only());

    let started = Instant::now();
    let summary = runner.run(targets, &mut aggregator).await?;
    aggregator
        .finish()
        .map_err(|e| ReverseWhoisError::internal(format!("failed flushing output: {}", e)))?;

    if (args.verbose || args.debug) && !args.results_only() {
        ui::print_summary(&summary, started.elapsed());
    }

    Ok(summary.exit_code())
}

/// Merge built-in defaults, the config file, the environment and CLI flags,
/// in increasing order of precedence.
fn build_config(
    args: &Args,
    file_config: &FileConfig,
    env_config: &EnvConfig,
) -> Result<LookupConfig, ReverseWhoisError> {
    let mut config = env_config.apply(file_config.apply_defaults(LookupConfig::default()));

    if let Some(threads) = args.threads {
        config.threads = threads;
    }
    if let Some(rate_limit) = args.rate_limit {
        config.rate_limit = rate_limit;
    }
    if args.history {
        config.query.scope = SearchScope::Historic;
    }
    if args.preview {
        config.query.mode = QueryMode::Preview;
    }

    let exclude = args.exclude_terms();
    if !exclude.is_empty() {
        config.query.exclude = exclude;
    }

    if let Some(timeout) = &args.timeout {
        config.timeout = parse_timeout_string(timeout).ok_or_else(|| {
            ReverseWhoisError::config(format!("Invalid --timeout '{}'", timeout))
        })?;
    }
    if let Some(proxy) = args.proxy.as_ref().filter(|p| !p.trim().is_empty()) {
        config.proxy = Some(proxy.clone());
    }
    config.no_proxy = args.no_proxy;
    config.insecure = args.insecure;

    config.validate()?;
    Ok(config)
}

/// Create (or truncate) the output file. Parent directories are not created.
fn open_output(path: Option<&str>) -> Result<Option<BufWriter<File>>, ReverseWhoisError> {
    let Some(path) = path.map(str::trim).filter(|p| !p.is_empty()) else {
        return Ok(None);
    };

    let file = File::create(path).map_err(|e| {
        ReverseWhoisError::config(format!("failed to open output file \"{}\": {}", path, e))
    })?;
    Ok(Some(BufWriter::new(file)))
}

/// Cancel pending permit waits on Ctrl-C; in-flight requests still finish.
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, canceling pending lookups");
            cancel.cancel();
        }
    });
}
