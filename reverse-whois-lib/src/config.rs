//! Configuration file parsing and management.
//!
//! Settings come from four layers, highest precedence first: CLI flags,
//! `RW_*` environment variables, the `.reverse-whois.toml` file and built-in
//! defaults. This module owns the file and environment layers; the CLI applies
//! its flags on top of the resulting `LookupConfig`.

use crate::error::ReverseWhoisError;
use crate::keys::KeyRotator;
use crate::types::{LookupConfig, QueryMode, SearchScope, MAX_EXCLUDE_TERMS, MAX_RATE_LIMIT};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// File name looked up next to the executable.
pub const CONFIG_FILE_NAME: &str = ".reverse-whois.toml";

const CONFIG_TEMPLATE: &str = "# reverse-whois configuration\n\
# Keys listed here are rotated round-robin across requests.\n\
api_keys = []\n";

/// Configuration loaded from `.reverse-whois.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FileConfig {
    /// API key pool; blank entries are ignored
    #[serde(default)]
    pub api_keys: Vec<String>,

    /// Default values for CLI options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,
}

/// Default values that map to CLI options.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DefaultsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<u32>,

    /// Search historic records instead of current ones
    #[serde(skip_serializing_if = "Option::is_none")]
    pub historic: Option<bool>,

    /// Only request match counts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude: Option<Vec<String>>,

    /// Request timeout (as string, e.g., "30s", "2m")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl FileConfig {
    /// Apply the `[defaults]` table on top of `config`.
    pub fn apply_defaults(&self, mut config: LookupConfig) -> LookupConfig {
        let Some(defaults) = &self.defaults else {
            return config;
        };

        if let Some(threads) = defaults.threads {
            config.threads = threads;
        }
        if let Some(rate_limit) = defaults.rate_limit {
            config.rate_limit = rate_limit;
        }
        if let Some(historic) = defaults.historic {
            config.query.scope = if historic {
                SearchScope::Historic
            } else {
                SearchScope::Current
            };
        }
        if let Some(preview) = defaults.preview {
            config.query.mode = if preview {
                QueryMode::Preview
            } else {
                QueryMode::Purchase
            };
        }
        if let Some(exclude) = &defaults.exclude {
            config.query.exclude = clean_terms(exclude);
        }
        if let Some(timeout) = defaults.timeout.as_deref().and_then(parse_timeout_string) {
            config.timeout = timeout;
        }
        if let Some(proxy) = defaults.proxy.as_ref().filter(|p| !p.trim().is_empty()) {
            config.proxy = Some(proxy.clone());
        }
        if let Some(endpoint) = defaults.endpoint.as_ref().filter(|e| !e.trim().is_empty()) {
            config.endpoint = endpoint.clone();
        }

        config
    }
}

/// Where the configuration file was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLocation {
    pub path: PathBuf,
    /// Named via `--config` or `RW_CONFIG`; such a file must already exist
    pub explicit: bool,
}

/// Configuration discovery and loading functionality.
#[derive(Debug, Default)]
pub struct ConfigManager;

impl ConfigManager {
    pub fn new() -> Self {
        Self
    }

    /// Resolve the config file path: explicit path, then `RW_CONFIG`, then
    /// the directory of the running executable.
    pub fn resolve_path(&self, explicit: Option<&str>) -> Result<ConfigLocation, ReverseWhoisError> {
        let named = explicit
            .map(str::to_string)
            .or_else(|| env::var("RW_CONFIG").ok())
            .filter(|p| !p.trim().is_empty());

        if let Some(path) = named {
            return Ok(ConfigLocation {
                path: PathBuf::from(path),
                explicit: true,
            });
        }

        let exe = env::current_exe().map_err(|e| {
            ReverseWhoisError::config(format!("failed to locate executable: {}", e))
        })?;
        let dir = exe.parent().ok_or_else(|| {
            ReverseWhoisError::config("failed to locate executable directory")
        })?;

        Ok(ConfigLocation {
            path: dir.join(CONFIG_FILE_NAME),
            explicit: false,
        })
    }

    /// Load the file at `location`, creating it first when it is the
    /// implicit default and does not exist yet.
    pub fn load_or_create(&self, location: &ConfigLocation) -> Result<FileConfig, ReverseWhoisError> {
        if !location.path.exists() {
            if location.explicit {
                return Err(ReverseWhoisError::config(format!(
                    "Configuration file not found: {}",
                    location.path.display()
                )));
            }
            self.create_default(&location.path)?;
            debug!("created config file at {}", location.path.display());
            return Ok(FileConfig::default());
        }

        self.load_file(&location.path)
    }

    /// Load configuration from a specific file.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, ReverseWhoisError> {
        let path = path.as_ref();

        let content = fs::read_to_string(path).map_err(|e| {
            ReverseWhoisError::config(format!(
                "Failed to read configuration file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config: FileConfig = toml::from_str(&content).map_err(|e| {
            ReverseWhoisError::config(format!("Failed to parse TOML configuration: {}", e))
        })?;

        self.validate_config(&config)?;
        debug!(
            keys = config.api_keys.iter().filter(|k| !k.trim().is_empty()).count(),
            "loaded config from {}",
            path.display()
        );

        Ok(config)
    }

    fn create_default(&self, path: &Path) -> Result<(), ReverseWhoisError> {
        let mut options = fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(path).map_err(|e| {
            ReverseWhoisError::config(format!(
                "Failed to create configuration file {}: {}",
                path.display(),
                e
            ))
        })?;
        file.write_all(CONFIG_TEMPLATE.as_bytes()).map_err(|e| {
            ReverseWhoisError::config(format!(
                "Failed to write configuration file {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(())
    }

    /// Validate a configuration for common issues.
    fn validate_config(&self, config: &FileConfig) -> Result<(), ReverseWhoisError> {
        let Some(defaults) = &config.defaults else {
            return Ok(());
        };

        if defaults.threads == Some(0) {
            return Err(ReverseWhoisError::config("threads must be >= 1"));
        }

        if let Some(rate_limit) = defaults.rate_limit {
            if rate_limit == 0 || rate_limit > MAX_RATE_LIMIT {
                return Err(ReverseWhoisError::config(format!(
                    "rate_limit must be between 1 and {}",
                    MAX_RATE_LIMIT
                )));
            }
        }

        if let Some(exclude) = &defaults.exclude {
            if clean_terms(exclude).len() > MAX_EXCLUDE_TERMS {
                return Err(ReverseWhoisError::config(format!(
                    "exclude accepts at most {} terms",
                    MAX_EXCLUDE_TERMS
                )));
            }
        }

        if let Some(timeout_str) = &defaults.timeout {
            if parse_timeout_string(timeout_str).is_none() {
                return Err(ReverseWhoisError::config(format!(
                    "Invalid timeout format '{}'. Use format like '5s', '30s', '2m'",
                    timeout_str
                )));
            }
        }

        Ok(())
    }
}

fn clean_terms(terms: &[String]) -> Vec<String> {
    terms
        .iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Values taken from `RW_*` environment variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvConfig {
    pub api_key: Option<String>,
    pub threads: Option<usize>,
    pub rate_limit: Option<u32>,
    pub proxy: Option<String>,
    pub endpoint: Option<String>,
    pub timeout: Option<Duration>,
}

impl EnvConfig {
    /// Apply environment values on top of `config`.
    pub fn apply(&self, mut config: LookupConfig) -> LookupConfig {
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        if let Some(rate_limit) = self.rate_limit {
            config.rate_limit = rate_limit;
        }
        if let Some(proxy) = &self.proxy {
            config.proxy = Some(proxy.clone());
        }
        if let Some(endpoint) = &self.endpoint {
            config.endpoint = endpoint.clone();
        }
        if let Some(timeout) = self.timeout {
            config.timeout = timeout;
        }
        config
    }
}

/// Load configuration from the process environment.
///
/// Invalid values are logged as warnings and ignored.
pub fn load_env_config() -> EnvConfig {
    load_env_config_from(|name| env::var(name).ok())
}

/// Load configuration through an arbitrary variable lookup.
pub fn load_env_config_from<F>(lookup: F) -> EnvConfig
where
    F: Fn(&str) -> Option<String>,
{
    let mut env_config = EnvConfig::default();
    let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(key) = non_empty("RW_API_KEY") {
        env_config.api_key = Some(key.trim().to_string());
        debug!("using RW_API_KEY");
    }

    if let Some(val) = non_empty("RW_THREADS") {
        match val.trim().parse::<usize>() {
            Ok(threads) if threads > 0 => {
                env_config.threads = Some(threads);
                debug!("using RW_THREADS={}", threads);
            }
            _ => warn!("ignoring invalid RW_THREADS='{}', must be >= 1", val),
        }
    }

    if let Some(val) = non_empty("RW_RATE_LIMIT") {
        match val.trim().parse::<u32>() {
            Ok(rate) if rate > 0 && rate <= MAX_RATE_LIMIT => {
                env_config.rate_limit = Some(rate);
                debug!("using RW_RATE_LIMIT={}", rate);
            }
            _ => warn!(
                "ignoring invalid RW_RATE_LIMIT='{}', must be 1-{}",
                val, MAX_RATE_LIMIT
            ),
        }
    }

    if let Some(proxy) = non_empty("RW_PROXY") {
        debug!("using RW_PROXY={}", proxy);
        env_config.proxy = Some(proxy);
    }

    if let Some(endpoint) = non_empty("RW_ENDPOINT") {
        debug!("using RW_ENDPOINT={}", endpoint);
        env_config.endpoint = Some(endpoint);
    }

    if let Some(val) = non_empty("RW_TIMEOUT") {
        match parse_timeout_string(&val) {
            Some(timeout) => {
                env_config.timeout = Some(timeout);
                debug!("using RW_TIMEOUT={}", val);
            }
            None => warn!(
                "ignoring invalid RW_TIMEOUT='{}', use format like '5s', '30s', '2m'",
                val
            ),
        }
    }

    env_config
}

/// Pick the key source for a run.
///
/// A key given directly (flag or `RW_API_KEY`) is used for every request;
/// otherwise the file's pool is rotated.
pub fn select_keys(
    direct_key: Option<&str>,
    file: &FileConfig,
) -> Result<KeyRotator, ReverseWhoisError> {
    match direct_key.map(str::trim).filter(|k| !k.is_empty()) {
        Some(key) => Ok(KeyRotator::fixed(key)),
        None => KeyRotator::rotating(file.api_keys.clone()),
    }
}

/// Parse a timeout string like "5s", "30s", "2m". Bare numbers are seconds.
///
/// Returns `None` for malformed or zero values.
pub fn parse_timeout_string(timeout_str: &str) -> Option<Duration> {
    let timeout_str = timeout_str.trim().to_lowercase();

    let secs = if let Some(s) = timeout_str.strip_suffix('s') {
        s.parse::<u64>().ok()
    } else if let Some(m) = timeout_str.strip_suffix('m') {
        m.parse::<u64>().ok().map(|m| m * 60)
    } else {
        timeout_str.parse::<u64>().ok()
    }?;

    (secs > 0).then(|| Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::{NamedTempFile, TempDir};

    fn write_config(content: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();
        temp_file.flush().unwrap();
        temp_file
    }

    #[test]
    fn test_parse_timeout_string() {
        assert_eq!(parse_timeout_string("5s"), Some(Duration::from_secs(5)));
        assert_eq!(parse_timeout_string("30S"), Some(Duration::from_secs(30)));
        assert_eq!(parse_timeout_string("2m"), Some(Duration::from_secs(120)));
        assert_eq!(parse_timeout_string("5"), Some(Duration::from_secs(5)));
        assert_eq!(parse_timeout_string("0s"), None);
        assert_eq!(parse_timeout_string("invalid"), None);
    }

    #[test]
    fn test_load_valid_config() {
        let file = write_config(
            r#"
api_keys = ["k1", "", "k2"]

[defaults]
threads = 4
rate_limit = 10
historic = true
preview = true
exclude = ["test", "demo"]
timeout = "10s"
"#,
        );

        let config = ConfigManager::new().load_file(file.path()).unwrap();
        assert_eq!(config.api_keys, vec!["k1", "", "k2"]);

        let lookup = config.apply_defaults(LookupConfig::default());
        assert_eq!(lookup.threads, 4);
        assert_eq!(lookup.rate_limit, 10);
        assert_eq!(lookup.query.scope, SearchScope::Historic);
        assert_eq!(lookup.query.mode, QueryMode::Preview);
        assert_eq!(lookup.query.exclude, vec!["test", "demo"]);
        assert_eq!(lookup.timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_keys_only_config() {
        let file = write_config("api_keys = [\"only\"]\n");
        let config = ConfigManager::new().load_file(file.path()).unwrap();
        assert!(config.defaults.is_none());
        assert_eq!(
            config.apply_defaults(LookupConfig::default()).threads,
            LookupConfig::default().threads
        );
    }

    #[test]
    fn test_invalid_defaults_rejected() {
        let manager = ConfigManager::new();
        for content in [
            "[defaults]\nthreads = 0\n",
            "[defaults]\nrate_limit = 31\n",
            "[defaults]\nrate_limit = 0\n",
            "[defaults]\nexclude = [\"a\", \"b\", \"c\", \"d\", \"e\"]\n",
            "[defaults]\ntimeout = \"soon\"\n",
            "api_keys = \"not-a-list\"\n",
        ] {
            let file = write_config(content);
            assert!(manager.load_file(file.path()).is_err(), "accepted: {}", content);
        }
    }

    #[test]
    fn test_missing_default_file_is_created() {
        let dir = TempDir::new().unwrap();
        let location = ConfigLocation {
            path: dir.path().join(CONFIG_FILE_NAME),
            explicit: false,
        };

        let config = ConfigManager::new().load_or_create(&location).unwrap();
        assert!(config.api_keys.is_empty());
        assert!(location.path.exists());

        let reloaded = ConfigManager::new().load_file(&location.path).unwrap();
        assert_eq!(reloaded, FileConfig::default());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&location.path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = TempDir::new().unwrap();
        let location = ConfigLocation {
            path: dir.path().join("nope.toml"),
            explicit: true,
        };
        assert!(ConfigManager::new().load_or_create(&location).is_err());
        assert!(!location.path.exists());
    }

    #[test]
    fn test_explicit_path_wins() {
        let location = ConfigManager::new()
            .resolve_path(Some("/tmp/custom.toml"))
            .unwrap();
        assert!(location.explicit);
        assert_eq!(location.path, PathBuf::from("/tmp/custom.toml"));
    }

    #[test]
    fn test_env_config_parsing() {
        let vars: HashMap<&str, &str> = [
            ("RW_API_KEY", " abc "),
            ("RW_THREADS", "8"),
            ("RW_RATE_LIMIT", "99"),
            ("RW_ENDPOINT", "http://localhost:1234/api"),
            ("RW_TIMEOUT", "1m"),
        ]
        .into_iter()
        .collect();

        let env = load_env_config_from(|name| vars.get(name).map(|v| v.to_string()));
        assert_eq!(env.api_key.as_deref(), Some("abc"));
        assert_eq!(env.threads, Some(8));
        assert_eq!(env.rate_limit, None);
        assert_eq!(env.proxy, None);
        assert_eq!(env.timeout, Some(Duration::from_secs(60)));

        let config = env.apply(LookupConfig::default());
        assert_eq!(config.threads, 8);
        assert_eq!(config.rate_limit, MAX_RATE_LIMIT);
        assert_eq!(config.endpoint, "http://localhost:1234/api");
    }

    #[test]
    fn test_env_overrides_file_defaults() {
        let file = FileConfig {
            defaults: Some(DefaultsConfig {
                threads: Some(2),
                rate_limit: Some(5),
                ..Default::default()
            }),
            ..Default::default()
        };
        let env = EnvConfig {
            threads: Some(6),
            ..Default::default()
        };

        let config = env.apply(file.apply_defaults(LookupConfig::default()));
        assert_eq!(config.threads, 6);
        assert_eq!(config.rate_limit, 5);
    }

    #[test]
    fn test_select_keys() {
        let file = FileConfig {
            api_keys: vec!["a".to_string(), "b".to_string()],
            defaults: None,
        };

        let direct = select_keys(Some("cli"), &file).unwrap();
        assert!(direct.is_fixed());
        assert_eq!(direct.next(), "cli");

        let pooled = select_keys(None, &file).unwrap();
        assert_eq!(pooled.pool_size(), 2);

        let blank = select_keys(Some("  "), &FileConfig::default());
        assert_eq!(blank.unwrap_err().category(), "config_error");
    }
}
