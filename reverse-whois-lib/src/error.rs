//! Error handling for reverse WHOIS runs.
//!
//! Errors fall into two groups. Fatal errors (input, read, configuration) stop a run
//! before any lookup is dispatched. Per-lookup errors (rate limit cancellation, HTTP
//! status, transport failure) are contained to a single target and only counted.

use std::fmt;

/// Main error type for reverse WHOIS operations.
#[derive(Debug, Clone)]
pub enum ReverseWhoisError {
    /// No usable targets were resolved from any source
    InputError { message: String },

    /// A target list (or stdin) could not be opened or read
    ReadError { path: String, message: String },

    /// Invalid settings: rate limit, thread count, exclusion terms, keys, config file
    ConfigError { message: String },

    /// The permit wait was canceled before a lookup could start
    RateLimitCanceled,

    /// The API answered with a non-2xx status
    HttpError { status: u16 },

    /// Transport-level or decoding failure talking to the API
    RequestError { message: String },

    /// Generic internal errors that don't fit other categories
    Internal { message: String },
}

impl ReverseWhoisError {
    /// Create a new input error.
    pub fn input<M: Into<String>>(message: M) -> Self {
        Self::InputError {
            message: message.into(),
        }
    }

    /// Create a new read error for the given path.
    pub fn read<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::ReadError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new HTTP status error.
    pub fn http(status: u16) -> Self {
        Self::HttpError { status }
    }

    /// Create a new request (transport) error.
    pub fn request<M: Into<String>>(message: M) -> Self {
        Self::RequestError {
            message: message.into(),
        }
    }

    /// Create a new internal error.
    pub fn internal<M: Into<String>>(message: M) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Failure category shown in the fourth console field.
    pub fn category(&self) -> &'static str {
        match self {
            Self::RateLimitCanceled => "rate_limit",
            Self::HttpError { .. } => "http_error",
            Self::RequestError { .. } => "request_error",
            Self::InputError { .. } => "input_error",
            Self::ReadError { .. } => "read_error",
            Self::ConfigError { .. } => "config_error",
            Self::Internal { .. } => "internal_error",
        }
    }

    /// Whether this error aborts the run before dispatch.
    ///
    /// Per-lookup failures are never fatal; they only flip the run status.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InputError { .. } | Self::ReadError { .. } | Self::ConfigError { .. }
        )
    }

    /// Message rendered next to the failure category on the console.
    pub fn human_message(&self) -> String {
        match self {
            Self::HttpError { status } => human_http_error(*status),
            Self::RateLimitCanceled => "rate limiter wait canceled".to_string(),
            Self::RequestError { message } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Translate an API status code into the provider's documented explanation.
pub fn human_http_error(status: u16) -> String {
    match status {
        400 => "400 Bad Request: Some required fields are missing or have invalid values."
            .to_string(),
        401 => "401 Unauthorized: The required 'apiKey' field value is missing or invalid."
            .to_string(),
        403 => "403 Forbidden: Access restricted. Check credits balance or enter the correct API key."
            .to_string(),
        408 => "408 Request Timeout: The request has timed out. Try your call again later."
            .to_string(),
        410 => "410 Gone: The requested API version is no longer available. Update to the latest version of the API."
            .to_string(),
        422 => "422 Unprocessable Entity: Input correct request parameters or search term."
            .to_string(),
        429 => "429 Too Many Requests: Too Many Requests. Try your call again later.".to_string(),
        500..=599 => "5XX Internal Server Error: Internal server error, please contact the provider support team."
            .to_string(),
        other => format!("Unexpected HTTP status: {}", other),
    }
}

impl fmt::Display for ReverseWhoisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InputError { message } => write!(f, "{}", message),
            Self::ReadError { path, message } => {
                write!(f, "failed reading target list \"{}\": {}", path, message)
            }
            Self::ConfigError { message } => write!(f, "{}", message),
            Self::RateLimitCanceled => write!(f, "rate limiter wait canceled"),
            Self::HttpError { status } => write!(f, "http error: {}", status),
            Self::RequestError { message } => write!(f, "request failed: {}", message),
            Self::Internal { message } => write!(f, "Internal error: {}", message),
        }
    }
}

impl std::error::Error for ReverseWhoisError {}

impl From<reqwest::Error> for ReverseWhoisError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            Self::http(status.as_u16())
        } else if err.is_timeout() {
            Self::request(format!("timed out: {}", err))
        } else if err.is_decode() {
            Self::request(format!("failed to decode response json: {}", err))
        } else {
            Self::request(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ReverseWhoisError {
    fn from(err: serde_json::Error) -> Self {
        Self::request(format!("failed to decode response json: {}", err))
    }
}

impl From<toml::de::Error> for ReverseWhoisError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(format!("Failed to parse TOML configuration: {}", err))
    }
}

impl From<std::io::Error> for ReverseWhoisError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal {
            message: format!("I/O error: {}", err),
        }
    }
}
