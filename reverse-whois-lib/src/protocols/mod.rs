//! Lookup executor boundary and its implementations.
//!
//! Workers only see the `LookupExecutor` trait; the HTTP client for the
//! reverse WHOIS API is one implementation, tests plug in scripted ones.

/// HTTP client for the reverse WHOIS API
pub mod reverse_whois;

pub use reverse_whois::{ClientOptions, ReverseWhoisClient};

use crate::error::ReverseWhoisError;
use crate::types::{LookupResponse, QueryParams};
use async_trait::async_trait;
use std::sync::Arc;

/// Everything needed for one search call.
#[derive(Debug, Clone, Copy)]
pub struct LookupRequest<'a> {
    pub target: &'a str,
    pub api_key: &'a str,
    pub params: &'a QueryParams,
}

/// Performs one external search.
///
/// Implementations only report `HttpError` for non-2xx answers and
/// `RequestError` for anything transport- or decoding-related; rate limit
/// failures are produced by the worker before the executor is reached.
#[async_trait]
pub trait LookupExecutor: Send + Sync {
    async fn search(
        &self,
        request: LookupRequest<'_>,
    ) -> Result<LookupResponse, ReverseWhoisError>;
}

#[async_trait]
impl<T: LookupExecutor + ?Sized> LookupExecutor for Arc<T> {
    async fn search(
        &self,
        request: LookupRequest<'_>,
    ) -> Result<LookupResponse, ReverseWhoisError> {
        (**self).search(request).await
    }
}
