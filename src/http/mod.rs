//! HTTP client for remote parsing APIs
//!
//! Parsers that delegate heavy work to an external service route their
//! calls through this client: transient failures (network errors, 5xx,
//! 429) are retried with exponential backoff up to a fixed attempt
//! ceiling; 4xx client errors are never retried.

mod client;
mod rate_limit;


pub use client::{HttpClient, HttpClientConfig, RequestConfig};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
