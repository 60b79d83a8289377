//! Error types for the file-based source CDK
//!
//! This module defines the error hierarchy for the entire CDK.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use thiserror::Error;

/// The main error type for the file-based source CDK
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Malformed glob pattern '{pattern}': {message}")]
    MalformedGlob { pattern: String, message: String },

    #[error("No validation policy defined for stream '{stream}'")]
    UndefinedValidationPolicy { stream: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Remote File Index Errors
    // ============================================================================
    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("File not found: {uri}")]
    FileNotFound { uri: String },

    #[error("Too many files matched: {matched} (limit {limit})")]
    TooManyFiles { matched: usize, limit: usize },

    // ============================================================================
    // Parsing Errors
    // ============================================================================
    #[error("Schema inference failed for '{uri}': {message}")]
    SchemaInference { uri: String, message: String },

    #[error("Failed to parse records from '{uri}': {message}")]
    RecordParse { uri: String, message: String },

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    // ============================================================================
    // HTTP Errors (remote parsing API)
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Rate limited, retry after {retry_after_seconds}s")]
    RateLimited { retry_after_seconds: u64 },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Max retries ({max_retries}) exceeded")]
    MaxRetriesExceeded { max_retries: u32 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // State Errors
    // ============================================================================
    #[error("State error: {message}")]
    State { message: String },

    #[error("Checkpoint failed: {message}")]
    Checkpoint { message: String },

    // ============================================================================
    // Source Errors
    // ============================================================================
    #[error("Connection check failed: {message}")]
    ConnectionCheck { message: String },

    #[error("Stream '{stream}' not found in catalog")]
    StreamNotFound { stream: String },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create a malformed glob error
    pub fn malformed_glob(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedGlob {
            pattern: pattern.into(),
            message: message.into(),
        }
    }

    /// Create a schema inference error
    pub fn schema_inference(uri: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SchemaInference {
            uri: uri.into(),
            message: message.into(),
        }
    }

    /// Create a record parse error
    pub fn record_parse(uri: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RecordParse {
            uri: uri.into(),
            message: message.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Create a state error
    pub fn state(message: impl Into<String>) -> Self {
        Self::State {
            message: message.into(),
        }
    }

    /// Create a connection check error
    pub fn check(message: impl Into<String>) -> Self {
        Self::ConnectionCheck {
            message: message.into(),
        }
    }

    /// Check if this error is retryable (transient I/O)
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(_) | Error::RateLimited { .. } | Error::Timeout { .. } => true,
            Error::HttpStatus { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }

    /// Check if this error is caused by the user's data or configuration
    /// rather than by the platform (wrong file type, corrupt file, 4xx)
    pub fn is_user_error(&self) -> bool {
        match self {
            Error::Config { .. }
            | Error::MissingConfigField { .. }
            | Error::InvalidConfigValue { .. }
            | Error::MalformedGlob { .. }
            | Error::UndefinedValidationPolicy { .. }
            | Error::SchemaInference { .. }
            | Error::RecordParse { .. } => true,
            Error::HttpStatus { status, .. } => (400..500).contains(status) && *status != 429,
            _ => false,
        }
    }
}

/// Check if an HTTP status code is retryable
fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Result type alias for the file-based source CDK
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::config("test message");
        assert_eq!(err.to_string(), "Configuration error: test message");

        let err = Error::record_parse("s3://bucket/a.csv", "bad row");
        assert_eq!(
            err.to_string(),
            "Failed to parse records from 's3://bucket/a.csv': bad row"
        );

        let err = Error::UndefinedValidationPolicy {
            stream: "users".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "No validation policy defined for stream 'users'"
        );
    }

    #[test]
    fn test_is_retryable() {
        assert!(Error::RateLimited {
            retry_after_seconds: 60
        }
        .is_retryable());
        assert!(Error::Timeout { timeout_ms: 1000 }.is_retryable());
        assert!(Error::http_status(429, "").is_retryable());
        assert!(Error::http_status(500, "").is_retryable());
        assert!(Error::http_status(503, "").is_retryable());

        assert!(!Error::http_status(400, "").is_retryable());
        assert!(!Error::http_status(422, "").is_retryable());
        assert!(!Error::config("test").is_retryable());
        assert!(!Error::record_parse("a.csv", "corrupt").is_retryable());
    }

    #[test]
    fn test_is_user_error() {
        assert!(Error::record_parse("a.csv", "corrupt").is_user_error());
        assert!(Error::schema_inference("a.csv", "not csv").is_user_error());
        assert!(Error::http_status(422, "unprocessable").is_user_error());
        assert!(Error::malformed_glob("[", "unterminated").is_user_error());

        assert!(!Error::http_status(429, "").is_user_error());
        assert!(!Error::http_status(500, "").is_user_error());
        assert!(!Error::state("lost").is_user_error());
    }

    #[test]
    fn test_result_context() {
        let result: Result<()> = Err(Error::config("inner"));
        let with_context = result.context("outer");
        assert!(with_context
            .unwrap_err()
            .to_string()
            .contains("outer: Configuration error: inner"));
    }
}
