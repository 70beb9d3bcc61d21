//! Model provider errors and retry classification.

/// Provider failure conditions.
///
/// Each condition is either transient (worth retrying with backoff) or
/// permanent (retrying cannot help). Timeouts are transient until the retry
/// budget runs out.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum ProviderErrorKind {
    /// Connection refused, reset, DNS failure and similar transport problems
    #[display("Network error: {}", _0)]
    Network(String),
    /// Provider asked us to slow down
    #[display("Rate limited: {}", _0)]
    RateLimited(String),
    /// HTTP error with status code and message
    #[display("HTTP {} error: {}", status_code, message)]
    Http {
        /// HTTP status code
        status_code: u16,
        /// Error message
        message: String,
    },
    /// Attempt did not complete within the configured timeout
    #[display("Request timed out after {} ms", _0)]
    Timeout(u64),
    /// Credentials rejected by the provider
    #[display("Authentication failed: {}", _0)]
    Authentication(String),
    /// API key environment variable not set
    #[display("API key not set: {} environment variable is missing", _0)]
    MissingApiKey(String),
    /// Model identifier unknown to every registered provider
    #[display("Invalid model identifier: {}", _0)]
    InvalidModel(String),
    /// Provider rejected the request shape
    #[display("Malformed request: {}", _0)]
    MalformedRequest(String),
    /// Provider answered with a body we could not interpret
    #[display("Unreadable provider response: {}", _0)]
    ResponseParsing(String),
}

impl ProviderErrorKind {
    /// Check if this error type should be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderErrorKind::Network(_)
            | ProviderErrorKind::RateLimited(_)
            | ProviderErrorKind::Timeout(_) => true,
            ProviderErrorKind::Http { status_code, .. } => {
                matches!(*status_code, 408 | 429 | 500..=599)
            }
            _ => false,
        }
    }

    /// Whether this is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ProviderErrorKind::Timeout(_))
    }

    /// Classify an HTTP status code returned by a provider.
    ///
    /// # Examples
    ///
    /// ```
    /// use quill_error::ProviderErrorKind;
    ///
    /// assert!(ProviderErrorKind::from_status(503, "overloaded").is_retryable());
    /// assert!(!ProviderErrorKind::from_status(401, "bad key").is_retryable());
    /// ```
    pub fn from_status(status_code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status_code {
            401 | 403 => ProviderErrorKind::Authentication(message),
            404 => ProviderErrorKind::InvalidModel(message),
            400 | 422 => ProviderErrorKind::MalformedRequest(message),
            429 => ProviderErrorKind::RateLimited(message),
            _ => ProviderErrorKind::Http {
                status_code,
                message,
            },
        }
    }
}

/// Provider error with source location tracking.
///
/// # Examples
///
/// ```
/// use quill_error::{ProviderError, ProviderErrorKind, RetryableError};
///
/// let err = ProviderError::new(ProviderErrorKind::Http {
///     status_code: 502,
///     message: "Bad gateway".to_string(),
/// });
/// assert!(err.is_retryable());
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Provider Error: {} at line {} in {}", kind, line, file)]
pub struct ProviderError {
    /// The kind of error that occurred
    pub kind: ProviderErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl ProviderError {
    /// Create a new ProviderError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: ProviderErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}

/// Trait for errors that support retry logic.
///
/// Transient errors like 503 (service unavailable), 429 (rate limit), or
/// timeouts return true. Permanent errors like 401 (unauthorized) or 400
/// (bad request) return false.
pub trait RetryableError {
    /// Returns true if this error should trigger a retry.
    fn is_retryable(&self) -> bool;
}

impl RetryableError for ProviderError {
    fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}
