//! Top-level error wrapper types.

use crate::{
    BudgetError, BudgetErrorKind, ConfigError, JsonError, ProviderError, RetryableError,
    RevisionError, RevisionErrorKind, StageError, StageErrorKind, StorageError, StorageErrorKind,
    ValidationError,
};

/// Every error kind raised inside the workspace.
#[derive(Debug, Clone, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum QuillErrorKind {
    /// Model provider error
    #[from(ProviderError)]
    Provider(ProviderError),
    /// Spend refused
    #[from(BudgetError)]
    Budget(BudgetError),
    /// Stage ordering or execution error
    #[from(StageError)]
    Stage(StageError),
    /// Model output failed its structural contract
    #[from(ValidationError)]
    Validation(ValidationError),
    /// Revision batch aborted
    #[from(RevisionError)]
    Revision(RevisionError),
    /// Project persistence error
    #[from(StorageError)]
    Storage(StorageError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// JSON serialization/deserialization error
    #[from(JsonError)]
    Json(JsonError),
}

/// Coarse classification used by callers to decide how to react to a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum ErrorCategory {
    /// Stage prerequisites unmet or stale
    #[display("dependency")]
    Dependency,
    /// Retryable network, rate-limit or provider failure
    #[display("provider-transient")]
    ProviderTransient,
    /// Non-retryable auth or configuration failure at the provider
    #[display("provider-permanent")]
    ProviderPermanent,
    /// Attempt exceeded its timeout
    #[display("timeout")]
    Timeout,
    /// Call refused pre-flight or batch halted on cost
    #[display("budget-exceeded")]
    BudgetExceeded,
    /// Model output failed its structural contract
    #[display("validation")]
    Validation,
    /// Concurrent run against the same project
    #[display("conflict")]
    Conflict,
    /// Persistence failure
    #[display("storage")]
    Storage,
    /// Invalid configuration
    #[display("config")]
    Config,
    /// Serialization failure
    #[display("serialization")]
    Serialization,
}

/// Quill error with kind discrimination.
///
/// # Examples
///
/// ```
/// use quill_error::{ErrorCategory, ProviderError, ProviderErrorKind, QuillError};
///
/// let err: QuillError = ProviderError::new(ProviderErrorKind::Timeout(600_000)).into();
/// assert_eq!(err.category(), ErrorCategory::Timeout);
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Quill Error: {}", _0)]
pub struct QuillError(Box<QuillErrorKind>);

impl QuillError {
    /// Create a new error from a kind.
    pub fn new(kind: QuillErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &QuillErrorKind {
        &self.0
    }

    /// Classify this error.
    ///
    /// Wrapper kinds (stage failures, aborted revisions) report the category
    /// of the failure they wrap.
    pub fn category(&self) -> ErrorCategory {
        match self.kind() {
            QuillErrorKind::Provider(e) if e.kind.is_timeout() => ErrorCategory::Timeout,
            QuillErrorKind::Provider(e) if e.kind.is_retryable() => {
                ErrorCategory::ProviderTransient
            }
            QuillErrorKind::Provider(_) => ErrorCategory::ProviderPermanent,
            QuillErrorKind::Budget(e) => match e.kind {
                BudgetErrorKind::Exceeded { .. } => ErrorCategory::BudgetExceeded,
                BudgetErrorKind::InvalidCeiling(_) => ErrorCategory::Config,
            },
            QuillErrorKind::Stage(e) => match &e.kind {
                StageErrorKind::Failed { source, .. } => source.category(),
                _ => ErrorCategory::Dependency,
            },
            QuillErrorKind::Validation(_) => ErrorCategory::Validation,
            QuillErrorKind::Revision(e) => match &e.kind {
                RevisionErrorKind::Aborted { source, .. } => source.category(),
            },
            QuillErrorKind::Storage(e) => match e.kind {
                StorageErrorKind::Locked(_) => ErrorCategory::Conflict,
                _ => ErrorCategory::Storage,
            },
            QuillErrorKind::Config(_) => ErrorCategory::Config,
            QuillErrorKind::Json(_) => ErrorCategory::Serialization,
        }
    }

    /// Innermost error, unwrapping stage and revision wrappers.
    pub fn root(&self) -> &QuillError {
        match self.kind() {
            QuillErrorKind::Stage(StageError {
                kind: StageErrorKind::Failed { source, .. },
                ..
            }) => source.root(),
            QuillErrorKind::Revision(RevisionError {
                kind: RevisionErrorKind::Aborted { source, .. },
                ..
            }) => source.root(),
            _ => self,
        }
    }
}

impl RetryableError for QuillError {
    fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::ProviderTransient | ErrorCategory::Timeout
        )
    }
}

// Generic From implementation for any type that converts to QuillErrorKind
impl<T> From<T> for QuillError
where
    T: Into<QuillErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Quill operations.
pub type QuillResult<T> = std::result::Result<T, QuillError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ProviderErrorKind, ValidationErrorKind};

    #[test]
    fn provider_kinds_map_to_categories() {
        let transient: QuillError = ProviderError::new(ProviderErrorKind::from_status(503, "busy")).into();
        assert_eq!(transient.category(), ErrorCategory::ProviderTransient);
        assert!(transient.is_retryable());

        let permanent: QuillError = ProviderError::new(ProviderErrorKind::from_status(401, "nope")).into();
        assert_eq!(permanent.category(), ErrorCategory::ProviderPermanent);
        assert!(!permanent.is_retryable());

        let invalid: QuillError = ProviderError::new(ProviderErrorKind::from_status(404, "gpt-9")).into();
        assert_eq!(invalid.category(), ErrorCategory::ProviderPermanent);
    }

    #[test]
    fn wrappers_report_inner_category() {
        let inner: QuillError = ValidationError::new(ValidationErrorKind::EmptyOutput("outline".into())).into();
        let wrapped: QuillError = StageError::failed("outline", inner).into();
        assert_eq!(wrapped.category(), ErrorCategory::Validation);
        assert!(matches!(wrapped.root().kind(), QuillErrorKind::Validation(_)));
    }

    #[test]
    fn lock_contention_is_a_conflict() {
        let err: QuillError = StorageError::new(StorageErrorKind::Locked("abc".into())).into();
        assert_eq!(err.category(), ErrorCategory::Conflict);
    }
}
