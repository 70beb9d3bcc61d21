//! Stage ordering and execution errors.

use crate::QuillError;

/// Specific error conditions for stage operations.
#[derive(Debug, Clone, derive_more::Display)]
pub enum StageErrorKind {
    /// A prerequisite stage has never been committed
    #[display("Stage {} requires {} to be committed first", stage, prerequisite)]
    MissingPrerequisite {
        /// Stage that was requested
        stage: String,
        /// Prerequisite that is missing
        prerequisite: String,
    },
    /// A prerequisite stage was invalidated by an upstream re-run
    #[display("Stage {} requires {} but its output is stale", stage, prerequisite)]
    StalePrerequisite {
        /// Stage that was requested
        stage: String,
        /// Prerequisite that is stale
        prerequisite: String,
    },
    /// Output was consumed before the stage ever committed
    #[display("Stage {} has no committed output", _0)]
    NotCommitted(String),
    /// Output was consumed while stale
    #[display("Stage {} output is stale and must be re-run", _0)]
    StaleOutput(String),
    /// Stale output reads are disabled by configuration
    #[display("Stage {} output is stale and hidden from inspection", _0)]
    StaleHidden(String),
    /// Stage ran but failed
    #[display("Stage {} failed: {}", stage, source)]
    Failed {
        /// Stage that failed
        stage: String,
        /// Underlying failure
        source: Box<QuillError>,
    },
}

/// Error type for stage operations.
///
/// # Examples
///
/// ```
/// use quill_error::{StageError, StageErrorKind};
///
/// let err = StageError::new(StageErrorKind::NotCommitted("prose".to_string()));
/// assert!(format!("{}", err).contains("no committed output"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Stage Error: {} at line {} in {}", kind, line, file)]
pub struct StageError {
    /// The specific error condition
    pub kind: StageErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// Source file where the error occurred
    pub file: &'static str,
}

impl StageError {
    /// Create a new StageError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: StageErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Wrap a failure raised while running `stage`.
    #[track_caller]
    pub fn failed(stage: impl Into<String>, source: QuillError) -> Self {
        Self::new(StageErrorKind::Failed {
            stage: stage.into(),
            source: Box::new(source),
        })
    }
}
