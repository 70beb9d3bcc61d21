//! Revision batch errors.

use crate::QuillError;

/// Conditions that abort a revision batch.
#[derive(Debug, Clone, derive_more::Display)]
pub enum RevisionErrorKind {
    /// A request failed in a way that cannot be skipped
    #[display(
        "Revision of scene {} aborted the batch ({} applied, {} not attempted): {}",
        scene_number,
        applied,
        skipped,
        source
    )]
    Aborted {
        /// Scene the failing request targeted
        scene_number: u32,
        /// Requests applied before the failure
        applied: usize,
        /// Requests not attempted, including the failing one
        skipped: usize,
        /// Billed spend of the batch before it aborted in USD
        spent: f64,
        /// Underlying failure
        source: Box<QuillError>,
    },
}

/// Revision error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Revision Error: {} at line {} in {}", kind, line, file)]
pub struct RevisionError {
    /// The specific error condition
    pub kind: RevisionErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// Source file where the error occurred
    pub file: &'static str,
}

impl RevisionError {
    /// Create a new RevisionError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: RevisionErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
