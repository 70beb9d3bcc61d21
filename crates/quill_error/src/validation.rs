//! Structural validation errors for model output.

/// Ways a model's output can fail its structural contract.
#[derive(Debug, Clone, PartialEq, derive_more::Display)]
pub enum ValidationErrorKind {
    /// Model returned empty or whitespace-only text
    #[display("Model {} returned an empty response", _0)]
    EmptyResponse(String),
    /// Stage produced no usable items
    #[display("Stage {} produced no output", _0)]
    EmptyOutput(String),
    /// Output could not be parsed into the expected shape
    #[display("Malformed {} output: {}", context, message)]
    MalformedOutput {
        /// What was being parsed
        context: String,
        /// Parser message
        message: String,
    },
    /// Sibling act fractions do not sum to one
    #[display("Act fractions at {} sum to {:.4}, expected 1.0", level, sum)]
    FractionSum {
        /// Path of the nesting level (e.g. "top level", "act 2")
        level: String,
        /// Actual sum
        sum: f64,
    },
    /// Act fraction outside (0, 1]
    #[display("Act '{}' has fraction {} outside (0, 1]", act, fraction)]
    FractionRange {
        /// Act title
        act: String,
        /// Offending fraction
        fraction: f64,
    },
    /// Scene numbers are not strictly increasing
    #[display("Scene number {} does not follow {}", found, previous)]
    SceneOrder {
        /// Previous scene number
        previous: u32,
        /// Offending scene number
        found: u32,
    },
    /// Two entries share a name that must be unique
    #[display("Duplicate {} '{}'", context, name)]
    Duplicate {
        /// What kind of entry
        context: String,
        /// Repeated name
        name: String,
    },
    /// Replacement names a different scene than requested
    #[display("Revision targeted scene {} but response named {:?}", expected, found)]
    RevisionTarget {
        /// Requested scene
        expected: u32,
        /// Scene number in the response, if any
        found: Option<u32>,
    },
    /// Replacement contains the wrong number of scenes
    #[display("Revision response contained {} scenes, expected 1", _0)]
    SceneCount(usize),
    /// Scene number not present in the story
    #[display("Scene {} does not exist", _0)]
    UnknownScene(u32),
}

/// Validation error with location tracking.
///
/// # Examples
///
/// ```
/// use quill_error::{ValidationError, ValidationErrorKind};
///
/// let err = ValidationError::new(ValidationErrorKind::SceneOrder { previous: 3, found: 2 });
/// assert!(format!("{}", err).contains("does not follow 3"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Validation Error: {} at line {} in {}", kind, line, file)]
pub struct ValidationError {
    /// The specific error condition
    pub kind: ValidationErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// Source file where the error occurred
    pub file: &'static str,
}

impl ValidationError {
    /// Create a new ValidationError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: ValidationErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
