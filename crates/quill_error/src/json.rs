//! Serialization failures outside project storage.

/// Failure to encode or decode a value as JSON.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("JSON Error: {}: {} at line {} in {}", subject, message, line, file)]
pub struct JsonError {
    /// What was being serialized, e.g. "call record"
    pub subject: String,
    /// The serializer's message
    pub message: String,
    /// Line number where the error occurred
    pub line: u32,
    /// File where the error occurred
    pub file: &'static str,
}

impl JsonError {
    /// Record a failure to handle `subject`.
    #[track_caller]
    pub fn new(subject: impl Into<String>, message: impl std::fmt::Display) -> Self {
        let location = std::panic::Location::caller();
        Self {
            subject: subject.into(),
            message: message.to_string(),
            line: location.line(),
            file: location.file(),
        }
    }
}
