//! Configuration error types.

/// Invalid or unloadable configuration.
///
/// `key` names the offending setting in dotted form when one is known.
///
/// # Examples
///
/// ```
/// use quill_error::ConfigError;
///
/// let err = ConfigError::new("must be positive").with_key("models.timeout_secs");
/// assert_eq!(err.key.as_deref(), Some("models.timeout_secs"));
/// assert!(err.to_string().contains("models.timeout_secs: must be positive"));
/// ```
#[derive(Debug, Clone, derive_more::Error)]
pub struct ConfigError {
    /// Dotted setting name, e.g. `pipeline.outline_template`
    pub key: Option<String>,
    /// What is wrong
    pub message: String,
    /// Line number where the error occurred
    pub line: u32,
    /// File where the error occurred
    pub file: &'static str,
}

impl ConfigError {
    /// Create an error not tied to a single setting.
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let location = std::panic::Location::caller();
        Self {
            key: None,
            message: message.into(),
            line: location.line(),
            file: location.file(),
        }
    }

    /// Attribute the error to `key`.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Configuration Error: ")?;
        if let Some(key) = &self.key {
            write!(f, "{}: ", key)?;
        }
        write!(f, "{} at line {} in {}", self.message, self.line, self.file)
    }
}
