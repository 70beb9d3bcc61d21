//! Budget error types.

/// Conditions under which spend is refused.
#[derive(Debug, Clone, PartialEq, derive_more::Display)]
pub enum BudgetErrorKind {
    /// A call was refused before being issued
    #[display(
        "Estimated cost ${:.4} exceeds remaining budget ${:.4}",
        estimated,
        remaining
    )]
    Exceeded {
        /// Estimated cost of the refused call (USD)
        estimated: f64,
        /// Budget left at the time of the check (USD)
        remaining: f64,
    },
    /// Budget ceiling is not a usable number
    #[display("Invalid budget ceiling: {}", _0)]
    InvalidCeiling(f64),
}

/// Budget error with location tracking.
///
/// # Examples
///
/// ```
/// use quill_error::{BudgetError, BudgetErrorKind};
///
/// let err = BudgetError::new(BudgetErrorKind::Exceeded { estimated: 0.02, remaining: 0.01 });
/// assert!(format!("{}", err).contains("exceeds remaining budget"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Budget Error: {} at line {} in {}", kind, line, file)]
pub struct BudgetError {
    /// The kind of error that occurred
    pub kind: BudgetErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl BudgetError {
    /// Create a new budget error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: BudgetErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
