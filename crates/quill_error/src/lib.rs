//! Error types for the Quill fiction pipeline.
//!
//! This crate provides the foundation error types used throughout the Quill workspace.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All constructors use `#[track_caller]` for automatic location capture
//!
//! Every error maps onto one [`ErrorCategory`], which is what callers match on
//! when deciding whether to retry, skip, or halt.
//!
//! # Examples
//!
//! ```
//! use quill_error::{ErrorCategory, QuillResult, ValidationError, ValidationErrorKind};
//!
//! fn parse_outline() -> QuillResult<()> {
//!     Err(ValidationError::new(ValidationErrorKind::EmptyOutput("outline".into())))?
//! }
//!
//! let err = parse_outline().unwrap_err();
//! assert_eq!(err.category(), ErrorCategory::Validation);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod budget;
mod config;
mod error;
mod json;
mod provider;
mod revision;
mod stage;
mod storage;
mod validation;

pub use budget::{BudgetError, BudgetErrorKind};
pub use config::ConfigError;
pub use error::{ErrorCategory, QuillError, QuillErrorKind, QuillResult};
pub use json::JsonError;
pub use provider::{ProviderError, ProviderErrorKind, RetryableError};
pub use revision::{RevisionError, RevisionErrorKind};
pub use stage::{StageError, StageErrorKind};
pub use storage::{StorageError, StorageErrorKind};
pub use validation::{ValidationError, ValidationErrorKind};
