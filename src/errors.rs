use thiserror::Error; // Import the `Error` derive macro from the `thiserror` crate

use crate::validate::Violation;

// Every failure a fix run can hit. None of them are recoverable mid-run; they
// all propagate to the caller, which decides the exit status.
#[derive(Debug, Error)]
pub enum FixError {
    // Node-selection expression could not be parsed
    #[error("invalid query `{query}`: {reason}")]
    InvalidQuery { query: String, reason: String },

    // A rule found a record whose shape it does not understand
    #[error("unexpected {context}: {value}")]
    UnexpectedValue { context: String, value: String },

    // Generated patch failed validation; all violations are kept
    #[error("invalid patch: {}", summarize(.violations))]
    InvalidPatch { violations: Vec<Violation> },

    #[error("invalid JSON pointer: {0:?}")]
    InvalidPointer(String),

    #[error("path not found: {path:?}")]
    PathNotFound { path: String },

    #[error("type mismatch at {path:?}: {reason}")]
    TypeMismatch { path: String, reason: String },

    #[error("cannot move {from:?} to {path:?}: locations overlap")]
    OverlappingMove { from: String, path: String },

    #[error("cannot remove the document root")]
    RemoveRoot,

    #[error("test failed at {path:?}")]
    TestFailed { path: String },

    // External reference service returned nothing usable
    #[error("could not resolve {id}: {reason}")]
    LookupFailed { id: String, reason: String },

    #[error("unknown rule `{name}` (known rules: {known})")]
    UnknownRule { name: String, known: String },

    #[error("fetch error: {0}")]
    Fetch(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Regex(#[from] regex::Error),
}

impl FixError {
    pub(crate) fn unexpected(context: impl Into<String>, value: impl ToString) -> Self {
        FixError::UnexpectedValue {
            context: context.into(),
            value: value.to_string(),
        }
    }
}

fn summarize(violations: &[Violation]) -> String {
    match violations {
        [] => "no violations recorded".to_string(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{first} (and {} more)", rest.len()),
    }
}

// Type alias for results that use `FixError` as the error type
pub type Result<T> = std::result::Result<T, FixError>;
