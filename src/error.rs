//! Error handling for retspec: a hand-rolled error enum plus a context
//! extension trait, used uniformly across the parser, the voting tiers and
//! the two CLI binaries.

use std::fmt;

/// A handful of recent input lines, kept for diagnostic context when a parse
/// fails. See [`crate::context::ParseContext`] for the object that
/// accumulates these as parsing proceeds.
pub type LineContext = Vec<String>;

/// Main error type for retspec operations.
#[derive(Debug)]
pub enum RetSpecError {
    /// I/O operation failed.
    Io(std::io::Error),
    /// JSON serialization/deserialization failed (diagnostic dumps only,
    /// never the line-oriented wire formats of §6).
    Json(serde_json::Error),
    /// A line violated the input grammar: unknown type tag, malformed value
    /// string, or an out-of-order/overlapping integer range.
    Parse {
        message: String,
        context: LineContext,
    },
    /// The persisted ErrorSpec file (or a bug-report file) could not be
    /// parsed back.
    SpecFormat(String),
    /// A CLI argument was missing or a named file could not be opened.
    Usage(String),
}

impl fmt::Display for RetSpecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetSpecError::Io(err) => write!(f, "I/O error: {err}"),
            RetSpecError::Json(err) => write!(f, "JSON error: {err}"),
            RetSpecError::Parse { message, context } => {
                write!(f, "parse error: {message}")?;
                if !context.is_empty() {
                    write!(f, "\n  recent input lines:")?;
                    for line in context {
                        write!(f, "\n    {line}")?;
                    }
                }
                Ok(())
            }
            RetSpecError::SpecFormat(msg) => write!(f, "malformed spec file: {msg}"),
            RetSpecError::Usage(msg) => write!(f, "usage error: {msg}"),
        }
    }
}

impl std::error::Error for RetSpecError {}

impl From<std::io::Error> for RetSpecError {
    fn from(err: std::io::Error) -> Self {
        RetSpecError::Io(err)
    }
}

impl From<serde_json::Error> for RetSpecError {
    fn from(err: serde_json::Error) -> Self {
        RetSpecError::Json(err)
    }
}

/// Result type for retspec operations.
pub type Result<T> = std::result::Result<T, RetSpecError>;

/// Extension trait for adding context to results and options.
pub trait ErrorContext<T> {
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;

    fn context(self, msg: &str) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|_| RetSpecError::SpecFormat(f()))
    }

    fn context(self, msg: &str) -> Result<T> {
        self.with_context(|| msg.to_string())
    }
}

impl<T> ErrorContext<T> for Option<T> {
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.ok_or_else(|| RetSpecError::SpecFormat(f()))
    }

    fn context(self, msg: &str) -> Result<T> {
        self.with_context(|| msg.to_string())
    }
}
