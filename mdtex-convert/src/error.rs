//! Error types for conversion operations

use crate::validate::ValidationIssue;
use std::fmt;
use std::path::{Path, PathBuf};

/// Errors that abort a conversion run.
///
/// Malformed constructs inside a section never end up here; they are
/// recorded as [`Diagnostic`](crate::diagnostics::Diagnostic)s and the
/// section degrades to a safe rendering instead.
#[derive(Debug, Clone, PartialEq)]
pub enum ConvertError {
    /// Reading or writing a file failed
    Io { path: PathBuf, message: String },
    /// The document failed structural validation
    Validation(Vec<ValidationIssue>),
    /// The main document template is unusable
    Template(String),
    /// The LaTeX engine could not be found or failed
    Compile(String),
    /// A required input could not be located
    NotFound(String),
}

impl ConvertError {
    pub(crate) fn io(path: impl AsRef<Path>, err: std::io::Error) -> Self {
        ConvertError::Io {
            path: path.as_ref().to_path_buf(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for ConvertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvertError::Io { path, message } => {
                write!(f, "I/O error on '{}': {message}", path.display())
            }
            ConvertError::Validation(issues) => {
                let errors = issues.iter().filter(|issue| issue.is_error()).count();
                write!(f, "Validation failed with {errors} error(s)")?;
                for issue in issues.iter().filter(|issue| issue.is_error()) {
                    write!(f, "\n  {issue}")?;
                }
                Ok(())
            }
            ConvertError::Template(msg) => write!(f, "Template error: {msg}"),
            ConvertError::Compile(msg) => write!(f, "Compile error: {msg}"),
            ConvertError::NotFound(what) => write!(f, "Not found: {what}"),
        }
    }
}

impl std::error::Error for ConvertError {}
