//! Error types for the megam interface.
//!
//! Every fallible operation in this crate returns [`Result<T>`], an alias for
//! `std::result::Result<T, MegamError>`. Errors are serializable as
//! `{ "code": ..., "message": ... }` so that callers can forward them to a
//! frontend or a JSON log without losing the error kind.

use serde::Serialize;
use serde::ser::SerializeStruct;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for megam operations.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum MegamError {
    /// The binary could not be found via environment variables or `PATH`.
    #[error(
        "Unable to find the {name} binary. Searched:\n{}\nFor more information on {name}, see:\n  <{url}>",
        format_searched(.searched)
    )]
    BinaryNotFound {
        name: String,
        searched: Vec<String>,
        url: String,
    },

    /// An explicitly configured binary path does not point at a file.
    ///
    /// No fallback search is attempted when this happens.
    #[error(
        "Found no binary at explicit path {}. For more information, see:\n  <{url}>",
        .path.display()
    )]
    ExplicitPathMissing { path: PathBuf, url: String },

    /// The argument list handed to the invoker is not a list of usable tokens.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// A training instance cannot be expressed in the megam input format.
    #[error("Formatting error: {0}")]
    Format(String),

    /// megam exited with a non-zero status. The message includes its stderr.
    #[error(
        "megam command failed (exit code: {}){}",
        .code.map_or_else(|| "none".to_string(), |c| c.to_string()),
        format_stderr(.stderr)
    )]
    ExecutionFailed { code: Option<i32>, stderr: String },

    /// A line of megam's weight output could not be parsed.
    #[error("Failed to parse weights at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// The requested mode is not supported.
    #[error("Unsupported mode: {0}")]
    UnsupportedMode(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_searched(searched: &[String]) -> String {
    searched
        .iter()
        .map(|s| format!("  - {s}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_stderr(stderr: &str) -> String {
    let stderr = stderr.trim_end();
    if stderr.is_empty() {
        String::new()
    } else {
        format!(":\n{stderr}")
    }
}

impl MegamError {
    /// Get a stable error code for programmatic handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::BinaryNotFound { .. } => "BINARY_NOT_FOUND",
            Self::ExplicitPathMissing { .. } => "EXPLICIT_PATH_MISSING",
            Self::InvalidArguments(_) => "INVALID_ARGUMENTS",
            Self::Format(_) => "FORMAT_ERROR",
            Self::ExecutionFailed { .. } => "EXECUTION_FAILED",
            Self::Parse { .. } => "PARSE_ERROR",
            Self::UnsupportedMode(_) => "UNSUPPORTED_MODE",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Io(_) => "IO_ERROR",
        }
    }

    /// Check if this error came from binary lookup.
    pub fn is_lookup(&self) -> bool {
        matches!(
            self,
            Self::BinaryNotFound { .. } | Self::ExplicitPathMissing { .. }
        )
    }
}

impl Serialize for MegamError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("MegamError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for megam operations.
pub type Result<T> = std::result::Result<T, MegamError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(
            MegamError::Format("x".to_string()).error_code(),
            "FORMAT_ERROR"
        );
        assert_eq!(
            MegamError::ExecutionFailed {
                code: Some(1),
                stderr: String::new()
            }
            .error_code(),
            "EXECUTION_FAILED"
        );
    }

    #[test]
    fn test_is_lookup() {
        let err = MegamError::ExplicitPathMissing {
            path: PathBuf::from("/nope"),
            url: "http://example.invalid".to_string(),
        };
        assert!(err.is_lookup());
        assert!(!MegamError::InvalidArguments("empty".to_string()).is_lookup());
    }

    #[test]
    fn test_not_found_message_lists_search_locations() {
        let err = MegamError::BinaryNotFound {
            name: "megam".to_string(),
            searched: vec!["env var MEGAM".to_string(), "PATH".to_string()],
            url: "http://www.cs.utah.edu/~hal/megam/".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("  - env var MEGAM"));
        assert!(message.contains("  - PATH"));
        assert!(message.contains("http://www.cs.utah.edu/~hal/megam/"));
    }

    #[test]
    fn test_execution_failed_without_code() {
        let err = MegamError::ExecutionFailed {
            code: None,
            stderr: String::new(),
        };
        assert_eq!(err.to_string(), "megam command failed (exit code: none)");
    }

    #[test]
    fn test_execution_failed_includes_stderr() {
        let err = MegamError::ExecutionFailed {
            code: Some(2),
            stderr: "megam: cannot open file\n".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "megam command failed (exit code: 2):\nmegam: cannot open file"
        );
    }

    #[test]
    fn test_error_serialization() {
        let error = MegamError::Parse {
            line: 3,
            message: "expected 2 fields".to_string(),
        };
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("PARSE_ERROR"));
        assert!(json.contains("line 3"));
    }
}
