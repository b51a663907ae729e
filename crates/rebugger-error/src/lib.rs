// Rebugger Error Handling Framework
// Central location for error categories, codes and reporting helpers

use std::any::Any;
use std::error::Error as StdError;
use std::fmt;

// Re-export for crates that only need the derive
pub use thiserror;

mod message;

pub use message::ErrorMessage;

/// Classification of every failure the capture core can report.
///
/// The editing surface renders each category with its own severity, so the
/// mapping from concrete error to category is part of the public contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Malformed signature, expression or buffer; local to one attempt
    Structural,
    /// The marked call (or the failing command) was never reached
    Reachability,
    /// No concrete callable, definition or snapshot could be found
    Resolution,
    /// Any other error raised while evaluating user code
    Unexpected,
}

impl ErrorCategory {
    /// Severity shown by front ends, from least to most severe
    pub fn severity(&self) -> Severity {
        match self {
            ErrorCategory::Reachability => Severity::Warning,
            ErrorCategory::Structural | ErrorCategory::Resolution => Severity::Error,
            ErrorCategory::Unexpected => Severity::Critical,
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Structural => write!(f, "structural"),
            ErrorCategory::Reachability => write!(f, "reachability"),
            ErrorCategory::Resolution => write!(f, "resolution"),
            ErrorCategory::Unexpected => write!(f, "unexpected"),
        }
    }
}

/// Display severity derived from an [`ErrorCategory`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// Error code structure for categorizing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ErrorCode(pub u32);

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RB{:04}", self.0)
    }
}

/// Numeric codes, grouped by the crate that raises them
pub mod codes {
    use crate::ErrorCode;

    // Language errors start with 1000
    pub const PARSE: ErrorCode = ErrorCode(1001);
    pub const EVAL: ErrorCode = ErrorCode(1002);

    // Capture errors start with 2000
    pub const SIGNATURE: ErrorCode = ErrorCode(2001);
    pub const NO_CALL_AT_POINT: ErrorCode = ErrorCode(2002);
    pub const STASHING_FAILED: ErrorCode = ErrorCode(2003);
    pub const EVAL_EXCEPTION: ErrorCode = ErrorCode(2004);
    pub const RESOLUTION: ErrorCode = ErrorCode(2005);
    pub const NOT_TRACKABLE: ErrorCode = ErrorCode(2006);
    pub const INSTRUMENTATION: ErrorCode = ErrorCode(2007);
    pub const COMMAND_DID_NOT_FAIL: ErrorCode = ErrorCode(2008);
    pub const TRACE_DIVERGED: ErrorCode = ErrorCode(2009);
    pub const UNKNOWN_IDENTIFIER: ErrorCode = ErrorCode(2010);

    // Configuration errors start with 3000
    pub const CONFIG: ErrorCode = ErrorCode(3001);
}

/// Base trait for all errors in the Rebugger workspace.
pub trait RebugError: StdError + Send + Sync + Any + 'static {
    /// Returns the numeric code for this error.
    fn error_code(&self) -> ErrorCode;

    /// Returns the reporting category of this error.
    fn category(&self) -> ErrorCategory;

    /// Provides context specific to the error (optional).
    fn context(&self) -> Option<String> {
        None
    }

    /// Builds the serializable form of this error.
    fn to_message(&self) -> ErrorMessage {
        ErrorMessage::new(self.error_code(), self.category(), self.to_string())
            .with_context(self.context())
    }

    /// Returns this error as a `&dyn Any` to allow downcasting.
    fn as_any(&self) -> &dyn Any;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("no call at point {0}")]
    struct Misplaced(usize);

    impl RebugError for Misplaced {
        fn error_code(&self) -> ErrorCode {
            codes::NO_CALL_AT_POINT
        }
        fn category(&self) -> ErrorCategory {
            ErrorCategory::Structural
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn test_severity_ordering() {
        assert!(ErrorCategory::Reachability.severity() < ErrorCategory::Structural.severity());
        assert!(ErrorCategory::Resolution.severity() < ErrorCategory::Unexpected.severity());
    }

    #[test]
    fn test_error_message_from_trait() {
        let message = Misplaced(7).to_message();
        assert_eq!(message.code, codes::NO_CALL_AT_POINT);
        assert_eq!(message.category, ErrorCategory::Structural);
        assert_eq!(message.message, "no call at point 7");
        assert_eq!(format!("{}", message.code), "RB2002");
    }
}
