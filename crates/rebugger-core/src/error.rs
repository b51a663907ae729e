//! Error types for the capture core
//!
//! Every failure maps onto one of the four [`ErrorCategory`] values so that a
//! front end can present structural, reachability, resolution and unexpected
//! failures differently.

use std::any::Any;

use rebugger_error::{codes, ErrorCategory, ErrorCode, RebugError};
use rebugger_lang::{ParseError, RuntimeError};
use thiserror::Error;
use uuid::Uuid;

/// Malformed parameter lists found by the signature analyzer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("duplicate parameter name `{name}` in {function}")]
    DuplicateName { function: String, name: String },

    #[error("variadic parameter `{name}` must come last in {function}")]
    VariadicNotLast { function: String, name: String },

    #[error("required parameter `{name}` follows an optional parameter in {function}")]
    RequiredAfterOptional { function: String, name: String },
}

impl RebugError for SignatureError {
    fn error_code(&self) -> ErrorCode {
        codes::SIGNATURE
    }
    fn category(&self) -> ErrorCategory {
        ErrorCategory::Structural
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Failures of a capture operation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CaptureError {
    #[error("could not parse input: {0}")]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Signature(#[from] SignatureError),

    #[error("no call expression starts at offset {point}")]
    NoCallAtPoint { point: usize },

    #[error("point does not mark a reachable call")]
    StashingFailed,

    #[error("no stashed call; capture the caller first")]
    NothingStashed,

    #[error("error while evaluating {buffer:?}: {source}")]
    Eval { buffer: String, source: RuntimeError },

    #[error("cannot resolve {function}: {reason}")]
    Resolution { function: String, reason: String },

    #[error("{method} is not trackable (defined in {origin})")]
    NotTrackable { method: String, origin: String },

    #[error("cannot instrument {method}: {reason}")]
    Instrumentation { method: String, reason: String },

    #[error("command did not fail: {command}")]
    CommandDidNotFail { command: String },

    #[error("second pass diverged from the original error: {reason}")]
    TraceDiverged { reason: String },

    #[error("unknown snapshot identifier {0}")]
    UnknownIdentifier(Uuid),
}

impl CaptureError {
    pub fn eval(buffer: impl Into<String>, source: RuntimeError) -> Self {
        CaptureError::Eval { buffer: buffer.into(), source }
    }
}

impl RebugError for CaptureError {
    fn error_code(&self) -> ErrorCode {
        match self {
            CaptureError::Parse(_) => codes::PARSE,
            CaptureError::Signature(_) => codes::SIGNATURE,
            CaptureError::NoCallAtPoint { .. } => codes::NO_CALL_AT_POINT,
            CaptureError::StashingFailed | CaptureError::NothingStashed => codes::STASHING_FAILED,
            CaptureError::Eval { .. } => codes::EVAL_EXCEPTION,
            CaptureError::Resolution { .. } => codes::RESOLUTION,
            CaptureError::NotTrackable { .. } => codes::NOT_TRACKABLE,
            CaptureError::Instrumentation { .. } => codes::INSTRUMENTATION,
            CaptureError::CommandDidNotFail { .. } => codes::COMMAND_DID_NOT_FAIL,
            CaptureError::TraceDiverged { .. } => codes::TRACE_DIVERGED,
            CaptureError::UnknownIdentifier(_) => codes::UNKNOWN_IDENTIFIER,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            CaptureError::Parse(_)
            | CaptureError::Signature(_)
            | CaptureError::NoCallAtPoint { .. }
            | CaptureError::Instrumentation { .. } => ErrorCategory::Structural,
            CaptureError::StashingFailed | CaptureError::NothingStashed | CaptureError::CommandDidNotFail { .. } => {
                ErrorCategory::Reachability
            }
            CaptureError::Resolution { .. } | CaptureError::NotTrackable { .. } | CaptureError::UnknownIdentifier(_) => {
                ErrorCategory::Resolution
            }
            CaptureError::Eval { .. } | CaptureError::TraceDiverged { .. } => ErrorCategory::Unexpected,
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            CaptureError::Eval { buffer, .. } => Some(buffer.clone()),
            CaptureError::CommandDidNotFail { command } => Some(command.clone()),
            _ => None,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Result type for capture operations
pub type CaptureResult<T> = Result<T, CaptureError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rebugger_lang::EvalError;

    #[test]
    fn test_categories() {
        assert_eq!(CaptureError::NoCallAtPoint { point: 3 }.category(), ErrorCategory::Structural);
        assert_eq!(CaptureError::StashingFailed.category(), ErrorCategory::Reachability);
        assert_eq!(CaptureError::UnknownIdentifier(Uuid::nil()).category(), ErrorCategory::Resolution);
        let eval = CaptureError::eval("f(1)", RuntimeError::new(EvalError::User("boom".into()), Vec::new()));
        assert_eq!(eval.category(), ErrorCategory::Unexpected);
        assert_eq!(eval.context().as_deref(), Some("f(1)"));
    }

    #[test]
    fn test_message_carries_code() {
        let message = CaptureError::StashingFailed.to_message();
        assert_eq!(message.code, codes::STASHING_FAILED);
        assert_eq!(message.message, "point does not mark a reachable call");
    }
}
