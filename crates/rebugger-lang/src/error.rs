//! Error types for the Rebugger scripting language

use std::any::Any;
use std::fmt;

use rebugger_error::{codes, ErrorCategory, ErrorCode, RebugError};
use thiserror::Error;

use crate::module::MethodId;

//-----------------------------------------------------------------------------
// Parse errors
//-----------------------------------------------------------------------------

/// Source location in the input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    /// Line number (1-based)
    pub line: usize,
    /// Column number (1-based)
    pub column: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Error type for parsing script source
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Lexical error at {location}: {message}")]
    LexicalError { message: String, location: SourceLocation },

    #[error("Syntax error at {location}: {message}")]
    SyntaxError { message: String, location: SourceLocation },

    #[error("Unexpected end of input at {location}: expected {expected}")]
    UnexpectedEof { expected: String, location: SourceLocation },
}

impl ParseError {
    pub fn lexical_error(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self::LexicalError { message: message.into(), location: SourceLocation::new(line, column) }
    }

    pub fn syntax_error(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self::SyntaxError { message: message.into(), location: SourceLocation::new(line, column) }
    }

    pub fn unexpected_eof(expected: impl Into<String>, line: usize, column: usize) -> Self {
        Self::UnexpectedEof { expected: expected.into(), location: SourceLocation::new(line, column) }
    }

    pub fn location(&self) -> SourceLocation {
        match self {
            Self::LexicalError { location, .. }
            | Self::SyntaxError { location, .. }
            | Self::UnexpectedEof { location, .. } => *location,
        }
    }
}

impl RebugError for ParseError {
    fn error_code(&self) -> ErrorCode {
        codes::PARSE
    }
    fn category(&self) -> ErrorCategory {
        ErrorCategory::Structural
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
}

//-----------------------------------------------------------------------------
// Evaluation errors
//-----------------------------------------------------------------------------

/// Runtime evaluation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    /// `error(...)` called by user code
    #[error("{0}")]
    User(String),

    #[error("UndefVarError: {0} not defined")]
    UndefinedVariable(String),

    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("MethodError: no method matching {function}({args})")]
    NoMethod { function: String, args: String },

    #[error("MethodError: {function}({args}) is ambiguous")]
    AmbiguousMethod { function: String, args: String },

    #[error("{function}() got unsupported keyword argument \"{keyword}\"")]
    UnsupportedKeyword { function: String, keyword: String },

    #[error("UndefKeywordError: keyword argument {keyword} not assigned")]
    MissingKeyword { keyword: String },

    #[error("Arity mismatch: {function} expects {expected} arguments, found {found}")]
    ArityMismatch { function: String, expected: String, found: usize },

    #[error("BoundsError: attempt to access {length}-element {container} at index [{index}]")]
    Bounds { container: String, length: usize, index: i64 },

    #[error("DivideError: integer division error")]
    DivisionByZero,

    #[error("Value of type {0} is not callable")]
    NotCallable(String),

    #[error("UndefVarError: module {0} not defined")]
    UnknownModule(String),

    #[error("Invalid assignment target: {0}")]
    InvalidAssignment(String),

    #[error("StackOverflowError: call depth exceeded {0}")]
    StackOverflow(usize),

    #[error("Runtime error: {0}")]
    Runtime(String),
}

/// Result type for pure evaluation helpers
pub type EvalResult<T> = Result<T, EvalError>;

/// One frame of an error trace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceFrame {
    pub method: MethodId,
    pub function: String,
    pub module: String,
    /// Position in the call stack, 1 for the outermost call
    pub depth: usize,
}

impl fmt::Display for TraceFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.module, self.function)
    }
}

/// An evaluation error together with the call stack at the raise point
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeError {
    pub error: EvalError,
    /// Innermost frame first
    pub trace: Vec<TraceFrame>,
}

impl RuntimeError {
    pub fn new(error: EvalError, trace: Vec<TraceFrame>) -> Self {
        Self { error, trace }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;
        if !self.trace.is_empty() {
            write!(f, "\nStacktrace:")?;
            for (i, frame) in self.trace.iter().enumerate() {
                write!(f, "\n [{}] {}", i + 1, frame)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for RuntimeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl RebugError for RuntimeError {
    fn error_code(&self) -> ErrorCode {
        codes::EVAL
    }
    fn category(&self) -> ErrorCategory {
        ErrorCategory::Unexpected
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
}

//-----------------------------------------------------------------------------
// Control signals
//-----------------------------------------------------------------------------

/// Abnormal completion of an evaluation, as seen by the host
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    /// An error was raised and not caught
    Raised(Box<RuntimeError>),
    /// The sentinel stop signal; never catchable by `try`
    Stop,
}

impl Signal {
    /// Raise `error` from a native; the interpreter attaches the trace
    pub fn error(error: EvalError) -> Self {
        Signal::Raised(Box::new(RuntimeError::new(error, Vec::new())))
    }
}

impl From<EvalError> for Signal {
    fn from(error: EvalError) -> Self {
        Signal::error(error)
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Raised(err) => write!(f, "{}", err),
            Signal::Stop => write!(f, "stop signal"),
        }
    }
}

/// Failure of a whole load/eval request: either the text did not parse or
/// evaluation ended abnormally
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LangError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("{0}")]
    Signal(Signal),

    #[error("could not read {path}: {message}")]
    Io { path: String, message: String },
}

impl From<Signal> for LangError {
    fn from(signal: Signal) -> Self {
        LangError::Signal(signal)
    }
}

/// Result types for convenience
pub type ParseResult<T> = Result<T, ParseError>;
pub type LangResult<T> = Result<T, LangError>;
