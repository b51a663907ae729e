//! Purpose: scripting language with multiple dispatch, modules and source
//! tracking that hosts the Rebugger capture core.

pub mod ast;
pub mod builtins;
pub mod dispatch;
pub mod error;
pub mod interpreter;
pub mod module;
pub mod parser;
pub mod types;
pub mod value;


// Re-export key components
pub use ast::{Call, Expr, ExprKind, FunctionDef, KwParam, Param, Signature, Span, TypeParam};
pub use error::{EvalError, LangError, LangResult, ParseError, RuntimeError, Signal, TraceFrame};
pub use interpreter::{EvalContext, Frame, Interpreter, BASE, DEFAULT_MAX_DEPTH, MAIN};
pub use module::{MethodDef, MethodId, Origin};
pub use parser::parse_program;
pub use types::Type;
pub use value::{FunctionRef, Native, Value};
