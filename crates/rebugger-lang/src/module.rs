//! Modules, generic functions and their methods

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;

use crate::ast::FunctionDef;
use crate::value::Value;

/// Stable identity of a method; survives redefinition with the same signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodId(pub usize);

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a method definition came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// Loaded from a file through `include`; the source text is retained
    File { path: PathBuf, source: Rc<str> },
    /// Typed interactively; no retained source
    Repl,
    /// Synthesized by the host at runtime
    Generated,
}

impl Origin {
    pub fn describe(&self) -> String {
        match self {
            Origin::File { path, .. } => path.display().to_string(),
            Origin::Repl => "REPL".to_string(),
            Origin::Generated => "generated code".to_string(),
        }
    }
}

/// One method of a generic function
#[derive(Debug, Clone)]
pub struct MethodDef {
    pub id: MethodId,
    pub module: String,
    pub name: String,
    pub def: Rc<FunctionDef>,
    pub origin: Origin,
}

impl MethodDef {
    /// Same method identity with a different definition
    pub fn with_def(&self, def: Rc<FunctionDef>) -> MethodDef {
        MethodDef { def, ..self.clone() }
    }

    /// 1-based line of the `function` keyword, for file-backed methods
    pub fn line(&self) -> Option<usize> {
        match &self.origin {
            Origin::File { source, .. } => Some(crate::ast::line_of(source, self.def.span.start)),
            _ => None,
        }
    }
}

impl fmt::Display for MethodDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{} in {}", self.name, self.def.signature, self.module)?;
        match (&self.origin, self.line()) {
            (Origin::File { path, .. }, Some(line)) => write!(f, " at {}:{}", path.display(), line),
            (origin, _) => write!(f, " ({})", origin.describe()),
        }
    }
}

/// A named namespace of globals and generic functions
#[derive(Debug, Clone, Default)]
pub struct Module {
    pub name: String,
    pub globals: HashMap<String, Value>,
    /// Generic functions by name; each holds its methods in definition order
    pub functions: HashMap<String, Vec<Rc<MethodDef>>>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Default::default() }
    }

    pub fn methods(&self, name: &str) -> &[Rc<MethodDef>] {
        self.functions.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}
