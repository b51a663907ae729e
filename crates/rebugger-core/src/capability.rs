//! Seams between the capture core and the host language
//!
//! The engines never reach into interpreter internals directly for method
//! resolution, source lookup or code synthesis; they go through these traits
//! so each concern can be swapped independently.

use std::path::PathBuf;
use std::rc::Rc;

use rebugger_lang::{FunctionDef, Interpreter, MethodDef, MethodId, Origin, Value};

use crate::error::{CaptureError, CaptureResult};
use crate::signature::SignatureNames;

//-----------------------------------------------------------------------------
// Resolution
//-----------------------------------------------------------------------------

/// Maps a callee and its positional arguments to the method dispatch would run
pub trait CallResolver {
    fn resolve(&self, callee: &Value, args: &[Value]) -> CaptureResult<Rc<MethodDef>>;
}

impl CallResolver for Interpreter {
    fn resolve(&self, callee: &Value, args: &[Value]) -> CaptureResult<Rc<MethodDef>> {
        match callee {
            Value::Function(f) => self
                .which(callee, args)
                .map_err(|e| CaptureError::Resolution { function: f.name.clone(), reason: e.to_string() }),
            Value::Native(native) => Err(CaptureError::Resolution {
                function: native.name.clone(),
                reason: "built-in functions have no source to capture".to_string(),
            }),
            other => Err(CaptureError::Resolution {
                function: other.repr(),
                reason: format!("value of type {} is not callable", other.type_of()),
            }),
        }
    }
}

//-----------------------------------------------------------------------------
// Source lookup
//-----------------------------------------------------------------------------

/// A method together with the source text it was loaded from
#[derive(Debug, Clone)]
pub struct Definition {
    pub method: Rc<MethodDef>,
    pub path: PathBuf,
    pub source: Rc<str>,
}

impl Definition {
    /// 1-based first and last line of the whole definition
    pub fn linerange(&self) -> (usize, usize) {
        self.method.def.span.lines(&self.source)
    }
}

/// Returns the source-level definition of a method
pub trait SourceLookup {
    fn definition(&self, method: &Rc<MethodDef>) -> CaptureResult<Definition>;
}

/// Lookup backed by the source retained for methods loaded with `include`
#[derive(Debug, Clone, Copy, Default)]
pub struct TrackedSources;

impl SourceLookup for TrackedSources {
    fn definition(&self, method: &Rc<MethodDef>) -> CaptureResult<Definition> {
        match &method.origin {
            Origin::File { path, source } => {
                Ok(Definition { method: method.clone(), path: path.clone(), source: source.clone() })
            }
            other => Err(CaptureError::NotTrackable {
                method: format!("{}{}", method.name, method.def.signature),
                origin: other.describe(),
            }),
        }
    }
}

//-----------------------------------------------------------------------------
// Instrumentation
//-----------------------------------------------------------------------------

/// What an instrumented body does after committing its snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstrumentMode {
    /// Raise the stop signal; installed under a private name
    Shadow,
    /// Continue into the original body; replaces the method in place
    Overwrite,
}

/// Synthesizes an instrumented variant of a definition
pub trait Instrument {
    /// `def` must already have been through signature analysis so that every
    /// parameter is named
    fn instrument(
        &self,
        def: &FunctionDef,
        names: &SignatureNames,
        method: MethodId,
        mode: InstrumentMode,
    ) -> CaptureResult<FunctionDef>;
}
