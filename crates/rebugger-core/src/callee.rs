//! Callee capture: record the fully bound arguments of the resolved method
//!
//! In shadow mode an instrumented copy of the method is installed under a
//! private name and cached per method; calling it binds the stashed
//! arguments exactly as the real call would, commits a snapshot and stops.
//! In overwrite mode the method itself is temporarily replaced by a variant
//! that commits a snapshot and then runs the original body.

use std::collections::HashMap;
use std::rc::Rc;

use rebugger_lang::{FunctionDef, Interpreter, MethodDef, MethodId, Origin, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::caller::CaptureOutcome;
use crate::capability::{CallResolver, Instrument, InstrumentMode};
use crate::error::{CaptureError, CaptureResult};
use crate::natives::StashedCall;
use crate::overwrite::Overwrites;
use crate::signature::{analyze, SignatureNames};
use crate::store::SharedStore;

/// Collaborators the instrumenting engines share
#[derive(Clone, Copy)]
pub struct CaptureTools<'s> {
    pub store: &'s SharedStore,
    pub instrumenter: &'s dyn Instrument,
    /// Prefix of the private names shadow methods are installed under
    pub hidden_prefix: &'s str,
}

impl CaptureTools<'_> {
    /// Analyze and instrument a copy of `method`'s definition
    pub fn instrumented(&self, method: &MethodDef, mode: InstrumentMode) -> CaptureResult<(FunctionDef, SignatureNames)> {
        let mut def = (*method.def).clone();
        let names = analyze(&mut def)?;
        let instrumented = self.instrumenter.instrument(&def, &names, method.id, mode)?;
        Ok((instrumented, names))
    }
}

//-----------------------------------------------------------------------------
// Shadow cache
//-----------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct ShadowEntry {
    /// Definition the shadow was generated from
    original: Rc<FunctionDef>,
    module: String,
    hidden_name: String,
    hidden: MethodId,
    names: SignatureNames,
}

/// Shadow methods already installed, keyed by the method they shadow
#[derive(Debug, Default)]
pub struct ShadowCache {
    entries: HashMap<MethodId, ShadowEntry>,
}

impl ShadowCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Id of the shadow installed for `method`, if any
    pub fn hidden_method(&self, method: MethodId) -> Option<MethodId> {
        self.entries.get(&method).map(|e| e.hidden)
    }

    pub fn names(&self, method: MethodId) -> Option<&SignatureNames> {
        self.entries.get(&method).map(|e| &e.names)
    }

    /// Return the `(module, name)` of a current shadow for `method`,
    /// generating and installing one when there is none or the method has
    /// been redefined since
    pub fn shadow(
        &mut self,
        interp: &mut Interpreter,
        tools: CaptureTools<'_>,
        method: &MethodDef,
    ) -> CaptureResult<(String, String)> {
        if let Some(entry) = self.entries.get(&method.id) {
            if Rc::ptr_eq(&entry.original, &method.def) && interp.method(entry.hidden).is_some() {
                debug!(method = %method.id, hidden = %entry.hidden_name, "reusing shadow");
                return Ok((entry.module.clone(), entry.hidden_name.clone()));
            }
        }

        let (mut def, names) = tools.instrumented(method, InstrumentMode::Shadow)?;
        let hidden_name = format!("{}{}", tools.hidden_prefix, method.name);
        def.name = hidden_name.clone();
        let hidden = interp
            .define_method(&method.module, Rc::new(def), Origin::Generated)
            .map_err(|e| CaptureError::Instrumentation { method: method.to_string(), reason: e.to_string() })?;
        debug!(method = %method.id, hidden = %hidden.id, name = %hidden_name, "installed shadow");

        self.entries.insert(
            method.id,
            ShadowEntry {
                original: method.def.clone(),
                module: method.module.clone(),
                hidden_name: hidden_name.clone(),
                hidden: hidden.id,
                names,
            },
        );
        Ok((method.module.clone(), hidden_name))
    }

    /// Forget every shadow and remove the hidden functions
    pub fn clear(&mut self, interp: &mut Interpreter) {
        for entry in self.entries.values() {
            interp.remove_function(&entry.module, &entry.hidden_name);
        }
        debug!(count = self.entries.len(), "cleared shadow cache");
        self.entries.clear();
    }
}

//-----------------------------------------------------------------------------
// Capture
//-----------------------------------------------------------------------------

/// Printable form of a stashed call, used as error context
pub fn describe_call(stashed: &StashedCall) -> String {
    let args: Vec<String> = stashed.args.iter().map(Value::repr).collect();
    let mut text = format!("{}({}", stashed.callee, args.join(", "));
    if !stashed.kwargs.is_empty() {
        let kwargs: Vec<String> = stashed.kwargs.iter().map(|(k, v)| format!("{}={}", k, v.repr())).collect();
        text.push_str("; ");
        text.push_str(&kwargs.join(", "));
    }
    text.push(')');
    text
}

/// Capture the arguments the method selected for `stashed` would bind
pub fn capture_callee(
    interp: &mut Interpreter,
    tools: CaptureTools<'_>,
    cache: &mut ShadowCache,
    stashed: &StashedCall,
    mode: InstrumentMode,
) -> CaptureResult<Uuid> {
    let method = interp.resolve(&stashed.callee, &stashed.args)?;
    let mark = tools.store.borrow().mark();

    let result = match mode {
        InstrumentMode::Shadow => {
            let (module, hidden) = cache.shadow(interp, tools, &method)?;
            interp.call_function(&module, &hidden, stashed.args.clone(), stashed.kwargs.clone())
        }
        InstrumentMode::Overwrite => {
            let (def, _) = tools.instrumented(&method, InstrumentMode::Overwrite)?;
            let mut guard = Overwrites::new(interp);
            guard.install(&method, def)?;
            guard.call_value(&stashed.callee, stashed.args.clone(), stashed.kwargs.clone())
        }
    };

    // The first commit for this method belongs to the stashed call itself
    let committed = tools.store.borrow().committed_since(mark).find(|s| s.method == method.id).map(|s| s.id);
    match (committed, CaptureOutcome::classify(result)) {
        (Some(id), outcome) => {
            if let CaptureOutcome::OtherFailure(err) = outcome {
                warn!(method = %method, error = %err.error, "call failed after its arguments were captured");
            }
            info!(method = %method, snapshot = %id, ?mode, "captured callee");
            Ok(id)
        }
        (None, CaptureOutcome::OtherFailure(err)) => Err(CaptureError::eval(describe_call(stashed), err)),
        (None, _) => Err(CaptureError::Instrumentation {
            method: method.to_string(),
            reason: "instrumented method finished without storing its arguments".to_string(),
        }),
    }
}
