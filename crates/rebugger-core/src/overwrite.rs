//! Scoped in-place replacement of method definitions
//!
//! [`Overwrites`] borrows the interpreter for as long as instrumented
//! definitions are installed. Dropping it puts every displaced method back,
//! whichever way the enclosing scope is left.

use std::collections::HashSet;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use rebugger_lang::{FunctionDef, Interpreter, MethodDef, MethodId};
use tracing::{debug, error};

use crate::error::{CaptureError, CaptureResult};

pub struct Overwrites<'a> {
    interp: &'a mut Interpreter,
    /// Displaced originals in installation order
    originals: Vec<Rc<MethodDef>>,
    installed: HashSet<MethodId>,
}

impl<'a> Overwrites<'a> {
    pub fn new(interp: &'a mut Interpreter) -> Self {
        Self { interp, originals: Vec::new(), installed: HashSet::new() }
    }

    /// Replace `method` with `def`, keeping its identity and origin. A method
    /// that is already overwritten is left alone.
    pub fn install(&mut self, method: &MethodDef, def: FunctionDef) -> CaptureResult<()> {
        if self.installed.contains(&method.id) {
            return Ok(());
        }
        let replacement = Rc::new(method.with_def(Rc::new(def)));
        let displaced = self.interp.replace_method(replacement).ok_or_else(|| CaptureError::Instrumentation {
            method: method.to_string(),
            reason: "method is no longer defined".to_string(),
        })?;
        debug!(method = %method.id, name = %method.name, "installed overwrite");
        self.installed.insert(method.id);
        self.originals.push(displaced);
        Ok(())
    }

    pub fn is_installed(&self, id: MethodId) -> bool {
        self.installed.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.originals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.originals.is_empty()
    }
}

impl Deref for Overwrites<'_> {
    type Target = Interpreter;

    fn deref(&self) -> &Interpreter {
        &*self.interp
    }
}

impl DerefMut for Overwrites<'_> {
    fn deref_mut(&mut self) -> &mut Interpreter {
        &mut *self.interp
    }
}

impl Drop for Overwrites<'_> {
    fn drop(&mut self) {
        let count = self.originals.len();
        for original in self.originals.drain(..).rev() {
            let id = original.id;
            if self.interp.replace_method(original).is_none() {
                error!(method = %id, "could not restore overwritten method");
            }
        }
        if count > 0 {
            debug!(count, "restored overwritten methods");
        }
    }
}
