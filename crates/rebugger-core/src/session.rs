//! The capture session: one interpreter plus everything the engines share
//!
//! [`Rebugger`] owns the interpreter, the snapshot store, the shadow cache and
//! the pluggable collaborators, and exposes the capture protocol as methods.

use std::path::Path;

use rebugger_lang::{Interpreter, LangResult, Value, MAIN};
use tracing::{debug, info};
use uuid::Uuid;

use crate::callee::{self, CaptureTools, ShadowCache};
use crate::caller::{self, CapturedCall};
use crate::capability::{CallResolver, Definition, Instrument, InstrumentMode, SourceLookup, TrackedSources};
use crate::config::RebugConfig;
use crate::copy::DeepCopy;
use crate::error::{CaptureError, CaptureResult};
use crate::instrument::BodyInstrumenter;
use crate::natives;
use crate::render::Renderer;
use crate::stacktrace::{self, CapturedTrace};
use crate::store::{SharedStore, Snapshot, SnapshotStore};

/// Result of stepping into a call
#[derive(Debug, Clone)]
pub struct StepIn {
    pub id: Uuid,
    /// Method and captured bindings, one per line
    pub header: String,
    /// Editable replay block
    pub block: String,
}

pub struct Rebugger {
    interp: Interpreter,
    config: RebugConfig,
    store: SharedStore,
    shadows: ShadowCache,
    lookup: Box<dyn SourceLookup>,
    instrumenter: Box<dyn Instrument>,
    renderer: Renderer,
    /// Call intercepted by the last caller capture, not yet consumed
    stashed: Option<CapturedCall>,
}

impl Default for Rebugger {
    fn default() -> Self {
        Self::new(RebugConfig::default())
    }
}

impl Rebugger {
    pub fn new(config: RebugConfig) -> Self {
        let mut interp = Interpreter::new();
        interp.set_max_depth(config.capture.max_call_depth);
        let store = SnapshotStore::new().shared();
        natives::install(&mut interp, &config.render.store_module, store.clone());
        debug!(store_module = %config.render.store_module, "session created");
        Self {
            interp,
            store,
            shadows: ShadowCache::new(),
            lookup: Box::new(TrackedSources),
            instrumenter: Box::new(BodyInstrumenter::new(config.render.store_module.clone())),
            renderer: Renderer::from_config(&config.render),
            stashed: None,
            config,
        }
    }

    pub fn with_source_lookup(mut self, lookup: impl SourceLookup + 'static) -> Self {
        self.lookup = Box::new(lookup);
        self
    }

    pub fn with_instrumenter(mut self, instrumenter: impl Instrument + 'static) -> Self {
        self.instrumenter = Box::new(instrumenter);
        self
    }

    pub fn with_copier(self, copier: impl DeepCopy + 'static) -> Self {
        self.store.borrow_mut().set_copier(copier);
        self
    }

    pub fn config(&self) -> &RebugConfig {
        &self.config
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interp
    }

    pub fn interpreter_mut(&mut self) -> &mut Interpreter {
        &mut self.interp
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn shadows(&self) -> &ShadowCache {
        &self.shadows
    }

    /// Load a source file; its methods become trackable
    pub fn include(&mut self, path: impl AsRef<Path>) -> LangResult<Value> {
        self.interp.include(path)
    }

    /// Load `source` as the contents of `path`
    pub fn include_str(&mut self, path: impl AsRef<Path>, source: &str) -> LangResult<Value> {
        self.interp.include_str(path.as_ref(), source)
    }

    /// Evaluate interactive input in `Main`
    pub fn eval(&mut self, source: &str) -> LangResult<Value> {
        self.interp.eval_str(source)
    }

    //-------------------------------------------------------------------------
    // Capture protocol
    //-------------------------------------------------------------------------

    /// Intercept the call at `point` of `buffer`, evaluated in `Main`
    pub fn capture_caller(&mut self, buffer: &str, point: usize) -> CaptureResult<&CapturedCall> {
        self.capture_caller_in(MAIN, buffer, point)
    }

    /// Intercept the call at `point` of `buffer`, evaluated in `module`
    pub fn capture_caller_in(&mut self, module: &str, buffer: &str, point: usize) -> CaptureResult<&CapturedCall> {
        self.stashed = None;
        let captured = caller::capture_caller(&mut self.interp, &self.config.render.store_module, module, buffer, point)?;
        Ok(self.stashed.insert(captured))
    }

    /// Capture the bound arguments of the call stashed by the last caller capture
    pub fn capture_callee(&mut self, mode: InstrumentMode) -> CaptureResult<Uuid> {
        let captured = self.stashed.take().ok_or(CaptureError::NothingStashed)?;
        let tools = CaptureTools {
            store: &self.store,
            instrumenter: self.instrumenter.as_ref(),
            hidden_prefix: &self.config.capture.hidden_prefix,
        };
        callee::capture_callee(&mut self.interp, tools, &mut self.shadows, &captured.stashed, mode)
    }

    /// Caller capture, shadow callee capture and rendering in one step
    pub fn stepin(&mut self, buffer: &str, point: usize) -> CaptureResult<StepIn> {
        self.capture_caller(buffer, point)?;
        let stashed = &self.stashed.as_ref().ok_or(CaptureError::NothingStashed)?.stashed;
        let method = self.interp.resolve(&stashed.callee, &stashed.args)?;
        // Fail before capturing anything if the body cannot be shown
        let definition = self.lookup.definition(&method)?;
        let id = self.capture_callee(InstrumentMode::Shadow)?;

        let store = self.store.borrow();
        let snapshot = store.snapshot(id)?;
        let step = StepIn {
            id,
            header: self.renderer.header(snapshot, &definition.method),
            block: self.renderer.render(snapshot, &definition),
        };
        info!(method = %definition.method, snapshot = %id, "stepped in");
        Ok(step)
    }

    /// Capture a snapshot for every frame of the error `command` raises
    pub fn capture_stacktrace(&mut self, module: &str, command: &str) -> CaptureResult<CapturedTrace> {
        let tools = CaptureTools {
            store: &self.store,
            instrumenter: self.instrumenter.as_ref(),
            hidden_prefix: &self.config.capture.hidden_prefix,
        };
        stacktrace::capture_stacktrace(
            &mut self.interp,
            tools,
            self.lookup.as_ref(),
            module,
            command,
            self.config.trace.fail_on_divergence,
        )
    }

    //-------------------------------------------------------------------------
    // Snapshots
    //-------------------------------------------------------------------------

    /// Fresh copies of the values stored under `id`
    pub fn get_stored(&self, id: Uuid) -> CaptureResult<Vec<Value>> {
        self.store.borrow().get(id)
    }

    pub fn snapshot(&self, id: Uuid) -> CaptureResult<Snapshot> {
        self.store.borrow().snapshot(id).cloned()
    }

    /// Source definition of the method a snapshot was taken from
    pub fn definition(&self, id: Uuid) -> CaptureResult<Definition> {
        let snapshot = self.snapshot(id)?;
        let method = self.interp.method(snapshot.method).ok_or_else(|| CaptureError::Resolution {
            function: snapshot.function.clone(),
            reason: "method is no longer defined".to_string(),
        })?;
        self.lookup.definition(&method)
    }

    /// Replay block for `id`
    pub fn render(&self, id: Uuid) -> CaptureResult<String> {
        let definition = self.definition(id)?;
        let snapshot = self.snapshot(id)?;
        Ok(self.renderer.render(&snapshot, &definition))
    }

    /// Method header and bindings for `id`
    pub fn describe(&self, id: Uuid) -> CaptureResult<String> {
        let snapshot = self.snapshot(id)?;
        let method = self.interp.method(snapshot.method).ok_or_else(|| CaptureError::Resolution {
            function: snapshot.function.clone(),
            reason: "method is no longer defined".to_string(),
        })?;
        Ok(self.renderer.header(&snapshot, &method))
    }

    /// Drop every snapshot and shadow method; all identifiers become unknown
    pub fn clear(&mut self) {
        self.store.borrow_mut().clear();
        self.shadows.clear(&mut self.interp);
        self.stashed = None;
        info!("cleared capture state");
    }
}
