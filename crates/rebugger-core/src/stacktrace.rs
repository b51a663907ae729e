//! Stacktrace capture: snapshot every frame of a failing command
//!
//! Pass 1 runs the command to obtain its error trace. Every frame whose
//! method has tracked source is then overwritten with a variant that commits
//! a snapshot before running its original body, and pass 2 runs the command
//! again. The overwrites are held by an [`Overwrites`] guard and are undone
//! before anything from pass 2 is inspected.

use std::collections::HashSet;
use std::fmt::Write as _;

use rebugger_lang::{parse_program, EvalError, Interpreter, MethodId, Origin, RuntimeError, Signal, TraceFrame};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::callee::CaptureTools;
use crate::capability::{Definition, InstrumentMode, SourceLookup};
use crate::error::{CaptureError, CaptureResult};
use crate::overwrite::Overwrites;

/// One frame of a captured trace
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    pub frame: TraceFrame,
    /// Source definition, when the frame's method is tracked
    pub definition: Option<Definition>,
    /// Snapshot committed for this frame during pass 2
    pub snapshot: Option<Uuid>,
}

/// Frames of a failing command, innermost first
#[derive(Debug, Clone)]
pub struct CapturedTrace {
    /// The error raised by pass 1
    pub error: RuntimeError,
    pub frames: Vec<CapturedFrame>,
}

impl CapturedTrace {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Snapshot identifiers in frame order; `None` for unresolved frames
    pub fn snapshots(&self) -> Vec<Option<Uuid>> {
        self.frames.iter().map(|f| f.snapshot).collect()
    }

    /// One line per frame: `[i] name(sig) in Module at path:line`
    pub fn listing(&self) -> String {
        let mut out = String::new();
        for (i, captured) in self.frames.iter().enumerate() {
            let _ = match &captured.definition {
                Some(def) => writeln!(out, "[{}] {}", i + 1, def.method),
                None => writeln!(out, "[{}] {} (unresolved)", i + 1, captured.frame),
            };
        }
        out
    }
}

fn frame_keys(trace: &[TraceFrame]) -> Vec<(MethodId, usize)> {
    trace.iter().map(|f| (f.method, f.depth)).collect()
}

/// Run `command` twice in `module`, capturing a snapshot per resolvable frame
pub fn capture_stacktrace(
    interp: &mut Interpreter,
    tools: CaptureTools<'_>,
    lookup: &dyn SourceLookup,
    module: &str,
    command: &str,
    fail_on_divergence: bool,
) -> CaptureResult<CapturedTrace> {
    if !interp.has_module(module) {
        return Err(CaptureError::Resolution { function: module.to_string(), reason: "no such module".to_string() });
    }
    let exprs = parse_program(command)?;

    let error = match interp.eval_exprs(module, &exprs, Origin::Repl) {
        Ok(_) => return Err(CaptureError::CommandDidNotFail { command: command.to_string() }),
        Err(Signal::Raised(err)) => *err,
        Err(Signal::Stop) => {
            let err = RuntimeError::new(EvalError::Runtime("stop signal escaped the command".to_string()), Vec::new());
            return Err(CaptureError::eval(command, err));
        }
    };
    debug!(frames = error.trace.len(), error = %error.error, "pass 1 failed as expected");

    let mut frames: Vec<CapturedFrame> = error
        .trace
        .iter()
        .map(|frame| {
            let definition = match interp.method(frame.method) {
                Some(method) => lookup
                    .definition(&method)
                    .map_err(|e| warn!(frame = %frame, error = %e, "unresolved frame"))
                    .ok(),
                None => {
                    warn!(frame = %frame, "method no longer exists");
                    None
                }
            };
            CapturedFrame { frame: frame.clone(), definition, snapshot: None }
        })
        .collect();

    let mark = tools.store.borrow().mark();
    let pass2 = {
        let mut guard = Overwrites::new(interp);
        let mut attempted = HashSet::new();
        for definition in frames.iter().filter_map(|f| f.definition.as_ref()) {
            let method = &definition.method;
            if !attempted.insert(method.id) {
                continue;
            }
            let installed = tools
                .instrumented(method, InstrumentMode::Overwrite)
                .and_then(|(def, _)| guard.install(method, def));
            if let Err(e) = installed {
                warn!(method = %method, error = %e, "could not instrument frame");
            }
        }
        debug!(count = guard.len(), "running pass 2");
        guard.eval_exprs(module, &exprs, Origin::Repl)
        // guard dropped here; every overwritten method is restored
    };

    let diverged = match &pass2 {
        Err(Signal::Raised(err)) if frame_keys(&err.trace) == frame_keys(&error.trace) => None,
        Err(Signal::Raised(err)) => Some(format!("pass 2 raised `{}` along a different call path", err.error)),
        Err(Signal::Stop) => Some("pass 2 was interrupted by a stop signal".to_string()),
        Ok(_) => Some("pass 2 completed without an error".to_string()),
    };
    if let Some(reason) = diverged {
        if fail_on_divergence {
            return Err(CaptureError::TraceDiverged { reason });
        }
        warn!(%reason, "command is not deterministic; snapshots may not match the trace");
    }

    let store = tools.store.borrow();
    for captured in &mut frames {
        let key = (captured.frame.method, captured.frame.depth);
        // The last commit at this depth belongs to the invocation still active when the error was raised
        captured.snapshot =
            store.committed_since(mark).filter(|s| (s.method, s.depth) == key).last().map(|s| s.id);
    }
    let captured_count = frames.iter().filter(|f| f.snapshot.is_some()).count();
    info!(frames = frames.len(), captured = captured_count, "captured stacktrace");

    Ok(CapturedTrace { error, frames })
}
