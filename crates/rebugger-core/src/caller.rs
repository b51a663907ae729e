//! Caller capture: intercept a call site inside its surrounding context
//!
//! The call whose function expression starts at the cursor is rewritten into
//! `begin Rebugger.stash(f, (args...), (kw = v, ...)); Rebugger.stop() end`
//! and the whole buffer is evaluated. Reaching the stop signal means the
//! callee and its evaluated arguments are now sitting in the stash slot.

use rebugger_lang::{parse_program, Call, Expr, ExprKind, Interpreter, Origin, RuntimeError, Signal, Span};
use tracing::{debug, info};

use crate::error::{CaptureError, CaptureResult};
use crate::natives::{self, StashSlot, StashedCall, STASH, STOP};

/// How evaluation of a rewritten buffer ended
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureOutcome {
    /// The stop signal reached the capture boundary
    ReachedTarget,
    /// Evaluation completed without reaching the instrumented point
    NeverReached,
    /// Some other error was raised
    OtherFailure(RuntimeError),
}

impl CaptureOutcome {
    /// Classify the result of evaluating instrumented code
    pub fn classify<T>(result: Result<T, Signal>) -> Self {
        match result {
            Err(Signal::Stop) => CaptureOutcome::ReachedTarget,
            Ok(_) => CaptureOutcome::NeverReached,
            Err(Signal::Raised(err)) => CaptureOutcome::OtherFailure(*err),
        }
    }
}

/// The call site found at the cursor together with what it was about to do
#[derive(Debug, Clone)]
pub struct CapturedCall {
    /// Source text of the call expression
    pub expression: String,
    pub span: Span,
    pub call: Call,
    pub stashed: StashedCall,
}

/// Find the call whose function expression starts at `point`
pub fn locate_call(exprs: &[Expr], point: usize) -> Option<(&Call, Span)> {
    let mut found = None;
    for expr in exprs {
        expr.walk(&mut |e| {
            if found.is_some() {
                return;
            }
            if let ExprKind::Call(call) = &e.kind {
                if call.func.span.start == point && !matches!(call.func.kind, ExprKind::Call(_)) {
                    found = Some((call, e.span));
                }
            }
        });
        if found.is_some() {
            break;
        }
    }
    found
}

/// Replace the call at `point` with the stash-and-stop block
pub fn rewrite(exprs: &[Expr], point: usize, store_module: &str) -> Option<Vec<Expr>> {
    let mut replace = |e: &Expr| match &e.kind {
        ExprKind::Call(call) if call.func.span.start == point && !matches!(call.func.kind, ExprKind::Call(_)) => {
            let stash = Expr::call(
                Expr::qualified(store_module, STASH),
                vec![
                    (*call.func).clone(),
                    Expr::synthetic(ExprKind::Tuple(call.args.clone())),
                    Expr::synthetic(ExprKind::NamedTuple(call.kwargs.clone())),
                ],
            );
            let stop = Expr::call(Expr::qualified(store_module, STOP), Vec::new());
            Some(Expr::new(ExprKind::Block(vec![stash, stop]), e.span))
        }
        _ => None,
    };
    for (i, expr) in exprs.iter().enumerate() {
        if let Some(new) = expr.replace_first(&mut replace) {
            let mut out = exprs.to_vec();
            out[i] = new;
            return Some(out);
        }
    }
    None
}

/// Evaluate `buffer` in `module` with the call at `point` intercepted
pub fn capture_caller(
    interp: &mut Interpreter,
    store_module: &str,
    module: &str,
    buffer: &str,
    point: usize,
) -> CaptureResult<CapturedCall> {
    let exprs = parse_program(buffer)?;
    let (call, span) = locate_call(&exprs, point).ok_or(CaptureError::NoCallAtPoint { point })?;
    let call = call.clone();
    let rewritten = rewrite(&exprs, point, store_module).ok_or(CaptureError::NoCallAtPoint { point })?;
    let expression = buffer.get(span.start..span.end).unwrap_or_default().to_string();
    debug!(%expression, point, "rewrote call site");

    let slot = StashSlot::default();
    natives::install_stash(interp, store_module, slot.clone());
    let result = interp.eval_exprs(module, &rewritten, Origin::Repl);
    natives::uninstall_stash(interp, store_module);

    let stashed = slot.borrow_mut().take();
    match (CaptureOutcome::classify(result), stashed) {
        (CaptureOutcome::ReachedTarget, Some(stashed)) => {
            info!(%expression, args = stashed.args.len(), kwargs = stashed.kwargs.len(), "captured call site");
            Ok(CapturedCall { expression, span, call, stashed })
        }
        (CaptureOutcome::OtherFailure(err), _) => Err(CaptureError::eval(buffer, err)),
        // A stop raised by user code before the stash is not our stop
        (CaptureOutcome::ReachedTarget, None) | (CaptureOutcome::NeverReached, _) => Err(CaptureError::StashingFailed),
    }
}
