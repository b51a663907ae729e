//! Two-pass stacktrace capture

mod common;

use std::rc::Rc;

use common::{session, session_with, FLAKY};
use rebugger_core::{
    BodyInstrumenter, CaptureError, CaptureResult, Definition, Instrument, InstrumentMode, RebugConfig,
    SignatureNames, SourceLookup, TrackedSources,
};
use rebugger_lang::{FunctionDef, MethodDef, MethodId, Value};

/// Instruments everything except the function called `name`
struct RefuseOne {
    name: &'static str,
    inner: BodyInstrumenter,
}

impl Instrument for RefuseOne {
    fn instrument(
        &self,
        def: &FunctionDef,
        names: &SignatureNames,
        method: MethodId,
        mode: InstrumentMode,
    ) -> CaptureResult<FunctionDef> {
        if def.name == self.name {
            return Err(CaptureError::Instrumentation { method: def.name.clone(), reason: "refused".to_string() });
        }
        self.inner.instrument(def, names, method, mode)
    }
}

/// Tracked sources with one function treated as untracked
struct HideOne(&'static str);

impl SourceLookup for HideOne {
    fn definition(&self, method: &Rc<MethodDef>) -> CaptureResult<Definition> {
        if method.name == self.0 {
            return Err(CaptureError::NotTrackable { method: method.name.clone(), origin: "hidden".to_string() });
        }
        TrackedSources.definition(method)
    }
}

fn definitions(rebugger: &rebugger_core::Rebugger, names: &[&str]) -> Vec<Rc<rebugger_lang::MethodDef>> {
    names.iter().map(|n| rebugger.interpreter().methods_of("Main", n)[0].clone()).collect()
}

#[test]
fn test_three_nested_frames_are_captured() {
    let mut rebugger = session();
    let before = definitions(&rebugger, &["outer", "middle", "inner"]);

    let trace = rebugger.capture_stacktrace("Main", "outer(1)").unwrap();
    assert_eq!(trace.error.error.to_string(), "too big: 4");
    assert_eq!(trace.len(), 3);
    let names: Vec<&str> = trace.frames.iter().map(|f| f.frame.function.as_str()).collect();
    assert_eq!(names, vec!["inner", "middle", "outer"]);

    let ids: Vec<_> = trace.snapshots().into_iter().map(|id| id.expect("frame captured")).collect();
    assert_eq!(rebugger.get_stored(ids[0]).unwrap(), vec![Value::Int(4)]);
    assert_eq!(rebugger.get_stored(ids[1]).unwrap(), vec![Value::Int(2)]);
    assert_eq!(rebugger.get_stored(ids[2]).unwrap(), vec![Value::Int(1)]);

    // Every definition is back exactly as it was
    let after = definitions(&rebugger, &["outer", "middle", "inner"]);
    for (old, new) in before.iter().zip(&after) {
        assert!(Rc::ptr_eq(&old.def, &new.def), "{} was not restored", old.name);
    }
    let stored = rebugger.store().borrow().len();
    assert_eq!(rebugger.eval("outer(0)").unwrap(), Value::Int(2));
    assert_eq!(rebugger.store().borrow().len(), stored);

    // Frames render against their own bodies
    let block = rebugger.render(ids[0]).unwrap();
    assert!(block.contains("error(\"too big: \", k)"));
    assert!(rebugger.eval(&block).is_err());
}

#[test]
fn test_listing_marks_unresolved_frames() {
    let mut rebugger = session();
    rebugger.eval("function shim(n)\n    outer(n)\nend").unwrap();

    let trace = rebugger.capture_stacktrace("Main", "shim(1)").unwrap();
    assert_eq!(trace.len(), 4);
    let last = &trace.frames[3];
    assert!(last.definition.is_none());
    assert!(last.snapshot.is_none());
    assert!(trace.frames[..3].iter().all(|f| f.snapshot.is_some()));

    let listing = trace.listing();
    let lines: Vec<&str> = listing.lines().collect();
    assert_eq!(lines[0], "[1] inner(k) in Main at demo.rb:22");
    assert_eq!(lines[3], "[4] Main.shim (unresolved)");
}

#[test]
fn test_recursive_frames_get_their_own_snapshots() {
    let mut rebugger = session();
    rebugger
        .include_str("countdown.rb", "function countdown(n)\n    if n == 0\n        error(\"liftoff\")\n    end\n    countdown(n - 1)\nend\n")
        .unwrap();

    let trace = rebugger.capture_stacktrace("Main", "countdown(2)").unwrap();
    assert_eq!(trace.len(), 3);
    let values: Vec<Value> = trace
        .snapshots()
        .into_iter()
        .map(|id| rebugger.get_stored(id.unwrap()).unwrap().remove(0))
        .collect();
    assert_eq!(values, vec![Value::Int(0), Value::Int(1), Value::Int(2)]);
}

#[test]
fn test_command_must_fail() {
    let mut rebugger = session();
    let err = rebugger.capture_stacktrace("Main", "add(1, 2)").unwrap_err();
    assert_eq!(err, CaptureError::CommandDidNotFail { command: "add(1, 2)".to_string() });
    assert!(rebugger.store().borrow().is_empty());
}

#[test]
fn test_divergent_second_pass_is_reported_and_restored() {
    let mut rebugger = session();
    rebugger.include_str("flaky.rb", FLAKY).unwrap();
    let before = definitions(&rebugger, &["flaky"]);

    let err = rebugger.capture_stacktrace("Main", "flaky()").unwrap_err();
    assert!(matches!(err, CaptureError::TraceDiverged { .. }));
    let after = definitions(&rebugger, &["flaky"]);
    assert!(Rc::ptr_eq(&before[0].def, &after[0].def));
}

#[test]
fn test_divergence_can_be_tolerated() {
    let mut config = RebugConfig::default();
    config.trace.fail_on_divergence = false;
    let mut rebugger = session_with(config);
    rebugger.include_str("flaky.rb", FLAKY).unwrap();

    let trace = rebugger.capture_stacktrace("Main", "flaky()").unwrap();
    assert_eq!(trace.len(), 1);
    assert!(trace.frames[0].snapshot.is_some());
}

#[test]
fn test_unknown_module_is_a_resolution_error() {
    let mut rebugger = session();
    let err = rebugger.capture_stacktrace("Nowhere", "outer(1)").unwrap_err();
    assert!(matches!(err, CaptureError::Resolution { ref function, .. } if function == "Nowhere"));
}

#[test]
fn test_failed_instrumentation_leaves_a_gap_and_restores() {
    let mut rebugger =
        session().with_instrumenter(RefuseOne { name: "middle", inner: BodyInstrumenter::new("Rebugger") });
    let before = definitions(&rebugger, &["outer", "middle", "inner"]);

    let trace = rebugger.capture_stacktrace("Main", "outer(1)").unwrap();
    assert_eq!(trace.len(), 3);
    assert!(trace.frames[1].definition.is_some());
    assert!(trace.frames[1].snapshot.is_none());
    let inner = trace.frames[0].snapshot.expect("inner captured");
    let outer = trace.frames[2].snapshot.expect("outer captured");
    assert_eq!(rebugger.get_stored(inner).unwrap(), vec![Value::Int(4)]);
    assert_eq!(rebugger.get_stored(outer).unwrap(), vec![Value::Int(1)]);

    let after = definitions(&rebugger, &["outer", "middle", "inner"]);
    for (old, new) in before.iter().zip(&after) {
        assert!(Rc::ptr_eq(&old.def, &new.def), "{} was not restored", old.name);
    }
}

#[test]
fn test_rejected_lookup_is_an_unresolved_placeholder() {
    let mut rebugger = session().with_source_lookup(HideOne("middle"));
    let before = definitions(&rebugger, &["outer", "middle", "inner"]);

    let trace = rebugger.capture_stacktrace("Main", "outer(1)").unwrap();
    assert_eq!(trace.len(), 3);
    assert!(trace.frames[1].definition.is_none());
    assert!(trace.frames[1].snapshot.is_none());
    assert!(trace.frames[0].snapshot.is_some());
    assert!(trace.frames[2].snapshot.is_some());
    let listing = trace.listing();
    assert_eq!(listing.lines().nth(1), Some("[2] Main.middle (unresolved)"));

    let after = definitions(&rebugger, &["outer", "middle", "inner"]);
    for (old, new) in before.iter().zip(&after) {
        assert!(Rc::ptr_eq(&old.def, &new.def), "{} was not restored", old.name);
    }
}
