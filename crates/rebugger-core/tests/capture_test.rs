//! Caller and callee capture through the session facade

mod common;

use std::rc::Rc;

use common::{at, session};
use rebugger_core::{CaptureError, InstrumentMode, StructuralCopy};
use rebugger_error::{ErrorCategory, RebugError};
use rebugger_lang::{Type, Value};

#[test]
fn test_stepin_captures_add() {
    let mut rebugger = session();
    let buffer = "result = add(2, 3)";
    let step = rebugger.stepin(buffer, at(buffer, "add")).unwrap();

    let snapshot = rebugger.snapshot(step.id).unwrap();
    assert_eq!(snapshot.names, vec!["x".to_string(), "y".to_string()]);
    assert_eq!(snapshot.values, vec![Value::Int(2), Value::Int(3)]);

    assert_eq!(step.header, "add(x, y) in Main at demo.rb:1\n  x = 2\n  y = 3");
    assert_eq!(step.block, format!("@eval Main let (x, y) = Rebugger.getstored(\"{}\")\n    x + y\nend", step.id));

    // The block is itself runnable
    assert_eq!(rebugger.eval(&step.block).unwrap(), Value::Int(5));
    // The intercepted call never completed
    assert!(rebugger.eval("result").is_err());
}

#[test]
fn test_every_declared_parameter_is_stored_in_order() {
    let mut rebugger = session();
    let buffer = "mixed(1, 2.5, 3, 4; scale=5, extra=6)";
    rebugger.capture_caller(buffer, 0).unwrap();
    let id = rebugger.capture_callee(InstrumentMode::Shadow).unwrap();

    let snapshot = rebugger.snapshot(id).unwrap();
    assert_eq!(snapshot.names, vec!["a", "__Float64_1", "rest", "scale", "opts", "T"]);
    assert_eq!(
        snapshot.values,
        vec![
            Value::Int(1),
            Value::Float(2.5),
            Value::Tuple(vec![Value::Int(3), Value::Int(4)]),
            Value::Int(5),
            Value::NamedTuple(vec![("extra".to_string(), Value::Int(6))]),
            Value::Type(Type::Int64),
        ]
    );
}

#[test]
fn test_defaults_are_bound_like_the_real_call() {
    let mut rebugger = session();
    rebugger.capture_caller("mixed(7, 1.0)", 0).unwrap();
    let id = rebugger.capture_callee(InstrumentMode::Shadow).unwrap();
    let values = rebugger.get_stored(id).unwrap();
    assert_eq!(values[2], Value::Tuple(Vec::new()));
    assert_eq!(values[3], Value::Int(2));
    assert_eq!(values[4], Value::NamedTuple(Vec::new()));
}

#[test]
fn test_retrieval_is_copy_safe() {
    let mut rebugger = session();
    let buffer = "data = [1, 2]\nbump!(data)";
    let step = rebugger.stepin(buffer, at(buffer, "bump!")).unwrap();

    let first = rebugger.get_stored(step.id).unwrap();
    if let Value::Array(items) = &first[0] {
        items.borrow_mut().push(Value::Int(100));
    } else {
        panic!("expected an array, got {:?}", first[0]);
    }
    let second = rebugger.get_stored(step.id).unwrap();
    assert_eq!(second[0], Value::array(vec![Value::Int(1), Value::Int(2)]));

    // Replaying a mutating body twice sees fresh inputs each time
    assert_eq!(rebugger.eval(&step.block).unwrap(), Value::Int(3));
    assert_eq!(rebugger.eval(&step.block).unwrap(), Value::Int(3));
    // The live array was never touched
    assert_eq!(rebugger.eval("length(data)").unwrap(), Value::Int(2));
}

#[test]
fn test_shadow_is_reused_for_the_same_method() {
    let mut rebugger = session();
    let first = rebugger.stepin("add(1, 2)", 0).unwrap();
    let add = rebugger.interpreter().methods_of("Main", "add")[0].id;
    let hidden = rebugger.shadows().hidden_method(add).unwrap();

    let second = rebugger.stepin("add(3, 4)", 0).unwrap();
    assert_eq!(rebugger.shadows().len(), 1);
    assert_eq!(rebugger.shadows().hidden_method(add), Some(hidden));
    assert_eq!(rebugger.interpreter().methods_of("Main", "__rebugger_hidden_add").len(), 1);

    // Every capture still gets its own identifier
    assert_ne!(first.id, second.id);
    assert_eq!(rebugger.get_stored(first.id).unwrap(), vec![Value::Int(1), Value::Int(2)]);
    assert_eq!(rebugger.get_stored(second.id).unwrap(), vec![Value::Int(3), Value::Int(4)]);
}

#[test]
fn test_redefinition_regenerates_the_shadow() {
    let mut rebugger = session();
    rebugger.stepin("add(1, 2)", 0).unwrap();
    rebugger.include_str("add2.rb", "function add(x, y)\n    x - y\nend\n").unwrap();

    let step = rebugger.stepin("add(5, 1)", 0).unwrap();
    assert!(step.header.starts_with("add(x, y) in Main at add2.rb:1"));
    assert_eq!(rebugger.eval(&step.block).unwrap(), Value::Int(4));
}

#[test]
fn test_overwrite_mode_restores_the_method() {
    let mut rebugger = session();
    let original = rebugger.interpreter().methods_of("Main", "add")[0].clone();
    rebugger.capture_caller("add(2, 5)", 0).unwrap();
    let id = rebugger.capture_callee(InstrumentMode::Overwrite).unwrap();

    assert_eq!(rebugger.get_stored(id).unwrap(), vec![Value::Int(2), Value::Int(5)]);
    let current = rebugger.interpreter().methods_of("Main", "add")[0].clone();
    assert!(Rc::ptr_eq(&current.def, &original.def));
    let before = rebugger.store().borrow().len();
    assert_eq!(rebugger.eval("add(1, 1)").unwrap(), Value::Int(2));
    assert_eq!(rebugger.store().borrow().len(), before);
}

#[test]
fn test_clear_invalidates_identifiers() {
    let mut rebugger = session();
    let step = rebugger.stepin("add(1, 2)", 0).unwrap();
    rebugger.clear();

    assert_eq!(rebugger.get_stored(step.id), Err(CaptureError::UnknownIdentifier(step.id)));
    assert!(rebugger.eval(&step.block).is_err());
    assert!(rebugger.shadows().is_empty());
    assert!(rebugger.interpreter().lookup("Main", "__rebugger_hidden_add").is_none());

    // Capturing works again afterwards
    let again = rebugger.stepin("add(1, 2)", 0).unwrap();
    assert_eq!(rebugger.get_stored(again.id).unwrap(), vec![Value::Int(1), Value::Int(2)]);
}

#[test]
fn test_failure_categories() {
    let mut rebugger = session();

    let err = rebugger.stepin("x = 1 + 2", 0).unwrap_err();
    assert_eq!(err, CaptureError::NoCallAtPoint { point: 0 });
    assert_eq!(err.category(), ErrorCategory::Structural);

    let buffer = "if 1 > 2\n    add(1, 2)\nend";
    let err = rebugger.stepin(buffer, at(buffer, "add")).unwrap_err();
    assert_eq!(err, CaptureError::StashingFailed);
    assert_eq!(err.category(), ErrorCategory::Reachability);

    let err = rebugger.stepin("add(\"a\")", 0).unwrap_err();
    assert!(matches!(err, CaptureError::Resolution { .. }));
    assert_eq!(err.category(), ErrorCategory::Resolution);

    let buffer = "add(1, not_defined)";
    let err = rebugger.stepin(buffer, 0).unwrap_err();
    assert!(matches!(&err, CaptureError::Eval { buffer: b, .. } if b == buffer));
    assert_eq!(err.category(), ErrorCategory::Unexpected);
    assert_eq!(err.context().as_deref(), Some(buffer));

    assert!(matches!(rebugger.stepin("add(1,", 0), Err(CaptureError::Parse(_))));
    assert_eq!(rebugger.capture_callee(InstrumentMode::Shadow), Err(CaptureError::NothingStashed));
}

#[test]
fn test_repl_definitions_are_not_trackable() {
    let mut rebugger = session();
    rebugger.eval("function typed_in(x)\n    x\nend").unwrap();
    let before = rebugger.store().borrow().len();

    let err = rebugger.stepin("typed_in(1)", 0).unwrap_err();
    assert!(matches!(err, CaptureError::NotTrackable { ref origin, .. } if origin == "REPL"));
    assert_eq!(rebugger.store().borrow().len(), before);
}

#[test]
fn test_stepin_from_a_rendered_block() {
    let mut rebugger = session();
    let step = rebugger.stepin("outer(1)", 0).unwrap();
    assert!(step.block.contains("middle(n + 1)"));

    let nested = rebugger.stepin(&step.block, at(&step.block, "middle")).unwrap();
    assert_eq!(rebugger.get_stored(nested.id).unwrap(), vec![Value::Int(2)]);
    assert!(nested.block.contains("inner(m * 2)"));
}

#[test]
fn test_custom_copier_shapes_snapshots() {
    let copier = StructuralCopy::new().with_strategy(Type::String, |_| Value::str("<redacted>"));
    let mut rebugger = session().with_copier(copier);
    rebugger.capture_caller("add(\"secret\", 1)", 0).unwrap();
    let id = rebugger.capture_callee(InstrumentMode::Shadow).unwrap();
    assert_eq!(rebugger.get_stored(id).unwrap(), vec![Value::str("<redacted>"), Value::Int(1)]);
}
