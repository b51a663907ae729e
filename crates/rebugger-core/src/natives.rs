//! Host functions that instrumented and rewritten code calls back into
//!
//! `store`, `stop` and `getstored` live for the whole session in the store
//! module. `stash` is only bound while a caller capture is running.

use std::cell::RefCell;
use std::rc::Rc;

use rebugger_lang::{EvalError, Interpreter, MethodId, Signal, Value};
use tracing::trace;
use uuid::Uuid;

use crate::store::SharedStore;

pub const STORE: &str = "store";
pub const STOP: &str = "stop";
pub const GET_STORED: &str = "getstored";
pub const STASH: &str = "stash";

/// A call intercepted at the point of interest
#[derive(Debug, Clone, PartialEq)]
pub struct StashedCall {
    pub callee: Value,
    pub args: Vec<Value>,
    pub kwargs: Vec<(String, Value)>,
}

pub type StashSlot = Rc<RefCell<Option<StashedCall>>>;

fn bad_call(name: &str, args: &[Value]) -> Signal {
    Signal::error(EvalError::NoMethod {
        function: name.to_string(),
        args: args.iter().map(|a| format!("::{}", a.type_of())).collect::<Vec<_>>().join(", "),
    })
}

/// Bind `store`, `stop` and `getstored` in `module`
pub fn install(interp: &mut Interpreter, module: &str, store: SharedStore) {
    let committed = store.clone();
    interp.register_native(module, STORE, move |interp, args, _| {
        let [id, Value::Tuple(names), Value::Tuple(values)] = args else {
            return Err(bad_call(STORE, args));
        };
        let method = id
            .as_int()
            .and_then(|id| usize::try_from(id).ok())
            .and_then(|id| interp.method(MethodId(id)))
            .ok_or_else(|| Signal::error(EvalError::Runtime(format!("store: unknown method {}", id.repr()))))?;
        let names = names
            .iter()
            .map(|n| n.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| bad_call(STORE, args))?;
        if names.len() != values.len() {
            return Err(bad_call(STORE, args));
        }
        committed.borrow_mut().commit(&method, interp.depth(), names, values);
        Ok(Value::Nothing)
    });

    interp.register_native(module, STOP, |_, args, _| {
        if !args.is_empty() {
            return Err(bad_call(STOP, args));
        }
        trace!("stop signal raised");
        Err(Signal::Stop)
    });

    interp.register_native(module, GET_STORED, move |_, args, _| {
        let [Value::Str(id)] = args else {
            return Err(bad_call(GET_STORED, args));
        };
        let id = Uuid::parse_str(id)
            .map_err(|e| Signal::error(EvalError::Runtime(format!("getstored: invalid identifier: {}", e))))?;
        let values = store
            .borrow()
            .get(id)
            .map_err(|e| Signal::error(EvalError::Runtime(e.to_string())))?;
        Ok(Value::Tuple(values))
    });
}

/// Bind `stash` in `module`, writing into `slot`
pub fn install_stash(interp: &mut Interpreter, module: &str, slot: StashSlot) {
    interp.register_native(module, STASH, move |_, args, _| {
        let [callee, Value::Tuple(positional), Value::NamedTuple(keywords)] = args else {
            return Err(bad_call(STASH, args));
        };
        trace!(callee = %callee, args = positional.len(), kwargs = keywords.len(), "stashed call");
        *slot.borrow_mut() =
            Some(StashedCall { callee: callee.clone(), args: positional.clone(), kwargs: keywords.clone() });
        Ok(Value::Nothing)
    });
}

pub fn uninstall_stash(interp: &mut Interpreter, module: &str) {
    interp.unregister(module, STASH);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SnapshotStore;

    fn session() -> (Interpreter, SharedStore) {
        let mut interp = Interpreter::new();
        let store = SnapshotStore::new().shared();
        install(&mut interp, "Rebugger", store.clone());
        (interp, store)
    }

    #[test]
    fn test_stop_is_not_catchable() {
        let (mut interp, _) = session();
        let result = interp.eval_str("try\n    Rebugger.stop()\ncatch\n    1\nend");
        assert!(matches!(result, Err(rebugger_lang::LangError::Signal(Signal::Stop))));
    }

    #[test]
    fn test_store_records_depth_and_method() {
        let (mut interp, store) = session();
        interp
            .include_str("f.rb", "function f(x)\n    Rebugger.store(1, (\"x\",), (x,))\n    x\nend")
            .unwrap();
        let id = interp.methods_of("Main", "f")[0].id;
        assert_eq!(id, MethodId(1));
        interp.eval_str("f([1, 2])").unwrap();
        let store = store.borrow();
        let snapshot = store.committed_since(0).next().unwrap();
        assert_eq!(snapshot.method, id);
        assert_eq!(snapshot.depth, 1);
        assert_eq!(snapshot.names, vec!["x".to_string()]);
    }

    #[test]
    fn test_getstored_rejects_unknown_identifier() {
        let (mut interp, _) = session();
        let src = format!("Rebugger.getstored(\"{}\")", Uuid::new_v4());
        assert!(interp.eval_str(&src).is_err());
    }

    #[test]
    fn test_stash_slot() {
        let (mut interp, _) = session();
        let slot = StashSlot::default();
        install_stash(&mut interp, "Rebugger", slot.clone());
        interp.eval_str("Rebugger.stash(println, (1, 2), (k = 3,))").unwrap();
        let stashed = slot.borrow_mut().take().unwrap();
        assert_eq!(stashed.args, vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(stashed.kwargs, vec![("k".to_string(), Value::Int(3))]);

        uninstall_stash(&mut interp, "Rebugger");
        assert!(interp.eval_str("Rebugger.stash(println, (), (k = 1,))").is_err());
    }
}
