//! Deep copies of runtime values
//!
//! Snapshots must never alias live program state. [`StructuralCopy`] copies
//! every mutable container while keeping the aliasing structure among the
//! copied values intact: two parameters bound to the same array receive two
//! references to one fresh array, and self-referencing arrays stay cyclic.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use rebugger_lang::{Type, Value};

/// Strategy for copying captured values
pub trait DeepCopy {
    /// Copy one value
    fn deep_copy(&self, value: &Value) -> Value;

    /// Copy several values that were captured together
    fn deep_copy_all(&self, values: &[Value]) -> Vec<Value> {
        values.iter().map(|v| self.deep_copy(v)).collect()
    }
}

type CopyFn = dyn Fn(&Value) -> Value;

/// Recursive structural copy with optional per-type overrides
#[derive(Default)]
pub struct StructuralCopy {
    custom: HashMap<Type, Box<CopyFn>>,
}

impl fmt::Debug for StructuralCopy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructuralCopy").field("custom", &self.custom.keys().collect::<Vec<_>>()).finish()
    }
}

impl StructuralCopy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `copy` for every value of type `ty` instead of the structural rule
    pub fn with_strategy(mut self, ty: Type, copy: impl Fn(&Value) -> Value + 'static) -> Self {
        self.custom.insert(ty, Box::new(copy));
        self
    }

    fn copy(&self, value: &Value, seen: &mut HashMap<*const RefCell<Vec<Value>>, Value>) -> Value {
        if let Some(custom) = self.custom.get(&value.type_of()) {
            return custom(value);
        }
        match value {
            Value::Array(items) => {
                let key = Rc::as_ptr(items);
                if let Some(copied) = seen.get(&key) {
                    return copied.clone();
                }
                let fresh = Rc::new(RefCell::new(Vec::new()));
                seen.insert(key, Value::Array(fresh.clone()));
                let copied: Vec<Value> = items.borrow().iter().map(|v| self.copy(v, seen)).collect();
                *fresh.borrow_mut() = copied;
                Value::Array(fresh)
            }
            Value::Tuple(items) => Value::Tuple(items.iter().map(|v| self.copy(v, seen)).collect()),
            Value::NamedTuple(fields) => {
                Value::NamedTuple(fields.iter().map(|(k, v)| (k.clone(), self.copy(v, seen))).collect())
            }
            // Everything else is immutable
            other => other.clone(),
        }
    }
}

impl DeepCopy for StructuralCopy {
    fn deep_copy(&self, value: &Value) -> Value {
        self.copy(value, &mut HashMap::new())
    }

    fn deep_copy_all(&self, values: &[Value]) -> Vec<Value> {
        let mut seen = HashMap::new();
        values.iter().map(|v| self.copy(v, &mut seen)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push(array: &Value, item: Value) {
        if let Value::Array(items) = array {
            items.borrow_mut().push(item);
        }
    }

    #[test]
    fn test_copies_do_not_alias_originals() {
        let original = Value::array(vec![Value::Int(1)]);
        let copied = StructuralCopy::new().deep_copy(&original);
        push(&original, Value::Int(2));
        assert_eq!(copied.to_string(), "[1]");
        assert_eq!(original.to_string(), "[1, 2]");
    }

    #[test]
    fn test_nested_containers() {
        let inner = Value::array(vec![Value::Int(1)]);
        let original = Value::Tuple(vec![inner.clone(), Value::NamedTuple(vec![("k".into(), inner.clone())])]);
        let copied = StructuralCopy::new().deep_copy(&original);
        push(&inner, Value::Int(2));
        assert_eq!(copied.to_string(), "([1], (k = [1],))");
    }

    #[test]
    fn test_shared_aliasing_is_preserved() {
        let shared = Value::array(vec![Value::Int(1)]);
        let copies = StructuralCopy::new().deep_copy_all(&[shared.clone(), shared.clone()]);
        match (&copies[0], &copies[1]) {
            (Value::Array(a), Value::Array(b)) => {
                assert!(Rc::ptr_eq(a, b));
                if let Value::Array(orig) = &shared {
                    assert!(!Rc::ptr_eq(a, orig));
                }
            }
            other => panic!("expected arrays, got {:?}", other),
        }
    }

    #[test]
    fn test_cycles_terminate() {
        let cyclic = Value::array(vec![]);
        push(&cyclic, cyclic.clone());
        let copied = StructuralCopy::new().deep_copy(&cyclic);
        if let Value::Array(outer) = &copied {
            match &outer.borrow()[0] {
                Value::Array(inner) => assert!(Rc::ptr_eq(outer, inner)),
                other => panic!("expected array, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_custom_strategy() {
        let copier = StructuralCopy::new().with_strategy(Type::String, |_| Value::str("<redacted>"));
        assert_eq!(copier.deep_copy(&Value::str("secret")), Value::str("<redacted>"));
        assert_eq!(copier.deep_copy(&Value::Int(4)), Value::Int(4));
    }
}
