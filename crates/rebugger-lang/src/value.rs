//! Runtime values

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::error::Signal;
use crate::interpreter::Interpreter;
use crate::types::Type;

/// Signature of host-provided functions
pub type NativeFn = dyn Fn(&mut Interpreter, &[Value], &[(String, Value)]) -> Result<Value, Signal>;

/// A function implemented by the host
pub struct Native {
    pub name: String,
    pub func: Box<NativeFn>,
}

impl Native {
    pub fn new(
        name: impl Into<String>,
        func: impl Fn(&mut Interpreter, &[Value], &[(String, Value)]) -> Result<Value, Signal> + 'static,
    ) -> Self {
        Self { name: name.into(), func: Box::new(func) }
    }
}

impl fmt::Debug for Native {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Native({})", self.name)
    }
}

/// Reference to a generic function by its home module and name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionRef {
    pub module: String,
    pub name: String,
}

/// A runtime value
#[derive(Debug, Clone)]
pub enum Value {
    Nothing,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    Tuple(Vec<Value>),
    NamedTuple(Vec<(String, Value)>),
    /// Mutable and shared between every binding that holds it
    Array(Rc<RefCell<Vec<Value>>>),
    /// Inclusive integer range `lo:hi`
    Range(i64, i64),
    Function(FunctionRef),
    Native(Rc<Native>),
    Type(Type),
    Module(String),
}

impl Value {
    pub fn str(s: impl AsRef<str>) -> Self {
        Value::Str(Rc::from(s.as_ref()))
    }

    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn type_of(&self) -> Type {
        match self {
            Value::Nothing => Type::Nothing,
            Value::Bool(_) => Type::Bool,
            Value::Int(_) => Type::Int64,
            Value::Float(_) => Type::Float64,
            Value::Str(_) => Type::String,
            Value::Tuple(_) => Type::Tuple,
            Value::NamedTuple(_) => Type::NamedTuple,
            Value::Array(_) => Type::Vector,
            Value::Range(..) => Type::UnitRange,
            Value::Function(_) | Value::Native(_) => Type::Function,
            Value::Type(_) => Type::DataType,
            Value::Module(_) => Type::Module,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Source-like rendering: strings are quoted
    pub fn repr(&self) -> String {
        match self {
            Value::Str(s) => format!("{:?}", s.as_ref()),
            other => other.to_string(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nothing, Value::Nothing) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => (*a as f64) == *b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Tuple(a), Value::Tuple(b)) => a == b,
            (Value::NamedTuple(a), Value::NamedTuple(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Value::Range(a, b), Value::Range(c, d)) => a == c && b == d,
            (Value::Function(a), Value::Function(b)) => a == b,
            (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(a, b),
            (Value::Type(a), Value::Type(b)) => a == b,
            (Value::Module(a), Value::Module(b)) => a == b,
            _ => false,
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item.repr())?;
    }
    Ok(())
}

/// Print-style rendering: strings are written without quotes
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nothing => write!(f, "nothing"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Str(s) => write!(f, "{}", s),
            Value::Tuple(items) => {
                write!(f, "(")?;
                write_list(f, items)?;
                if items.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
            Value::NamedTuple(fields) => {
                write!(f, "(")?;
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} = {}", name, value.repr())?;
                }
                if fields.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
            Value::Array(items) => {
                write!(f, "[")?;
                write_list(f, &items.borrow())?;
                write!(f, "]")
            }
            Value::Range(lo, hi) => write!(f, "{}:{}", lo, hi),
            Value::Function(r) => write!(f, "{}", r.name),
            Value::Native(n) => write!(f, "{}", n.name),
            Value::Type(t) => write!(f, "{}", t),
            Value::Module(name) => write!(f, "{}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_source_forms() {
        assert_eq!(Value::Float(2.0).to_string(), "2.0");
        assert_eq!(Value::Tuple(vec![Value::Int(1)]).to_string(), "(1,)");
        assert_eq!(Value::array(vec![Value::Int(1), Value::str("a")]).to_string(), "[1, \"a\"]");
        assert_eq!(
            Value::NamedTuple(vec![("k".to_string(), Value::Int(3))]).to_string(),
            "(k = 3,)"
        );
        assert_eq!(Value::Range(1, 3).to_string(), "1:3");
    }

    #[test]
    fn test_arrays_share_storage() {
        let a = Value::array(vec![Value::Int(1)]);
        let b = a.clone();
        if let Value::Array(items) = &a {
            items.borrow_mut().push(Value::Int(2));
        }
        assert_eq!(b.to_string(), "[1, 2]");
    }

    #[test]
    fn test_type_of() {
        assert_eq!(Value::Int(1).type_of(), Type::Int64);
        assert_eq!(Value::str("x").type_of(), Type::String);
        assert!(Value::Float(1.0).type_of().is_subtype(Type::Real));
    }
}
