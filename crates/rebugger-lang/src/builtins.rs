//! Built-in functions installed into `Base`

use crate::ast::BinaryOp;
use crate::dispatch::describe_args;
use crate::error::{EvalError, Signal};
use crate::interpreter::{binary_op, iterate, Interpreter, BASE};
use crate::types::Type;
use crate::value::Value;

type NativeResult = Result<Value, Signal>;

fn no_method(name: &str, args: &[Value]) -> Signal {
    Signal::error(EvalError::NoMethod { function: name.to_string(), args: describe_args(args) })
}

fn reject_keywords(name: &str, kwargs: &[(String, Value)]) -> Result<(), Signal> {
    match kwargs.first() {
        Some((keyword, _)) => Err(Signal::error(EvalError::UnsupportedKeyword {
            function: name.to_string(),
            keyword: keyword.clone(),
        })),
        None => Ok(()),
    }
}

/// Concatenate print-style renderings
fn concat(args: &[Value]) -> String {
    args.iter().map(Value::to_string).collect()
}

/// Register a native that takes only positional arguments
fn define(interp: &mut Interpreter, name: &'static str, f: fn(&mut Interpreter, &[Value]) -> NativeResult) {
    interp.register_native(BASE, name, move |interp, args, kwargs| {
        reject_keywords(name, kwargs)?;
        f(interp, args)
    });
}

/// Install every built-in into `Base`
pub fn install(interp: &mut Interpreter) {
    define(interp, "error", |_, args| Err(Signal::error(EvalError::User(concat(args)))));
    define(interp, "println", |interp, args| {
        interp.write_output(&format!("{}\n", concat(args)));
        Ok(Value::Nothing)
    });
    define(interp, "print", |interp, args| {
        interp.write_output(&concat(args));
        Ok(Value::Nothing)
    });
    define(interp, "string", |_, args| Ok(Value::str(concat(args))));
    define(interp, "repr", |_, args| match args {
        [value] => Ok(Value::str(value.repr())),
        _ => Err(no_method("repr", args)),
    });
    define(interp, "typeof", |_, args| match args {
        [value] => Ok(Value::Type(value.type_of())),
        _ => Err(no_method("typeof", args)),
    });
    define(interp, "isa", |_, args| match args {
        [value, Value::Type(t)] => Ok(Value::Bool(value.type_of().is_subtype(*t))),
        _ => Err(no_method("isa", args)),
    });
    define(interp, "length", |_, args| match args {
        [Value::Str(s)] => Ok(Value::Int(s.chars().count() as i64)),
        [value @ (Value::Array(_) | Value::Tuple(_) | Value::NamedTuple(_) | Value::Range(..))] => {
            Ok(Value::Int(iterate(value)?.len() as i64))
        }
        _ => Err(no_method("length", args)),
    });
    define(interp, "isempty", |_, args| match args {
        [Value::Str(s)] => Ok(Value::Bool(s.is_empty())),
        [value @ (Value::Array(_) | Value::Tuple(_) | Value::NamedTuple(_) | Value::Range(..))] => {
            Ok(Value::Bool(iterate(value)?.is_empty()))
        }
        _ => Err(no_method("isempty", args)),
    });
    define(interp, "push!", |_, args| match args {
        [Value::Array(items), rest @ ..] if !rest.is_empty() => {
            items.borrow_mut().extend(rest.iter().cloned());
            Ok(args[0].clone())
        }
        _ => Err(no_method("push!", args)),
    });
    define(interp, "first", |_, args| end_element("first", args, true));
    define(interp, "last", |_, args| end_element("last", args, false));
    define(interp, "collect", |_, args| match args {
        [value] => Ok(Value::array(iterate(value)?)),
        _ => Err(no_method("collect", args)),
    });
    define(interp, "abs", |_, args| match args {
        [Value::Int(n)] => Ok(Value::Int(n.wrapping_abs())),
        [Value::Float(x)] => Ok(Value::Float(x.abs())),
        _ => Err(no_method("abs", args)),
    });
    define(interp, "sqrt", |_, args| {
        let x = match args {
            [Value::Int(n)] => *n as f64,
            [Value::Float(x)] => *x,
            _ => return Err(no_method("sqrt", args)),
        };
        if x < 0.0 {
            return Err(Signal::error(EvalError::Runtime(format!(
                "DomainError with {:?}: sqrt will only return a complex result if called with a complex argument",
                x
            ))));
        }
        Ok(Value::Float(x.sqrt()))
    });
    define(interp, "max", |_, args| extremum("max", args, true));
    define(interp, "min", |_, args| extremum("min", args, false));
    define(interp, "sum", |_, args| match args {
        [value] => {
            let mut total = Value::Int(0);
            for item in iterate(value)? {
                total = binary_op(BinaryOp::Add, total, item)?;
            }
            Ok(total)
        }
        _ => Err(no_method("sum", args)),
    });
}

fn end_element(name: &str, args: &[Value], front: bool) -> NativeResult {
    let [value] = args else {
        return Err(no_method(name, args));
    };
    let items = iterate(value)?;
    let picked = if front { items.first() } else { items.last() };
    picked.cloned().ok_or_else(|| {
        Signal::error(EvalError::Bounds {
            container: value.type_of().to_string(),
            length: 0,
            index: if front { 1 } else { 0 },
        })
    })
}

fn extremum(name: &str, args: &[Value], largest: bool) -> NativeResult {
    let Some((first, rest)) = args.split_first() else {
        return Err(no_method(name, args));
    };
    let mut best = first.clone();
    for candidate in rest {
        let op = if largest { BinaryOp::Gt } else { BinaryOp::Lt };
        if binary_op(op, candidate.clone(), best.clone())? == Value::Bool(true) {
            best = candidate.clone();
        }
    }
    Ok(best)
}

/// Calling a type converts its single argument
pub(crate) fn convert(target: Type, args: &[Value]) -> Result<Value, EvalError> {
    let no_method = || EvalError::NoMethod { function: target.name().to_string(), args: describe_args(args) };
    let [value] = args else {
        return Err(no_method());
    };
    match (target, value) {
        (Type::Int64, Value::Int(n)) => Ok(Value::Int(*n)),
        (Type::Int64, Value::Bool(b)) => Ok(Value::Int(*b as i64)),
        (Type::Int64, Value::Float(x)) if x.fract() == 0.0 => Ok(Value::Int(*x as i64)),
        (Type::Int64, Value::Float(x)) => Err(EvalError::Runtime(format!("InexactError: Int64({:?})", x))),
        (Type::Float64, Value::Int(n)) => Ok(Value::Float(*n as f64)),
        (Type::Float64, Value::Float(x)) => Ok(Value::Float(*x)),
        (Type::String, v) => Ok(Value::str(v.to_string())),
        (Type::Vector, v) => Ok(Value::array(iterate(v)?)),
        _ => Err(no_method()),
    }
}
