//! Multiple dispatch: choosing the most specific applicable method
//!
//! Only positional arguments take part in dispatch. Keyword arguments are
//! matched against the selected method afterwards.

use std::rc::Rc;

use crate::ast::FunctionDef;
use crate::error::{EvalError, EvalResult};
use crate::module::MethodDef;
use crate::types::Type;
use crate::value::Value;

/// Resolve a parameter annotation, honoring the method's `where` clause
pub fn annotation_type(def: &FunctionDef, annotation: Option<&str>) -> EvalResult<Type> {
    let Some(name) = annotation else {
        return Ok(Type::Any);
    };
    if let Some(tp) = def.signature.type_params.iter().find(|tp| tp.name == name) {
        return match &tp.bound {
            Some(bound) => Type::from_name(bound).ok_or_else(|| EvalError::UndefinedVariable(bound.clone())),
            None => Ok(Type::Any),
        };
    }
    Type::from_name(name).ok_or_else(|| EvalError::UndefinedVariable(name.to_string()))
}

/// Declared types of the positional parameters
pub fn signature_types(def: &FunctionDef) -> EvalResult<Vec<Type>> {
    def.signature.params.iter().map(|p| annotation_type(def, p.annotation.as_deref())).collect()
}

/// Whether two definitions declare the same positional signature, in which
/// case the later one replaces the earlier
pub fn same_signature(a: &FunctionDef, b: &FunctionDef) -> bool {
    let shape = |def: &FunctionDef| -> Option<Vec<(Type, bool, bool)>> {
        let types = signature_types(def).ok()?;
        Some(
            types
                .into_iter()
                .zip(&def.signature.params)
                .map(|(t, p)| (t, p.variadic, p.default.is_some()))
                .collect(),
        )
    };
    match (shape(a), shape(b)) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

/// Per-argument declared types if `method` accepts `args`
fn applicable(method: &MethodDef, args: &[Value]) -> Option<Vec<Type>> {
    let params = &method.def.signature.params;
    let types = signature_types(&method.def).ok()?;
    let variadic = params.last().is_some_and(|p| p.variadic);
    let fixed = if variadic { params.len() - 1 } else { params.len() };
    let required = params[..fixed].iter().filter(|p| p.default.is_none()).count();
    if args.len() < required || (!variadic && args.len() > fixed) {
        return None;
    }
    let mut matched = Vec::with_capacity(args.len());
    for (i, arg) in args.iter().enumerate() {
        let declared = if i < fixed { types[i] } else { types[fixed] };
        if !arg.type_of().is_subtype(declared) {
            return None;
        }
        matched.push(declared);
    }
    Some(matched)
}

fn is_variadic(method: &MethodDef) -> bool {
    method.def.signature.params.last().is_some_and(|p| p.variadic)
}

/// `a` is strictly more specific than `b` for the same argument list
fn more_specific(a: &MethodDef, a_types: &[Type], b: &MethodDef, b_types: &[Type]) -> bool {
    let narrower = a_types.iter().zip(b_types).all(|(x, y)| x.is_subtype(*y));
    narrower && (a_types != b_types || (!is_variadic(a) && is_variadic(b)))
}

/// Format argument types the way a method error reports them
pub fn describe_args(args: &[Value]) -> String {
    args.iter().map(|a| format!("::{}", a.type_of())).collect::<Vec<_>>().join(", ")
}

/// Pick the most specific method of `name` applicable to `args`
pub fn select<'m>(name: &str, methods: &'m [Rc<MethodDef>], args: &[Value]) -> EvalResult<&'m Rc<MethodDef>> {
    let candidates: Vec<(&'m Rc<MethodDef>, Vec<Type>)> =
        methods.iter().filter_map(|m| applicable(m, args).map(|types| (m, types))).collect();

    let minimal: Vec<&'m Rc<MethodDef>> = candidates
        .iter()
        .filter(|(m, types)| {
            !candidates
                .iter()
                .any(|(other, other_types)| !Rc::ptr_eq(m, other) && more_specific(other, other_types, m, types))
        })
        .map(|(m, _)| *m)
        .collect();

    match minimal.as_slice() {
        [method] => Ok(*method),
        [] => Err(EvalError::NoMethod { function: name.to_string(), args: describe_args(args) }),
        _ => Err(EvalError::AmbiguousMethod { function: name.to_string(), args: describe_args(args) }),
    }
}
