//! Signature analysis: canonical parameter names for a method
//!
//! Anonymous parameters such as `::Float64` cannot be referred to by an
//! instrumented body, so the analyzer names them `__Float64_1`,
//! `__Float64_2`, ... and rewrites the definition to bind those names.

use std::collections::{HashMap, HashSet};

use rebugger_lang::FunctionDef;

use crate::error::SignatureError;

/// Parameter names of a method in declaration order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SignatureNames {
    pub name: String,
    pub positional: Vec<String>,
    pub keyword: Vec<String>,
    pub type_params: Vec<String>,
}

impl SignatureNames {
    /// All names in snapshot order: positional, keyword, type parameters
    pub fn ordered(&self) -> Vec<String> {
        self.positional.iter().chain(&self.keyword).chain(&self.type_params).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.positional.len() + self.keyword.len() + self.type_params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Analyze `def`, naming its anonymous parameters in place
pub fn analyze(def: &mut FunctionDef) -> Result<SignatureNames, SignatureError> {
    let function = def.name.clone();
    let sig = &mut def.signature;

    let mut taken: HashSet<String> = sig.params.iter().filter_map(|p| p.name.clone()).collect();
    taken.extend(sig.kwparams.iter().map(|k| k.name.clone()));
    taken.extend(sig.type_params.iter().map(|t| t.name.clone()));

    let mut counters: HashMap<String, usize> = HashMap::new();
    for param in sig.params.iter_mut().filter(|p| p.name.is_none()) {
        let ty = param.annotation.clone().unwrap_or_else(|| "Any".to_string());
        let counter = counters.entry(ty.clone()).or_insert(0);
        let name = loop {
            *counter += 1;
            let candidate = format!("__{}_{}", ty, counter);
            if !taken.contains(&candidate) {
                break candidate;
            }
        };
        taken.insert(name.clone());
        param.name = Some(name);
    }

    let mut seen = HashSet::new();
    let mut check_unique = |name: &str| {
        if seen.insert(name.to_string()) {
            Ok(())
        } else {
            Err(SignatureError::DuplicateName { function: function.clone(), name: name.to_string() })
        }
    };

    let mut positional = Vec::with_capacity(sig.params.len());
    let mut optional_seen = false;
    for (i, param) in sig.params.iter().enumerate() {
        let name = param.name.clone().unwrap_or_default();
        check_unique(&name)?;
        if param.variadic && i + 1 != sig.params.len() {
            return Err(SignatureError::VariadicNotLast { function: function.clone(), name });
        }
        if param.default.is_some() {
            optional_seen = true;
        } else if optional_seen && !param.variadic {
            return Err(SignatureError::RequiredAfterOptional { function: function.clone(), name });
        }
        positional.push(name);
    }

    let mut keyword = Vec::with_capacity(sig.kwparams.len());
    for (i, kw) in sig.kwparams.iter().enumerate() {
        check_unique(&kw.name)?;
        if kw.variadic && i + 1 != sig.kwparams.len() {
            return Err(SignatureError::VariadicNotLast { function: function.clone(), name: kw.name.clone() });
        }
        keyword.push(kw.name.clone());
    }

    let mut type_params = Vec::with_capacity(sig.type_params.len());
    for tp in &sig.type_params {
        check_unique(&tp.name)?;
        type_params.push(tp.name.clone());
    }

    Ok(SignatureNames { name: function, positional, keyword, type_params })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rebugger_lang::{parse_program, ExprKind};

    fn def(src: &str) -> FunctionDef {
        match parse_program(src).unwrap().remove(0).kind {
            ExprKind::Function(def) => (*def).clone(),
            other => panic!("expected function, got {:?}", other),
        }
    }

    #[test]
    fn test_named_parameters_in_declaration_order() {
        let mut f = def("function f(x, y=2, rest...; scale, opts...) where {T, S<:Real}\n    x\nend");
        let names = analyze(&mut f).unwrap();
        assert_eq!(names.name, "f");
        assert_eq!(names.positional, vec!["x", "y", "rest"]);
        assert_eq!(names.keyword, vec!["scale", "opts"]);
        assert_eq!(names.type_params, vec!["T", "S"]);
        assert_eq!(names.ordered(), vec!["x", "y", "rest", "scale", "opts", "T", "S"]);
        assert_eq!(names.len(), 7);
    }

    #[test]
    fn test_anonymous_parameters_are_named_by_type() {
        let mut f = def("function f(::Float64, x, ::Float64, ::Int)\n    x\nend");
        let names = analyze(&mut f).unwrap();
        assert_eq!(names.positional, vec!["__Float64_1", "x", "__Float64_2", "__Int_1"]);
        // The definition itself now binds the synthesized names
        assert_eq!(f.signature.params[0].name.as_deref(), Some("__Float64_1"));
        assert_eq!(f.signature.params[2].name.as_deref(), Some("__Float64_2"));
    }

    #[test]
    fn test_synthesized_names_avoid_collisions() {
        let mut f = def("function f(__Any_1, ::Any)\n    1\nend");
        let names = analyze(&mut f).unwrap();
        assert_eq!(names.positional, vec!["__Any_1", "__Any_2"]);

        let mut g = def("function g(x, ::Any)\n    1\nend");
        assert_eq!(analyze(&mut g).unwrap().positional, vec!["x", "__Any_1"]);
    }

    #[test]
    fn test_structural_errors() {
        let mut dup = def("function f(x; x=1)\n    x\nend");
        assert!(matches!(analyze(&mut dup), Err(SignatureError::DuplicateName { .. })));

        let mut vararg = def("function f(xs..., y)\n    y\nend");
        assert!(matches!(analyze(&mut vararg), Err(SignatureError::VariadicNotLast { .. })));

        let mut order = def("function f(x=1, y)\n    y\nend");
        assert!(matches!(analyze(&mut order), Err(SignatureError::RequiredAfterOptional { .. })));
    }
}
