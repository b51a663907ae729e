//! Default instrumentation by body rewriting
//!
//! The instrumented body starts with
//! `Rebugger.store(<method id>, ("x", "y", ...), (x, y, ...))`
//! followed by `Rebugger.stop()` in shadow mode or by the original body in
//! overwrite mode.

use rebugger_lang::{Expr, ExprKind, FunctionDef, MethodId};
use tracing::debug;

use crate::capability::{Instrument, InstrumentMode};
use crate::error::{CaptureError, CaptureResult};
use crate::signature::SignatureNames;

/// Rewrites bodies to call the store natives of `store_module`
#[derive(Debug, Clone)]
pub struct BodyInstrumenter {
    store_module: String,
}

impl BodyInstrumenter {
    pub fn new(store_module: impl Into<String>) -> Self {
        Self { store_module: store_module.into() }
    }

    fn native(&self, name: &str, args: Vec<Expr>) -> Expr {
        Expr::call(Expr::qualified(self.store_module.clone(), name), args)
    }
}

impl Instrument for BodyInstrumenter {
    fn instrument(
        &self,
        def: &FunctionDef,
        names: &SignatureNames,
        method: MethodId,
        mode: InstrumentMode,
    ) -> CaptureResult<FunctionDef> {
        let failure = |reason: String| CaptureError::Instrumentation { method: def.name.clone(), reason };
        if let Some(pos) = def.signature.params.iter().position(|p| p.name.is_none()) {
            return Err(failure(format!("parameter {} has no name", pos + 1)));
        }
        let declared = def.signature.params.len() + def.signature.kwparams.len() + def.signature.type_params.len();
        if declared != names.len() {
            return Err(failure(format!("expected {} parameter names, found {}", declared, names.len())));
        }
        let id = i64::try_from(method.0).map_err(|_| failure(format!("method id {} out of range", method)))?;

        let ordered = names.ordered();
        let store = self.native(
            "store",
            vec![
                Expr::synthetic(ExprKind::Int(id)),
                Expr::synthetic(ExprKind::Tuple(ordered.iter().map(Expr::string).collect())),
                Expr::synthetic(ExprKind::Tuple(ordered.iter().map(Expr::ident).collect())),
            ],
        );

        let mut body = Vec::with_capacity(def.body.len() + 2);
        body.push(store);
        match mode {
            InstrumentMode::Shadow => body.push(self.native("stop", Vec::new())),
            InstrumentMode::Overwrite => body.extend(def.body.iter().cloned()),
        }
        debug!(function = %def.name, method = %method, ?mode, params = ordered.len(), "instrumented definition");

        Ok(FunctionDef { body, ..def.clone() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::analyze;
    use rebugger_lang::parse_program;

    fn def(src: &str) -> FunctionDef {
        match parse_program(src).unwrap().remove(0).kind {
            ExprKind::Function(def) => (*def).clone(),
            other => panic!("expected function, got {:?}", other),
        }
    }

    fn store_call(def: &FunctionDef) -> &rebugger_lang::Call {
        def.body[0].as_call().unwrap()
    }

    #[test]
    fn test_shadow_body() {
        let mut f = def("function add(x, y)\n    x + y\nend");
        let names = analyze(&mut f).unwrap();
        let out = BodyInstrumenter::new("Rebugger").instrument(&f, &names, MethodId(3), InstrumentMode::Shadow).unwrap();
        assert_eq!(out.body.len(), 2);
        let store = store_call(&out);
        assert_eq!(store.args[0].kind, ExprKind::Int(3));
        assert!(matches!(&store.args[1].kind, ExprKind::Tuple(items) if items.len() == 2));
        let stop = out.body[1].as_call().unwrap();
        assert!(matches!(&stop.func.kind, ExprKind::Field(_, name) if name == "stop"));
        // Signature and spans are untouched
        assert_eq!(out.signature, f.signature);
        assert_eq!(out.body_span, f.body_span);
    }

    #[test]
    fn test_overwrite_keeps_original_body() {
        let mut f = def("function g(x; k=1) where {T}\n    y = x\n    y + k\nend");
        let names = analyze(&mut f).unwrap();
        let out = BodyInstrumenter::new("Rebugger").instrument(&f, &names, MethodId(1), InstrumentMode::Overwrite).unwrap();
        assert_eq!(out.body.len(), 3);
        assert_eq!(out.body[1..], f.body[..]);
        assert!(matches!(&store_call(&out).args[2].kind, ExprKind::Tuple(items) if items.len() == 3));
    }

    #[test]
    fn test_unanalyzed_definition_is_rejected() {
        let f = def("function h(::Int)\n    1\nend");
        let names = SignatureNames { name: "h".into(), positional: vec!["__Int_1".into()], ..Default::default() };
        let err = BodyInstrumenter::new("Rebugger").instrument(&f, &names, MethodId(1), InstrumentMode::Shadow).unwrap_err();
        assert!(matches!(err, CaptureError::Instrumentation { .. }));
    }
}
