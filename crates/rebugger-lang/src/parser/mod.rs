//! Source text to syntax tree
//!
//! Parsing is split into the [`lexer`], which produces positioned tokens, and
//! the [`builder`], which assembles span-carrying expressions from them.

pub mod builder;
pub mod lexer;

pub use builder::{is_keyword, AstBuilder};
pub use lexer::{tokenize, Lexer, PositionedToken, Token};

use crate::ast::Expr;
use crate::error::ParseResult;

/// Parse a whole buffer into its top-level expressions
pub fn parse_program(input: &str) -> ParseResult<Vec<Expr>> {
    let tokens = tokenize(input)?;
    AstBuilder::new(&tokens).parse_program()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryOp, ExprKind};

    fn parse_one(input: &str) -> Expr {
        let mut items = parse_program(input).unwrap();
        assert_eq!(items.len(), 1, "expected one expression in {:?}", input);
        items.remove(0)
    }

    #[test]
    fn test_precedence() {
        let expr = parse_one("1 + 2 * 3");
        match expr.kind {
            ExprKind::Binary(BinaryOp::Add, _, rhs) => {
                assert!(matches!(rhs.kind, ExprKind::Binary(BinaryOp::Mul, _, _)));
            }
            other => panic!("unexpected {:?}", other),
        }

        let expr = parse_one("-2^2");
        assert!(matches!(expr.kind, ExprKind::Unary(_, _)));
    }

    #[test]
    fn test_call_with_keywords() {
        let expr = parse_one("f(1, x; scale=2)");
        let call = expr.as_call().unwrap();
        assert_eq!(call.args.len(), 2);
        assert_eq!(call.kwargs.len(), 1);
        assert_eq!(call.kwargs[0].0, "scale");

        let expr = parse_one("g(1, scale=2)");
        let call = expr.as_call().unwrap();
        assert_eq!(call.args.len(), 1);
        assert_eq!(call.kwargs[0].0, "scale");
    }

    #[test]
    fn test_call_span_covers_arguments() {
        let src = "result = add(2, 3)";
        let expr = parse_one(src);
        let ExprKind::Assign(_, rhs) = expr.kind else { panic!("expected assignment") };
        assert_eq!(&src[rhs.span.start..rhs.span.end], "add(2, 3)");
        let call = rhs.as_call().unwrap();
        assert_eq!(call.func.span.start, 9);
    }

    #[test]
    fn test_function_definition() {
        let src = "function f(x::Int, ::Float64, rest...; k=1) where {T<:Real}\n    y = x + 1\n    y * 2\nend";
        let expr = parse_one(src);
        let ExprKind::Function(def) = expr.kind else { panic!("expected function") };
        assert_eq!(def.name, "f");
        let sig = &def.signature;
        assert_eq!(sig.params.len(), 3);
        assert_eq!(sig.params[0].annotation.as_deref(), Some("Int"));
        assert!(sig.params[1].name.is_none());
        assert!(sig.params[2].variadic);
        assert_eq!(sig.kwparams[0].name, "k");
        assert_eq!(sig.type_params[0].bound.as_deref(), Some("Real"));
        assert_eq!(def.body.len(), 2);
        assert_eq!(&src[def.body_span.start..def.body_span.end], "y = x + 1\n    y * 2");
    }

    #[test]
    fn test_multiline_arguments() {
        let expr = parse_one("f(1,\n  2,\n  3)");
        assert_eq!(expr.as_call().unwrap().args.len(), 3);
    }

    #[test]
    fn test_control_flow_forms() {
        let src = "if x > 1\n  a\nelseif x < 0\n  b\nelse\n  c\nend";
        let ExprKind::If(branches, otherwise) = parse_one(src).kind else { panic!("expected if") };
        assert_eq!(branches.len(), 2);
        assert!(otherwise.is_some());

        let src = "try\n  error(\"boom\")\ncatch err\n  err\nend";
        let ExprKind::Try { binding, .. } = parse_one(src).kind else { panic!("expected try") };
        assert_eq!(binding.as_deref(), Some("err"));

        let src = "let (x, y) = (1, 2)\n  x + y\nend";
        let ExprKind::Let(bindings, _) = parse_one(src).kind else { panic!("expected let") };
        assert!(matches!(bindings[0].0.kind, ExprKind::Tuple(ref names) if names.len() == 2));
    }

    #[test]
    fn test_eval_macro_and_modules() {
        let expr = parse_one("@eval Main let (x,) = (1,)\n  x\nend");
        let ExprKind::EvalIn(module, body) = expr.kind else { panic!("expected @eval") };
        assert_eq!(module, "Main");
        assert!(matches!(body.kind, ExprKind::Let(..)));

        let expr = parse_one("module Geometry\nfunction f(x)\n  x\nend\nend");
        assert!(matches!(expr.kind, ExprKind::Module(ref name, _) if name == "Geometry"));
    }

    #[test]
    fn test_qualified_names() {
        let expr = parse_one("Base.length(xs)");
        let call = expr.as_call().unwrap();
        assert!(matches!(call.func.kind, ExprKind::Field(_, ref name) if name == "length"));
    }

    #[test]
    fn test_tuples_and_named_tuples() {
        assert!(matches!(parse_one("()").kind, ExprKind::Tuple(ref items) if items.is_empty()));
        assert!(matches!(parse_one("(1,)").kind, ExprKind::Tuple(ref items) if items.len() == 1));
        match parse_one("(k = 3, s = \"a\")").kind {
            ExprKind::NamedTuple(fields) => {
                assert_eq!(fields[0].0, "k");
                assert_eq!(fields[1].0, "s");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(parse_one("(x = 1)").kind, ExprKind::Assign(..)));
        assert!(parse_program("(k = 1, 2)").is_err());
    }

    #[test]
    fn test_errors_carry_locations() {
        let err = parse_program("x = (1, 2").unwrap_err();
        assert!(matches!(err, crate::error::ParseError::UnexpectedEof { .. }));

        let err = parse_program("function f(x)\n  x +\n").unwrap_err();
        assert!(err.location().line >= 2);

        assert!(parse_program("1 = 2").is_err());
        assert!(parse_program("f(x) y").is_err());
    }
}
