//! Abstract syntax tree for the Rebugger scripting language
//!
//! Every node carries the byte span it was parsed from, so that the capture
//! core can locate a call by cursor position and recover verbatim source for
//! function bodies.

use std::fmt;
use std::rc::Rc;

//-----------------------------------------------------------------------------
// Spans
//-----------------------------------------------------------------------------

/// Half-open byte range `start..end` into the parsed buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Smallest span covering both `self` and `other`
    pub fn to(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    /// 1-based line range of this span inside `source`
    pub fn lines(&self, source: &str) -> (usize, usize) {
        (line_of(source, self.start), line_of(source, self.end.saturating_sub(1).max(self.start)))
    }
}

/// 1-based line containing byte `offset`
pub fn line_of(source: &str, offset: usize) -> usize {
    let offset = offset.min(source.len());
    source.as_bytes()[..offset].iter().filter(|&&b| b == b'\n').count() + 1
}

//-----------------------------------------------------------------------------
// Expressions
//-----------------------------------------------------------------------------

/// An expression node with its source span
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Build a node that has no source location (synthesized code)
    pub fn synthetic(kind: ExprKind) -> Self {
        Self { kind, span: Span::default() }
    }

    pub fn ident(name: impl Into<String>) -> Self {
        Self::synthetic(ExprKind::Ident(name.into()))
    }

    /// `module.name`
    pub fn qualified(module: impl Into<String>, name: impl Into<String>) -> Self {
        Self::synthetic(ExprKind::Field(Box::new(Self::ident(module)), name.into()))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::synthetic(ExprKind::Str(value.into()))
    }

    pub fn call(func: Expr, args: Vec<Expr>) -> Self {
        Self::synthetic(ExprKind::Call(Call { func: Box::new(func), args, kwargs: Vec::new() }))
    }

    pub fn block(items: Vec<Expr>) -> Self {
        Self::synthetic(ExprKind::Block(items))
    }

    pub fn as_call(&self) -> Option<&Call> {
        match &self.kind {
            ExprKind::Call(call) => Some(call),
            _ => None,
        }
    }
}

/// Expression kinds
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Nothing,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    /// `base.name`: module qualification
    Field(Box<Expr>, String),
    Tuple(Vec<Expr>),
    NamedTuple(Vec<(String, Expr)>),
    Array(Vec<Expr>),
    Index(Box<Expr>, Box<Expr>),
    Range(Box<Expr>, Box<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Call(Call),
    Assign(Box<Expr>, Box<Expr>),
    Block(Vec<Expr>),
    If(Vec<(Expr, Expr)>, Option<Box<Expr>>),
    While(Box<Expr>, Box<Expr>),
    For(String, Box<Expr>, Box<Expr>),
    Let(Vec<(Expr, Expr)>, Box<Expr>),
    Try {
        body: Box<Expr>,
        binding: Option<String>,
        handler: Box<Expr>,
    },
    Return(Option<Box<Expr>>),
    Break,
    Continue,
    Function(Rc<FunctionDef>),
    Module(String, Vec<Expr>),
    /// `@eval Module expr`
    EvalIn(String, Box<Expr>),
}

/// A call `func(args...; kwargs...)`
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub func: Box<Expr>,
    pub args: Vec<Expr>,
    pub kwargs: Vec<(String, Expr)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Pow => "^",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        };
        f.write_str(op)
    }
}

//-----------------------------------------------------------------------------
// Function definitions
//-----------------------------------------------------------------------------

/// `function name(sig) where {...} body end`
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub signature: Signature,
    pub body: Vec<Expr>,
    /// Span of the whole definition, `function` through `end`
    pub span: Span,
    /// Span covering the body statements only
    pub body_span: Span,
}

/// Declared parameter list of a method
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Signature {
    pub params: Vec<Param>,
    pub kwparams: Vec<KwParam>,
    pub type_params: Vec<TypeParam>,
}

/// A positional parameter; `name` is `None` for `::T`
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Option<String>,
    pub annotation: Option<String>,
    pub default: Option<Expr>,
    pub variadic: bool,
}

impl Param {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: Some(name.into()), annotation: None, default: None, variadic: false }
    }
}

/// A keyword parameter; a missing default makes it required
#[derive(Debug, Clone, PartialEq)]
pub struct KwParam {
    pub name: String,
    pub annotation: Option<String>,
    pub default: Option<Expr>,
    pub variadic: bool,
}

/// `T` or `T<:Bound` in a `where` clause
#[derive(Debug, Clone, PartialEq)]
pub struct TypeParam {
    pub name: String,
    pub bound: Option<String>,
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|p| {
                let mut out = p.name.clone().unwrap_or_default();
                if let Some(ann) = &p.annotation {
                    out.push_str("::");
                    out.push_str(ann);
                }
                if p.variadic {
                    out.push_str("...");
                }
                out
            })
            .collect();
        write!(f, "({}", params.join(", "))?;
        if !self.kwparams.is_empty() {
            let kws: Vec<String> = self
                .kwparams
                .iter()
                .map(|k| if k.variadic { format!("{}...", k.name) } else { k.name.clone() })
                .collect();
            write!(f, "; {}", kws.join(", "))?;
        }
        write!(f, ")")?;
        if !self.type_params.is_empty() {
            let tps: Vec<String> = self
                .type_params
                .iter()
                .map(|t| match &t.bound {
                    Some(bound) => format!("{}<:{}", t.name, bound),
                    None => t.name.clone(),
                })
                .collect();
            write!(f, " where {{{}}}", tps.join(", "))?;
        }
        Ok(())
    }
}

//-----------------------------------------------------------------------------
// Traversal
//-----------------------------------------------------------------------------

impl Expr {
    /// Visit this node and every descendant expression in source order.
    /// Function bodies are included; parameter defaults are not.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Expr)) {
        visit(self);
        self.for_each_child(|child| child.walk(visit));
    }

    fn for_each_child<'a>(&'a self, mut f: impl FnMut(&'a Expr)) {
        match &self.kind {
            ExprKind::Field(base, _) => f(base),
            ExprKind::Tuple(items) | ExprKind::Array(items) | ExprKind::Block(items) => items.iter().for_each(f),
            ExprKind::NamedTuple(items) => items.iter().for_each(|(_, e)| f(e)),
            ExprKind::Index(base, index) => {
                f(base);
                f(index);
            }
            ExprKind::Range(lo, hi) | ExprKind::Binary(_, lo, hi) | ExprKind::Assign(lo, hi) | ExprKind::While(lo, hi) => {
                f(lo);
                f(hi);
            }
            ExprKind::Unary(_, inner) | ExprKind::EvalIn(_, inner) => f(inner),
            ExprKind::Call(call) => {
                f(&call.func);
                call.args.iter().for_each(&mut f);
                call.kwargs.iter().for_each(|(_, e)| f(e));
            }
            ExprKind::If(branches, otherwise) => {
                for (cond, body) in branches {
                    f(cond);
                    f(body);
                }
                if let Some(otherwise) = otherwise {
                    f(otherwise);
                }
            }
            ExprKind::For(_, iter, body) => {
                f(iter);
                f(body);
            }
            ExprKind::Let(bindings, body) => {
                for (pattern, value) in bindings {
                    f(pattern);
                    f(value);
                }
                f(body);
            }
            ExprKind::Try { body, handler, .. } => {
                f(body);
                f(handler);
            }
            ExprKind::Return(Some(value)) => f(value),
            ExprKind::Function(def) => def.body.iter().for_each(f),
            ExprKind::Module(_, items) => items.iter().for_each(f),
            _ => {}
        }
    }

    /// Rebuild this tree, replacing the first node for which `select` returns
    /// a replacement. Returns `None` when nothing was replaced.
    pub fn replace_first(&self, select: &mut dyn FnMut(&Expr) -> Option<Expr>) -> Option<Expr> {
        if let Some(replacement) = select(self) {
            return Some(replacement);
        }
        let rebuild = |kind: ExprKind| Some(Expr::new(kind, self.span));
        match &self.kind {
            ExprKind::Field(base, name) => {
                base.replace_first(select).and_then(|b| rebuild(ExprKind::Field(Box::new(b), name.clone())))
            }
            ExprKind::Tuple(items) => replace_in(items, select).and_then(|v| rebuild(ExprKind::Tuple(v))),
            ExprKind::Array(items) => replace_in(items, select).and_then(|v| rebuild(ExprKind::Array(v))),
            ExprKind::Block(items) => replace_in(items, select).and_then(|v| rebuild(ExprKind::Block(v))),
            ExprKind::NamedTuple(items) => {
                for (i, (_, value)) in items.iter().enumerate() {
                    if let Some(new) = value.replace_first(select) {
                        let mut items = items.clone();
                        items[i].1 = new;
                        return rebuild(ExprKind::NamedTuple(items));
                    }
                }
                None
            }
            ExprKind::Index(base, index) => replace_pair(base, index, select)
                .and_then(|(b, i)| rebuild(ExprKind::Index(Box::new(b), Box::new(i)))),
            ExprKind::Range(lo, hi) => {
                replace_pair(lo, hi, select).and_then(|(a, b)| rebuild(ExprKind::Range(Box::new(a), Box::new(b))))
            }
            ExprKind::Binary(op, lo, hi) => replace_pair(lo, hi, select)
                .and_then(|(a, b)| rebuild(ExprKind::Binary(*op, Box::new(a), Box::new(b)))),
            ExprKind::Assign(lo, hi) => {
                replace_pair(lo, hi, select).and_then(|(a, b)| rebuild(ExprKind::Assign(Box::new(a), Box::new(b))))
            }
            ExprKind::While(lo, hi) => {
                replace_pair(lo, hi, select).and_then(|(a, b)| rebuild(ExprKind::While(Box::new(a), Box::new(b))))
            }
            ExprKind::Unary(op, inner) => {
                inner.replace_first(select).and_then(|e| rebuild(ExprKind::Unary(*op, Box::new(e))))
            }
            ExprKind::EvalIn(module, inner) => {
                inner.replace_first(select).and_then(|e| rebuild(ExprKind::EvalIn(module.clone(), Box::new(e))))
            }
            ExprKind::Call(call) => {
                if let Some(func) = call.func.replace_first(select) {
                    let mut call = call.clone();
                    call.func = Box::new(func);
                    return rebuild(ExprKind::Call(call));
                }
                if let Some(args) = replace_in(&call.args, select) {
                    let mut call = call.clone();
                    call.args = args;
                    return rebuild(ExprKind::Call(call));
                }
                for (i, (_, value)) in call.kwargs.iter().enumerate() {
                    if let Some(new) = value.replace_first(select) {
                        let mut call = call.clone();
                        call.kwargs[i].1 = new;
                        return rebuild(ExprKind::Call(call));
                    }
                }
                None
            }
            ExprKind::If(branches, otherwise) => {
                for (i, (cond, body)) in branches.iter().enumerate() {
                    if let Some((c, b)) = replace_pair(cond, body, select) {
                        let mut branches = branches.clone();
                        branches[i] = (c, b);
                        return rebuild(ExprKind::If(branches, otherwise.clone()));
                    }
                }
                otherwise
                    .as_ref()
                    .and_then(|o| o.replace_first(select))
                    .and_then(|o| rebuild(ExprKind::If(branches.clone(), Some(Box::new(o)))))
            }
            ExprKind::For(var, iter, body) => replace_pair(iter, body, select)
                .and_then(|(i, b)| rebuild(ExprKind::For(var.clone(), Box::new(i), Box::new(b)))),
            ExprKind::Let(bindings, body) => {
                for (i, (pattern, value)) in bindings.iter().enumerate() {
                    if let Some(new) = value.replace_first(select) {
                        let mut bindings = bindings.clone();
                        bindings[i] = (pattern.clone(), new);
                        return rebuild(ExprKind::Let(bindings, body.clone()));
                    }
                }
                body.replace_first(select).and_then(|b| rebuild(ExprKind::Let(bindings.clone(), Box::new(b))))
            }
            ExprKind::Try { body, binding, handler } => replace_pair(body, handler, select).and_then(|(b, h)| {
                rebuild(ExprKind::Try { body: Box::new(b), binding: binding.clone(), handler: Box::new(h) })
            }),
            ExprKind::Return(Some(value)) => {
                value.replace_first(select).and_then(|v| rebuild(ExprKind::Return(Some(Box::new(v)))))
            }
            ExprKind::Function(def) => replace_in(&def.body, select).and_then(|body| {
                let mut def = (**def).clone();
                def.body = body;
                rebuild(ExprKind::Function(Rc::new(def)))
            }),
            ExprKind::Module(name, items) => {
                replace_in(items, select).and_then(|v| rebuild(ExprKind::Module(name.clone(), v)))
            }
            _ => None,
        }
    }
}

fn replace_in(items: &[Expr], select: &mut dyn FnMut(&Expr) -> Option<Expr>) -> Option<Vec<Expr>> {
    for (i, item) in items.iter().enumerate() {
        if let Some(new) = item.replace_first(select) {
            let mut items = items.to_vec();
            items[i] = new;
            return Some(items);
        }
    }
    None
}

fn replace_pair(a: &Expr, b: &Expr, select: &mut dyn FnMut(&Expr) -> Option<Expr>) -> Option<(Expr, Expr)> {
    if let Some(new) = a.replace_first(select) {
        return Some((new, b.clone()));
    }
    b.replace_first(select).map(|new| (a.clone(), new))
}
