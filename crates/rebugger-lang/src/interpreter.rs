//! Tree-walking interpreter
//!
//! The interpreter owns every module, the method table and the call stack.
//! Evaluation of host requests returns `Result<Value, Signal>`; inside the
//! evaluator the control-flow forms `return`, `break` and `continue` travel
//! alongside signals as [`Flow`].

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::{debug, trace};

use crate::ast::{BinaryOp, Expr, ExprKind, FunctionDef, UnaryOp};
use crate::builtins;
use crate::dispatch;
use crate::error::{EvalError, LangError, LangResult, RuntimeError, Signal, TraceFrame};
use crate::module::{MethodDef, MethodId, Module, Origin};
use crate::parser::parse_program;
use crate::value::{FunctionRef, Native, Value};

/// Module holding the built-in natives
pub const BASE: &str = "Base";
/// Module where includes and interactive input are evaluated
pub const MAIN: &str = "Main";
/// Default limit on nested method invocations
pub const DEFAULT_MAX_DEPTH: usize = 200;

/// An active method invocation
#[derive(Debug, Clone)]
pub struct Frame {
    pub method: Rc<MethodDef>,
    /// 1 for the outermost invocation
    pub depth: usize,
}

/// Non-local exits inside the evaluator
enum Flow {
    Signal(Signal),
    Return(Value),
    Break,
    Continue,
}

impl From<Signal> for Flow {
    fn from(signal: Signal) -> Self {
        Flow::Signal(signal)
    }
}

impl From<EvalError> for Flow {
    fn from(error: EvalError) -> Self {
        Flow::Signal(Signal::error(error))
    }
}

impl Flow {
    /// Collapse at a boundary where only values and signals may escape
    fn into_signal(self) -> Result<Value, Signal> {
        match self {
            Flow::Signal(signal) => Err(signal),
            Flow::Return(value) => Ok(value),
            Flow::Break | Flow::Continue => {
                Err(Signal::error(EvalError::Runtime("break or continue outside of a loop".to_string())))
            }
        }
    }
}

type Eval<T> = Result<T, Flow>;

/// Evaluation context: the current module plus the local scope chain
#[derive(Debug, Clone)]
pub struct EvalContext {
    module: String,
    scopes: Vec<HashMap<String, Value>>,
    in_function: bool,
}

impl EvalContext {
    /// Top-level context of `module`: assignments create globals
    pub fn top_level(module: impl Into<String>) -> Self {
        Self { module: module.into(), scopes: Vec::new(), in_function: false }
    }

    fn function(module: impl Into<String>) -> Self {
        Self { module: module.into(), scopes: vec![HashMap::new()], in_function: true }
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    fn local(&self, name: &str) -> Option<&Value> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    fn bind_local(&mut self, name: impl Into<String>, value: Value) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.into(), value);
        }
    }
}

/// Main interpreter
pub struct Interpreter {
    modules: HashMap<String, Module>,
    /// Where each method lives, for lookup by id
    method_index: HashMap<MethodId, (String, String)>,
    next_method: usize,
    stack: Vec<Frame>,
    max_depth: usize,
    /// Origin stamped on methods defined by the current request
    origin: Origin,
    output: Option<Rc<RefCell<String>>>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Create an interpreter with `Base` and `Main` modules
    pub fn new() -> Self {
        let mut interp = Self {
            modules: HashMap::new(),
            method_index: HashMap::new(),
            next_method: 1,
            stack: Vec::new(),
            max_depth: DEFAULT_MAX_DEPTH,
            origin: Origin::Repl,
            output: None,
        };
        interp.ensure_module(BASE);
        interp.ensure_module(MAIN);
        builtins::install(&mut interp);
        interp
    }

    pub fn set_max_depth(&mut self, depth: usize) {
        self.max_depth = depth.max(1);
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Redirect `print`/`println` into a buffer and return it
    pub fn capture_output(&mut self) -> Rc<RefCell<String>> {
        let buffer = Rc::new(RefCell::new(String::new()));
        self.output = Some(buffer.clone());
        buffer
    }

    pub(crate) fn write_output(&mut self, text: &str) {
        match &self.output {
            Some(buffer) => buffer.borrow_mut().push_str(text),
            None => print!("{}", text),
        }
    }

    //-------------------------------------------------------------------------
    // Loading and evaluating source
    //-------------------------------------------------------------------------

    /// Load a file into `Main`; its methods become trackable
    pub fn include(&mut self, path: impl AsRef<Path>) -> LangResult<Value> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| LangError::Io { path: path.display().to_string(), message: e.to_string() })?;
        self.include_str(path, &source)
    }

    /// Load `source` as if it had been read from `path`
    pub fn include_str(&mut self, path: impl Into<PathBuf>, source: &str) -> LangResult<Value> {
        let path = path.into();
        debug!(path = %path.display(), "including source");
        let exprs = parse_program(source)?;
        let origin = Origin::File { path, source: Rc::from(source) };
        Ok(self.eval_exprs(MAIN, &exprs, origin)?)
    }

    /// Evaluate interactive input in `Main`
    pub fn eval_str(&mut self, source: &str) -> LangResult<Value> {
        self.eval_in(MAIN, source)
    }

    /// Evaluate interactive input in `module`
    pub fn eval_in(&mut self, module: &str, source: &str) -> LangResult<Value> {
        let exprs = parse_program(source)?;
        Ok(self.eval_exprs(module, &exprs, Origin::Repl)?)
    }

    /// Evaluate already-parsed top-level expressions in `module`
    pub fn eval_exprs(&mut self, module: &str, exprs: &[Expr], origin: Origin) -> Result<Value, Signal> {
        if !self.has_module(module) {
            return Err(Signal::error(EvalError::UnknownModule(module.to_string())));
        }
        let saved = std::mem::replace(&mut self.origin, origin);
        let mut context = EvalContext::top_level(module);
        let result = self.eval_block(exprs, &mut context).or_else(Flow::into_signal);
        self.origin = saved;
        result
    }

    //-------------------------------------------------------------------------
    // Modules and methods
    //-------------------------------------------------------------------------

    pub fn has_module(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    pub fn ensure_module(&mut self, name: &str) {
        self.modules.entry(name.to_string()).or_insert_with(|| Module::new(name));
    }

    /// Add a method to `module`, replacing any method with the same
    /// positional signature while keeping its id
    pub fn define_method(
        &mut self,
        module: &str,
        def: Rc<FunctionDef>,
        origin: Origin,
    ) -> Result<Rc<MethodDef>, EvalError> {
        dispatch::signature_types(&def)?;
        self.ensure_module(module);
        let next_id = MethodId(self.next_method);
        let target = self.modules.get_mut(module).ok_or_else(|| EvalError::UnknownModule(module.to_string()))?;
        let methods = target.functions.entry(def.name.clone()).or_default();

        let existing = methods.iter().position(|m| dispatch::same_signature(&m.def, &def));
        let method = match existing {
            Some(pos) => {
                let method = Rc::new(MethodDef { origin, ..methods[pos].with_def(def) });
                methods[pos] = method.clone();
                method
            }
            None => {
                self.next_method += 1;
                let method = Rc::new(MethodDef {
                    id: next_id,
                    module: module.to_string(),
                    name: def.name.clone(),
                    def,
                    origin,
                });
                methods.push(method.clone());
                method
            }
        };
        self.method_index.insert(method.id, (method.module.clone(), method.name.clone()));
        trace!(method = %method.id, name = %method.name, module, "defined method");
        Ok(method)
    }

    /// Remove a generic function and all of its methods
    pub fn remove_function(&mut self, module: &str, name: &str) -> bool {
        let removed = self.modules.get_mut(module).and_then(|m| m.functions.remove(name));
        match removed {
            Some(methods) => {
                for method in methods {
                    self.method_index.remove(&method.id);
                }
                true
            }
            None => false,
        }
    }

    pub fn method(&self, id: MethodId) -> Option<Rc<MethodDef>> {
        let (module, name) = self.method_index.get(&id)?;
        self.modules.get(module)?.methods(name).iter().find(|m| m.id == id).cloned()
    }

    pub fn methods_of(&self, module: &str, name: &str) -> Vec<Rc<MethodDef>> {
        self.modules.get(module).map(|m| m.methods(name).to_vec()).unwrap_or_default()
    }

    /// Swap in a method with the same id, returning the one it displaced
    pub fn replace_method(&mut self, method: Rc<MethodDef>) -> Option<Rc<MethodDef>> {
        let (module, name) = self.method_index.get(&method.id)?.clone();
        let methods = self.modules.get_mut(&module)?.functions.get_mut(&name)?;
        let slot = methods.iter_mut().find(|m| m.id == method.id)?;
        Some(std::mem::replace(slot, method))
    }

    /// The method a call of `func` with these positional arguments would run
    pub fn which(&self, func: &Value, args: &[Value]) -> Result<Rc<MethodDef>, EvalError> {
        match func {
            Value::Function(r) => {
                let module = self.modules.get(&r.module).ok_or_else(|| EvalError::UnknownModule(r.module.clone()))?;
                dispatch::select(&r.name, module.methods(&r.name), args).cloned()
            }
            other => Err(EvalError::TypeMismatch { expected: "Function".to_string(), found: other.type_of().to_string() }),
        }
    }

    /// Bind a host function as a global of `module`
    pub fn register_native(
        &mut self,
        module: &str,
        name: &str,
        func: impl Fn(&mut Interpreter, &[Value], &[(String, Value)]) -> Result<Value, Signal> + 'static,
    ) {
        self.ensure_module(module);
        if let Some(m) = self.modules.get_mut(module) {
            m.globals.insert(name.to_string(), Value::Native(Rc::new(Native::new(name, func))));
        }
    }

    /// Remove a global binding, returning its last value
    pub fn unregister(&mut self, module: &str, name: &str) -> Option<Value> {
        self.modules.get_mut(module)?.globals.remove(name)
    }

    /// Resolve `name` as seen from the top level of `module`
    pub fn lookup(&self, module: &str, name: &str) -> Option<Value> {
        self.lookup_global(module, name)
            .or_else(|| self.lookup_global(BASE, name))
            .or_else(|| self.has_module(name).then(|| Value::Module(name.to_string())))
    }

    fn lookup_global(&self, module: &str, name: &str) -> Option<Value> {
        let m = self.modules.get(module)?;
        if let Some(value) = m.globals.get(name) {
            return Some(value.clone());
        }
        m.functions
            .contains_key(name)
            .then(|| Value::Function(FunctionRef { module: module.to_string(), name: name.to_string() }))
    }

    //-------------------------------------------------------------------------
    // Call stack
    //-------------------------------------------------------------------------

    /// Number of active method invocations
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn current_frame(&self) -> Option<&Frame> {
        self.stack.last()
    }

    /// Snapshot of the call stack, innermost first
    pub fn backtrace(&self) -> Vec<TraceFrame> {
        self.stack
            .iter()
            .rev()
            .map(|f| TraceFrame {
                method: f.method.id,
                function: f.method.name.clone(),
                module: f.method.module.clone(),
                depth: f.depth,
            })
            .collect()
    }

    //-------------------------------------------------------------------------
    // Calls
    //-------------------------------------------------------------------------

    /// Call any callable value
    pub fn call_value(&mut self, func: &Value, args: Vec<Value>, kwargs: Vec<(String, Value)>) -> Result<Value, Signal> {
        match func {
            Value::Function(r) => {
                let method = self.which(func, &args).map_err(|e| self.raise(e))?;
                trace!(function = %r.name, method = %method.id, "dispatch");
                self.invoke(method, args, kwargs)
            }
            Value::Native(native) => {
                let native = native.clone();
                (native.func)(self, &args, &kwargs)
            }
            Value::Type(t) => builtins::convert(*t, &args).map_err(|e| self.raise(e)),
            other => Err(self.raise(EvalError::NotCallable(other.type_of().to_string()))),
        }
    }

    /// Call the generic function `module.name`
    pub fn call_function(
        &mut self,
        module: &str,
        name: &str,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Result<Value, Signal> {
        let func = Value::Function(FunctionRef { module: module.to_string(), name: name.to_string() });
        self.call_value(&func, args, kwargs)
    }

    /// Raise `error` with the current stack attached
    fn raise(&self, error: EvalError) -> Signal {
        Signal::Raised(Box::new(RuntimeError::new(error, self.backtrace())))
    }

    fn invoke(&mut self, method: Rc<MethodDef>, args: Vec<Value>, kwargs: Vec<(String, Value)>) -> Result<Value, Signal> {
        if self.stack.len() >= self.max_depth {
            return Err(self.raise(EvalError::StackOverflow(self.max_depth)));
        }
        let depth = self.stack.len() + 1;
        self.stack.push(Frame { method: method.clone(), depth });

        let mut result = self.run_method(&method, args, kwargs);
        if let Err(Signal::Raised(err)) = &mut result {
            if err.trace.is_empty() {
                err.trace = self.backtrace();
            }
        }
        self.stack.pop();
        result
    }

    fn run_method(&mut self, method: &MethodDef, args: Vec<Value>, kwargs: Vec<(String, Value)>) -> Result<Value, Signal> {
        let mut context = EvalContext::function(method.module.clone());
        if let Err(flow) = self.bind_arguments(method, args, kwargs, &mut context) {
            return flow.into_signal();
        }
        self.eval_block(&method.def.body, &mut context).or_else(Flow::into_signal)
    }

    fn bind_arguments(
        &mut self,
        method: &MethodDef,
        args: Vec<Value>,
        mut kwargs: Vec<(String, Value)>,
        context: &mut EvalContext,
    ) -> Eval<()> {
        let def = &method.def;
        let mut args = args.into_iter();
        for param in &def.signature.params {
            let value = if param.variadic {
                Value::Tuple(args.by_ref().collect())
            } else if let Some(arg) = args.next() {
                arg
            } else if let Some(default) = &param.default {
                self.eval(default, context)?
            } else {
                return Err(EvalError::ArityMismatch {
                    function: method.name.clone(),
                    expected: def.signature.params.len().to_string(),
                    found: 0,
                }
                .into());
            };
            if let Some(annotation) = &param.annotation {
                let is_type_param = def.signature.type_params.iter().any(|tp| &tp.name == annotation);
                if is_type_param && context.local(annotation).is_none() {
                    let bound = match (&value, param.variadic) {
                        (Value::Tuple(items), true) => items.first().map(Value::type_of),
                        (v, _) => Some(v.type_of()),
                    };
                    if let Some(t) = bound {
                        context.bind_local(annotation.clone(), Value::Type(t));
                    }
                }
            }
            if let Some(name) = &param.name {
                context.bind_local(name.clone(), value);
            }
        }

        // Type parameters not fixed by any argument fall back to their bound
        for tp in &def.signature.type_params {
            if context.local(&tp.name).is_none() {
                let bound = dispatch::annotation_type(def, Some(&tp.name))?;
                context.bind_local(tp.name.clone(), Value::Type(bound));
            }
        }

        let mut rest = None;
        for kw in &def.signature.kwparams {
            if kw.variadic {
                rest = Some(kw.name.clone());
                continue;
            }
            let value = match kwargs.iter().position(|(k, _)| k == &kw.name) {
                Some(pos) => kwargs.remove(pos).1,
                None => match &kw.default {
                    Some(default) => self.eval(default, context)?,
                    None => return Err(EvalError::MissingKeyword { keyword: kw.name.clone() }.into()),
                },
            };
            let expected = dispatch::annotation_type(def, kw.annotation.as_deref())?;
            if !value.type_of().is_subtype(expected) {
                return Err(EvalError::TypeMismatch {
                    expected: expected.to_string(),
                    found: value.type_of().to_string(),
                }
                .into());
            }
            context.bind_local(kw.name.clone(), value);
        }
        match rest {
            Some(name) => context.bind_local(name, Value::NamedTuple(kwargs)),
            None => {
                if let Some((keyword, _)) = kwargs.into_iter().next() {
                    return Err(EvalError::UnsupportedKeyword { function: method.name.clone(), keyword }.into());
                }
            }
        }
        Ok(())
    }

    //-------------------------------------------------------------------------
    // Expression evaluation
    //-------------------------------------------------------------------------

    fn eval_block(&mut self, exprs: &[Expr], context: &mut EvalContext) -> Eval<Value> {
        let mut last = Value::Nothing;
        for expr in exprs {
            last = self.eval(expr, context)?;
        }
        Ok(last)
    }

    /// Run `f` inside a fresh local scope
    fn scoped<T>(
        &mut self,
        context: &mut EvalContext,
        scope: HashMap<String, Value>,
        f: impl FnOnce(&mut Self, &mut EvalContext) -> Eval<T>,
    ) -> Eval<T> {
        context.scopes.push(scope);
        let result = f(self, context);
        context.scopes.pop();
        result
    }

    fn eval(&mut self, expr: &Expr, context: &mut EvalContext) -> Eval<Value> {
        match &expr.kind {
            ExprKind::Nothing => Ok(Value::Nothing),
            ExprKind::Bool(b) => Ok(Value::Bool(*b)),
            ExprKind::Int(n) => Ok(Value::Int(*n)),
            ExprKind::Float(x) => Ok(Value::Float(*x)),
            ExprKind::Str(s) => Ok(Value::str(s)),
            ExprKind::Ident(name) => self.eval_ident(name, context),
            ExprKind::Field(base, name) => {
                let base = self.eval(base, context)?;
                self.eval_field(base, name)
            }
            ExprKind::Tuple(items) => Ok(Value::Tuple(self.eval_all(items, context)?)),
            ExprKind::NamedTuple(fields) => {
                let mut values = Vec::with_capacity(fields.len());
                for (name, value) in fields {
                    values.push((name.clone(), self.eval(value, context)?));
                }
                Ok(Value::NamedTuple(values))
            }
            ExprKind::Array(items) => Ok(Value::array(self.eval_all(items, context)?)),
            ExprKind::Index(base, index) => {
                let base = self.eval(base, context)?;
                let index = self.eval(index, context)?;
                Ok(index_value(&base, &index)?)
            }
            ExprKind::Range(lo, hi) => {
                let lo = self.eval(lo, context)?;
                let hi = self.eval(hi, context)?;
                match (lo, hi) {
                    (Value::Int(lo), Value::Int(hi)) => Ok(Value::Range(lo, hi)),
                    (lo, hi) => Err(EvalError::NoMethod {
                        function: ":".to_string(),
                        args: dispatch::describe_args(&[lo, hi]),
                    }
                    .into()),
                }
            }
            ExprKind::Unary(op, operand) => {
                let value = self.eval(operand, context)?;
                Ok(unary_op(*op, value)?)
            }
            ExprKind::Binary(BinaryOp::And, lhs, rhs) => {
                if as_bool(&self.eval(lhs, context)?)? {
                    Ok(Value::Bool(as_bool(&self.eval(rhs, context)?)?))
                } else {
                    Ok(Value::Bool(false))
                }
            }
            ExprKind::Binary(BinaryOp::Or, lhs, rhs) => {
                if as_bool(&self.eval(lhs, context)?)? {
                    Ok(Value::Bool(true))
                } else {
                    Ok(Value::Bool(as_bool(&self.eval(rhs, context)?)?))
                }
            }
            ExprKind::Binary(op, lhs, rhs) => {
                let lhs = self.eval(lhs, context)?;
                let rhs = self.eval(rhs, context)?;
                Ok(binary_op(*op, lhs, rhs)?)
            }
            ExprKind::Call(call) => {
                let func = self.eval(&call.func, context)?;
                let args = self.eval_all(&call.args, context)?;
                let mut kwargs = Vec::with_capacity(call.kwargs.len());
                for (name, value) in &call.kwargs {
                    kwargs.push((name.clone(), self.eval(value, context)?));
                }
                Ok(self.call_value(&func, args, kwargs)?)
            }
            ExprKind::Assign(target, value) => {
                let value = self.eval(value, context)?;
                self.assign(target, value.clone(), context)?;
                Ok(value)
            }
            ExprKind::Block(items) => self.eval_block(items, context),
            ExprKind::If(branches, otherwise) => {
                for (cond, body) in branches {
                    if as_bool(&self.eval(cond, context)?)? {
                        return self.eval(body, context);
                    }
                }
                match otherwise {
                    Some(body) => self.eval(body, context),
                    None => Ok(Value::Nothing),
                }
            }
            ExprKind::While(cond, body) => {
                while as_bool(&self.eval(cond, context)?)? {
                    match self.scoped(context, HashMap::new(), |this, ctx| this.eval(body, ctx)) {
                        Ok(_) | Err(Flow::Continue) => {}
                        Err(Flow::Break) => break,
                        Err(other) => return Err(other),
                    }
                }
                Ok(Value::Nothing)
            }
            ExprKind::For(var, iter, body) => {
                let iterable = self.eval(iter, context)?;
                for item in iterate(&iterable)? {
                    let scope = HashMap::from([(var.clone(), item)]);
                    match self.scoped(context, scope, |this, ctx| this.eval(body, ctx)) {
                        Ok(_) | Err(Flow::Continue) => {}
                        Err(Flow::Break) => break,
                        Err(other) => return Err(other),
                    }
                }
                Ok(Value::Nothing)
            }
            ExprKind::Let(bindings, body) => self.scoped(context, HashMap::new(), |this, ctx| {
                for (pattern, value) in bindings {
                    let value = this.eval(value, ctx)?;
                    bind_pattern(pattern, value, ctx)?;
                }
                this.eval(body, ctx)
            }),
            ExprKind::Try { body, binding, handler } => match self.eval(body, context) {
                Err(Flow::Signal(Signal::Raised(err))) => {
                    debug!(error = %err.error, "caught error");
                    let mut scope = HashMap::new();
                    if let Some(name) = binding {
                        scope.insert(name.clone(), Value::str(err.error.to_string()));
                    }
                    self.scoped(context, scope, |this, ctx| this.eval(handler, ctx))
                }
                other => other,
            },
            ExprKind::Return(value) => {
                let value = match value {
                    Some(value) => self.eval(value, context)?,
                    None => Value::Nothing,
                };
                Err(Flow::Return(value))
            }
            ExprKind::Break => Err(Flow::Break),
            ExprKind::Continue => Err(Flow::Continue),
            ExprKind::Function(def) => {
                if context.in_function {
                    return Err(EvalError::Runtime("nested function definitions are not supported".to_string()).into());
                }
                let origin = self.origin.clone();
                let method = self.define_method(&context.module, def.clone(), origin)?;
                Ok(Value::Function(FunctionRef { module: method.module.clone(), name: method.name.clone() }))
            }
            ExprKind::Module(name, items) => {
                if context.in_function {
                    return Err(EvalError::Runtime("module definitions must be at top level".to_string()).into());
                }
                self.ensure_module(name);
                let mut inner = EvalContext::top_level(name.clone());
                self.eval_block(items, &mut inner)?;
                Ok(Value::Module(name.clone()))
            }
            ExprKind::EvalIn(module, body) => {
                if !self.has_module(module) {
                    return Err(EvalError::UnknownModule(module.clone()).into());
                }
                let mut inner = EvalContext::top_level(module.clone());
                self.eval(body, &mut inner)
            }
        }
    }

    fn eval_all(&mut self, exprs: &[Expr], context: &mut EvalContext) -> Eval<Vec<Value>> {
        exprs.iter().map(|e| self.eval(e, context)).collect()
    }

    fn eval_ident(&self, name: &str, context: &EvalContext) -> Eval<Value> {
        if let Some(value) = context.local(name) {
            return Ok(value.clone());
        }
        self.lookup(&context.module, name).ok_or_else(|| EvalError::UndefinedVariable(name.to_string()).into())
    }

    fn eval_field(&self, base: Value, name: &str) -> Eval<Value> {
        match base {
            Value::Module(module) => self
                .lookup_global(&module, name)
                .ok_or_else(|| EvalError::UndefinedVariable(format!("{}.{}", module, name)).into()),
            Value::NamedTuple(fields) => fields
                .into_iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v)
                .ok_or_else(|| EvalError::Runtime(format!("type NamedTuple has no field {}", name)).into()),
            other => Err(EvalError::TypeMismatch {
                expected: "Module or NamedTuple".to_string(),
                found: other.type_of().to_string(),
            }
            .into()),
        }
    }

    fn assign(&mut self, target: &Expr, value: Value, context: &mut EvalContext) -> Eval<()> {
        match &target.kind {
            ExprKind::Ident(name) => {
                if let Some(slot) = context.scopes.iter_mut().rev().find_map(|s| s.get_mut(name)) {
                    *slot = value;
                    return Ok(());
                }
                let module = self
                    .modules
                    .get_mut(&context.module)
                    .ok_or_else(|| EvalError::UnknownModule(context.module.clone()))?;
                if context.scopes.is_empty() || (!context.in_function && module.globals.contains_key(name)) {
                    module.globals.insert(name.clone(), value);
                } else {
                    context.bind_local(name.clone(), value);
                }
                Ok(())
            }
            ExprKind::Index(base, index) => {
                let base = self.eval(base, context)?;
                let index = self.eval(index, context)?;
                match (&base, &index) {
                    (Value::Array(items), Value::Int(i)) => {
                        let mut items = items.borrow_mut();
                        let len = items.len();
                        let slot = checked_index(*i, len)
                            .and_then(|k| items.get_mut(k))
                            .ok_or(EvalError::Bounds { container: "Vector".to_string(), length: len, index: *i })?;
                        *slot = value;
                        Ok(())
                    }
                    _ => Err(EvalError::NoMethod {
                        function: "setindex!".to_string(),
                        args: dispatch::describe_args(&[base.clone(), value, index.clone()]),
                    }
                    .into()),
                }
            }
            ExprKind::Tuple(names) => {
                let items = destructure(&value, names.len())?;
                for (name, item) in names.iter().zip(items) {
                    self.assign(name, item, context)?;
                }
                Ok(())
            }
            _ => Err(EvalError::InvalidAssignment(format!("{:?}", target.kind)).into()),
        }
    }
}

//-----------------------------------------------------------------------------
// Value helpers
//-----------------------------------------------------------------------------

fn as_bool(value: &Value) -> Result<bool, EvalError> {
    match value {
        Value::Bool(b) => Ok(*b),
        other => Err(EvalError::TypeMismatch { expected: "Bool".to_string(), found: other.type_of().to_string() }),
    }
}

/// Convert a 1-based index into a 0-based offset
fn checked_index(index: i64, len: usize) -> Option<usize> {
    let k = usize::try_from(index).ok()?.checked_sub(1)?;
    (k < len).then_some(k)
}

fn index_value(base: &Value, index: &Value) -> Result<Value, EvalError> {
    let Value::Int(i) = *index else {
        return Err(EvalError::TypeMismatch { expected: "Int64".to_string(), found: index.type_of().to_string() });
    };
    let bounds = |container: &str, length: usize| EvalError::Bounds { container: container.to_string(), length, index: i };
    match base {
        Value::Array(items) => {
            let items = items.borrow();
            checked_index(i, items.len()).map(|k| items[k].clone()).ok_or_else(|| bounds("Vector", items.len()))
        }
        Value::Tuple(items) => checked_index(i, items.len()).map(|k| items[k].clone()).ok_or_else(|| bounds("Tuple", items.len())),
        Value::Range(lo, hi) => {
            let len = usize::try_from(hi - lo + 1).unwrap_or(0);
            checked_index(i, len).map(|k| Value::Int(lo + k as i64)).ok_or_else(|| bounds("UnitRange", len))
        }
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            checked_index(i, chars.len())
                .map(|k| Value::str(chars[k].to_string()))
                .ok_or_else(|| bounds("String", chars.len()))
        }
        other => Err(EvalError::NoMethod {
            function: "getindex".to_string(),
            args: dispatch::describe_args(&[other.clone(), index.clone()]),
        }),
    }
}

/// Elements of an iterable value
pub(crate) fn iterate(value: &Value) -> Result<Vec<Value>, EvalError> {
    match value {
        Value::Range(lo, hi) => Ok((*lo..=*hi).map(Value::Int).collect()),
        Value::Array(items) => Ok(items.borrow().clone()),
        Value::Tuple(items) => Ok(items.clone()),
        Value::NamedTuple(fields) => Ok(fields.iter().map(|(_, v)| v.clone()).collect()),
        Value::Str(s) => Ok(s.chars().map(|c| Value::str(c.to_string())).collect()),
        other => Err(EvalError::NoMethod { function: "iterate".to_string(), args: dispatch::describe_args(&[other.clone()]) }),
    }
}

/// First `count` elements of a value bound to a tuple pattern
fn destructure(value: &Value, count: usize) -> Result<Vec<Value>, EvalError> {
    let items = iterate(value)?;
    if items.len() < count {
        return Err(EvalError::Bounds {
            container: value.type_of().to_string(),
            length: items.len(),
            index: count as i64,
        });
    }
    Ok(items.into_iter().take(count).collect())
}

fn bind_pattern(pattern: &Expr, value: Value, context: &mut EvalContext) -> Result<(), EvalError> {
    match &pattern.kind {
        ExprKind::Ident(name) => {
            context.bind_local(name.clone(), value);
            Ok(())
        }
        ExprKind::Tuple(names) => {
            let items = destructure(&value, names.len())?;
            for (name, item) in names.iter().zip(items) {
                bind_pattern(name, item, context)?;
            }
            Ok(())
        }
        other => Err(EvalError::InvalidAssignment(format!("{:?}", other))),
    }
}

fn unary_op(op: UnaryOp, value: Value) -> Result<Value, EvalError> {
    match (op, value) {
        (UnaryOp::Neg, Value::Int(n)) => Ok(Value::Int(n.wrapping_neg())),
        (UnaryOp::Neg, Value::Float(x)) => Ok(Value::Float(-x)),
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (op, value) => Err(EvalError::NoMethod {
            function: match op {
                UnaryOp::Neg => "-".to_string(),
                UnaryOp::Not => "!".to_string(),
            },
            args: dispatch::describe_args(&[value]),
        }),
    }
}

fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Int(n) => Some(*n as f64),
        Value::Float(x) => Some(*x),
        _ => None,
    }
}

pub(crate) fn binary_op(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, EvalError> {
    use BinaryOp::*;
    let no_method = |lhs: &Value, rhs: &Value| EvalError::NoMethod {
        function: op.to_string(),
        args: dispatch::describe_args(&[lhs.clone(), rhs.clone()]),
    };
    match op {
        Eq => return Ok(Value::Bool(lhs == rhs)),
        Ne => return Ok(Value::Bool(lhs != rhs)),
        _ => {}
    }
    match (&lhs, &rhs) {
        (Value::Int(a), Value::Int(b)) => {
            let (a, b) = (*a, *b);
            Ok(match op {
                Add => Value::Int(a.wrapping_add(b)),
                Sub => Value::Int(a.wrapping_sub(b)),
                Mul => Value::Int(a.wrapping_mul(b)),
                Div => Value::Float(a as f64 / b as f64),
                Rem if b == 0 => return Err(EvalError::DivisionByZero),
                Rem => Value::Int(a.wrapping_rem(b)),
                Pow => {
                    let exp = u32::try_from(b)
                        .map_err(|_| EvalError::Runtime(format!("DomainError: cannot raise {} to power {}", a, b)))?;
                    Value::Int(a.wrapping_pow(exp))
                }
                Lt => Value::Bool(a < b),
                Le => Value::Bool(a <= b),
                Gt => Value::Bool(a > b),
                Ge => Value::Bool(a >= b),
                Eq | Ne | And | Or => return Err(no_method(&lhs, &rhs)),
            })
        }
        (Value::Str(a), Value::Str(b)) => match op {
            Mul => Ok(Value::str(format!("{}{}", a, b))),
            Lt => Ok(Value::Bool(a < b)),
            Le => Ok(Value::Bool(a <= b)),
            Gt => Ok(Value::Bool(a > b)),
            Ge => Ok(Value::Bool(a >= b)),
            _ => Err(no_method(&lhs, &rhs)),
        },
        _ => {
            let (Some(a), Some(b)) = (as_float(&lhs), as_float(&rhs)) else {
                return Err(no_method(&lhs, &rhs));
            };
            Ok(match op {
                Add => Value::Float(a + b),
                Sub => Value::Float(a - b),
                Mul => Value::Float(a * b),
                Div => Value::Float(a / b),
                Rem => Value::Float(a % b),
                Pow => Value::Float(a.powf(b)),
                Lt => Value::Bool(a < b),
                Le => Value::Bool(a <= b),
                Gt => Value::Bool(a > b),
                Ge => Value::Bool(a >= b),
                Eq | Ne | And | Or => return Err(no_method(&lhs, &rhs)),
            })
        }
    }
}
