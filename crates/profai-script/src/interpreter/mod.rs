//! AST interpreter (tree-walking)
//!
//! Direct AST evaluation over a chain of reference-counted scopes.
//! Supports:
//! - Expression evaluation (operators, calls, member access, optional chains)
//! - Statement execution with labelled control flow and exceptions
//! - Closures, classes with single inheritance, destructuring
//! - Step, time and call-depth budgets from [`ExecutionLimits`]

mod class;
mod expr;
mod pattern;
mod property;
mod stmt;

use crate::ast::{FunctionBody, FunctionNode, Program, Stmt};
use crate::limits::{ExecutionLimits, CLOCK_CHECK_INTERVAL};
use crate::stdlib::{self, Prototypes};
use crate::value::{Class, Closure, Function, FunctionKind, RuntimeError, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use std::time::{Duration, Instant};

pub(crate) use pattern::BindMode;

/// Shared handle to a scope
pub type EnvRef = Rc<RefCell<Scope>>;

/// Control flow signal for handling break, continue, and return
#[derive(Debug, Clone)]
pub(crate) enum ControlFlow {
    Normal,
    Return(Value),
    Break(Option<String>),
    Continue(Option<String>),
}

/// A variable binding
#[derive(Debug, Clone)]
pub struct Binding {
    pub value: Value,
    pub mutable: bool,
    /// False between scope entry and the `let`/`const`/`class` declaration
    pub initialized: bool,
}

fn uninitialized(name: &str) -> RuntimeError {
    RuntimeError::reference_error(format!("Cannot access '{}' before initialization", name))
}

/// Per-call state visible to `this` and `super`
#[derive(Debug, Clone)]
pub(crate) struct Frame {
    pub this: Value,
    pub home: Option<Rc<Class>>,
}

/// One lexical scope
#[derive(Debug, Default)]
pub struct Scope {
    pub(crate) vars: HashMap<String, Binding>,
    pub(crate) parent: Option<EnvRef>,
    /// Present on function scopes (not arrows)
    pub(crate) frame: Option<Frame>,
}

impl Scope {
    pub fn new_root() -> EnvRef {
        Rc::new(RefCell::new(Scope {
            frame: Some(Frame {
                this: Value::Undefined,
                home: None,
            }),
            ..Scope::default()
        }))
    }

    pub fn child(parent: &EnvRef) -> EnvRef {
        Rc::new(RefCell::new(Scope {
            parent: Some(parent.clone()),
            ..Scope::default()
        }))
    }

    pub fn declare(env: &EnvRef, name: &str, value: Value, mutable: bool) {
        let binding = Binding {
            value,
            mutable,
            initialized: true,
        };
        env.borrow_mut().vars.insert(name.to_string(), binding);
    }

    /// Reserve a lexical name that cannot be touched until its declaration runs
    pub fn declare_uninitialized(env: &EnvRef, name: &str) {
        let binding = Binding {
            value: Value::Undefined,
            mutable: true,
            initialized: false,
        };
        env.borrow_mut().vars.insert(name.to_string(), binding);
    }

    /// Look a name up through the scope chain; `Ok(None)` when undeclared
    pub fn lookup(env: &EnvRef, name: &str) -> Result<Option<Value>, RuntimeError> {
        let mut current = env.clone();
        loop {
            let parent = {
                let scope = current.borrow();
                if let Some(binding) = scope.vars.get(name) {
                    if !binding.initialized {
                        return Err(uninitialized(name));
                    }
                    return Ok(Some(binding.value.clone()));
                }
                scope.parent.clone()
            };
            match parent {
                Some(parent) => current = parent,
                None => return Ok(None),
            }
        }
    }

    /// Assign to an existing binding; `Ok(false)` when no scope declares it
    pub fn assign(env: &EnvRef, name: &str, value: Value) -> Result<bool, RuntimeError> {
        let mut current = env.clone();
        loop {
            let parent = {
                let mut scope = current.borrow_mut();
                if let Some(binding) = scope.vars.get_mut(name) {
                    if !binding.initialized {
                        return Err(uninitialized(name));
                    }
                    if !binding.mutable {
                        return Err(RuntimeError::type_error("Assignment to constant variable."));
                    }
                    binding.value = value;
                    return Ok(true);
                }
                scope.parent.clone()
            };
            match parent {
                Some(parent) => current = parent,
                None => return Ok(false),
            }
        }
    }

    /// A copy of this scope's bindings under the same parent (per-iteration `let`)
    pub(crate) fn duplicate(env: &EnvRef) -> EnvRef {
        let scope = env.borrow();
        Rc::new(RefCell::new(Scope {
            vars: scope.vars.clone(),
            parent: scope.parent.clone(),
            frame: scope.frame.clone(),
        }))
    }

    fn frame(env: &EnvRef) -> Option<Frame> {
        let mut current = env.clone();
        loop {
            let parent = {
                let scope = current.borrow();
                if let Some(frame) = &scope.frame {
                    return Some(frame.clone());
                }
                scope.parent.clone()
            };
            current = parent?;
        }
    }
}

/// Step and clock accounting for the current evaluation
#[derive(Debug, Clone)]
struct Budget {
    steps: u64,
    started: Instant,
    deadline: Option<Instant>,
}

impl Budget {
    fn start(limits: &ExecutionLimits) -> Self {
        let started = Instant::now();
        Self {
            steps: 0,
            started,
            deadline: limits.timeout.map(|t| started + t),
        }
    }
}

/// Interpreter state
pub struct Interpreter {
    /// Global scope
    pub(crate) globals: EnvRef,
    /// Current scope
    pub(crate) env: EnvRef,
    pub(crate) limits: ExecutionLimits,
    budget: Budget,
    pub(crate) call_depth: usize,
    /// Source text of the program being evaluated
    pub(crate) source: Rc<str>,
    pub(crate) prototypes: Prototypes,
    /// Value of the last top-level expression statement
    pub(crate) completion: Value,
}

impl Interpreter {
    /// Create an interpreter with the standard library installed
    pub fn new(limits: ExecutionLimits) -> Self {
        let globals = Scope::new_root();
        let mut interpreter = Self {
            env: globals.clone(),
            globals,
            budget: Budget::start(&limits),
            limits,
            call_depth: 0,
            source: Rc::from(""),
            prototypes: Prototypes::default(),
            completion: Value::Undefined,
        };
        stdlib::install(&mut interpreter);
        interpreter
    }

    /// Evaluate a program
    ///
    /// The result is the completion value: the last expression statement
    /// evaluated outside any function, including those nested in blocks,
    /// branches, loops and `try`/`catch`.
    pub fn eval(&mut self, program: &Program, source: Rc<str>) -> Result<Value, RuntimeError> {
        self.source = source;
        self.completion = Value::Undefined;
        let globals = self.globals.clone();
        self.hoist(&program.body, &globals);

        for stmt in &program.body {
            match self.eval_statement(stmt)? {
                ControlFlow::Normal => {}
                ControlFlow::Return(value) => return Ok(value),
                ControlFlow::Break(_) | ControlFlow::Continue(_) => break,
            }
        }
        Ok(std::mem::take(&mut self.completion))
    }

    /// Define or overwrite a global binding
    pub fn define_global(&mut self, name: &str, value: Value) {
        Scope::declare(&self.globals, name, value, true);
    }

    pub fn get_global(&self, name: &str) -> Option<Value> {
        self.globals.borrow().vars.get(name).map(|b| b.value.clone())
    }

    pub fn limits(&self) -> &ExecutionLimits {
        &self.limits
    }

    /// Start a fresh step and time budget
    pub fn reset_budget(&mut self) {
        self.budget = Budget::start(&self.limits);
        self.call_depth = 0;
    }

    pub fn steps_used(&self) -> u64 {
        self.budget.steps
    }

    pub fn elapsed(&self) -> Duration {
        self.budget.started.elapsed()
    }

    /// Charge one step against the budget
    pub(crate) fn tick(&mut self) -> Result<(), RuntimeError> {
        self.budget.steps += 1;
        if let Some(max) = self.limits.max_steps {
            if self.budget.steps > max {
                tracing::trace!(max_steps = max, "step budget exhausted");
                return Err(RuntimeError::StepLimitExceeded(max));
            }
        }
        if self.budget.steps % CLOCK_CHECK_INTERVAL == 0 {
            if let (Some(deadline), Some(timeout)) = (self.budget.deadline, self.limits.timeout) {
                if Instant::now() >= deadline {
                    tracing::trace!(steps = self.budget.steps, "time budget exhausted");
                    return Err(RuntimeError::TimeLimitExceeded(timeout.as_millis()));
                }
            }
        }
        Ok(())
    }

    /// Run `f` with `env` as the current scope
    pub(crate) fn in_scope<T>(
        &mut self,
        env: EnvRef,
        f: impl FnOnce(&mut Self) -> Result<T, RuntimeError>,
    ) -> Result<T, RuntimeError> {
        let saved = std::mem::replace(&mut self.env, env);
        let result = f(self);
        self.env = saved;
        result
    }

    pub(crate) fn lookup_variable(&self, name: &str) -> Result<Value, RuntimeError> {
        Scope::lookup(&self.env, name)?
            .ok_or_else(|| RuntimeError::reference_error(format!("{} is not defined", name)))
    }

    /// Assign through the scope chain; undeclared names become globals
    pub(crate) fn set_variable(&mut self, name: &str, value: Value) -> Result<(), RuntimeError> {
        if !Scope::assign(&self.env, name, value.clone())? {
            Scope::declare(&self.globals, name, value, true);
        }
        Ok(())
    }

    pub(crate) fn current_this(&self) -> Value {
        Scope::frame(&self.env)
            .map(|f| f.this)
            .unwrap_or(Value::Undefined)
    }

    pub(crate) fn current_home(&self) -> Option<Rc<Class>> {
        Scope::frame(&self.env).and_then(|f| f.home)
    }

    // === Functions ===

    /// Create a closure over the current scope
    pub(crate) fn make_closure(
        &mut self,
        node: &Rc<FunctionNode>,
        name: Option<&str>,
        home: Option<Weak<Class>>,
    ) -> Value {
        let closure_name = node
            .name
            .as_ref()
            .map(|n| n.name.as_str())
            .or(name)
            .unwrap_or("");
        Value::Function(Rc::new(Function::new(FunctionKind::Closure(Closure {
            name: Rc::from(closure_name),
            node: node.clone(),
            env: self.env.clone(),
            source: self.source.clone(),
            home,
        }))))
    }

    /// Function expression; a named one sees its own name
    pub(crate) fn make_function_expression(
        &mut self,
        node: &Rc<FunctionNode>,
        name_hint: Option<&str>,
    ) -> Value {
        match (&node.name, node.is_arrow) {
            (Some(own), false) => {
                let scope = Scope::child(&self.env);
                let saved = std::mem::replace(&mut self.env, scope.clone());
                let closure = self.make_closure(node, None, None);
                self.env = saved;
                Scope::declare(&scope, &own.name, closure.clone(), false);
                closure
            }
            _ => self.make_closure(node, name_hint, None),
        }
    }

    /// Call any callable value
    pub fn call_function(
        &mut self,
        callee: &Value,
        this: Value,
        args: &[Value],
    ) -> Result<Value, RuntimeError> {
        let function = match callee {
            Value::Function(f) => f.clone(),
            other => {
                return Err(RuntimeError::type_error(format!(
                    "{} is not a function",
                    describe_value(other)
                )))
            }
        };

        self.tick()?;
        if self.call_depth >= self.limits.max_call_depth {
            return Err(RuntimeError::range_error("Maximum call stack size exceeded"));
        }
        self.call_depth += 1;
        let result = self.call_inner(&function, this, args);
        self.call_depth -= 1;
        result
    }

    fn call_inner(
        &mut self,
        function: &Rc<Function>,
        this: Value,
        args: &[Value],
    ) -> Result<Value, RuntimeError> {
        match &function.kind {
            FunctionKind::Closure(closure) => {
                let home = closure.home.as_ref().and_then(Weak::upgrade);
                self.invoke_closure(&closure.node, &closure.env, home, this, args)
            }
            FunctionKind::Native(native) => {
                let func = native.func.clone();
                func(self, &this, args)
            }
            FunctionKind::Class(class) => Err(RuntimeError::type_error(format!(
                "Class constructor {} cannot be invoked without 'new'",
                class.name
            ))),
            FunctionKind::Bound {
                target,
                this: bound_this,
                args: bound_args,
            } => {
                let mut all = bound_args.clone();
                all.extend_from_slice(args);
                self.call_inner(target, bound_this.clone(), &all)
            }
        }
    }

    /// Run a user function body in a fresh scope
    pub(crate) fn invoke_closure(
        &mut self,
        node: &Rc<FunctionNode>,
        env: &EnvRef,
        home: Option<Rc<Class>>,
        this: Value,
        args: &[Value],
    ) -> Result<Value, RuntimeError> {
        let scope = Scope::child(env);
        if !node.is_arrow {
            scope.borrow_mut().frame = Some(Frame { this, home });
            Scope::declare(&scope, "arguments", Value::array(args.to_vec()), true);
        }

        self.in_scope(scope.clone(), |interp| {
            for (i, param) in node.params.iter().enumerate() {
                let value = args.get(i).cloned().unwrap_or_default();
                interp.bind_pattern(param, value, BindMode::Declare { mutable: true })?;
            }
            if let Some(rest) = &node.rest {
                let extra = args.get(node.params.len()..).unwrap_or(&[]).to_vec();
                interp.bind_pattern(rest, Value::array(extra), BindMode::Declare { mutable: true })?;
            }

            match &node.body {
                FunctionBody::Expression(expr) => interp.eval_expr(expr),
                FunctionBody::Block(statements) => {
                    interp.hoist(statements, &scope);
                    for stmt in statements {
                        match interp.eval_statement(stmt)? {
                            ControlFlow::Normal => {}
                            ControlFlow::Return(value) => return Ok(value),
                            ControlFlow::Break(_) | ControlFlow::Continue(_) => break,
                        }
                    }
                    Ok(Value::Undefined)
                }
            }
        })
    }

    /// `new callee(...args)`
    pub fn construct(&mut self, callee: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
        let function = match callee {
            Value::Function(f) => f.clone(),
            other => {
                return Err(RuntimeError::type_error(format!(
                    "{} is not a constructor",
                    describe_value(other)
                )))
            }
        };

        self.tick()?;
        if self.call_depth >= self.limits.max_call_depth {
            return Err(RuntimeError::range_error("Maximum call stack size exceeded"));
        }
        self.call_depth += 1;
        let result = self.construct_inner(&function, args);
        self.call_depth -= 1;
        result
    }

    fn construct_inner(&mut self, function: &Rc<Function>, args: &[Value]) -> Result<Value, RuntimeError> {
        match &function.kind {
            FunctionKind::Class(class) => self.instantiate(class, args),
            FunctionKind::Native(native) if native.constructor => {
                let func = native.func.clone();
                func(self, &Value::Undefined, args)
            }
            FunctionKind::Closure(closure) if !closure.node.is_arrow && closure.home.is_none() => {
                let instance = Value::object(Default::default());
                let result =
                    self.invoke_closure(&closure.node, &closure.env, None, instance.clone(), args)?;
                Ok(match result {
                    Value::Object(_) | Value::Array(_) => result,
                    _ => instance,
                })
            }
            FunctionKind::Bound { target, args: bound, .. } => {
                let mut all = bound.clone();
                all.extend_from_slice(args);
                self.construct_inner(target, &all)
            }
            _ => Err(RuntimeError::type_error(format!(
                "{} is not a constructor",
                function.name()
            ))),
        }
    }

    // === Hoisting ===

    /// Declare `var` names and function declarations of a body in `env`
    pub(crate) fn hoist(&mut self, statements: &[Stmt], env: &EnvRef) {
        let mut names = Vec::new();
        for stmt in statements {
            collect_var_names(stmt, &mut names);
        }
        for name in names {
            if !env.borrow().vars.contains_key(&name) {
                Scope::declare(env, &name, Value::Undefined, true);
            }
        }
        self.hoist_lexical(statements, env);
    }

    /// Declare the functions and reserve the `let`/`const`/`class` names
    /// appearing directly in `statements`
    pub(crate) fn hoist_lexical(&mut self, statements: &[Stmt], env: &EnvRef) {
        use crate::ast::VarKind;
        for stmt in statements {
            match stmt {
                Stmt::Function(node) => {
                    let saved = std::mem::replace(&mut self.env, env.clone());
                    let name = node.name.as_ref().map(|n| n.name.clone()).unwrap_or_default();
                    let closure = self.make_closure(node, Some(&name), None);
                    self.env = saved;
                    Scope::declare(env, &name, closure, true);
                }
                Stmt::VarDecl(decl) if decl.kind != VarKind::Var => {
                    let mut names = Vec::new();
                    for declarator in &decl.declarations {
                        declarator.target.bound_names(&mut names);
                    }
                    for name in names {
                        Scope::declare_uninitialized(env, &name);
                    }
                }
                Stmt::Class(node) => {
                    if let Some(name) = &node.name {
                        Scope::declare_uninitialized(env, &name.name);
                    }
                }
                _ => {}
            }
        }
    }
}

impl Drop for Interpreter {
    fn drop(&mut self) {
        // Closures stored in globals point back at the global scope
        self.globals.borrow_mut().vars.clear();
    }
}

fn collect_var_names(stmt: &Stmt, out: &mut Vec<String>) {
    use crate::ast::{ForHead, ForInit, VarKind};
    match stmt {
        Stmt::VarDecl(decl) if decl.kind == VarKind::Var => {
            for declarator in &decl.declarations {
                declarator.target.bound_names(out);
            }
        }
        Stmt::If {
            consequent,
            alternate,
            ..
        } => {
            collect_var_names(consequent, out);
            if let Some(alternate) = alternate {
                collect_var_names(alternate, out);
            }
        }
        Stmt::Block(block) => block.statements.iter().for_each(|s| collect_var_names(s, out)),
        Stmt::While { body, .. } | Stmt::DoWhile { body, .. } | Stmt::Labeled { body, .. } => {
            collect_var_names(body, out)
        }
        Stmt::For { init, body, .. } => {
            if let Some(ForInit::VarDecl(decl)) = init {
                if decl.kind == VarKind::Var {
                    for declarator in &decl.declarations {
                        declarator.target.bound_names(out);
                    }
                }
            }
            collect_var_names(body, out);
        }
        Stmt::ForIn { left, body, .. } | Stmt::ForOf { left, body, .. } => {
            if let ForHead::Declaration(VarKind::Var, pattern) = left {
                pattern.bound_names(out);
            }
            collect_var_names(body, out);
        }
        Stmt::Try {
            block,
            handler,
            finalizer,
            ..
        } => {
            block.statements.iter().for_each(|s| collect_var_names(s, out));
            if let Some(handler) = handler {
                handler
                    .body
                    .statements
                    .iter()
                    .for_each(|s| collect_var_names(s, out));
            }
            if let Some(finalizer) = finalizer {
                finalizer
                    .statements
                    .iter()
                    .for_each(|s| collect_var_names(s, out));
            }
        }
        Stmt::Switch { cases, .. } => {
            for case in cases {
                case.body.iter().for_each(|s| collect_var_names(s, out));
            }
        }
        _ => {}
    }
}

/// Short description of a value for error messages
pub(crate) fn describe_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s),
        Value::Array(_) => "object".to_string(),
        Value::Object(_) | Value::Map(_) | Value::Set(_) => "object".to_string(),
        Value::Function(f) => {
            let name = f.name();
            if name.is_empty() {
                "function".to_string()
            } else {
                name.to_string()
            }
        }
        other => other.to_display_string(),
    }
}
