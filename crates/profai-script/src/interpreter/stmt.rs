//! Statement execution

use crate::ast::*;
use crate::interpreter::{describe_value, BindMode, ControlFlow, EnvRef, Interpreter, Scope};
use crate::value::{number_to_string, strict_equals, RuntimeError, Value};

/// What a loop does after its body completes
enum LoopStep {
    Next,
    Exit,
    Propagate(ControlFlow),
}

fn loop_step(flow: ControlFlow, labels: &[String]) -> LoopStep {
    match flow {
        ControlFlow::Normal | ControlFlow::Continue(None) => LoopStep::Next,
        ControlFlow::Break(None) => LoopStep::Exit,
        ControlFlow::Continue(Some(label)) if labels.contains(&label) => LoopStep::Next,
        ControlFlow::Break(Some(label)) if labels.contains(&label) => LoopStep::Exit,
        other => LoopStep::Propagate(other),
    }
}

impl Interpreter {
    /// Execute a statement
    pub(super) fn eval_statement(&mut self, stmt: &Stmt) -> Result<ControlFlow, RuntimeError> {
        self.tick()?;
        match stmt {
            Stmt::Expr(expr) => {
                let value = self.eval_expr(expr)?;
                if self.call_depth == 0 {
                    self.completion = value;
                }
                Ok(ControlFlow::Normal)
            }
            Stmt::VarDecl(decl) => {
                self.eval_var_decl(decl)?;
                Ok(ControlFlow::Normal)
            }
            // Hoisted when the enclosing body was entered
            Stmt::Function(_) | Stmt::Empty(_) => Ok(ControlFlow::Normal),
            Stmt::Class(node) => {
                let class = self.define_class(node, None)?;
                if let Some(name) = &node.name {
                    Scope::declare(&self.env, &name.name, class, true);
                }
                Ok(ControlFlow::Normal)
            }
            Stmt::Return(value, _) => {
                let value = match value {
                    Some(expr) => self.eval_expr(expr)?,
                    None => Value::Undefined,
                };
                Ok(ControlFlow::Return(value))
            }
            Stmt::If {
                test,
                consequent,
                alternate,
                ..
            } => self.eval_if(test, consequent, alternate.as_deref()),
            Stmt::Block(block) => self.eval_block(&block.statements),
            Stmt::While { .. }
            | Stmt::DoWhile { .. }
            | Stmt::For { .. }
            | Stmt::ForIn { .. }
            | Stmt::ForOf { .. } => self.eval_loop(stmt, &[]),
            Stmt::Break(label, _) => Ok(ControlFlow::Break(label.clone())),
            Stmt::Continue(label, _) => Ok(ControlFlow::Continue(label.clone())),
            Stmt::Throw(expr, _) => {
                let value = self.eval_expr(expr)?;
                Err(RuntimeError::Thrown(value))
            }
            Stmt::Try {
                block,
                handler,
                finalizer,
                ..
            } => self.eval_try(block, handler.as_ref(), finalizer.as_ref()),
            Stmt::Switch {
                discriminant,
                cases,
                ..
            } => self.eval_switch(discriminant, cases),
            Stmt::Labeled { label, body, .. } => self.eval_labeled(label, body),
        }
    }

    fn eval_var_decl(&mut self, decl: &VarDecl) -> Result<(), RuntimeError> {
        for declarator in &decl.declarations {
            let name_hint = match &declarator.target {
                Pattern::Identifier(id) => Some(id.name.as_str()),
                _ => None,
            };
            match (decl.kind, &declarator.init) {
                (VarKind::Var, None) => {}
                (VarKind::Var, Some(init)) => {
                    let value = self.eval_named(init, name_hint)?;
                    self.bind_pattern(&declarator.target, value, BindMode::Var)?;
                }
                (kind, init) => {
                    let value = match init {
                        Some(init) => self.eval_named(init, name_hint)?,
                        None => Value::Undefined,
                    };
                    let mode = BindMode::Declare {
                        mutable: kind == VarKind::Let,
                    };
                    self.bind_pattern(&declarator.target, value, mode)?;
                }
            }
        }
        Ok(())
    }

    fn eval_if(
        &mut self,
        test: &Expr,
        consequent: &Stmt,
        alternate: Option<&Stmt>,
    ) -> Result<ControlFlow, RuntimeError> {
        if self.eval_expr(test)?.is_truthy() {
            self.eval_statement(consequent)
        } else if let Some(alternate) = alternate {
            self.eval_statement(alternate)
        } else {
            Ok(ControlFlow::Normal)
        }
    }

    /// Execute statements in a new block scope
    pub(super) fn eval_block(&mut self, statements: &[Stmt]) -> Result<ControlFlow, RuntimeError> {
        let scope = Scope::child(&self.env);
        self.in_scope(scope.clone(), |interp| {
            interp.hoist_lexical(statements, &scope);
            interp.eval_statements(statements)
        })
    }

    fn eval_statements(&mut self, statements: &[Stmt]) -> Result<ControlFlow, RuntimeError> {
        for stmt in statements {
            let flow = self.eval_statement(stmt)?;
            if !matches!(flow, ControlFlow::Normal) {
                return Ok(flow);
            }
        }
        Ok(ControlFlow::Normal)
    }

    fn eval_labeled(&mut self, label: &str, body: &Stmt) -> Result<ControlFlow, RuntimeError> {
        // Collect directly nested labels: `a: b: for (...)`
        let mut labels = vec![label.to_string()];
        let mut target = body;
        while let Stmt::Labeled { label, body, .. } = target {
            labels.push(label.clone());
            target = body;
        }

        let flow = match target {
            Stmt::While { .. }
            | Stmt::DoWhile { .. }
            | Stmt::For { .. }
            | Stmt::ForIn { .. }
            | Stmt::ForOf { .. } => self.eval_loop(target, &labels)?,
            other => self.eval_statement(other)?,
        };
        Ok(match flow {
            ControlFlow::Break(Some(l)) if labels.contains(&l) => ControlFlow::Normal,
            other => other,
        })
    }

    fn eval_loop(&mut self, stmt: &Stmt, labels: &[String]) -> Result<ControlFlow, RuntimeError> {
        match stmt {
            Stmt::While { test, body, .. } => self.eval_while(test, body, labels),
            Stmt::DoWhile { body, test, .. } => self.eval_do_while(body, test, labels),
            Stmt::For {
                init,
                test,
                update,
                body,
                ..
            } => self.eval_for(init.as_ref(), test.as_ref(), update.as_ref(), body, labels),
            Stmt::ForIn {
                left, right, body, ..
            } => self.eval_for_in(left, right, body, labels),
            Stmt::ForOf {
                left, right, body, ..
            } => self.eval_for_of(left, right, body, labels),
            other => self.eval_statement(other),
        }
    }

    fn eval_while(&mut self, test: &Expr, body: &Stmt, labels: &[String]) -> Result<ControlFlow, RuntimeError> {
        while self.eval_expr(test)?.is_truthy() {
            self.tick()?;
            match loop_step(self.eval_statement(body)?, labels) {
                LoopStep::Next => {}
                LoopStep::Exit => break,
                LoopStep::Propagate(flow) => return Ok(flow),
            }
        }
        Ok(ControlFlow::Normal)
    }

    fn eval_do_while(&mut self, body: &Stmt, test: &Expr, labels: &[String]) -> Result<ControlFlow, RuntimeError> {
        loop {
            self.tick()?;
            match loop_step(self.eval_statement(body)?, labels) {
                LoopStep::Next => {}
                LoopStep::Exit => break,
                LoopStep::Propagate(flow) => return Ok(flow),
            }
            if !self.eval_expr(test)?.is_truthy() {
                break;
            }
        }
        Ok(ControlFlow::Normal)
    }

    fn eval_for(
        &mut self,
        init: Option<&ForInit>,
        test: Option<&Expr>,
        update: Option<&Expr>,
        body: &Stmt,
        labels: &[String],
    ) -> Result<ControlFlow, RuntimeError> {
        let scope = Scope::child(&self.env);
        let per_iteration = matches!(
            init,
            Some(ForInit::VarDecl(VarDecl { kind: VarKind::Let, .. }))
        );

        self.in_scope(scope, |interp| {
            match init {
                Some(ForInit::VarDecl(decl)) => interp.eval_var_decl(decl)?,
                Some(ForInit::Expr(expr)) => {
                    interp.eval_expr(expr)?;
                }
                None => {}
            }

            loop {
                if let Some(test) = test {
                    if !interp.eval_expr(test)?.is_truthy() {
                        break;
                    }
                }
                interp.tick()?;
                match loop_step(interp.eval_statement(body)?, labels) {
                    LoopStep::Next => {}
                    LoopStep::Exit => break,
                    LoopStep::Propagate(flow) => return Ok(flow),
                }
                // Closures captured this iteration keep their own `let` bindings
                if per_iteration {
                    interp.env = Scope::duplicate(&interp.env);
                }
                if let Some(update) = update {
                    interp.eval_expr(update)?;
                }
            }
            Ok(ControlFlow::Normal)
        })
    }

    /// Bind the loop variable in a fresh scope and run one iteration
    fn eval_iteration(&mut self, left: &ForHead, value: Value, body: &Stmt) -> Result<ControlFlow, RuntimeError> {
        self.tick()?;
        let scope: EnvRef = Scope::child(&self.env);
        self.in_scope(scope, |interp| {
            match left {
                ForHead::Declaration(VarKind::Var, pattern) => {
                    interp.bind_pattern(pattern, value, BindMode::Var)?
                }
                ForHead::Declaration(kind, pattern) => interp.bind_pattern(
                    pattern,
                    value,
                    BindMode::Declare {
                        mutable: *kind == VarKind::Let,
                    },
                )?,
                ForHead::Pattern(pattern) => interp.bind_pattern(pattern, value, BindMode::Assign)?,
            }
            interp.eval_statement(body)
        })
    }

    fn eval_for_in(
        &mut self,
        left: &ForHead,
        right: &Expr,
        body: &Stmt,
        labels: &[String],
    ) -> Result<ControlFlow, RuntimeError> {
        let target = self.eval_expr(right)?;
        for key in self.enumerable_keys(&target) {
            let flow = self.eval_iteration(left, Value::string(key), body)?;
            match loop_step(flow, labels) {
                LoopStep::Next => {}
                LoopStep::Exit => break,
                LoopStep::Propagate(flow) => return Ok(flow),
            }
        }
        Ok(ControlFlow::Normal)
    }

    fn eval_for_of(
        &mut self,
        left: &ForHead,
        right: &Expr,
        body: &Stmt,
        labels: &[String],
    ) -> Result<ControlFlow, RuntimeError> {
        let iterable = self.eval_expr(right)?;

        // Arrays are read live so pushes during iteration are visited
        if let Value::Array(items) = &iterable {
            let items = items.clone();
            let mut index = 0;
            loop {
                let item = match items.borrow().get(index) {
                    Some(item) => item.clone(),
                    None => break,
                };
                index += 1;
                match loop_step(self.eval_iteration(left, item, body)?, labels) {
                    LoopStep::Next => {}
                    LoopStep::Exit => break,
                    LoopStep::Propagate(flow) => return Ok(flow),
                }
            }
            return Ok(ControlFlow::Normal);
        }

        for item in self.iterate(&iterable)? {
            match loop_step(self.eval_iteration(left, item, body)?, labels) {
                LoopStep::Next => {}
                LoopStep::Exit => break,
                LoopStep::Propagate(flow) => return Ok(flow),
            }
        }
        Ok(ControlFlow::Normal)
    }

    fn eval_try(
        &mut self,
        block: &Block,
        handler: Option<&CatchClause>,
        finalizer: Option<&Block>,
    ) -> Result<ControlFlow, RuntimeError> {
        let result = self.eval_block(&block.statements);

        // Budget exhaustion unwinds straight through
        if matches!(&result, Err(e) if !e.is_catchable()) {
            return result;
        }

        let result = match (result, handler) {
            (Err(RuntimeError::Thrown(value)), Some(handler)) => {
                let scope = Scope::child(&self.env);
                self.in_scope(scope, |interp| {
                    if let Some(param) = &handler.param {
                        interp.bind_pattern(param, value, BindMode::Declare { mutable: true })?;
                    }
                    interp.eval_block(&handler.body.statements)
                })
            }
            (other, _) => other,
        };

        if let Some(finalizer) = finalizer {
            if matches!(&result, Err(e) if !e.is_catchable()) {
                return result;
            }
            let flow = self.eval_block(&finalizer.statements)?;
            if !matches!(flow, ControlFlow::Normal) {
                return Ok(flow);
            }
        }
        result
    }

    fn eval_switch(&mut self, discriminant: &Expr, cases: &[SwitchCase]) -> Result<ControlFlow, RuntimeError> {
        let value = self.eval_expr(discriminant)?;
        let scope = Scope::child(&self.env);

        self.in_scope(scope.clone(), |interp| {
            for case in cases {
                interp.hoist_lexical(&case.body, &scope);
            }

            let mut start = None;
            for (i, case) in cases.iter().enumerate() {
                if let Some(test) = &case.test {
                    let candidate = interp.eval_expr(test)?;
                    if strict_equals(&value, &candidate) {
                        start = Some(i);
                        break;
                    }
                }
            }
            let start = match start.or_else(|| cases.iter().position(|c| c.test.is_none())) {
                Some(start) => start,
                None => return Ok(ControlFlow::Normal),
            };

            for case in &cases[start..] {
                match interp.eval_statements(&case.body)? {
                    ControlFlow::Normal => {}
                    ControlFlow::Break(None) => return Ok(ControlFlow::Normal),
                    other => return Ok(other),
                }
            }
            Ok(ControlFlow::Normal)
        })
    }

    /// Keys visited by `for...in`
    pub(crate) fn enumerable_keys(&self, target: &Value) -> Vec<String> {
        match target {
            Value::Array(items) => (0..items.borrow().len()).map(|i| i.to_string()).collect(),
            Value::String(s) => (0..s.chars().count()).map(|i| i.to_string()).collect(),
            Value::Object(obj) => crate::stdlib::object::ordered_keys(&obj.borrow().properties),
            Value::Function(f) => f.properties.borrow().keys().cloned().collect(),
            _ => Vec::new(),
        }
    }

    /// Snapshot the items of an iterable
    pub(crate) fn iterate(&mut self, value: &Value) -> Result<Vec<Value>, RuntimeError> {
        match value {
            Value::Array(items) => Ok(items.borrow().clone()),
            Value::String(s) => Ok(s.chars().map(|c| Value::string(c.to_string())).collect()),
            Value::Map(map) => Ok(map
                .borrow()
                .iter()
                .map(|(k, v)| Value::array(vec![k.0.clone(), v.clone()]))
                .collect()),
            Value::Set(set) => Ok(set.borrow().iter().map(|k| k.0.clone()).collect()),
            Value::Number(n) => Err(RuntimeError::type_error(format!(
                "number {} is not iterable (cannot read property Symbol(Symbol.iterator))",
                number_to_string(*n)
            ))),
            other => Err(RuntimeError::type_error(format!(
                "{} is not iterable",
                describe_value(other)
            ))),
        }
    }
}
