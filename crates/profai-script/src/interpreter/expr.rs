//! Expression evaluation

use crate::ast::*;
use crate::interpreter::property::{Hint, Key};
use crate::interpreter::{BindMode, Interpreter, Scope};
use crate::stdlib::object::ordered_keys;
use crate::value::{
    loose_equals, strict_equals, to_int32, to_uint32, ErrorKind, FunctionKind, RuntimeError, Value,
};
use indexmap::IndexMap;
use std::cmp::Ordering;

impl Interpreter {
    /// Evaluate an expression
    pub(crate) fn eval_expr(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Number(n, _) => Ok(Value::Number(*n)),
            Expr::String(s, _) => Ok(Value::String(s.clone())),
            Expr::Bool(b, _) => Ok(Value::Bool(*b)),
            Expr::Null(_) => Ok(Value::Null),
            Expr::Template {
                quasis,
                expressions,
                ..
            } => self.eval_template(quasis, expressions),
            Expr::Identifier(id) => self.lookup_variable(&id.name),
            Expr::This(_) => Ok(self.current_this()),
            Expr::Array { elements, .. } => self.eval_array_literal(elements),
            Expr::Object { properties, .. } => self.eval_object_literal(properties),
            Expr::Function(node) => Ok(self.make_function_expression(node, None)),
            Expr::Class(node) => self.define_class(node, None),
            Expr::Unary { op, operand, .. } => self.eval_unary(*op, operand),
            Expr::Update {
                op, prefix, target, ..
            } => self.eval_update(*op, *prefix, target),
            Expr::Binary {
                op, left, right, ..
            } => {
                let left = self.eval_expr(left)?;
                let right = self.eval_expr(right)?;
                self.binary_op(*op, &left, &right)
            }
            Expr::Logical {
                op, left, right, ..
            } => {
                let left = self.eval_expr(left)?;
                if short_circuits(*op, &left) {
                    Ok(left)
                } else {
                    self.eval_expr(right)
                }
            }
            Expr::Conditional {
                test,
                consequent,
                alternate,
                ..
            } => {
                if self.eval_expr(test)?.is_truthy() {
                    self.eval_expr(consequent)
                } else {
                    self.eval_expr(alternate)
                }
            }
            Expr::Assign {
                op, target, value, ..
            } => self.eval_assign(*op, target, value),
            Expr::Sequence(expressions, _) => {
                let mut last = Value::Undefined;
                for expr in expressions {
                    last = self.eval_expr(expr)?;
                }
                Ok(last)
            }
            Expr::Member { .. } | Expr::Call { .. } | Expr::OptionalChain(..) => {
                let inner = match expr {
                    Expr::OptionalChain(inner, _) => inner.as_ref(),
                    _ => expr,
                };
                Ok(self.eval_chain(inner)?.unwrap_or_default())
            }
            Expr::New { callee, args, .. } => {
                let constructor = self.eval_expr(callee)?;
                let args = self.eval_arguments(args)?;
                if !constructor.is_callable() {
                    return Err(RuntimeError::type_error(format!(
                        "{} is not a constructor",
                        describe_callee(callee)
                    )));
                }
                self.construct(&constructor, &args)
            }
            Expr::SuperCall { args, .. } => {
                let home = self
                    .current_home()
                    .ok_or_else(|| RuntimeError::syntax_error("'super' keyword unexpected here"))?;
                let this = self.current_this();
                let args = self.eval_arguments(args)?;
                if let Some(parent) = &home.parent {
                    self.construct_parent(parent, &this, &args)?;
                }
                self.init_fields(&home, &this)?;
                Ok(Value::Undefined)
            }
            Expr::SuperMember { property, .. } => {
                let name = self.member_key(property)?.to_string();
                self.super_property(&name)
            }
        }
    }

    /// Evaluate, naming anonymous functions and classes after their binding
    pub(crate) fn eval_named(&mut self, expr: &Expr, name: Option<&str>) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Function(node) if node.name.is_none() => Ok(self.make_closure(node, name, None)),
            Expr::Class(node) if node.name.is_none() => self.define_class(node, name),
            other => self.eval_expr(other),
        }
    }

    /// Evaluate a member/call chain; `None` when a `?.` short-circuits
    fn eval_chain(&mut self, expr: &Expr) -> Result<Option<Value>, RuntimeError> {
        match expr {
            Expr::Member {
                object,
                property,
                optional,
                ..
            } => {
                let Some(target) = self.eval_chain(object)? else {
                    return Ok(None);
                };
                if *optional && target.is_nullish() {
                    return Ok(None);
                }
                let key = self.member_key(property)?;
                self.get_property(&target, &key).map(Some)
            }
            Expr::Call {
                callee,
                args,
                optional,
                ..
            } => {
                let Some((this, function)) = self.eval_callee(callee)? else {
                    return Ok(None);
                };
                if *optional && function.is_nullish() {
                    return Ok(None);
                }
                let args = self.eval_arguments(args)?;
                if !function.is_callable() {
                    return Err(RuntimeError::type_error(format!(
                        "{} is not a function",
                        describe_callee(callee)
                    )));
                }
                self.call_function(&function, this, &args).map(Some)
            }
            other => self.eval_expr(other).map(Some),
        }
    }

    /// Resolve a callee to `(this, function)`
    fn eval_callee(&mut self, callee: &Expr) -> Result<Option<(Value, Value)>, RuntimeError> {
        match callee {
            Expr::Member {
                object,
                property,
                optional,
                ..
            } => {
                let Some(target) = self.eval_chain(object)? else {
                    return Ok(None);
                };
                if *optional && target.is_nullish() {
                    return Ok(None);
                }
                let key = self.member_key(property)?;
                let function = self.get_property(&target, &key)?;
                Ok(Some((target, function)))
            }
            Expr::SuperMember { property, .. } => {
                let name = self.member_key(property)?.to_string();
                let function = self.super_property(&name)?;
                Ok(Some((self.current_this(), function)))
            }
            other => Ok(self
                .eval_chain(other)?
                .map(|function| (Value::Undefined, function))),
        }
    }

    /// Evaluate call arguments, expanding spreads
    pub(crate) fn eval_arguments(&mut self, args: &[Argument]) -> Result<Vec<Value>, RuntimeError> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            match arg {
                Argument::Expr(expr) => values.push(self.eval_expr(expr)?),
                Argument::Spread(expr) => {
                    let iterable = self.eval_expr(expr)?;
                    values.extend(self.iterate(&iterable)?);
                }
            }
        }
        Ok(values)
    }

    fn eval_template(&mut self, quasis: &[std::rc::Rc<str>], expressions: &[Expr]) -> Result<Value, RuntimeError> {
        let mut result = String::new();
        for (i, quasi) in quasis.iter().enumerate() {
            result.push_str(quasi);
            if let Some(expr) = expressions.get(i) {
                let value = self.eval_expr(expr)?;
                result.push_str(&self.to_string(&value)?);
            }
        }
        Ok(Value::string(result))
    }

    fn eval_array_literal(&mut self, elements: &[ArrayElement]) -> Result<Value, RuntimeError> {
        let mut items = Vec::with_capacity(elements.len());
        for element in elements {
            match element {
                ArrayElement::Expr(expr) => items.push(self.eval_expr(expr)?),
                ArrayElement::Spread(expr) => {
                    let iterable = self.eval_expr(expr)?;
                    items.extend(self.iterate(&iterable)?);
                }
                ArrayElement::Hole => items.push(Value::Undefined),
            }
        }
        Ok(Value::array(items))
    }

    fn eval_object_literal(&mut self, properties: &[ObjectProperty]) -> Result<Value, RuntimeError> {
        let mut map = IndexMap::new();
        for property in properties {
            match property {
                ObjectProperty::KeyValue { key, value, .. } => {
                    let key = match key {
                        PropertyKey::Named(name) => name.clone(),
                        PropertyKey::Computed(expr) => {
                            let key = self.eval_expr(expr)?;
                            self.to_key(&key)?.to_string()
                        }
                    };
                    let value = self.eval_named(value, Some(&key))?;
                    map.insert(key, value);
                }
                ObjectProperty::Spread(expr) => {
                    let source = self.eval_expr(expr)?;
                    self.copy_own_properties(&source, &mut map)?;
                }
            }
        }
        Ok(Value::object(map))
    }

    /// Copy own enumerable properties, as spread and `Object.assign` do
    pub(crate) fn copy_own_properties(
        &mut self,
        source: &Value,
        target: &mut IndexMap<String, Value>,
    ) -> Result<(), RuntimeError> {
        match source {
            Value::Object(obj) => {
                let obj = obj.borrow();
                for key in ordered_keys(&obj.properties) {
                    if let Some(value) = obj.properties.get(&key) {
                        target.insert(key, value.clone());
                    }
                }
            }
            Value::Array(items) => {
                for (i, item) in items.borrow().iter().enumerate() {
                    target.insert(i.to_string(), item.clone());
                }
            }
            Value::String(s) => {
                for (i, c) in s.chars().enumerate() {
                    target.insert(i.to_string(), Value::string(c.to_string()));
                }
            }
            Value::Function(f) => {
                for (key, value) in f.properties.borrow().iter() {
                    target.insert(key.clone(), value.clone());
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn eval_unary(&mut self, op: UnaryOp, operand: &Expr) -> Result<Value, RuntimeError> {
        match op {
            UnaryOp::Typeof => {
                // An undeclared name is not an error here
                if let Expr::Identifier(id) = operand {
                    return Ok(match Scope::lookup(&self.env, &id.name)? {
                        Some(value) => Value::string(value.type_of()),
                        None => Value::string("undefined"),
                    });
                }
                let value = self.eval_expr(operand)?;
                Ok(Value::string(value.type_of()))
            }
            UnaryOp::Delete => match operand {
                Expr::Member {
                    object, property, ..
                } => {
                    let target = self.eval_expr(object)?;
                    let key = self.member_key(property)?;
                    self.delete_property(&target, &key).map(Value::Bool)
                }
                Expr::Identifier(_) => Ok(Value::Bool(false)),
                other => {
                    self.eval_expr(other)?;
                    Ok(Value::Bool(true))
                }
            },
            UnaryOp::Not => Ok(Value::Bool(!self.eval_expr(operand)?.is_truthy())),
            UnaryOp::Negate => {
                let value = self.eval_expr(operand)?;
                Ok(Value::Number(-self.to_number(&value)?))
            }
            UnaryOp::Plus => {
                let value = self.eval_expr(operand)?;
                Ok(Value::Number(self.to_number(&value)?))
            }
            UnaryOp::BitNot => {
                let value = self.eval_expr(operand)?;
                Ok(Value::Number(!to_int32(self.to_number(&value)?) as f64))
            }
            UnaryOp::Void => {
                self.eval_expr(operand)?;
                Ok(Value::Undefined)
            }
        }
    }

    fn eval_update(&mut self, op: UpdateOp, prefix: bool, target: &Expr) -> Result<Value, RuntimeError> {
        let delta = match op {
            UpdateOp::Increment => 1.0,
            UpdateOp::Decrement => -1.0,
        };
        match target {
            Expr::Identifier(id) => {
                let old = self.lookup_variable(&id.name)?;
                let old = self.to_number(&old)?;
                self.set_variable(&id.name, Value::Number(old + delta))?;
                Ok(Value::Number(if prefix { old + delta } else { old }))
            }
            Expr::Member {
                object, property, ..
            } => {
                let object = self.eval_expr(object)?;
                let key = self.member_key(property)?;
                let old = self.get_property(&object, &key)?;
                let old = self.to_number(&old)?;
                self.set_property(&object, key, Value::Number(old + delta))?;
                Ok(Value::Number(if prefix { old + delta } else { old }))
            }
            _ => Err(RuntimeError::syntax_error(
                "Invalid left-hand side expression in update operation",
            )),
        }
    }

    fn eval_assign(&mut self, op: AssignOp, target: &Pattern, value: &Expr) -> Result<Value, RuntimeError> {
        match (op, target) {
            (AssignOp::Assign, Pattern::Identifier(id)) => {
                let value = self.eval_named(value, Some(&id.name))?;
                self.set_variable(&id.name, value.clone())?;
                Ok(value)
            }
            (AssignOp::Assign, Pattern::Member(member)) => {
                let (object, key) = self.eval_reference(member)?;
                let value = self.eval_expr(value)?;
                self.set_property(&object, key, value.clone())?;
                Ok(value)
            }
            (AssignOp::Assign, pattern) => {
                let value = self.eval_expr(value)?;
                self.bind_pattern(pattern, value.clone(), BindMode::Assign)?;
                Ok(value)
            }
            (op, Pattern::Identifier(id)) => {
                let current = self.lookup_variable(&id.name)?;
                let Some(result) = self.combine(op, current, value, Some(&id.name))? else {
                    return self.lookup_variable(&id.name);
                };
                self.set_variable(&id.name, result.clone())?;
                Ok(result)
            }
            (op, Pattern::Member(member)) => {
                let (object, key) = self.eval_reference(member)?;
                let current = self.get_property(&object, &key)?;
                let Some(result) = self.combine(op, current.clone(), value, None)? else {
                    return Ok(current);
                };
                self.set_property(&object, key, result.clone())?;
                Ok(result)
            }
            _ => Err(RuntimeError::syntax_error("Invalid left-hand side in assignment")),
        }
    }

    /// New value for a compound assignment; `None` when a logical one short-circuits
    fn combine(
        &mut self,
        op: AssignOp,
        current: Value,
        value: &Expr,
        name: Option<&str>,
    ) -> Result<Option<Value>, RuntimeError> {
        match op {
            AssignOp::Compound(op) => {
                let right = self.eval_expr(value)?;
                self.binary_op(op, &current, &right).map(Some)
            }
            AssignOp::Logical(op) => {
                if short_circuits(op, &current) {
                    Ok(None)
                } else {
                    self.eval_named(value, name).map(Some)
                }
            }
            AssignOp::Assign => self.eval_expr(value).map(Some),
        }
    }

    fn eval_reference(&mut self, member: &Expr) -> Result<(Value, Key), RuntimeError> {
        match member {
            Expr::Member {
                object, property, ..
            } => {
                let object = self.eval_expr(object)?;
                let key = self.member_key(property)?;
                Ok((object, key))
            }
            _ => Err(RuntimeError::syntax_error("Invalid left-hand side in assignment")),
        }
    }

    /// Apply a binary operator to evaluated operands
    pub(crate) fn binary_op(&mut self, op: BinaryOp, left: &Value, right: &Value) -> Result<Value, RuntimeError> {
        Ok(match op {
            BinaryOp::Add => {
                if let (Value::Number(a), Value::Number(b)) = (left, right) {
                    return Ok(Value::Number(a + b));
                }
                let left = self.to_primitive(left, Hint::Default)?;
                let right = self.to_primitive(right, Hint::Default)?;
                if matches!(left, Value::String(_)) || matches!(right, Value::String(_)) {
                    let mut s = left.to_display_string();
                    s.push_str(&right.to_display_string());
                    Value::string(s)
                } else {
                    Value::Number(left.to_number() + right.to_number())
                }
            }
            BinaryOp::Sub => self.numeric(left, right, |a, b| a - b)?,
            BinaryOp::Mul => self.numeric(left, right, |a, b| a * b)?,
            BinaryOp::Div => self.numeric(left, right, |a, b| a / b)?,
            BinaryOp::Mod => self.numeric(left, right, |a, b| a % b)?,
            BinaryOp::Exp => self.numeric(left, right, power)?,
            BinaryOp::BitAnd => self.numeric(left, right, |a, b| (to_int32(a) & to_int32(b)) as f64)?,
            BinaryOp::BitOr => self.numeric(left, right, |a, b| (to_int32(a) | to_int32(b)) as f64)?,
            BinaryOp::BitXor => self.numeric(left, right, |a, b| (to_int32(a) ^ to_int32(b)) as f64)?,
            BinaryOp::Shl => self.numeric(left, right, |a, b| {
                to_int32(a).wrapping_shl(to_uint32(b) & 31) as f64
            })?,
            BinaryOp::Shr => self.numeric(left, right, |a, b| {
                to_int32(a).wrapping_shr(to_uint32(b) & 31) as f64
            })?,
            BinaryOp::UShr => self.numeric(left, right, |a, b| {
                to_uint32(a).wrapping_shr(to_uint32(b) & 31) as f64
            })?,
            BinaryOp::StrictEq => Value::Bool(strict_equals(left, right)),
            BinaryOp::StrictNotEq => Value::Bool(!strict_equals(left, right)),
            BinaryOp::Eq => Value::Bool(self.loose_eq(left, right)?),
            BinaryOp::NotEq => Value::Bool(!self.loose_eq(left, right)?),
            BinaryOp::Lt => Value::Bool(self.compare(left, right)? == Some(Ordering::Less)),
            BinaryOp::Gt => Value::Bool(self.compare(left, right)? == Some(Ordering::Greater)),
            BinaryOp::Le => Value::Bool(matches!(
                self.compare(left, right)?,
                Some(Ordering::Less | Ordering::Equal)
            )),
            BinaryOp::Ge => Value::Bool(matches!(
                self.compare(left, right)?,
                Some(Ordering::Greater | Ordering::Equal)
            )),
            BinaryOp::In => {
                let key = self.to_key(left)?;
                Value::Bool(self.has_property(right, &key)?)
            }
            BinaryOp::Instanceof => Value::Bool(instance_of(left, right)?),
        })
    }

    fn numeric(&mut self, left: &Value, right: &Value, f: impl Fn(f64, f64) -> f64) -> Result<Value, RuntimeError> {
        let a = self.to_number(left)?;
        let b = self.to_number(right)?;
        Ok(Value::Number(f(a, b)))
    }

    /// Abstract relational comparison; `None` when either side is NaN
    pub(crate) fn compare(&mut self, left: &Value, right: &Value) -> Result<Option<Ordering>, RuntimeError> {
        let left = self.to_primitive(left, Hint::Number)?;
        let right = self.to_primitive(right, Hint::Number)?;
        if let (Value::String(a), Value::String(b)) = (&left, &right) {
            return Ok(Some(a.encode_utf16().cmp(b.encode_utf16())));
        }
        Ok(left.to_number().partial_cmp(&right.to_number()))
    }

    fn loose_eq(&mut self, left: &Value, right: &Value) -> Result<bool, RuntimeError> {
        match (left, right) {
            (Value::Object(_), Value::Object(_)) => Ok(strict_equals(left, right)),
            (Value::Object(_), other) if !other.is_nullish() => {
                let primitive = self.to_primitive(left, Hint::Default)?;
                Ok(loose_equals(&primitive, other))
            }
            (other, Value::Object(_)) if !other.is_nullish() => {
                let primitive = self.to_primitive(right, Hint::Default)?;
                Ok(loose_equals(other, &primitive))
            }
            _ => Ok(loose_equals(left, right)),
        }
    }
}

fn short_circuits(op: LogicalOp, left: &Value) -> bool {
    match op {
        LogicalOp::And => !left.is_truthy(),
        LogicalOp::Or => left.is_truthy(),
        LogicalOp::Nullish => !left.is_nullish(),
    }
}

/// `**`: a base of ±1 with an infinite exponent is NaN
fn power(base: f64, exponent: f64) -> f64 {
    if exponent.is_nan() || (base.abs() == 1.0 && exponent.is_infinite()) {
        f64::NAN
    } else {
        base.powf(exponent)
    }
}

fn instance_of(value: &Value, constructor: &Value) -> Result<bool, RuntimeError> {
    let Value::Function(function) = constructor else {
        return Err(RuntimeError::type_error(
            "Right-hand side of 'instanceof' is not callable",
        ));
    };
    Ok(match &function.kind {
        FunctionKind::Class(class) => match value {
            Value::Object(obj) => obj
                .borrow()
                .class
                .as_ref()
                .is_some_and(|c| c.is_subclass_of(class)),
            _ => false,
        },
        FunctionKind::Native(native) => match (&*native.name, value) {
            ("Array", Value::Array(_)) => true,
            ("Function", Value::Function(_)) => true,
            ("Map", Value::Map(_)) => true,
            ("Set", Value::Set(_)) => true,
            (
                "Object",
                Value::Object(_) | Value::Array(_) | Value::Function(_) | Value::Map(_) | Value::Set(_),
            ) => true,
            (name, Value::Object(obj)) => match &obj.borrow().error {
                Some(error) => {
                    name == ErrorKind::Error.name() || name == error.kind.name()
                }
                None => false,
            },
            _ => false,
        },
        FunctionKind::Bound { target, .. } => {
            instance_of(value, &Value::Function(target.clone()))?
        }
        FunctionKind::Closure(_) => false,
    })
}

/// Source-like rendering of a callee for error messages
pub(crate) fn describe_callee(expr: &Expr) -> String {
    match expr {
        Expr::Identifier(id) => id.name.clone(),
        Expr::This(_) => "this".to_string(),
        Expr::Member {
            object, property, ..
        } => match property {
            MemberProperty::Named(name) => format!("{}.{}", describe_callee(object), name),
            MemberProperty::Computed(_) => format!("{}[...]", describe_callee(object)),
        },
        Expr::SuperMember {
            property: MemberProperty::Named(name),
            ..
        } => format!("(intermediate value).{}", name),
        Expr::Call { callee, .. } => format!("{}(...)", describe_callee(callee)),
        Expr::OptionalChain(inner, _) => describe_callee(inner),
        _ => "(intermediate value)".to_string(),
    }
}
