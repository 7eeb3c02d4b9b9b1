//! Destructuring and binding of patterns

use crate::ast::{Expr, MemberProperty, Pattern, PropertyKey};
use crate::interpreter::property::Key;
use crate::interpreter::{Interpreter, Scope};
use crate::value::{RuntimeError, Value};
use indexmap::IndexMap;

/// How a pattern introduces its names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BindMode {
    /// `let`, `const`, parameters and catch bindings in the current scope
    Declare { mutable: bool },
    /// `var`; the name was hoisted to the function scope
    Var,
    /// Plain assignment to existing targets
    Assign,
}

impl Interpreter {
    /// Bind `value` to every name in `pattern`
    pub(crate) fn bind_pattern(
        &mut self,
        pattern: &Pattern,
        value: Value,
        mode: BindMode,
    ) -> Result<(), RuntimeError> {
        match pattern {
            Pattern::Identifier(id) => match mode {
                BindMode::Declare { mutable } => {
                    Scope::declare(&self.env, &id.name, value, mutable);
                    Ok(())
                }
                BindMode::Var | BindMode::Assign => self.set_variable(&id.name, value),
            },
            Pattern::Member(expr) => self.assign_member(expr, value),
            Pattern::Default {
                target, default, ..
            } => {
                let value = match value {
                    Value::Undefined => {
                        let hint = match target.as_ref() {
                            Pattern::Identifier(id) => Some(id.name.clone()),
                            _ => None,
                        };
                        self.eval_named(default, hint.as_deref())?
                    }
                    other => other,
                };
                self.bind_pattern(target, value, mode)
            }
            Pattern::Array { elements, rest, .. } => {
                if value.is_nullish() {
                    return Err(RuntimeError::type_error(format!(
                        "{} is not iterable",
                        value.to_display_string()
                    )));
                }
                let items = self.iterate(&value)?;
                for (i, element) in elements.iter().enumerate() {
                    if let Some(element) = element {
                        let item = items.get(i).cloned().unwrap_or_default();
                        self.bind_pattern(element, item, mode)?;
                    }
                }
                if let Some(rest) = rest {
                    let remaining = items.get(elements.len()..).unwrap_or(&[]).to_vec();
                    self.bind_pattern(rest, Value::array(remaining), mode)?;
                }
                Ok(())
            }
            Pattern::Object {
                properties, rest, ..
            } => {
                if value.is_nullish() {
                    let first = properties.first().and_then(|p| match &p.key {
                        PropertyKey::Named(name) => Some(name.clone()),
                        PropertyKey::Computed(_) => None,
                    });
                    return Err(RuntimeError::type_error(match first {
                        Some(name) => format!(
                            "Cannot destructure property '{}' of '{}' as it is {}.",
                            name,
                            value.to_display_string(),
                            value.to_display_string()
                        ),
                        None => format!(
                            "Cannot destructure '{}' as it is {}.",
                            value.to_display_string(),
                            value.to_display_string()
                        ),
                    }));
                }

                let mut used = Vec::with_capacity(properties.len());
                for property in properties {
                    let key = match &property.key {
                        PropertyKey::Named(name) => Key::from_name(name),
                        PropertyKey::Computed(expr) => {
                            let key = self.eval_expr(expr)?;
                            self.to_key(&key)?
                        }
                    };
                    used.push(key.to_string());
                    let item = self.get_property(&value, &key)?;
                    self.bind_pattern(&property.value, item, mode)?;
                }

                if let Some(rest) = rest {
                    let mut remaining = IndexMap::new();
                    for key in self.enumerable_keys(&value) {
                        if used.contains(&key) {
                            continue;
                        }
                        let item = self.get_property(&value, &Key::from_name(&key))?;
                        remaining.insert(key, item);
                    }
                    self.bind_pattern(rest, Value::object(remaining), mode)?;
                }
                Ok(())
            }
        }
    }

    /// `obj.x = value` / `arr[i] = value`
    fn assign_member(&mut self, expr: &Expr, value: Value) -> Result<(), RuntimeError> {
        match expr {
            Expr::Member {
                object, property, ..
            } => {
                let target = self.eval_expr(object)?;
                let key = self.member_key(property)?;
                self.set_property(&target, key, value)
            }
            other => Err(RuntimeError::syntax_error(format!(
                "Invalid assignment target at {}",
                other.span().start
            ))),
        }
    }

    /// Resolve the key of a member expression
    pub(crate) fn member_key(&mut self, property: &MemberProperty) -> Result<Key, RuntimeError> {
        match property {
            MemberProperty::Named(name) => Ok(Key::from_name(name)),
            MemberProperty::Computed(expr) => {
                let key = self.eval_expr(expr)?;
                self.to_key(&key)
            }
        }
    }
}
