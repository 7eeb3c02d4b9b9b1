//! Property access and conversions that may run user code

use crate::interpreter::Interpreter;
use crate::value::{
    error_string, number_to_index, number_to_string, parse_index, ClassParent, Function,
    FunctionKind, ObjectRef, RuntimeError, Value,
};
use std::fmt;
use std::rc::Rc;

/// Largest gap a single write may open at the end of an array
const MAX_ARRAY_GROWTH: usize = 10_000_000;

/// A property key after ToPropertyKey
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Index(usize),
    Name(Rc<str>),
}

impl Key {
    pub fn from_name(name: &str) -> Key {
        match parse_index(name) {
            Some(index) => Key::Index(index),
            None => Key::Name(Rc::from(name)),
        }
    }

    fn name(&self) -> Option<&str> {
        match self {
            Key::Name(name) => Some(name),
            Key::Index(_) => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Index(i) => write!(f, "{}", i),
            Key::Name(name) => write!(f, "{}", name),
        }
    }
}

/// Preferred type for ToPrimitive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Hint {
    Default,
    Number,
    String,
}

impl Interpreter {
    /// ToPropertyKey
    pub(crate) fn to_key(&mut self, value: &Value) -> Result<Key, RuntimeError> {
        Ok(match value {
            Value::Number(n) => match number_to_index(*n) {
                Some(index) => Key::Index(index),
                None => Key::Name(Rc::from(number_to_string(*n))),
            },
            Value::String(s) => Key::from_name(s),
            other => {
                let s = self.to_string(other)?;
                Key::from_name(&s)
            }
        })
    }

    /// Read `target[key]`
    pub fn get_property(&mut self, target: &Value, key: &Key) -> Result<Value, RuntimeError> {
        match target {
            Value::Undefined | Value::Null => Err(RuntimeError::type_error(format!(
                "Cannot read properties of {} (reading '{}')",
                target.to_display_string(),
                key
            ))),
            Value::Array(items) => match key {
                Key::Index(i) => Ok(items.borrow().get(*i).cloned().unwrap_or_default()),
                Key::Name(name) if &**name == "length" => Ok(Value::Number(items.borrow().len() as f64)),
                Key::Name(name) => Ok(self.prototype_lookup(&self.prototypes.array, name)),
            },
            Value::String(s) => match key {
                Key::Index(i) => Ok(s
                    .chars()
                    .nth(*i)
                    .map(|c| Value::string(c.to_string()))
                    .unwrap_or_default()),
                Key::Name(name) if &**name == "length" => Ok(Value::Number(s.chars().count() as f64)),
                Key::Name(name) => Ok(self.prototype_lookup(&self.prototypes.string, name)),
            },
            Value::Number(_) => Ok(self.prototype_lookup(&self.prototypes.number, &key.to_string())),
            Value::Bool(_) => Ok(self.prototype_lookup(&self.prototypes.boolean, &key.to_string())),
            Value::Object(obj) => Ok(self.object_property(obj, &key.to_string())),
            Value::Function(f) => Ok(self.function_property(f, &key.to_string())),
            Value::Map(map) => match key.name() {
                Some("size") => Ok(Value::Number(map.borrow().len() as f64)),
                _ => Ok(self.prototype_lookup(&self.prototypes.map, &key.to_string())),
            },
            Value::Set(set) => match key.name() {
                Some("size") => Ok(Value::Number(set.borrow().len() as f64)),
                _ => Ok(self.prototype_lookup(&self.prototypes.set, &key.to_string())),
            },
        }
    }

    /// Read a property by name
    pub fn get_named(&mut self, target: &Value, name: &str) -> Result<Value, RuntimeError> {
        self.get_property(target, &Key::from_name(name))
    }

    pub(super) fn prototype_lookup(&self, table: &indexmap::IndexMap<&'static str, Value>, name: &str) -> Value {
        table
            .get(name)
            .or_else(|| self.prototypes.object.get(name))
            .cloned()
            .unwrap_or_default()
    }

    fn object_property(&self, obj: &ObjectRef, name: &str) -> Value {
        let object = obj.borrow();
        if let Some(value) = object.properties.get(name) {
            return value.clone();
        }
        if let Some(error) = &object.error {
            match name {
                "name" => return Value::String(error.name.clone()),
                "message" => return Value::String(error.message.clone()),
                "stack" => {
                    return Value::string(format!(
                        "{}\n    at <anonymous>",
                        error_string(&error.name, &error.message)
                    ))
                }
                _ => {}
            }
        }
        if let Some(class) = &object.class {
            if let Some(method) = class.find_method(name) {
                return method;
            }
        }
        self.prototypes.object.get(name).cloned().unwrap_or_default()
    }

    pub(super) fn function_property(&self, function: &Rc<Function>, name: &str) -> Value {
        if let Some(value) = function.properties.borrow().get(name) {
            return value.clone();
        }
        // Static members are inherited along the class chain
        if let FunctionKind::Class(class) = &function.kind {
            if let Some(ClassParent::Class(parent)) = &class.parent {
                let inherited = self.function_property(parent, name);
                if !matches!(inherited, Value::Undefined) {
                    return inherited;
                }
            }
        }
        match name {
            "name" => Value::String(function.name()),
            "length" => Value::Number(function.arity() as f64),
            _ => self.prototype_lookup(&self.prototypes.function, name),
        }
    }

    /// Write `target[key] = value`
    pub fn set_property(&mut self, target: &Value, key: Key, value: Value) -> Result<(), RuntimeError> {
        match target {
            Value::Undefined | Value::Null => Err(RuntimeError::type_error(format!(
                "Cannot set properties of {} (setting '{}')",
                target.to_display_string(),
                key
            ))),
            Value::Array(items) => match key {
                Key::Index(i) => {
                    let mut items = items.borrow_mut();
                    if i < items.len() {
                        items[i] = value;
                    } else if i - items.len() > MAX_ARRAY_GROWTH {
                        return Err(RuntimeError::range_error("Invalid array length"));
                    } else {
                        items.resize(i, Value::Undefined);
                        items.push(value);
                    }
                    Ok(())
                }
                Key::Name(name) if &*name == "length" => {
                    let length = self.to_number(&value)?;
                    let new_len = number_to_index(length)
                        .ok_or_else(|| RuntimeError::range_error("Invalid array length"))?;
                    let mut items = items.borrow_mut();
                    if new_len > items.len() + MAX_ARRAY_GROWTH {
                        return Err(RuntimeError::range_error("Invalid array length"));
                    }
                    items.resize(new_len, Value::Undefined);
                    Ok(())
                }
                Key::Name(_) => Ok(()),
            },
            Value::Object(obj) => {
                let mut object = obj.borrow_mut();
                if object.frozen {
                    return Ok(());
                }
                let name = key.to_string();
                if let Some(error) = object.error.as_mut() {
                    if name == "message" {
                        error.message = Rc::from(value.to_display_string());
                        return Ok(());
                    }
                }
                object.properties.insert(name, value);
                Ok(())
            }
            Value::Function(f) => {
                f.properties.borrow_mut().insert(key.to_string(), value);
                Ok(())
            }
            // Writes to primitives and collections are dropped
            _ => Ok(()),
        }
    }

    /// The `in` operator
    pub(crate) fn has_property(&mut self, target: &Value, key: &Key) -> Result<bool, RuntimeError> {
        Ok(match target {
            Value::Array(items) => match key {
                Key::Index(i) => *i < items.borrow().len(),
                Key::Name(name) => {
                    &**name == "length"
                        || self.prototypes.array.contains_key(&**name)
                        || self.prototypes.object.contains_key(&**name)
                }
            },
            Value::Object(obj) => {
                let name = key.to_string();
                {
                    let object = obj.borrow();
                    if object.properties.contains_key(&name) {
                        return Ok(true);
                    }
                    if object.error.is_some() && matches!(name.as_str(), "name" | "message" | "stack") {
                        return Ok(true);
                    }
                    if let Some(class) = &object.class {
                        if class.find_method(&name).is_some() {
                            return Ok(true);
                        }
                    }
                }
                self.prototypes.object.contains_key(name.as_str())
            }
            Value::Function(f) => {
                let name = key.to_string();
                !matches!(self.function_property(f, &name), Value::Undefined)
            }
            Value::Map(_) | Value::Set(_) => {
                key.name() == Some("size")
                    || !matches!(self.get_property(target, key)?, Value::Undefined)
            }
            other => {
                return Err(RuntimeError::type_error(format!(
                    "Cannot use 'in' operator to search for '{}' in {}",
                    key,
                    other.to_display_string()
                )))
            }
        })
    }

    /// The `delete` operator
    pub(crate) fn delete_property(&mut self, target: &Value, key: &Key) -> Result<bool, RuntimeError> {
        match target {
            Value::Undefined | Value::Null => Err(RuntimeError::type_error(format!(
                "Cannot convert undefined or null to object (deleting '{}')",
                key
            ))),
            Value::Object(obj) => {
                let mut object = obj.borrow_mut();
                if object.frozen {
                    return Ok(false);
                }
                object.properties.shift_remove(&key.to_string());
                Ok(true)
            }
            Value::Array(items) => {
                if let Key::Index(i) = key {
                    if let Some(slot) = items.borrow_mut().get_mut(*i) {
                        *slot = Value::Undefined;
                    }
                }
                Ok(true)
            }
            Value::Function(f) => {
                f.properties.borrow_mut().shift_remove(&key.to_string());
                Ok(true)
            }
            _ => Ok(true),
        }
    }

    // === Conversions ===

    /// A method the script defined itself (own property or class method)
    fn user_method(&self, value: &Value, name: &str) -> Option<Value> {
        let Value::Object(obj) = value else {
            return None;
        };
        let object = obj.borrow();
        if let Some(method @ Value::Function(_)) = object.properties.get(name) {
            return Some(method.clone());
        }
        object.class.as_ref().and_then(|class| class.find_method(name))
    }

    /// ToPrimitive; objects may supply `valueOf` / `toString`
    pub(crate) fn to_primitive(&mut self, value: &Value, hint: Hint) -> Result<Value, RuntimeError> {
        if !matches!(value, Value::Object(_)) {
            return Ok(match value {
                Value::Array(_) | Value::Function(_) | Value::Map(_) | Value::Set(_) => {
                    Value::string(self.to_string(value)?)
                }
                other => other.clone(),
            });
        }

        let order = match hint {
            Hint::String => ["toString", "valueOf"],
            Hint::Default | Hint::Number => ["valueOf", "toString"],
        };
        for name in order {
            if let Some(method) = self.user_method(value, name) {
                let result = self.call_function(&method, value.clone(), &[])?;
                if !matches!(
                    result,
                    Value::Array(_) | Value::Object(_) | Value::Function(_) | Value::Map(_) | Value::Set(_)
                ) {
                    return Ok(result);
                }
            }
        }
        Ok(Value::string(value.to_display_string()))
    }

    /// ToString honouring user-defined `toString`
    pub fn to_string(&mut self, value: &Value) -> Result<String, RuntimeError> {
        match value {
            Value::Object(_) => {
                let primitive = self.to_primitive(value, Hint::String)?;
                Ok(primitive.to_display_string())
            }
            Value::Array(items) => {
                // Elements may be instances with their own toString
                let snapshot = items.borrow().clone();
                if !snapshot.iter().any(|v| matches!(v, Value::Object(_))) {
                    return Ok(value.to_display_string());
                }
                let mut parts = Vec::with_capacity(snapshot.len());
                for item in &snapshot {
                    parts.push(match item {
                        Value::Undefined | Value::Null => String::new(),
                        Value::Object(_) => self.to_string(item)?,
                        other => other.to_display_string(),
                    });
                }
                Ok(parts.join(","))
            }
            other => Ok(other.to_display_string()),
        }
    }

    /// ToNumber honouring user-defined `valueOf`
    pub(crate) fn to_number(&mut self, value: &Value) -> Result<f64, RuntimeError> {
        match value {
            Value::Object(_) => {
                let primitive = self.to_primitive(value, Hint::Number)?;
                Ok(primitive.to_number())
            }
            other => Ok(other.to_number()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_key_from_name() {
        assert_eq!(Key::from_name("3"), Key::Index(3));
        assert_eq!(Key::from_name("03"), Key::Name(Rc::from("03")));
        assert_eq!(Key::from_name("x").to_string(), "x");
    }
}
