//! `Object` built-ins and the methods every object inherits

use super::{arg, method, MethodTable};
use crate::interpreter::Interpreter;
use crate::value::{parse_index, Function, RuntimeError, Value};
use indexmap::IndexMap;

/// Own keys in enumeration order: integer keys ascending, then insertion order
pub fn ordered_keys(properties: &IndexMap<String, Value>) -> Vec<String> {
    let mut indices: Vec<(usize, &String)> = Vec::new();
    let mut names = Vec::new();
    for key in properties.keys() {
        match parse_index(key) {
            Some(index) => indices.push((index, key)),
            None => names.push(key.clone()),
        }
    }
    if indices.is_empty() {
        return names;
    }
    indices.sort_by_key(|(index, _)| *index);
    indices
        .into_iter()
        .map(|(_, key)| key.clone())
        .chain(names)
        .collect()
}

fn own_keys(interp: &Interpreter, target: &Value) -> Result<Vec<String>, RuntimeError> {
    match target {
        Value::Undefined | Value::Null => Err(RuntimeError::type_error(
            "Cannot convert undefined or null to object",
        )),
        other => Ok(interp.enumerable_keys(other)),
    }
}

fn has_own(target: &Value, key: &str) -> bool {
    match target {
        Value::Object(obj) => obj.borrow().properties.contains_key(key),
        Value::Array(items) => {
            key == "length" || parse_index(key).is_some_and(|i| i < items.borrow().len())
        }
        Value::String(s) => {
            key == "length" || parse_index(key).is_some_and(|i| i < s.chars().count())
        }
        Value::Function(f) => f.properties.borrow().contains_key(key),
        _ => false,
    }
}

fn object_statics() -> MethodTable {
    let mut table = MethodTable::new();
    method(&mut table, "keys", 1, |interp, _, args| {
        let keys = own_keys(interp, &arg(args, 0))?;
        Ok(Value::array(keys.into_iter().map(Value::from).collect()))
    });
    method(&mut table, "values", 1, |interp, _, args| {
        let target = arg(args, 0);
        let mut values = Vec::new();
        for key in own_keys(interp, &target)? {
            values.push(interp.get_named(&target, &key)?);
        }
        Ok(Value::array(values))
    });
    method(&mut table, "entries", 1, |interp, _, args| {
        let target = arg(args, 0);
        let mut entries = Vec::new();
        for key in own_keys(interp, &target)? {
            let value = interp.get_named(&target, &key)?;
            entries.push(Value::array(vec![Value::from(key), value]));
        }
        Ok(Value::array(entries))
    });
    method(&mut table, "assign", 2, |interp, _, args| {
        let target = arg(args, 0);
        let Value::Object(obj) = &target else {
            return Err(RuntimeError::type_error(
                "Object.assign target must be a plain object",
            ));
        };
        let mut copied = IndexMap::new();
        for source in args.iter().skip(1) {
            interp.copy_own_properties(source, &mut copied)?;
        }
        let mut object = obj.borrow_mut();
        if !object.frozen {
            object.properties.extend(copied);
        }
        drop(object);
        Ok(target)
    });
    method(&mut table, "fromEntries", 1, |interp, _, args| {
        let mut properties = IndexMap::new();
        for entry in interp.iterate(&arg(args, 0))? {
            let key = interp.get_named(&entry, "0")?;
            let value = interp.get_named(&entry, "1")?;
            let key = interp.to_string(&key)?;
            properties.insert(key, value);
        }
        Ok(Value::object(properties))
    });
    method(&mut table, "freeze", 1, |_, _, args| {
        let target = arg(args, 0);
        if let Value::Object(obj) = &target {
            obj.borrow_mut().frozen = true;
        }
        Ok(target)
    });
    method(&mut table, "isFrozen", 1, |_, _, args| {
        Ok(Value::Bool(match arg(args, 0) {
            Value::Object(obj) => obj.borrow().frozen,
            Value::Array(_) | Value::Function(_) | Value::Map(_) | Value::Set(_) => false,
            _ => true,
        }))
    });
    method(&mut table, "create", 1, |_, _, args| match arg(args, 0) {
        Value::Null => Ok(Value::object(IndexMap::new())),
        _ => Err(RuntimeError::type_error(
            "Object.create with a prototype is not supported in this sandbox",
        )),
    });
    table
}

pub fn install(interp: &mut Interpreter) {
    let object = Function::native_constructor("Object", 1, |_, _, args| {
        Ok(match arg(args, 0) {
            value @ (Value::Object(_)
            | Value::Array(_)
            | Value::Function(_)
            | Value::Map(_)
            | Value::Set(_)) => value,
            _ => Value::object(IndexMap::new()),
        })
    });
    if let Value::Function(function) = &object {
        function.properties.borrow_mut().extend(
            object_statics()
                .into_iter()
                .map(|(name, value)| (name.to_string(), value)),
        );
    }
    interp.define_global("Object", object);
}

/// Methods inherited by every value
pub fn prototype() -> MethodTable {
    let mut table = MethodTable::new();
    method(&mut table, "hasOwnProperty", 1, |interp, this, args| {
        let key = interp.to_string(&arg(args, 0))?;
        Ok(Value::Bool(has_own(this, &key)))
    });
    method(&mut table, "toString", 0, |_, this, _| {
        Ok(Value::string(match this {
            Value::Object(obj) => match &obj.borrow().error {
                Some(_) => this.to_display_string(),
                None => "[object Object]".to_string(),
            },
            Value::Array(_) => "[object Array]".to_string(),
            Value::Function(_) => "[object Function]".to_string(),
            Value::Map(_) => "[object Map]".to_string(),
            Value::Set(_) => "[object Set]".to_string(),
            Value::Undefined => "[object Undefined]".to_string(),
            Value::Null => "[object Null]".to_string(),
            other => other.to_display_string(),
        }))
    });
    method(&mut table, "valueOf", 0, |_, this, _| Ok(this.clone()));
    method(&mut table, "toLocaleString", 0, |interp, this, _| {
        Ok(Value::string(interp.to_string(this)?))
    });
    table
}
