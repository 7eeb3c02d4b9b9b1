//! `Map` and `Set`
//!
//! Keys compare with SameValueZero and iterate in insertion order.
//! `keys`/`values`/`entries` return array snapshots.

use super::{arg, expect_callback, method, MethodTable};
use crate::interpreter::Interpreter;
use crate::value::{Function, MapKey, MapRef, RuntimeError, SetRef, Value};
use indexmap::{IndexMap, IndexSet};
use std::cell::RefCell;
use std::rc::Rc;

fn this_map(this: &Value, name: &str) -> Result<MapRef, RuntimeError> {
    match this {
        Value::Map(map) => Ok(map.clone()),
        _ => Err(RuntimeError::type_error(format!(
            "Method Map.prototype.{} called on incompatible receiver {}",
            name,
            this.to_display_string()
        ))),
    }
}

fn this_set(this: &Value, name: &str) -> Result<SetRef, RuntimeError> {
    match this {
        Value::Set(set) => Ok(set.clone()),
        _ => Err(RuntimeError::type_error(format!(
            "Method Set.prototype.{} called on incompatible receiver {}",
            name,
            this.to_display_string()
        ))),
    }
}

pub fn install(interp: &mut Interpreter) {
    interp.define_global(
        "Map",
        Function::native_constructor("Map", 0, |interp, _, args| {
            let mut map = IndexMap::new();
            let source = arg(args, 0);
            if !source.is_nullish() {
                for entry in interp.iterate(&source)? {
                    if !matches!(entry, Value::Array(_) | Value::Object(_)) {
                        return Err(RuntimeError::type_error(format!(
                            "Iterator value {} is not an entry object",
                            entry.to_display_string()
                        )));
                    }
                    let key = interp.get_named(&entry, "0")?;
                    let value = interp.get_named(&entry, "1")?;
                    map.insert(MapKey::new(key), value);
                }
            }
            Ok(Value::Map(Rc::new(RefCell::new(map))))
        }),
    );
    interp.define_global(
        "Set",
        Function::native_constructor("Set", 0, |interp, _, args| {
            let mut set = IndexSet::new();
            let source = arg(args, 0);
            if !source.is_nullish() {
                for item in interp.iterate(&source)? {
                    set.insert(MapKey::new(item));
                }
            }
            Ok(Value::Set(Rc::new(RefCell::new(set))))
        }),
    );
}

pub fn map_prototype() -> MethodTable {
    let mut table = MethodTable::new();
    method(&mut table, "get", 1, |_, this, args| {
        let map = this_map(this, "get")?;
        let value = map.borrow().get(&MapKey::new(arg(args, 0))).cloned();
        Ok(value.unwrap_or_default())
    });
    method(&mut table, "set", 2, |_, this, args| {
        let map = this_map(this, "set")?;
        map.borrow_mut().insert(MapKey::new(arg(args, 0)), arg(args, 1));
        Ok(this.clone())
    });
    method(&mut table, "has", 1, |_, this, args| {
        let map = this_map(this, "has")?;
        let found = map.borrow().contains_key(&MapKey::new(arg(args, 0)));
        Ok(Value::Bool(found))
    });
    method(&mut table, "delete", 1, |_, this, args| {
        let map = this_map(this, "delete")?;
        let removed = map.borrow_mut().shift_remove(&MapKey::new(arg(args, 0)));
        Ok(Value::Bool(removed.is_some()))
    });
    method(&mut table, "clear", 0, |_, this, _| {
        this_map(this, "clear")?.borrow_mut().clear();
        Ok(Value::Undefined)
    });
    method(&mut table, "forEach", 1, |interp, this, args| {
        let map = this_map(this, "forEach")?;
        let callback = expect_callback(&arg(args, 0))?;
        let this_arg = arg(args, 1);
        let entries: Vec<(Value, Value)> = map
            .borrow()
            .iter()
            .map(|(k, v)| (k.0.clone(), v.clone()))
            .collect();
        for (key, value) in entries {
            interp.call_function(&callback, this_arg.clone(), &[value, key, this.clone()])?;
        }
        Ok(Value::Undefined)
    });
    method(&mut table, "keys", 0, |_, this, _| {
        let map = this_map(this, "keys")?;
        let keys = map.borrow().keys().map(|k| k.0.clone()).collect();
        Ok(Value::array(keys))
    });
    method(&mut table, "values", 0, |_, this, _| {
        let map = this_map(this, "values")?;
        let values = map.borrow().values().cloned().collect();
        Ok(Value::array(values))
    });
    method(&mut table, "entries", 0, |interp, this, _| {
        let _ = this_map(this, "entries")?;
        Ok(Value::array(interp.iterate(this)?))
    });
    table
}

pub fn set_prototype() -> MethodTable {
    let mut table = MethodTable::new();
    method(&mut table, "add", 1, |_, this, args| {
        let set = this_set(this, "add")?;
        set.borrow_mut().insert(MapKey::new(arg(args, 0)));
        Ok(this.clone())
    });
    method(&mut table, "has", 1, |_, this, args| {
        let set = this_set(this, "has")?;
        let found = set.borrow().contains(&MapKey::new(arg(args, 0)));
        Ok(Value::Bool(found))
    });
    method(&mut table, "delete", 1, |_, this, args| {
        let set = this_set(this, "delete")?;
        let removed = set.borrow_mut().shift_remove(&MapKey::new(arg(args, 0)));
        Ok(Value::Bool(removed))
    });
    method(&mut table, "clear", 0, |_, this, _| {
        this_set(this, "clear")?.borrow_mut().clear();
        Ok(Value::Undefined)
    });
    method(&mut table, "forEach", 1, |interp, this, args| {
        let set = this_set(this, "forEach")?;
        let callback = expect_callback(&arg(args, 0))?;
        let this_arg = arg(args, 1);
        let items: Vec<Value> = set.borrow().iter().map(|k| k.0.clone()).collect();
        for item in items {
            interp.call_function(&callback, this_arg.clone(), &[item.clone(), item, this.clone()])?;
        }
        Ok(Value::Undefined)
    });
    let values = |_: &mut Interpreter, this: &Value, _: &[Value]| -> Result<Value, RuntimeError> {
        let set = this_set(this, "values")?;
        let items = set.borrow().iter().map(|k| k.0.clone()).collect();
        Ok(Value::array(items))
    };
    method(&mut table, "values", 0, values);
    method(&mut table, "keys", 0, values);
    method(&mut table, "entries", 0, |_, this, _| {
        let set = this_set(this, "entries")?;
        let entries = set
            .borrow()
            .iter()
            .map(|k| Value::array(vec![k.0.clone(), k.0.clone()]))
            .collect();
        Ok(Value::array(entries))
    });
    table
}
