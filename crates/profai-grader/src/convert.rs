//! Conversion between script values and test-case data

use crate::value::Value;
use profai_script::Value as ScriptValue;
use std::collections::HashSet;

/// Placeholder for a reference back to an enclosing container
pub const CIRCULAR: &str = "[Circular]";

/// Build a fresh script value from data; nothing is shared between calls
pub fn to_script(value: &Value) -> ScriptValue {
    match value {
        Value::Undefined => ScriptValue::Undefined,
        Value::Null => ScriptValue::Null,
        Value::Bool(b) => ScriptValue::Bool(*b),
        Value::Number(n) => ScriptValue::Number(*n),
        Value::String(s) => ScriptValue::string(s),
        Value::Sequence(items) => ScriptValue::array(items.iter().map(to_script).collect()),
        Value::Mapping(entries) => ScriptValue::object(
            entries
                .iter()
                .map(|(key, value)| (key.clone(), to_script(value)))
                .collect(),
        ),
    }
}

/// Snapshot a script value as data
///
/// Arrays become sequences; plain objects and class instances become
/// mappings of their own properties. Values with no data form render as
/// strings the way a console would print them.
pub fn from_script(value: &ScriptValue) -> Value {
    let mut stack = HashSet::new();
    snapshot(value, &mut stack)
}

fn snapshot(value: &ScriptValue, stack: &mut HashSet<usize>) -> Value {
    match value {
        ScriptValue::Undefined => Value::Undefined,
        ScriptValue::Null => Value::Null,
        ScriptValue::Bool(b) => Value::Bool(*b),
        ScriptValue::Number(n) => Value::Number(*n),
        ScriptValue::String(s) => Value::String(s.to_string()),
        ScriptValue::Function(function) => {
            let name = function.name();
            if name.is_empty() {
                Value::from("[Function (anonymous)]")
            } else {
                Value::String(format!("[Function: {}]", name))
            }
        }
        ScriptValue::Map(_) => Value::from("[object Map]"),
        ScriptValue::Set(_) => Value::from("[object Set]"),
        ScriptValue::Array(items) => {
            let id = value.identity();
            if !stack.insert(id) {
                return Value::from(CIRCULAR);
            }
            let items = items.borrow().clone();
            let converted = items.iter().map(|item| snapshot(item, stack)).collect();
            stack.remove(&id);
            Value::Sequence(converted)
        }
        ScriptValue::Object(obj) => {
            if obj.borrow().error.is_some() {
                return Value::String(value.to_display_string());
            }
            let id = value.identity();
            if !stack.insert(id) {
                return Value::from(CIRCULAR);
            }
            let properties = obj.borrow().properties.clone();
            let converted = properties
                .iter()
                .map(|(key, item)| (key.clone(), snapshot(item, stack)))
                .collect();
            stack.remove(&id);
            Value::Mapping(converted)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use profai_script::{ExecutionLimits, Runtime};

    fn snapshot_of(source: &str) -> Value {
        let mut runtime = Runtime::new(ExecutionLimits::default());
        from_script(&runtime.eval(source).unwrap())
    }

    #[test]
    fn test_containers() {
        assert_eq!(
            snapshot_of("({ a: [1, 'x', null, undefined], b: { c: true } })").to_json(),
            r#"{"a":[1,"x",null,null],"b":{"c":true}}"#
        );
    }

    #[test]
    fn test_class_instance_is_a_mapping() {
        let value = snapshot_of("class P { constructor() { this.x = 1; } } new P()");
        assert_eq!(value, Value::mapping([("x", Value::from(1))]));
    }

    #[test]
    fn test_opaque_values_render_as_strings() {
        assert_eq!(snapshot_of("function f() {} f"), Value::from("[Function: f]"));
        assert_eq!(snapshot_of("new Map()"), Value::from("[object Map]"));
        assert_eq!(snapshot_of("new Error('bad')"), Value::from("Error: bad"));
    }

    #[test]
    fn test_cycles() {
        let value = snapshot_of("const a = [1]; a.push(a); a");
        assert_eq!(value, Value::sequence([Value::from(1), Value::from(CIRCULAR)]));
    }

    #[test]
    fn test_shared_but_acyclic_references_repeat() {
        let value = snapshot_of("const x = [1]; [x, x]");
        assert_eq!(value.to_json(), "[[1],[1]]");
    }

    #[test]
    fn test_to_script_builds_fresh_values() {
        let data = Value::mapping([("list", Value::sequence([Value::from(2)]))]);
        let first = to_script(&data);
        let second = to_script(&data);
        assert_ne!(first.identity(), second.identity());
        assert_eq!(from_script(&first), data);
    }
}
