//! Standard library
//!
//! Globals are installed into the interpreter's global scope. Methods on
//! primitives, arrays, functions and collections live in per-type
//! prototype tables consulted by property lookup.

pub mod array;
pub mod collections;
pub mod console;
pub mod error;
pub mod global;
pub mod json;
pub mod math;
pub mod number;
pub mod object;
pub mod string;

use crate::interpreter::Interpreter;
use crate::value::{Function, RuntimeError, Value};
use indexmap::IndexMap;

/// Method table shared by every value of one type
pub type MethodTable = IndexMap<&'static str, Value>;

/// Built-in prototype tables
#[derive(Debug, Default)]
pub struct Prototypes {
    pub array: MethodTable,
    pub string: MethodTable,
    pub number: MethodTable,
    pub boolean: MethodTable,
    pub object: MethodTable,
    pub function: MethodTable,
    pub map: MethodTable,
    pub set: MethodTable,
}

/// Install prototypes and globals (everything except `console`)
pub fn install(interp: &mut Interpreter) {
    interp.prototypes = Prototypes {
        array: array::prototype(),
        string: string::prototype(),
        number: number::prototype(),
        boolean: number::boolean_prototype(),
        object: object::prototype(),
        function: global::function_prototype(),
        map: collections::map_prototype(),
        set: collections::set_prototype(),
    };

    global::install(interp);
    number::install(interp);
    string::install(interp);
    array::install(interp);
    object::install(interp);
    collections::install(interp);
    error::install(interp);
    math::install(interp);
    json::install(interp);
}

// ============================================================================
// Helpers
// ============================================================================

/// Argument `i`, or `undefined` when absent
pub(crate) fn arg(args: &[Value], i: usize) -> Value {
    args.get(i).cloned().unwrap_or_default()
}

/// Add a native method to a table
pub(crate) fn method(
    table: &mut MethodTable,
    name: &'static str,
    arity: usize,
    func: impl Fn(&mut Interpreter, &Value, &[Value]) -> Result<Value, RuntimeError> + 'static,
) {
    table.insert(name, Function::native(name, arity, func));
}

/// Build a namespace object (`Math`, `JSON`, ...) from a table
pub(crate) fn namespace(table: MethodTable) -> Value {
    Value::object(
        table
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect(),
    )
}

/// ToIntegerOrInfinity
pub(crate) fn to_integer(n: f64) -> f64 {
    if n.is_nan() {
        0.0
    } else {
        n.trunc()
    }
}

/// Resolve a possibly negative relative index against `len`
pub(crate) fn relative_index(n: f64, len: usize) -> usize {
    let n = to_integer(n);
    let len_f = len as f64;
    if n < 0.0 {
        (len_f + n).max(0.0) as usize
    } else {
        n.min(len_f) as usize
    }
}

/// Relative index for an optional argument with a default
pub(crate) fn index_arg(
    interp: &mut Interpreter,
    args: &[Value],
    i: usize,
    len: usize,
    default: usize,
) -> Result<usize, RuntimeError> {
    match args.get(i) {
        None | Some(Value::Undefined) => Ok(default),
        Some(value) => {
            let n = interp.to_number(value)?;
            Ok(relative_index(n, len))
        }
    }
}

/// Invoke a callback, converting its result to a boolean
pub(crate) fn predicate(
    interp: &mut Interpreter,
    callback: &Value,
    this_arg: &Value,
    args: &[Value],
) -> Result<bool, RuntimeError> {
    Ok(interp
        .call_function(callback, this_arg.clone(), args)?
        .is_truthy())
}

/// Require a callable argument
pub(crate) fn expect_callback(value: &Value) -> Result<Value, RuntimeError> {
    match value {
        Value::Function(_) => Ok(value.clone()),
        Value::String(s) => Err(RuntimeError::type_error(format!("\"{}\" is not a function", s))),
        other => Err(RuntimeError::type_error(format!(
            "{} is not a function",
            other.to_display_string()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_index() {
        assert_eq!(relative_index(-1.0, 5), 4);
        assert_eq!(relative_index(-10.0, 5), 0);
        assert_eq!(relative_index(2.7, 5), 2);
        assert_eq!(relative_index(f64::INFINITY, 5), 5);
        assert_eq!(relative_index(f64::NAN, 5), 0);
    }
}
