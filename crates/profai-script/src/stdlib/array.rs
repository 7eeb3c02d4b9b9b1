//! Array constructor and prototype methods
//!
//! Callback methods read elements live, so a callback that mutates the
//! array observes the mutation the same way engines do. `keys`, `values`
//! and `entries` return arrays rather than iterators.

use super::{arg, expect_callback, index_arg, method, predicate, MethodTable};
use crate::interpreter::Interpreter;
use crate::value::{
    number_to_index, same_value_zero, strict_equals, ArrayRef, Function, RuntimeError, Value,
};
use std::cmp::Ordering;

/// Largest array `new Array(n)` / `fill` may create
const MAX_ARRAY_LENGTH: usize = 10_000_000;

fn this_array(this: &Value, name: &str) -> Result<ArrayRef, RuntimeError> {
    match this {
        Value::Array(items) => Ok(items.clone()),
        other => Err(RuntimeError::type_error(format!(
            "Array.prototype.{} called on {}",
            name,
            other.type_of()
        ))),
    }
}

fn element(items: &ArrayRef, index: usize) -> Option<Value> {
    items.borrow().get(index).cloned()
}

fn len(items: &ArrayRef) -> usize {
    items.borrow().len()
}

/// Call `callback(item, index, array)`
fn call_each(
    interp: &mut Interpreter,
    callback: &Value,
    this_arg: &Value,
    item: Value,
    index: usize,
    array: &ArrayRef,
) -> Result<Value, RuntimeError> {
    interp.call_function(
        callback,
        this_arg.clone(),
        &[item, Value::Number(index as f64), Value::Array(array.clone())],
    )
}

pub fn install(interp: &mut Interpreter) {
    let array = Function::native_constructor("Array", 1, |_, _, args| match args {
        [Value::Number(n)] => {
            let length = number_to_index(*n)
                .filter(|len| *len <= MAX_ARRAY_LENGTH)
                .ok_or_else(|| RuntimeError::range_error("Invalid array length"))?;
            Ok(Value::array(vec![Value::Undefined; length]))
        }
        _ => Ok(Value::array(args.to_vec())),
    });

    if let Value::Function(function) = &array {
        let mut statics = function.properties.borrow_mut();
        statics.insert(
            "isArray".to_string(),
            Function::native("isArray", 1, |_, _, args| {
                Ok(Value::Bool(matches!(arg(args, 0), Value::Array(_))))
            }),
        );
        statics.insert("from".to_string(), Function::native("from", 1, array_from));
        statics.insert(
            "of".to_string(),
            Function::native("of", 0, |_, _, args| Ok(Value::array(args.to_vec()))),
        );
    }
    interp.define_global("Array", array);
}

/// `Array.from(iterableOrArrayLike, mapFn?)`
fn array_from(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    let source = arg(args, 0);
    let items = match &source {
        Value::Undefined | Value::Null => {
            return Err(RuntimeError::type_error(format!(
                "{} is not iterable",
                source.to_display_string()
            )))
        }
        Value::Object(_) => {
            // Array-like: `{ length: n }`
            let length = interp.get_named(&source, "length")?;
            let length = interp.to_number(&length)?;
            let length = number_to_index(super::to_integer(length).max(0.0))
                .filter(|len| *len <= MAX_ARRAY_LENGTH)
                .ok_or_else(|| RuntimeError::range_error("Invalid array length"))?;
            let mut items = Vec::with_capacity(length);
            for i in 0..length {
                items.push(interp.get_named(&source, &i.to_string())?);
            }
            items
        }
        other => interp.iterate(other)?,
    };

    match args.get(1) {
        None | Some(Value::Undefined) => Ok(Value::array(items)),
        Some(map_fn) => {
            let map_fn = expect_callback(map_fn)?;
            let mut mapped = Vec::with_capacity(items.len());
            for (i, item) in items.into_iter().enumerate() {
                mapped.push(interp.call_function(
                    &map_fn,
                    Value::Undefined,
                    &[item, Value::Number(i as f64)],
                )?);
            }
            Ok(Value::array(mapped))
        }
    }
}

// ============================================================================
// Sorting
// ============================================================================

/// Stable merge sort with a comparator that may fail
///
/// `after(a, b)` reports whether `a` must be placed after `b`. An
/// inconsistent comparator yields some permutation instead of a panic.
fn merge_sort<F>(mut items: Vec<Value>, after: &mut F) -> Result<Vec<Value>, RuntimeError>
where
    F: FnMut(&Value, &Value) -> Result<bool, RuntimeError>,
{
    if items.len() <= 1 {
        return Ok(items);
    }
    let right = items.split_off(items.len() / 2);
    let left = merge_sort(items, after)?;
    let right = merge_sort(right, after)?;

    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    while let (Some(l), Some(r)) = (left.peek(), right.peek()) {
        if after(l, r)? {
            merged.extend(right.next());
        } else {
            merged.extend(left.next());
        }
    }
    merged.extend(left);
    merged.extend(right);
    Ok(merged)
}

/// Sort with an optional user comparator; `undefined` always sorts last
pub(crate) fn sort_values(
    interp: &mut Interpreter,
    items: Vec<Value>,
    comparator: &Value,
) -> Result<Vec<Value>, RuntimeError> {
    let (defined, undefined): (Vec<Value>, Vec<Value>) = items
        .into_iter()
        .partition(|v| !matches!(v, Value::Undefined));

    let mut sorted = match comparator {
        Value::Undefined => {
            let mut keyed = Vec::with_capacity(defined.len());
            for item in defined {
                let key = interp.to_string(&item)?;
                keyed.push(Value::array(vec![Value::string(key), item]));
            }
            let sorted = merge_sort(keyed, &mut |a, b| Ok(sort_key(a).cmp(&sort_key(b)) == Ordering::Greater))?;
            sorted
                .into_iter()
                .map(|pair| match pair {
                    Value::Array(pair) => pair.borrow().get(1).cloned().unwrap_or_default(),
                    other => other,
                })
                .collect()
        }
        compare => {
            let compare = expect_callback(compare)?;
            merge_sort(defined, &mut |a, b| {
                let result = interp.call_function(&compare, Value::Undefined, &[a.clone(), b.clone()])?;
                Ok(interp.to_number(&result)? > 0.0)
            })?
        }
    };
    sorted.extend(undefined);
    Ok(sorted)
}

fn sort_key(pair: &Value) -> Vec<u16> {
    match pair {
        Value::Array(pair) => match pair.borrow().first() {
            Some(Value::String(s)) => s.encode_utf16().collect(),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

// ============================================================================
// Prototype
// ============================================================================

fn flatten_into(items: &[Value], depth: f64, out: &mut Vec<Value>) {
    for item in items {
        match item {
            Value::Array(inner) if depth >= 1.0 => {
                let inner = inner.borrow().clone();
                flatten_into(&inner, depth - 1.0, out);
            }
            other => out.push(other.clone()),
        }
    }
}

/// `Array.prototype.join`
pub(crate) fn join(interp: &mut Interpreter, items: &[Value], separator: &str) -> Result<String, RuntimeError> {
    let mut parts = Vec::with_capacity(items.len());
    for item in items {
        parts.push(match item {
            Value::Undefined | Value::Null => String::new(),
            other => interp.to_string(other)?,
        });
    }
    Ok(parts.join(separator))
}

pub fn prototype() -> MethodTable {
    let mut table = MethodTable::new();

    method(&mut table, "push", 1, |_, this, args| {
        let items = this_array(this, "push")?;
        let mut items = items.borrow_mut();
        items.extend_from_slice(args);
        Ok(Value::Number(items.len() as f64))
    });
    method(&mut table, "pop", 0, |_, this, _| {
        let items = this_array(this, "pop")?;
        let popped = items.borrow_mut().pop();
        Ok(popped.unwrap_or_default())
    });
    method(&mut table, "shift", 0, |_, this, _| {
        let items = this_array(this, "shift")?;
        let mut items = items.borrow_mut();
        if items.is_empty() {
            Ok(Value::Undefined)
        } else {
            Ok(items.remove(0))
        }
    });
    method(&mut table, "unshift", 1, |_, this, args| {
        let items = this_array(this, "unshift")?;
        let mut items = items.borrow_mut();
        items.splice(0..0, args.iter().cloned());
        Ok(Value::Number(items.len() as f64))
    });
    method(&mut table, "slice", 2, |interp, this, args| {
        let items = this_array(this, "slice")?;
        let length = len(&items);
        let start = index_arg(interp, args, 0, length, 0)?;
        let end = index_arg(interp, args, 1, length, length)?;
        let slice = if start < end {
            items.borrow()[start..end].to_vec()
        } else {
            Vec::new()
        };
        Ok(Value::array(slice))
    });
    method(&mut table, "splice", 2, |interp, this, args| {
        let items = this_array(this, "splice")?;
        let length = len(&items);
        let start = index_arg(interp, args, 0, length, 0)?;
        let delete_count = match args.len() {
            0 => 0,
            1 => length - start,
            _ => {
                let n = interp.to_number(&args[1])?;
                (super::to_integer(n).max(0.0) as usize).min(length - start)
            }
        };
        let inserted = args.get(2..).unwrap_or(&[]).to_vec();
        let removed: Vec<Value> = items
            .borrow_mut()
            .splice(start..start + delete_count, inserted)
            .collect();
        Ok(Value::array(removed))
    });
    method(&mut table, "concat", 1, |_, this, args| {
        let items = this_array(this, "concat")?;
        let mut result = items.borrow().clone();
        for arg in args {
            match arg {
                Value::Array(other) => result.extend(other.borrow().iter().cloned()),
                other => result.push(other.clone()),
            }
        }
        Ok(Value::array(result))
    });
    method(&mut table, "join", 1, |interp, this, args| {
        let items = this_array(this, "join")?;
        let separator = match arg(args, 0) {
            Value::Undefined => ",".to_string(),
            other => interp.to_string(&other)?,
        };
        let snapshot = items.borrow().clone();
        Ok(Value::string(join(interp, &snapshot, &separator)?))
    });
    method(&mut table, "toString", 0, |interp, this, _| {
        let items = this_array(this, "toString")?;
        let snapshot = items.borrow().clone();
        Ok(Value::string(join(interp, &snapshot, ",")?))
    });
    method(&mut table, "reverse", 0, |_, this, _| {
        let items = this_array(this, "reverse")?;
        items.borrow_mut().reverse();
        Ok(this.clone())
    });
    method(&mut table, "toReversed", 0, |_, this, _| {
        let items = this_array(this, "toReversed")?;
        let mut copy = items.borrow().clone();
        copy.reverse();
        Ok(Value::array(copy))
    });
    method(&mut table, "indexOf", 1, |interp, this, args| {
        let items = this_array(this, "indexOf")?;
        let search = arg(args, 0);
        let start = index_arg(interp, args, 1, len(&items), 0)?;
        let found = items.borrow()[start..]
            .iter()
            .position(|item| strict_equals(item, &search))
            .map(|i| (i + start) as f64);
        Ok(Value::Number(found.unwrap_or(-1.0)))
    });
    method(&mut table, "lastIndexOf", 1, |_, this, args| {
        let items = this_array(this, "lastIndexOf")?;
        let search = arg(args, 0);
        let found = items
            .borrow()
            .iter()
            .rposition(|item| strict_equals(item, &search))
            .map(|i| i as f64);
        Ok(Value::Number(found.unwrap_or(-1.0)))
    });
    method(&mut table, "includes", 1, |interp, this, args| {
        let items = this_array(this, "includes")?;
        let search = arg(args, 0);
        let start = index_arg(interp, args, 1, len(&items), 0)?;
        let found = items.borrow()[start..]
            .iter()
            .any(|item| same_value_zero(item, &search));
        Ok(Value::Bool(found))
    });
    method(&mut table, "at", 1, |interp, this, args| {
        let items = this_array(this, "at")?;
        let n = super::to_integer(interp.to_number(&arg(args, 0))?);
        let length = len(&items) as f64;
        let index = if n < 0.0 { length + n } else { n };
        if index < 0.0 || index >= length {
            return Ok(Value::Undefined);
        }
        Ok(element(&items, index as usize).unwrap_or_default())
    });

    // Callback iteration
    method(&mut table, "forEach", 1, |interp, this, args| {
        let items = this_array(this, "forEach")?;
        let callback = expect_callback(&arg(args, 0))?;
        let this_arg = arg(args, 1);
        let length = len(&items);
        for i in 0..length {
            let Some(item) = element(&items, i) else { break };
            call_each(interp, &callback, &this_arg, item, i, &items)?;
        }
        Ok(Value::Undefined)
    });
    method(&mut table, "map", 1, |interp, this, args| {
        let items = this_array(this, "map")?;
        let callback = expect_callback(&arg(args, 0))?;
        let this_arg = arg(args, 1);
        let length = len(&items);
        let mut mapped = Vec::with_capacity(length);
        for i in 0..length {
            let item = element(&items, i).unwrap_or_default();
            mapped.push(call_each(interp, &callback, &this_arg, item, i, &items)?);
        }
        Ok(Value::array(mapped))
    });
    method(&mut table, "filter", 1, |interp, this, args| {
        let items = this_array(this, "filter")?;
        let callback = expect_callback(&arg(args, 0))?;
        let this_arg = arg(args, 1);
        let length = len(&items);
        let mut kept = Vec::new();
        for i in 0..length {
            let Some(item) = element(&items, i) else { break };
            if call_each(interp, &callback, &this_arg, item.clone(), i, &items)?.is_truthy() {
                kept.push(item);
            }
        }
        Ok(Value::array(kept))
    });
    method(&mut table, "find", 1, |interp, this, args| {
        find(interp, this, args, "find", false).map(|(item, _)| item)
    });
    method(&mut table, "findIndex", 1, |interp, this, args| {
        find(interp, this, args, "findIndex", false).map(|(_, index)| index)
    });
    method(&mut table, "findLast", 1, |interp, this, args| {
        find(interp, this, args, "findLast", true).map(|(item, _)| item)
    });
    method(&mut table, "findLastIndex", 1, |interp, this, args| {
        find(interp, this, args, "findLastIndex", true).map(|(_, index)| index)
    });
    method(&mut table, "some", 1, |interp, this, args| {
        let items = this_array(this, "some")?;
        let callback = expect_callback(&arg(args, 0))?;
        let this_arg = arg(args, 1);
        for i in 0..len(&items) {
            let Some(item) = element(&items, i) else { break };
            if call_each(interp, &callback, &this_arg, item, i, &items)?.is_truthy() {
                return Ok(Value::Bool(true));
            }
        }
        Ok(Value::Bool(false))
    });
    method(&mut table, "every", 1, |interp, this, args| {
        let items = this_array(this, "every")?;
        let callback = expect_callback(&arg(args, 0))?;
        let this_arg = arg(args, 1);
        for i in 0..len(&items) {
            let Some(item) = element(&items, i) else { break };
            if !call_each(interp, &callback, &this_arg, item, i, &items)?.is_truthy() {
                return Ok(Value::Bool(false));
            }
        }
        Ok(Value::Bool(true))
    });
    method(&mut table, "reduce", 1, |interp, this, args| {
        let items = this_array(this, "reduce")?;
        let indices: Vec<usize> = (0..len(&items)).collect();
        reduce(interp, &items, args, indices)
    });
    method(&mut table, "reduceRight", 1, |interp, this, args| {
        let items = this_array(this, "reduceRight")?;
        let indices: Vec<usize> = (0..len(&items)).rev().collect();
        reduce(interp, &items, args, indices)
    });

    method(&mut table, "sort", 1, |interp, this, args| {
        let items = this_array(this, "sort")?;
        let snapshot = items.borrow().clone();
        let sorted = sort_values(interp, snapshot, &arg(args, 0))?;
        *items.borrow_mut() = sorted;
        Ok(this.clone())
    });
    method(&mut table, "toSorted", 1, |interp, this, args| {
        let items = this_array(this, "toSorted")?;
        let snapshot = items.borrow().clone();
        Ok(Value::array(sort_values(interp, snapshot, &arg(args, 0))?))
    });
    method(&mut table, "flat", 0, |interp, this, args| {
        let items = this_array(this, "flat")?;
        let depth = match arg(args, 0) {
            Value::Undefined => 1.0,
            other => super::to_integer(interp.to_number(&other)?),
        };
        let snapshot = items.borrow().clone();
        let mut flat = Vec::with_capacity(snapshot.len());
        flatten_into(&snapshot, depth, &mut flat);
        Ok(Value::array(flat))
    });
    method(&mut table, "flatMap", 1, |interp, this, args| {
        let items = this_array(this, "flatMap")?;
        let callback = expect_callback(&arg(args, 0))?;
        let this_arg = arg(args, 1);
        let mut flat = Vec::new();
        for i in 0..len(&items) {
            let Some(item) = element(&items, i) else { break };
            match call_each(interp, &callback, &this_arg, item, i, &items)? {
                Value::Array(inner) => flat.extend(inner.borrow().iter().cloned()),
                other => flat.push(other),
            }
        }
        Ok(Value::array(flat))
    });
    method(&mut table, "fill", 1, |interp, this, args| {
        let items = this_array(this, "fill")?;
        let value = arg(args, 0);
        let length = len(&items);
        let start = index_arg(interp, args, 1, length, 0)?;
        let end = index_arg(interp, args, 2, length, length)?;
        if start < end {
            for slot in &mut items.borrow_mut()[start..end] {
                *slot = value.clone();
            }
        }
        Ok(this.clone())
    });
    method(&mut table, "keys", 0, |_, this, _| {
        let items = this_array(this, "keys")?;
        Ok(Value::array((0..len(&items)).map(|i| Value::Number(i as f64)).collect()))
    });
    method(&mut table, "values", 0, |_, this, _| {
        let items = this_array(this, "values")?;
        let snapshot = items.borrow().clone();
        Ok(Value::array(snapshot))
    });
    method(&mut table, "entries", 0, |_, this, _| {
        let items = this_array(this, "entries")?;
        let entries = items
            .borrow()
            .iter()
            .enumerate()
            .map(|(i, item)| Value::array(vec![Value::Number(i as f64), item.clone()]))
            .collect();
        Ok(Value::array(entries))
    });

    table
}

fn find(
    interp: &mut Interpreter,
    this: &Value,
    args: &[Value],
    name: &str,
    from_end: bool,
) -> Result<(Value, Value), RuntimeError> {
    let items = this_array(this, name)?;
    let callback = expect_callback(&arg(args, 0))?;
    let this_arg = arg(args, 1);
    let length = len(&items);
    let indices: Box<dyn Iterator<Item = usize>> = if from_end {
        Box::new((0..length).rev())
    } else {
        Box::new(0..length)
    };
    for i in indices {
        let item = element(&items, i).unwrap_or_default();
        let call_args = [item.clone(), Value::Number(i as f64), Value::Array(items.clone())];
        if predicate(interp, &callback, &this_arg, &call_args)? {
            return Ok((item, Value::Number(i as f64)));
        }
    }
    Ok((Value::Undefined, Value::Number(-1.0)))
}

fn reduce(
    interp: &mut Interpreter,
    items: &ArrayRef,
    args: &[Value],
    indices: Vec<usize>,
) -> Result<Value, RuntimeError> {
    let callback = expect_callback(&arg(args, 0))?;
    let mut indices = indices.into_iter();
    let mut accumulator = match args.get(1) {
        Some(initial) => initial.clone(),
        None => match indices.next().and_then(|i| element(items, i)) {
            Some(first) => first,
            None => {
                return Err(RuntimeError::type_error(
                    "Reduce of empty array with no initial value",
                ))
            }
        },
    };
    for i in indices {
        let Some(item) = element(items, i) else { continue };
        accumulator = interp.call_function(
            &callback,
            Value::Undefined,
            &[accumulator, item, Value::Number(i as f64), Value::Array(items.clone())],
        )?;
    }
    Ok(accumulator)
}
