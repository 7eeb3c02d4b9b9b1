//! String constructor and prototype methods
//!
//! Strings are indexed by Unicode scalar value. `charCodeAt` therefore
//! reports the code point of astral characters rather than a surrogate.

use super::{arg, method, to_integer, MethodTable};
use crate::interpreter::Interpreter;
use crate::value::{Function, RuntimeError, Value};
use std::cmp::Ordering;
use std::rc::Rc;

/// Maximum length `repeat` and `padStart`/`padEnd` may produce
const MAX_STRING_LENGTH: usize = 1 << 28;

fn this_string(interp: &mut Interpreter, this: &Value) -> Result<Rc<str>, RuntimeError> {
    match this {
        Value::String(s) => Ok(s.clone()),
        Value::Undefined | Value::Null => Err(RuntimeError::type_error(
            "String.prototype method called on null or undefined",
        )),
        other => Ok(Rc::from(interp.to_string(other)?)),
    }
}

fn string_arg(interp: &mut Interpreter, args: &[Value], i: usize) -> Result<String, RuntimeError> {
    interp.to_string(&arg(args, i))
}

/// Position of `needle` in `haystack` at or after `from`
fn find_chars(haystack: &[char], needle: &[char], from: usize) -> Option<usize> {
    if needle.is_empty() {
        return Some(from.min(haystack.len()));
    }
    if needle.len() > haystack.len() {
        return None;
    }
    (from..=haystack.len() - needle.len()).find(|&i| haystack[i..i + needle.len()] == *needle)
}

fn rfind_chars(haystack: &[char], needle: &[char], from: usize) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    let last = (haystack.len() - needle.len()).min(from);
    (0..=last).rev().find(|&i| haystack[i..i + needle.len()] == *needle)
}

fn position_arg(interp: &mut Interpreter, args: &[Value], i: usize, default: f64) -> Result<f64, RuntimeError> {
    match args.get(i) {
        None | Some(Value::Undefined) => Ok(default),
        Some(value) => Ok(to_integer(interp.to_number(value)?)),
    }
}

fn clamp(n: f64, len: usize) -> usize {
    n.max(0.0).min(len as f64) as usize
}

/// Build the replacement text for one match (`$$`, `$&` expanded)
fn expand_replacement(
    interp: &mut Interpreter,
    replacement: &Value,
    matched: &str,
    offset: usize,
    subject: &str,
) -> Result<String, RuntimeError> {
    if replacement.is_callable() {
        let result = interp.call_function(
            replacement,
            Value::Undefined,
            &[
                Value::string(matched),
                Value::Number(offset as f64),
                Value::string(subject),
            ],
        )?;
        return interp.to_string(&result);
    }
    let template = interp.to_string(replacement)?;
    Ok(template.replace("$$", "\u{0}").replace("$&", matched).replace('\u{0}', "$"))
}

fn replace(interp: &mut Interpreter, this: &Value, args: &[Value], all: bool) -> Result<Value, RuntimeError> {
    let subject = this_string(interp, this)?;
    let pattern: Vec<char> = string_arg(interp, args, 0)?.chars().collect();
    let replacement = arg(args, 1);
    let chars: Vec<char> = subject.chars().collect();

    let mut result = String::new();
    let mut cursor = 0;
    let mut from = 0;
    while let Some(found) = find_chars(&chars, &pattern, from) {
        result.extend(&chars[cursor..found]);
        let matched: String = pattern.iter().collect();
        result.push_str(&expand_replacement(interp, &replacement, &matched, found, &subject)?);
        cursor = found + pattern.len();
        if !all {
            break;
        }
        // An empty pattern matches between every character
        from = if pattern.is_empty() {
            if found < chars.len() {
                result.push(chars[found]);
            }
            cursor = found + 1;
            found + 1
        } else {
            cursor
        };
        if from > chars.len() {
            break;
        }
    }
    if cursor <= chars.len() {
        result.extend(&chars[cursor..]);
    }
    Ok(Value::string(result))
}

/// Locale-independent approximation of `localeCompare`: case-insensitive
/// first, lowercase before uppercase on ties
fn locale_compare(a: &str, b: &str) -> Ordering {
    let folded = a.to_lowercase().cmp(&b.to_lowercase());
    if folded != Ordering::Equal {
        return folded;
    }
    for (x, y) in a.chars().zip(b.chars()) {
        if x != y {
            return if x.is_lowercase() { Ordering::Less } else { Ordering::Greater };
        }
    }
    a.chars().count().cmp(&b.chars().count())
}

fn pad(interp: &mut Interpreter, this: &Value, args: &[Value], at_start: bool) -> Result<Value, RuntimeError> {
    let s = this_string(interp, this)?;
    let target = to_integer(interp.to_number(&arg(args, 0))?);
    let filler = match arg(args, 1) {
        Value::Undefined => " ".to_string(),
        other => interp.to_string(&other)?,
    };
    let length = s.chars().count();
    if target <= length as f64 || filler.is_empty() {
        return Ok(Value::String(s));
    }
    if target > MAX_STRING_LENGTH as f64 {
        return Err(RuntimeError::range_error("Invalid string length"));
    }
    let needed = target as usize - length;
    let padding: String = filler.chars().cycle().take(needed).collect();
    Ok(Value::string(if at_start {
        format!("{}{}", padding, s)
    } else {
        format!("{}{}", s, padding)
    }))
}

pub fn install(interp: &mut Interpreter) {
    let string = Function::native_constructor("String", 1, |interp, _, args| match args.first() {
        None => Ok(Value::string("")),
        Some(value) => Ok(Value::string(interp.to_string(value)?)),
    });
    if let Value::Function(function) = &string {
        function.properties.borrow_mut().insert(
            "fromCharCode".to_string(),
            Function::native("fromCharCode", 1, |interp, _, args| {
                let mut s = String::new();
                for value in args {
                    let code = crate::value::to_uint32(interp.to_number(value)?) & 0xFFFF;
                    s.push(char::from_u32(code).unwrap_or('\u{FFFD}'));
                }
                Ok(Value::string(s))
            }),
        );
    }
    interp.define_global("String", string);
}

pub fn prototype() -> MethodTable {
    let mut table = MethodTable::new();

    method(&mut table, "toString", 0, |interp, this, _| Ok(Value::String(this_string(interp, this)?)));
    method(&mut table, "valueOf", 0, |interp, this, _| Ok(Value::String(this_string(interp, this)?)));
    method(&mut table, "at", 1, |interp, this, args| {
        let s = this_string(interp, this)?;
        let n = position_arg(interp, args, 0, 0.0)?;
        let length = s.chars().count() as f64;
        let index = if n < 0.0 { length + n } else { n };
        if index < 0.0 || index >= length {
            return Ok(Value::Undefined);
        }
        Ok(s.chars().nth(index as usize).map(|c| Value::string(c.to_string())).unwrap_or_default())
    });
    method(&mut table, "charAt", 1, |interp, this, args| {
        let s = this_string(interp, this)?;
        let n = position_arg(interp, args, 0, 0.0)?;
        if n < 0.0 {
            return Ok(Value::string(""));
        }
        Ok(Value::string(
            s.chars().nth(n as usize).map(|c| c.to_string()).unwrap_or_default(),
        ))
    });
    method(&mut table, "charCodeAt", 1, |interp, this, args| {
        let s = this_string(interp, this)?;
        let n = position_arg(interp, args, 0, 0.0)?;
        let code = if n < 0.0 { None } else { s.chars().nth(n as usize) };
        Ok(Value::Number(code.map(|c| c as u32 as f64).unwrap_or(f64::NAN)))
    });
    method(&mut table, "codePointAt", 1, |interp, this, args| {
        let s = this_string(interp, this)?;
        let n = position_arg(interp, args, 0, 0.0)?;
        let code = if n < 0.0 { None } else { s.chars().nth(n as usize) };
        Ok(code.map(|c| Value::Number(c as u32 as f64)).unwrap_or_default())
    });
    method(&mut table, "indexOf", 1, |interp, this, args| {
        let s: Vec<char> = this_string(interp, this)?.chars().collect();
        let needle: Vec<char> = string_arg(interp, args, 0)?.chars().collect();
        let from = clamp(position_arg(interp, args, 1, 0.0)?, s.len());
        Ok(Value::Number(find_chars(&s, &needle, from).map(|i| i as f64).unwrap_or(-1.0)))
    });
    method(&mut table, "lastIndexOf", 1, |interp, this, args| {
        let s: Vec<char> = this_string(interp, this)?.chars().collect();
        let needle: Vec<char> = string_arg(interp, args, 0)?.chars().collect();
        let from = clamp(position_arg(interp, args, 1, f64::INFINITY)?, s.len());
        Ok(Value::Number(rfind_chars(&s, &needle, from).map(|i| i as f64).unwrap_or(-1.0)))
    });
    method(&mut table, "includes", 1, |interp, this, args| {
        let s: Vec<char> = this_string(interp, this)?.chars().collect();
        let needle: Vec<char> = string_arg(interp, args, 0)?.chars().collect();
        let from = clamp(position_arg(interp, args, 1, 0.0)?, s.len());
        Ok(Value::Bool(find_chars(&s, &needle, from).is_some()))
    });
    method(&mut table, "startsWith", 1, |interp, this, args| {
        let s: Vec<char> = this_string(interp, this)?.chars().collect();
        let needle: Vec<char> = string_arg(interp, args, 0)?.chars().collect();
        let from = clamp(position_arg(interp, args, 1, 0.0)?, s.len());
        Ok(Value::Bool(s[from..].starts_with(&needle)))
    });
    method(&mut table, "endsWith", 1, |interp, this, args| {
        let s: Vec<char> = this_string(interp, this)?.chars().collect();
        let needle: Vec<char> = string_arg(interp, args, 0)?.chars().collect();
        let end = clamp(position_arg(interp, args, 1, f64::INFINITY)?, s.len());
        Ok(Value::Bool(s[..end].ends_with(&needle)))
    });
    method(&mut table, "slice", 2, |interp, this, args| {
        let s: Vec<char> = this_string(interp, this)?.chars().collect();
        let start = super::index_arg(interp, args, 0, s.len(), 0)?;
        let end = super::index_arg(interp, args, 1, s.len(), s.len())?;
        Ok(Value::string(if start < end {
            s[start..end].iter().collect::<String>()
        } else {
            String::new()
        }))
    });
    method(&mut table, "substring", 2, |interp, this, args| {
        let s: Vec<char> = this_string(interp, this)?.chars().collect();
        let start = clamp(position_arg(interp, args, 0, 0.0)?, s.len());
        let end = clamp(position_arg(interp, args, 1, f64::INFINITY)?, s.len());
        let (start, end) = if start > end { (end, start) } else { (start, end) };
        Ok(Value::string(s[start..end].iter().collect::<String>()))
    });
    method(&mut table, "substr", 2, |interp, this, args| {
        let s: Vec<char> = this_string(interp, this)?.chars().collect();
        let start = super::index_arg(interp, args, 0, s.len(), 0)?;
        let length = clamp(position_arg(interp, args, 1, f64::INFINITY)?, s.len() - start);
        Ok(Value::string(s[start..start + length].iter().collect::<String>()))
    });
    method(&mut table, "toUpperCase", 0, |interp, this, _| {
        Ok(Value::string(this_string(interp, this)?.to_uppercase()))
    });
    method(&mut table, "toLowerCase", 0, |interp, this, _| {
        Ok(Value::string(this_string(interp, this)?.to_lowercase()))
    });
    method(&mut table, "trim", 0, |interp, this, _| {
        Ok(Value::string(this_string(interp, this)?.trim_matches(is_js_whitespace)))
    });
    method(&mut table, "trimStart", 0, |interp, this, _| {
        Ok(Value::string(this_string(interp, this)?.trim_start_matches(is_js_whitespace)))
    });
    method(&mut table, "trimEnd", 0, |interp, this, _| {
        Ok(Value::string(this_string(interp, this)?.trim_end_matches(is_js_whitespace)))
    });
    method(&mut table, "padStart", 2, |interp, this, args| pad(interp, this, args, true));
    method(&mut table, "padEnd", 2, |interp, this, args| pad(interp, this, args, false));
    method(&mut table, "repeat", 1, |interp, this, args| {
        let s = this_string(interp, this)?;
        let count = to_integer(interp.to_number(&arg(args, 0))?);
        if count < 0.0 || count.is_infinite() {
            return Err(RuntimeError::range_error(format!(
                "Invalid count value: {}",
                crate::value::number_to_string(count)
            )));
        }
        if s.len() as f64 * count > MAX_STRING_LENGTH as f64 {
            return Err(RuntimeError::range_error("Invalid string length"));
        }
        Ok(Value::string(s.repeat(count as usize)))
    });
    method(&mut table, "split", 2, |interp, this, args| {
        let s = this_string(interp, this)?;
        let limit = match arg(args, 1) {
            Value::Undefined => usize::MAX,
            other => crate::value::to_uint32(interp.to_number(&other)?) as usize,
        };
        let parts: Vec<Value> = match arg(args, 0) {
            Value::Undefined => vec![Value::String(s.clone())],
            separator => {
                let separator = interp.to_string(&separator)?;
                if separator.is_empty() {
                    s.chars().map(|c| Value::string(c.to_string())).collect()
                } else {
                    s.split(separator.as_str()).map(Value::string).collect()
                }
            }
        };
        Ok(Value::array(parts.into_iter().take(limit).collect()))
    });
    method(&mut table, "concat", 1, |interp, this, args| {
        let mut s = this_string(interp, this)?.to_string();
        for value in args {
            s.push_str(&interp.to_string(value)?);
        }
        Ok(Value::string(s))
    });
    method(&mut table, "replace", 2, |interp, this, args| replace(interp, this, args, false));
    method(&mut table, "replaceAll", 2, |interp, this, args| replace(interp, this, args, true));
    method(&mut table, "localeCompare", 1, |interp, this, args| {
        let s = this_string(interp, this)?;
        let other = string_arg(interp, args, 0)?;
        Ok(Value::Number(match locale_compare(&s, &other) {
            Ordering::Less => -1.0,
            Ordering::Equal => 0.0,
            Ordering::Greater => 1.0,
        }))
    });

    table
}

fn is_js_whitespace(c: char) -> bool {
    c.is_whitespace() || c == '\u{feff}'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn test_find_chars() {
        assert_eq!(find_chars(&chars("hello"), &chars("l"), 0), Some(2));
        assert_eq!(find_chars(&chars("hello"), &chars("l"), 3), Some(3));
        assert_eq!(find_chars(&chars("hello"), &chars("z"), 0), None);
        assert_eq!(find_chars(&chars("hi"), &chars(""), 5), Some(2));
        assert_eq!(rfind_chars(&chars("hello"), &chars("l"), 10), Some(3));
    }

    #[test]
    fn test_locale_compare() {
        assert_eq!(locale_compare("apple", "Banana"), Ordering::Less);
        assert_eq!(locale_compare("a", "A"), Ordering::Less);
        assert_eq!(locale_compare("b", "b"), Ordering::Equal);
    }
}
