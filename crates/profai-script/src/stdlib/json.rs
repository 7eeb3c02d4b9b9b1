//! `JSON.stringify` and `JSON.parse`

use super::{arg, method, namespace, MethodTable};
use crate::interpreter::Interpreter;
use crate::stdlib::object::ordered_keys;
use crate::value::{number_to_string, RuntimeError, Value};
use indexmap::IndexMap;
use std::collections::HashSet;

/// Indentation is capped at ten characters
const MAX_INDENT: usize = 10;

/// Quote a string as a JSON string literal
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

struct Stringifier {
    indent: String,
    stack: HashSet<usize>,
}

impl Stringifier {
    /// `None` for values JSON omits (undefined, functions)
    fn serialize(
        &mut self,
        interp: &mut Interpreter,
        value: &Value,
        depth: usize,
    ) -> Result<Option<String>, RuntimeError> {
        // A user `toJSON` replaces the value
        let value = match value {
            Value::Object(_) => {
                let to_json = interp.get_named(value, "toJSON")?;
                if to_json.is_callable() {
                    interp.call_function(&to_json, value.clone(), &[])?
                } else {
                    value.clone()
                }
            }
            other => other.clone(),
        };

        Ok(Some(match &value {
            Value::Undefined | Value::Function(_) => return Ok(None),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) if n.is_finite() => number_to_string(*n),
            Value::Number(_) => "null".to_string(),
            Value::String(s) => quote(s),
            Value::Map(_) | Value::Set(_) => "{}".to_string(),
            Value::Array(items) => {
                self.enter(&value)?;
                let items = items.borrow().clone();
                let mut parts = Vec::with_capacity(items.len());
                for item in &items {
                    parts.push(
                        self.serialize(interp, item, depth + 1)?
                            .unwrap_or_else(|| "null".to_string()),
                    );
                }
                self.stack.remove(&value.identity());
                self.wrap('[', ']', parts, depth)
            }
            Value::Object(obj) => {
                self.enter(&value)?;
                let properties = obj.borrow().properties.clone();
                let mut parts = Vec::with_capacity(properties.len());
                for key in ordered_keys(&properties) {
                    let Some(item) = properties.get(&key) else { continue };
                    if let Some(serialized) = self.serialize(interp, item, depth + 1)? {
                        let separator = if self.indent.is_empty() { ":" } else { ": " };
                        parts.push(format!("{}{}{}", quote(&key), separator, serialized));
                    }
                }
                self.stack.remove(&value.identity());
                self.wrap('{', '}', parts, depth)
            }
        }))
    }

    fn enter(&mut self, value: &Value) -> Result<(), RuntimeError> {
        if !self.stack.insert(value.identity()) {
            return Err(RuntimeError::type_error(
                "Converting circular structure to JSON",
            ));
        }
        Ok(())
    }

    fn wrap(&self, open: char, close: char, parts: Vec<String>, depth: usize) -> String {
        if parts.is_empty() {
            return format!("{}{}", open, close);
        }
        if self.indent.is_empty() {
            return format!("{}{}{}", open, parts.join(","), close);
        }
        let inner = self.indent.repeat(depth + 1);
        let outer = self.indent.repeat(depth);
        format!(
            "{}\n{}{}\n{}{}",
            open,
            inner,
            parts.join(&format!(",\n{}", inner)),
            outer,
            close
        )
    }
}

/// `JSON.stringify(value, _, indent)`; `None` when the result is `undefined`
pub fn stringify(
    interp: &mut Interpreter,
    value: &Value,
    indent: &Value,
) -> Result<Option<String>, RuntimeError> {
    let indent = match indent {
        Value::Number(n) => " ".repeat(n.max(0.0).min(MAX_INDENT as f64) as usize),
        Value::String(s) => s.chars().take(MAX_INDENT).collect(),
        _ => String::new(),
    };
    let mut stringifier = Stringifier {
        indent,
        stack: HashSet::new(),
    };
    stringifier.serialize(interp, value, 0)
}

/// Convert parsed JSON into a runtime value
pub fn from_json(value: serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Value::from(s),
        serde_json::Value::Array(items) => Value::array(items.into_iter().map(from_json).collect()),
        serde_json::Value::Object(map) => {
            let properties: IndexMap<String, Value> =
                map.into_iter().map(|(k, v)| (k, from_json(v))).collect();
            Value::object(properties)
        }
    }
}

pub fn install(interp: &mut Interpreter) {
    let mut table = MethodTable::new();
    method(&mut table, "stringify", 3, |interp, _, args| {
        let value = arg(args, 0);
        Ok(match stringify(interp, &value, &arg(args, 2))? {
            Some(json) => Value::string(json),
            None => Value::Undefined,
        })
    });
    method(&mut table, "parse", 2, |interp, _, args| {
        let text = interp.to_string(&arg(args, 0))?;
        let parsed: serde_json::Value = serde_json::from_str(&text).map_err(|e| {
            RuntimeError::syntax_error(format!("Unexpected token in JSON: {}", e))
        })?;
        Ok(from_json(parsed))
    });
    interp.define_global("JSON", namespace(table));
}
