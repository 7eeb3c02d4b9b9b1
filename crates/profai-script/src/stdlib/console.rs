//! Captured `console`
//!
//! Scripts never write to the host's stdout. Every `console` call appends
//! a [`LogLine`] to a [`LogSink`] owned by whoever created the runtime.

use super::{method, namespace, MethodTable};
use crate::interpreter::Interpreter;
use crate::value::{RuntimeError, Value};
use serde::Serialize;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Console method a line was written with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Log,
    Info,
    Warn,
    Error,
    Debug,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Log => "log",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Debug => "debug",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One captured console line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogLine {
    pub level: LogLevel,
    pub text: String,
}

#[derive(Debug, Default)]
struct LogBuffer {
    lines: Vec<LogLine>,
    capacity: usize,
    dropped: usize,
}

/// Bounded, shareable console buffer
///
/// Clones share the same buffer. Lines past `capacity` are counted but
/// not stored.
#[derive(Debug, Clone)]
pub struct LogSink {
    inner: Rc<RefCell<LogBuffer>>,
}

impl LogSink {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Rc::new(RefCell::new(LogBuffer {
                capacity,
                ..LogBuffer::default()
            })),
        }
    }

    pub fn push(&self, level: LogLevel, text: String) {
        let mut buffer = self.inner.borrow_mut();
        if buffer.lines.len() >= buffer.capacity {
            buffer.dropped += 1;
            return;
        }
        buffer.lines.push(LogLine { level, text });
    }

    pub fn lines(&self) -> Vec<LogLine> {
        self.inner.borrow().lines.clone()
    }

    /// Captured text without levels
    pub fn texts(&self) -> Vec<String> {
        self.inner
            .borrow()
            .lines
            .iter()
            .map(|line| line.text.clone())
            .collect()
    }

    /// Lines discarded because the buffer was full
    pub fn dropped(&self) -> usize {
        self.inner.borrow().dropped
    }

    pub fn clear(&self) {
        let mut buffer = self.inner.borrow_mut();
        buffer.lines.clear();
        buffer.dropped = 0;
    }
}

/// Render one console argument the way Node prints it, roughly
fn render(interp: &mut Interpreter, value: &Value) -> Result<String, RuntimeError> {
    Ok(match value {
        Value::String(s) => s.to_string(),
        Value::Function(f) => {
            let name = f.name();
            if name.is_empty() {
                "[Function (anonymous)]".to_string()
            } else {
                format!("[Function: {}]", name)
            }
        }
        Value::Map(_) => "[object Map]".to_string(),
        Value::Set(_) => "[object Set]".to_string(),
        Value::Object(obj) if obj.borrow().error.is_some() => value.to_display_string(),
        Value::Array(_) | Value::Object(_) => {
            match super::json::stringify(interp, value, &Value::Undefined) {
                Ok(Some(json)) => json,
                Ok(None) => value.to_display_string(),
                // Circular structures still print something
                Err(err) if err.is_catchable() => value.to_display_string(),
                Err(err) => return Err(err),
            }
        }
        other => other.to_display_string(),
    })
}

/// Install `console` writing into `sink`
pub fn install(interp: &mut Interpreter, sink: LogSink) {
    let levels = [
        ("log", LogLevel::Log),
        ("info", LogLevel::Info),
        ("warn", LogLevel::Warn),
        ("error", LogLevel::Error),
        ("debug", LogLevel::Debug),
    ];

    let mut table = MethodTable::new();
    for (name, level) in levels {
        let sink = sink.clone();
        method(&mut table, name, 0, move |interp, _, args| {
            let mut parts = Vec::with_capacity(args.len());
            for value in args {
                parts.push(render(interp, value)?);
            }
            sink.push(level, parts.join(" "));
            Ok(Value::Undefined)
        });
    }
    interp.define_global("console", namespace(table));
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_sink_caps_lines() {
        let sink = LogSink::new(2);
        sink.push(LogLevel::Log, "a".into());
        sink.push(LogLevel::Warn, "b".into());
        sink.push(LogLevel::Error, "c".into());
        assert_eq!(sink.texts(), vec!["a", "b"]);
        assert_eq!(sink.dropped(), 1);

        sink.clear();
        assert!(sink.lines().is_empty());
        assert_eq!(sink.dropped(), 0);
    }

    #[test]
    fn test_clones_share_buffer() {
        let sink = LogSink::new(10);
        let other = sink.clone();
        other.push(LogLevel::Info, "shared".into());
        assert_eq!(sink.lines()[0].level, LogLevel::Info);
    }
}
