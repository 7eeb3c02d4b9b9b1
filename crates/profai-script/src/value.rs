//! Runtime values
//!
//! Arrays, objects, maps and sets are shared mutable references, so two
//! bindings may alias the same array exactly as in JavaScript. Primitive
//! conversions that never run user code (ToNumber, ToString, equality)
//! live here; conversions that may call user methods live on the
//! interpreter.

use crate::ast::{ClassNode, FunctionNode};
use crate::interpreter::{EnvRef, Interpreter};
use indexmap::{IndexMap, IndexSet};
use ordered_float::OrderedFloat;
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};

pub type ArrayRef = Rc<RefCell<Vec<Value>>>;
pub type ObjectRef = Rc<RefCell<Object>>;
pub type MapRef = Rc<RefCell<IndexMap<MapKey, Value>>>;
pub type SetRef = Rc<RefCell<IndexSet<MapKey>>>;

/// Native function signature: interpreter, `this`, arguments
pub type NativeFn = Rc<dyn Fn(&mut Interpreter, &Value, &[Value]) -> Result<Value, RuntimeError>>;

/// Runtime value
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Array(ArrayRef),
    Object(ObjectRef),
    Function(Rc<Function>),
    Map(MapRef),
    Set(SetRef),
}

/// Plain object, class instance or error
#[derive(Debug, Default)]
pub struct Object {
    /// Own enumerable properties in insertion order
    pub properties: IndexMap<String, Value>,
    /// Class this object was constructed from
    pub class: Option<Rc<Class>>,
    /// Present on `Error` objects and instances of classes extending an error
    pub error: Option<ErrorData>,
    pub frozen: bool,
}

/// Non-enumerable state carried by error objects
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorData {
    /// Constructor that created the error (`Error`, `TypeError`, ...)
    pub kind: ErrorKind,
    pub name: Rc<str>,
    pub message: Rc<str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Error,
    TypeError,
    RangeError,
    SyntaxError,
    ReferenceError,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 5] = [
        ErrorKind::Error,
        ErrorKind::TypeError,
        ErrorKind::RangeError,
        ErrorKind::SyntaxError,
        ErrorKind::ReferenceError,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::Error => "Error",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::RangeError => "RangeError",
            ErrorKind::SyntaxError => "SyntaxError",
            ErrorKind::ReferenceError => "ReferenceError",
        }
    }
}

/// A callable value plus its own properties (`fn.cache = {}`, static members)
pub struct Function {
    pub kind: FunctionKind,
    pub properties: RefCell<IndexMap<String, Value>>,
}

pub enum FunctionKind {
    Closure(Closure),
    Native(NativeFunction),
    Class(Rc<Class>),
    Bound {
        target: Rc<Function>,
        this: Value,
        args: Vec<Value>,
    },
}

/// A user function together with the scope it closes over
pub struct Closure {
    /// Declared or inferred name (`const f = () => {}` is named `f`)
    pub name: Rc<str>,
    pub node: Rc<FunctionNode>,
    pub env: EnvRef,
    /// Source text the node's span points into
    pub source: Rc<str>,
    /// Class whose method this is; resolves `super`
    pub home: Option<Weak<Class>>,
}

pub struct NativeFunction {
    pub name: Rc<str>,
    pub arity: usize,
    pub func: NativeFn,
    /// Callable with `new`
    pub constructor: bool,
}

/// Runtime representation of a class declaration
pub struct Class {
    pub name: Rc<str>,
    pub node: Rc<ClassNode>,
    pub parent: Option<ClassParent>,
    pub methods: RefCell<IndexMap<String, Value>>,
    /// Instance field keys, aligned with their member index in `node`
    pub fields: Vec<(usize, String)>,
    pub env: EnvRef,
    pub source: Rc<str>,
}

#[derive(Clone)]
pub enum ClassParent {
    Class(Rc<Function>),
    Error(ErrorKind),
}

impl Class {
    /// Find a prototype method, walking up the inheritance chain
    pub fn find_method(&self, name: &str) -> Option<Value> {
        if let Some(method) = self.methods.borrow().get(name) {
            return Some(method.clone());
        }
        match &self.parent {
            Some(ClassParent::Class(parent)) => match &parent.kind {
                FunctionKind::Class(class) => class.find_method(name),
                _ => None,
            },
            _ => None,
        }
    }

    /// Error constructor at the root of the chain, if any
    pub fn error_root(&self) -> Option<ErrorKind> {
        match &self.parent {
            Some(ClassParent::Error(kind)) => Some(*kind),
            Some(ClassParent::Class(parent)) => match &parent.kind {
                FunctionKind::Class(class) => class.error_root(),
                _ => None,
            },
            None => None,
        }
    }

    /// Whether `self` is `other` or inherits from it
    pub fn is_subclass_of(&self, other: &Rc<Class>) -> bool {
        if std::ptr::eq(self, Rc::as_ptr(other)) {
            return true;
        }
        match &self.parent {
            Some(ClassParent::Class(parent)) => match &parent.kind {
                FunctionKind::Class(class) => class.is_subclass_of(other),
                _ => false,
            },
            _ => false,
        }
    }
}

impl Function {
    pub fn new(kind: FunctionKind) -> Self {
        Self {
            kind,
            properties: RefCell::new(IndexMap::new()),
        }
    }

    pub fn native(
        name: &str,
        arity: usize,
        func: impl Fn(&mut Interpreter, &Value, &[Value]) -> Result<Value, RuntimeError> + 'static,
    ) -> Value {
        Value::Function(Rc::new(Function::new(FunctionKind::Native(NativeFunction {
            name: Rc::from(name),
            arity,
            func: Rc::new(func),
            constructor: false,
        }))))
    }

    pub fn native_constructor(
        name: &str,
        arity: usize,
        func: impl Fn(&mut Interpreter, &Value, &[Value]) -> Result<Value, RuntimeError> + 'static,
    ) -> Value {
        Value::Function(Rc::new(Function::new(FunctionKind::Native(NativeFunction {
            name: Rc::from(name),
            arity,
            func: Rc::new(func),
            constructor: true,
        }))))
    }

    pub fn name(&self) -> Rc<str> {
        match &self.kind {
            FunctionKind::Closure(c) => c.name.clone(),
            FunctionKind::Native(n) => n.name.clone(),
            FunctionKind::Class(c) => c.name.clone(),
            FunctionKind::Bound { target, .. } => Rc::from(format!("bound {}", target.name())),
        }
    }

    pub fn arity(&self) -> usize {
        match &self.kind {
            FunctionKind::Closure(c) => c.node.arity(),
            FunctionKind::Native(n) => n.arity,
            FunctionKind::Class(c) => c
                .node
                .constructor
                .as_ref()
                .map(|ctor| ctor.arity())
                .unwrap_or(0),
            FunctionKind::Bound { target, args, .. } => target.arity().saturating_sub(args.len()),
        }
    }

    /// Source text for `String(fn)`
    pub fn source_text(&self) -> String {
        match &self.kind {
            FunctionKind::Closure(c) => slice_chars(&c.source, c.node.span.start, c.node.span.end),
            FunctionKind::Class(c) => slice_chars(&c.source, c.node.span.start, c.node.span.end),
            _ => format!("function {}() {{ [native code] }}", self.name()),
        }
    }
}

fn slice_chars(source: &str, start: usize, end: usize) -> String {
    source.chars().skip(start).take(end.saturating_sub(start)).collect()
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Function: {}]", self.name())
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[class {}]", self.name)
    }
}

/// Map/Set key compared with SameValueZero
#[derive(Clone)]
pub struct MapKey(pub Value);

impl MapKey {
    pub fn new(value: Value) -> Self {
        // -0 is stored as +0
        match value {
            Value::Number(n) if n == 0.0 => MapKey(Value::Number(0.0)),
            other => MapKey(other),
        }
    }
}

impl PartialEq for MapKey {
    fn eq(&self, other: &Self) -> bool {
        same_value_zero(&self.0, &other.0)
    }
}

impl Eq for MapKey {}

impl Hash for MapKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(&self.0).hash(state);
        match &self.0 {
            Value::Undefined | Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::Number(n) => {
                let canonical = if n.is_nan() {
                    f64::NAN
                } else if *n == 0.0 {
                    0.0
                } else {
                    *n
                };
                OrderedFloat(canonical).hash(state)
            }
            Value::String(s) => s.hash(state),
            other => other.identity().hash(state),
        }
    }
}

/// Errors that abort evaluation
#[derive(Debug, Clone, thiserror::Error)]
pub enum RuntimeError {
    /// A JavaScript exception; catchable by `try`
    #[error("{}", .0.to_display_string())]
    Thrown(Value),
    /// Step budget exhausted; not catchable
    #[error("RangeError: Execution step limit exceeded ({0} steps)")]
    StepLimitExceeded(u64),
    /// Wall-clock budget exhausted; not catchable
    #[error("RangeError: Execution time limit exceeded ({0} ms)")]
    TimeLimitExceeded(u128),
}

impl RuntimeError {
    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        RuntimeError::Thrown(Value::new_error(kind, &message.into()))
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::error(ErrorKind::TypeError, message)
    }

    pub fn range_error(message: impl Into<String>) -> Self {
        Self::error(ErrorKind::RangeError, message)
    }

    pub fn reference_error(message: impl Into<String>) -> Self {
        Self::error(ErrorKind::ReferenceError, message)
    }

    pub fn syntax_error(message: impl Into<String>) -> Self {
        Self::error(ErrorKind::SyntaxError, message)
    }

    /// Whether a `try` statement may intercept this error
    pub fn is_catchable(&self) -> bool {
        matches!(self, RuntimeError::Thrown(_))
    }
}

impl Value {
    pub fn string(s: impl AsRef<str>) -> Value {
        Value::String(Rc::from(s.as_ref()))
    }

    pub fn array(items: Vec<Value>) -> Value {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn object(properties: IndexMap<String, Value>) -> Value {
        Value::Object(Rc::new(RefCell::new(Object {
            properties,
            ..Object::default()
        })))
    }

    pub fn new_error(kind: ErrorKind, message: &str) -> Value {
        Value::Object(Rc::new(RefCell::new(Object {
            error: Some(ErrorData {
                kind,
                name: Rc::from(kind.name()),
                message: Rc::from(message),
            }),
            ..Object::default()
        })))
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Function(_))
    }

    /// Pointer identity for reference values
    pub fn identity(&self) -> usize {
        match self {
            Value::Array(a) => Rc::as_ptr(a) as *const () as usize,
            Value::Object(o) => Rc::as_ptr(o) as *const () as usize,
            Value::Function(f) => Rc::as_ptr(f) as *const () as usize,
            Value::Map(m) => Rc::as_ptr(m) as *const () as usize,
            Value::Set(s) => Rc::as_ptr(s) as *const () as usize,
            _ => 0,
        }
    }

    /// Result of the `typeof` operator
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "object",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Function(_) => "function",
            Value::Array(_) | Value::Object(_) | Value::Map(_) | Value::Set(_) => "object",
        }
    }

    /// ToBoolean
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// ToNumber for values whose conversion never runs user code
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Number(n) => *n,
            Value::String(s) => string_to_number(s),
            Value::Array(_) => string_to_number(&self.to_display_string()),
            _ => f64::NAN,
        }
    }

    /// ToString without invoking user-defined `toString` methods
    pub fn to_display_string(&self) -> String {
        let mut seen = HashSet::new();
        self.display_into(&mut seen)
    }

    fn display_into(&self, seen: &mut HashSet<usize>) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => number_to_string(*n),
            Value::String(s) => s.to_string(),
            Value::Array(items) => {
                // Cyclic arrays join as empty, matching engines
                if !seen.insert(self.identity()) {
                    return String::new();
                }
                let parts: Vec<String> = items
                    .borrow()
                    .iter()
                    .map(|item| match item {
                        Value::Undefined | Value::Null => String::new(),
                        other => other.display_into(seen),
                    })
                    .collect();
                seen.remove(&self.identity());
                parts.join(",")
            }
            Value::Object(obj) => {
                let obj = obj.borrow();
                match &obj.error {
                    Some(error) => {
                        let name = obj
                            .properties
                            .get("name")
                            .map(|v| v.display_into(seen))
                            .unwrap_or_else(|| error.name.to_string());
                        let message = obj
                            .properties
                            .get("message")
                            .map(|v| v.display_into(seen))
                            .unwrap_or_else(|| error.message.to_string());
                        error_string(&name, &message)
                    }
                    None => "[object Object]".to_string(),
                }
            }
            Value::Function(f) => f.source_text(),
            Value::Map(_) => "[object Map]".to_string(),
            Value::Set(_) => "[object Set]".to_string(),
        }
    }
}

/// `Error.prototype.toString` formatting
pub fn error_string(name: &str, message: &str) -> String {
    match (name.is_empty(), message.is_empty()) {
        (_, true) => name.to_string(),
        (true, false) => message.to_string(),
        (false, false) => format!("{}: {}", name, message),
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s),
            Value::Array(items) => match items.try_borrow() {
                Ok(items) => f.debug_list().entries(items.iter()).finish(),
                Err(_) => write!(f, "[Array]"),
            },
            Value::Object(obj) => match obj.try_borrow() {
                Ok(obj) if obj.error.is_none() => {
                    f.debug_map().entries(obj.properties.iter()).finish()
                }
                _ => write!(f, "{}", self.to_display_string()),
            },
            Value::Function(func) => write!(f, "{:?}", func),
            other => write!(f, "{}", other.to_display_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Rc::from(s))
    }
}

// === Primitive operations ===

/// Number to string conversion (Number::toString with radix 10)
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }

    let sign = if n < 0.0 { "-" } else { "" };
    // `{:e}` yields the shortest round-trip digits
    let formatted = format!("{:e}", n.abs());
    let (mantissa, exponent) = formatted.split_once('e').unwrap_or((&formatted, "0"));
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let k = digits.len() as i32;
    let n = exponent + 1;

    let body = if k <= n && n <= 21 {
        format!("{}{}", digits, "0".repeat((n - k) as usize))
    } else if 0 < n && n <= 21 {
        format!("{}.{}", &digits[..n as usize], &digits[n as usize..])
    } else if -6 < n && n <= 0 {
        format!("0.{}{}", "0".repeat((-n) as usize), digits)
    } else {
        let exp_sign = if n - 1 < 0 { "-" } else { "+" };
        let rest = if k > 1 {
            format!(".{}", &digits[1..])
        } else {
            String::new()
        };
        format!("{}{}e{}{}", &digits[..1], rest, exp_sign, (n - 1).abs())
    };
    format!("{}{}", sign, body)
}

/// ToNumber applied to a string
pub fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}');
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    let lower = trimmed.to_ascii_lowercase();
    for (prefix, radix) in [("0x", 16), ("0o", 8), ("0b", 2)] {
        if let Some(digits) = lower.strip_prefix(prefix) {
            if digits.is_empty() {
                return f64::NAN;
            }
            let mut value = 0.0;
            for c in digits.chars() {
                match c.to_digit(radix) {
                    Some(d) => value = value * radix as f64 + d as f64,
                    None => return f64::NAN,
                }
            }
            return value;
        }
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
    {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

/// Canonical array index for a property key
pub fn parse_index(key: &str) -> Option<usize> {
    if key.is_empty() || key.len() > 10 || (key.len() > 1 && key.starts_with('0')) {
        return None;
    }
    if !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    key.parse::<u64>()
        .ok()
        .filter(|n| *n < u32::MAX as u64)
        .map(|n| n as usize)
}

/// Integer index from a numeric key, if it is one
pub fn number_to_index(n: f64) -> Option<usize> {
    if n >= 0.0 && n.fract() == 0.0 && n < u32::MAX as f64 {
        Some(n as usize)
    } else {
        None
    }
}

/// ToInt32
pub fn to_int32(n: f64) -> i32 {
    to_uint32(n) as i32
}

/// ToUint32
pub fn to_uint32(n: f64) -> u32 {
    if !n.is_finite() || n == 0.0 {
        return 0;
    }
    let int = n.trunc();
    let modulo = int.rem_euclid(4294967296.0);
    modulo as u32
}

/// `===`
pub fn strict_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Array(_), Value::Array(_))
        | (Value::Object(_), Value::Object(_))
        | (Value::Function(_), Value::Function(_))
        | (Value::Map(_), Value::Map(_))
        | (Value::Set(_), Value::Set(_)) => a.identity() == b.identity(),
        _ => false,
    }
}

/// SameValueZero: like `===` but NaN equals NaN
pub fn same_value_zero(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) if x.is_nan() && y.is_nan() => true,
        _ => strict_equals(a, b),
    }
}

/// `==` for operands whose primitive conversion needs no user code
pub fn loose_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (x, y) if std::mem::discriminant(x) == std::mem::discriminant(y) => strict_equals(x, y),
        (Value::Undefined | Value::Null, Value::Undefined | Value::Null) => true,
        (Value::Undefined | Value::Null, _) | (_, Value::Undefined | Value::Null) => false,
        (Value::Number(x), Value::String(s)) | (Value::String(s), Value::Number(x)) => {
            *x == string_to_number(s)
        }
        (Value::Bool(x), other) | (other, Value::Bool(x)) => {
            loose_equals(&Value::Number(if *x { 1.0 } else { 0.0 }), other)
        }
        (primitive @ (Value::Number(_) | Value::String(_)), object)
        | (object, primitive @ (Value::Number(_) | Value::String(_))) => {
            loose_equals(primitive, &Value::string(object.to_display_string()))
        }
        _ => false,
    }
}
