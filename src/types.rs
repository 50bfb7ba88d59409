//! Core types for quebind.
//!
//! [`Value`] is what flows through the whole runtime: it is what templates
//! read, what watchers compute, and what directives render. Reference values
//! (objects, arrays, functions) are cheap `Rc` handles, so cloning a `Value`
//! never copies a subtree of the data graph.
//!
//! Conversions follow the JavaScript rules the template language expects:
//! [`Value::to_js_string`] is `ToString`, [`Value::to_number`] is `ToNumber`,
//! [`Value::truthy`] is `ToBoolean`, and [`Value::strict_equals`] is `===`.

use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use crate::dom::Event;
use crate::error::Result;
use crate::reactive::{ArrayRef, ObjectRef, Scope};

// =============================================================================
// Value
// =============================================================================

/// A value in the observed data graph.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Object(ObjectRef),
    Array(ArrayRef),
    Function(Method),
}

impl Value {
    /// Name of the value's kind, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Object(_) => "object",
            Value::Array(_) => "array",
            Value::Function(_) => "function",
        }
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayRef> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Method> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    /// JavaScript `ToBoolean`.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Object(_) | Value::Array(_) | Value::Function(_) => true,
        }
    }

    /// JavaScript `ToNumber`.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::String(s) => parse_js_number(s),
            Value::Array(_) => parse_js_number(&self.to_js_string()),
            Value::Object(_) | Value::Function(_) => f64::NAN,
        }
    }

    /// JavaScript `ToString`.
    pub fn to_js_string(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::String(s) => s.clone(),
            Value::Object(_) => "[object Object]".to_string(),
            Value::Array(a) => a.join(","),
            Value::Function(_) => "function () { [native code] }".to_string(),
        }
    }

    /// JavaScript `===`. References compare by identity, `NaN` never equals itself.
    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Array(a), Value::Array(b)) => a.ptr_eq(b),
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// JavaScript `==`.
    pub fn loose_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (a, b) if a.is_nullish() && b.is_nullish() => true,
            (a, b) if a.is_nullish() || b.is_nullish() => false,
            (Value::Number(_), Value::String(_)) | (Value::String(_), Value::Number(_)) => {
                self.to_number() == other.to_number()
            }
            (Value::Bool(_), _) => Value::Number(self.to_number()).loose_equals(other),
            (_, Value::Bool(_)) => self.loose_equals(&Value::Number(other.to_number())),
            (Value::Object(_) | Value::Array(_), Value::Number(_) | Value::String(_)) => {
                Value::String(self.to_js_string()).loose_equals(other)
            }
            (Value::Number(_) | Value::String(_), Value::Object(_) | Value::Array(_)) => {
                self.loose_equals(&Value::String(other.to_js_string()))
            }
            _ => self.strict_equals(other),
        }
    }

    /// Ordering used by the default array sort: `undefined` last, everything
    /// else by the UTF-16 code units of its string form.
    pub fn default_sort_order(a: &Value, b: &Value) -> Ordering {
        match (a, b) {
            (Value::Undefined, Value::Undefined) => Ordering::Equal,
            (Value::Undefined, _) => Ordering::Greater,
            (_, Value::Undefined) => Ordering::Less,
            _ => a
                .to_js_string()
                .encode_utf16()
                .cmp(b.to_js_string().encode_utf16()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Object(o) => write!(f, "{o:?}"),
            Value::Array(a) => write!(f, "{a:?}"),
            Value::Function(m) => write!(f, "{m:?}"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_js_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<ObjectRef> for Value {
    fn from(o: ObjectRef) -> Self {
        Value::Object(o)
    }
}

impl From<ArrayRef> for Value {
    fn from(a: ArrayRef) -> Self {
        Value::Array(a)
    }
}

impl From<Method> for Value {
    fn from(m: Method) -> Self {
        Value::Function(m)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

// =============================================================================
// Number formatting / parsing
// =============================================================================

/// Format a number the way JavaScript's `ToString` does for the common cases.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    let abs = n.abs();
    if abs >= 1e21 || abs < 1e-6 {
        let s = format!("{n:e}");
        return match s.find('e') {
            Some(pos) if !s[pos + 1..].starts_with('-') => {
                format!("{}e+{}", &s[..pos], &s[pos + 1..])
            }
            _ => s,
        };
    }
    format!("{n}")
}

fn parse_js_number(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    let plausible = trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'));
    if !plausible {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

// =============================================================================
// Functions
// =============================================================================

/// Arguments passed to a [`Method`].
#[derive(Debug, Clone, Default)]
pub struct CallArgs {
    /// Positional arguments from a template call expression or a lifecycle hook.
    pub args: Vec<Value>,
    /// The triggering event, for methods bound with `@event`.
    pub event: Option<Event>,
}

impl CallArgs {
    pub fn new(args: Vec<Value>) -> Self {
        Self { args, event: None }
    }

    pub fn with_event(event: Event) -> Self {
        Self {
            args: Vec::new(),
            event: Some(event),
        }
    }

    /// Positional argument `i`, or `undefined`.
    pub fn arg(&self, i: usize) -> Value {
        self.args.get(i).cloned().unwrap_or_default()
    }
}

/// Signature of a function stored in the data graph. The scope argument is
/// `this`: the scope the call was made from.
pub type MethodFn = dyn Fn(&Scope, &CallArgs) -> Result<Value>;

/// A function-valued property (event handlers, lifecycle hooks, helpers
/// callable from templates).
#[derive(Clone)]
pub struct Method(Rc<MethodFn>);

impl Method {
    pub fn new(f: impl Fn(&Scope, &CallArgs) -> Result<Value> + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn call(&self, this: &Scope, args: &CallArgs) -> Result<Value> {
        (self.0)(this, args)
    }

    pub fn ptr_eq(&self, other: &Method) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[function]")
    }
}

// =============================================================================
// Array mutations
// =============================================================================

/// The seven structural operations of an observable array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrayOp {
    Push,
    Pop,
    Shift,
    Unshift,
    Splice,
    Sort,
    Reverse,
}

impl ArrayOp {
    pub fn as_str(self) -> &'static str {
        match self {
            ArrayOp::Push => "push",
            ArrayOp::Pop => "pop",
            ArrayOp::Shift => "shift",
            ArrayOp::Unshift => "unshift",
            ArrayOp::Splice => "splice",
            ArrayOp::Sort => "sort",
            ArrayOp::Reverse => "reverse",
        }
    }
}

impl fmt::Display for ArrayOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structural hint passed along a notification: which array operation ran
/// and with what arguments. Absent for plain value changes.
#[derive(Debug, Clone)]
pub struct Mutation {
    pub op: ArrayOp,
    pub args: Vec<Value>,
}
