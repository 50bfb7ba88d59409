//! Tree-walking evaluator.
//!
//! Identifier lookups go through [`Scope::get`], so evaluating inside a
//! watcher registers the watcher with every property the expression reads.

use std::cmp::Ordering;

use super::ast::{BinaryOp, Expr, Literal, LogicalOp, Property, UnaryOp};
use crate::error::{Error, Result};
use crate::reactive::{ArrayRef, ObjectRef, Scope};
use crate::types::{format_number, CallArgs, Method, Value};

pub fn evaluate(expr: &Expr, scope: &Scope) -> Result<Value> {
    match expr {
        Expr::Literal(literal) => Ok(match literal {
            Literal::Undefined => Value::Undefined,
            Literal::Null => Value::Null,
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Number(n) => Value::Number(*n),
            Literal::String(s) => Value::String(s.clone()),
        }),
        Expr::Identifier(name) => Ok(scope.get(name)),
        Expr::Math => Ok(Value::Object(math())),
        Expr::Array(items) => {
            let values = items
                .iter()
                .map(|item| evaluate(item, scope))
                .collect::<Result<Vec<_>>>()?;
            Ok(Value::Array(ArrayRef::from_values(values)))
        }
        Expr::Member { object, property } => {
            let target = evaluate(object, scope)?;
            let key = match property {
                Property::Named(name) => Value::String(name.clone()),
                Property::Computed(key) => evaluate(key, scope)?,
            };
            get_member(&target, &key)
        }
        Expr::Call { callee, args } => {
            let function = evaluate(callee, scope)?;
            let Value::Function(method) = function else {
                return Err(Error::NotCallable {
                    callee: callee.to_string(),
                });
            };
            let args = args
                .iter()
                .map(|arg| evaluate(arg, scope))
                .collect::<Result<Vec<_>>>()?;
            method.call(scope, &CallArgs::new(args))
        }
        Expr::Unary { op, operand } => {
            let value = evaluate(operand, scope)?;
            Ok(match op {
                UnaryOp::Not => Value::Bool(!value.truthy()),
                UnaryOp::Neg => Value::Number(-value.to_number()),
                UnaryOp::Plus => Value::Number(value.to_number()),
            })
        }
        Expr::Binary { op, left, right } => {
            let left = evaluate(left, scope)?;
            let right = evaluate(right, scope)?;
            Ok(binary(*op, &left, &right))
        }
        Expr::Logical { op, left, right } => {
            let left = evaluate(left, scope)?;
            match (op, left.truthy()) {
                (LogicalOp::And, false) | (LogicalOp::Or, true) => Ok(left),
                _ => evaluate(right, scope),
            }
        }
        Expr::Conditional {
            test,
            consequent,
            alternate,
        } => {
            if evaluate(test, scope)?.truthy() {
                evaluate(consequent, scope)
            } else {
                evaluate(alternate, scope)
            }
        }
    }
}

// =============================================================================
// Operators
// =============================================================================

fn to_primitive(value: &Value) -> Value {
    match value {
        Value::Object(_) | Value::Array(_) | Value::Function(_) => {
            Value::String(value.to_js_string())
        }
        other => other.clone(),
    }
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Value {
    match op {
        BinaryOp::Add => {
            let (l, r) = (to_primitive(left), to_primitive(right));
            if matches!(l, Value::String(_)) || matches!(r, Value::String(_)) {
                Value::String(l.to_js_string() + &r.to_js_string())
            } else {
                Value::Number(l.to_number() + r.to_number())
            }
        }
        BinaryOp::Sub => Value::Number(left.to_number() - right.to_number()),
        BinaryOp::Mul => Value::Number(left.to_number() * right.to_number()),
        BinaryOp::Div => Value::Number(left.to_number() / right.to_number()),
        BinaryOp::Rem => Value::Number(left.to_number() % right.to_number()),
        BinaryOp::Lt => Value::Bool(compare(left, right) == Some(Ordering::Less)),
        BinaryOp::Gt => Value::Bool(compare(left, right) == Some(Ordering::Greater)),
        BinaryOp::Le => Value::Bool(matches!(
            compare(left, right),
            Some(Ordering::Less | Ordering::Equal)
        )),
        BinaryOp::Ge => Value::Bool(matches!(
            compare(left, right),
            Some(Ordering::Greater | Ordering::Equal)
        )),
        BinaryOp::Eq => Value::Bool(left.loose_equals(right)),
        BinaryOp::Ne => Value::Bool(!left.loose_equals(right)),
        BinaryOp::StrictEq => Value::Bool(left.strict_equals(right)),
        BinaryOp::StrictNe => Value::Bool(!left.strict_equals(right)),
    }
}

/// Abstract relational comparison. `None` when either side is `NaN`.
fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (to_primitive(left), to_primitive(right)) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(&b)),
        (a, b) => a.to_number().partial_cmp(&b.to_number()),
    }
}

// =============================================================================
// Member access
// =============================================================================

/// `target[key]` with JavaScript lookup rules for the supported value kinds.
pub fn get_member(target: &Value, key: &Value) -> Result<Value> {
    match target {
        Value::Undefined | Value::Null => Err(Error::type_error(format!(
            "cannot read property `{}` of {}",
            key.to_js_string(),
            target.type_name()
        ))),
        Value::Object(object) => Ok(object.get(&key.to_js_string())),
        Value::Array(array) => Ok(array_member(array, key)),
        Value::String(s) => Ok(string_member(s, key)),
        Value::Number(n) => Ok(number_member(*n, key)),
        Value::Bool(_) | Value::Function(_) => Ok(Value::Undefined),
    }
}

/// A non-negative integer key, as a number or its canonical string form.
fn index_key(key: &Value) -> Option<usize> {
    match key {
        Value::Number(n) if *n >= 0.0 && n.fract() == 0.0 && *n < usize::MAX as f64 => {
            Some(*n as usize)
        }
        Value::String(s) => s
            .parse::<usize>()
            .ok()
            .filter(|i| i.to_string() == *s),
        _ => None,
    }
}

fn array_member(array: &ArrayRef, key: &Value) -> Value {
    if let Some(index) = index_key(key) {
        return array.get(index);
    }
    let receiver = array.clone();
    match key.to_js_string().as_str() {
        "length" => Value::from(array.len()),
        "join" => bound(move |args| {
            let separator = match args.arg(0) {
                Value::Undefined => ",".to_string(),
                sep => sep.to_js_string(),
            };
            Ok(Value::String(receiver.join(&separator)))
        }),
        "indexOf" => bound(move |args| {
            Ok(receiver
                .index_of(&args.arg(0))
                .map_or(Value::Number(-1.0), Value::from))
        }),
        "includes" => bound(move |args| {
            let needle = args.arg(0);
            let found = receiver.to_vec().iter().any(|item| same_value_zero(item, &needle));
            Ok(Value::Bool(found))
        }),
        _ => Value::Undefined,
    }
}

/// `SameValueZero`: like `===` except `NaN` matches `NaN`.
fn same_value_zero(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) if x.is_nan() && y.is_nan() => true,
        _ => a.strict_equals(b),
    }
}

fn string_member(s: &str, key: &Value) -> Value {
    if let Some(index) = index_key(key) {
        let units: Vec<u16> = s.encode_utf16().collect();
        return units
            .get(index)
            .map_or(Value::Undefined, |unit| {
                Value::String(String::from_utf16_lossy(&[*unit]))
            });
    }
    let receiver = s.to_string();
    match key.to_js_string().as_str() {
        "length" => Value::from(s.encode_utf16().count()),
        "toUpperCase" => bound(move |_| Ok(Value::String(receiver.to_uppercase()))),
        "toLowerCase" => bound(move |_| Ok(Value::String(receiver.to_lowercase()))),
        "trim" => bound(move |_| Ok(Value::String(receiver.trim().to_string()))),
        _ => Value::Undefined,
    }
}

fn number_member(n: f64, key: &Value) -> Value {
    match key.to_js_string().as_str() {
        "toFixed" => bound(move |args| {
            let digits = args.arg(0).to_number();
            let digits = if digits.is_nan() { 0.0 } else { digits.trunc() };
            if !(0.0..=100.0).contains(&digits) {
                return Err(Error::type_error("toFixed() digits argument must be between 0 and 100"));
            }
            if !n.is_finite() {
                return Ok(Value::String(format_number(n)));
            }
            Ok(Value::String(format!("{:.*}", digits as usize, n)))
        }),
        _ => Value::Undefined,
    }
}

/// A builtin method closed over its receiver.
fn bound(f: impl Fn(&CallArgs) -> Result<Value> + 'static) -> Value {
    Value::Function(Method::new(move |_this, args| f(args)))
}

// =============================================================================
// Math
// =============================================================================

thread_local! {
    static MATH: ObjectRef = build_math();
}

/// The `Math` namespace object (one per thread).
pub fn math() -> ObjectRef {
    MATH.with(ObjectRef::clone)
}

fn unary_math(f: fn(f64) -> f64) -> Value {
    Value::Function(Method::new(move |_this, args| {
        Ok(Value::Number(f(args.arg(0).to_number())))
    }))
}

fn fold_math(init: f64, pick: fn(f64, f64) -> f64) -> Value {
    Value::Function(Method::new(move |_this, args| {
        let mut acc = init;
        for arg in &args.args {
            let n = arg.to_number();
            if n.is_nan() {
                return Ok(Value::Number(f64::NAN));
            }
            acc = pick(acc, n);
        }
        Ok(Value::Number(acc))
    }))
}

/// `Math.round` rounds half-way cases toward positive infinity.
fn js_round(n: f64) -> f64 {
    (n + 0.5).floor()
}

fn build_math() -> ObjectRef {
    ObjectRef::from_pairs([
        ("PI", Value::Number(std::f64::consts::PI)),
        ("E", Value::Number(std::f64::consts::E)),
        ("abs", unary_math(f64::abs)),
        ("ceil", unary_math(f64::ceil)),
        ("floor", unary_math(f64::floor)),
        ("round", unary_math(js_round)),
        ("sqrt", unary_math(f64::sqrt)),
        (
            "pow",
            Value::Function(Method::new(|_this, args| {
                Ok(Value::Number(args.arg(0).to_number().powf(args.arg(1).to_number())))
            })),
        ),
        ("min", fold_math(f64::INFINITY, f64::min)),
        ("max", fold_math(f64::NEG_INFINITY, f64::max)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::ast::parse;
    use serde_json::json;

    fn eval(src: &str, data: serde_json::Value) -> Value {
        let root = Value::from(data).as_object().cloned().unwrap();
        evaluate(&parse(src).unwrap(), &Scope::new(root)).unwrap()
    }

    fn eval_str(src: &str) -> String {
        eval(src, json!({ "a": 2, "s": "Hi", "list": [1, 2, 3], "user": { "name": "Ann" } }))
            .to_js_string()
    }

    #[test]
    fn test_arithmetic_and_concatenation() {
        assert_eq!(eval_str("a * 3 + 1"), "7");
        assert_eq!(eval_str("'n=' + a"), "n=2");
        assert_eq!(eval_str("1 + 2 + 'x'"), "3x");
        assert_eq!(eval_str("list + ''"), "1,2,3");
        assert_eq!(eval_str("7 % 4"), "3");
        assert_eq!(eval_str("1 / 0"), "Infinity");
    }

    #[test]
    fn test_comparison_and_logic() {
        assert_eq!(eval_str("a > 1 && a < 3"), "true");
        assert_eq!(eval_str("missing || 'fallback'"), "fallback");
        assert_eq!(eval_str("a == '2'"), "true");
        assert_eq!(eval_str("a === '2'"), "false");
        assert_eq!(eval_str("'b' > 'a'"), "true");
        assert_eq!(eval_str("a ? 'yes' : 'no'"), "yes");
        assert_eq!(eval_str("!a"), "false");
    }

    #[test]
    fn test_members_and_builtins() {
        assert_eq!(eval_str("user.name"), "Ann");
        assert_eq!(eval_str("user['name'].toUpperCase()"), "ANN");
        assert_eq!(eval_str("list.length"), "3");
        assert_eq!(eval_str("list[1]"), "2");
        assert_eq!(eval_str("list.join('-')"), "1-2-3");
        assert_eq!(eval_str("list.indexOf(3)"), "2");
        assert_eq!(eval_str("list.includes(4)"), "false");
        assert_eq!(eval_str("s.length"), "2");
        assert_eq!(eval_str("s[0]"), "H");
        assert_eq!(eval_str("(1.005 * 2).toFixed(1)"), "2.0");
        assert_eq!(eval_str("[1, 'b'].length"), "2");
    }

    #[test]
    fn test_math() {
        assert_eq!(eval_str("Math.max(1, a, 0)"), "2");
        assert_eq!(eval_str("Math.round(2.5)"), "3");
        assert_eq!(eval_str("Math.round(-2.5)"), "-2");
        assert_eq!(eval_str("Math.floor(Math.PI)"), "3");
        assert_eq!(eval_str("Math.min()"), "Infinity");
    }

    #[test]
    fn test_type_errors() {
        let root = ObjectRef::new();
        let scope = Scope::new(root);
        let err = evaluate(&parse("missing.deep").unwrap(), &scope).unwrap_err();
        assert!(matches!(err, Error::Type(_)));

        let err = evaluate(&parse("missing()").unwrap(), &scope).unwrap_err();
        assert_eq!(
            err,
            Error::NotCallable {
                callee: "missing".to_string()
            }
        );
    }

    #[test]
    fn test_scope_methods_receive_scope_as_this() {
        let root = ObjectRef::from_pairs([("base", Value::from(10))]);
        root.set(
            "add",
            Method::new(|this, args| Ok(Value::Number(this.get("base").to_number() + args.arg(0).to_number()))),
        )
        .unwrap();
        let value = evaluate(&parse("add(5)").unwrap(), &Scope::new(root)).unwrap();
        assert_eq!(value.to_number(), 15.0);
    }
}
