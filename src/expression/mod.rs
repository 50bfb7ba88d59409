//! Expression Parser - template expressions compiled once, evaluated many times.
//!
//! A template expression is a small JavaScript-flavoured formula evaluated
//! against a [`Scope`]. Bare identifiers resolve against the scope (frames
//! first, then the root object); property names after `.` do not.
//!
//! # Programs
//!
//! [`build_function`] turns a source string into a shared [`Program`]:
//!
//! - **simple**: `root(.key | ['key'] | ["key"] | [0] | [ident])*`, read as a
//!   direct path walk
//! - **complex**: anything else, tokenized and parsed into a tree
//! - **invalid**: the parse failed; the error is raised on evaluation, never
//!   at build time
//!
//! Programs are cached per thread by their exact source text, so the second
//! build of the same string returns the same `Rc`.
//!
//! # Example
//!
//! ```ignore
//! use quebind::expression::{build_function, parse_mustache};
//!
//! let src = parse_mustache("Hello {{user.name}}!").unwrap();
//! assert_eq!(src, r#""Hello "+(user.name)+"!""#);
//!
//! let program = build_function(&src);
//! let text = program.evaluate(&scope)?;
//! ```

mod ast;
mod eval;
mod lexer;

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

pub use ast::{is_reserved, parse, BinaryOp, Expr, Literal, LogicalOp, Property, UnaryOp, RESERVED};
pub use eval::{get_member, math};

use crate::error::{Error, Result};
use crate::reactive::{untracked, Scope};
use crate::types::Value;

// =============================================================================
// Simple paths
// =============================================================================

/// One access step of a simple path.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// `.key`, `['key']` or `["key"]`
    Key(String),
    /// `[3]`
    Index(usize),
    /// `[name]`, where `name` is itself looked up in the scope
    Var(String),
}

/// `root` followed by zero or more property accesses.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub root: String,
    pub segments: Vec<Segment>,
}

impl Path {
    fn read(&self, scope: &Scope) -> Result<Value> {
        let mut value = scope.get(&self.root);
        for segment in &self.segments {
            let key = match segment {
                Segment::Key(key) => Value::String(key.clone()),
                Segment::Index(i) => Value::from(*i),
                Segment::Var(name) => scope.get(name),
            };
            value = get_member(&value, &key)?;
        }
        Ok(value)
    }
}

/// Recognize a simple property path. Reserved roots are never simple.
pub fn parse_simple_path(src: &str) -> Option<Path> {
    let ident_len = |s: &str| -> usize {
        let mut chars = s.char_indices();
        match chars.next() {
            Some((_, c)) if lexer::is_ident_start(c) => {}
            _ => return 0,
        }
        chars
            .find(|&(_, c)| !lexer::is_ident_part(c))
            .map_or(s.len(), |(i, _)| i)
    };

    let len = ident_len(src);
    if len == 0 || is_reserved(&src[..len]) {
        return None;
    }
    let root = src[..len].to_string();
    let mut rest = &src[len..];
    let mut segments = Vec::new();

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix('.') {
            let len = ident_len(after);
            if len == 0 {
                return None;
            }
            segments.push(Segment::Key(after[..len].to_string()));
            rest = &after[len..];
        } else if let Some(after) = rest.strip_prefix('[') {
            let close = after.find(']')?;
            let inner = &after[..close];
            let segment = match inner.as_bytes().first()? {
                q @ (b'\'' | b'"') => {
                    let quote = *q as char;
                    let key = inner.strip_prefix(quote)?.strip_suffix(quote)?;
                    Segment::Key(key.to_string())
                }
                b'0'..=b'9' if inner.bytes().all(|b| b.is_ascii_digit()) => {
                    Segment::Index(inner.parse().ok()?)
                }
                _ if ident_len(inner) == inner.len() => Segment::Var(inner.to_string()),
                _ => return None,
            };
            segments.push(segment);
            rest = &after[close + 1..];
        } else {
            return None;
        }
    }

    Some(Path { root, segments })
}

// =============================================================================
// Program
// =============================================================================

#[derive(Debug)]
pub enum ProgramKind {
    Simple(Path),
    Complex(Expr),
    Invalid(Error),
}

/// A compiled expression.
#[derive(Debug)]
pub struct Program {
    source: String,
    kind: ProgramKind,
}

impl Program {
    /// Classify and parse `source`. Never fails; syntax errors are kept and
    /// returned by [`Program::evaluate`].
    pub fn compile(source: &str) -> Self {
        let kind = match parse_simple_path(source) {
            Some(path) => ProgramKind::Simple(path),
            None => match parse(source) {
                Ok(expr) => ProgramKind::Complex(expr),
                Err(message) => ProgramKind::Invalid(Error::Syntax {
                    expr: source.to_string(),
                    message,
                }),
            },
        };
        Self {
            source: source.to_string(),
            kind,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn kind(&self) -> &ProgramKind {
        &self.kind
    }

    pub fn is_simple(&self) -> bool {
        matches!(self.kind, ProgramKind::Simple(_))
    }

    pub fn evaluate(&self, scope: &Scope) -> Result<Value> {
        match &self.kind {
            ProgramKind::Simple(path) => path.read(scope),
            ProgramKind::Complex(expr) => eval::evaluate(expr, scope),
            ProgramKind::Invalid(err) => Err(err.clone()),
        }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

// =============================================================================
// Cache
// =============================================================================

thread_local! {
    static CACHE: RefCell<HashMap<String, Rc<Program>>> = RefCell::new(HashMap::new());
}

/// Compiled program for `expr`, built on first use and cached.
pub fn build_function(expr: &str) -> Rc<Program> {
    if let Some(program) = CACHE.with(|cache| cache.borrow().get(expr).cloned()) {
        return program;
    }
    let program = Rc::new(Program::compile(expr));
    tracing::trace!(
        message = "expression.compile",
        expr,
        simple = program.is_simple()
    );
    CACHE.with(|cache| {
        cache
            .borrow_mut()
            .insert(expr.to_string(), program.clone());
    });
    program
}

/// Build and evaluate in one step.
pub fn compute(expr: &str, scope: &Scope) -> Result<Value> {
    build_function(expr).evaluate(scope)
}

/// Number of cached programs.
pub fn cache_len() -> usize {
    CACHE.with(|cache| cache.borrow().len())
}

/// Clear the cache (for testing).
pub fn reset_cache() {
    CACHE.with(|cache| cache.borrow_mut().clear());
}

// =============================================================================
// Mustache
// =============================================================================

/// Rewrite text with `{{expr}}` spans into one concatenation expression.
///
/// `'a {{b}} c'` becomes `"a "+(b)+" c"`. Returns `None` when the text has no
/// interpolation. A span is non-empty, closes at the first `}}`, and never
/// crosses a line break.
pub fn parse_mustache(text: &str) -> Option<String> {
    let mut pieces = Vec::new();
    let mut literal_start = 0;
    let mut pos = 0;
    let mut found = false;

    while let Some(open) = text[pos..].find("{{").map(|i| pos + i) {
        let body_start = open + 2;
        let close = text[body_start..].chars().next().and_then(|first| {
            let from = body_start + first.len_utf8();
            text[from..].find("}}").map(|i| from + i)
        });
        let Some(close) = close.filter(|&close| !text[body_start..close].contains('\n')) else {
            pos = open + 1;
            continue;
        };

        if open > literal_start {
            pieces.push(quote(&text[literal_start..open]));
        }
        pieces.push(format!("({})", &text[body_start..close]));
        found = true;
        literal_start = close + 2;
        pos = literal_start;
    }

    if !found {
        return None;
    }
    if literal_start < text.len() {
        pieces.push(quote(&text[literal_start..]));
    }
    Some(pieces.join("+"))
}

fn quote(literal: &str) -> String {
    let mut out = String::with_capacity(literal.len() + 2);
    out.push('"');
    for c in literal.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

// =============================================================================
// Assignment
// =============================================================================

/// Assign `value` at the simple path `expr` (the `model` write-back).
///
/// Intermediate steps are read untracked. The last step must land on an
/// object property or an array slot.
pub fn assign_path(scope: &Scope, expr: &str, value: Value) -> Result<()> {
    let path = parse_simple_path(expr.trim()).ok_or_else(|| Error::InvalidPath(expr.to_string()))?;
    let Some((last, init)) = path.segments.split_last() else {
        return scope.set(&path.root, value);
    };

    untracked(|| {
        let mut target = scope.peek(&path.root);
        for segment in init {
            let key = segment_key(scope, segment);
            target = get_member(&target, &key)?;
        }
        let key = segment_key(scope, last);
        match (&target, &key) {
            (Value::Object(object), key) => object.set(&key.to_js_string(), value),
            (Value::Array(array), Value::Number(n)) if *n >= 0.0 && n.fract() == 0.0 => {
                array.set_index(*n as usize, value)
            }
            _ => Err(Error::type_error(format!(
                "cannot set property `{}` of {}",
                key.to_js_string(),
                target.type_name()
            ))),
        }
    })
}

fn segment_key(scope: &Scope, segment: &Segment) -> Value {
    match segment {
        Segment::Key(key) => Value::String(key.clone()),
        Segment::Index(i) => Value::from(*i),
        Segment::Var(name) => scope.peek(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{ArrayRef, ObjectRef};
    use proptest::prelude::*;
    use serde_json::json;

    fn scope(data: serde_json::Value) -> Scope {
        Scope::new(Value::from(data).as_object().cloned().unwrap())
    }

    #[test]
    fn test_simple_path_classification() {
        assert!(build_function("a").is_simple());
        assert!(build_function("a.b['c'][0][k]").is_simple());
        assert!(build_function("user[\"first name\"]").is_simple());
        assert!(!build_function("true").is_simple());
        assert!(!build_function("Math.PI").is_simple());
        assert!(!build_function("a + b").is_simple());
        assert!(!build_function("a.b()").is_simple());
        assert!(!build_function("a[b + 1]").is_simple());
    }

    #[test]
    fn test_cache_returns_identical_program() {
        reset_cache();
        let first = build_function("a + 1");
        let second = build_function("a + 1");
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(cache_len(), 1);

        let other = build_function("a+1");
        assert!(!Rc::ptr_eq(&first, &other));
        assert_eq!(cache_len(), 2);
    }

    #[test]
    fn test_syntax_error_surfaces_on_evaluate() {
        let program = build_function("a +* b");
        let err = program.evaluate(&scope(json!({}))).unwrap_err();
        assert!(matches!(err, Error::Syntax { ref expr, .. } if expr == "a +* b"));
    }

    #[test]
    fn test_simple_path_reads() {
        let s = scope(json!({ "a": { "b": ["x", "y"] }, "k": 1 }));
        assert_eq!(compute("a.b[1]", &s).unwrap().to_js_string(), "y");
        assert_eq!(compute("a['b'][k]", &s).unwrap().to_js_string(), "y");
        assert!(matches!(compute("a.missing", &s).unwrap(), Value::Undefined));
        assert!(compute("a.missing.deeper", &s).is_err());
    }

    #[test]
    fn test_parse_mustache() {
        assert_eq!(parse_mustache("plain text"), None);
        assert_eq!(parse_mustache("{{a}}").as_deref(), Some("(a)"));
        assert_eq!(
            parse_mustache("a {{b+\"text\"}} c {{d}}").as_deref(),
            Some("\"a \"+(b+\"text\")+\" c \"+(d)")
        );
        assert_eq!(parse_mustache("{{}}"), None);
        assert_eq!(parse_mustache("{{a\n}}"), None);
        assert_eq!(parse_mustache("say \"hi\" {{a}}").as_deref(), Some("\"say \\\"hi\\\" \"+(a)"));
    }

    #[test]
    fn test_mustache_evaluates() {
        let s = scope(json!({ "a": 1, "b": 2 }));
        let src = parse_mustache("{{a}}-{{b}}").unwrap();
        assert_eq!(compute(&src, &s).unwrap().to_js_string(), "1-2");
    }

    #[test]
    fn test_assign_path() {
        let root = ObjectRef::new();
        root.set("form", ObjectRef::new()).unwrap();
        let s = Scope::new(root.clone());

        assign_path(&s, "title", Value::from("x")).unwrap();
        assign_path(&s, "form.name", Value::from("Ann")).unwrap();
        assert_eq!(root.peek("title").to_js_string(), "x");
        assert_eq!(compute("form.name", &s).unwrap().to_js_string(), "Ann");

        assert_eq!(
            assign_path(&s, "a + b", Value::Null).unwrap_err(),
            Error::InvalidPath("a + b".to_string())
        );
    }

    #[test]
    fn test_assign_path_index_out_of_range() {
        let list = ArrayRef::from_values(["a"]);
        let root = ObjectRef::new();
        root.set("list", list.clone()).unwrap();
        root.set("k", 1e18).unwrap();
        let s = Scope::new(root.clone());

        assert!(matches!(assign_path(&s, "list[k]", Value::from("x")), Err(Error::Type(_))));
        assert_eq!(list.len(), 1);

        root.set("k", 1).unwrap();
        assign_path(&s, "list[k]", Value::from("b")).unwrap();
        assert_eq!(list.join(","), "a,b");
    }

    proptest! {
        #[test]
        fn prop_literal_text_survives_mustache(prefix in "[a-z \"\\\\]{0,12}", suffix in "[a-z \"]{0,12}") {
            let s = scope(json!({ "v": 7 }));
            let src = parse_mustache(&format!("{prefix}{{{{v}}}}{suffix}")).unwrap();
            let rendered = compute(&src, &s).unwrap().to_js_string();
            prop_assert_eq!(rendered, format!("{prefix}7{suffix}"));
        }

        #[test]
        fn prop_build_function_is_stable(src in "[a-z]{1,3}( [+*] [a-z0-9]{1,3})?") {
            let a = build_function(&src);
            let b = build_function(&src);
            prop_assert!(Rc::ptr_eq(&a, &b));
        }
    }
}
