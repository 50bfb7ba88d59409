//! Layered scope - what template expressions are evaluated against.
//!
//! A scope is the root data object plus a chain of binding frames, innermost
//! first. `foreach` pushes one frame per rendered item holding the loop alias
//! (and index). Lookups walk the frames from the inside out and fall back to
//! the root object.
//!
//! ```text
//! frame { item: <list[1]>, i: 1 }     <- scope of the second clone
//!   └─ frame { row: <rows[0]> }       <- scope of an outer loop
//!        └─ root { rows, list, ... }  <- observed data
//! ```
//!
//! Writes never reach into an outer frame: a name bound by the scope's own
//! frame is updated there, a name bound only further out is shadowed in the
//! own frame, and everything else is written to the root object.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::ObjectRef;
use crate::error::Result;
use crate::types::Value;

struct ScopeInner {
    root: ObjectRef,
    frame: RefCell<IndexMap<String, Value>>,
    parent: Option<Scope>,
}

/// Shared handle to a layered scope.
#[derive(Clone)]
pub struct Scope(Rc<ScopeInner>);

impl Scope {
    /// Root scope over an observed object.
    pub fn new(root: ObjectRef) -> Self {
        Self(Rc::new(ScopeInner {
            root,
            frame: RefCell::new(IndexMap::new()),
            parent: None,
        }))
    }

    /// Child scope with one new frame on top of `self`.
    pub fn child<K: Into<String>>(&self, bindings: impl IntoIterator<Item = (K, Value)>) -> Self {
        let frame = bindings.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Self(Rc::new(ScopeInner {
            root: self.0.root.clone(),
            frame: RefCell::new(frame),
            parent: Some(self.clone()),
        }))
    }

    /// The observed root object.
    pub fn root(&self) -> &ObjectRef {
        &self.0.root
    }

    pub fn parent(&self) -> Option<&Scope> {
        self.0.parent.as_ref()
    }

    /// Number of frames above the root, this scope's own frame included.
    pub fn depth(&self) -> usize {
        self.0.parent.as_ref().map_or(0, |p| p.depth() + 1)
    }

    /// The value bound to `name` by the nearest frame, if any.
    fn frame_lookup(&self, name: &str) -> Option<Value> {
        let mut scope = Some(self);
        while let Some(current) = scope {
            if let Some(value) = current.0.frame.borrow().get(name) {
                return Some(value.clone());
            }
            scope = current.0.parent.as_ref();
        }
        None
    }

    /// Tracked lookup of a root identifier.
    pub fn get(&self, name: &str) -> Value {
        match self.frame_lookup(name) {
            Some(value) => {
                if let Value::Array(array) = &value {
                    array.dep().depend();
                }
                value
            }
            None => self.0.root.get(name),
        }
    }

    /// Untracked lookup of a root identifier.
    pub fn peek(&self, name: &str) -> Value {
        self.frame_lookup(name)
            .unwrap_or_else(|| self.0.root.peek(name))
    }

    /// Whether `name` is bound by any frame (as opposed to the root object).
    pub fn is_frame_bound(&self, name: &str) -> bool {
        self.frame_lookup(name).is_some()
    }

    /// Assign a root identifier.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        if self.is_frame_bound(name) {
            self.0.frame.borrow_mut().insert(name.to_string(), value);
            return Ok(());
        }
        self.0.root.set(name, value)
    }

    pub fn ptr_eq(&self, other: &Scope) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("frame", &self.0.frame.borrow().keys().collect::<Vec<_>>())
            .field("depth", &self.depth())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> ObjectRef {
        ObjectRef::from_pairs([("a", Value::from(1)), ("item", Value::from("root item"))])
    }

    #[test]
    fn test_lookup_walks_frames_innermost_first() {
        let scope = Scope::new(root());
        let outer = scope.child([("item", Value::from("outer"))]);
        let inner = outer.child([("i", Value::from(2))]);

        assert_eq!(inner.get("item").to_js_string(), "outer");
        assert_eq!(inner.get("i").to_number(), 2.0);
        assert_eq!(inner.get("a").to_number(), 1.0);
        assert_eq!(scope.get("item").to_js_string(), "root item");
        assert_eq!(inner.depth(), 2);
    }

    #[test]
    fn test_write_shadows_outer_frame() {
        let scope = Scope::new(root());
        let outer = scope.child([("item", Value::from("outer"))]);
        let inner = outer.child(Vec::<(String, Value)>::new());

        inner.set("item", "shadow").unwrap();
        assert_eq!(inner.get("item").to_js_string(), "shadow");
        assert_eq!(outer.get("item").to_js_string(), "outer");
        assert_eq!(scope.root().peek("item").to_js_string(), "root item");
    }

    #[test]
    fn test_unbound_write_goes_to_root() {
        let data = root();
        let scope = Scope::new(data.clone()).child([("x", Value::from(0))]);

        scope.set("a", 5).unwrap();
        assert_eq!(data.peek("a").to_number(), 5.0);

        scope.set("x", 9).unwrap();
        assert_eq!(scope.peek("x").to_number(), 9.0);
        assert!(!data.has("x"));
    }
}
